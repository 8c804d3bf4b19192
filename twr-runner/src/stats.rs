//! Per-peer ranging statistics, aggregated over the notifications collected
//! during a run.

use std::collections::BTreeMap;
use std::fmt;

use uci_core::fira::msg::{RangingData, RangingMeasurement};
use uci_core::fira::AoaType;
use uci_core::qorvo::diag::RangingDiagData;
use uci_core::Status;

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn stddev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

#[derive(Debug, Default)]
struct Series {
    values: Vec<f64>,
}

impl Series {
    fn push(&mut self, v: f64) {
        self.values.push(v);
    }

    fn summary(&self) -> (f64, f64) {
        (mean(&self.values), stddev(&self.values))
    }
}

#[derive(Debug, Default)]
struct PeerStats {
    total_ranges: usize,
    total_ranges_ok: usize,
    distances: Series,
    aoa_azimuth: Series,
    aoa_elevation: Series,
    aoa_axis: BTreeMap<u8, Series>,
    pdoa_axis: BTreeMap<u8, Series>,
}

/// Success rate plus mean/stddev of distance and angles per peer MAC.
/// When diagnostics were enabled, per-axis AoA/PDoA aggregates come from the
/// diagnostic reports paired by notification order.
#[derive(Debug, Default)]
pub struct RangingStats {
    peers: BTreeMap<u64, PeerStats>,
}

impl RangingStats {
    pub fn new(range_ntf: &[RangingData], diag_ntf: &[RangingDiagData]) -> Self {
        let mut stats = Self::default();
        for (i, data) in range_ntf.iter().enumerate() {
            let diag = diag_ntf.get(i);
            for (meas_idx, measurement) in data.measurements.iter().enumerate() {
                let peer = stats.peers.entry(measurement.mac()).or_default();
                peer.total_ranges += 1;
                if measurement.status() != Status::Ok {
                    continue;
                }
                peer.total_ranges_ok += 1;
                if let RangingMeasurement::Twr(twr) = measurement {
                    peer.distances.push(twr.distance_cm as f64);
                    peer.aoa_azimuth.push(twr.aoa_azimuth);
                    peer.aoa_elevation.push(twr.aoa_elevation);
                }
                let report = diag.and_then(|d| d.reports.get(meas_idx));
                if let Some(items) = report.and_then(|r| r.aoa_items()) {
                    for item in items {
                        let axis = item.axis;
                        if matches!(axis, AoaType::Unknown(_)) {
                            continue;
                        }
                        peer.aoa_axis.entry(axis.value()).or_default().push(item.aoa_rad);
                        peer.pdoa_axis
                            .entry(axis.value())
                            .or_default()
                            .push(item.pdoa_rad);
                    }
                }
            }
        }
        stats
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

impl fmt::Display for RangingStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.peers.is_empty() {
            return writeln!(f, "no ranging measurements collected");
        }
        for (mac, peer) in &self.peers {
            let rate = if peer.total_ranges > 0 {
                100.0 * peer.total_ranges_ok as f64 / peer.total_ranges as f64
            } else {
                0.0
            };
            writeln!(
                f,
                "peer {mac:#06x}: {}/{} ok ({rate:.1}%)",
                peer.total_ranges_ok, peer.total_ranges
            )?;
            let (d_mean, d_dev) = peer.distances.summary();
            writeln!(f, "    distance: {d_mean:.1} cm (stddev {d_dev:.2})")?;
            let (az_mean, az_dev) = peer.aoa_azimuth.summary();
            let (el_mean, el_dev) = peer.aoa_elevation.summary();
            writeln!(f, "    aoa azimuth: {az_mean:.2}° (stddev {az_dev:.2})")?;
            writeln!(f, "    aoa elevation: {el_mean:.2}° (stddev {el_dev:.2})")?;
            for (axis, series) in &peer.aoa_axis {
                let (a_mean, a_dev) = series.summary();
                let (p_mean, p_dev) = peer
                    .pdoa_axis
                    .get(axis)
                    .map(|s| s.summary())
                    .unwrap_or((0.0, 0.0));
                writeln!(
                    f,
                    "    axis {axis}: aoa {a_mean:.3} rad (stddev {a_dev:.3}), \
                     pdoa {p_mean:.3} rad (stddev {p_dev:.3})"
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uci_core::fira::msg::TwrMeasurement;
    use uci_core::fira::{MacAddressMode, RangingMeasurementType};

    fn twr(mac: u64, status: Status, distance: u16) -> RangingMeasurement {
        RangingMeasurement::Twr(TwrMeasurement {
            mac,
            status,
            nlos: 0,
            distance_cm: distance,
            aoa_azimuth: 10.0,
            aoa_azimuth_fom: 100,
            aoa_elevation: -5.0,
            aoa_elevation_fom: 100,
            aoa_dest_azimuth: 0.0,
            aoa_dest_azimuth_fom: 0,
            aoa_dest_elevation: 0.0,
            aoa_dest_elevation_fom: 0,
            slot_in_error: 0,
            rssi_dbm: -80.0,
        })
    }

    fn ntf(measurements: Vec<RangingMeasurement>) -> RangingData {
        RangingData {
            sequence_number: 0,
            session_handle: 42,
            rcr_indication: 0,
            current_ranging_interval_ms: 200,
            measurement_type: RangingMeasurementType::TwoWay,
            mac_addressing_mode: MacAddressMode::Short,
            measurements,
        }
    }

    #[test]
    fn success_rate_and_distance() {
        let ntfs = vec![
            ntf(vec![twr(1, Status::Ok, 100)]),
            ntf(vec![twr(1, Status::Ok, 104)]),
            ntf(vec![twr(1, Status::RangingRxTimeout, 0)]),
        ];
        let stats = RangingStats::new(&ntfs, &[]);
        let out = stats.to_string();
        assert!(out.contains("2/3 ok"));
        assert!(out.contains("distance: 102.0 cm"));
    }
}
