//! Structured FiRa messages and their codecs.
//!
//! Decoding of inbound payloads is contained: a malformed measurement logs a
//! warning and the rest of the notification is still delivered. Firmware
//! revisions routinely ship half-implemented report layouts and the host
//! must keep ranging.

use serde::Serialize;
use tracing::warn;

use crate::buffer::Buffer;
use crate::error::Result;
use crate::registry::{MessageCodec, UciMessage};

use super::anchor::{AnchorLocation, RELATIVE_LEN, WGS84_LEN};
use super::{
    DeviceState, DlTdoaMessageType, MacAddressMode, RangingMeasurementType, SessionState,
    SessionStateChangeReason, Status,
};

/// "major.minor" rendering of a 2-byte version field.
pub fn version_string(v: u16) -> String {
    format!("{}.{}", v & 0xFF, v >> 8)
}

// ─── Device info ──────────────────────────────────────────────────────────────

/// `CORE_GET_DEVICE_INFO` response. `vendor_data` is the raw vendor block;
/// the Qorvo addin knows how to interpret it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceInfo {
    pub status: Status,
    pub uci_version: u16,
    pub mac_version: u16,
    pub phy_version: u16,
    pub test_version: u16,
    pub vendor_data: Vec<u8>,
}

impl DeviceInfo {
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let mut buf = Buffer::new(payload);
        let status = Status::from_value(buf.pop_u8()?);
        let uci_version = buf.pop_uint(2)? as u16;
        let mac_version = buf.pop_uint(2)? as u16;
        let phy_version = buf.pop_uint(2)? as u16;
        let test_version = buf.pop_uint(2)? as u16;
        let vendor_len = buf.pop_u8()? as usize;
        let vendor_data = buf.pop(vendor_len)?.to_vec();
        if buf.remaining_size() > 0 {
            warn!(
                "device info carries {} bytes beyond the vendor block",
                buf.remaining_size()
            );
        }
        Ok(Self {
            status,
            uci_version,
            mac_version,
            phy_version,
            test_version,
            vendor_data,
        })
    }
}

pub struct DeviceInfoCodec;

impl MessageCodec for DeviceInfoCodec {
    fn decode(&self, payload: &[u8]) -> Result<UciMessage> {
        Ok(UciMessage::DeviceInfo(DeviceInfo::decode(payload)?))
    }
}

// ─── Device / session status notifications ────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SessionStatus {
    pub session_id: u32,
    pub state: SessionState,
    pub reason: SessionStateChangeReason,
}

impl SessionStatus {
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let mut buf = Buffer::new(payload);
        Ok(Self {
            session_id: buf.pop_uint(4)? as u32,
            state: SessionState::from_value(buf.pop_u8()?),
            reason: SessionStateChangeReason::from_value(buf.pop_u8()?),
        })
    }
}

pub struct SessionStatusCodec;

impl MessageCodec for SessionStatusCodec {
    fn decode(&self, payload: &[u8]) -> Result<UciMessage> {
        Ok(UciMessage::SessionStatus(SessionStatus::decode(payload)?))
    }
}

pub struct DeviceStatusCodec;

impl MessageCodec for DeviceStatusCodec {
    fn decode(&self, payload: &[u8]) -> Result<UciMessage> {
        let mut buf = Buffer::new(payload);
        Ok(UciMessage::DeviceStatus(DeviceState::from_value(
            buf.pop_u8()?,
        )))
    }
}

// ─── Ranging measurements ─────────────────────────────────────────────────────

/// Two-way ranging result. Distances are unsigned centimeters, angles
/// signed Q8.7 degrees, RSSI a negated Q7.1 dBm.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TwrMeasurement {
    pub mac: u64,
    pub status: Status,
    pub nlos: u8,
    pub distance_cm: u16,
    pub aoa_azimuth: f64,
    pub aoa_azimuth_fom: u8,
    pub aoa_elevation: f64,
    pub aoa_elevation_fom: u8,
    pub aoa_dest_azimuth: f64,
    pub aoa_dest_azimuth_fom: u8,
    pub aoa_dest_elevation: f64,
    pub aoa_dest_elevation_fom: u8,
    pub slot_in_error: u8,
    pub rssi_dbm: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OwrAoaMeasurement {
    pub mac: u64,
    pub status: Status,
    pub nlos: u8,
    pub frame_sequence_number: u8,
    pub block_index: u16,
    pub aoa_azimuth: f64,
    pub aoa_azimuth_fom: u8,
    pub aoa_elevation: f64,
    pub aoa_elevation_fom: u8,
}

/// UL-TDoA result. `device_id` and `tx_timestamp` are spec-tentative:
/// they are decoded only when the message control word announces them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UlTdoaMeasurement {
    pub mac: u64,
    pub status: Status,
    pub message_control: u16,
    pub frame_type: u8,
    pub nlos: u8,
    pub aoa_azimuth: f64,
    pub aoa_azimuth_fom: u8,
    pub aoa_elevation: f64,
    pub aoa_elevation_fom: u8,
    pub frame_number: u32,
    /// Ranging Ticks, 40 or 64 bits on the wire.
    pub rx_timestamp: u64,
    pub device_id: Option<u64>,
    pub tx_timestamp: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DlTdoaMeasurement {
    pub mac: u64,
    pub status: Status,
    pub message_type: DlTdoaMessageType,
    pub message_control: u16,
    pub block_index: u16,
    pub round_index: u8,
    pub nlos: u8,
    pub aoa_azimuth: f64,
    pub aoa_azimuth_fom: u8,
    pub aoa_elevation: f64,
    pub aoa_elevation_fom: u8,
    pub rssi_dbm: f64,
    pub tx_timestamp: u64,
    pub rx_timestamp: u64,
    /// Q5.10 ppm.
    pub anchor_cfo_ppm: f64,
    pub cfo_ppm: f64,
    pub initiator_reply_time: u32,
    pub responder_reply_time: u32,
    pub tof_ticks: u16,
    pub anchor_location: Option<AnchorLocation>,
    pub active_ranging_rounds: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RangingMeasurement {
    Twr(TwrMeasurement),
    OwrAoa(OwrAoaMeasurement),
    UlTdoa(UlTdoaMeasurement),
    DlTdoa(DlTdoaMeasurement),
}

impl RangingMeasurement {
    pub fn mac(&self) -> u64 {
        match self {
            RangingMeasurement::Twr(m) => m.mac,
            RangingMeasurement::OwrAoa(m) => m.mac,
            RangingMeasurement::UlTdoa(m) => m.mac,
            RangingMeasurement::DlTdoa(m) => m.mac,
        }
    }

    pub fn status(&self) -> Status {
        match self {
            RangingMeasurement::Twr(m) => m.status,
            RangingMeasurement::OwrAoa(m) => m.status,
            RangingMeasurement::UlTdoa(m) => m.status,
            RangingMeasurement::DlTdoa(m) => m.status,
        }
    }
}

/// `SESSION_INFO_NTF` (RANGE_DATA) payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangingData {
    pub sequence_number: u32,
    pub session_handle: u32,
    pub rcr_indication: u8,
    pub current_ranging_interval_ms: u32,
    pub measurement_type: RangingMeasurementType,
    pub mac_addressing_mode: MacAddressMode,
    pub measurements: Vec<RangingMeasurement>,
}

impl RangingData {
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let mut buf = Buffer::new(payload);
        let sequence_number = buf.pop_uint(4)? as u32;
        let session_handle = buf.pop_uint(4)? as u32;
        let rcr_indication = buf.pop_u8()?;
        let current_ranging_interval_ms = buf.pop_uint(4)? as u32;
        let measurement_type = RangingMeasurementType::from_value(buf.pop_u8()?);
        let _rfu = buf.pop_u8()?;
        let mac_addressing_mode = MacAddressMode::from_value(buf.pop_u8()?);
        let _rfu2 = buf.pop(8)?;
        let count = buf.pop_u8()?;

        let mac_len = match mac_addressing_mode {
            MacAddressMode::Short => 2,
            _ => 8,
        };

        let mut measurements = Vec::with_capacity(count as usize);
        for i in 0..count {
            let decoded = match measurement_type {
                RangingMeasurementType::TwoWay => {
                    decode_twr(&mut buf, mac_len).map(RangingMeasurement::Twr)
                }
                RangingMeasurementType::OwrAoa => {
                    decode_owr_aoa(&mut buf, mac_len).map(RangingMeasurement::OwrAoa)
                }
                RangingMeasurementType::OwrUlTdoa => {
                    decode_ul_tdoa(&mut buf, mac_len).map(RangingMeasurement::UlTdoa)
                }
                RangingMeasurementType::OwrDlTdoa => {
                    decode_dl_tdoa(&mut buf, mac_len).map(RangingMeasurement::DlTdoa)
                }
                RangingMeasurementType::Unknown(t) => {
                    warn!("measurement type {t:#04x} is unknown, keeping raw tail");
                    break;
                }
            };
            match decoded {
                Ok(m) => measurements.push(m),
                Err(e) => {
                    warn!("measurement {i} of {count} failed to decode: {e}");
                    break;
                }
            }
        }

        if buf.remaining_size() > 0 {
            warn!(
                "{} bytes left after {} measurements",
                buf.remaining_size(),
                measurements.len()
            );
        }

        Ok(Self {
            sequence_number,
            session_handle,
            rcr_indication,
            current_ranging_interval_ms,
            measurement_type,
            mac_addressing_mode,
            measurements,
        })
    }
}

fn pop_aoa(buf: &mut Buffer<'_>) -> Result<(f64, u8)> {
    let angle = buf.pop_float(true, 8, 7)?;
    let fom = buf.pop_u8()?;
    Ok((angle, fom))
}

fn pop_rssi(buf: &mut Buffer<'_>) -> Result<f64> {
    Ok(-buf.pop_float(false, 7, 1)?)
}

fn decode_twr(buf: &mut Buffer<'_>, mac_len: usize) -> Result<TwrMeasurement> {
    let mac = buf.pop_uint(mac_len)?;
    let status = Status::from_value(buf.pop_u8()?);
    let nlos = buf.pop_u8()?;
    let distance_cm = buf.pop_uint(2)? as u16;
    let (aoa_azimuth, aoa_azimuth_fom) = pop_aoa(buf)?;
    let (aoa_elevation, aoa_elevation_fom) = pop_aoa(buf)?;
    let (aoa_dest_azimuth, aoa_dest_azimuth_fom) = pop_aoa(buf)?;
    let (aoa_dest_elevation, aoa_dest_elevation_fom) = pop_aoa(buf)?;
    let slot_in_error = buf.pop_u8()?;
    let rssi_dbm = pop_rssi(buf)?;
    // v2.0 draft padding keeps the element stride constant across MAC widths
    let rfu = if mac_len == 2 { 11 } else { 5 };
    let _ = buf.pop(rfu)?;
    Ok(TwrMeasurement {
        mac,
        status,
        nlos,
        distance_cm,
        aoa_azimuth,
        aoa_azimuth_fom,
        aoa_elevation,
        aoa_elevation_fom,
        aoa_dest_azimuth,
        aoa_dest_azimuth_fom,
        aoa_dest_elevation,
        aoa_dest_elevation_fom,
        slot_in_error,
        rssi_dbm,
    })
}

fn decode_owr_aoa(buf: &mut Buffer<'_>, mac_len: usize) -> Result<OwrAoaMeasurement> {
    let mac = buf.pop_uint(mac_len)?;
    let status = Status::from_value(buf.pop_u8()?);
    let nlos = buf.pop_u8()?;
    let frame_sequence_number = buf.pop_u8()?;
    let block_index = buf.pop_uint(2)? as u16;
    let (aoa_azimuth, aoa_azimuth_fom) = pop_aoa(buf)?;
    let (aoa_elevation, aoa_elevation_fom) = pop_aoa(buf)?;
    Ok(OwrAoaMeasurement {
        mac,
        status,
        nlos,
        frame_sequence_number,
        block_index,
        aoa_azimuth,
        aoa_azimuth_fom,
        aoa_elevation,
        aoa_elevation_fom,
    })
}

// UL-TDoA message control: bits 0..1 device id width (absent/2/4/8 bytes),
// bit 2 RX timestamp width (40/64 bits), bits 3..4 TX timestamp
// (absent/40/64 bits).
fn ul_tdoa_device_id_len(control: u16) -> usize {
    match control & 0x03 {
        0 => 0,
        1 => 2,
        2 => 4,
        _ => 8,
    }
}

fn ul_tdoa_rx_timestamp_len(control: u16) -> usize {
    if control & 0x04 != 0 {
        8
    } else {
        5
    }
}

fn ul_tdoa_tx_timestamp_len(control: u16) -> usize {
    match control >> 3 & 0x03 {
        1 => 5,
        2 => 8,
        _ => 0,
    }
}

fn decode_ul_tdoa(buf: &mut Buffer<'_>, mac_len: usize) -> Result<UlTdoaMeasurement> {
    let mac = buf.pop_uint(mac_len)?;
    let status = Status::from_value(buf.pop_u8()?);
    let message_control = buf.pop_uint(2)? as u16;
    let frame_type = buf.pop_u8()?;
    let nlos = buf.pop_u8()?;
    let (aoa_azimuth, aoa_azimuth_fom) = pop_aoa(buf)?;
    let (aoa_elevation, aoa_elevation_fom) = pop_aoa(buf)?;
    let frame_number = buf.pop_uint(4)? as u32;
    let rx_timestamp = buf.pop_uint(ul_tdoa_rx_timestamp_len(message_control))?;
    let device_id = match ul_tdoa_device_id_len(message_control) {
        0 => None,
        n => Some(buf.pop_uint(n)?),
    };
    let tx_timestamp = match ul_tdoa_tx_timestamp_len(message_control) {
        0 => None,
        n => Some(buf.pop_uint(n)?),
    };
    Ok(UlTdoaMeasurement {
        mac,
        status,
        message_control,
        frame_type,
        nlos,
        aoa_azimuth,
        aoa_azimuth_fom,
        aoa_elevation,
        aoa_elevation_fom,
        frame_number,
        rx_timestamp,
        device_id,
        tx_timestamp,
    })
}

// DL-TDoA message control: bit 0 TX timestamp width, bit 1 RX timestamp
// width (40/64 bits), bits 5..6 anchor location form (none/WGS-84/relative).
fn dl_tdoa_timestamp_len(bit: bool) -> usize {
    if bit {
        8
    } else {
        5
    }
}

fn decode_dl_tdoa(buf: &mut Buffer<'_>, mac_len: usize) -> Result<DlTdoaMeasurement> {
    let mac = buf.pop_uint(mac_len)?;
    let status = Status::from_value(buf.pop_u8()?);
    let message_type = DlTdoaMessageType::from_value(buf.pop_u8()?);
    let message_control = buf.pop_uint(2)? as u16;
    let block_index = buf.pop_uint(2)? as u16;
    let round_index = buf.pop_u8()?;
    let nlos = buf.pop_u8()?;
    let (aoa_azimuth, aoa_azimuth_fom) = pop_aoa(buf)?;
    let (aoa_elevation, aoa_elevation_fom) = pop_aoa(buf)?;
    let rssi_dbm = pop_rssi(buf)?;
    let tx_timestamp = buf.pop_uint(dl_tdoa_timestamp_len(message_control & 0x01 != 0))?;
    let rx_timestamp = buf.pop_uint(dl_tdoa_timestamp_len(message_control & 0x02 != 0))?;
    let anchor_cfo_ppm = buf.pop_float(true, 5, 10)?;
    let cfo_ppm = buf.pop_float(true, 5, 10)?;
    let initiator_reply_time = buf.pop_uint(4)? as u32;
    let responder_reply_time = buf.pop_uint(4)? as u32;
    let tof_ticks = buf.pop_uint(2)? as u16;
    let anchor_location = match message_control >> 5 & 0x03 {
        1 => Some(AnchorLocation::decode_wgs84(buf.pop(WGS84_LEN)?)?),
        2 => Some(AnchorLocation::decode_relative(buf.pop(RELATIVE_LEN)?)?),
        _ => None,
    };
    let n_rounds = buf.pop_u8()? as usize;
    let active_ranging_rounds = buf.pop(n_rounds)?.to_vec();
    Ok(DlTdoaMeasurement {
        mac,
        status,
        message_type,
        message_control,
        block_index,
        round_index,
        nlos,
        aoa_azimuth,
        aoa_azimuth_fom,
        aoa_elevation,
        aoa_elevation_fom,
        rssi_dbm,
        tx_timestamp,
        rx_timestamp,
        anchor_cfo_ppm,
        cfo_ppm,
        initiator_reply_time,
        responder_reply_time,
        tof_ticks,
        anchor_location,
        active_ranging_rounds,
    })
}

pub struct RangeDataNtfCodec;

impl MessageCodec for RangeDataNtfCodec {
    fn decode(&self, payload: &[u8]) -> Result<UciMessage> {
        Ok(UciMessage::RangingData(RangingData::decode(payload)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranging_header(measurement_type: u8, mac_mode: u8, count: u8) -> Vec<u8> {
        let mut payload = Vec::new();
        payload.extend_from_slice(&7u32.to_le_bytes()); // sequence
        payload.extend_from_slice(&42u32.to_le_bytes()); // session handle
        payload.push(0); // rcr
        payload.extend_from_slice(&200u32.to_le_bytes()); // interval
        payload.push(measurement_type);
        payload.push(0); // rfu
        payload.push(mac_mode);
        payload.extend_from_slice(&[0u8; 8]); // rfu
        payload.push(count);
        payload
    }

    fn twr_element() -> Vec<u8> {
        let mut m = Vec::new();
        m.extend_from_slice(&[0x01, 0x00]); // mac 0x0001
        m.push(0x00); // status Ok
        m.push(0x00); // nlos
        m.extend_from_slice(&[0x64, 0x00]); // distance 100 cm
        m.extend_from_slice(&[0x00, 0x40]); // azimuth 128.0 deg
        m.push(90); // fom
        m.extend_from_slice(&[0x00, 0x00, 0x00]); // elevation + fom
        m.extend_from_slice(&[0x00, 0x00, 0x00]); // dest azimuth + fom
        m.extend_from_slice(&[0x00, 0x00, 0x00]); // dest elevation + fom
        m.push(0); // slot in error
        m.push(0xA1); // rssi -80.5 dBm
        m.extend_from_slice(&[0u8; 11]); // rfu
        m
    }

    #[test]
    fn twr_measurement_values() {
        let mut payload = ranging_header(0x01, 0x00, 1);
        payload.extend_from_slice(&twr_element());
        let data = RangingData::decode(&payload).unwrap();
        assert_eq!(data.session_handle, 42);
        assert_eq!(data.measurement_type, RangingMeasurementType::TwoWay);
        assert_eq!(data.measurements.len(), 1);
        let RangingMeasurement::Twr(m) = &data.measurements[0] else {
            panic!("expected a TWR measurement");
        };
        assert_eq!(m.mac, 1);
        assert!(m.status.is_ok());
        assert_eq!(m.distance_cm, 100);
        assert_eq!(m.aoa_azimuth, 128.0);
        assert_eq!(m.aoa_azimuth_fom, 90);
        assert_eq!(m.rssi_dbm, -80.5);
    }

    #[test]
    fn truncated_measurement_is_contained() {
        let mut payload = ranging_header(0x01, 0x00, 2);
        payload.extend_from_slice(&twr_element());
        payload.extend_from_slice(&[0x02, 0x00, 0x00]); // second one cut short
        let data = RangingData::decode(&payload).unwrap();
        assert_eq!(data.measurements.len(), 1);
    }

    #[test]
    fn ul_tdoa_message_control_widths() {
        let mut payload = ranging_header(0x00, 0x00, 1);
        let mut m = Vec::new();
        m.extend_from_slice(&[0x02, 0x00]); // mac
        m.push(0x00); // status
        // control: device id 2 bytes, rx 64-bit, tx 40-bit
        m.extend_from_slice(&(0x01u16 | 0x04 | 0x08).to_le_bytes());
        m.push(0x00); // frame type
        m.push(0x00); // nlos
        m.extend_from_slice(&[0x00, 0x00, 60]); // azimuth + fom
        m.extend_from_slice(&[0x00, 0x00, 0]); // elevation + fom
        m.extend_from_slice(&9u32.to_le_bytes()); // frame number
        m.extend_from_slice(&[1, 0, 0, 0, 0, 0, 0, 2]); // rx timestamp (8)
        m.extend_from_slice(&[0x2A, 0x00]); // device id
        m.extend_from_slice(&[5, 0, 0, 0, 0]); // tx timestamp (5)
        payload.extend_from_slice(&m);

        let data = RangingData::decode(&payload).unwrap();
        let RangingMeasurement::UlTdoa(m) = &data.measurements[0] else {
            panic!("expected a UL-TDoA measurement");
        };
        assert_eq!(m.rx_timestamp, 1 | 2 << 56);
        assert_eq!(m.device_id, Some(0x2A));
        assert_eq!(m.tx_timestamp, Some(5));
    }

    #[test]
    fn dl_tdoa_with_anchor_location() {
        let location = AnchorLocation::Relative {
            x: -5,
            y: 10,
            z: -20,
        };
        let mut payload = ranging_header(0x02, 0x00, 1);
        let mut m = Vec::new();
        m.extend_from_slice(&[0x03, 0x00]); // mac
        m.push(0x00); // status
        m.push(0x00); // message type Poll
        // control: 40-bit timestamps, relative anchor location
        m.extend_from_slice(&(2u16 << 5).to_le_bytes());
        m.extend_from_slice(&[0x05, 0x00]); // block index
        m.push(1); // round index
        m.push(0); // nlos
        m.extend_from_slice(&[0x00, 0x00, 0]); // azimuth + fom
        m.extend_from_slice(&[0x00, 0x00, 0]); // elevation + fom
        m.push(0x40); // rssi -32.0
        m.extend_from_slice(&[0; 5]); // tx timestamp
        m.extend_from_slice(&[0; 5]); // rx timestamp
        m.extend_from_slice(&[0x00, 0x04]); // anchor cfo: 0x0400 = 1.0 in Q5.10
        m.extend_from_slice(&[0x00, 0x00]); // cfo
        m.extend_from_slice(&[0; 4]); // initiator reply time
        m.extend_from_slice(&[0; 4]); // responder reply time
        m.extend_from_slice(&[0x10, 0x00]); // tof
        m.extend_from_slice(&location.encode().unwrap());
        m.push(2); // active rounds
        m.extend_from_slice(&[1, 3]);
        payload.extend_from_slice(&m);

        let data = RangingData::decode(&payload).unwrap();
        let RangingMeasurement::DlTdoa(m) = &data.measurements[0] else {
            panic!("expected a DL-TDoA measurement");
        };
        assert_eq!(m.anchor_cfo_ppm, 1.0);
        assert_eq!(m.rssi_dbm, -32.0);
        assert_eq!(m.anchor_location, Some(location));
        assert_eq!(m.active_ranging_rounds, vec![1, 3]);
    }

    #[test]
    fn session_status_decode() {
        let status = SessionStatus::decode(&[0x2A, 0x00, 0x00, 0x00, 0x02, 0x04]).unwrap();
        assert_eq!(status.session_id, 42);
        assert_eq!(status.state, SessionState::Active);
        assert_eq!(
            status.reason,
            SessionStateChangeReason::SessionSuspendedDueToInbandSignal
        );
    }

    #[test]
    fn device_info_with_vendor_block() {
        let mut payload = vec![0x00];
        payload.extend_from_slice(&0x0002u16.to_le_bytes()); // uci 2.0
        payload.extend_from_slice(&0x3001u16.to_le_bytes()); // mac 1.48
        payload.extend_from_slice(&0x3001u16.to_le_bytes());
        payload.extend_from_slice(&0x0101u16.to_le_bytes());
        payload.push(3);
        payload.extend_from_slice(&[0xDE, 0xAD, 0x01]);
        let info = DeviceInfo::decode(&payload).unwrap();
        assert!(info.status.is_ok());
        assert_eq!(version_string(info.uci_version), "2.0");
        assert_eq!(info.vendor_data, vec![0xDE, 0xAD, 0x01]);
    }
}
