//! Ranging diagnostic reports (`RANGE_DIAGNOSTICS_NTF`).
//!
//! A notification carries one report per frame of the round; each report is
//! a list of typed fields with a 1-byte type and 2-byte length prefix.
//! Unknown field types are logged and skipped by their declared length so a
//! newer firmware never breaks the stream.

use bitflags::bitflags;
use serde::Serialize;
use tracing::warn;

use crate::buffer::Buffer;
use crate::error::Result;
use crate::fira::AoaType;
use crate::open_enum;
use crate::registry::{MessageCodec, UciMessage};

open_enum! {
    pub enum SegmentType {
        Ipatov = 0x00,
        Sts0 = 0x01,
        Sts1 = 0x02,
        Sts2 = 0x03,
        Sts3 = 0x04,
    }
}

open_enum! {
    /// Diagnostic field type ids; the values double as the
    /// `DIAGS_FRAME_REPORTS_FIELDS` enable flags.
    pub enum DiagFieldType {
        FrameStatus = 0x01,
        Aoa = 0x02,
        Cfo = 0x08,
        SegmentMetrics = 0x20,
        Cir = 0x40,
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FrameStatus: u8 {
        const SUCCESS = 0x01;
        const STS_MISMATCH = 0x02;
        const TOA_FAILURE = 0x04;
        const PHY_ERROR = 0x08;
    }
}

impl Serialize for FrameStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.bits())
    }
}

/// One AoA result axis: signed Q4.11 TDoA/PDoA/AoA radians plus figure of
/// merit and axis tag. 8 bytes on the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AoaItem {
    pub tdoa_rad: f64,
    pub pdoa_rad: f64,
    pub aoa_rad: f64,
    pub fom: u8,
    pub axis: AoaType,
}

/// Per-segment receive metrics, 17 bytes: RSL, first-path and peak-path
/// level/index/SNR (Q8.8 dBm steps) and the first-path time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentMetrics {
    pub segment: SegmentType,
    pub rsl_dbm: f64,
    pub path1_rsl_dbm: f64,
    pub path1_index: u16,
    pub path1_snr: f64,
    pub peak_rsl_dbm: f64,
    pub peak_index: u16,
    pub peak_snr: f64,
    pub first_path_time: u16,
}

/// Channel impulse response window around the first path. Samples are
/// interleaved signed I/Q words of `sample_size / 2` bytes each.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CirData {
    pub segment: SegmentType,
    pub primary: bool,
    pub receiver_id: u8,
    pub path1_relative_index: i16,
    pub sample_size: u8,
    pub samples: Vec<(i64, i64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DiagField {
    FrameStatus(FrameStatus),
    Aoa(Vec<AoaItem>),
    /// Carrier frequency offset in ppm (Q5.26 ratio on the wire).
    Cfo(f64),
    SegmentMetrics(Vec<SegmentMetrics>),
    Cir(Vec<CirData>),
    Unknown { field_type: u8, data: Vec<u8> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagReport {
    pub message_id: u8,
    pub action: u8,
    pub antenna_set: u8,
    pub fields: Vec<DiagField>,
}

impl DiagReport {
    /// The AoA items of this report, if it carries any.
    pub fn aoa_items(&self) -> Option<&[AoaItem]> {
        self.fields.iter().find_map(|f| match f {
            DiagField::Aoa(items) => Some(items.as_slice()),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangingDiagData {
    pub session_handle: u32,
    pub sequence_number: u32,
    pub reports: Vec<DiagReport>,
}

impl RangingDiagData {
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let mut buf = Buffer::new(payload);
        let session_handle = buf.pop_uint(4)? as u32;
        let sequence_number = buf.pop_uint(4)? as u32;
        let count = buf.pop_u8()?;
        let mut reports = Vec::with_capacity(count as usize);
        for _ in 0..count {
            reports.push(decode_report(&mut buf)?);
        }
        if buf.remaining_size() > 0 {
            warn!(
                "{} bytes left after {count} diagnostic reports",
                buf.remaining_size()
            );
        }
        Ok(Self {
            session_handle,
            sequence_number,
            reports,
        })
    }
}

fn decode_report(buf: &mut Buffer<'_>) -> Result<DiagReport> {
    let message_id = buf.pop_u8()?;
    let action = buf.pop_u8()?;
    let antenna_set = buf.pop_u8()?;
    let n_fields = buf.pop_u8()?;
    let mut fields = Vec::with_capacity(n_fields as usize);
    for _ in 0..n_fields {
        let field_type = buf.pop_u8()?;
        let length = buf.pop_uint(2)? as usize;
        let body = buf.pop(length)?;
        fields.push(decode_field(field_type, body));
    }
    Ok(DiagReport {
        message_id,
        action,
        antenna_set,
        fields,
    })
}

fn decode_field(field_type: u8, body: &[u8]) -> DiagField {
    let unknown = || {
        warn!("diagnostic field type {field_type:#04x} unknown, skipping {} bytes", body.len());
        DiagField::Unknown {
            field_type,
            data: body.to_vec(),
        }
    };
    let malformed = |what: &str| {
        warn!("malformed {what} diagnostic field of {} bytes", body.len());
        DiagField::Unknown {
            field_type,
            data: body.to_vec(),
        }
    };

    match DiagFieldType::from_value(field_type) {
        DiagFieldType::FrameStatus => match body.first() {
            Some(b) => DiagField::FrameStatus(FrameStatus::from_bits_truncate(*b)),
            None => malformed("frame-status"),
        },
        DiagFieldType::Aoa => match decode_aoa_items(body) {
            Some(items) => DiagField::Aoa(items),
            None => malformed("AoA"),
        },
        DiagFieldType::Cfo => {
            let mut buf = Buffer::new(body);
            match buf.pop_float(true, 5, 26) {
                Ok(ratio) => DiagField::Cfo(ratio * 1e6),
                Err(_) => malformed("CFO"),
            }
        }
        DiagFieldType::SegmentMetrics => match decode_segment_metrics(body) {
            Some(metrics) => DiagField::SegmentMetrics(metrics),
            None => malformed("segment-metrics"),
        },
        DiagFieldType::Cir => match decode_cirs(body) {
            Some(cirs) => DiagField::Cir(cirs),
            None => malformed("CIR"),
        },
        DiagFieldType::Unknown(_) => unknown(),
    }
}

fn decode_aoa_items(body: &[u8]) -> Option<Vec<AoaItem>> {
    if body.len() % 8 != 0 {
        return None;
    }
    let mut buf = Buffer::new(body);
    let mut items = Vec::with_capacity(body.len() / 8);
    while buf.remaining_size() > 0 {
        items.push(AoaItem {
            tdoa_rad: buf.pop_float(true, 4, 11).ok()?,
            pdoa_rad: buf.pop_float(true, 4, 11).ok()?,
            aoa_rad: buf.pop_float(true, 4, 11).ok()?,
            fom: buf.pop_u8().ok()?,
            axis: AoaType::from_value(buf.pop_u8().ok()?),
        });
    }
    Some(items)
}

fn decode_segment_metrics(body: &[u8]) -> Option<Vec<SegmentMetrics>> {
    const SIZE: usize = 17;
    if body.len() % SIZE != 0 {
        return None;
    }
    let mut buf = Buffer::new(body);
    let mut metrics = Vec::with_capacity(body.len() / SIZE);
    while buf.remaining_size() > 0 {
        metrics.push(SegmentMetrics {
            segment: SegmentType::from_value(buf.pop_u8().ok()?),
            rsl_dbm: buf.pop_int(2).ok()? as f64 / 256.0,
            path1_rsl_dbm: buf.pop_int(2).ok()? as f64 / 256.0,
            path1_index: buf.pop_uint(2).ok()? as u16,
            path1_snr: buf.pop_uint(2).ok()? as f64 / 256.0,
            peak_rsl_dbm: buf.pop_int(2).ok()? as f64 / 256.0,
            peak_index: buf.pop_uint(2).ok()? as u16,
            peak_snr: buf.pop_uint(2).ok()? as f64 / 256.0,
            first_path_time: buf.pop_uint(2).ok()? as u16,
        });
    }
    Some(metrics)
}

fn decode_cirs(body: &[u8]) -> Option<Vec<CirData>> {
    let mut buf = Buffer::new(body);
    let mut cirs = Vec::new();
    while buf.remaining_size() > 0 {
        let segment = SegmentType::from_value(buf.pop_u8().ok()?);
        let primary = buf.pop_u8().ok()? != 0;
        let receiver_id = buf.pop_u8().ok()?;
        let path1_relative_index = buf.pop_int(2).ok()? as i16;
        let n_samples = buf.pop_uint(2).ok()? as usize;
        let sample_size = buf.pop_u8().ok()?;
        let word = sample_size as usize / 2;
        if word == 0 {
            return None;
        }
        let mut samples = Vec::with_capacity(n_samples);
        for _ in 0..n_samples {
            let i = buf.pop_int(word).ok()?;
            let q = buf.pop_int(word).ok()?;
            samples.push((i, q));
        }
        cirs.push(CirData {
            segment,
            primary,
            receiver_id,
            path1_relative_index,
            sample_size,
            samples,
        });
    }
    Some(cirs)
}

pub struct DiagNtfCodec;

impl MessageCodec for DiagNtfCodec {
    fn decode(&self, payload: &[u8]) -> Result<UciMessage> {
        Ok(UciMessage::Diagnostic(RangingDiagData::decode(payload)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diag_header(n_reports: u8) -> Vec<u8> {
        let mut p = Vec::new();
        p.extend_from_slice(&42u32.to_le_bytes());
        p.extend_from_slice(&7u32.to_le_bytes());
        p.push(n_reports);
        p
    }

    fn field(field_type: u8, body: &[u8]) -> Vec<u8> {
        let mut f = vec![field_type];
        f.extend_from_slice(&(body.len() as u16).to_le_bytes());
        f.extend_from_slice(body);
        f
    }

    #[test]
    fn report_with_aoa_and_cfo() {
        let mut payload = diag_header(1);
        payload.extend_from_slice(&[0x01, 0x00, 0x02, 0x03]); // id, action, antenna set, 3 fields
        payload.extend_from_slice(&field(0x01, &[0x01])); // frame status: success
        // one AoA item: tdoa=0.5 (0x0400), pdoa=-0.5 (0xFC00), aoa=1.0 (0x0800)
        payload.extend_from_slice(&field(
            0x02,
            &[0x00, 0x04, 0x00, 0xFC, 0x00, 0x08, 80, 0x00],
        ));
        // cfo: 0x04000000 = 1.0 ratio = 1e6 ppm
        payload.extend_from_slice(&field(0x08, &[0x00, 0x00, 0x00, 0x04]));

        let diag = RangingDiagData::decode(&payload).unwrap();
        assert_eq!(diag.session_handle, 42);
        assert_eq!(diag.reports.len(), 1);
        let report = &diag.reports[0];
        assert_eq!(report.fields.len(), 3);
        assert_eq!(
            report.fields[0],
            DiagField::FrameStatus(FrameStatus::SUCCESS)
        );
        let items = report.aoa_items().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].tdoa_rad, 0.5);
        assert_eq!(items[0].pdoa_rad, -0.5);
        assert_eq!(items[0].aoa_rad, 1.0);
        assert_eq!(items[0].axis, AoaType::XAxis);
        assert_eq!(report.fields[2], DiagField::Cfo(1e6));
    }

    #[test]
    fn unknown_field_skipped_by_length() {
        let mut payload = diag_header(1);
        payload.extend_from_slice(&[0x00, 0x00, 0x00, 0x02]);
        payload.extend_from_slice(&field(0x55, &[0xDE, 0xAD, 0xBE, 0xEF]));
        payload.extend_from_slice(&field(0x01, &[0x05]));
        let diag = RangingDiagData::decode(&payload).unwrap();
        let report = &diag.reports[0];
        assert!(matches!(
            &report.fields[0],
            DiagField::Unknown { field_type: 0x55, data } if data.len() == 4
        ));
        // the field after the unknown one still decodes
        assert_eq!(
            report.fields[1],
            DiagField::FrameStatus(FrameStatus::SUCCESS | FrameStatus::TOA_FAILURE)
        );
    }

    #[test]
    fn cir_samples() {
        let mut body = vec![
            0x00, // segment Ipatov
            0x01, // primary
            0x00, // receiver
            0xFF, 0xFF, // path1 relative index -1
            0x02, 0x00, // 2 samples
            0x04, // sample size 4 => 2-byte I/Q
        ];
        body.extend_from_slice(&[0x01, 0x00, 0xFF, 0xFF]); // (1, -1)
        body.extend_from_slice(&[0x00, 0x80, 0x00, 0x00]); // (-32768, 0)
        let mut payload = diag_header(1);
        payload.extend_from_slice(&[0x00, 0x00, 0x00, 0x01]);
        payload.extend_from_slice(&field(0x40, &body));

        let diag = RangingDiagData::decode(&payload).unwrap();
        let DiagField::Cir(cirs) = &diag.reports[0].fields[0] else {
            panic!("expected a CIR field");
        };
        assert_eq!(cirs.len(), 1);
        assert_eq!(cirs[0].path1_relative_index, -1);
        assert_eq!(cirs[0].samples, vec![(1, -1), (-32768, 0)]);
    }
}
