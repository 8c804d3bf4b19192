//! DT-Anchor location packing.
//!
//! Two coordinate forms, selected by the coordinate-type flag:
//!
//! * WGS-84: 96 bits, `{latitude: Q8.24 signed (33 bits), longitude:
//!   Q8.24 signed (33 bits), altitude: Q8.21 signed (30 bits)}`.
//! * Relative: 80 bits, `{x: signed 28 bits, y: signed 28 bits, z: signed
//!   24 bits}`.
//!
//! Within each field the bits are laid out low byte first, with the
//! remaining high bits (which carry the sign) last; fields are then
//! concatenated MSB-first. The APP_CONFIG form prepends a
//! `presence | coord_type << 1` header byte to the same stream.

use serde::Serialize;

use crate::buffer::{BitPacker, BitUnpacker};
use crate::error::{Result, UciError};

pub const WGS84_LEN: usize = 12;
pub const RELATIVE_LEN: usize = 10;

const LAT_BITS: u32 = 33;
const LON_BITS: u32 = 33;
const ALT_BITS: u32 = 30;
const XY_BITS: u32 = 28;
const Z_BITS: u32 = 24;

const LAT_FRAC: u32 = 24;
const ALT_FRAC: u32 = 21;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum AnchorLocation {
    Wgs84 {
        /// Degrees, `|lat| ≤ 90`.
        latitude: f64,
        /// Degrees, `|lon| ≤ 180`.
        longitude: f64,
        /// Meters, `-256 ≤ alt ≤ 255`.
        altitude: f64,
    },
    Relative {
        x: i32,
        y: i32,
        z: i32,
    },
}

// ─── Field packing ────────────────────────────────────────────────────────────

/// Two's-complement `nbits` pattern of `v`, re-ordered low byte first with
/// the leftover high bits last.
fn pack_field(v: i64, nbits: u32) -> u64 {
    let mask = (1u64 << nbits) - 1;
    let t = (v as u64) & mask;
    let full = nbits / 8;
    let rem = nbits % 8;
    let mut out = 0u64;
    for i in 0..full {
        out = out << 8 | (t >> (8 * i)) & 0xFF;
    }
    if rem > 0 {
        out = out << rem | (t >> (8 * full)) & ((1u64 << rem) - 1);
    }
    out
}

/// Inverse of [`pack_field`], sign-extended from bit `nbits - 1`.
fn unpack_field(bits: u64, nbits: u32) -> i64 {
    let full = nbits / 8;
    let rem = nbits % 8;
    let mut t = if rem > 0 {
        (bits & ((1u64 << rem) - 1)) << (8 * full)
    } else {
        0
    };
    for i in 0..full {
        let byte = bits >> (rem + 8 * (full - 1 - i)) & 0xFF;
        t |= byte << (8 * i);
    }
    let shift = 64 - nbits;
    ((t << shift) as i64) >> shift
}

fn check_range(name: &str, v: f64, min: f64, max: f64) -> Result<()> {
    if v < min || v > max {
        return Err(UciError::InvalidParam(format!(
            "DT-Anchor {name} {v} outside [{min}, {max}]"
        )));
    }
    Ok(())
}

impl AnchorLocation {
    fn coord_type(&self) -> u8 {
        match self {
            AnchorLocation::Wgs84 { .. } => 0,
            AnchorLocation::Relative { .. } => 1,
        }
    }

    fn pack_fields(&self, packer: &mut BitPacker) -> Result<()> {
        match *self {
            AnchorLocation::Wgs84 {
                latitude,
                longitude,
                altitude,
            } => {
                check_range("latitude", latitude, -90.0, 90.0)?;
                check_range("longitude", longitude, -180.0, 180.0)?;
                check_range("altitude", altitude, -256.0, 255.0)?;
                let lat = (latitude * (1u64 << LAT_FRAC) as f64).round() as i64;
                let lon = (longitude * (1u64 << LAT_FRAC) as f64).round() as i64;
                let alt = (altitude * (1u64 << ALT_FRAC) as f64).round() as i64;
                packer.push(pack_field(lat, LAT_BITS), LAT_BITS);
                packer.push(pack_field(lon, LON_BITS), LON_BITS);
                packer.push(pack_field(alt, ALT_BITS), ALT_BITS);
            }
            AnchorLocation::Relative { x, y, z } => {
                let xy_max = (1 << 27) - 1;
                check_range("x", x as f64, -(1i64 << 27) as f64, xy_max as f64)?;
                check_range("y", y as f64, -(1i64 << 27) as f64, xy_max as f64)?;
                check_range(
                    "z",
                    z as f64,
                    -(1i64 << 23) as f64,
                    ((1i64 << 23) - 1) as f64,
                )?;
                packer.push(pack_field(x as i64, XY_BITS), XY_BITS);
                packer.push(pack_field(y as i64, XY_BITS), XY_BITS);
                packer.push(pack_field(z as i64, Z_BITS), Z_BITS);
            }
        }
        Ok(())
    }

    /// Wire form used inside DL-TDoA measurements: 12 (WGS-84) or 10
    /// (relative) bytes, no header byte.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut packer = BitPacker::new();
        self.pack_fields(&mut packer)?;
        Ok(packer.into_bytes())
    }

    pub fn decode_wgs84(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != WGS84_LEN {
            return Err(UciError::InvalidParam(format!(
                "WGS-84 anchor location is {WGS84_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        let mut bits = BitUnpacker::new(bytes);
        let lat = unpack_field(bits.take(LAT_BITS)?, LAT_BITS);
        let lon = unpack_field(bits.take(LON_BITS)?, LON_BITS);
        let alt = unpack_field(bits.take(ALT_BITS)?, ALT_BITS);
        Ok(AnchorLocation::Wgs84 {
            latitude: lat as f64 / (1u64 << LAT_FRAC) as f64,
            longitude: lon as f64 / (1u64 << LAT_FRAC) as f64,
            altitude: alt as f64 / (1u64 << ALT_FRAC) as f64,
        })
    }

    pub fn decode_relative(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != RELATIVE_LEN {
            return Err(UciError::InvalidParam(format!(
                "relative anchor location is {RELATIVE_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        let mut bits = BitUnpacker::new(bytes);
        let x = unpack_field(bits.take(XY_BITS)?, XY_BITS) as i32;
        let y = unpack_field(bits.take(XY_BITS)?, XY_BITS) as i32;
        let z = unpack_field(bits.take(Z_BITS)?, Z_BITS) as i32;
        Ok(AnchorLocation::Relative { x, y, z })
    }

    /// APP_CONFIG value for `DlTdoaAnchorLocation`: header byte
    /// (`presence | coord_type << 1`) followed by the packed fields,
    /// 13 or 11 bytes. `None` encodes "location not present" (1 byte).
    pub fn to_app_config_value(location: Option<&Self>) -> Result<Vec<u8>> {
        let Some(location) = location else {
            return Ok(vec![0]);
        };
        let mut packer = BitPacker::new();
        packer.push((1 | location.coord_type() << 1) as u64, 8);
        location.pack_fields(&mut packer)?;
        Ok(packer.into_bytes())
    }

    /// Inverse of [`AnchorLocation::to_app_config_value`].
    pub fn from_app_config_value(bytes: &[u8]) -> Result<Option<Self>> {
        let header = *bytes.first().ok_or(UciError::Underflow {
            wanted: 1,
            available: 0,
        })?;
        if header & 0x01 == 0 {
            return Ok(None);
        }
        match header >> 1 & 0x01 {
            0 => Self::decode_wgs84(&bytes[1..]).map(Some),
            _ => Self::decode_relative(&bytes[1..]).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wgs84(latitude: f64, longitude: f64, altitude: f64) -> AnchorLocation {
        AnchorLocation::Wgs84 {
            latitude,
            longitude,
            altitude,
        }
    }

    #[test]
    fn field_packing_moves_low_bytes_first() {
        // 28-bit -1 is 0x0FFFFFFF; low three bytes first, then the top nibble
        assert_eq!(pack_field(-1, 28), 0x0FFF_FFFF);
        assert_eq!(unpack_field(0x0FFF_FFFF, 28), -1);

        // 0x0123_4567 → bytes 67 45 23, then high nibble 0x1... wait through
        // the round trip instead of eyeballing
        let v = 0x0123_4567;
        assert_eq!(unpack_field(pack_field(v, 28), 28), v);

        // 33-bit sign bit travels in the trailing position
        let packed = pack_field(-(1 << 32), 33);
        assert_eq!(packed & 1, 1);
        assert_eq!(unpack_field(packed, 33), -(1 << 32));
    }

    #[test]
    fn wgs84_round_trip() {
        let loc = wgs84(48.87843, 2.23456, 35.5);
        let bytes = loc.encode().unwrap();
        assert_eq!(bytes.len(), WGS84_LEN);
        let back = AnchorLocation::decode_wgs84(&bytes).unwrap();
        let AnchorLocation::Wgs84 {
            latitude,
            longitude,
            altitude,
        } = back
        else {
            panic!("wrong coordinate form");
        };
        let eps_deg = 1.0 / (1u64 << LAT_FRAC) as f64;
        let eps_m = 1.0 / (1u64 << ALT_FRAC) as f64;
        assert!((latitude - 48.87843).abs() <= eps_deg);
        assert!((longitude - 2.23456).abs() <= eps_deg);
        assert!((altitude - 35.5).abs() <= eps_m);
    }

    #[test]
    fn relative_round_trip_with_sign_extension() {
        let loc = AnchorLocation::Relative {
            x: -123456,
            y: (1 << 27) - 1,
            z: -(1 << 23),
        };
        let bytes = loc.encode().unwrap();
        assert_eq!(bytes.len(), RELATIVE_LEN);
        assert_eq!(AnchorLocation::decode_relative(&bytes).unwrap(), loc);
    }

    #[test]
    fn app_config_header_byte() {
        let value = AnchorLocation::to_app_config_value(None).unwrap();
        assert_eq!(value, vec![0]);

        let loc = wgs84(0.0, 0.0, 0.0);
        let value = AnchorLocation::to_app_config_value(Some(&loc)).unwrap();
        assert_eq!(value.len(), 13);
        assert_eq!(value[0], 0x01);
        assert_eq!(
            AnchorLocation::from_app_config_value(&value).unwrap(),
            Some(loc)
        );

        let rel = AnchorLocation::Relative { x: 1, y: 2, z: 3 };
        let value = AnchorLocation::to_app_config_value(Some(&rel)).unwrap();
        assert_eq!(value.len(), 11);
        assert_eq!(value[0], 0x03);
        assert_eq!(
            AnchorLocation::from_app_config_value(&value).unwrap(),
            Some(rel)
        );
    }

    #[test]
    fn out_of_range_coordinates_are_rejected() {
        assert!(wgs84(90.1, 0.0, 0.0).encode().is_err());
        assert!(wgs84(0.0, -180.5, 0.0).encode().is_err());
        assert!(wgs84(0.0, 0.0, 256.0).encode().is_err());
        assert!(AnchorLocation::Relative {
            x: 1 << 27,
            y: 0,
            z: 0
        }
        .encode()
        .is_err());
    }
}
