//! Calibration parameter handling.
//!
//! Calibration keys are dotted strings (`ant3.ch9.ant_delay`) matched by
//! regex patterns rather than integer tags; each pattern declares the value
//! width. PDoA→AoA lookup tables travel as lists of signed Q4.11 pairs.

use regex::Regex;
use serde::Serialize;

use crate::buffer::{Buffer, Fp};
use crate::error::{Result, UciError};

/// Declared width of a calibration value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalLen {
    Fixed(u8),
    /// Variable length (lookup tables).
    Var,
}

struct CalEntry {
    pattern: Regex,
    len: CalLen,
}

/// Regex-keyed calibration parameter table. Addins append patterns at load
/// time; lookups walk the patterns in registration order.
#[derive(Default)]
pub struct CalTable {
    entries: Vec<CalEntry>,
}

impl CalTable {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn add(&mut self, pattern: &str, len: CalLen) -> Result<()> {
        let pattern = Regex::new(pattern)
            .map_err(|e| UciError::Registry(format!("bad calibration key pattern: {e}")))?;
        self.entries.push(CalEntry { pattern, len });
        Ok(())
    }

    /// Declared length for `key`, or [`UciError::UnknownCalKey`].
    pub fn length_of(&self, key: &str) -> Result<CalLen> {
        self.entries
            .iter()
            .find(|e| e.pattern.is_match(key))
            .map(|e| e.len)
            .ok_or_else(|| UciError::UnknownCalKey(key.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ─── Values ───────────────────────────────────────────────────────────────────

/// PDoA→AoA lookup table: `(pdoa, aoa)` pairs, each a signed Q4.11 radian
/// value on the wire.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AoaTable {
    pub pairs: Vec<(f64, f64)>,
}

impl AoaTable {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.pairs.len() * 4);
        for (pdoa, aoa) in &self.pairs {
            out.extend_from_slice(Fp::from_float(*pdoa, true, 4, 11)?.to_bytes());
            out.extend_from_slice(Fp::from_float(*aoa, true, 4, 11)?.to_bytes());
        }
        Ok(out)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() % 4 != 0 {
            return Err(UciError::InvalidParam(format!(
                "AoA table of {} bytes is not a sequence of Q4.11 pairs",
                bytes.len()
            )));
        }
        let mut buf = Buffer::new(bytes);
        let mut pairs = Vec::with_capacity(bytes.len() / 4);
        while buf.remaining_size() > 0 {
            let pdoa = buf.pop_float(true, 4, 11)?;
            let aoa = buf.pop_float(true, 4, 11)?;
            pairs.push((pdoa, aoa));
        }
        Ok(Self { pairs })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CalValue {
    Uint(u64),
    Bytes(Vec<u8>),
    AoaTable(AoaTable),
}

impl CalValue {
    /// Encode against the declared length for `key`.
    pub fn to_bytes(&self, key: &str, len: CalLen) -> Result<Vec<u8>> {
        let bytes = match self {
            CalValue::Uint(v) => {
                let CalLen::Fixed(l) = len else {
                    return Err(UciError::InvalidParam(format!(
                        "\"{key}\" is variable-length, encode it as bytes or a table"
                    )));
                };
                if l < 8 && *v >> (8 * l as u32) != 0 {
                    return Err(UciError::InvalidParam(format!(
                        "unable to set \"{key}\" to {v:#x}: does not fit in {l} bytes"
                    )));
                }
                v.to_le_bytes()[..l as usize].to_vec()
            }
            CalValue::Bytes(b) => {
                if let CalLen::Fixed(l) = len {
                    if b.len() != l as usize {
                        return Err(UciError::BadLength {
                            tag: 0,
                            expected: l as usize,
                            got: b.len(),
                        });
                    }
                }
                b.clone()
            }
            CalValue::AoaTable(table) => table.to_bytes()?,
        };
        Ok(bytes)
    }

    /// Decode the wire value for `key`: lookup tables for the LUT keys,
    /// small scalars as integers, anything else raw.
    pub fn from_bytes(key: &str, bytes: &[u8]) -> Self {
        if key.contains("pdoa_lut") {
            if let Ok(table) = AoaTable::from_bytes(bytes) {
                return CalValue::AoaTable(table);
            }
        }
        if bytes.len() <= 8 {
            let v = bytes
                .iter()
                .enumerate()
                .fold(0u64, |acc, (i, b)| acc | (*b as u64) << (8 * i));
            CalValue::Uint(v)
        } else {
            CalValue::Bytes(bytes.to_vec())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> CalTable {
        let mut t = CalTable::empty();
        t.add(r"^ant\d+\.ch\d+\.ant_delay$", CalLen::Fixed(4)).unwrap();
        t.add(r"^xtal_trim$", CalLen::Fixed(1)).unwrap();
        t.add(r"^pdoa_lut\d+\.data$", CalLen::Var).unwrap();
        t
    }

    #[test]
    fn key_patterns() {
        let t = table();
        assert_eq!(t.length_of("ant3.ch9.ant_delay").unwrap(), CalLen::Fixed(4));
        assert_eq!(t.length_of("xtal_trim").unwrap(), CalLen::Fixed(1));
        assert_eq!(t.length_of("pdoa_lut0.data").unwrap(), CalLen::Var);
        assert!(matches!(
            t.length_of("ant3.ch7.bogus"),
            Err(UciError::UnknownCalKey(_))
        ));
    }

    #[test]
    fn aoa_table_round_trip() {
        let table = AoaTable {
            pairs: vec![(-1.5, -0.75), (0.0, 0.0), (1.5, 0.75)],
        };
        let bytes = table.to_bytes().unwrap();
        assert_eq!(bytes.len(), 12);
        assert_eq!(AoaTable::from_bytes(&bytes).unwrap(), table);
    }

    #[test]
    fn value_encoding_respects_declared_width() {
        assert_eq!(
            CalValue::Uint(0x2A)
                .to_bytes("xtal_trim", CalLen::Fixed(1))
                .unwrap(),
            vec![0x2A]
        );
        assert!(CalValue::Uint(0x1FF)
            .to_bytes("xtal_trim", CalLen::Fixed(1))
            .is_err());
    }
}
