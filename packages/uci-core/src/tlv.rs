//! Registry-driven TLV parameter codec.
//!
//! Every parameter table (device config, app config, test config, …) maps a
//! tag to a declared length policy. Encoding writes values at the declared
//! width; decoding verifies the wire length against the declaration and
//! falls back to the wire length for unknown tags, which are preserved so
//! callers can still inspect them.

use crate::error::{Result, UciError};

// ─── Length policies ──────────────────────────────────────────────────────────

/// How the value length of a tag is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LengthPolicy {
    /// Single fixed length.
    Fixed(u8),
    /// Two alternative lengths, disambiguated by the wire length byte
    /// (e.g. a 16-byte versus a 32-byte session key).
    Either(u8, u8),
    /// Variable tail: the wire length byte alone drives decoding.
    Var,
    /// Heterogeneous per-field byte schedule for struct-like values.
    Schedule(&'static [u8]),
}

impl LengthPolicy {
    /// Element length used for list inference, `None` when only the wire
    /// length can tell.
    fn element_len(&self) -> Option<u8> {
        match self {
            LengthPolicy::Fixed(l) => Some(*l),
            _ => None,
        }
    }
}

/// A named, runtime-extendable `tag → length policy` table. Addins may
/// append, override or remove entries at load time.
#[derive(Debug, Clone)]
pub struct ParamTable {
    name: &'static str,
    defs: Vec<(u8, LengthPolicy)>,
}

impl ParamTable {
    pub fn new(name: &'static str, defs: &[(u8, LengthPolicy)]) -> Self {
        Self {
            name,
            defs: defs.to_vec(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn policy(&self, tag: u8) -> Option<&LengthPolicy> {
        self.defs.iter().find(|(t, _)| *t == tag).map(|(_, p)| p)
    }

    /// Append or override one entry.
    pub fn insert(&mut self, tag: u8, policy: LengthPolicy) {
        if let Some(slot) = self.defs.iter_mut().find(|(t, _)| *t == tag) {
            slot.1 = policy;
        } else {
            self.defs.push((tag, policy));
        }
    }

    pub fn extend(&mut self, defs: &[(u8, LengthPolicy)]) {
        for (tag, policy) in defs {
            self.insert(*tag, policy.clone());
        }
    }

    pub fn remove(&mut self, tag: u8) {
        self.defs.retain(|(t, _)| *t != tag);
    }
}

// ─── Values ───────────────────────────────────────────────────────────────────

/// Outbound parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Uint(u64),
    /// Array of scalars, encoded back to back at the declared element width.
    List(Vec<u64>),
    /// Struct-like value encoded against a [`LengthPolicy::Schedule`].
    Struct(Vec<u64>),
    /// Pre-encoded bytes; must match a declared length exactly.
    Bytes(Vec<u8>),
}

impl From<u64> for ParamValue {
    fn from(v: u64) -> Self {
        ParamValue::Uint(v)
    }
}

/// One decoded TLV. `known` is false for tags absent from the table.
#[derive(Debug, Clone, PartialEq)]
pub struct Tlv {
    pub tag: u8,
    pub known: bool,
    pub element_len: u8,
    pub value: TlvValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TlvValue {
    Uint(u64),
    List(Vec<u64>),
    /// Scalar wider than 8 bytes (keys, IVs).
    Bytes(Vec<u8>),
}

impl TlvValue {
    pub fn as_uint(&self) -> Option<u64> {
        match self {
            TlvValue::Uint(v) => Some(*v),
            _ => None,
        }
    }
}

// ─── Encode ───────────────────────────────────────────────────────────────────

fn encode_uint(out: &mut Vec<u8>, tag: u8, v: u64, len: u8) -> Result<()> {
    if len < 8 && v >> (8 * len as u32) != 0 {
        return Err(UciError::InvalidParam(format!(
            "unable to set param {tag:#04x} to {v:#x}: does not fit in {len} bytes"
        )));
    }
    out.extend_from_slice(&v.to_le_bytes()[..len as usize]);
    Ok(())
}

/// Encode `(tag, value)` pairs: a 1-byte item count, then
/// `tag (1) | length (1) | value` triples, values little-endian at the
/// declared width.
pub fn tvs_to_bytes(table: &ParamTable, tvs: &[(u8, ParamValue)]) -> Result<Vec<u8>> {
    if tvs.len() > u8::MAX as usize {
        return Err(UciError::InvalidParam(format!(
            "{} parameters do not fit the 1-byte item count",
            tvs.len()
        )));
    }
    let mut out = vec![tvs.len() as u8];

    for (tag, value) in tvs {
        let policy = table.policy(*tag).ok_or_else(|| {
            UciError::InvalidParam(format!(
                "tag {tag:#04x} is not part of the {} table",
                table.name
            ))
        })?;
        out.push(*tag);

        match (value, policy) {
            (ParamValue::Uint(v), LengthPolicy::Fixed(l)) => {
                out.push(*l);
                encode_uint(&mut out, *tag, *v, *l)?;
            }
            (ParamValue::Uint(v), LengthPolicy::Either(a, _)) => {
                out.push(*a);
                encode_uint(&mut out, *tag, *v, *a)?;
            }
            (ParamValue::Uint(v), LengthPolicy::Var) => {
                // Zero-length placeholder; anything else needs bytes.
                if *v != 0 {
                    return Err(UciError::InvalidParam(format!(
                        "tag {tag:#04x} is variable-length, encode it as bytes"
                    )));
                }
                out.push(0);
            }
            (ParamValue::Uint(_), LengthPolicy::Schedule(_)) => {
                return Err(UciError::InvalidParam(format!(
                    "tag {tag:#04x} declares a field schedule, encode it as a struct value"
                )));
            }
            (ParamValue::List(vs), policy) => {
                let l = policy.element_len().ok_or_else(|| {
                    UciError::InvalidParam(format!(
                        "tag {tag:#04x} has no fixed element length for a list value"
                    ))
                })?;
                let total = vs.len() * l as usize;
                if total > u8::MAX as usize {
                    return Err(UciError::InvalidParam(format!(
                        "list value for tag {tag:#04x} is {total} bytes long"
                    )));
                }
                out.push(total as u8);
                for v in vs {
                    encode_uint(&mut out, *tag, *v, l)?;
                }
            }
            (ParamValue::Struct(vs), LengthPolicy::Schedule(schedule)) => {
                if vs.len() != schedule.len() {
                    return Err(UciError::InvalidParam(format!(
                        "tag {tag:#04x} expects {} fields, got {}",
                        schedule.len(),
                        vs.len()
                    )));
                }
                let total: usize = schedule.iter().map(|l| *l as usize).sum();
                out.push(total as u8);
                for (v, l) in vs.iter().zip(schedule.iter()) {
                    encode_uint(&mut out, *tag, *v, *l)?;
                }
            }
            (ParamValue::Struct(_), _) => {
                return Err(UciError::InvalidParam(format!(
                    "tag {tag:#04x} does not declare a field schedule"
                )));
            }
            (ParamValue::Bytes(b), policy) => {
                let ok = match policy {
                    LengthPolicy::Fixed(l) => b.len() == *l as usize,
                    LengthPolicy::Either(a, b2) => {
                        b.len() == *a as usize || b.len() == *b2 as usize
                    }
                    LengthPolicy::Var => b.len() <= u8::MAX as usize,
                    LengthPolicy::Schedule(s) => {
                        b.len() == s.iter().map(|l| *l as usize).sum::<usize>()
                    }
                };
                if !ok {
                    return Err(UciError::BadLength {
                        tag: *tag,
                        expected: match policy {
                            LengthPolicy::Fixed(l) => *l as usize,
                            LengthPolicy::Either(a, _) => *a as usize,
                            LengthPolicy::Schedule(s) => {
                                s.iter().map(|l| *l as usize).sum()
                            }
                            LengthPolicy::Var => u8::MAX as usize,
                        },
                        got: b.len(),
                    });
                }
                out.push(b.len() as u8);
                out.extend_from_slice(b);
            }
        }
    }
    Ok(out)
}

// ─── Decode ───────────────────────────────────────────────────────────────────

fn uint_le(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .enumerate()
        .fold(0u64, |acc, (i, b)| acc | (*b as u64) << (8 * i))
}

/// Decode a TLV payload against a table. Tags absent from the table are
/// preserved with `known = false` and their wire length.
pub fn tlvs_from_bytes(table: &ParamTable, payload: &[u8]) -> Result<Vec<Tlv>> {
    let mut buf = crate::buffer::Buffer::new(payload);
    let count = buf.pop_u8()?;
    let mut out = Vec::with_capacity(count as usize);

    for _ in 0..count {
        let tag = buf.pop_u8()?;
        let wire_len = buf.pop_u8()?;
        let value_bytes = buf.pop(wire_len as usize)?;

        let policy = table.policy(tag);
        let known = policy.is_some();
        let element_len = policy
            .and_then(|p| p.element_len())
            .filter(|l| *l > 0)
            .unwrap_or(wire_len);

        let value = if wire_len == element_len {
            if wire_len > 8 {
                TlvValue::Bytes(value_bytes.to_vec())
            } else {
                TlvValue::Uint(uint_le(value_bytes))
            }
        } else if element_len > 0 && wire_len % element_len == 0 {
            TlvValue::List(
                value_bytes
                    .chunks(element_len as usize)
                    .map(uint_le)
                    .collect(),
            )
        } else {
            return Err(UciError::BadLength {
                tag,
                expected: element_len as usize,
                got: wire_len as usize,
            });
        };

        out.push(Tlv {
            tag,
            known,
            element_len,
            value,
        });
    }
    Ok(out)
}

// ─── Plain lists ──────────────────────────────────────────────────────────────

/// Encode a request for a list of tags: 1-byte count then one byte per tag.
pub fn list_to_bytes(tags: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(tags.len() + 1);
    out.push(tags.len() as u8);
    out.extend_from_slice(tags);
    out
}

/// Decode a `(tag, status)` pair list: 1-byte count then 2 bytes per pair.
/// The count must be consistent with the payload size.
pub fn status_list_from_bytes(payload: &[u8]) -> Result<Vec<(u8, u8)>> {
    if payload.is_empty() {
        return Err(UciError::InvalidParam("status list payload is empty".into()));
    }
    let count = payload[0] as usize;
    if 2 * count != payload.len() - 1 {
        return Err(UciError::InvalidParam(format!(
            "status list declares {count} pairs but carries {} bytes",
            payload.len() - 1
        )));
    }
    Ok(payload[1..]
        .chunks(2)
        .map(|pair| (pair[0], pair[1]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ParamTable {
        ParamTable::new(
            "app",
            &[
                (0x06, LengthPolicy::Fixed(2)),  // DeviceMacAddress
                (0x07, LengthPolicy::Fixed(2)),  // DstMacAddress (list)
                (0x09, LengthPolicy::Fixed(4)),  // RangingInterval
                (0x45, LengthPolicy::Either(16, 32)), // SessionKey
            ],
        )
    }

    #[test]
    fn encode_scalars() {
        let payload = tvs_to_bytes(
            &table(),
            &[
                (0x06, ParamValue::Uint(0x1234)),
                (0x09, ParamValue::Uint(200)),
            ],
        )
        .unwrap();
        assert_eq!(
            payload,
            vec![0x02, 0x06, 0x02, 0x34, 0x12, 0x09, 0x04, 0xC8, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn encode_list_and_key() {
        let payload = tvs_to_bytes(
            &table(),
            &[
                (0x07, ParamValue::List(vec![0x0001, 0x0002])),
                (0x45, ParamValue::Bytes(vec![0x11; 32])),
            ],
        )
        .unwrap();
        assert_eq!(&payload[..6], &[0x02, 0x07, 0x04, 0x01, 0x00, 0x02]);
        assert_eq!(payload[6], 0x00);
        assert_eq!(payload[7], 0x45);
        assert_eq!(payload[8], 32);
        assert_eq!(payload.len(), 9 + 32);
    }

    #[test]
    fn encode_rejects_bad_values() {
        // Value does not fit the declared width
        assert!(tvs_to_bytes(&table(), &[(0x06, ParamValue::Uint(0x10000))]).is_err());
        // Key of a length the table does not declare
        assert!(matches!(
            tvs_to_bytes(&table(), &[(0x45, ParamValue::Bytes(vec![0; 20]))]),
            Err(UciError::BadLength { tag: 0x45, .. })
        ));
        // Unknown tag
        assert!(tvs_to_bytes(&table(), &[(0xE0, ParamValue::Uint(1))]).is_err());
    }

    #[test]
    fn decode_scalars_lists_and_unknown_tags() {
        // 3 items: known scalar, known list (2 elements), unknown tag
        let payload = [
            0x03, //
            0x06, 0x02, 0x34, 0x12, //
            0x07, 0x04, 0x01, 0x00, 0x02, 0x00, //
            0xE0, 0x01, 0x2A,
        ];
        let tlvs = tlvs_from_bytes(&table(), &payload).unwrap();
        assert_eq!(tlvs.len(), 3);
        assert!(tlvs[0].known);
        assert_eq!(tlvs[0].value, TlvValue::Uint(0x1234));
        assert_eq!(tlvs[1].value, TlvValue::List(vec![1, 2]));
        assert!(!tlvs[2].known);
        assert_eq!(tlvs[2].value, TlvValue::Uint(0x2A));
    }

    #[test]
    fn decode_wide_scalars_as_bytes() {
        let mut payload = vec![0x01, 0x45, 16];
        payload.extend_from_slice(&[0xAB; 16]);
        let tlvs = tlvs_from_bytes(&table(), &payload).unwrap();
        assert_eq!(tlvs[0].value, TlvValue::Bytes(vec![0xAB; 16]));
    }

    #[test]
    fn decode_rejects_misaligned_list() {
        // Declared element length 2, wire length 3
        let payload = [0x01, 0x06, 0x03, 0x01, 0x02, 0x03];
        assert!(matches!(
            tlvs_from_bytes(&table(), &payload),
            Err(UciError::BadLength { tag: 0x06, .. })
        ));
    }

    #[test]
    fn status_lists() {
        assert_eq!(list_to_bytes(&[0x06, 0x09]), vec![0x02, 0x06, 0x09]);
        let pairs = status_list_from_bytes(&[0x02, 0x06, 0x00, 0x09, 0x04]).unwrap();
        assert_eq!(pairs, vec![(0x06, 0x00), (0x09, 0x04)]);
        assert!(status_list_from_bytes(&[0x02, 0x06, 0x00]).is_err());
    }
}
