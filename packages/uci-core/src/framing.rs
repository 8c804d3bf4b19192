//! UCI packet framing: header encode/decode, outbound fragmentation and the
//! inbound sliding decoder with byte-stream resynchronization.
//!
//! The decoder only slices the stream into packets. Logical message
//! reassembly across `PBF=NotFinal` packets belongs to the client, which has
//! the `(MT, GID, OID)` context to validate the sequence.

use bytes::{Buf, BytesMut};
use tracing::{debug, warn};

use crate::error::{Result, UciError};

pub const HEADER_SIZE: usize = 4;
/// Per-packet payload cap. The UCI header allows 255 bytes; 250 keeps us
/// inside the FiRa reassembly constraints.
pub const MAX_PAYLOAD: usize = 250;

// ─── Header fields ────────────────────────────────────────────────────────────

/// Message type, bits 7:5 of header byte 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    DataPacket = 0,
    Command = 1,
    Response = 2,
    Notification = 3,
}

impl MessageType {
    pub fn from_bits(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::DataPacket),
            1 => Some(Self::Command),
            2 => Some(Self::Response),
            3 => Some(Self::Notification),
            _ => None,
        }
    }
}

/// Packet boundary flag, bit 4 of header byte 0. `NotFinal` announces more
/// packets for the same message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Pbf {
    Final = 0,
    NotFinal = 1,
}

/// Data packet format, the GID nibble of a `DataPacket` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dpf {
    DataMessageSnd,
    DataMessageRcv,
    RadarDataMessage,
    Unknown(u8),
}

impl Dpf {
    pub fn from_value(v: u8) -> Self {
        match v {
            1 => Self::DataMessageSnd,
            2 => Self::DataMessageRcv,
            15 => Self::RadarDataMessage,
            other => Self::Unknown(other),
        }
    }

    pub fn value(self) -> u8 {
        match self {
            Self::DataMessageSnd => 1,
            Self::DataMessageRcv => 2,
            Self::RadarDataMessage => 15,
            Self::Unknown(v) => v,
        }
    }
}

/// One complete packet as sliced from the byte stream. For data packets the
/// `gid` nibble carries the DPF.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPacket {
    pub mt: MessageType,
    pub pbf: Pbf,
    pub gid: u8,
    pub oid: u8,
    pub payload: Vec<u8>,
}

// ─── Encoder ──────────────────────────────────────────────────────────────────

/// Encode one packet. Control packets carry an 8-bit length in byte 3; data
/// packets a 16-bit little-endian length in bytes 2..3.
pub fn encode_packet(
    mt: MessageType,
    pbf: Pbf,
    gid: u8,
    oid: u8,
    payload: &[u8],
) -> Result<Vec<u8>> {
    if gid > 0x0F {
        return Err(UciError::Protocol("gid is only 4 bits long".into()));
    }
    if oid > 0x3F {
        return Err(UciError::Protocol("oid is only 6 bits long".into()));
    }
    let mut packet = Vec::with_capacity(HEADER_SIZE + payload.len());
    packet.push((mt as u8) << 5 | (pbf as u8) << 4 | gid);
    packet.push(oid);
    match mt {
        MessageType::DataPacket => {
            if payload.len() > u16::MAX as usize {
                return Err(UciError::Protocol(format!(
                    "data payload of {} bytes exceeds the 16-bit length field",
                    payload.len()
                )));
            }
            packet.push((payload.len() & 0xFF) as u8);
            packet.push((payload.len() >> 8) as u8);
        }
        _ => {
            if payload.len() > u8::MAX as usize {
                return Err(UciError::Protocol(format!(
                    "control payload of {} bytes exceeds the 8-bit length field",
                    payload.len()
                )));
            }
            packet.push(0);
            packet.push(payload.len() as u8);
        }
    }
    packet.extend_from_slice(payload);
    Ok(packet)
}

/// Split a logical message payload into per-packet chunks of at most
/// [`MAX_PAYLOAD`] bytes, `PBF=NotFinal` on all but the last. An empty
/// payload yields a single empty chunk.
pub fn fragments(payload: &[u8]) -> Vec<(Pbf, &[u8])> {
    if payload.len() <= MAX_PAYLOAD {
        return vec![(Pbf::Final, payload)];
    }
    let mut out = Vec::with_capacity(payload.len().div_ceil(MAX_PAYLOAD));
    let mut chunks = payload.chunks(MAX_PAYLOAD).peekable();
    while let Some(chunk) = chunks.next() {
        let pbf = if chunks.peek().is_some() {
            Pbf::NotFinal
        } else {
            Pbf::Final
        };
        out.push((pbf, chunk));
    }
    out
}

// ─── Decoder ──────────────────────────────────────────────────────────────────

/// Sliding decoder over an arbitrary inbound byte stream.
///
/// Until the first well-formed header is seen, bytes whose top nibble is not
/// in `{4, 5, 6, 7}` (a `Response` or `Notification` with either PBF value)
/// are dropped: a freshly opened UART may land in the middle of a packet.
/// After synchronization an unknown message type flushes the buffer and
/// returns to the desynchronized state.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: BytesMut,
    synchronized: bool,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingest a raw byte span and return every packet it completes, in wire
    /// order.
    pub fn push(&mut self, data: &[u8]) -> Vec<RawPacket> {
        self.buffer.extend_from_slice(data);
        let mut packets = Vec::new();

        loop {
            if !self.synchronized && !self.resync() {
                break;
            }
            if self.buffer.len() < HEADER_SIZE {
                break;
            }
            let size = match self.buffer[0] >> 5 {
                1..=3 => self.buffer[3] as usize,
                0 => self.buffer[2] as usize | (self.buffer[3] as usize) << 8,
                mt => {
                    warn!("unknown message type {mt}, flushing {} bytes", self.buffer.len());
                    self.buffer.clear();
                    self.synchronized = false;
                    break;
                }
            };
            if self.buffer.len() < HEADER_SIZE + size {
                break;
            }

            // mt bits are 0..=3 here, from_bits cannot fail
            let mt = MessageType::from_bits(self.buffer[0] >> 5).unwrap();
            let pbf = if self.buffer[0] & 0x10 != 0 {
                Pbf::NotFinal
            } else {
                Pbf::Final
            };
            packets.push(RawPacket {
                mt,
                pbf,
                gid: self.buffer[0] & 0x0F,
                oid: self.buffer[1] & 0x3F,
                payload: self.buffer[HEADER_SIZE..HEADER_SIZE + size].to_vec(),
            });
            self.buffer.advance(HEADER_SIZE + size);
        }
        packets
    }

    /// Drop leading garbage until a plausible first header byte. Returns
    /// whether the stream is synchronized.
    fn resync(&mut self) -> bool {
        let good = self
            .buffer
            .iter()
            .position(|b| matches!(b >> 4, 4..=7));
        let dropped = good.unwrap_or(self.buffer.len());
        if dropped > 0 {
            debug!(
                "recv bytes purged: {}",
                hex::encode(&self.buffer[..dropped])
            );
            self.buffer.advance(dropped);
        }
        self.synchronized = good.is_some();
        self.synchronized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_response_header() {
        let p = encode_packet(MessageType::Response, Pbf::Final, 3, 2, &[0x00]).unwrap();
        assert_eq!(p, vec![0x43, 0x02, 0x00, 0x01, 0x00]);
    }

    #[test]
    fn encode_rejects_out_of_range_fields() {
        assert!(encode_packet(MessageType::Command, Pbf::Final, 0x10, 0, &[]).is_err());
        assert!(encode_packet(MessageType::Command, Pbf::Final, 0, 0x40, &[]).is_err());
        assert!(encode_packet(MessageType::Command, Pbf::Final, 0, 0, &[0u8; 256]).is_err());
    }

    #[test]
    fn data_packet_length_is_16_bit() {
        let p = encode_packet(MessageType::DataPacket, Pbf::Final, 1, 0, &[0u8; 0x1234]).unwrap();
        assert_eq!(&p[..4], &[0x01, 0x00, 0x34, 0x12]);
    }

    #[test]
    fn fragment_boundaries() {
        let payload = vec![0xAA; 260];
        let parts = fragments(&payload);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0], (Pbf::NotFinal, &payload[..250]));
        assert_eq!(parts[1], (Pbf::Final, &payload[250..]));

        assert_eq!(fragments(&[]), vec![(Pbf::Final, &[][..])]);
    }

    #[test]
    fn resync_drops_leading_garbage() {
        let mut dec = FrameDecoder::new();
        // Garbage, then a Response for gid=3 oid=2 with payload [0x00]
        let packets = dec.push(&[0x00, 0x01, 0x02, 0x03, 0x43, 0x02, 0x00, 0x01, 0x00]);
        assert_eq!(packets.len(), 1);
        let p = &packets[0];
        assert_eq!(p.mt, MessageType::Response);
        assert_eq!(p.pbf, Pbf::Final);
        assert_eq!((p.gid, p.oid), (3, 2));
        assert_eq!(p.payload, vec![0x00]);
    }

    #[test]
    fn packets_split_across_pushes() {
        let mut dec = FrameDecoder::new();
        assert!(dec.push(&[0x61, 0x02, 0x00]).is_empty());
        assert!(dec.push(&[0x03, 0xAA]).is_empty());
        let packets = dec.push(&[0xBB, 0xCC, 0x43, 0x00, 0x00, 0x00]);
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[0].mt, MessageType::Notification);
        assert_eq!(packets[0].payload, vec![0xAA, 0xBB, 0xCC]);
        assert_eq!(packets[1].mt, MessageType::Response);
        assert!(packets[1].payload.is_empty());
    }

    #[test]
    fn data_packets_pass_once_synchronized() {
        let mut dec = FrameDecoder::new();
        // Sync on a response first, then a data packet with 16-bit length
        let mut stream = vec![0x40, 0x00, 0x00, 0x00];
        stream.extend_from_slice(&[0x02, 0x00, 0x05, 0x00]);
        stream.extend_from_slice(&[1, 2, 3, 4, 5]);
        let packets = dec.push(&stream);
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[1].mt, MessageType::DataPacket);
        assert_eq!(packets[1].gid, 2); // DPF nibble
        assert_eq!(packets[1].payload, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn unknown_mt_flushes_and_desynchronizes() {
        let mut dec = FrameDecoder::new();
        assert!(dec.push(&[0x40, 0x00, 0x00, 0x00]).len() == 1);
        // 0x9F has mt=4 (unknown): everything is flushed, resync required
        assert!(dec.push(&[0x9F, 0xFF, 0xFF, 0xFF, 0xFF]).is_empty());
        let packets = dec.push(&[0x12, 0x43, 0x02, 0x00, 0x01, 0x00]);
        assert_eq!(packets.len(), 1);
        assert_eq!((packets[0].gid, packets[0].oid), (3, 2));
    }
}
