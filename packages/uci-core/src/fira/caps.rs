//! Device capability decoding (`CORE_GET_CAPS_INFO`).
//!
//! The response is a list of capability TLVs; each known tag has its own
//! decoder. Unknown tags are preserved raw so a newer firmware does not
//! break an older host.

use bitflags::bitflags;
use tracing::warn;

use crate::buffer::Buffer;
use crate::error::Result;
use crate::open_enum;

use super::Status;

open_enum! {
    pub enum CapsParam {
        MaxMessageSize = 0x00,
        MaxDataPacketPayloadSize = 0x01,
        FiraPhyVersionRange = 0x02,
        FiraMacVersionRange = 0x03,
        DeviceRoles = 0x04,
        RangingMethod = 0x05,
        StsConfig = 0x06,
        MultiNodeMode = 0x07,
        RangingTimeStruct = 0x08,
        ScheduleMode = 0x09,
        HoppingMode = 0x0A,
        BlockStriding = 0x0B,
        UwbInitiationTime = 0x0C,
        Channels = 0x0D,
        RframeConfig = 0x0E,
        CcConstraintLength = 0x0F,
        BprfParameterSets = 0x10,
        HprfParameterSets = 0x11,
        AoaSupport = 0x12,
        ExtendedMacAddress = 0x13,
        SessionKeyLength = 0x14,
        DtAnchorMaxActiveRr = 0x15,
        DtTagMaxActiveRr = 0x16,
        DtTagBlockSkipping = 0x17,
        DeviceType = 0x18,
    }
}

// ─── Flag sets ────────────────────────────────────────────────────────────────

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DeviceTypeCaps: u8 {
        const CONTROLLER = 0x01;
        const CONTROLEE = 0x02;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DeviceRoleCaps: u16 {
        const RESPONDER = 0x0001;
        const INITIATOR = 0x0002;
        const ADVERTISER = 0x0020;
        const OBSERVER = 0x0040;
        const DT_ANCHOR = 0x0080;
        const DT_TAG = 0x0100;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RangingMethodCaps: u16 {
        const OWR_UL_TDOA = 0x0001;
        const SS_TWR_DEFERRED = 0x0002;
        const DS_TWR_DEFERRED = 0x0004;
        const SS_TWR_NON_DEFERRED = 0x0008;
        const DS_TWR_NON_DEFERRED = 0x0010;
        const OWR_DL_TDOA = 0x0020;
        const OWR_AOA = 0x0040;
        const ESS_TWR_NON_DEFERRED_CONTENTION = 0x0080;
        const ADS_TWR_CONTENTION = 0x0100;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StsConfigCaps: u8 {
        const STATIC = 0x01;
        const DYNAMIC = 0x02;
        const DYNAMIC_RESPONDER_SUB_SESSION_KEY = 0x04;
        const PROVISIONED = 0x08;
        const PROVISIONED_RESPONDER_SUB_SESSION_KEY = 0x10;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MultiNodeCaps: u8 {
        const UNICAST = 0x01;
        const ONE_TO_MANY = 0x02;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ScheduleModeCaps: u8 {
        const CONTENTION_BASED = 0x01;
        const TIME_SCHEDULED = 0x02;
        const HYBRID = 0x04;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AoaCaps: u8 {
        const AZIMUTH_90 = 0x01;
        const AZIMUTH_180 = 0x02;
        const ELEVATION = 0x04;
        const FOM = 0x08;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SessionKeyLengthCaps: u8 {
        const DYNAMIC_STS_256 = 0x01;
        const PROVISIONED_STS_256 = 0x02;
    }
}

/// Channel support bitmap. Bit order follows the FiRa channel list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelCaps(pub u8);

impl ChannelCaps {
    const CHANNEL_NUMBERS: [u8; 8] = [5, 6, 8, 9, 10, 12, 13, 14];

    pub fn supported_channels(self) -> Vec<u8> {
        Self::CHANNEL_NUMBERS
            .iter()
            .enumerate()
            .filter(|(i, _)| self.0 & (1 << i) != 0)
            .map(|(_, ch)| *ch)
            .collect()
    }
}

/// Lower/higher version bound pair, e.g. "1.1" to "2.0".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionRange {
    pub lower_major: u8,
    pub lower_minor: u8,
    pub higher_major: u8,
    pub higher_minor: u8,
}

impl VersionRange {
    fn from_bytes(v: &[u8]) -> Option<Self> {
        (v.len() >= 4).then(|| Self {
            lower_major: v[0],
            lower_minor: v[1],
            higher_major: v[2],
            higher_minor: v[3],
        })
    }

    pub fn lower(&self) -> String {
        format!("{}.{}", self.lower_major, self.lower_minor)
    }

    pub fn higher(&self) -> String {
        format!("{}.{}", self.higher_major, self.higher_minor)
    }
}

// ─── Decoded capabilities ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Capability {
    MaxMessageSize(u16),
    MaxDataPacketPayloadSize(u16),
    PhyVersionRange(VersionRange),
    MacVersionRange(VersionRange),
    DeviceType(DeviceTypeCaps),
    DeviceRoles(DeviceRoleCaps),
    RangingMethods(RangingMethodCaps),
    StsConfigs(StsConfigCaps),
    MultiNodeModes(MultiNodeCaps),
    BlockBasedScheduling(bool),
    ScheduleModes(ScheduleModeCaps),
    HoppingPreference(bool),
    BlockStridingPreference(bool),
    UwbInitiationTime(bool),
    Channels(ChannelCaps),
    /// SP0..SP3 frame config support flags.
    RframeConfigs(u8),
    /// Convolutional code constraint lengths, bit 0: K=3, bit 1: K=7.
    CcConstraintLengths(u8),
    /// BPRF parameter set support, sets 1..=6.
    BprfParameterSets(u8),
    /// HPRF parameter set support, sets 1..=35 packed over 5 bytes.
    HprfParameterSets(u64),
    AoaSupport(AoaCaps),
    ExtendedMacAddress(bool),
    SessionKeyLengths(SessionKeyLengthCaps),
    DtAnchorMaxActiveRangingRounds(u8),
    DtTagMaxActiveRangingRounds(u8),
    DtTagBlockSkipping(bool),
    Unknown { tag: u8, value: Vec<u8> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CapsInfo {
    pub status: Status,
    pub caps: Vec<Capability>,
}

impl CapsInfo {
    pub fn device_roles(&self) -> Option<DeviceRoleCaps> {
        self.caps.iter().find_map(|c| match c {
            Capability::DeviceRoles(r) => Some(*r),
            _ => None,
        })
    }

    pub fn dt_anchor_supported(&self) -> bool {
        self.device_roles()
            .is_some_and(|r| r.contains(DeviceRoleCaps::DT_ANCHOR))
    }

    pub fn dt_tag_supported(&self) -> bool {
        self.device_roles()
            .is_some_and(|r| r.contains(DeviceRoleCaps::DT_TAG))
    }

    /// Decode a `GET_CAPS_INFO` response payload: status, count, then
    /// capability TLVs.
    pub fn decode(payload: &[u8]) -> Result<CapsInfo> {
        let mut buf = Buffer::new(payload);
        let status = Status::from_value(buf.pop_u8()?);
        let count = buf.pop_u8()?;
        let mut caps = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let tag = buf.pop_u8()?;
            let len = buf.pop_u8()?;
            let value = buf.pop(len as usize)?;
            caps.push(decode_capability(tag, value));
        }
        if buf.remaining_size() > 0 {
            warn!(
                "{} trailing bytes after {count} capabilities",
                buf.remaining_size()
            );
        }
        Ok(CapsInfo { status, caps })
    }
}

pub struct CapsCodec;

impl crate::registry::MessageCodec for CapsCodec {
    fn decode(&self, payload: &[u8]) -> Result<crate::registry::UciMessage> {
        Ok(crate::registry::UciMessage::Caps(CapsInfo::decode(payload)?))
    }
}

fn uint_le(v: &[u8]) -> u64 {
    v.iter()
        .enumerate()
        .take(8)
        .fold(0, |acc, (i, b)| acc | (*b as u64) << (8 * i))
}

fn decode_capability(tag: u8, value: &[u8]) -> Capability {
    let unknown = || Capability::Unknown {
        tag,
        value: value.to_vec(),
    };
    if value.is_empty() {
        return unknown();
    }
    let flags = uint_le(value);
    match CapsParam::from_value(tag) {
        CapsParam::MaxMessageSize => Capability::MaxMessageSize(flags as u16),
        CapsParam::MaxDataPacketPayloadSize => Capability::MaxDataPacketPayloadSize(flags as u16),
        CapsParam::FiraPhyVersionRange => VersionRange::from_bytes(value)
            .map(Capability::PhyVersionRange)
            .unwrap_or_else(unknown),
        CapsParam::FiraMacVersionRange => VersionRange::from_bytes(value)
            .map(Capability::MacVersionRange)
            .unwrap_or_else(unknown),
        CapsParam::DeviceType => {
            Capability::DeviceType(DeviceTypeCaps::from_bits_truncate(value[0]))
        }
        CapsParam::DeviceRoles => {
            Capability::DeviceRoles(DeviceRoleCaps::from_bits_truncate(flags as u16))
        }
        CapsParam::RangingMethod => {
            Capability::RangingMethods(RangingMethodCaps::from_bits_truncate(flags as u16))
        }
        CapsParam::StsConfig => Capability::StsConfigs(StsConfigCaps::from_bits_truncate(value[0])),
        CapsParam::MultiNodeMode => {
            Capability::MultiNodeModes(MultiNodeCaps::from_bits_truncate(value[0]))
        }
        CapsParam::RangingTimeStruct => Capability::BlockBasedScheduling(value[0] & 0x02 != 0),
        CapsParam::ScheduleMode => {
            Capability::ScheduleModes(ScheduleModeCaps::from_bits_truncate(value[0]))
        }
        CapsParam::HoppingMode => Capability::HoppingPreference(value[0] & 0x01 != 0),
        CapsParam::BlockStriding => Capability::BlockStridingPreference(value[0] & 0x01 != 0),
        CapsParam::UwbInitiationTime => Capability::UwbInitiationTime(value[0] & 0x01 != 0),
        CapsParam::Channels => Capability::Channels(ChannelCaps(value[0])),
        CapsParam::RframeConfig => Capability::RframeConfigs(value[0] & 0x0F),
        CapsParam::CcConstraintLength => Capability::CcConstraintLengths(value[0] & 0x03),
        CapsParam::BprfParameterSets => Capability::BprfParameterSets(value[0] & 0x3F),
        CapsParam::HprfParameterSets => Capability::HprfParameterSets(flags),
        CapsParam::AoaSupport => Capability::AoaSupport(AoaCaps::from_bits_truncate(value[0])),
        CapsParam::ExtendedMacAddress => Capability::ExtendedMacAddress(value[0] & 0x01 != 0),
        CapsParam::SessionKeyLength => {
            Capability::SessionKeyLengths(SessionKeyLengthCaps::from_bits_truncate(value[0]))
        }
        CapsParam::DtAnchorMaxActiveRr => {
            Capability::DtAnchorMaxActiveRangingRounds(value[0] & 0x7F)
        }
        CapsParam::DtTagMaxActiveRr => Capability::DtTagMaxActiveRangingRounds(value[0]),
        CapsParam::DtTagBlockSkipping => Capability::DtTagBlockSkipping(value[0] != 0),
        CapsParam::Unknown(_) => unknown(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_typical_caps() {
        let payload = [
            0x00, // status Ok
            0x05, // 5 caps
            0x02, 0x04, 1, 1, 2, 0, // PHY 1.1..2.0
            0x04, 0x02, 0x83, 0x01, // roles: responder|initiator|dt-anchor|dt-tag
            0x05, 0x02, 0x06, 0x00, // methods: ss/ds twr deferred
            0x0D, 0x01, 0x08, // channels: bit3 -> channel 9
            0x7E, 0x02, 0xAA, 0xBB, // unknown tag preserved
        ];
        let info = CapsInfo::decode(&payload).unwrap();
        assert!(info.status.is_ok());
        assert_eq!(info.caps.len(), 5);
        assert!(matches!(
            info.caps[0],
            Capability::PhyVersionRange(VersionRange {
                lower_major: 1,
                higher_major: 2,
                ..
            })
        ));
        assert!(info.dt_anchor_supported());
        assert!(info.dt_tag_supported());
        assert!(matches!(
            info.caps[2],
            Capability::RangingMethods(m)
                if m == RangingMethodCaps::SS_TWR_DEFERRED | RangingMethodCaps::DS_TWR_DEFERRED
        ));
        assert!(
            matches!(&info.caps[3], Capability::Channels(c) if c.supported_channels() == vec![9])
        );
        assert!(matches!(
            &info.caps[4],
            Capability::Unknown { tag: 0x7E, value } if value == &vec![0xAA, 0xBB]
        ));
    }
}
