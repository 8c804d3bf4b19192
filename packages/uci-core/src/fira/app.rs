//! FiRa session (APP_CONFIG) and test (TEST_CONFIG) parameter definitions.

use crate::open_enum;
use crate::tlv::{LengthPolicy, ParamTable};

pub const APP_CONFIG: &str = "app_config";
pub const TEST_CONFIG: &str = "test_config";

open_enum! {
    /// Session application configuration tags.
    pub enum AppParam {
        DeviceType = 0x00,
        RangingRoundUsage = 0x01,
        StsConfig = 0x02,
        MultiNodeMode = 0x03,
        ChannelNumber = 0x04,
        NumberOfControlees = 0x05,
        DeviceMacAddress = 0x06,
        DstMacAddress = 0x07,
        SlotDuration = 0x08,
        /// Now called RANGING_DURATION.
        RangingInterval = 0x09,
        StsIndex = 0x0A,
        MacFcsType = 0x0B,
        RangingRoundControl = 0x0C,
        AoaResultReq = 0x0D,
        RangeDataNtfConfig = 0x0E,
        RangeDataNtfProximityNear = 0x0F,
        RangeDataNtfProximityFar = 0x10,
        DeviceRole = 0x11,
        RframeConfig = 0x12,
        RssiReporting = 0x13,
        PreambleCodeIndex = 0x14,
        SfdId = 0x15,
        PsduDataRate = 0x16,
        PreambleDuration = 0x17,
        LinkLayerMode = 0x18,
        DataRepetitionCount = 0x19,
        RangingTimeStruct = 0x1A,
        SlotsPerRr = 0x1B,
        SessionInfoNtfBoundAoa = 0x1D,
        ResponderSlotIndex = 0x1E,
        PrfMode = 0x1F,
        /// Contention-based ranging only.
        CapSizeRange = 0x20,
        ScheduleMode = 0x22,
        KeyRotation = 0x23,
        KeyRotationRate = 0x24,
        SessionPriority = 0x25,
        MacAddressMode = 0x26,
        VendorId = 0x27,
        StaticStsIv = 0x28,
        NumberOfStsSegments = 0x29,
        MaxRrRetry = 0x2A,
        UwbInitiationTime = 0x2B,
        HoppingMode = 0x2C,
        BlockStrideLength = 0x2D,
        ResultReportConfig = 0x2E,
        InBandTerminationAttemptCount = 0x2F,
        SubSessionId = 0x30,
        BprfPhrDataRate = 0x31,
        MaxNumberOfMeasurements = 0x32,
        UlTdoaTxInterval = 0x33,
        UlTdoaRandomWindow = 0x34,
        StsLength = 0x35,
        UlTdoaDeviceId = 0x38,
        UlTdoaTxTimestamp = 0x39,
        MinFramesPerRr = 0x3A,
        MtuSize = 0x3B,
        InterFrameInterval = 0x3C,
        DlTdoaRangingMethod = 0x3D,
        DlTdoaTxTimestampConf = 0x3E,
        DlTdoaHopCount = 0x3F,
        DlTdoaAnchorCfo = 0x40,
        DlTdoaAnchorLocation = 0x41,
        DlTdoaTxActiveRangingRounds = 0x42,
        DlTdoaBlockStriding = 0x43,
        DlTdoaTimeReferenceAnchor = 0x44,
        SessionKey = 0x45,
        SubSessionKey = 0x46,
        SessionDataTransferStatusNtfConfig = 0x47,
        DlTdoaResponderTof = 0x49,
        OwrAoaMeasurementNtfPeriod = 0x4D,
        HopModeKey = 0xA0,
        CccUwbTime0 = 0xA1,
        SelectedProtVer = 0xA3,
        SelectedUwbConfigId = 0xA4,
        SelectedShapeCombo = 0xA5,
        UrskTtl = 0xA6,
        CccStsIndex = 0xA8,
        MacMode = 0xA9,
        Ursk = 0xAA,
    }
}

/// The APP_CONFIG length table. `DstMacAddress` and `DeviceMacAddress` are
/// 2 bytes here; extended addressing goes through `MacAddressMode`.
/// `DlTdoaAnchorLocation` is variable (1, 11 or 13 bytes depending on the
/// presence/coordinate-type header, see [`crate::fira::anchor`]).
pub fn app_config_table() -> ParamTable {
    use LengthPolicy::{Either, Fixed, Var};
    let defs: &[(AppParam, LengthPolicy)] = &[
        (AppParam::DeviceType, Fixed(1)),
        (AppParam::RangingRoundUsage, Fixed(1)),
        (AppParam::StsConfig, Fixed(1)),
        (AppParam::MultiNodeMode, Fixed(1)),
        (AppParam::ChannelNumber, Fixed(1)),
        (AppParam::NumberOfControlees, Fixed(1)),
        (AppParam::DeviceMacAddress, Fixed(2)),
        (AppParam::DstMacAddress, Fixed(2)),
        (AppParam::SlotDuration, Fixed(2)),
        (AppParam::RangingInterval, Fixed(4)),
        (AppParam::StsIndex, Fixed(4)),
        (AppParam::MacFcsType, Fixed(1)),
        (AppParam::RangingRoundControl, Fixed(1)),
        (AppParam::AoaResultReq, Fixed(1)),
        (AppParam::RangeDataNtfConfig, Fixed(1)),
        (AppParam::RangeDataNtfProximityNear, Fixed(2)),
        (AppParam::RangeDataNtfProximityFar, Fixed(2)),
        (AppParam::DeviceRole, Fixed(1)),
        (AppParam::RframeConfig, Fixed(1)),
        (AppParam::RssiReporting, Fixed(1)),
        (AppParam::PreambleCodeIndex, Fixed(1)),
        (AppParam::SfdId, Fixed(1)),
        (AppParam::PsduDataRate, Fixed(1)),
        (AppParam::PreambleDuration, Fixed(1)),
        (AppParam::LinkLayerMode, Fixed(1)),
        (AppParam::DataRepetitionCount, Fixed(1)),
        (AppParam::RangingTimeStruct, Fixed(1)),
        (AppParam::SlotsPerRr, Fixed(1)),
        (AppParam::SessionInfoNtfBoundAoa, Fixed(8)),
        (AppParam::ResponderSlotIndex, Fixed(1)),
        (AppParam::PrfMode, Fixed(1)),
        (AppParam::CapSizeRange, Fixed(2)),
        (AppParam::ScheduleMode, Fixed(1)),
        (AppParam::KeyRotation, Fixed(1)),
        (AppParam::KeyRotationRate, Fixed(1)),
        (AppParam::SessionPriority, Fixed(1)),
        (AppParam::MacAddressMode, Fixed(1)),
        (AppParam::VendorId, Fixed(2)),
        (AppParam::StaticStsIv, Fixed(6)),
        (AppParam::NumberOfStsSegments, Fixed(1)),
        (AppParam::MaxRrRetry, Fixed(2)),
        (AppParam::UwbInitiationTime, Fixed(8)),
        (AppParam::HoppingMode, Fixed(1)),
        (AppParam::BlockStrideLength, Fixed(1)),
        (AppParam::ResultReportConfig, Fixed(1)),
        (AppParam::InBandTerminationAttemptCount, Fixed(1)),
        (AppParam::SubSessionId, Fixed(4)),
        (AppParam::BprfPhrDataRate, Fixed(1)),
        (AppParam::MaxNumberOfMeasurements, Fixed(2)),
        (AppParam::UlTdoaTxInterval, Fixed(4)),
        (AppParam::UlTdoaRandomWindow, Fixed(4)),
        (AppParam::StsLength, Fixed(1)),
        (AppParam::UlTdoaDeviceId, Fixed(1)),
        (AppParam::UlTdoaTxTimestamp, Fixed(1)),
        (AppParam::MinFramesPerRr, Fixed(1)),
        (AppParam::MtuSize, Fixed(2)),
        (AppParam::InterFrameInterval, Fixed(1)),
        (AppParam::DlTdoaRangingMethod, Fixed(1)),
        (AppParam::DlTdoaTxTimestampConf, Fixed(1)),
        (AppParam::DlTdoaHopCount, Fixed(1)),
        (AppParam::DlTdoaAnchorCfo, Fixed(1)),
        (AppParam::DlTdoaAnchorLocation, Var),
        (AppParam::DlTdoaTxActiveRangingRounds, Fixed(1)),
        (AppParam::DlTdoaBlockStriding, Fixed(1)),
        (AppParam::DlTdoaTimeReferenceAnchor, Fixed(1)),
        (AppParam::SessionKey, Either(16, 32)),
        (AppParam::SubSessionKey, Either(16, 32)),
        (AppParam::SessionDataTransferStatusNtfConfig, Fixed(1)),
        (AppParam::DlTdoaResponderTof, Fixed(1)),
        (AppParam::OwrAoaMeasurementNtfPeriod, Fixed(1)),
        (AppParam::HopModeKey, Fixed(16)),
        (AppParam::CccUwbTime0, Fixed(8)),
        (AppParam::SelectedProtVer, Fixed(2)),
        (AppParam::SelectedUwbConfigId, Fixed(2)),
        (AppParam::SelectedShapeCombo, Fixed(1)),
        (AppParam::UrskTtl, Fixed(2)),
        (AppParam::CccStsIndex, Fixed(4)),
        (AppParam::MacMode, Fixed(1)),
        (AppParam::Ursk, Fixed(32)),
    ];
    let raw: Vec<(u8, LengthPolicy)> = defs
        .iter()
        .map(|(p, policy)| (p.value(), policy.clone()))
        .collect();
    ParamTable::new(APP_CONFIG, &raw)
}

open_enum! {
    /// Test-mode configuration tags.
    pub enum TestParam {
        NumPackets = 0x00,
        TGap = 0x01,
        TStart = 0x02,
        TWin = 0x03,
        RandomizePsdu = 0x04,
        PhrRangingBit = 0x05,
        RMarkerTxStart = 0x06,
        RMarkerRxStart = 0x07,
        StsIndexAutoIncr = 0x08,
    }
}

pub fn test_config_table() -> ParamTable {
    use LengthPolicy::Fixed;
    let defs: &[(TestParam, LengthPolicy)] = &[
        (TestParam::NumPackets, Fixed(4)),
        (TestParam::TGap, Fixed(4)),
        (TestParam::TStart, Fixed(4)),
        (TestParam::TWin, Fixed(4)),
        (TestParam::RandomizePsdu, Fixed(1)),
        (TestParam::PhrRangingBit, Fixed(1)),
        (TestParam::RMarkerTxStart, Fixed(4)),
        (TestParam::RMarkerRxStart, Fixed(4)),
        (TestParam::StsIndexAutoIncr, Fixed(1)),
    ];
    let raw: Vec<(u8, LengthPolicy)> = defs
        .iter()
        .map(|(p, policy)| (p.value(), policy.clone()))
        .collect();
    ParamTable::new(TEST_CONFIG, &raw)
}
