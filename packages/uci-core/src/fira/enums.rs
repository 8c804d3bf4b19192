//! FiRa protocol enums.
//!
//! All of these are open: vendor addins may pair further values with display
//! names through the registry, and unknown inbound values decode to
//! `Unknown(v)` instead of failing.

use crate::open_enum;

open_enum! {
    /// UCI group identifiers. 0x9..0xF are proprietary groups.
    pub enum Gid {
        Core = 0x00,
        Session = 0x01,
        Ranging = 0x02,
        Se = 0x09,
        Qorvo = 0x0B,
        Calibration = 0x0C,
        Test = 0x0D,
        TestExtra = 0x0E,
        ConfigManager = 0x0F,
    }
}

open_enum! {
    pub enum OidCore {
        DeviceReset = 0x00,
        DeviceStatusNtf = 0x01,
        GetDeviceInfo = 0x02,
        GetCapsInfo = 0x03,
        SetConfig = 0x04,
        GetConfig = 0x05,
        GenericErrorNtf = 0x07,
    }
}

open_enum! {
    pub enum OidSession {
        Init = 0x00,
        Deinit = 0x01,
        StatusNtf = 0x02,
        SetAppConfig = 0x03,
        GetAppConfig = 0x04,
        GetCount = 0x05,
        GetState = 0x06,
        UpdateControllerMulticastList = 0x07,
        UpdateDtAnchorRangingRounds = 0x08,
    }
}

open_enum! {
    /// `Start` doubles as the `SESSION_INFO` (range data) notification
    /// opcode.
    pub enum OidRanging {
        Start = 0x00,
        Stop = 0x01,
        GetRangingCount = 0x03,
    }
}

open_enum! {
    pub enum OidTest {
        ConfigSet = 0x00,
        ConfigGet = 0x01,
        PeriodicTx = 0x02,
        PerRx = 0x03,
        Rx = 0x05,
        Loopback = 0x06,
        StopSession = 0x07,
        SsTwr = 0x08,
    }
}

open_enum! {
    /// UCI status byte. Returned to callers, never raised as an error.
    pub enum Status {
        Ok = 0x00,
        Rejected = 0x01,
        Failed = 0x02,
        SyntaxErr = 0x03,
        InvalidParam = 0x04,
        InvalidRange = 0x05,
        InvalidMessageSize = 0x06,
        UnknownGid = 0x07,
        UnknownOid = 0x08,
        ReadOnly = 0x09,
        CommandRetry = 0x0A,
        ErrorSessionNotExist = 0x11,
        ErrorSessionDuplicate = 0x12,
        ErrorSessionActive = 0x13,
        ErrorMaxSessionsExceeded = 0x14,
        ErrorSessionNotConfigured = 0x15,
        ErrorActiveSessionsOngoing = 0x16,
        ErrorMulticastListFull = 0x17,
        ErrorAddressNotFound = 0x18,
        ErrorAddressAlreadyPresent = 0x19,
        RangingTxFailed = 0x20,
        RangingRxTimeout = 0x21,
        RangingRxPhyDecFailed = 0x22,
        RangingRxPhyToaFailed = 0x23,
        RangingRxPhyStsFailed = 0x24,
        RangingRxMacDecFailed = 0x25,
        RangingRxMacIeDecFailed = 0x26,
        RangingRxMacIeMissing = 0x27,
    }
}

impl Status {
    pub fn is_ok(self) -> bool {
        self == Status::Ok
    }
}

open_enum! {
    pub enum DeviceState {
        Ready = 0x01,
        Active = 0x02,
        Error = 0xFF,
    }
}

open_enum! {
    /// Session lifecycle. `Init → Idle ↔ Active → DeInit`, pushed by the
    /// radio through `SESSION_STATUS_NTF`; the host only records it.
    pub enum SessionState {
        Init = 0x00,
        DeInit = 0x01,
        Active = 0x02,
        Idle = 0x03,
    }
}

open_enum! {
    pub enum SessionStateChangeReason {
        StateChangeWithSessionManagementCommands = 0x00,
        MaxRangingRoundRetryCountReached = 0x01,
        MaxNumberOfMeasurementsReached = 0x02,
        SessionStoppedDueToInbandSignal = 0x03,
        SessionSuspendedDueToInbandSignal = 0x04,
        SessionResumedDueToInbandSignal = 0x05,
        ErrorSlotLengthNotSupported = 0x20,
        ErrorInsufficientSlotsPerRr = 0x21,
        ErrorMacAddressModeNotSupported = 0x22,
        ErrorInvalidRangingInterval = 0x23,
        ErrorInvalidStsConfig = 0x24,
        ErrorInvalidRframeConfig = 0x25,
    }
}

open_enum! {
    pub enum SessionType {
        Ranging = 0x00,
        RangingAndData = 0x01,
        DataTransfer = 0x02,
        Ccc = 0xA0,
        DeviceTestMode = 0xD0,
    }
}

open_enum! {
    pub enum DeviceType {
        Controlee = 0x00,
        Controller = 0x01,
    }
}

open_enum! {
    pub enum DeviceRole {
        Responder = 0x00,
        Initiator = 0x01,
    }
}

open_enum! {
    pub enum RangingMeasurementType {
        OwrUlTdoa = 0x00,
        TwoWay = 0x01,
        OwrDlTdoa = 0x02,
        OwrAoa = 0x03,
    }
}

open_enum! {
    pub enum MacAddressMode {
        Short = 0x00,
        Mixed = 0x01,
        Extended = 0x02,
    }
}

open_enum! {
    pub enum UpdateMulticastAction {
        Add = 0x00,
        Delete = 0x01,
        AddWithShortSubSessionKey = 0x02,
        AddWithExtendedSubSessionKey = 0x03,
    }
}

open_enum! {
    pub enum MulticastControleeStatus {
        OkMulticastListUpdate = 0x00,
        ErrorMulticastListFull = 0x01,
        ErrorKeyFetchFail = 0x02,
        ErrorSubSessionIdNotFound = 0x03,
        ErrorSubSessionKeyNotFound = 0x04,
        ErrorSubSessionKeyNotApplicable = 0x05,
        ErrorSessionKeyNotFound = 0x06,
        ErrorAddressNotFound = 0x07,
        ErrorAddressAlreadyPresent = 0x08,
    }
}

open_enum! {
    pub enum AoaType {
        XAxis = 0x00,
        YAxis = 0x01,
        ZAxis = 0x02,
    }
}

open_enum! {
    /// Role of a DT-Anchor in one ranging round.
    pub enum RangingRole {
        Responder = 0x00,
        Initiator = 0x01,
    }
}

open_enum! {
    pub enum DlTdoaMessageType {
        Poll = 0x00,
        Response = 0x01,
        FinalMsg = 0x02,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_and_unknown_values() {
        assert_eq!(Status::from_value(0x00), Status::Ok);
        assert_eq!(Status::from_value(0x11), Status::ErrorSessionNotExist);
        assert_eq!(Status::from_value(0x7E), Status::Unknown(0x7E));
        assert_eq!(Status::Unknown(0x7E).value(), 0x7E);
        assert_eq!(SessionState::from_value(2), SessionState::Active);
        assert_eq!(
            SessionStateChangeReason::from_value(4),
            SessionStateChangeReason::SessionSuspendedDueToInbandSignal
        );
    }

    #[test]
    fn display_names() {
        assert_eq!(Status::Ok.to_string(), "Ok");
        assert_eq!(Gid::Qorvo.to_string(), "Qorvo");
        assert_eq!(Status::Unknown(0x7E).to_string(), "Unknown(0x7e)");
    }
}
