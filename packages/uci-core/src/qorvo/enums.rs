//! Qorvo vendor opcode groups.

use crate::open_enum;

open_enum! {
    /// Proprietary test/debug notification group (GID 0xB).
    pub enum OidQorvo {
        TestDebugNtf = 0x00,
        TestDiag = 0x01,
    }
}

open_enum! {
    /// Calibration storage group (GID 0xC).
    pub enum OidCalibration {
        Set = 0x00,
        Get = 0x01,
    }
}

open_enum! {
    /// Vendor test-mode group (GID 0xE).
    pub enum OidVendorTest {
        TxCw = 0x00,
        PllLock = 0x01,
        Tof = 0x02,
        Rtc = 0x03,
        CalibrationsSet = 0x04,
        CalibrationsGet = 0x05,
    }
}

open_enum! {
    /// Configuration manager group (GID 0xF).
    pub enum OidConfigManager {
        ResetCalibration = 0x00,
    }
}
