//! Device-level configuration parameters.

use crate::open_enum;
use crate::tlv::{LengthPolicy, ParamTable};

pub const DEVICE_CONFIG: &str = "device_config";

open_enum! {
    pub enum ConfigParam {
        /// Device state, read-only.
        State = 0x00,
        /// 0: disable, 1: enable.
        LowPowerMode = 0x01,
    }
}

pub fn device_config_table() -> ParamTable {
    ParamTable::new(
        DEVICE_CONFIG,
        &[
            (ConfigParam::State.value(), LengthPolicy::Fixed(1)),
            (ConfigParam::LowPowerMode.value(), LengthPolicy::Fixed(1)),
        ],
    )
}
