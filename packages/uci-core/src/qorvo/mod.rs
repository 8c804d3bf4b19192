//! Qorvo vendor addin: calibration storage, diagnostics, test modes and the
//! vendor block of the device info response.

pub mod app;
pub mod cal;
pub mod diag;
mod enums;
pub mod msg;
pub mod ops;

pub use enums::*;
pub use ops::QorvoOps;

use std::sync::Arc;

use crate::error::{Result, UciError};
use crate::fira::Gid;
use crate::framing::MessageType;
use crate::registry::{Addin, RegistryBuilder, StatusCodec};

use cal::CalLen;

/// Extends the FiRa tables with the vendor tags, installs the calibration
/// key patterns and binds the diagnostic notification codec. Must load
/// after `fira`.
pub struct QorvoAddin;

impl Addin for QorvoAddin {
    fn name(&self) -> &'static str {
        "qorvo"
    }

    fn register(&self, builder: &mut RegistryBuilder) -> Result<()> {
        if !builder.is_loaded("fira") {
            return Err(UciError::Registry("requires the fira addin".into()));
        }

        app::register(builder)?;

        let cal = builder.cal_table_mut();
        cal.add(r"^xtal_trim$", CalLen::Fixed(1))?;
        cal.add(r"^temperature_reference$", CalLen::Fixed(1))?;
        cal.add(r"^restricted_channels$", CalLen::Fixed(2))?;
        cal.add(r"^wifi_coex_mode$", CalLen::Fixed(1))?;
        cal.add(r"^ant\d+\.port$", CalLen::Fixed(1))?;
        cal.add(r"^ant\d+\.ch\d+\.ant_delay$", CalLen::Fixed(4))?;
        cal.add(r"^ant\d+\.ch\d+\.tx_power_index$", CalLen::Fixed(4))?;
        cal.add(r"^ant\d+\.ch\d+\.pg_count$", CalLen::Fixed(1))?;
        cal.add(r"^ant\d+\.ch\d+\.pg_delay$", CalLen::Fixed(1))?;
        cal.add(r"^ant\d+\.ch\d+\.pdoa_offset$", CalLen::Fixed(2))?;
        cal.add(r"^pdoa_lut\d+\.data$", CalLen::Var)?;

        builder.register_codec(
            (
                MessageType::Notification,
                Gid::Qorvo.value(),
                OidQorvo::TestDiag.value(),
            ),
            Arc::new(diag::DiagNtfCodec),
        )?;
        builder.register_default_codec(
            (
                MessageType::Response,
                Gid::ConfigManager.value(),
                OidConfigManager::ResetCalibration.value(),
            ),
            Arc::new(StatusCodec),
        )?;

        builder.register_default_codec(
            (
                MessageType::Notification,
                Gid::Qorvo.value(),
                OidQorvo::TestDebugNtf.value(),
            ),
            Arc::new(StatusCodec),
        )?;

        Ok(())
    }
}
