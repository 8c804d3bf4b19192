//! QM33 customization variant.
//!
//! This addin strips the device-level parameters the QM33 SDK does not
//! expose. Kept separate from the qorvo addin because it conflicts with
//! other customer-specific variants; drop it from `UQT_ADDINS` when
//! targeting a different SDK build.

use crate::error::{Result, UciError};
use crate::fira::config::{ConfigParam, DEVICE_CONFIG};
use crate::registry::{Addin, RegistryBuilder};

pub struct CustomAddin;

impl Addin for CustomAddin {
    fn name(&self) -> &'static str {
        "custom"
    }

    fn register(&self, builder: &mut RegistryBuilder) -> Result<()> {
        if !builder.is_loaded("fira") {
            return Err(UciError::Registry("requires the fira addin".into()));
        }
        builder
            .table_mut(DEVICE_CONFIG)?
            .remove(ConfigParam::LowPowerMode.value());
        Ok(())
    }
}
