//! FiRa UCI generic specification support: enums, parameter tables,
//! structured message codecs and the domain operation set.

pub mod anchor;
pub mod app;
pub mod caps;
pub mod config;
mod enums;
pub mod msg;
pub mod ops;

pub use enums::*;
pub use ops::{Controlee, ControleeStatus, DtAnchorRound, FiraOps};

use std::sync::Arc;

use crate::error::Result;
use crate::framing::MessageType;
use crate::registry::{
    Addin, NoDataCodec, RegistryBuilder, SessionIdCodec, StatusCodec,
};

/// The base addin. Installs the FiRa parameter tables, a status-only
/// default codec for every declared response, and the structured codecs
/// that replace the defaults.
pub struct FiraAddin;

impl Addin for FiraAddin {
    fn name(&self) -> &'static str {
        "fira"
    }

    fn register(&self, builder: &mut RegistryBuilder) -> Result<()> {
        builder.install_table(config::device_config_table())?;
        builder.install_table(app::app_config_table())?;
        builder.install_table(app::test_config_table())?;

        // Default codec family over every declared (gid, oid) pair:
        // responses carry at least a status byte.
        let core_oids = [
            OidCore::DeviceReset,
            OidCore::GetDeviceInfo,
            OidCore::GetCapsInfo,
            OidCore::SetConfig,
            OidCore::GetConfig,
        ];
        for oid in core_oids {
            builder.register_default_codec(
                (MessageType::Response, Gid::Core.value(), oid.value()),
                Arc::new(StatusCodec),
            )?;
        }
        let session_oids = [
            OidSession::Init,
            OidSession::Deinit,
            OidSession::SetAppConfig,
            OidSession::GetAppConfig,
            OidSession::GetCount,
            OidSession::GetState,
            OidSession::UpdateControllerMulticastList,
            OidSession::UpdateDtAnchorRangingRounds,
        ];
        for oid in session_oids {
            builder.register_default_codec(
                (MessageType::Response, Gid::Session.value(), oid.value()),
                Arc::new(StatusCodec),
            )?;
        }
        for oid in [OidRanging::Start, OidRanging::Stop, OidRanging::GetRangingCount] {
            builder.register_default_codec(
                (MessageType::Response, Gid::Ranging.value(), oid.value()),
                Arc::new(StatusCodec),
            )?;
        }
        let test_oids = [
            OidTest::ConfigSet,
            OidTest::ConfigGet,
            OidTest::PeriodicTx,
            OidTest::PerRx,
            OidTest::Rx,
            OidTest::Loopback,
            OidTest::StopSession,
            OidTest::SsTwr,
        ];
        for oid in test_oids {
            builder.register_default_codec(
                (MessageType::Response, Gid::Test.value(), oid.value()),
                Arc::new(StatusCodec),
            )?;
        }

        // Command-side defaults for the session-id and no-data shapes
        builder.register_default_codec(
            (MessageType::Command, Gid::Session.value(), OidSession::Init.value()),
            Arc::new(SessionIdCodec),
        )?;
        builder.register_default_codec(
            (MessageType::Command, Gid::Core.value(), OidCore::GetDeviceInfo.value()),
            Arc::new(NoDataCodec),
        )?;

        // Structured codecs replace the defaults
        builder.register_codec(
            (MessageType::Response, Gid::Core.value(), OidCore::GetDeviceInfo.value()),
            Arc::new(msg::DeviceInfoCodec),
        )?;
        builder.register_codec(
            (MessageType::Response, Gid::Core.value(), OidCore::GetCapsInfo.value()),
            Arc::new(caps::CapsCodec),
        )?;
        builder.register_codec(
            (MessageType::Notification, Gid::Core.value(), OidCore::DeviceStatusNtf.value()),
            Arc::new(msg::DeviceStatusCodec),
        )?;
        builder.register_codec(
            (MessageType::Notification, Gid::Core.value(), OidCore::GenericErrorNtf.value()),
            Arc::new(StatusCodec),
        )?;
        builder.register_codec(
            (MessageType::Notification, Gid::Session.value(), OidSession::StatusNtf.value()),
            Arc::new(msg::SessionStatusCodec),
        )?;
        builder.register_codec(
            (MessageType::Notification, Gid::Ranging.value(), OidRanging::Start.value()),
            Arc::new(msg::RangeDataNtfCodec),
        )?;

        Ok(())
    }
}
