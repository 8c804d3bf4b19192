//! FiRa domain operations over the core client.
//!
//! The client only knows `command(gid, oid, bytes)`; everything
//! protocol-shaped lives in this extension trait so vendor addins can bring
//! their own operation set the same way without touching the client.

use async_trait::async_trait;
use tracing::warn;

use crate::buffer::Buffer;
use crate::client::Client;
use crate::error::{Result, UciError};
use crate::registry::registry;
use crate::tlv::{self, ParamValue, Tlv};

use super::app::{AppParam, TestParam, APP_CONFIG, TEST_CONFIG};
use super::caps::CapsInfo;
use super::config::{ConfigParam, DEVICE_CONFIG};
use super::msg::DeviceInfo;
use super::{
    Gid, MulticastControleeStatus, OidCore, OidRanging, OidSession, OidTest, RangingRole,
    SessionState, SessionType, Status, UpdateMulticastAction,
};

/// One controlee entry for a multicast-list update. The sub-session key is
/// required by the key-carrying actions and must be absent otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct Controlee {
    pub mac: u16,
    pub subsession_id: u32,
    pub subsession_key: Option<Vec<u8>>,
}

/// Per-controlee outcome of a multicast-list update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControleeStatus {
    pub mac: u16,
    pub subsession_id: u32,
    pub status: MulticastControleeStatus,
}

/// One ranging-round entry for `SESSION_UPDATE_DT_ANCHOR_RANGING_ROUNDS`.
#[derive(Debug, Clone, PartialEq)]
pub struct DtAnchorRound {
    pub round_index: u8,
    pub role: RangingRole,
    /// Initiator rounds only: responders addressed in this round.
    pub destination_macs: Option<Vec<u16>>,
    /// Initiator rounds only: one slot index per responder. When absent,
    /// slot assignment defaults to list order.
    pub slot_indexes: Option<Vec<u8>>,
}

fn pop_status(payload: &[u8]) -> Result<Status> {
    let mut buf = Buffer::new(payload);
    Ok(Status::from_value(buf.pop_u8()?))
}

fn status_pairs(payload: &[u8]) -> Result<Vec<(u8, Status)>> {
    if payload.is_empty() {
        return Ok(Vec::new());
    }
    Ok(tlv::status_list_from_bytes(payload)?
        .into_iter()
        .map(|(tag, status)| (tag, Status::from_value(status)))
        .collect())
}

/// Some firmwares answer an error status with no TLV block at all.
fn tlvs_or_empty(table: &crate::tlv::ParamTable, payload: &[u8]) -> Result<Vec<Tlv>> {
    if payload.is_empty() {
        return Ok(Vec::new());
    }
    tlv::tlvs_from_bytes(table, payload)
}

#[async_trait]
pub trait FiraOps {
    async fn reset(&self, reason: u8) -> Result<Status>;
    async fn get_device_info(&self) -> Result<DeviceInfo>;
    async fn get_caps(&self) -> Result<CapsInfo>;
    async fn set_config(
        &self,
        tvs: &[(ConfigParam, ParamValue)],
    ) -> Result<(Status, Vec<(u8, Status)>)>;
    async fn get_config(&self, params: &[ConfigParam]) -> Result<(Status, Vec<Tlv>)>;

    /// Returns the FiRa 2.0 session handle when the device provides one;
    /// FiRa 1.3 firmwares answer with the status alone and the session id
    /// keeps double duty as the handle.
    async fn session_init(&self, sid: u32, stype: SessionType) -> Result<(Status, Option<u32>)>;
    async fn session_deinit(&self, sid: u32) -> Result<Status>;
    async fn session_set_app_config(
        &self,
        sid: u32,
        params: &[(AppParam, ParamValue)],
    ) -> Result<(Status, Vec<(u8, Status)>)>;
    async fn session_get_app_config(
        &self,
        sid: u32,
        params: &[AppParam],
    ) -> Result<(Status, Vec<Tlv>)>;
    async fn session_get_count(&self) -> Result<(Status, u8)>;
    async fn session_get_state(&self, sid: u32) -> Result<(Status, SessionState)>;
    async fn session_update_multicast_list(
        &self,
        sid: u32,
        action: UpdateMulticastAction,
        controlees: &[Controlee],
    ) -> Result<(Status, Vec<ControleeStatus>)>;
    async fn session_update_dt_anchor_ranging_rounds(
        &self,
        sid: u32,
        rounds: &[DtAnchorRound],
    ) -> Result<(Status, Vec<u8>)>;

    async fn ranging_start(&self, sid: u32) -> Result<Status>;
    async fn ranging_stop(&self, sid: u32) -> Result<Status>;

    async fn test_config_set(
        &self,
        sid: u32,
        params: &[(TestParam, ParamValue)],
    ) -> Result<(Status, Vec<(u8, Status)>)>;
    async fn test_config_get(&self, sid: u32, params: &[TestParam])
        -> Result<(Status, Vec<Tlv>)>;
    async fn test_periodic_tx(&self, psdu: &[u8]) -> Result<Status>;
    async fn test_per_rx(&self, psdu: &[u8]) -> Result<Status>;
    async fn test_rx(&self) -> Result<Status>;
    async fn test_loopback(&self, psdu: &[u8]) -> Result<Status>;
    async fn test_stop_session(&self) -> Result<Status>;
    async fn test_ss_twr(&self) -> Result<Status>;
}

fn table(name: &str) -> Result<&'static crate::tlv::ParamTable> {
    registry()
        .param_table(name)
        .ok_or_else(|| UciError::Registry(format!("parameter table \"{name}\" is not loaded")))
}

#[async_trait]
impl FiraOps for Client {
    async fn reset(&self, reason: u8) -> Result<Status> {
        let payload = self
            .command(Gid::Core.value(), OidCore::DeviceReset.value(), &[reason])
            .await?;
        pop_status(&payload)
    }

    async fn get_device_info(&self) -> Result<DeviceInfo> {
        let payload = self
            .command(Gid::Core.value(), OidCore::GetDeviceInfo.value(), &[])
            .await?;
        DeviceInfo::decode(&payload)
    }

    async fn get_caps(&self) -> Result<CapsInfo> {
        let payload = self
            .command(Gid::Core.value(), OidCore::GetCapsInfo.value(), &[])
            .await?;
        CapsInfo::decode(&payload)
    }

    async fn set_config(
        &self,
        tvs: &[(ConfigParam, ParamValue)],
    ) -> Result<(Status, Vec<(u8, Status)>)> {
        let raw: Vec<(u8, ParamValue)> =
            tvs.iter().map(|(p, v)| (p.value(), v.clone())).collect();
        let payload = tlv::tvs_to_bytes(table(DEVICE_CONFIG)?, &raw)?;
        let reply = self
            .command(Gid::Core.value(), OidCore::SetConfig.value(), &payload)
            .await?;
        Ok((pop_status(&reply)?, status_pairs(&reply[1..])?))
    }

    async fn get_config(&self, params: &[ConfigParam]) -> Result<(Status, Vec<Tlv>)> {
        let tags: Vec<u8> = params.iter().map(|p| p.value()).collect();
        let reply = self
            .command(
                Gid::Core.value(),
                OidCore::GetConfig.value(),
                &tlv::list_to_bytes(&tags),
            )
            .await?;
        let status = pop_status(&reply)?;
        let tlvs = tlvs_or_empty(table(DEVICE_CONFIG)?, &reply[1..])?;
        Ok((status, tlvs))
    }

    async fn session_init(&self, sid: u32, stype: SessionType) -> Result<(Status, Option<u32>)> {
        let mut payload = sid.to_le_bytes().to_vec();
        payload.push(stype.value());
        let reply = self
            .command(Gid::Session.value(), OidSession::Init.value(), &payload)
            .await?;
        let mut buf = Buffer::new(&reply);
        let status = Status::from_value(buf.pop_u8()?);
        let handle = match buf.remaining_size() {
            0 => None,
            _ => Some(buf.pop_uint(4)? as u32),
        };
        Ok((status, handle))
    }

    async fn session_deinit(&self, sid: u32) -> Result<Status> {
        let reply = self
            .command(
                Gid::Session.value(),
                OidSession::Deinit.value(),
                &sid.to_le_bytes(),
            )
            .await?;
        let status = pop_status(&reply)?;
        if status.is_ok() {
            // Any data handler registered for this session goes with it
            self.remove_session_data_handlers(sid);
        }
        Ok(status)
    }

    async fn session_set_app_config(
        &self,
        sid: u32,
        params: &[(AppParam, ParamValue)],
    ) -> Result<(Status, Vec<(u8, Status)>)> {
        let raw: Vec<(u8, ParamValue)> =
            params.iter().map(|(p, v)| (p.value(), v.clone())).collect();
        let mut payload = sid.to_le_bytes().to_vec();
        payload.extend_from_slice(&tlv::tvs_to_bytes(table(APP_CONFIG)?, &raw)?);
        let reply = self
            .command(
                Gid::Session.value(),
                OidSession::SetAppConfig.value(),
                &payload,
            )
            .await?;
        Ok((pop_status(&reply)?, status_pairs(&reply[1..])?))
    }

    async fn session_get_app_config(
        &self,
        sid: u32,
        params: &[AppParam],
    ) -> Result<(Status, Vec<Tlv>)> {
        let tags: Vec<u8> = params.iter().map(|p| p.value()).collect();
        let mut payload = sid.to_le_bytes().to_vec();
        payload.extend_from_slice(&tlv::list_to_bytes(&tags));
        let reply = self
            .command(
                Gid::Session.value(),
                OidSession::GetAppConfig.value(),
                &payload,
            )
            .await?;
        let status = pop_status(&reply)?;
        let tlvs = tlvs_or_empty(table(APP_CONFIG)?, &reply[1..])?;
        Ok((status, tlvs))
    }

    async fn session_get_count(&self) -> Result<(Status, u8)> {
        let reply = self
            .command(Gid::Session.value(), OidSession::GetCount.value(), &[])
            .await?;
        let mut buf = Buffer::new(&reply);
        Ok((Status::from_value(buf.pop_u8()?), buf.pop_u8()?))
    }

    async fn session_get_state(&self, sid: u32) -> Result<(Status, SessionState)> {
        let reply = self
            .command(
                Gid::Session.value(),
                OidSession::GetState.value(),
                &sid.to_le_bytes(),
            )
            .await?;
        let mut buf = Buffer::new(&reply);
        Ok((
            Status::from_value(buf.pop_u8()?),
            SessionState::from_value(buf.pop_u8()?),
        ))
    }

    async fn session_update_multicast_list(
        &self,
        sid: u32,
        action: UpdateMulticastAction,
        controlees: &[Controlee],
    ) -> Result<(Status, Vec<ControleeStatus>)> {
        let key_len = match action {
            UpdateMulticastAction::AddWithShortSubSessionKey => Some(16),
            UpdateMulticastAction::AddWithExtendedSubSessionKey => Some(32),
            _ => None,
        };
        let mut payload = sid.to_le_bytes().to_vec();
        payload.push(action.value());
        payload.push(controlees.len() as u8);
        for controlee in controlees {
            payload.extend_from_slice(&controlee.mac.to_le_bytes());
            payload.extend_from_slice(&controlee.subsession_id.to_le_bytes());
            match (key_len, controlee.subsession_key.as_deref()) {
                (None, None) => {}
                (Some(len), Some(key)) if key.len() == len => payload.extend_from_slice(key),
                (Some(len), _) => {
                    return Err(UciError::InvalidParam(format!(
                        "controlee {:#06x} needs a {len}-byte sub-session key for {action}",
                        controlee.mac
                    )));
                }
                (None, Some(_)) => {
                    return Err(UciError::InvalidParam(format!(
                        "controlee {:#06x} carries a sub-session key but {action} takes none",
                        controlee.mac
                    )));
                }
            }
        }
        let reply = self
            .command(
                Gid::Session.value(),
                OidSession::UpdateControllerMulticastList.value(),
                &payload,
            )
            .await?;
        let mut buf = Buffer::new(&reply);
        let status = Status::from_value(buf.pop_u8()?);
        let mut statuses = Vec::new();
        if buf.remaining_size() > 0 {
            let count = buf.pop_u8()?;
            for _ in 0..count {
                statuses.push(ControleeStatus {
                    mac: buf.pop_uint(2)? as u16,
                    subsession_id: buf.pop_uint(4)? as u32,
                    status: MulticastControleeStatus::from_value(buf.pop_u8()?),
                });
            }
        }
        Ok((status, statuses))
    }

    async fn session_update_dt_anchor_ranging_rounds(
        &self,
        sid: u32,
        rounds: &[DtAnchorRound],
    ) -> Result<(Status, Vec<u8>)> {
        let mut payload = sid.to_le_bytes().to_vec();
        payload.push(rounds.len() as u8);
        for round in rounds {
            payload.push(round.round_index);
            payload.push(round.role.value());
            if round.role != RangingRole::Initiator {
                continue;
            }
            let macs = round.destination_macs.as_deref().unwrap_or(&[]);
            payload.push(macs.len() as u8);
            for mac in macs {
                payload.extend_from_slice(&mac.to_le_bytes());
            }
            match round.slot_indexes.as_deref() {
                Some(slots) if slots.len() == macs.len() => {
                    payload.push(1);
                    payload.extend_from_slice(slots);
                }
                Some(slots) => {
                    return Err(UciError::InvalidParam(format!(
                        "round {} declares {} destinations but {} slot indexes",
                        round.round_index,
                        macs.len(),
                        slots.len()
                    )));
                }
                None => {
                    warn!(
                        "round {}: no slot indexes given, slot assignment defaults to list order",
                        round.round_index
                    );
                    payload.push(0);
                }
            }
        }
        let reply = self
            .command(
                Gid::Session.value(),
                OidSession::UpdateDtAnchorRangingRounds.value(),
                &payload,
            )
            .await?;
        let mut buf = Buffer::new(&reply);
        let status = Status::from_value(buf.pop_u8()?);
        let rejected = match buf.remaining_size() {
            0 => Vec::new(),
            _ => {
                let count = buf.pop_u8()? as usize;
                buf.pop(count)?.to_vec()
            }
        };
        Ok((status, rejected))
    }

    async fn ranging_start(&self, sid: u32) -> Result<Status> {
        let reply = self
            .command(
                Gid::Ranging.value(),
                OidRanging::Start.value(),
                &sid.to_le_bytes(),
            )
            .await?;
        pop_status(&reply)
    }

    async fn ranging_stop(&self, sid: u32) -> Result<Status> {
        let reply = self
            .command(
                Gid::Ranging.value(),
                OidRanging::Stop.value(),
                &sid.to_le_bytes(),
            )
            .await?;
        pop_status(&reply)
    }

    async fn test_config_set(
        &self,
        sid: u32,
        params: &[(TestParam, ParamValue)],
    ) -> Result<(Status, Vec<(u8, Status)>)> {
        let raw: Vec<(u8, ParamValue)> =
            params.iter().map(|(p, v)| (p.value(), v.clone())).collect();
        let mut payload = sid.to_le_bytes().to_vec();
        payload.extend_from_slice(&tlv::tvs_to_bytes(table(TEST_CONFIG)?, &raw)?);
        let reply = self
            .command(Gid::Test.value(), OidTest::ConfigSet.value(), &payload)
            .await?;
        Ok((pop_status(&reply)?, status_pairs(&reply[1..])?))
    }

    async fn test_config_get(
        &self,
        sid: u32,
        params: &[TestParam],
    ) -> Result<(Status, Vec<Tlv>)> {
        let tags: Vec<u8> = params.iter().map(|p| p.value()).collect();
        let mut payload = sid.to_le_bytes().to_vec();
        payload.extend_from_slice(&tlv::list_to_bytes(&tags));
        let reply = self
            .command(Gid::Test.value(), OidTest::ConfigGet.value(), &payload)
            .await?;
        let status = pop_status(&reply)?;
        let tlvs = tlvs_or_empty(table(TEST_CONFIG)?, &reply[1..])?;
        Ok((status, tlvs))
    }

    async fn test_periodic_tx(&self, psdu: &[u8]) -> Result<Status> {
        let reply = self
            .command(Gid::Test.value(), OidTest::PeriodicTx.value(), psdu)
            .await?;
        pop_status(&reply)
    }

    async fn test_per_rx(&self, psdu: &[u8]) -> Result<Status> {
        let reply = self
            .command(Gid::Test.value(), OidTest::PerRx.value(), psdu)
            .await?;
        pop_status(&reply)
    }

    async fn test_rx(&self) -> Result<Status> {
        let reply = self.command(Gid::Test.value(), OidTest::Rx.value(), &[]).await?;
        pop_status(&reply)
    }

    async fn test_loopback(&self, psdu: &[u8]) -> Result<Status> {
        let reply = self
            .command(Gid::Test.value(), OidTest::Loopback.value(), psdu)
            .await?;
        pop_status(&reply)
    }

    async fn test_stop_session(&self) -> Result<Status> {
        let reply = self
            .command(Gid::Test.value(), OidTest::StopSession.value(), &[])
            .await?;
        pop_status(&reply)
    }

    async fn test_ss_twr(&self) -> Result<Status> {
        let reply = self
            .command(Gid::Test.value(), OidTest::SsTwr.value(), &[])
            .await?;
        pop_status(&reply)
    }
}
