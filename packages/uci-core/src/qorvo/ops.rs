//! Qorvo vendor operations: calibration storage, test modes.

use async_trait::async_trait;

use crate::buffer::Buffer;
use crate::client::Client;
use crate::error::{Result, UciError};
use crate::fira::{Gid, Status};
use crate::registry::registry;

use super::cal::CalValue;
use super::enums::{OidCalibration, OidConfigManager, OidVendorTest};
use super::msg::{CwTestOutput, PllLockTestOutput, RtcTestOutput, TofTestOutput};

fn pop_status(payload: &[u8]) -> Result<Status> {
    let mut buf = Buffer::new(payload);
    Ok(Status::from_value(buf.pop_u8()?))
}

fn push_key(out: &mut Vec<u8>, key: &str) -> Result<()> {
    if key.len() > u8::MAX as usize || !key.is_ascii() {
        return Err(UciError::InvalidParam(format!(
            "\"{key}\" is not a valid calibration key"
        )));
    }
    out.push(key.len() as u8);
    out.extend_from_slice(key.as_bytes());
    Ok(())
}

fn pop_key(buf: &mut Buffer<'_>) -> Result<String> {
    let len = buf.pop_u8()? as usize;
    buf.pop_str(len)
}

#[async_trait]
pub trait QorvoOps {
    /// Wipe the stored calibration back to factory state.
    async fn reset_calibration(&self) -> Result<Status>;

    /// Continuous-wave transmit test; `params` is the raw vendor test
    /// payload (channel, antenna, power index).
    async fn test_tx_cw(&self, params: &[u8]) -> Result<CwTestOutput>;
    async fn test_pll_lock(&self) -> Result<PllLockTestOutput>;
    async fn test_tof(&self, offset_code: i8) -> Result<TofTestOutput>;
    async fn test_rtc(&self, window_ms: u16) -> Result<RtcTestOutput>;

    /// Write calibration values while in test mode. Keys are validated
    /// against the calibration table before anything hits the wire.
    async fn test_mode_calibrations_set(
        &self,
        items: &[(&str, CalValue)],
    ) -> Result<(Status, Vec<(String, Status)>)>;
    async fn test_mode_calibrations_get(
        &self,
        keys: &[&str],
    ) -> Result<(Status, Vec<(String, CalValue)>)>;

    /// Read one calibration value from persistent storage.
    async fn get_cal(&self, key: &str) -> Result<(Status, CalValue)>;
}

#[async_trait]
impl QorvoOps for Client {
    async fn reset_calibration(&self) -> Result<Status> {
        let reply = self
            .command(
                Gid::ConfigManager.value(),
                OidConfigManager::ResetCalibration.value(),
                &[],
            )
            .await?;
        pop_status(&reply)
    }

    async fn test_tx_cw(&self, params: &[u8]) -> Result<CwTestOutput> {
        let reply = self
            .command(Gid::TestExtra.value(), OidVendorTest::TxCw.value(), params)
            .await?;
        CwTestOutput::decode(&reply)
    }

    async fn test_pll_lock(&self) -> Result<PllLockTestOutput> {
        let reply = self
            .command(Gid::TestExtra.value(), OidVendorTest::PllLock.value(), &[])
            .await?;
        PllLockTestOutput::decode(&reply)
    }

    async fn test_tof(&self, offset_code: i8) -> Result<TofTestOutput> {
        let reply = self
            .command(
                Gid::TestExtra.value(),
                OidVendorTest::Tof.value(),
                &[offset_code as u8],
            )
            .await?;
        TofTestOutput::decode(&reply)
    }

    async fn test_rtc(&self, window_ms: u16) -> Result<RtcTestOutput> {
        let reply = self
            .command(
                Gid::TestExtra.value(),
                OidVendorTest::Rtc.value(),
                &window_ms.to_le_bytes(),
            )
            .await?;
        RtcTestOutput::decode(&reply)
    }

    async fn test_mode_calibrations_set(
        &self,
        items: &[(&str, CalValue)],
    ) -> Result<(Status, Vec<(String, Status)>)> {
        let cal = registry().cal_table();
        let mut payload = vec![items.len() as u8];
        for (key, value) in items {
            let len = cal.length_of(key)?;
            let bytes = value.to_bytes(key, len)?;
            push_key(&mut payload, key)?;
            payload.push(bytes.len() as u8);
            payload.extend_from_slice(&bytes);
        }
        let reply = self
            .command(
                Gid::TestExtra.value(),
                OidVendorTest::CalibrationsSet.value(),
                &payload,
            )
            .await?;
        let mut buf = Buffer::new(&reply);
        let status = Status::from_value(buf.pop_u8()?);
        let mut results = Vec::new();
        if buf.remaining_size() > 0 {
            let count = buf.pop_u8()? as usize;
            for i in 0..count {
                let key = items
                    .get(i)
                    .map(|(k, _)| k.to_string())
                    .unwrap_or_default();
                results.push((key, Status::from_value(buf.pop_u8()?)));
            }
        }
        Ok((status, results))
    }

    async fn test_mode_calibrations_get(
        &self,
        keys: &[&str],
    ) -> Result<(Status, Vec<(String, CalValue)>)> {
        let cal = registry().cal_table();
        let mut payload = vec![keys.len() as u8];
        for key in keys {
            cal.length_of(key)?;
            push_key(&mut payload, key)?;
        }
        let reply = self
            .command(
                Gid::TestExtra.value(),
                OidVendorTest::CalibrationsGet.value(),
                &payload,
            )
            .await?;
        let mut buf = Buffer::new(&reply);
        let status = Status::from_value(buf.pop_u8()?);
        let mut values = Vec::new();
        if buf.remaining_size() > 0 {
            let count = buf.pop_u8()?;
            for _ in 0..count {
                let key = pop_key(&mut buf)?;
                let len = buf.pop_u8()? as usize;
                let bytes = buf.pop(len)?;
                let value = CalValue::from_bytes(&key, bytes);
                values.push((key, value));
            }
        }
        Ok((status, values))
    }

    async fn get_cal(&self, key: &str) -> Result<(Status, CalValue)> {
        registry().cal_table().length_of(key)?;
        let mut payload = Vec::new();
        push_key(&mut payload, key)?;
        let reply = self
            .command(Gid::Calibration.value(), OidCalibration::Get.value(), &payload)
            .await?;
        let mut buf = Buffer::new(&reply);
        let status = Status::from_value(buf.pop_u8()?);
        let value = match buf.remaining_size() {
            0 => CalValue::Bytes(Vec::new()),
            _ => {
                let len = buf.pop_u8()? as usize;
                CalValue::from_bytes(key, buf.pop(len)?)
            }
        };
        Ok((status, value))
    }
}
