//! Qorvo vendor message decoding: the vendor block of `GET_DEVICE_INFO` and
//! the vendor test-mode outputs.

use bitflags::bitflags;
use serde::Serialize;
use tracing::warn;

use crate::buffer::Buffer;
use crate::error::Result;
use crate::fira::msg::DeviceInfo;
use crate::fira::Status;

/// Vendor block of the device info response: QMF/OEM versions, CI build
/// job, silicon identifiers. Firmwares ship this block at varying lengths;
/// everything past the versions is optional.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VendorDeviceInfo {
    pub qmf_version: String,
    pub oem_version: String,
    pub build_job_id: Option<u32>,
    pub soc_id: Option<String>,
    pub device_id: Option<u32>,
    pub packaging_id: Option<u8>,
}

impl VendorDeviceInfo {
    /// Interpret the vendor bytes of a device info response. `None` when
    /// the block is too short to even carry the versions.
    pub fn parse(info: &DeviceInfo) -> Option<Self> {
        let mut buf = Buffer::new(&info.vendor_data);
        let qmf = buf.pop(3).ok()?;
        let oem = buf.pop(3).ok()?;
        let mut out = Self {
            qmf_version: format!("{}.{}.{}", qmf[0], qmf[1], qmf[2]),
            oem_version: format!("{}.{}.{}", oem[0], oem[1], oem[2]),
            build_job_id: None,
            soc_id: None,
            device_id: None,
            packaging_id: None,
        };
        out.build_job_id = buf.pop_uint(4).ok().map(|v| v as u32);
        out.soc_id = buf.pop(16).ok().map(hex::encode);
        out.device_id = buf.pop_uint(4).ok().map(|v| v as u32);
        out.packaging_id = buf.pop_u8().ok();
        if buf.remaining_size() > 0 {
            warn!(
                "{} trailing bytes in the vendor device info block",
                buf.remaining_size()
            );
        }
        Some(out)
    }
}

// ─── Test-mode outputs ────────────────────────────────────────────────────────

bitflags! {
    /// PLL lock diagnostic bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PllLockStatusMask: u8 {
        const PLL_LOCKED = 0x01;
        const XTAL_STABLE = 0x02;
        const CLOCK_PLL_CAL_DONE = 0x04;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PllLockTestOutput {
    pub status: Status,
    pub lock: PllLockStatusMask,
}

impl PllLockTestOutput {
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let mut buf = Buffer::new(payload);
        Ok(Self {
            status: Status::from_value(buf.pop_u8()?),
            lock: PllLockStatusMask::from_bits_truncate(buf.pop_u8()?),
        })
    }

    pub fn locked(&self) -> bool {
        self.lock.contains(PllLockStatusMask::PLL_LOCKED)
    }
}

/// Time-of-flight self test: round-trip time in Ranging Ticks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TofTestOutput {
    pub status: Status,
    pub tof_ticks: u32,
}

impl TofTestOutput {
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let mut buf = Buffer::new(payload);
        Ok(Self {
            status: Status::from_value(buf.pop_u8()?),
            tof_ticks: buf.pop_uint(4)? as u32,
        })
    }
}

/// RTC-versus-UWB clock comparison over the test window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RtcTestOutput {
    pub status: Status,
    pub rtc_ticks: u32,
    pub uwb_ticks: u32,
}

impl RtcTestOutput {
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let mut buf = Buffer::new(payload);
        Ok(Self {
            status: Status::from_value(buf.pop_u8()?),
            rtc_ticks: buf.pop_uint(4)? as u32,
            uwb_ticks: buf.pop_uint(4)? as u32,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CwTestOutput {
    pub status: Status,
}

impl CwTestOutput {
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let mut buf = Buffer::new(payload);
        Ok(Self {
            status: Status::from_value(buf.pop_u8()?),
        })
    }
}
