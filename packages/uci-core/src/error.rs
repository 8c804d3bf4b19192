use std::time::Duration;

use thiserror::Error;

/// Coarse communication status, numerically aligned with the process
/// exit-code mapping in [`crate::errno`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ComStatus {
    Ok = 0,
    UnknownPort = 1,
    UnknownProtocol = 2,
    TimeoutError = 3,
    ProtocolError = 4,
    Error = 9,
}

/// Library error type.
///
/// Four kinds, never mixed: transport (port resolution, i/o, timeout),
/// protocol (header fields out of range, response mismatch, fragment
/// sequence), parameter/value (bad tag, bad length, overflow) and registry
/// (addin load). A non-Ok device `Status` is *not* an error — domain
/// operations return it to the caller.
#[derive(Debug, Error)]
pub enum UciError {
    // ── Transport ──
    #[error("\"{0}\" is not supported by any registered transport")]
    UnknownPort(String),
    #[error("unknown protocol scheme in \"{0}\"")]
    UnknownProtocol(String),
    #[error("no response from the device ({} ms timeout)", .0.as_millis())]
    Timeout(Duration),
    #[error("transport i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("transport is closed")]
    Closed,

    // ── Protocol ──
    #[error("protocol error: {0}")]
    Protocol(String),

    // ── Parameter / value ──
    #[error("invalid parameter: {0}")]
    InvalidParam(String),
    #[error("bad length for tag {tag:#04x}: declared {expected}, got {got}")]
    BadLength {
        tag: u8,
        expected: usize,
        got: usize,
    },
    #[error("wanting {wanted} bytes, got only {available}")]
    Underflow { wanted: usize, available: usize },
    #[error("\"{0}\" does not match any calibration parameter")]
    UnknownCalKey(String),

    // ── Registry / addin load ──
    #[error("registry: {0}")]
    Registry(String),
}

impl UciError {
    pub fn com_status(&self) -> ComStatus {
        match self {
            UciError::UnknownPort(_) => ComStatus::UnknownPort,
            UciError::UnknownProtocol(_) => ComStatus::UnknownProtocol,
            UciError::Timeout(_) => ComStatus::TimeoutError,
            UciError::Protocol(_) => ComStatus::ProtocolError,
            _ => ComStatus::Error,
        }
    }
}

pub type Result<T> = std::result::Result<T, UciError>;
