//! Process exit-code mapping.
//!
//! Front-end scripts compress any outcome into a single byte:
//!
//! | range   | meaning                              |
//! |---------|--------------------------------------|
//! | 0       | ok                                   |
//! | 1–149   | POSIX-style host errors              |
//! | 150–159 | transport errors (`150 + ComStatus`) |
//! | 160–199 | secure-element errors (reserved)     |
//! | 200–254 | UCI status (`200 + status byte`)     |

use crate::error::{ComStatus, UciError};
use crate::fira::Status;

const STATUS_BASE: u8 = 200;
const COM_BASE: u8 = 150;

pub fn errno_for_status(status: Status) -> u8 {
    match status {
        Status::Ok => 0,
        other => STATUS_BASE.saturating_add(other.value()).min(u8::MAX - 1),
    }
}

pub fn errno_for_error(error: &UciError) -> u8 {
    if let UciError::Io(io) = error {
        let code = io.raw_os_error().unwrap_or(1);
        return code.clamp(1, 149) as u8;
    }
    match error.com_status() {
        ComStatus::Ok => 0,
        other => COM_BASE + other as u8,
    }
}

/// Collapse a domain operation outcome into an exit code.
pub fn uqt_errno(result: &Result<Status, UciError>) -> u8 {
    match result {
        Ok(status) => errno_for_status(*status),
        Err(error) => errno_for_error(error),
    }
}

/// Human-readable rendering of an exit code.
pub fn uqt_errmsg(errno: u8) -> String {
    match errno {
        0 => "Ok".to_string(),
        1..=149 => match errno {
            1 => "Error".to_string(),
            2 => "Syntax Error".to_string(),
            126 => "Command cannot execute".to_string(),
            127 => "Command not found".to_string(),
            other => format!("Host error {other:#x}"),
        },
        150..=159 => {
            let com = errno - COM_BASE;
            let name = match com {
                1 => "UnknownPort",
                2 => "UnknownProtocol",
                3 => "TimeoutError",
                4 => "ProtocolError",
                _ => "Error",
            };
            format!("ComStatus.{name} ({com:#x})")
        }
        160..=199 => format!("SecureElement error {:#x}", errno - 160),
        _ => {
            let status = Status::from_value(errno - STATUS_BASE);
            format!("Status.{status} ({:#x})", status.value())
        }
    }
}
