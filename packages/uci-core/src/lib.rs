//! # uci-core
//!
//! Host-side client for Ultra-Wideband ranging radios speaking the UCI
//! protocol (FiRa UCI generic specification, with Qorvo vendor extensions)
//! over a serial transport.
//!
//! ## Architecture
//!
//! - [`buffer`]: sequential payload reader and the `Qm.n` fixed-point type
//! - [`framing`]: packet encode, fragmentation, inbound resynchronization
//! - [`tlv`] + [`registry`]: length-policy-driven parameter codec and the
//!   process-wide codec/enum/table registries populated by addins
//! - [`transport`]: URL-resolved transports (`uart:<path>`, `/dev/uci`)
//!   with a reader task per connection
//! - [`client`]: one-command-in-flight request/response machine plus
//!   notification and data dispatch
//! - [`fira`] / [`qorvo`] / [`custom`]: the protocol addins
//!
//! ## Example
//!
//! ```no_run
//! use uci_core::{Client, FiraOps};
//! use uci_core::fira::SessionType;
//!
//! # async fn run() -> uci_core::Result<()> {
//! let client = Client::open("/dev/ttyUSB0").await?;
//! let (status, handle) = client.session_init(42, SessionType::Ranging).await?;
//! assert!(status.is_ok());
//! client.ranging_start(handle.unwrap_or(42)).await?;
//! # Ok(())
//! # }
//! ```

pub mod buffer;
pub mod client;
pub mod custom;
pub mod enums;
pub mod errno;
pub mod error;
pub mod fira;
pub mod framing;
pub mod qorvo;
pub mod registry;
pub mod tlv;
pub mod transport;

pub use client::{Client, ClientOptions};
pub use error::{ComStatus, Result, UciError};
pub use fira::{FiraOps, Status};
pub use framing::Dpf;
pub use qorvo::QorvoOps;
pub use registry::{registry, UciMessage};
