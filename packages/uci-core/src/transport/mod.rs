//! Transport abstraction.
//!
//! A transport writes UCI packets somewhere and runs a reader task that
//! pushes arriving raw bytes into the client's sink. Factories self-register
//! into a process-wide, append-only registry; the first factory whose
//! predicate accepts the URL wins.

pub mod dev;
pub mod uart;

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use std::sync::Mutex;
use tokio::sync::mpsc;

use crate::error::{Result, UciError};

/// Raw inbound bytes flow through this channel to the framing layer.
pub type RawSink = mpsc::Sender<Vec<u8>>;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Write one encoded UCI packet.
    async fn write(&self, packet: &[u8]) -> Result<()>;

    /// Cancel the blocking read, join the reader worker, drop the handle.
    /// Idempotent.
    async fn close(&self) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct TransportOptions {
    pub baudrate: u32,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self { baudrate: 115_200 }
    }
}

#[async_trait]
pub trait TransportFactory: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this factory can open `url`.
    fn can_handle(&self, url: &str) -> bool;

    async fn open(
        &self,
        url: &str,
        options: &TransportOptions,
        sink: RawSink,
    ) -> Result<Arc<dyn Transport>>;
}

static FACTORIES: Lazy<Mutex<Vec<Arc<dyn TransportFactory>>>> = Lazy::new(|| {
    // dev first: its exact-path claim must beat the uart existence check
    Mutex::new(vec![
        Arc::new(dev::DevFactory) as Arc<dyn TransportFactory>,
        Arc::new(uart::UartFactory),
    ])
});

/// Register an extra transport factory. The registry is append-only;
/// built-in factories keep precedence.
pub fn register_factory(factory: Arc<dyn TransportFactory>) {
    FACTORIES.lock().unwrap().push(factory);
}

/// Resolve and open the first transport whose predicate matches `url`.
pub async fn open(
    url: &str,
    options: &TransportOptions,
    sink: RawSink,
) -> Result<Arc<dyn Transport>> {
    let factory = {
        let factories = FACTORIES.lock().unwrap();
        factories.iter().find(|f| f.can_handle(url)).cloned()
    };
    match factory {
        Some(factory) => factory.open(url, options, sink).await,
        None => Err(UciError::UnknownPort(url.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_port_is_reported() {
        let (tx, _rx) = mpsc::channel(4);
        let err = match tokio::runtime::Runtime::new()
            .unwrap()
            .block_on(open("bogus://nowhere", &TransportOptions::default(), tx))
        {
            Err(e) => e,
            Ok(_) => panic!("expected an error"),
        };
        assert!(matches!(err, UciError::UnknownPort(_)));
    }
}
