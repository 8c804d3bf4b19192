//! Serial/UART transport, the reference transport for UCI radios.
//!
//! URL forms: `uart:<path>` or a bare device path (symbolic links are
//! resolved). Default baud rate 115200 unless overridden.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::task::JoinHandle;
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, warn};

use crate::error::{Result, UciError};

use super::{RawSink, Transport, TransportFactory, TransportOptions};

fn device_path(url: &str) -> String {
    let raw = url.strip_prefix("uart:").unwrap_or(url);
    // symbolic links in /dev are accepted and resolved
    std::fs::canonicalize(raw)
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

pub struct UartFactory;

#[async_trait]
impl TransportFactory for UartFactory {
    fn name(&self) -> &'static str {
        "uart"
    }

    fn can_handle(&self, url: &str) -> bool {
        url.starts_with("uart:") || Path::new(&device_path(url)).exists()
    }

    async fn open(
        &self,
        url: &str,
        options: &TransportOptions,
        sink: RawSink,
    ) -> Result<Arc<dyn Transport>> {
        let path = device_path(url);
        let stream = tokio_serial::new(&path, options.baudrate)
            .open_native_async()
            .map_err(|e| UciError::Io(std::io::Error::other(format!("{path}: {e}"))))?;
        debug!("uart open: {path} @ {} baud", options.baudrate);

        let (read_half, write_half) = tokio::io::split(stream);
        let reader = tokio::spawn(reader_loop(read_half, sink));
        Ok(Arc::new(UartTransport {
            writer: tokio::sync::Mutex::new(write_half),
            reader: std::sync::Mutex::new(Some(reader)),
            closed: AtomicBool::new(false),
        }))
    }
}

async fn reader_loop(mut read_half: ReadHalf<SerialStream>, sink: RawSink) {
    let mut buf = vec![0u8; 1024];
    loop {
        match read_half.read(&mut buf).await {
            Ok(0) => {
                debug!("uart reader: end of stream");
                break;
            }
            Ok(n) => {
                if sink.send(buf[..n].to_vec()).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                warn!("uart read error: {e}");
                break;
            }
        }
    }
}

pub struct UartTransport {
    writer: tokio::sync::Mutex<WriteHalf<SerialStream>>,
    reader: std::sync::Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

#[async_trait]
impl Transport for UartTransport {
    async fn write(&self, packet: &[u8]) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(UciError::Closed);
        }
        let mut writer = self.writer.lock().await;
        writer.write_all(packet).await?;
        writer.flush().await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let handle = self.reader.lock().unwrap().take();
        if let Some(handle) = handle {
            handle.abort();
            let _ = handle.await;
        }
        Ok(())
    }
}
