//! Character-device transport for `/dev/uci` (blocking read/write on the
//! kernel driver).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{Result, UciError};

use super::{RawSink, Transport, TransportFactory, TransportOptions};

const UCI_DEV: &str = "/dev/uci";

pub struct DevFactory;

#[async_trait]
impl TransportFactory for DevFactory {
    fn name(&self) -> &'static str {
        "dev"
    }

    fn can_handle(&self, url: &str) -> bool {
        url == UCI_DEV
    }

    async fn open(
        &self,
        url: &str,
        _options: &TransportOptions,
        sink: RawSink,
    ) -> Result<Arc<dyn Transport>> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(url)
            .await?;
        let writer = file.try_clone().await?;
        debug!("dev open: {url}");

        let reader = tokio::spawn(reader_loop(file, sink));
        Ok(Arc::new(DevTransport {
            writer: tokio::sync::Mutex::new(writer),
            reader: std::sync::Mutex::new(Some(reader)),
            closed: AtomicBool::new(false),
        }))
    }
}

async fn reader_loop(mut file: File, sink: RawSink) {
    let mut buf = vec![0u8; 1024];
    loop {
        match file.read(&mut buf).await {
            Ok(0) => {
                debug!("dev reader: end of stream");
                break;
            }
            Ok(n) => {
                if sink.send(buf[..n].to_vec()).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                warn!("dev read error: {e}");
                break;
            }
        }
    }
}

pub struct DevTransport {
    writer: tokio::sync::Mutex<File>,
    reader: std::sync::Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

#[async_trait]
impl Transport for DevTransport {
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
