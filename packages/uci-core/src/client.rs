//! UCI client: request/response correlation, logical message reassembly and
//! notification/data dispatch.
//!
//! Two tasks touch a client: the transport reader task, which feeds raw
//! bytes through the framing decoder and dispatches complete messages, and
//! the caller task, which blocks in [`Client::command`] on the response
//! channel. Notification handlers run inline on the reader task to preserve
//! wire order — a handler that blocks stalls the whole notification stream,
//! and a handler must never wait on `command()`.
//!
//! At most one command may be in flight per client; a second concurrent
//! `command()` call is rejected. Use one client per device.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::{Result, UciError};
use crate::fira::msg::SessionStatus;
use crate::fira::{DeviceState, Gid, OidCore, OidSession};
use crate::framing::{encode_packet, fragments, Dpf, FrameDecoder, MessageType, Pbf, RawPacket};
use crate::transport::{self, Transport, TransportOptions};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(4);

/// Response queue depth. Unsolicited responses beyond this are dropped with
/// a warning instead of stalling the reader.
const RESPONSE_QUEUE: usize = 8;

// ─── Handlers ─────────────────────────────────────────────────────────────────

type NotifFn = Arc<dyn Fn(&[u8]) + Send + Sync>;
type DefaultNotifFn = Arc<dyn Fn(u8, u8, &[u8]) + Send + Sync>;
type DataFn = Arc<dyn Fn(&[u8]) + Send + Sync>;
type DefaultDataFn = Arc<dyn Fn(Dpf, &[u8]) + Send + Sync>;

#[derive(Clone)]
struct Named<F> {
    name: String,
    f: F,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum DataKey {
    Dpf(u8),
    DpfSession(u8, u32),
}

#[derive(Default)]
struct Handlers {
    notif: HashMap<(u8, u8), Named<NotifFn>>,
    default_notif: Option<Named<DefaultNotifFn>>,
    data: HashMap<DataKey, Named<DataFn>>,
    default_data: Option<Named<DefaultDataFn>>,
}

struct Shared {
    handlers: Mutex<Handlers>,
    device_state: Mutex<Option<DeviceState>>,
    session_states: Mutex<HashMap<u32, SessionStatus>>,
    in_flight: AtomicBool,
}

struct ResponseMessage {
    gid: u8,
    oid: u8,
    payload: Vec<u8>,
}

// ─── Client ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    pub transport: TransportOptions,
    pub timeout: Option<Duration>,
}

pub struct Client {
    transport: Arc<dyn Transport>,
    responses: tokio::sync::Mutex<mpsc::Receiver<ResponseMessage>>,
    shared: Arc<Shared>,
    intake: Mutex<Option<JoinHandle<()>>>,
    timeout: Duration,
    closed: AtomicBool,
}

impl Client {
    /// Open the transport resolved from `port` and start the reader.
    pub async fn open(port: &str) -> Result<Self> {
        Self::open_with(port, ClientOptions::default()).await
    }

    pub async fn open_with(port: &str, options: ClientOptions) -> Result<Self> {
        let (raw_tx, raw_rx) = mpsc::channel(32);
        let transport = transport::open(port, &options.transport, raw_tx).await?;
        Ok(Self::from_parts(
            transport,
            raw_rx,
            options.timeout.unwrap_or(DEFAULT_TIMEOUT),
        ))
    }

    /// Assemble a client over an already-open transport. The receiver side
    /// of the transport's raw sink is handed over here.
    pub fn from_parts(
        transport: Arc<dyn Transport>,
        raw_rx: mpsc::Receiver<Vec<u8>>,
        timeout: Duration,
    ) -> Self {
        let (resp_tx, resp_rx) = mpsc::channel(RESPONSE_QUEUE);
        let shared = Arc::new(Shared {
            handlers: Mutex::new(Handlers::default()),
            device_state: Mutex::new(None),
            session_states: Mutex::new(HashMap::new()),
            in_flight: AtomicBool::new(false),
        });
        let intake = tokio::spawn(intake_loop(raw_rx, resp_tx, shared.clone()));
        Self {
            transport,
            responses: tokio::sync::Mutex::new(resp_rx),
            shared,
            intake: Mutex::new(Some(intake)),
            timeout,
            closed: AtomicBool::new(false),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    // ── Handler registration ──

    pub fn set_notif_handler(
        &self,
        gid: u8,
        oid: u8,
        name: impl Into<String>,
        f: impl Fn(&[u8]) + Send + Sync + 'static,
    ) {
        self.shared.handlers.lock().unwrap().notif.insert(
            (gid, oid),
            Named {
                name: name.into(),
                f: Arc::new(f),
            },
        );
    }

    pub fn remove_notif_handler(&self, gid: u8, oid: u8) {
        self.shared.handlers.lock().unwrap().notif.remove(&(gid, oid));
    }

    pub fn set_default_notif_handler(
        &self,
        name: impl Into<String>,
        f: impl Fn(u8, u8, &[u8]) + Send + Sync + 'static,
    ) {
        self.shared.handlers.lock().unwrap().default_notif = Some(Named {
            name: name.into(),
            f: Arc::new(f),
        });
    }

    pub fn set_data_handler(
        &self,
        dpf: Dpf,
        name: impl Into<String>,
        f: impl Fn(&[u8]) + Send + Sync + 'static,
    ) {
        self.shared.handlers.lock().unwrap().data.insert(
            DataKey::Dpf(dpf.value()),
            Named {
                name: name.into(),
                f: Arc::new(f),
            },
        );
    }

    /// Handler for data packets of one session only. Dropped automatically
    /// when the session is deinitialized.
    pub fn set_session_data_handler(
        &self,
        dpf: Dpf,
        session_id: u32,
        name: impl Into<String>,
        f: impl Fn(&[u8]) + Send + Sync + 'static,
    ) {
        self.shared.handlers.lock().unwrap().data.insert(
            DataKey::DpfSession(dpf.value(), session_id),
            Named {
                name: name.into(),
                f: Arc::new(f),
            },
        );
    }

    pub fn set_default_data_handler(
        &self,
        name: impl Into<String>,
        f: impl Fn(Dpf, &[u8]) + Send + Sync + 'static,
    ) {
        self.shared.handlers.lock().unwrap().default_data = Some(Named {
            name: name.into(),
            f: Arc::new(f),
        });
    }

    /// Remove every data handler registered for `session_id`.
    pub fn remove_session_data_handlers(&self, session_id: u32) {
        self.shared
            .handlers
            .lock()
            .unwrap()
            .data
            .retain(|key, _| !matches!(key, DataKey::DpfSession(_, sid) if *sid == session_id));
    }

    // ── Observed device/session state ──

    pub fn device_state(&self) -> Option<DeviceState> {
        *self.shared.device_state.lock().unwrap()
    }

    /// Last state pushed by the radio for this session, if any.
    pub fn session_state(&self, session_id: u32) -> Option<SessionStatus> {
        self.shared
            .session_states
            .lock()
            .unwrap()
            .get(&session_id)
            .copied()
    }

    // ── Wire operations ──

    /// Fragment and send one logical message.
    pub async fn send_message(
        &self,
        mt: MessageType,
        gid: u8,
        oid: u8,
        payload: &[u8],
    ) -> Result<()> {
        for (pbf, chunk) in fragments(payload) {
            let packet = encode_packet(mt, pbf, gid, oid, chunk)?;
            debug!("send: {}", hex::encode(&packet));
            self.transport.write(&packet).await?;
        }
        Ok(())
    }

    /// Send a command and wait for its response with the client timeout.
    pub async fn command(&self, gid: u8, oid: u8, payload: &[u8]) -> Result<Vec<u8>> {
        self.command_with_timeout(gid, oid, payload, self.timeout)
            .await
    }

    pub async fn command_with_timeout(
        &self,
        gid: u8,
        oid: u8,
        payload: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>> {
        // One in-flight command per client; this also guards against a
        // notification handler sneaking a command in on the reader task.
        let mut responses = self
            .responses
            .try_lock()
            .map_err(|_| UciError::Protocol("a command is already in flight".into()))?;

        self.shared.in_flight.store(true, Ordering::Release);
        let result = async {
            self.send_message(MessageType::Command, gid, oid, payload)
                .await?;
            let reply = match tokio::time::timeout(timeout, responses.recv()).await {
                Err(_) => return Err(UciError::Timeout(timeout)),
                // Intake gone: the transport was closed under us. The
                // outstanding command completes like a silent device.
                Ok(None) => return Err(UciError::Timeout(timeout)),
                Ok(Some(reply)) => reply,
            };
            if (reply.gid, reply.oid) != (gid, oid) {
                return Err(UciError::Protocol(format!(
                    "response ({}, {}) does not match command ({gid}, {oid})",
                    reply.gid, reply.oid
                )));
            }
            Ok(reply.payload)
        }
        .await;
        self.shared.in_flight.store(false, Ordering::Release);
        result
    }

    /// Send an outbound data message (`DPF = DataMessageSnd`).
    pub async fn send_data(&self, payload: &[u8]) -> Result<()> {
        self.send_message(
            MessageType::DataPacket,
            Dpf::DataMessageSnd.value(),
            0,
            payload,
        )
        .await
    }

    /// Close the transport and join the intake task. Idempotent.
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.transport.close().await?;
        let handle = self.intake.lock().unwrap().take();
        if let Some(handle) = handle {
            handle.abort();
            let _ = handle.await;
        }
        Ok(())
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        if let Some(handle) = self.intake.lock().unwrap().take() {
            handle.abort();
        }
    }
}

// ─── Intake ───────────────────────────────────────────────────────────────────

struct PartialMessage {
    mt: MessageType,
    gid: u8,
    oid: u8,
    payload: Vec<u8>,
}

async fn intake_loop(
    mut raw_rx: mpsc::Receiver<Vec<u8>>,
    resp_tx: mpsc::Sender<ResponseMessage>,
    shared: Arc<Shared>,
) {
    let mut decoder = FrameDecoder::new();
    let mut partial: Option<PartialMessage> = None;

    while let Some(chunk) = raw_rx.recv().await {
        for packet in decoder.push(&chunk) {
            debug!("packet_recv: {} {:?}", hex::encode(&packet.payload), packet.mt);
            packet_received(packet, &mut partial, &resp_tx, &shared);
        }
    }
    debug!("intake: raw byte stream closed");
}

fn packet_received(
    packet: RawPacket,
    partial: &mut Option<PartialMessage>,
    resp_tx: &mpsc::Sender<ResponseMessage>,
    shared: &Shared,
) {
    match partial {
        Some(msg) => {
            if (packet.mt, packet.gid, packet.oid) != (msg.mt, msg.gid, msg.oid) {
                error!(
                    "protocol error: bad packet sequence, ({:?}, {}, {}) interrupts ({:?}, {}, {})",
                    packet.mt, packet.gid, packet.oid, msg.mt, msg.gid, msg.oid
                );
                *partial = None;
                return;
            }
            msg.payload.extend_from_slice(&packet.payload);
        }
        None => {
            *partial = Some(PartialMessage {
                mt: packet.mt,
                gid: packet.gid,
                oid: packet.oid,
                payload: packet.payload,
            });
        }
    }

    if packet.pbf == Pbf::Final {
        // partial is always Some here
        if let Some(msg) = partial.take() {
            message_received(msg, resp_tx, shared);
        }
    }
}

fn message_received(msg: PartialMessage, resp_tx: &mpsc::Sender<ResponseMessage>, shared: &Shared) {
    match msg.mt {
        MessageType::Response => {
            if !shared.in_flight.load(Ordering::Acquire) {
                warn!(
                    "response ({}, {}) arrived with no outstanding command",
                    msg.gid, msg.oid
                );
            }
            if resp_tx
                .try_send(ResponseMessage {
                    gid: msg.gid,
                    oid: msg.oid,
                    payload: msg.payload,
                })
                .is_err()
            {
                warn!("response queue full, dropping ({}, {})", msg.gid, msg.oid);
            }
        }
        MessageType::Notification => notification_received(msg, shared),
        MessageType::DataPacket => data_received(msg, shared),
        MessageType::Command => {
            warn!("inbound command packet ({}, {}) ignored", msg.gid, msg.oid);
        }
    }
}

fn notification_received(msg: PartialMessage, shared: &Shared) {
    track_state(&msg, shared);

    let (handler, fallback) = {
        let handlers = shared.handlers.lock().unwrap();
        (
            handlers.notif.get(&(msg.gid, msg.oid)).cloned(),
            handlers.default_notif.clone(),
        )
    };

    if let Some(Named { name, f }) = handler {
        if catch_unwind(AssertUnwindSafe(|| f(&msg.payload))).is_err() {
            error!(
                "notif handler \"{name}\" @(gid={}, oid={}) panicked",
                msg.gid, msg.oid
            );
        }
    } else if let Some(Named { name, f }) = fallback {
        if catch_unwind(AssertUnwindSafe(|| f(msg.gid, msg.oid, &msg.payload))).is_err() {
            error!("default notif handler \"{name}\" panicked");
        }
    } else {
        info!(
            "notif: {}, {}: {}",
            msg.gid,
            msg.oid,
            hex::encode(&msg.payload)
        );
    }
}

/// Record the last observed device state and per-session state before the
/// user handlers run.
fn track_state(msg: &PartialMessage, shared: &Shared) {
    if msg.gid == Gid::Core.value() && msg.oid == OidCore::DeviceStatusNtf.value() {
        if let Some(state) = msg.payload.first() {
            *shared.device_state.lock().unwrap() = Some(DeviceState::from_value(*state));
        }
    } else if msg.gid == Gid::Session.value() && msg.oid == OidSession::StatusNtf.value() {
        match SessionStatus::decode(&msg.payload) {
            Ok(status) => {
                shared
                    .session_states
                    .lock()
                    .unwrap()
                    .insert(status.session_id, status);
            }
            Err(e) => warn!("undecodable session status notification: {e}"),
        }
    }
}

fn data_received(msg: PartialMessage, shared: &Shared) {
    let dpf = Dpf::from_value(msg.gid);
    // Inbound data messages lead with the session handle
    let session_id = (dpf == Dpf::DataMessageRcv && msg.payload.len() >= 4)
        .then(|| u32::from_le_bytes([msg.payload[0], msg.payload[1], msg.payload[2], msg.payload[3]]));

    let (handler, fallback) = {
        let handlers = shared.handlers.lock().unwrap();
        let by_session =
            session_id.and_then(|sid| handlers.data.get(&DataKey::DpfSession(dpf.value(), sid)));
        (
            by_session
                .or_else(|| handlers.data.get(&DataKey::Dpf(dpf.value())))
                .cloned(),
            handlers.default_data.clone(),
        )
    };

    if let Some(Named { name, f }) = handler {
        if catch_unwind(AssertUnwindSafe(|| f(&msg.payload))).is_err() {
            error!("data handler \"{name}\" @(dpf={:?}) panicked", dpf);
        }
    } else if let Some(Named { name, f }) = fallback {
        if catch_unwind(AssertUnwindSafe(|| f(dpf, &msg.payload))).is_err() {
            error!("default data handler \"{name}\" panicked");
        }
    } else {
        info!("data: {:?}: {}", dpf, hex::encode(&msg.payload));
    }
}
