//! End-to-end client scenarios over an in-memory transport: framing resync,
//! fragmentation, timeouts, correlation and dispatch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use uci_core::client::Client;
use uci_core::fira::msg::SessionStatus;
use uci_core::fira::{FiraOps, SessionState, SessionType, Status};
use uci_core::framing::Dpf;
use uci_core::transport::{RawSink, Transport};
use uci_core::UciError;

/// Scriptable in-memory transport: captures outbound packets and lets the
/// test (or a responder closure) inject inbound bytes.
struct MockTransport {
    written: Mutex<Vec<Vec<u8>>>,
    sink: RawSink,
    responder: Mutex<Option<Box<dyn FnMut(&[u8]) -> Vec<Vec<u8>> + Send>>>,
    closed: AtomicBool,
}

impl MockTransport {
    fn new(sink: RawSink) -> Arc<Self> {
        Arc::new(Self {
            written: Mutex::new(Vec::new()),
            sink,
            responder: Mutex::new(None),
            closed: AtomicBool::new(false),
        })
    }

    fn respond_with(&self, f: impl FnMut(&[u8]) -> Vec<Vec<u8>> + Send + 'static) {
        *self.responder.lock().unwrap() = Some(Box::new(f));
    }

    fn written(&self) -> Vec<Vec<u8>> {
        self.written.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn write(&self, packet: &[u8]) -> uci_core::Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(UciError::Closed);
        }
        self.written.lock().unwrap().push(packet.to_vec());
        let replies = {
            let mut responder = self.responder.lock().unwrap();
            responder.as_mut().map(|f| f(packet)).unwrap_or_default()
        };
        for reply in replies {
            let _ = self.sink.send(reply).await;
        }
        Ok(())
    }

    async fn close(&self) -> uci_core::Result<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

struct Harness {
    client: Client,
    transport: Arc<MockTransport>,
    inject: RawSink,
}

fn harness_with_timeout(timeout: Duration) -> Harness {
    let (tx, rx) = mpsc::channel(32);
    let transport = MockTransport::new(tx.clone());
    let client = Client::from_parts(transport.clone(), rx, timeout);
    Harness {
        client,
        transport,
        inject: tx,
    }
}

fn harness() -> Harness {
    harness_with_timeout(Duration::from_secs(1))
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

#[tokio::test]
async fn resync_then_simple_response() {
    // S1: garbage prefix, then a Response for (gid=3, oid=2) with one byte
    let h = harness();
    let inject = h.inject.clone();
    tokio::spawn(async move {
        settle().await;
        let _ = inject
            .send(vec![0x00, 0x01, 0x02, 0x03, 0x43, 0x02, 0x00, 0x01, 0x00])
            .await;
    });
    let payload = h.client.command(3, 2, &[]).await.unwrap();
    assert_eq!(payload, vec![0x00]);
}

#[tokio::test]
async fn command_fragmentation_on_the_wire() {
    // S2: a 260-byte payload leaves as 250 + 10 with PBF marking
    let h = harness();
    h.transport.respond_with(|packet| {
        if packet[0] == 0x21 {
            // final fragment seen, answer with an empty Ok response
            vec![vec![0x41, 0x02, 0x00, 0x01, 0x00]]
        } else {
            Vec::new()
        }
    });
    let payload = vec![0xAA; 260];
    h.client.command(1, 2, &payload).await.unwrap();

    let written = h.transport.written();
    assert_eq!(written.len(), 2);
    let mut first = vec![0x31, 0x02, 0x00, 0xFA];
    first.extend_from_slice(&[0xAA; 250]);
    assert_eq!(written[0], first);
    let mut second = vec![0x21, 0x02, 0x00, 0x0A];
    second.extend_from_slice(&[0xAA; 10]);
    assert_eq!(written[1], second);
}

#[tokio::test]
async fn timeout_is_not_sticky() {
    // S6: silence first, then a healthy exchange on the same client
    let h = harness_with_timeout(Duration::from_millis(50));
    let err = h.client.command(0, 0, &[]).await.unwrap_err();
    assert!(matches!(err, UciError::Timeout(_)));

    h.transport
        .respond_with(|_| vec![vec![0x40, 0x00, 0x00, 0x01, 0x00]]);
    let payload = h.client.command(0, 0, &[]).await.unwrap();
    assert_eq!(payload, vec![0x00]);
}

#[tokio::test]
async fn mismatched_response_is_a_protocol_error() {
    // A response for another (gid, oid) must fail the outstanding command
    let h = harness();
    h.transport
        .respond_with(|_| vec![vec![0x42, 0x05, 0x00, 0x01, 0x00]]);
    let err = h.client.command(1, 1, &[]).await.unwrap_err();
    assert!(matches!(err, UciError::Protocol(_)));
}

#[tokio::test]
async fn unsolicited_response_satisfies_next_command() {
    let h = harness();
    h.inject
        .send(vec![0x41, 0x03, 0x00, 0x01, 0x2A])
        .await
        .unwrap();
    settle().await;
    let payload = h.client.command(1, 3, &[]).await.unwrap();
    assert_eq!(payload, vec![0x2A]);
}

#[tokio::test]
async fn notification_reassembly_across_packets() {
    // Two NotFinal fragments then the final one; handler sees one message
    let h = harness();
    let seen: Arc<Mutex<Vec<Vec<u8>>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    h.client
        .set_notif_handler(2, 0, "capture", move |payload| {
            sink.lock().unwrap().push(payload.to_vec());
        });

    h.inject
        .send(vec![0x72, 0x00, 0x00, 0x02, 0x11, 0x22])
        .await
        .unwrap();
    h.inject
        .send(vec![0x62, 0x00, 0x00, 0x01, 0x33])
        .await
        .unwrap();
    settle().await;

    let seen = seen.lock().unwrap();
    assert_eq!(seen.as_slice(), &[vec![0x11, 0x22, 0x33]]);
}

#[tokio::test]
async fn notification_handler_panic_is_contained() {
    let h = harness();
    h.client
        .set_notif_handler(2, 0, "explosive", |_| panic!("boom"));
    h.inject
        .send(vec![0x62, 0x00, 0x00, 0x01, 0x55])
        .await
        .unwrap();
    settle().await;

    // The intake task survived: a command still completes
    h.transport
        .respond_with(|_| vec![vec![0x40, 0x00, 0x00, 0x01, 0x00]]);
    assert!(h.client.command(0, 0, &[]).await.is_ok());
}

#[tokio::test]
async fn session_state_is_recorded() {
    // S4: SESSION_STATUS_NTF for session 42, Active, in-band suspend
    let h = harness();
    h.inject
        .send(vec![0x61, 0x02, 0x00, 0x06, 0x2A, 0x00, 0x00, 0x00, 0x02, 0x04])
        .await
        .unwrap();
    settle().await;
    let status: SessionStatus = h.client.session_state(42).unwrap();
    assert_eq!(status.state, SessionState::Active);
    assert_eq!(status.reason.value(), 0x04);
    assert!(h.client.session_state(43).is_none());
}

#[tokio::test]
async fn data_handlers_dispatch_by_dpf_and_session() {
    let h = harness();
    let seen: Arc<Mutex<Vec<(String, Vec<u8>)>>> = Arc::new(Mutex::new(Vec::new()));
    let by_session = seen.clone();
    h.client
        .set_session_data_handler(Dpf::DataMessageRcv, 7, "session-7", move |payload| {
            by_session
                .lock()
                .unwrap()
                .push(("session".into(), payload.to_vec()));
        });
    let by_dpf = seen.clone();
    h.client
        .set_data_handler(Dpf::DataMessageRcv, "any-rcv", move |payload| {
            by_dpf.lock().unwrap().push(("dpf".into(), payload.to_vec()));
        });

    // Synchronize the stream first: data packets cannot lead a fresh UART
    h.inject.send(vec![0x60, 0x07, 0x00, 0x00]).await.unwrap();
    // Data packet, DPF=2, session handle 7 then session handle 9
    h.inject
        .send(vec![0x02, 0x00, 0x05, 0x00, 0x07, 0x00, 0x00, 0x00, 0xAA])
        .await
        .unwrap();
    h.inject
        .send(vec![0x02, 0x00, 0x05, 0x00, 0x09, 0x00, 0x00, 0x00, 0xBB])
        .await
        .unwrap();
    settle().await;

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].0, "session");
    assert_eq!(seen[1].0, "dpf");
}

#[tokio::test]
async fn session_deinit_drops_session_data_handlers() {
    let h = harness();
    let seen: Arc<Mutex<Vec<Vec<u8>>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    h.client
        .set_session_data_handler(Dpf::DataMessageRcv, 7, "session-7", move |payload| {
            sink.lock().unwrap().push(payload.to_vec());
        });

    h.transport
        .respond_with(|_| vec![vec![0x41, 0x01, 0x00, 0x01, 0x00]]);
    let status = h.client.session_deinit(7).await.unwrap();
    assert!(status.is_ok());

    h.inject
        .send(vec![0x02, 0x00, 0x05, 0x00, 0x07, 0x00, 0x00, 0x00, 0xAA])
        .await
        .unwrap();
    settle().await;
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn session_init_returns_fira_2_handle_when_present() {
    let h = harness();
    h.transport.respond_with(|packet| {
        // v2.0 firmware: status + 4-byte session handle
        assert_eq!(packet[0] & 0x0F, 0x01);
        vec![vec![0x41, 0x00, 0x00, 0x05, 0x00, 0x39, 0x30, 0x00, 0x00]]
    });
    let (status, handle) = h.client.session_init(42, SessionType::Ranging).await.unwrap();
    assert!(status.is_ok());
    assert_eq!(handle, Some(12345));

    // The command carried the session id and type
    let written = h.transport.written();
    assert_eq!(written[0][4..], [0x2A, 0x00, 0x00, 0x00, 0x00]);
}

#[tokio::test]
async fn concurrent_commands_are_rejected() {
    let h = harness_with_timeout(Duration::from_millis(200));
    let first = h.client.command(0, 0, &[]);
    let second = h.client.command(0, 1, &[]);
    let (a, b) = tokio::join!(first, second);
    let outcomes = [a, b];
    assert!(outcomes
        .iter()
        .any(|r| matches!(r, Err(UciError::Protocol(m)) if m.contains("in flight"))));
    assert!(outcomes
        .iter()
        .any(|r| matches!(r, Err(UciError::Timeout(_)))));
}

#[tokio::test]
async fn close_is_idempotent_and_fails_outstanding_commands() {
    let h = harness_with_timeout(Duration::from_millis(500));
    h.client.close().await.unwrap();
    h.client.close().await.unwrap();
    let err = h.client.command(0, 0, &[]).await.unwrap_err();
    assert!(matches!(err, UciError::Closed | UciError::Timeout(_)));
}

#[tokio::test]
async fn ranging_start_status_error_is_returned_not_raised() {
    let h = harness();
    h.transport
        .respond_with(|_| vec![vec![0x42, 0x00, 0x00, 0x01, 0x11]]);
    let status = h.client.ranging_start(1).await.unwrap();
    assert_eq!(status, Status::ErrorSessionNotExist);
}
