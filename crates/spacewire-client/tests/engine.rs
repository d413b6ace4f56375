//! Engine behavior against a scripted in-memory transport.

use std::{
    io,
    sync::{Arc, Mutex},
    thread,
    time::{Duration, Instant},
};

use crossbeam_channel::{unbounded, Receiver, Sender};
use spacewire_client::{ConnectionEngine, ConnectionState};
use spacewire_core::{
    config::{Compression, ConnectionConfig},
    transport::{ConnectRequest, Transport, TransportObserver},
};
use spacewire_sats::{
    compress_frame,
    message::{IdentityToken, TransactionUpdateLight},
    Bsatn, ClientMessage, ConnectionId, Identity, ServerMessage, U128,
};

#[derive(Clone, Copy)]
enum Handshake {
    Open,
    Silent,
    Refuse,
}

#[derive(Clone, Default)]
struct ObserverSlot(Arc<Mutex<Option<TransportObserver>>>);

impl ObserverSlot {
    fn get(&self) -> Option<TransportObserver> {
        self.0.lock().unwrap().clone()
    }

    fn wait(&self) -> TransportObserver {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(observer) = self.get() {
                return observer;
            }
            assert!(Instant::now() < deadline, "transport was never connected");
            thread::sleep(Duration::from_millis(1));
        }
    }
}

struct ScriptedTransport {
    handshake: Handshake,
    observer: ObserverSlot,
    requests: Sender<ConnectRequest>,
    sent: Sender<Vec<u8>>,
    closes: Sender<(u16, String)>,
}

impl Transport for ScriptedTransport {
    fn connect(&mut self, request: &ConnectRequest, observer: TransportObserver) -> io::Result<()> {
        self.requests.send(request.clone()).unwrap();
        *self.observer.0.lock().unwrap() = Some(observer.clone());
        match self.handshake {
            Handshake::Open => observer.opened(),
            Handshake::Silent => {}
            Handshake::Refuse => observer.connection_error("refused"),
        }
        Ok(())
    }

    fn send(&mut self, payload: &[u8]) -> io::Result<()> {
        self.sent.send(payload.to_vec()).unwrap();
        Ok(())
    }

    fn close(&mut self, code: u16, reason: &str) {
        let _ = self.closes.send((code, reason.to_string()));
    }
}

struct Harness {
    engine: ConnectionEngine,
    observer: ObserverSlot,
    requests: Receiver<ConnectRequest>,
    sent: Receiver<Vec<u8>>,
    closes: Receiver<(u16, String)>,
}

fn harness(handshake: Handshake, config: ConnectionConfig) -> Harness {
    let observer = ObserverSlot::default();
    let (requests_tx, requests) = unbounded();
    let (sent_tx, sent) = unbounded();
    let (closes_tx, closes) = unbounded();
    let transport = ScriptedTransport {
        handshake,
        observer: observer.clone(),
        requests: requests_tx,
        sent: sent_tx,
        closes: closes_tx,
    };

    let mut engine = ConnectionEngine::new(config);
    engine.connect(transport).unwrap();
    Harness { engine, observer, requests, sent, closes }
}

fn config() -> ConnectionConfig {
    ConnectionConfig::new("ws://test", "module")
        .with_connect_timeout(Duration::from_millis(200))
        .with_wake_interval(Duration::from_millis(5))
}

fn wait_for_state(engine: &ConnectionEngine, state: ConnectionState) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while engine.state() != state {
        assert!(Instant::now() < deadline, "stuck in {:?} waiting for {:?}", engine.state(), state);
        thread::sleep(Duration::from_millis(1));
    }
}

fn pump_until(engine: &mut ConnectionEngine, count: usize) -> Vec<ServerMessage> {
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut messages = Vec::new();
    while messages.len() < count {
        assert!(Instant::now() < deadline, "only {} of {} messages arrived", messages.len(), count);
        engine.pump(|message| messages.push(message.clone()));
        thread::sleep(Duration::from_millis(1));
    }
    messages
}

fn identity_token() -> ServerMessage {
    let mut bytes = [0u8; 32];
    bytes[31] = 7;
    ServerMessage::IdentityToken(IdentityToken {
        identity: Identity::from_be_bytes(bytes),
        token: "token".into(),
        connection_id: ConnectionId::new(U128::new(0, 1)),
    })
}

fn light_update(request_id: u32) -> ServerMessage {
    ServerMessage::TransactionUpdateLight(TransactionUpdateLight {
        request_id,
        update: Default::default(),
    })
}

#[test]
fn test_frames_are_delivered_in_arrival_order() {
    let mut h = harness(Handshake::Open, config());
    let observer = h.observer.wait();
    wait_for_state(&h.engine, ConnectionState::Open);

    let connected = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&connected);
    h.engine.on_connect(move |identity, token| {
        seen.lock().unwrap().push((*identity, token.to_string()));
    });

    let first = identity_token();
    // Gzip the first frame so it takes longer to decode than the second.
    observer.message(compress_frame(&first.to_bytes(), Compression::Gzip).unwrap());
    let mut expected = vec![first];
    for request_id in 0..20 {
        let message = light_update(request_id);
        observer.message(compress_frame(&message.to_bytes(), Compression::None).unwrap());
        expected.push(message);
    }

    let messages = pump_until(&mut h.engine, expected.len());
    assert_eq!(messages, expected);

    let connected = connected.lock().unwrap();
    assert_eq!(connected.len(), 1);
    assert_eq!(connected[0].1, "token");
    assert_eq!(h.engine.identity(), Some(connected[0].0));
}

#[test]
fn test_handshake_timeout_fails_once_and_never_connects() {
    let mut h = harness(Handshake::Silent, config());

    let errors = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&errors);
    h.engine.on_connect_error(move |reason| seen.lock().unwrap().push(reason.to_string()));
    let connects = Arc::new(Mutex::new(0));
    let seen = Arc::clone(&connects);
    h.engine.on_connect(move |_, _| *seen.lock().unwrap() += 1);

    wait_for_state(&h.engine, ConnectionState::Failed);
    for _ in 0..10 {
        h.engine.pump(|_| {});
        thread::sleep(Duration::from_millis(5));
    }

    // A late open must not revive the connection.
    h.observer.wait().opened();
    h.engine.pump(|_| {});

    assert_eq!(errors.lock().unwrap().as_slice(), ["WebSocket connect timed out"]);
    assert_eq!(*connects.lock().unwrap(), 0);
    assert_eq!(h.engine.state(), ConnectionState::Failed);
    assert!(h.engine.failure_reason().unwrap().contains("timed out"));
}

#[test]
fn test_refused_handshake_reports_the_reason() {
    let mut h = harness(Handshake::Refuse, config());
    let errors = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&errors);
    h.engine.on_connect_error(move |reason| seen.lock().unwrap().push(reason.to_string()));

    wait_for_state(&h.engine, ConnectionState::Failed);
    h.engine.pump(|_| {});
    assert_eq!(errors.lock().unwrap().as_slice(), ["refused"]);
    assert!(h.engine.call_reducer("late", vec![]).is_err());
}

#[test]
fn test_oversized_frame_closes_without_decoding() {
    let mut h = harness(Handshake::Open, config().with_max_message_size(64));
    let observer = h.observer.wait();
    wait_for_state(&h.engine, ConnectionState::Open);

    let reasons = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&reasons);
    h.engine.on_disconnect(move |reason| seen.lock().unwrap().push(reason.to_string()));

    let mut frame = compress_frame(&light_update(1).to_bytes(), Compression::None).unwrap();
    frame.resize(65, 0);
    observer.message(frame);

    let (code, reason) = h.closes.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(code, 1013);
    assert_eq!(reason, "Message too big");

    wait_for_state(&h.engine, ConnectionState::Closed);
    assert_eq!(h.engine.pump(|_| panic!("oversized frame was decoded")), 0);
    assert_eq!(reasons.lock().unwrap().as_slice(), ["Message too big"]);
}

#[test]
fn test_outbound_messages_are_sent_in_order() {
    let mut h = harness(Handshake::Silent, config().with_connect_timeout(Duration::from_secs(5)));

    // Queued while connecting, sent once open.
    let call = h.engine.call_reducer("say_hello", vec![]).unwrap();
    let query_id = h.engine.subscribe_single("SELECT * FROM player").unwrap();
    let unsubscribe = h.engine.unsubscribe(query_id).unwrap();
    assert!(h.sent.try_recv().is_err());

    h.observer.wait().opened();
    wait_for_state(&h.engine, ConnectionState::Open);
    let all = h.engine.subscribe_all().unwrap();

    let received: Vec<ClientMessage> = (0..4)
        .map(|_| {
            let bytes = h.sent.recv_timeout(Duration::from_secs(5)).unwrap();
            ClientMessage::from_bytes(&bytes).unwrap()
        })
        .collect();

    assert_eq!(
        received,
        vec![
            ClientMessage::CallReducer {
                reducer: "say_hello".into(),
                args: vec![],
                request_id: call,
                flags: 0,
            },
            ClientMessage::SubscribeSingle {
                query: "SELECT * FROM player".into(),
                request_id: call + 1,
                query_id,
            },
            ClientMessage::Unsubscribe { request_id: unsubscribe, query_id },
            ClientMessage::Subscribe { query_strings: vec!["SELECT * FROM *".into()], request_id: all },
        ]
    );
    h.engine.shutdown();
}

#[test]
fn test_undecodable_frames_are_dropped_and_the_stream_continues() {
    let mut h = harness(Handshake::Open, config());
    let observer = h.observer.wait();
    wait_for_state(&h.engine, ConnectionState::Open);

    observer.message(vec![0, 250, 1, 2]);
    observer.message(vec![1, 0xde, 0xad]);
    observer.message(compress_frame(&light_update(9).to_bytes(), Compression::None).unwrap());

    assert_eq!(pump_until(&mut h.engine, 1), vec![light_update(9)]);
}

#[test]
fn test_shutdown_detaches_and_closes_normally() {
    let mut h = harness(Handshake::Open, config());
    let observer = h.observer.wait();
    wait_for_state(&h.engine, ConnectionState::Open);

    let request = h.requests.recv().unwrap();
    assert_eq!(&request, h.engine.connect_request());
    assert!(request.url.contains(&h.engine.connection_id().to_hex()));

    h.engine.on_disconnect(|_| panic!("disconnect fired after shutdown"));
    h.engine.shutdown();

    assert!(!observer.is_attached());
    assert_eq!(h.closes.recv_timeout(Duration::from_secs(5)).unwrap().0, 1000);
    assert_eq!(h.engine.state(), ConnectionState::Closed);

    observer.message(compress_frame(&light_update(1).to_bytes(), Compression::None).unwrap());
    observer.closed(1006, "gone", false);
    assert_eq!(h.engine.pump(|_| panic!("message after shutdown")), 0);
    assert!(h.engine.subscribe_all().is_err());

    h.engine.shutdown();
}

#[test]
fn test_peer_close_reports_disconnect() {
    let mut h = harness(Handshake::Open, config());
    let observer = h.observer.wait();
    wait_for_state(&h.engine, ConnectionState::Open);

    let reasons = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&reasons);
    h.engine.on_disconnect(move |reason| seen.lock().unwrap().push(reason.to_string()));

    observer.closed(1006, "abnormal", false);
    wait_for_state(&h.engine, ConnectionState::Closed);
    h.engine.pump(|_| {});
    assert_eq!(reasons.lock().unwrap().as_slice(), ["WebSocket closed: abnormal"]);
}

#[test]
fn test_connect_twice_is_rejected() {
    let mut h = harness(Handshake::Open, config());
    let (sent, _) = unbounded();
    let (closes, _) = unbounded();
    let (requests, _) = unbounded();
    let second = ScriptedTransport {
        handshake: Handshake::Open,
        observer: ObserverSlot::default(),
        requests,
        sent,
        closes,
    };
    assert!(h.engine.connect(second).is_err());
}

#[test]
fn test_shutdown_while_connecting_is_not_a_failure() {
    let mut h = harness(Handshake::Silent, config().with_connect_timeout(Duration::from_secs(5)));
    h.observer.wait();
    assert_eq!(h.engine.state(), ConnectionState::Connecting);

    h.engine.shutdown();

    assert_eq!(h.engine.state(), ConnectionState::Closed);
    assert_eq!(h.engine.failure_reason(), None);
    assert_eq!(
        h.closes.recv_timeout(Duration::from_secs(5)).unwrap(),
        (1000, "Client shutdown".to_string())
    );
}

#[test]
fn test_gzip_frame_inflating_past_size_limit_is_dropped() {
    let mut h = harness(Handshake::Open, config().with_max_message_size(4096));
    let observer = h.observer.wait();
    wait_for_state(&h.engine, ConnectionState::Open);

    let mut bomb = light_update(1).to_bytes();
    bomb.resize(1024 * 1024, 0);
    let frame = compress_frame(&bomb, Compression::Gzip).unwrap();
    assert!(frame.len() <= 4096);
    observer.message(frame);
    observer.message(compress_frame(&light_update(2).to_bytes(), Compression::Gzip).unwrap());

    assert_eq!(pump_until(&mut h.engine, 1), vec![light_update(2)]);
    assert_eq!(h.engine.state(), ConnectionState::Open);
}
