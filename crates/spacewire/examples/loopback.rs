//! End-to-end demo against an in-process mock database.
//!
//! The transport below never touches the network: a peer thread plays the server,
//! answering client messages with the replies a real database would send.
//!
//! Run:
//! - cargo run -p spacewire --example loopback
//! - RUST_LOG=trace cargo run -p spacewire --example loopback -- gzip

use std::{
    env, io, thread,
    time::{Duration, Instant},
};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use spacewire::{
    compress_frame,
    message::{
        DatabaseUpdate, EnergyQuanta, IdentityToken, MultiSubscriptionUpdate,
        OneOffQueryResponse, ReducerCallInfo, TransactionUpdate, UpdateStatus,
    },
    prelude::*,
    TimeDuration, Timestamp, U128,
};
use tracing::{debug, info};

/// Transport whose far end is a thread in this process.
#[derive(Default)]
struct LoopbackTransport {
    to_peer: Option<Sender<Vec<u8>>>,
    peer: Option<thread::JoinHandle<()>>,
}

impl Transport for LoopbackTransport {
    fn connect(&mut self, request: &ConnectRequest, observer: TransportObserver) -> io::Result<()> {
        let compression = if request.url.contains("compression=Gzip") {
            Compression::Gzip
        } else {
            Compression::None
        };
        let (to_peer, from_client) = unbounded();
        let peer = MockDatabase { observer, compression, from_client };
        self.peer = Some(thread::Builder::new().name("mock-database".into()).spawn(move || peer.run())?);
        self.to_peer = Some(to_peer);
        Ok(())
    }

    fn send(&mut self, payload: &[u8]) -> io::Result<()> {
        match &self.to_peer {
            Some(to_peer) => to_peer
                .send(payload.to_vec())
                .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "peer gone")),
            None => Err(io::Error::new(io::ErrorKind::NotConnected, "not connected")),
        }
    }

    fn close(&mut self, code: u16, reason: &str) {
        debug!("Closing loopback ({}: {})", code, reason);
        self.to_peer = None;
        if let Some(peer) = self.peer.take() {
            let _ = peer.join();
        }
    }
}

struct MockDatabase {
    observer: TransportObserver,
    compression: Compression,
    from_client: Receiver<Vec<u8>>,
}

impl MockDatabase {
    fn run(self) {
        self.observer.opened();

        let mut identity = [0u8; 32];
        identity[31] = 0x2A;
        self.reply(ServerMessage::IdentityToken(IdentityToken {
            identity: Identity::from_be_bytes(identity),
            token: "demo-token".into(),
            connection_id: ConnectionId::new(U128::new(0, 1)),
        }));

        loop {
            let bytes = match self.from_client.recv_timeout(Duration::from_secs(5)) {
                Ok(bytes) => bytes,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            };
            match ClientMessage::from_bytes(&bytes) {
                Ok(message) => self.answer(message),
                Err(err) => debug!("Mock database ignored a message: {}", err),
            }
        }
        self.observer.closed(1000, "", true);
    }

    fn answer(&self, message: ClientMessage) {
        let reply = match message {
            ClientMessage::CallReducer { reducer, args, request_id, .. } => {
                ServerMessage::TransactionUpdate(TransactionUpdate {
                    status: UpdateStatus::Committed(DatabaseUpdate::default()),
                    timestamp: Timestamp::now(),
                    caller_identity: Identity::default(),
                    caller_connection_id: ConnectionId::default(),
                    reducer_call: ReducerCallInfo {
                        reducer_name: reducer,
                        reducer_id: 1,
                        args,
                        request_id,
                    },
                    energy_quanta_used: EnergyQuanta { quanta: U128::new(0, 1_000) },
                    total_host_execution_duration: TimeDuration::from_micros(120),
                })
            }
            ClientMessage::SubscribeMulti { request_id, query_id, .. } => {
                ServerMessage::SubscribeMultiApplied(MultiSubscriptionUpdate {
                    request_id,
                    total_host_execution_duration_micros: 80,
                    query_id,
                    update: DatabaseUpdate::default(),
                })
            }
            ClientMessage::OneOffQuery { message_id, .. } => {
                ServerMessage::OneOffQueryResponse(OneOffQueryResponse {
                    message_id,
                    error: None,
                    tables: Vec::new(),
                    total_host_execution_duration: TimeDuration::from_millis(1),
                })
            }
            other => {
                debug!("Mock database has no reply for {}", other.kind());
                return;
            }
        };
        self.reply(reply);
    }

    fn reply(&self, message: ServerMessage) {
        match compress_frame(&message.to_bytes(), self.compression) {
            Ok(frame) => self.observer.message(frame),
            Err(err) => debug!("Mock database failed to frame a reply: {}", err),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let compression = match env::args().nth(1).as_deref() {
        Some("gzip") => Compression::Gzip,
        _ => Compression::None,
    };
    let config = ConnectionConfig::new("ws://loopback", "demo")
        .with_token("local")
        .with_compression(compression);

    let mut engine = ConnectionEngine::new(config);
    info!("Connecting with {}", engine.connect_request().url);

    engine.on_connect(|identity, token| info!("[connect] identity={} token={}", identity, token));
    engine.on_connect_error(|reason| info!("[connect error] {}", reason));
    engine.on_disconnect(|reason| info!("[disconnect] {:?}", reason));
    engine.connect(LoopbackTransport::default())?;

    engine.call_reducer("say_hello", Vec::new())?;
    engine.subscribe_multi(vec!["SELECT * FROM player".into(), "SELECT * FROM food".into()])?;
    engine.one_off_query(b"q1".to_vec(), "SELECT * FROM config")?;

    let deadline = Instant::now() + Duration::from_secs(2);
    let mut received = 0;
    while received < 4 && Instant::now() < deadline {
        received += engine.pump(|message| match message {
            ServerMessage::TransactionUpdate(update) => info!(
                "[reducer] {} took {}",
                update.reducer_call.reducer_name, update.total_host_execution_duration
            ),
            other => info!("[message] {}", other.kind()),
        });
        thread::sleep(Duration::from_millis(10));
    }

    engine.shutdown();
    info!("done: {} messages, state {}", received, engine.state());
    Ok(())
}
