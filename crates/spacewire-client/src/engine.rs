use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicU32, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
};

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use spacewire_core::{
    config::ConnectionConfig,
    error::{ErrorKind, Result},
    transport::{ConnectRequest, HandshakeSignal, Transport, TransportObserver},
};
use spacewire_sats::{ClientMessage, ConnectionId, Identity, QueryId, ServerMessage};
use tracing::{debug, info, warn};

use crate::{
    callbacks::Callbacks,
    events::{ConnectionState, EngineEvent},
    url::{connect_request, generate_connection_id},
    worker::{SharedState, Worker},
};

/// Query subscribing to every table.
const SUBSCRIBE_ALL_QUERY: &str = "SELECT * FROM *";

/// Turns a [`Transport`] into a queue of typed server messages and back.
///
/// The engine owns a background worker that performs the handshake, decodes inbound
/// frames and sends queued client messages. The application drives delivery by
/// calling [`pump`](Self::pump) at its own cadence; every callback runs on the
/// thread that calls `pump`.
///
/// ```ignore
/// let mut engine = ConnectionEngine::new(ConnectionConfig::new("ws://localhost:3000", "chat"));
/// engine.on_connect(|identity, _token| println!("connected as {}", identity));
/// engine.connect(MyWebSocket::new())?;
/// loop {
///     engine.pump(|message| println!("{}", message.kind()));
/// }
/// ```
pub struct ConnectionEngine {
    config: ConnectionConfig,
    connection_id: ConnectionId,
    request: ConnectRequest,
    state: SharedState,
    stop: Arc<AtomicBool>,
    next_request_id: AtomicU32,
    next_query_id: AtomicU32,
    identity: Option<Identity>,
    callbacks: Callbacks,
    outbound: Sender<ClientMessage>,
    outbound_receiver: Option<Receiver<ClientMessage>>,
    processed: Receiver<EngineEvent>,
    processed_sender: Option<Sender<EngineEvent>>,
    wake: Sender<()>,
    wake_receiver: Option<Receiver<()>>,
    handshake: Sender<HandshakeSignal>,
    observer: Option<TransportObserver>,
    worker: Option<JoinHandle<()>>,
}

impl fmt::Debug for ConnectionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionEngine")
            .field("url", &self.request.url)
            .field("state", &self.state())
            .field("identity", &self.identity)
            .field("callbacks", &self.callbacks)
            .finish()
    }
}

impl ConnectionEngine {
    /// Creates an idle engine. A fresh connection id is drawn now.
    pub fn new(config: ConnectionConfig) -> Self {
        let connection_id = generate_connection_id();
        let request = connect_request(&config, connection_id);
        let (outbound, outbound_receiver) = unbounded();
        let (processed_sender, processed) = unbounded();
        let (wake, wake_receiver) = bounded(1);
        let (handshake, _) = bounded(1);

        Self {
            config,
            connection_id,
            request,
            state: SharedState::new(),
            stop: Arc::new(AtomicBool::new(false)),
            next_request_id: AtomicU32::new(1),
            next_query_id: AtomicU32::new(1),
            identity: None,
            callbacks: Callbacks::default(),
            outbound,
            outbound_receiver: Some(outbound_receiver),
            processed,
            processed_sender: Some(processed_sender),
            wake,
            wake_receiver: Some(wake_receiver),
            handshake,
            observer: None,
            worker: None,
        }
    }

    /// Starts connecting over `transport`. Returns once the worker is running; the
    /// outcome arrives through [`on_connect`](Self::on_connect) or
    /// [`on_connect_error`](Self::on_connect_error) during a later `pump`.
    pub fn connect<T>(&mut self, transport: T) -> Result<()>
    where
        T: Transport + 'static,
    {
        let state = self.state();
        if state != ConnectionState::Idle {
            return Err(ErrorKind::InvalidState { expected: "idle", actual: state.as_str() });
        }
        let (Some(outbound), Some(processed), Some(wake)) = (
            self.outbound_receiver.take(),
            self.processed_sender.take(),
            self.wake_receiver.take(),
        ) else {
            return Err(ErrorKind::EngineStopped);
        };

        let (handshake, handshake_receiver) = bounded(1);
        let (events_sender, events) = unbounded();
        let observer = TransportObserver::new(
            handshake.clone(),
            events_sender,
            self.wake.clone(),
            self.config.max_message_size,
        );
        self.handshake = handshake;
        self.observer = Some(observer.clone());
        self.state.set(ConnectionState::Connecting);

        let worker = Worker {
            transport: Box::new(transport),
            request: self.request.clone(),
            observer,
            handshake: handshake_receiver,
            events,
            wake,
            outbound,
            processed,
            state: self.state.clone(),
            stop: Arc::clone(&self.stop),
            connect_timeout: self.config.connect_timeout,
            wake_interval: self.config.wake_interval,
            max_message_size: self.config.max_message_size,
        };

        let spawned = thread::Builder::new()
            .name("spacewire-worker".into())
            .spawn(move || worker.run());
        match spawned {
            Ok(handle) => {
                self.worker = Some(handle);
                Ok(())
            }
            Err(err) => {
                self.state.fail(&err.to_string());
                Err(err.into())
            }
        }
    }

    /// Delivers every processed event to the application, in arrival order.
    ///
    /// Server messages go to `dispatch`; connect, connect-error and disconnect
    /// notifications go to the registered callbacks. Never blocks. Returns the
    /// number of server messages dispatched.
    pub fn pump<F>(&mut self, mut dispatch: F) -> usize
    where
        F: FnMut(&ServerMessage),
    {
        let mut dispatched = 0;
        while let Ok(event) = self.processed.try_recv() {
            match event {
                EngineEvent::Message(message) => {
                    if let ServerMessage::IdentityToken(token) = &message {
                        debug!("Assigned identity {}", token.identity);
                        self.identity = Some(token.identity);
                        self.callbacks.connected(&token.identity, &token.token);
                    }
                    dispatch(&message);
                    dispatched += 1;
                }
                EngineEvent::ConnectError(reason) => self.callbacks.connect_failed(&reason),
                EngineEvent::Disconnected(reason) => self.callbacks.disconnected(&reason),
            }
        }
        dispatched
    }

    /// Queues a message for the worker to send.
    ///
    /// Messages queued before the handshake completes go out once it does.
    pub fn send(&self, message: ClientMessage) -> Result<()> {
        let state = self.state();
        if matches!(state, ConnectionState::Closing) || state.is_terminal() {
            return Err(ErrorKind::EngineStopped);
        }
        self.outbound.send(message).map_err(|_| ErrorKind::EngineStopped)?;
        let _ = self.wake.try_send(());
        Ok(())
    }

    /// Calls a reducer with pre-encoded arguments. Returns the request id.
    pub fn call_reducer(&self, reducer: impl Into<String>, args: Vec<u8>) -> Result<u32> {
        let request_id = self.next_request_id();
        self.send(ClientMessage::CallReducer {
            reducer: reducer.into(),
            args,
            request_id,
            flags: 0,
        })?;
        Ok(request_id)
    }

    /// Replaces the legacy subscription set. Returns the request id.
    pub fn subscribe(&self, query_strings: Vec<String>) -> Result<u32> {
        let request_id = self.next_request_id();
        self.send(ClientMessage::Subscribe { query_strings, request_id })?;
        Ok(request_id)
    }

    /// Subscribes to every table. Returns the request id.
    pub fn subscribe_all(&self) -> Result<u32> {
        self.subscribe(vec![SUBSCRIBE_ALL_QUERY.to_string()])
    }

    /// Adds one query. Returns the id to unsubscribe it with.
    pub fn subscribe_single(&self, query: impl Into<String>) -> Result<QueryId> {
        let query_id = self.next_query_id();
        self.send(ClientMessage::SubscribeSingle {
            query: query.into(),
            request_id: self.next_request_id(),
            query_id,
        })?;
        Ok(query_id)
    }

    /// Adds a group of queries. Returns the id to unsubscribe the group with.
    pub fn subscribe_multi(&self, query_strings: Vec<String>) -> Result<QueryId> {
        let query_id = self.next_query_id();
        self.send(ClientMessage::SubscribeMulti {
            query_strings,
            request_id: self.next_request_id(),
            query_id,
        })?;
        Ok(query_id)
    }

    /// Removes a query added with [`subscribe_single`](Self::subscribe_single).
    /// Returns the request id.
    pub fn unsubscribe(&self, query_id: QueryId) -> Result<u32> {
        let request_id = self.next_request_id();
        self.send(ClientMessage::Unsubscribe { request_id, query_id })?;
        Ok(request_id)
    }

    /// Removes a group added with [`subscribe_multi`](Self::subscribe_multi).
    /// Returns the request id.
    pub fn unsubscribe_multi(&self, query_id: QueryId) -> Result<u32> {
        let request_id = self.next_request_id();
        self.send(ClientMessage::UnsubscribeMulti { request_id, query_id })?;
        Ok(request_id)
    }

    /// Runs a query once. The response carries `message_id` back.
    pub fn one_off_query(&self, message_id: Vec<u8>, query: impl Into<String>) -> Result<()> {
        self.send(ClientMessage::OneOffQuery { message_id, query_string: query.into() })
    }

    /// Registers the connect notification.
    pub fn on_connect<F>(&mut self, callback: F)
    where
        F: FnMut(&Identity, &str) + Send + 'static,
    {
        self.callbacks.set_connect(Box::new(callback));
    }

    /// Registers the connect-error notification.
    pub fn on_connect_error<F>(&mut self, callback: F)
    where
        F: FnMut(&str) + Send + 'static,
    {
        self.callbacks.set_connect_error(Box::new(callback));
    }

    /// Registers the disconnect notification.
    pub fn on_disconnect<F>(&mut self, callback: F)
    where
        F: FnMut(&str) + Send + 'static,
    {
        self.callbacks.set_disconnect(Box::new(callback));
    }

    /// Stops the worker and waits for it to exit.
    ///
    /// The transport observer is detached first, so nothing the transport reports
    /// afterwards reaches the engine. Callbacks are dropped. Idempotent.
    pub fn shutdown(&mut self) {
        let Some(worker) = self.worker.take() else {
            self.callbacks.clear();
            return;
        };

        info!("Stopping connection to {}", self.request.url);
        self.stop.store(true, Ordering::Release);
        if let Some(observer) = self.observer.take() {
            observer.detach();
        }
        let _ = self.handshake.try_send(HandshakeSignal::Cancelled);
        let _ = self.wake.try_send(());

        if worker.join().is_err() {
            warn!("Connection worker panicked");
        }
        self.callbacks.clear();
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    /// Why the connection failed, if it did.
    pub fn failure_reason(&self) -> Option<String> {
        self.state.failure_reason()
    }

    /// Identity assigned by the server, once its `IdentityToken` has been pumped.
    pub fn identity(&self) -> Option<Identity> {
        self.identity
    }

    /// The connection id sent in the URL.
    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    /// The request handed to the transport.
    pub fn connect_request(&self) -> &ConnectRequest {
        &self.request
    }

    /// The configuration the engine was built with.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    fn next_request_id(&self) -> u32 {
        self.next_request_id.fetch_add(1, Ordering::Relaxed)
    }

    fn next_query_id(&self) -> QueryId {
        self.next_query_id.fetch_add(1, Ordering::Relaxed)
    }
}

impl Drop for ConnectionEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
