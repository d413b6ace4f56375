//! Background worker owning the transport.
//!
//! One cycle: drain raw inbound events, drain the outbound queue, then wait for the
//! wake signal or the wake interval, whichever comes first.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    time::Duration,
};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use spacewire_core::{
    constants::{CLOSE_NORMAL, CLOSE_TOO_BIG},
    error::Result,
    transport::{ConnectRequest, HandshakeSignal, RawFrame, Transport, TransportEvent, TransportObserver},
};
use spacewire_sats::{decompress_frame, Bsatn, ClientMessage, ServerMessage};
use tracing::{debug, error, info, trace, warn};

use crate::events::{ConnectionState, EngineEvent};

#[derive(Debug)]
struct StateCell {
    state: ConnectionState,
    failure_reason: Option<String>,
}

/// Connection state readable from both threads.
#[derive(Debug, Clone)]
pub(crate) struct SharedState {
    inner: Arc<Mutex<StateCell>>,
}

impl SharedState {
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(StateCell {
                state: ConnectionState::Idle,
                failure_reason: None,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StateCell> {
        // The cell holds plain values; a panic elsewhere cannot leave it half-written.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn get(&self) -> ConnectionState {
        self.lock().state
    }

    pub(crate) fn set(&self, state: ConnectionState) {
        let mut cell = self.lock();
        debug!("Connection state {} -> {}", cell.state, state);
        cell.state = state;
    }

    /// Moves to `next` unless the current state is terminal.
    pub(crate) fn advance(&self, next: ConnectionState) {
        let mut cell = self.lock();
        if !cell.state.is_terminal() {
            debug!("Connection state {} -> {}", cell.state, next);
            cell.state = next;
        }
    }

    pub(crate) fn fail(&self, reason: &str) {
        let mut cell = self.lock();
        cell.state = ConnectionState::Failed;
        cell.failure_reason = Some(reason.to_string());
    }

    pub(crate) fn failure_reason(&self) -> Option<String> {
        self.lock().failure_reason.clone()
    }
}

/// Receiving ends and settings the worker needs, bundled for the thread spawn.
pub(crate) struct Worker {
    pub(crate) transport: Box<dyn Transport>,
    pub(crate) request: ConnectRequest,
    pub(crate) observer: TransportObserver,
    pub(crate) handshake: Receiver<HandshakeSignal>,
    pub(crate) events: Receiver<TransportEvent>,
    pub(crate) wake: Receiver<()>,
    pub(crate) outbound: Receiver<ClientMessage>,
    pub(crate) processed: Sender<EngineEvent>,
    pub(crate) state: SharedState,
    pub(crate) stop: Arc<AtomicBool>,
    pub(crate) connect_timeout: Duration,
    pub(crate) wake_interval: Duration,
    pub(crate) max_message_size: usize,
}

/// How the handshake ended when it did not fail.
enum Handshake {
    Opened,
    Cancelled,
}

/// Why the steady-state loop ended.
enum Exit {
    Stopped,
    Closed,
}

impl Worker {
    /// Thread entry point.
    pub(crate) fn run(mut self) {
        match self.handshake() {
            Ok(Handshake::Opened) => {}
            Ok(Handshake::Cancelled) => {
                self.cancel();
                return;
            }
            Err(reason) => {
                self.connect_failed(&reason);
                return;
            }
        }

        match self.service() {
            Exit::Stopped => {
                info!("Shutting down connection");
                self.state.advance(ConnectionState::Closing);
                self.transport.close(CLOSE_NORMAL, "Client shutdown");
                self.state.advance(ConnectionState::Closed);
            }
            Exit::Closed => self.state.advance(ConnectionState::Closed),
        }
        self.observer.detach();
        debug!("Connection worker exited");
    }

    /// Starts the transport and blocks until it reports the outcome or the timeout
    /// elapses. Returns the failure reason on error.
    fn handshake(&mut self) -> std::result::Result<Handshake, String> {
        info!("Connecting to {}", self.request.url);
        self.transport
            .connect(&self.request, self.observer.clone())
            .map_err(|err| format!("connect failed: {}", err))?;

        match self.handshake.recv_timeout(self.connect_timeout) {
            Ok(HandshakeSignal::Opened) => {
                if self.stop.load(Ordering::Acquire) {
                    // Open won the race against shutdown; the loop exits right away.
                    debug!("Transport opened during shutdown");
                } else {
                    info!("Connected to {}", self.request.url);
                }
                self.state.advance(ConnectionState::Open);
                Ok(Handshake::Opened)
            }
            Ok(HandshakeSignal::Failed(reason)) => Err(reason),
            Ok(HandshakeSignal::Cancelled) => Ok(Handshake::Cancelled),
            Err(RecvTimeoutError::Timeout) if self.stop.load(Ordering::Acquire) => {
                Ok(Handshake::Cancelled)
            }
            Err(RecvTimeoutError::Timeout) => Err("WebSocket connect timed out".into()),
            Err(RecvTimeoutError::Disconnected) => Err("connect signal lost".into()),
        }
    }

    /// Shutdown arrived before the transport opened. Not a failure: no reason is
    /// recorded and no connect error is reported.
    fn cancel(&mut self) {
        info!("Connect to {} cancelled", self.request.url);
        self.observer.detach();
        self.state.advance(ConnectionState::Closing);
        self.transport.close(CLOSE_NORMAL, "Client shutdown");
        self.state.advance(ConnectionState::Closed);
    }

    fn connect_failed(&mut self, reason: &str) {
        error!("Connection failed: {}", reason);
        self.observer.detach();
        self.state.fail(reason);
        let _ = self.processed.send(EngineEvent::ConnectError(reason.to_string()));
    }

    fn service(&mut self) -> Exit {
        loop {
            if self.stop.load(Ordering::Acquire) {
                return Exit::Stopped;
            }

            while let Ok(event) = self.events.try_recv() {
                if let Some(exit) = self.handle_event(event) {
                    return exit;
                }
            }

            while let Ok(message) = self.outbound.try_recv() {
                self.send(&message);
            }

            match self.wake.recv_timeout(self.wake_interval) {
                Ok(()) | Err(RecvTimeoutError::Timeout) => {}
                // Every sender is gone: nobody can stop us any other way.
                Err(RecvTimeoutError::Disconnected) => return Exit::Stopped,
            }
        }
    }

    fn handle_event(&mut self, event: TransportEvent) -> Option<Exit> {
        match event {
            TransportEvent::Frame(frame) => {
                self.handle_frame(frame);
                None
            }
            TransportEvent::Oversized { len } => {
                error!("Inbound frame of {} bytes exceeds the size limit, closing", len);
                self.observer.detach();
                self.state.advance(ConnectionState::Closing);
                self.transport.close(CLOSE_TOO_BIG, "Message too big");
                let _ = self.processed.send(EngineEvent::Disconnected("Message too big".into()));
                Some(Exit::Closed)
            }
            TransportEvent::Closed { code, reason, was_clean } => {
                let reason = if was_clean {
                    info!("Connection closed cleanly ({})", code);
                    String::new()
                } else {
                    warn!("Connection closed ({}): {}", code, reason);
                    format!("WebSocket closed: {}", reason)
                };
                let _ = self.processed.send(EngineEvent::Disconnected(reason));
                Some(Exit::Closed)
            }
        }
    }

    fn handle_frame(&mut self, frame: RawFrame) {
        match decode_frame(&frame.bytes, self.max_message_size) {
            Ok(message) => {
                trace!(
                    "Decoded {} from {} byte frame in {:?}",
                    message.kind(),
                    frame.bytes.len(),
                    frame.received_at.elapsed()
                );
                let _ = self.processed.send(EngineEvent::Message(message));
            }
            Err(err) => warn!("Dropping inbound frame of {} bytes: {}", frame.bytes.len(), err),
        }
    }

    fn send(&mut self, message: &ClientMessage) {
        let bytes = message.to_bytes();
        trace!("Sending {} ({} bytes)", message.kind(), bytes.len());
        if let Err(err) = self.transport.send(&bytes) {
            error!("Error occurred sending {}: {}", message.kind(), err);
        }
    }
}

/// Decompresses and decodes one frame. A gzip payload may not inflate past
/// `max_message_size` bytes.
pub fn decode_frame(frame: &[u8], max_message_size: usize) -> Result<ServerMessage> {
    let payload = decompress_frame(frame, max_message_size)?;
    ServerMessage::from_bytes(&payload)
}

#[cfg(test)]
mod tests {
    use spacewire_core::{
        config::Compression,
        constants::MAX_MESSAGE_SIZE,
        error::ErrorKind,
    };
    use spacewire_sats::{compress_frame, message::TransactionUpdateLight};

    use super::*;

    #[test]
    fn test_decode_frame_plain_and_gzip() {
        let message = ServerMessage::TransactionUpdateLight(TransactionUpdateLight {
            request_id: 5,
            update: Default::default(),
        });
        let payload = message.to_bytes();

        for compression in [Compression::None, Compression::Gzip] {
            let frame = compress_frame(&payload, compression).unwrap();
            assert_eq!(decode_frame(&frame, MAX_MESSAGE_SIZE).unwrap(), message);
        }
    }

    #[test]
    fn test_decode_frame_unknown_message() {
        assert!(decode_frame(&[0, 200], MAX_MESSAGE_SIZE).is_err());
    }

    #[test]
    fn test_decode_frame_rejects_gzip_over_size_limit() {
        let mut payload = ServerMessage::TransactionUpdateLight(TransactionUpdateLight {
            request_id: 1,
            update: Default::default(),
        })
        .to_bytes();
        payload.resize(payload.len() + 8192, 0);
        let frame = compress_frame(&payload, Compression::Gzip).unwrap();
        assert!(frame.len() < 1024);

        assert!(matches!(decode_frame(&frame, 1024), Err(ErrorKind::Decompression(_))));
    }

    #[test]
    fn test_terminal_state_is_sticky() {
        let state = SharedState::new();
        state.fail("boom");
        state.advance(ConnectionState::Closed);
        assert_eq!(state.get(), ConnectionState::Failed);
        assert_eq!(state.failure_reason().as_deref(), Some("boom"));
    }
}
