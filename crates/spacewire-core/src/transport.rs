//! Transport abstraction for pluggable I/O.
//!
//! The engine never opens sockets itself. The embedding application hands it a
//! [`Transport`] (a websocket client, a test double, ...) and the engine drives it
//! from its worker thread. The transport reports back through a
//! [`TransportObserver`], which feeds the engine's queues.

use std::{
    fmt,
    io::Result,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Instant,
};

use crossbeam_channel::Sender;

/// Everything a transport needs to open the connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectRequest {
    /// Full subscribe URL including query parameters.
    pub url: String,
    /// Websocket sub-protocol.
    pub protocol: String,
    /// Extra upgrade headers, e.g. `Authorization`.
    pub headers: Vec<(String, String)>,
}

impl ConnectRequest {
    /// Returns the value of `name` if the request carries that header.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Message-oriented, bidirectional transport.
///
/// Implementations must deliver sends to the peer in call order.
pub trait Transport: Send {
    /// Starts opening the connection. The outcome is reported asynchronously through
    /// [`TransportObserver::opened`] or [`TransportObserver::connection_error`].
    fn connect(&mut self, request: &ConnectRequest, observer: TransportObserver) -> Result<()>;

    /// Sends one binary message.
    fn send(&mut self, payload: &[u8]) -> Result<()>;

    /// Closes the connection with a close code and reason.
    fn close(&mut self, code: u16, reason: &str);
}

/// Outcome of the opening handshake, consumed once by the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeSignal {
    /// The transport is open.
    Opened,
    /// The transport failed to open.
    Failed(String),
    /// The owner gave up waiting (shutdown during connect).
    Cancelled,
}

/// One inbound frame as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// Frame bytes: compression tag followed by payload.
    pub bytes: Vec<u8>,
    /// When the observer accepted the frame.
    pub received_at: Instant,
}

/// Post-handshake transport notifications, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A frame within the size cap.
    Frame(RawFrame),
    /// A frame over the size cap was refused; only its length is kept.
    Oversized {
        /// Size of the refused frame.
        len: usize,
    },
    /// The connection closed.
    Closed {
        /// Close code.
        code: u16,
        /// Close reason supplied by the peer or transport.
        reason: String,
        /// Whether the close handshake completed.
        was_clean: bool,
    },
}

struct ObserverInner {
    attached: AtomicBool,
    handshake: Sender<HandshakeSignal>,
    events: Sender<TransportEvent>,
    wake: Sender<()>,
    max_message_size: usize,
}

/// Handle a transport uses to report back to the engine.
///
/// Clones share one registration: [`detach`](Self::detach) on any clone silences all
/// of them, and every report made after that is dropped.
#[derive(Clone)]
pub struct TransportObserver {
    inner: Arc<ObserverInner>,
}

impl fmt::Debug for TransportObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportObserver")
            .field("attached", &self.is_attached())
            .field("max_message_size", &self.inner.max_message_size)
            .finish()
    }
}

impl TransportObserver {
    /// Creates an attached observer feeding the given channels.
    ///
    /// `handshake` and `wake` are expected to be bounded; reports that find them full
    /// are dropped since one pending signal is enough.
    pub fn new(
        handshake: Sender<HandshakeSignal>,
        events: Sender<TransportEvent>,
        wake: Sender<()>,
        max_message_size: usize,
    ) -> Self {
        Self {
            inner: Arc::new(ObserverInner {
                attached: AtomicBool::new(true),
                handshake,
                events,
                wake,
                max_message_size,
            }),
        }
    }

    /// Reports that the connection is open.
    pub fn opened(&self) {
        if self.is_attached() {
            let _ = self.inner.handshake.try_send(HandshakeSignal::Opened);
        }
    }

    /// Reports that the connection could not be opened.
    pub fn connection_error(&self, reason: impl Into<String>) {
        if self.is_attached() {
            let _ = self.inner.handshake.try_send(HandshakeSignal::Failed(reason.into()));
        }
    }

    /// Hands over one inbound frame. Frames over the size cap are replaced by an
    /// [`TransportEvent::Oversized`] notice.
    pub fn message(&self, bytes: Vec<u8>) {
        if !self.is_attached() {
            return;
        }
        let event = if bytes.len() > self.inner.max_message_size {
            TransportEvent::Oversized { len: bytes.len() }
        } else {
            TransportEvent::Frame(RawFrame { bytes, received_at: Instant::now() })
        };
        self.push(event);
    }

    /// Reports that the connection closed.
    pub fn closed(&self, code: u16, reason: impl Into<String>, was_clean: bool) {
        if !self.is_attached() {
            return;
        }
        let reason = reason.into();
        // A close before the handshake completes is a failed connect.
        let _ = self.inner.handshake.try_send(HandshakeSignal::Failed(reason.clone()));
        self.push(TransportEvent::Closed { code, reason, was_clean });
    }

    /// Detaches every clone of this observer. Idempotent.
    pub fn detach(&self) {
        self.inner.attached.store(false, Ordering::Release);
    }

    /// Returns true until [`detach`](Self::detach) is called.
    pub fn is_attached(&self) -> bool {
        self.inner.attached.load(Ordering::Acquire)
    }

    /// Returns the inbound frame cap.
    pub fn max_message_size(&self) -> usize {
        self.inner.max_message_size
    }

    fn push(&self, event: TransportEvent) {
        if self.inner.events.send(event).is_ok() {
            let _ = self.inner.wake.try_send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use crossbeam_channel::{bounded, unbounded, Receiver};

    use super::*;

    struct Channels {
        handshake: Receiver<HandshakeSignal>,
        events: Receiver<TransportEvent>,
        wake: Receiver<()>,
    }

    fn observer(max: usize) -> (TransportObserver, Channels) {
        let (handshake_tx, handshake) = bounded(1);
        let (events_tx, events) = unbounded();
        let (wake_tx, wake) = bounded(1);
        (
            TransportObserver::new(handshake_tx, events_tx, wake_tx, max),
            Channels { handshake, events, wake },
        )
    }

    #[test]
    fn test_frame_is_queued_and_wakes() {
        let (observer, channels) = observer(16);
        observer.message(vec![0, 1, 2]);

        match channels.events.try_recv().unwrap() {
            TransportEvent::Frame(frame) => assert_eq!(frame.bytes, vec![0, 1, 2]),
            other => panic!("unexpected event {:?}", other),
        }
        assert!(channels.wake.try_recv().is_ok());
    }

    #[test]
    fn test_oversized_frame_is_not_queued() {
        let (observer, channels) = observer(4);
        observer.message(vec![0; 5]);

        assert_eq!(channels.events.try_recv().unwrap(), TransportEvent::Oversized { len: 5 });
    }

    #[test]
    fn test_only_first_handshake_signal_is_kept() {
        let (observer, channels) = observer(4);
        observer.opened();
        observer.connection_error("late");

        assert_eq!(channels.handshake.try_recv().unwrap(), HandshakeSignal::Opened);
        assert!(channels.handshake.try_recv().is_err());
    }

    #[test]
    fn test_detach_silences_all_clones() {
        let (observer, channels) = observer(16);
        let clone = observer.clone();
        observer.detach();

        clone.opened();
        clone.message(vec![1]);
        clone.closed(1000, "bye", true);

        assert!(!clone.is_attached());
        assert!(channels.handshake.try_recv().is_err());
        assert!(channels.events.try_recv().is_err());
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let request = ConnectRequest {
            url: "ws://x".into(),
            protocol: "p".into(),
            headers: vec![("Authorization".into(), "Bearer t".into())],
        };
        assert_eq!(request.header("authorization"), Some("Bearer t"));
        assert_eq!(request.header("Cookie"), None);
    }
}
