//! Transport Layer for Log Streams
//!
//! Separates the streaming mechanism from the connection state machine:
//! - `InProcess`: scripted channel transport (embedding and tests)
//! - `WebSocket`: the duplex streaming endpoint (feature `websocket`)
//!
//! # Event Model
//!
//! Opening a connection never blocks. The transport spawns whatever work it
//! needs and reports back through an unbounded channel, tagging every event
//! with the [`Generation`] it was opened under. The owner drains the channel
//! on its own loop and discards events from generations it has moved past.
//!
//! ```text
//! manager ──open(query, gen, tx)──▶ transport ──spawn──▶ task
//!    ▲                                                    │
//!    └──────────── TransportEvent { gen, kind } ◀─────────┘
//! ```

use std::fmt;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::target::StreamQuery;

pub mod in_process;
#[cfg(feature = "websocket")]
pub mod websocket;

pub use in_process::{InProcessConnection, InProcessTransport, TransportCall};
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketTransport};

/// Monotonic tag for one connection attempt
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    /// Wrap a raw value
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// The generation after this one
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Raw value
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What happened on a connection
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportEventKind {
    /// The stream is open
    Opened,
    /// A chunk of log text, delivered as received
    Frame(String),
    /// The transport failed
    Error(String),
    /// The stream ended
    Closed,
}

/// A transport event tagged with its connection generation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportEvent {
    /// Generation the connection was opened under
    pub generation: Generation,
    /// The event
    pub kind: TransportEventKind,
}

impl TransportEvent {
    /// Connection opened
    #[must_use]
    pub fn opened(generation: Generation) -> Self {
        Self {
            generation,
            kind: TransportEventKind::Opened,
        }
    }

    /// Log text arrived
    #[must_use]
    pub fn frame(generation: Generation, text: impl Into<String>) -> Self {
        Self {
            generation,
            kind: TransportEventKind::Frame(text.into()),
        }
    }

    /// Transport failure
    #[must_use]
    pub fn error(generation: Generation, message: impl Into<String>) -> Self {
        Self {
            generation,
            kind: TransportEventKind::Error(message.into()),
        }
    }

    /// Stream ended
    #[must_use]
    pub fn closed(generation: Generation) -> Self {
        Self {
            generation,
            kind: TransportEventKind::Closed,
        }
    }
}

/// Sending half handed to a transport on open
pub type EventSender = mpsc::UnboundedSender<TransportEvent>;

/// Receiving half drained by the connection manager
pub type EventReceiver = mpsc::UnboundedReceiver<TransportEvent>;

/// One open (or opening) stream
///
/// Dropping a connection must also tear it down.
pub trait LogConnection: Send {
    /// Request teardown
    ///
    /// Returns immediately; the transport may still deliver a few events
    /// afterwards, which the owner fences by generation.
    fn close(&mut self);

    /// Generation this connection was opened under
    fn generation(&self) -> Generation;
}

/// Something that can open log streams
pub trait LogTransport: Send + Sync {
    /// Start opening a stream for `query`
    ///
    /// Must not block. Every event for this connection is sent on `events`
    /// tagged with `generation`.
    fn open(
        &self,
        query: &StreamQuery,
        generation: Generation,
        events: EventSender,
    ) -> Box<dyn LogConnection>;
}

/// Transport errors
///
/// These never escape the connection manager: they are rendered into
/// [`TransportEventKind::Error`] and shown inline.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The endpoint URL could not be built
    #[error("Invalid stream endpoint: {0}")]
    InvalidEndpoint(String),

    /// Connecting took longer than allowed
    #[error("Connection timed out after {0:?}")]
    ConnectTimeout(Duration),

    /// Handshake or socket failure while connecting
    #[error("Connection failed: {0}")]
    Connect(String),

    /// Failure after the stream was open
    #[error("Stream error: {0}")]
    Protocol(String),
}
