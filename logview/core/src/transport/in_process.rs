//! In-Process Transport
//!
//! A channel-backed transport driven by the caller instead of a network.
//! Used when embedding the viewer with a local log source and throughout the
//! test suite, where it records every open/close so ordering can be checked.
//!
//! # Usage
//!
//! ```ignore
//! let transport = InProcessTransport::new();
//! let mut viewer = LogViewer::new(transport.clone(), settings);
//! viewer.open(props);
//!
//! let generation = viewer.generation();
//! transport.emit(generation, TransportEventKind::Opened);
//! transport.emit(generation, TransportEventKind::Frame("hello\n".into()));
//! viewer.poll();
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::target::StreamQuery;

use super::{EventSender, Generation, LogConnection, LogTransport, TransportEvent, TransportEventKind};

/// A recorded transport call
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportCall {
    /// A connection was opened
    Open {
        /// Generation it was opened under
        generation: Generation,
        /// Query it was opened with
        query: StreamQuery,
    },
    /// A connection was closed
    Close {
        /// Generation that was closed
        generation: Generation,
    },
}

#[derive(Default)]
struct Inner {
    calls: Vec<TransportCall>,
    open: Vec<Generation>,
    max_concurrent: usize,
    // Kept after close so tests can deliver late events
    senders: HashMap<Generation, EventSender>,
    auto_open: bool,
}

impl Inner {
    fn close(&mut self, generation: Generation) {
        if let Some(pos) = self.open.iter().position(|g| *g == generation) {
            self.open.remove(pos);
            self.calls.push(TransportCall::Close { generation });
        }
    }
}

/// Caller-driven transport
///
/// Clones share state, so a test can keep one handle while the viewer owns
/// another.
#[derive(Clone, Default)]
pub struct InProcessTransport {
    inner: Arc<Mutex<Inner>>,
}

impl InProcessTransport {
    /// Create a transport that waits for the caller to emit `Opened`
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport that reports `Opened` as soon as a stream opens
    #[must_use]
    pub fn auto_open() -> Self {
        let transport = Self::default();
        transport.inner.lock().auto_open = true;
        transport
    }

    /// Deliver an event for `generation`
    ///
    /// Works even after the connection was closed, to simulate late frames.
    /// Returns `false` if nothing was ever opened under that generation or
    /// the receiver is gone.
    pub fn emit(&self, generation: Generation, kind: TransportEventKind) -> bool {
        let inner = self.inner.lock();
        inner
            .senders
            .get(&generation)
            .is_some_and(|tx| tx.send(TransportEvent { generation, kind }).is_ok())
    }

    /// Every open/close, in call order
    #[must_use]
    pub fn calls(&self) -> Vec<TransportCall> {
        self.inner.lock().calls.clone()
    }

    /// Number of open calls so far
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|c| matches!(c, TransportCall::Open { .. }))
            .count()
    }

    /// Generations currently open
    #[must_use]
    pub fn open_connections(&self) -> Vec<Generation> {
        self.inner.lock().open.clone()
    }

    /// Highest number of simultaneously open connections seen
    #[must_use]
    pub fn max_concurrent(&self) -> usize {
        self.inner.lock().max_concurrent
    }

    /// Query of the most recent open
    #[must_use]
    pub fn last_query(&self) -> Option<StreamQuery> {
        self.inner.lock().calls.iter().rev().find_map(|c| match c {
            TransportCall::Open { query, .. } => Some(query.clone()),
            TransportCall::Close { .. } => None,
        })
    }
}

impl LogTransport for InProcessTransport {
    fn open(
        &self,
        query: &StreamQuery,
        generation: Generation,
        events: EventSender,
    ) -> Box<dyn LogConnection> {
        let mut inner = self.inner.lock();
        inner.calls.push(TransportCall::Open {
            generation,
            query: query.clone(),
        });
        inner.open.push(generation);
        inner.max_concurrent = inner.max_concurrent.max(inner.open.len());
        if inner.auto_open {
            let _ = events.send(TransportEvent::opened(generation));
        }
        inner.senders.insert(generation, events);

        tracing::trace!(%generation, "in-process stream opened");

        Box::new(InProcessConnection {
            inner: Arc::clone(&self.inner),
            generation,
            closed: false,
        })
    }
}

/// Connection handle returned by [`InProcessTransport`]
pub struct InProcessConnection {
    inner: Arc<Mutex<Inner>>,
    generation: Generation,
    closed: bool,
}

impl LogConnection for InProcessConnection {
    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.inner.lock().close(self.generation);
    }

    fn generation(&self) -> Generation {
        self.generation
    }
}

impl Drop for InProcessConnection {
    fn drop(&mut self) {
        self.close();
    }
}
