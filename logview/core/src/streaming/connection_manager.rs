//! Stream Connection Manager Implementation

use std::fmt;

use tokio::sync::mpsc;

use crate::surface::TerminalSurface;
use crate::target::LogTarget;
use crate::transport::{
    EventReceiver, EventSender, Generation, LogConnection, LogTransport, TransportEvent,
    TransportEventKind,
};

// ============================================================================
// Connection State
// ============================================================================

/// Status of the viewer's stream
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Nothing to stream
    #[default]
    Idle,
    /// Waiting for the transport to open
    Connecting,
    /// Stream is open
    Connected,
    /// Stream ended normally
    Disconnected,
    /// Stream failed; stays visible until the next connection
    Errored,
}

impl ConnectionState {
    /// Short lowercase label for status indicators
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Errored => "error",
        }
    }

    /// Whether a connection is in flight or open
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Counters for one manager
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConnectionStats {
    /// Connections opened
    pub connections_opened: u64,
    /// Frames written to the surface
    pub frames_written: u64,
    /// Bytes of frame text written to the surface
    pub bytes_written: u64,
    /// Events discarded because their generation was superseded
    pub stale_events_dropped: u64,
}

// ============================================================================
// Status Lines
// ============================================================================

const YELLOW: &str = "\u{1b}[33m";
const GREEN: &str = "\u{1b}[32m";
const RED: &str = "\u{1b}[31m";
const DIM: &str = "\u{1b}[2m";
const RESET: &str = "\u{1b}[0m";

fn status_line(colour: &str, text: &str) -> String {
    format!("{colour}[logview] {text}{RESET}\r\n")
}

// ============================================================================
// Manager
// ============================================================================

struct ActiveStream {
    connection: Box<dyn LogConnection>,
}

/// Owns the single streaming connection of a viewer
///
/// All methods are synchronous; events from the transport are queued on a
/// channel and applied by [`poll`](Self::poll), in arrival order, on the
/// caller's loop.
pub struct StreamConnectionManager<T: LogTransport> {
    transport: T,
    state: ConnectionState,
    /// Generation of the most recent open
    generation: Generation,
    active: Option<ActiveStream>,
    /// Valid target the current generation was opened for
    target: Option<LogTarget>,
    events_tx: EventSender,
    events_rx: EventReceiver,
    stats: ConnectionStats,
}

impl<T: LogTransport> StreamConnectionManager<T> {
    /// Create an idle manager
    #[must_use]
    pub fn new(transport: T) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            transport,
            state: ConnectionState::Idle,
            generation: Generation::default(),
            active: None,
            target: None,
            events_tx,
            events_rx,
            stats: ConnectionStats::default(),
        }
    }

    /// Current status
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Generation of the most recent connection attempt
    #[must_use]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Counters
    #[must_use]
    pub fn stats(&self) -> ConnectionStats {
        self.stats
    }

    /// Target currently being streamed, if any
    #[must_use]
    pub fn current_target(&self) -> Option<&LogTarget> {
        self.target.as_ref()
    }

    /// The transport in use
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Whether a connection handle is held
    #[must_use]
    pub fn has_connection(&self) -> bool {
        self.active.is_some()
    }

    /// Point the manager at a new target
    ///
    /// `None` or an invalid target closes any connection and returns to
    /// `Idle`. The same target as before is a no-op. Any other valid target
    /// closes the old connection first and then opens a new one.
    ///
    /// Returns `true` if a new connection was opened.
    pub fn apply_target(&mut self, target: Option<&LogTarget>, surface: &mut TerminalSurface) -> bool {
        let Some(target) = target.filter(|t| t.is_valid()) else {
            if self.target.is_some() || self.active.is_some() {
                tracing::debug!(generation = %self.generation, "target invalid, stopping stream");
            }
            self.stop();
            return false;
        };

        if self.target.as_ref() == Some(target) {
            return false;
        }

        self.connect(target.clone(), surface);
        true
    }

    /// Reconnect to the current target
    ///
    /// Returns `false` (and does nothing) when there is no valid target.
    pub fn refresh(&mut self, surface: &mut TerminalSurface) -> bool {
        let Some(target) = self.target.clone() else {
            return false;
        };
        tracing::info!(generation = %self.generation, "refresh requested");
        self.connect(target, surface);
        true
    }

    /// Close any connection and return to `Idle`
    pub fn shutdown(&mut self) {
        self.stop();
    }

    /// Apply every queued transport event
    ///
    /// Returns the number of events that were applied (stale events are not
    /// counted).
    pub fn poll(&mut self, surface: &mut TerminalSurface) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            if self.is_stale(&event) {
                self.stats.stale_events_dropped += 1;
                tracing::trace!(
                    event_generation = %event.generation,
                    generation = %self.generation,
                    "stale transport event dropped"
                );
                continue;
            }
            self.handle(event.kind, surface);
            applied += 1;
        }
        applied
    }

    fn is_stale(&self, event: &TransportEvent) -> bool {
        event.generation != self.generation || self.active.is_none()
    }

    fn handle(&mut self, kind: TransportEventKind, surface: &mut TerminalSurface) {
        match kind {
            TransportEventKind::Opened => {
                if self.state == ConnectionState::Connecting {
                    self.transition(ConnectionState::Connected);
                    surface.write(&status_line(GREEN, "connected"));
                }
            }
            TransportEventKind::Frame(text) => {
                self.stats.frames_written += 1;
                self.stats.bytes_written += text.len() as u64;
                surface.write(&text);
            }
            TransportEventKind::Error(message) => {
                if self.state.is_active() {
                    tracing::warn!(generation = %self.generation, error = %message, "log stream error");
                    self.transition(ConnectionState::Errored);
                    surface.write(&status_line(RED, &format!("error: {message}")));
                }
            }
            TransportEventKind::Closed => {
                if self.state.is_active() {
                    self.transition(ConnectionState::Disconnected);
                    surface.write(&status_line(DIM, "disconnected"));
                }
                if let Some(mut active) = self.active.take() {
                    active.connection.close();
                }
            }
        }
    }

    fn connect(&mut self, target: LogTarget, surface: &mut TerminalSurface) {
        self.close_active();

        self.generation = self.generation.next();
        let query = target.query();
        surface.write(&status_line(
            YELLOW,
            &format!(
                "connecting to {}/{} (pods: {}, containers: {})",
                target.context_id, target.namespace, target.pods, target.containers
            ),
        ));

        let connection = self
            .transport
            .open(&query, self.generation, self.events_tx.clone());
        self.active = Some(ActiveStream { connection });
        self.target = Some(target);
        self.stats.connections_opened += 1;
        self.transition(ConnectionState::Connecting);
    }

    fn close_active(&mut self) {
        if let Some(mut active) = self.active.take() {
            tracing::debug!(generation = %active.connection.generation(), "closing log stream");
            active.connection.close();
        }
    }

    fn stop(&mut self) {
        self.close_active();
        self.target = None;
        if self.state != ConnectionState::Idle {
            self.transition(ConnectionState::Idle);
        }
    }

    fn transition(&mut self, to: ConnectionState) {
        let from = self.state;
        self.state = to;
        tracing::info!(
            generation = %self.generation,
            from = from.label(),
            to = to.label(),
            "stream state changed"
        );
    }
}

impl<T: LogTransport> Drop for StreamConnectionManager<T> {
    fn drop(&mut self) {
        self.close_active();
    }
}
