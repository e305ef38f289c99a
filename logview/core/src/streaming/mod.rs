//! Streaming Connection Management
//!
//! Keeps at most one live log stream per viewer and writes what it receives
//! into the terminal surface.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                  StreamConnectionManager                     │
//! │                                                              │
//! │  apply_target(B) ──▶ close(A) ──▶ generation += 1 ──▶ open(B)│
//! │                                                              │
//! │  poll() ──try_recv──▶ TransportEvent { gen, kind }           │
//! │             │                                                │
//! │             ├── gen != current ──▶ dropped (stale)           │
//! │             └── gen == current ──▶ state machine ──▶ surface │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # State Machine
//!
//! - `Idle` → valid target → `Connecting`
//! - `Connecting` → opened → `Connected`
//! - `Connecting`/`Connected` → error → `Errored`
//! - `Connected` → closed → `Disconnected`; `Errored` stays `Errored`
//! - any → invalid target or shutdown → `Idle`
//! - any → new valid target → close, then `Connecting`
//!
//! There is no automatic retry. A new connection is only made when the
//! target changes or [`StreamConnectionManager::refresh`] is called.

mod connection_manager;

pub use connection_manager::{ConnectionState, ConnectionStats, StreamConnectionManager};
