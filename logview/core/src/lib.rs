//! Logview Core - Headless Live Log Streaming
//!
//! This crate holds everything the log viewer does that is not drawing:
//! which pods and containers are selected, which stream that selection maps
//! to, the lifecycle of the single streaming connection, and the terminal
//! surface model the stream is written into. It can drive a TUI, a web
//! front end, or run headless in tests.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          LogViewer (shell)                       │
//! │                                                                  │
//! │  SelectionState ──derive──▶ LogTarget ──▶ StreamConnectionManager│
//! │        ▲                                        │      ▲         │
//! │        │ pickers / toggles              open/close   events      │
//! │        │                                        ▼      │         │
//! │   user input                              LogTransport (ws)      │
//! │                                                 │                │
//! │  ResizeCoordinator ──grid size──▶ TerminalSurface ◀── frames     │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`LogViewer`]: open/close lifecycle, owns every other piece
//! - [`SelectionState`]: pods, containers and display toggles
//! - [`LogTarget`]: derived "what to stream right now"
//! - [`StreamConnectionManager`]: at most one connection, generation fenced
//! - [`TerminalSurface`]: append-only scrollback with a character grid
//! - [`ResizeCoordinator`]: keeps the grid in step with the host geometry
//!
//! # Event Loop
//!
//! ```ignore
//! use logview_core::{LogViewer, ViewerProps, ViewerSettings};
//! use logview_core::transport::WebSocketTransport;
//!
//! let transport = WebSocketTransport::new("ws://127.0.0.1:4654/api/v1/logs/stream", timeout);
//! let mut viewer = LogViewer::new(transport, ViewerSettings::default());
//! viewer.open(ViewerProps::new("prod", "web").with_containers(["app"]));
//!
//! loop {
//!     viewer.observe_geometry(host_geometry);
//!     viewer.poll();
//!     // draw viewer.surface()
//! }
//! ```
//!
//! # No TUI Dependencies
//!
//! This crate has **zero** dependencies on ratatui, crossterm, or any other
//! UI framework.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod discovery;
pub mod error;
pub mod resize;
pub mod selection;
pub mod streaming;
pub mod surface;
pub mod target;
pub mod transport;
pub mod viewer;

// Re-exports for convenience
pub use config::{
    default_config_path, load_config, load_config_from_path, ConfigError, ConfigOverrides,
    ConfigSource, LogviewConfig, LogviewToml,
};
pub use discovery::{DiscoveredPod, DiscoveryError, HttpPodDiscovery, PodDiscovery};
pub use error::LogviewError;
pub use resize::ResizeCoordinator;
pub use selection::{ContainerInfo, ContainerKind, DisplayDefaults, PodInfo, Selection, SelectionState};
pub use streaming::{ConnectionState, ConnectionStats, StreamConnectionManager};
pub use surface::{
    CellMetrics, GridSize, HostGeometry, SizingPolicy, SurfaceId, TerminalSurface,
    FIXED_WIDE_COLUMNS,
};
pub use target::{LogTarget, StreamQuery};
pub use transport::{
    Generation, InProcessTransport, LogConnection, LogTransport, TransportError, TransportEvent,
    TransportEventKind,
};
pub use viewer::{LogViewer, ViewerProps, ViewerSettings};

#[cfg(feature = "websocket")]
pub use transport::WebSocketTransport;
