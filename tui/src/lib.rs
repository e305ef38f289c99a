//! logview TUI - terminal front end for live container logs
//!
//! A thin ratatui surface over `logview-core`. The core owns selection,
//! streaming and the terminal surface model; this crate turns key presses
//! into viewer operations and draws what the viewer holds.
//!
//! # Layout
//!
//! - **Sidebar**: pod picker (when enabled) and container picker
//! - **Log pane**: the tail of the terminal surface
//! - **Status bar**: connection state, toggles and grid size

pub mod app;
pub mod cli;
pub mod theme;
pub mod widgets;

pub use app::{App, Focus};
pub use cli::Args;
