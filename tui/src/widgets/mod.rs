//! Widgets
//!
//! - [`LogPane`]: tail view of the terminal surface
//! - [`Picker`]: multi-select list for pods and containers
//! - [`StatusBar`]: connection state and toggles

pub mod log_pane;
pub mod picker;
pub mod status_bar;

pub use log_pane::{LogPane, LogPaneState};
pub use picker::{Picker, PickerEntry, PickerGroup, PickerItem};
pub use status_bar::StatusBar;
