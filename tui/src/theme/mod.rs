//! Theme and Colors
//!
//! The viewer palette. Status colours match the inline status lines the
//! stream manager writes into the log, so the status bar and the log agree.

use ratatui::style::{Color, Modifier, Style};

use logview_core::ConnectionState;

// ============================================================================
// Connection status
// ============================================================================

/// Connecting - yellow, same as the inline "connecting" line
pub const CONNECTING_YELLOW: Color = Color::Yellow;

/// Connected - green
pub const CONNECTED_GREEN: Color = Color::Green;

/// Error - red
pub const ERROR_RED: Color = Color::Rgb(255, 80, 80);

/// Idle and disconnected - dim gray
pub const DIM_GRAY: Color = Color::Rgb(110, 110, 110);

// ============================================================================
// UI Colors
// ============================================================================

/// Accent for focused borders and titles
pub const ACCENT: Color = Color::Magenta;

/// Checked picker entries and enabled toggles
pub const TOGGLE_ON: Color = Color::Rgb(120, 230, 120);

/// Highlighted picker row background
pub const HIGHLIGHT_BG: Color = Color::Rgb(60, 60, 80);

/// Colour for a connection state
#[must_use]
pub fn state_color(state: ConnectionState) -> Color {
    match state {
        ConnectionState::Idle | ConnectionState::Disconnected => DIM_GRAY,
        ConnectionState::Connecting => CONNECTING_YELLOW,
        ConnectionState::Connected => CONNECTED_GREEN,
        ConnectionState::Errored => ERROR_RED,
    }
}

/// Border style for a panel
#[must_use]
pub fn border_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(DIM_GRAY)
    }
}

/// Style for an on/off toggle label
#[must_use]
pub fn toggle_style(enabled: bool) -> Style {
    if enabled {
        Style::default().fg(TOGGLE_ON)
    } else {
        Style::default().fg(DIM_GRAY)
    }
}
