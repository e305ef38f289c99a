//! Integration Test: Layering
//!
//! **Policy**: `logview-core` is headless. It must not depend on or name
//! a terminal UI crate, and it must report failures as errors rather than
//! panicking. Only the `tui` crate talks to the terminal.

use std::fs;

use architectural_enforcement::{assert_no_violations, find_violations, workspace_root};

const UI_CRATES: &[&str] = &["ratatui", "crossterm", "ansi-to-tui"];

/// The core manifest has no UI dependencies
#[test]
fn test_core_manifest_has_no_ui_crates() {
    let manifest = fs::read_to_string(workspace_root().join("logview/core/Cargo.toml"))
        .expect("core manifest readable");
    for krate in UI_CRATES {
        assert!(
            !manifest.lines().any(|l| l.trim_start().starts_with(krate)),
            "logview-core must not depend on {krate}"
        );
    }
}

/// The core sources never name a UI crate
#[test]
fn test_core_sources_have_no_ui_imports() {
    let violations = find_violations(
        "logview/core/src",
        &["ratatui::", "crossterm::", "ansi_to_tui::"],
    );
    assert_no_violations("UI crate used in logview-core", &violations);
}

/// Production code in the core propagates errors
#[test]
fn test_core_does_not_panic_on_errors() {
    let violations = find_violations(
        "logview/core/src",
        &[".unwrap()", ".expect(", "panic!(", "unimplemented!(", "todo!("],
    );
    assert_no_violations("panicking call in logview-core", &violations);
}

/// Blocking waits stay out of the core
#[test]
fn test_core_has_no_blocking_waits() {
    let violations = find_violations(
        "logview/core/src",
        &["std::thread::", "block_on(", "blocking_recv(", "blocking_lock("],
    );
    assert_no_violations("blocking call in logview-core", &violations);
}
