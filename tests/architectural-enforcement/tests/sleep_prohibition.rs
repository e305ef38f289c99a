//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code MUST NOT call sleep. The viewer is driven
//! by polling from the UI loop and by timers, and the initial connection
//! delay is a deadline compared against the clock, not a pause.
//! **Exceptions**: test code (`#[cfg(test)]` modules and `tests/` dirs).

use architectural_enforcement::{assert_no_violations, find_violations, production_lines};

const SLEEP_PATTERNS: &[&str] = &["::sleep(", ".sleep(", "sleep_until("];

/// The core never sleeps
#[test]
fn test_no_sleep_in_core() {
    let violations = find_violations("logview/core/src", SLEEP_PATTERNS);
    assert_no_violations("sleep in logview-core", &violations);
}

/// The TUI paces frames with an interval, not sleep
#[test]
fn test_no_sleep_in_tui() {
    let violations = find_violations("tui/src", SLEEP_PATTERNS);
    assert_no_violations("sleep in logview-tui", &violations);
}

/// The scan actually saw the sources
#[test]
fn test_sources_found() {
    assert!(!production_lines("logview/core/src").is_empty());
    assert!(!production_lines("tui/src").is_empty());
}
