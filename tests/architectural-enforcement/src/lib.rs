//! Architectural Enforcement Integration Tests
//!
//! Source-scanning checks that keep the workspace honest:
//! - The core crate stays headless (no terminal UI dependencies)
//! - Production code never sleeps; it waits on I/O, channels or timers
//! - The core crate propagates errors instead of panicking
//!
//! Helpers here are shared by the tests in `tests/`.

use std::fs;
use std::path::{Path, PathBuf};

/// Workspace root (two levels above this package)
#[must_use]
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
}

/// A line of production code
#[derive(Debug)]
pub struct SourceLine {
    /// File the line belongs to
    pub path: PathBuf,
    /// 1-based line number
    pub number: usize,
    /// Line text with any `//` comment removed
    pub code: String,
}

impl std::fmt::Display for SourceLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{} - {}", self.path.display(), self.number, self.code.trim())
    }
}

/// Every `.rs` file under `dir` (relative to the workspace root)
#[must_use]
pub fn rust_files(dir: &str) -> Vec<PathBuf> {
    let root = workspace_root().join(dir);
    walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .map(|e| e.into_path())
        .collect()
}

/// Production lines of every file under `dir`
///
/// Comments are stripped and scanning of a file stops at its
/// `#[cfg(test)]` module, which by convention closes the file.
#[must_use]
pub fn production_lines(dir: &str) -> Vec<SourceLine> {
    let mut lines = Vec::new();
    for path in rust_files(dir) {
        let Ok(content) = fs::read_to_string(&path) else {
            continue;
        };
        for (idx, line) in content.lines().enumerate() {
            if line.trim_start().starts_with("#[cfg(test)]") {
                break;
            }
            let code = line.split("//").next().unwrap_or(line);
            if code.trim().is_empty() {
                continue;
            }
            lines.push(SourceLine {
                path: path.clone(),
                number: idx + 1,
                code: code.to_string(),
            });
        }
    }
    lines
}

/// Lines under `dir` containing any of `patterns`
#[must_use]
pub fn find_violations(dir: &str, patterns: &[&str]) -> Vec<SourceLine> {
    production_lines(dir)
        .into_iter()
        .filter(|line| patterns.iter().any(|p| line.code.contains(p)))
        .collect()
}

/// Panic listing `violations` if there are any
pub fn assert_no_violations(rule: &str, violations: &[SourceLine]) {
    if violations.is_empty() {
        return;
    }
    for violation in violations {
        eprintln!("  ❌ {violation}");
    }
    panic!("\n{rule}: {} violation(s) found", violations.len());
}
