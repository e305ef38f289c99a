//! Terminal Surface
//!
//! An append-only scrollback with a fixed character grid. Text is written
//! verbatim in arrival order (ANSI escapes included) and broken into rows
//! at the grid width. The grid size comes from one of two sizing policies:
//!
//! - **Reflow** (wrap on): columns and rows both fit the host
//! - **Fixed wide** (wrap off): columns pinned to [`FIXED_WIDE_COLUMNS`],
//!   rows still fit the host, so long lines scroll horizontally
//!
//! A disposed surface ignores writes and resizes. Stream callbacks can race
//! disposal during teardown, so this must never panic.

use std::collections::VecDeque;
use std::fmt;

use unicode_width::UnicodeWidthChar;

/// Column count used when wrapping is off
pub const FIXED_WIDE_COLUMNS: u16 = 4096;

/// Rows kept in scrollback unless configured otherwise
pub const DEFAULT_SCROLLBACK_LINES: usize = 10_000;

/// Rows assumed before the host reports its size
const INITIAL_ROWS: u16 = 24;

/// Columns assumed by a reflowing surface before the host reports its size
const INITIAL_REFLOW_COLUMNS: u16 = 80;

/// Character grid dimensions
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GridSize {
    /// Columns (characters per row)
    pub columns: u16,
    /// Visible rows
    pub rows: u16,
}

impl fmt::Display for GridSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.columns, self.rows)
    }
}

/// Pixel geometry of the element hosting the surface
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HostGeometry {
    /// Width in pixels
    pub width_px: u32,
    /// Height in pixels
    pub height_px: u32,
}

impl HostGeometry {
    /// Create a geometry
    #[must_use]
    pub fn new(width_px: u32, height_px: u32) -> Self {
        Self {
            width_px,
            height_px,
        }
    }
}

/// Size of one character cell in pixels
///
/// A character-cell terminal uses 1x1: geometry is already measured in cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CellMetrics {
    /// Cell width in pixels
    pub width_px: u32,
    /// Cell height in pixels
    pub height_px: u32,
}

impl CellMetrics {
    /// Metrics for a host measured in character cells
    pub const TERMINAL: Self = Self {
        width_px: 1,
        height_px: 1,
    };
}

impl Default for CellMetrics {
    fn default() -> Self {
        Self::TERMINAL
    }
}

/// How the grid width is computed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SizingPolicy {
    /// Fit width and height to the host; long lines break at the edge
    Reflow,
    /// Pin width to [`FIXED_WIDE_COLUMNS`]; height fits the host
    #[default]
    FixedWide,
}

impl SizingPolicy {
    /// Policy for a wrap toggle value
    #[must_use]
    pub fn from_wrap(wrap: bool) -> Self {
        if wrap {
            Self::Reflow
        } else {
            Self::FixedWide
        }
    }

    /// Whether lines reflow at the host edge
    #[must_use]
    pub fn wraps(self) -> bool {
        self == Self::Reflow
    }

    /// Grid size for a host geometry; never smaller than 1x1
    #[must_use]
    pub fn grid_for(self, geometry: HostGeometry, metrics: CellMetrics) -> GridSize {
        let fit = |px: u32, cell: u32| -> u16 {
            let cells = px / cell.max(1);
            u16::try_from(cells).unwrap_or(u16::MAX).max(1)
        };
        let rows = fit(geometry.height_px, metrics.height_px);
        let columns = match self {
            Self::Reflow => fit(geometry.width_px, metrics.width_px),
            Self::FixedWide => FIXED_WIDE_COLUMNS,
        };
        GridSize { columns, rows }
    }

    /// Grid used while no host geometry is known
    ///
    /// Fixed wide is already exact; reflow falls back to a conventional
    /// terminal width until the first resize.
    #[must_use]
    pub fn unsized_grid(self, rows: u16) -> GridSize {
        let columns = match self {
            Self::Reflow => INITIAL_REFLOW_COLUMNS,
            Self::FixedWide => FIXED_WIDE_COLUMNS,
        };
        GridSize { columns, rows }
    }
}

/// Identity of one surface instance
///
/// A new id is issued each time the viewer (re)creates its surface, so a
/// renderer can tell that its scroll state belongs to a previous stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub u64);

/// Scrollback plus character grid
#[derive(Debug)]
pub struct TerminalSurface {
    id: SurfaceId,
    grid: GridSize,
    policy: SizingPolicy,
    /// Completed lines, oldest first
    lines: VecDeque<String>,
    /// Grid rows of each completed line at the current width
    line_rows: VecDeque<usize>,
    /// Sum of `line_rows`
    completed_rows: usize,
    /// Grid rows dropped off the top of the scrollback so far
    rows_evicted: u64,
    /// Text after the last newline
    partial: String,
    scrollback_limit: usize,
    disposed: bool,
    bytes_written: u64,
}

impl TerminalSurface {
    /// Create a fixed-wide surface keeping at most `scrollback_limit` lines
    #[must_use]
    pub fn new(id: SurfaceId, scrollback_limit: usize) -> Self {
        let policy = SizingPolicy::default();
        Self {
            id,
            grid: policy.unsized_grid(INITIAL_ROWS),
            policy,
            lines: VecDeque::new(),
            line_rows: VecDeque::new(),
            completed_rows: 0,
            rows_evicted: 0,
            partial: String::new(),
            scrollback_limit: scrollback_limit.max(1),
            disposed: false,
            bytes_written: 0,
        }
    }

    /// Start with `policy` instead of fixed wide
    #[must_use]
    pub fn with_policy(mut self, policy: SizingPolicy) -> Self {
        self.set_policy(policy);
        self
    }

    /// This surface's identity
    #[must_use]
    pub fn id(&self) -> SurfaceId {
        self.id
    }

    /// Current grid size
    #[must_use]
    pub fn grid(&self) -> GridSize {
        self.grid
    }

    /// Policy the grid was last sized with
    #[must_use]
    pub fn policy(&self) -> SizingPolicy {
        self.policy
    }

    /// Whether [`dispose`](Self::dispose) has been called
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Total bytes accepted by [`write`](Self::write)
    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Grid rows dropped from the top of the scrollback since creation
    ///
    /// Counted at the width in effect when each line was dropped.
    #[must_use]
    pub fn rows_evicted(&self) -> u64 {
        self.rows_evicted
    }

    /// Append raw text
    ///
    /// Text is kept verbatim; `\n` and `\r\n` end a line. A trailing
    /// fragment without a newline stays open until the next write.
    pub fn write(&mut self, chunk: &str) {
        if self.disposed {
            tracing::trace!(surface = self.id.0, len = chunk.len(), "write after dispose ignored");
            return;
        }
        self.bytes_written += chunk.len() as u64;

        for piece in chunk.split_inclusive('\n') {
            if let Some(body) = piece.strip_suffix('\n') {
                self.partial.push_str(body);
                if self.partial.ends_with('\r') {
                    self.partial.pop();
                }
                let line = std::mem::take(&mut self.partial);
                self.push_line(line);
            } else {
                self.partial.push_str(piece);
            }
        }
    }

    fn push_line(&mut self, line: String) {
        let rows = wrap_row_count(&line, usize::from(self.grid.columns));
        self.lines.push_back(line);
        self.line_rows.push_back(rows);
        self.completed_rows += rows;
        while self.lines.len() > self.scrollback_limit {
            self.lines.pop_front();
            if let Some(dropped) = self.line_rows.pop_front() {
                self.completed_rows -= dropped;
                self.rows_evicted += dropped as u64;
            }
        }
    }

    /// Record `policy` without a host size
    ///
    /// Fixed wide gets its pinned width at once; a reflowing surface keeps
    /// a nominal width until [`resize`](Self::resize) supplies the host.
    pub fn set_policy(&mut self, policy: SizingPolicy) {
        if self.disposed || policy == self.policy {
            return;
        }
        tracing::debug!(surface = self.id.0, ?policy, "sizing policy recorded before host size");
        self.policy = policy;
        self.set_grid(policy.unsized_grid(self.grid.rows));
    }

    /// Fit the grid to the host under `policy`
    ///
    /// Returns the resulting grid size (unchanged if disposed).
    pub fn resize(
        &mut self,
        policy: SizingPolicy,
        geometry: HostGeometry,
        metrics: CellMetrics,
    ) -> GridSize {
        if self.disposed {
            tracing::trace!(surface = self.id.0, "resize after dispose ignored");
            return self.grid;
        }
        let grid = policy.grid_for(geometry, metrics);
        if grid != self.grid || policy != self.policy {
            tracing::debug!(
                surface = self.id.0,
                from = %self.grid,
                to = %grid,
                ?policy,
                "terminal surface resized"
            );
        }
        self.policy = policy;
        self.set_grid(grid);
        grid
    }

    fn set_grid(&mut self, grid: GridSize) {
        let recount = grid.columns != self.grid.columns;
        self.grid = grid;
        if recount {
            let columns = usize::from(grid.columns);
            self.line_rows = self
                .lines
                .iter()
                .map(|line| wrap_row_count(line, columns))
                .collect();
            self.completed_rows = self.line_rows.iter().sum();
        }
    }

    /// Release the scrollback; later writes and resizes are no-ops
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.lines = VecDeque::new();
        self.line_rows = VecDeque::new();
        self.completed_rows = 0;
        self.partial = String::new();
        tracing::debug!(surface = self.id.0, "terminal surface disposed");
    }

    /// Number of logical lines (including an open partial line)
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.lines.len() + usize::from(!self.partial.is_empty())
    }

    /// Logical lines, oldest first
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines
            .iter()
            .map(String::as_str)
            .chain(self.open_line())
    }

    fn open_line(&self) -> Option<&str> {
        (!self.partial.is_empty()).then_some(self.partial.as_str())
    }

    /// Number of grid rows the scrollback occupies at the current width
    #[must_use]
    pub fn row_count(&self) -> usize {
        let open = self
            .open_line()
            .map_or(0, |line| wrap_row_count(line, usize::from(self.grid.columns)));
        self.completed_rows + open
    }

    /// The last `count` grid rows, skipping `offset` rows from the bottom
    ///
    /// Rows are returned oldest first. Long lines are broken at the grid
    /// width; SGR colour state is carried onto continuation rows.
    #[must_use]
    pub fn tail_rows(&self, count: usize, offset: usize) -> Vec<String> {
        let columns = usize::from(self.grid.columns);
        let wanted = count + offset;
        let mut rows: Vec<String> = Vec::with_capacity(wanted);

        let newest_first = self
            .open_line()
            .into_iter()
            .chain(self.lines.iter().rev().map(String::as_str));
        for line in newest_first {
            let mut wrapped = wrap_line(line, columns);
            while let Some(row) = wrapped.pop() {
                rows.push(row);
            }
            if rows.len() >= wanted {
                break;
            }
        }

        rows.into_iter().skip(offset).take(count).rev().collect()
    }
}

/// Byte length of the escape sequence at the start of `rest` (which is ESC)
fn escape_len(rest: &str) -> usize {
    let bytes = rest.as_bytes();
    match bytes.get(1) {
        Some(b'[') => {
            let mut end = 2;
            while let Some(b) = bytes.get(end) {
                end += 1;
                if (0x40..=0x7e).contains(b) {
                    break;
                }
            }
            end
        }
        Some(_) => 1 + rest[1..].chars().next().map_or(0, char::len_utf8),
        None => 1,
    }
}

fn char_width(c: char) -> usize {
    if c.is_control() {
        0
    } else {
        c.width().unwrap_or(0)
    }
}

/// One step through a line: an escape sequence or a printable character
enum Token<'a> {
    Escape(&'a str),
    Char(char),
}

fn tokens(line: &str) -> impl Iterator<Item = Token<'_>> {
    let mut rest = line;
    std::iter::from_fn(move || {
        let c = rest.chars().next()?;
        if c == '\u{1b}' {
            let (seq, tail) = rest.split_at(escape_len(rest));
            rest = tail;
            Some(Token::Escape(seq))
        } else {
            rest = &rest[c.len_utf8()..];
            Some(Token::Char(c))
        }
    })
}

/// Break one logical line into rows of at most `columns` display cells
fn wrap_line(line: &str, columns: usize) -> Vec<String> {
    let columns = columns.max(1);
    let mut rows = Vec::new();
    let mut row = String::new();
    let mut width = 0;
    // SGR sequences seen since the last reset, replayed on continuation rows
    let mut active_sgr = String::new();

    for token in tokens(line) {
        match token {
            Token::Escape(seq) => {
                if seq.starts_with("\u{1b}[") && seq.ends_with('m') {
                    if seq == "\u{1b}[0m" || seq == "\u{1b}[m" {
                        active_sgr.clear();
                    } else {
                        active_sgr.push_str(seq);
                    }
                }
                row.push_str(seq);
            }
            Token::Char(c) => {
                let w = char_width(c);
                if width + w > columns && width > 0 {
                    rows.push(std::mem::take(&mut row));
                    row.push_str(&active_sgr);
                    width = 0;
                }
                row.push(c);
                width += w;
            }
        }
    }
    rows.push(row);
    rows
}

fn wrap_row_count(line: &str, columns: usize) -> usize {
    let columns = columns.max(1);
    let mut rows = 1;
    let mut width = 0;
    for token in tokens(line) {
        if let Token::Char(c) = token {
            let w = char_width(c);
            if width + w > columns && width > 0 {
                rows += 1;
                width = 0;
            }
            width += w;
        }
    }
    rows
}
