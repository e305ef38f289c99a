//! LogPane Widget
//!
//! Renders the tail of a [`TerminalSurface`]. Rows are taken from the
//! surface already broken at its grid width, so reflow and fixed-wide
//! sizing look different without the widget knowing which is active.
//! ANSI colour in the stream is converted with `ansi-to-tui`.

use ansi_to_tui::IntoText;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::text::Text;
use ratatui::widgets::{Block, Paragraph, StatefulWidget, Widget};

use logview_core::{SurfaceId, TerminalSurface, FIXED_WIDE_COLUMNS};

/// Scroll position of the log pane
///
/// `scroll_offset` counts rows up from the bottom; 0 follows the tail.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LogPaneState {
    /// Rows scrolled up from the tail
    pub scroll_offset: usize,
    /// Columns scrolled right (fixed-wide only)
    pub h_offset: u16,
    /// Rows in the surface at the last render
    pub total_rows: usize,
    /// Visible rows at the last render
    pub viewport_rows: usize,
    /// Rows the surface had evicted at the last render
    rows_evicted: u64,
    surface: Option<SurfaceId>,
}

impl LogPaneState {
    /// Whether new output keeps the view at the bottom
    #[must_use]
    pub fn is_following(&self) -> bool {
        self.scroll_offset == 0
    }

    /// Jump back to the tail
    pub fn follow_tail(&mut self) {
        self.scroll_offset = 0;
    }

    /// Jump to the oldest row
    pub fn scroll_to_top(&mut self) {
        self.scroll_offset = self.max_scroll();
    }

    /// Scroll towards older rows
    pub fn scroll_up(&mut self, rows: usize) {
        self.scroll_offset = (self.scroll_offset + rows).min(self.max_scroll());
    }

    /// Scroll towards newer rows
    pub fn scroll_down(&mut self, rows: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(rows);
    }

    /// Scroll right by `columns`
    pub fn scroll_right(&mut self, columns: u16) {
        self.h_offset = self.h_offset.saturating_add(columns).min(FIXED_WIDE_COLUMNS);
    }

    /// Scroll left by `columns`
    pub fn scroll_left(&mut self, columns: u16) {
        self.h_offset = self.h_offset.saturating_sub(columns);
    }

    fn max_scroll(&self) -> usize {
        self.total_rows.saturating_sub(self.viewport_rows)
    }

    /// Catch up with the surface before rendering
    ///
    /// A new surface resets the position. When scrolled up, the view stays
    /// on the same rows while new output arrives below, including once the
    /// scrollback is full and old rows drop off the top.
    fn sync(&mut self, surface: &TerminalSurface, viewport_rows: usize) {
        if self.surface != Some(surface.id()) {
            *self = Self {
                surface: Some(surface.id()),
                ..Self::default()
            };
        }
        let rows = surface.row_count();
        let evicted = surface.rows_evicted();
        if self.scroll_offset > 0 {
            let dropped = usize::try_from(evicted.saturating_sub(self.rows_evicted))
                .unwrap_or(usize::MAX);
            let appended = rows.saturating_add(dropped).saturating_sub(self.total_rows);
            self.scroll_offset = self.scroll_offset.saturating_add(appended);
        }
        self.rows_evicted = evicted;
        self.total_rows = rows;
        self.viewport_rows = viewport_rows;
        self.scroll_offset = self.scroll_offset.min(self.max_scroll());
    }
}

/// Tail view of a terminal surface
pub struct LogPane<'a> {
    surface: Option<&'a TerminalSurface>,
    block: Option<Block<'a>>,
    wrap: bool,
}

impl<'a> LogPane<'a> {
    pub fn new(surface: Option<&'a TerminalSurface>) -> Self {
        Self {
            surface,
            block: None,
            wrap: false,
        }
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }

    /// Whether the surface reflows; disables horizontal scrolling
    pub fn wrap(mut self, wrap: bool) -> Self {
        self.wrap = wrap;
        self
    }
}

impl StatefulWidget for LogPane<'_> {
    type State = LogPaneState;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let inner = match self.block {
            Some(block) => {
                let inner = block.inner(area);
                block.render(area, buf);
                inner
            }
            None => area,
        };

        let Some(surface) = self.surface else {
            return;
        };
        let height = usize::from(inner.height);
        state.sync(surface, height);

        let rows = surface.tail_rows(height, state.scroll_offset);
        let joined = rows.join("\n");
        let text = joined
            .as_bytes()
            .into_text()
            .unwrap_or_else(|_| Text::raw(joined.clone()));

        let h_offset = if self.wrap { 0 } else { state.h_offset };
        Paragraph::new(text).scroll((0, h_offset)).render(inner, buf);
    }
}
