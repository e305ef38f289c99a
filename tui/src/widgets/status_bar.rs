//! Status bar: connection state, selection, toggles and grid size

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Widget};

use logview_core::{ConnectionState, Generation, GridSize, SelectionState};

use crate::theme;

/// One-line status summary
pub struct StatusBar<'a> {
    state: ConnectionState,
    generation: Generation,
    selection: Option<&'a SelectionState>,
    grid: Option<GridSize>,
    following: bool,
}

impl<'a> StatusBar<'a> {
    pub fn new(state: ConnectionState, generation: Generation) -> Self {
        Self {
            state,
            generation,
            selection: None,
            grid: None,
            following: true,
        }
    }

    pub fn selection(mut self, selection: Option<&'a SelectionState>) -> Self {
        self.selection = selection;
        self
    }

    pub fn grid(mut self, grid: Option<GridSize>) -> Self {
        self.grid = grid;
        self
    }

    pub fn following(mut self, following: bool) -> Self {
        self.following = following;
        self
    }
}

fn toggle<'s>(key: &'s str, label: &'s str, enabled: bool) -> [Span<'s>; 2] {
    [
        Span::styled(key, Style::default().add_modifier(Modifier::BOLD)),
        Span::styled(format!("{label} "), theme::toggle_style(enabled)),
    ]
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let dim = Style::default().fg(theme::DIM_GRAY);
        let mut spans = vec![
            Span::styled(
                format!(" ● {} ", self.state.label()),
                Style::default()
                    .fg(theme::state_color(self.state))
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!("{} ", self.generation), dim),
        ];

        if let Some(selection) = self.selection {
            spans.push(Span::raw(format!(
                "| pods: {} | containers: {} | ",
                selection.pods(),
                selection.containers()
            )));
            spans.extend(toggle("t", ":timestamps", selection.show_timestamps()));
            spans.extend(toggle("p", ":prefix", selection.show_source_prefix()));
            spans.extend(toggle("w", ":wrap", selection.wrap_lines()));
        }
        if let Some(grid) = self.grid {
            spans.push(Span::styled(format!("| {grid} "), dim));
        }
        spans.push(Span::styled(
            if self.following { "| tail " } else { "| scrolled " },
            dim,
        ));
        spans.push(Span::styled("| r:refresh q:quit", dim));

        Paragraph::new(Line::from(spans)).render(area, buf);
    }
}
