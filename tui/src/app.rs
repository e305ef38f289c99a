//! Main Application
//!
//! The App is a thin display client over [`LogViewer`]:
//! 1. Converts key presses into selection and display operations
//! 2. Polls the viewer every frame so stream output reaches the surface
//! 3. Reports the log pane size back to the viewer as host geometry
//! 4. Renders the pickers, the log pane and the status bar

use std::time::Duration;

use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use ratatui::backend::Backend;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::Style;
use ratatui::text::Line;
use ratatui::widgets::{Block, Paragraph};
use ratatui::{Frame, Terminal};
use tokio::time::MissedTickBehavior;

use logview_core::{HostGeometry, LogTransport, LogViewer, ViewerProps};

use crate::theme;
use crate::widgets::picker::{self, PickerEntry, PickerGroup};
use crate::widgets::{LogPane, LogPaneState, Picker, StatusBar};

/// Time between frames (~30 FPS)
const FRAME_INTERVAL: Duration = Duration::from_millis(33);

/// Width of the picker column
const SIDEBAR_WIDTH: u16 = 32;

/// Columns moved per Left/Right press
const H_SCROLL_STEP: u16 = 8;

/// Which panel receives navigation keys
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Focus {
    /// The log pane (scrolling)
    #[default]
    Log,
    /// The pod picker
    Pods,
    /// The container picker
    Containers,
}

/// Main application state
pub struct App<T: LogTransport + Clone> {
    /// The viewer being displayed
    viewer: LogViewer<T>,
    /// Props the viewer is opened with
    props: ViewerProps,
    /// Is the app still running?
    running: bool,
    /// Panel receiving navigation keys
    focus: Focus,
    /// Cursor in the pod picker (0 is `All`)
    pod_cursor: usize,
    /// Cursor in the container picker (0 is `All`)
    container_cursor: usize,
    /// Log pane scroll position
    log_state: LogPaneState,
}

impl<T: LogTransport + Clone> App<T> {
    /// Create an app around a closed viewer
    pub fn new(viewer: LogViewer<T>, props: ViewerProps) -> Self {
        Self {
            viewer,
            props,
            running: true,
            focus: Focus::Log,
            pod_cursor: 0,
            container_cursor: 0,
            log_state: LogPaneState::default(),
        }
    }

    /// Open the viewer with the app's props
    pub fn start(&mut self) {
        self.viewer.open(self.props.clone());
    }

    /// Main event loop
    pub async fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> anyhow::Result<()> {
        let mut event_stream = EventStream::new();
        let mut frames = tokio::time::interval(FRAME_INTERVAL);
        frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

        self.start();
        terminal.draw(|frame| self.draw(frame))?;

        while self.running {
            tokio::select! {
                biased;

                maybe_event = event_stream.next() => match maybe_event {
                    Some(Ok(event)) => self.handle_event(event),
                    Some(Err(e)) => {
                        tracing::error!(error = %e, "terminal event stream failed");
                        self.quit();
                    }
                    None => self.quit(),
                },

                _ = frames.tick() => {}
            }

            self.tick();
            terminal.draw(|frame| self.draw(frame))?;
        }

        Ok(())
    }

    /// Apply pending viewer work (readiness, discovery, stream events)
    pub fn tick(&mut self) {
        self.viewer.poll();
    }

    /// Dispatch a terminal event
    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(key) => self.handle_key(key),
            // the next draw picks up the new size
            Event::Resize(..) => {}
            _ => {}
        }
    }

    /// Handle keyboard input
    pub fn handle_key(&mut self, key: KeyEvent) {
        // Only handle Press events (not Release or Repeat)
        if key.kind != KeyEventKind::Press {
            return;
        }

        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => self.quit(),
            KeyCode::Char('q') | KeyCode::Esc => self.quit(),

            KeyCode::Tab => self.cycle_focus(),

            // Display toggles
            KeyCode::Char('t') => {
                let on = self.viewer.selection().is_some_and(|s| s.show_timestamps());
                self.viewer.set_timestamps(!on);
            }
            KeyCode::Char('p') => {
                let on = self.viewer.selection().is_some_and(|s| s.show_source_prefix());
                self.viewer.set_source_prefix(!on);
            }
            KeyCode::Char('w') => {
                let on = self.wrap();
                self.viewer.set_wrap(!on);
                self.log_state.h_offset = 0;
            }
            KeyCode::Char('r') => {
                self.viewer.refresh();
            }

            // Pickers
            KeyCode::Char('a') => match self.focus {
                Focus::Pods => self.viewer.select_all_pods(),
                Focus::Containers => self.viewer.select_all_containers(),
                Focus::Log => {}
            },
            KeyCode::Char(' ') | KeyCode::Enter => self.toggle_highlighted(),

            // Navigation
            KeyCode::Up => match self.focus {
                Focus::Log => self.log_state.scroll_up(1),
                Focus::Pods => self.pod_cursor = self.pod_cursor.saturating_sub(1),
                Focus::Containers => {
                    self.container_cursor = self.container_cursor.saturating_sub(1);
                }
            },
            KeyCode::Down => match self.focus {
                Focus::Log => self.log_state.scroll_down(1),
                Focus::Pods => {
                    let last = picker::entry_count(&self.pod_groups()) - 1;
                    self.pod_cursor = (self.pod_cursor + 1).min(last);
                }
                Focus::Containers => {
                    let last = picker::entry_count(&self.container_groups()) - 1;
                    self.container_cursor = (self.container_cursor + 1).min(last);
                }
            },
            KeyCode::PageUp => {
                let page = self.page_rows();
                self.log_state.scroll_up(page);
            }
            KeyCode::PageDown => {
                let page = self.page_rows();
                self.log_state.scroll_down(page);
            }
            KeyCode::Home => self.log_state.scroll_to_top(),
            KeyCode::End => self.log_state.follow_tail(),
            KeyCode::Left if !self.wrap() => self.log_state.scroll_left(H_SCROLL_STEP),
            KeyCode::Right if !self.wrap() => self.log_state.scroll_right(H_SCROLL_STEP),

            _ => {}
        }
    }

    fn quit(&mut self) {
        self.viewer.close();
        self.running = false;
    }

    fn wrap(&self) -> bool {
        self.viewer.selection().is_some_and(|s| s.wrap_lines())
    }

    fn page_rows(&self) -> usize {
        (self.log_state.viewport_rows / 2).max(1)
    }

    fn cycle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Log if self.props.show_pod_selector => Focus::Pods,
            Focus::Log | Focus::Pods => Focus::Containers,
            Focus::Containers => Focus::Log,
        };
    }

    fn pod_groups(&self) -> Vec<PickerGroup> {
        match self.viewer.selection() {
            Some(selection) => picker::pod_groups(self.viewer.pod_options(), selection.pods()),
            None => Vec::new(),
        }
    }

    fn container_groups(&self) -> Vec<PickerGroup> {
        match self.viewer.selection() {
            Some(selection) => {
                picker::container_groups(self.viewer.container_options(), selection.containers())
            }
            None => Vec::new(),
        }
    }

    fn toggle_highlighted(&mut self) {
        match self.focus {
            Focus::Pods => match picker::entry_at(&self.pod_groups(), self.pod_cursor) {
                Some(PickerEntry::All) => self.viewer.select_all_pods(),
                Some(PickerEntry::Item(name)) => self.viewer.toggle_pod(&name),
                None => {}
            },
            Focus::Containers => {
                match picker::entry_at(&self.container_groups(), self.container_cursor) {
                    Some(PickerEntry::All) => self.viewer.select_all_containers(),
                    Some(PickerEntry::Item(name)) => self.viewer.toggle_container(&name),
                    None => {}
                }
            }
            Focus::Log => {}
        }
    }

    /// Render one frame
    ///
    /// Also reports the log pane's inner size to the viewer, so the surface
    /// grid follows the terminal.
    pub fn draw(&mut self, frame: &mut Frame) {
        let [body, status] =
            Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).areas(frame.area());

        if self.viewer.is_open() {
            let [sidebar, log_area] =
                Layout::horizontal([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(1)])
                    .areas(body);
            self.draw_pickers(frame, sidebar);
            self.draw_log(frame, log_area);
        } else {
            frame.render_widget(
                Paragraph::new(Line::styled("viewer closed", Style::default().fg(theme::DIM_GRAY)))
                    .block(Block::bordered().border_style(theme::border_style(false))),
                body,
            );
        }

        let bar = StatusBar::new(self.viewer.state(), self.viewer.generation())
            .selection(self.viewer.selection())
            .grid(self.viewer.surface().map(|s| s.grid()))
            .following(self.log_state.is_following());
        frame.render_widget(bar, status);
    }

    fn draw_pickers(&self, frame: &mut Frame, area: Rect) {
        let all_pods = self.viewer.selection().is_some_and(|s| s.pods().is_all());
        let all_containers = self
            .viewer
            .selection()
            .is_some_and(|s| s.containers().is_all());

        let containers = Picker::new("Containers", self.container_groups(), all_containers)
            .cursor(self.container_cursor)
            .focused(self.focus == Focus::Containers);

        if self.props.show_pod_selector {
            let [pods_area, containers_area] =
                Layout::vertical([Constraint::Percentage(50), Constraint::Percentage(50)])
                    .areas(area);
            let pods = Picker::new("Pods", self.pod_groups(), all_pods)
                .cursor(self.pod_cursor)
                .focused(self.focus == Focus::Pods);
            frame.render_widget(pods, pods_area);
            frame.render_widget(containers, containers_area);
        } else {
            frame.render_widget(containers, area);
        }
    }

    fn draw_log(&mut self, frame: &mut Frame, area: Rect) {
        let block = Block::bordered()
            .title(self.props.title.as_str())
            .border_style(theme::border_style(self.focus == Focus::Log));
        let inner = block.inner(area);
        self.viewer.observe_geometry(HostGeometry::new(
            u32::from(inner.width),
            u32::from(inner.height),
        ));

        let pane = LogPane::new(self.viewer.surface())
            .block(block)
            .wrap(self.viewer.selection().is_some_and(|s| s.wrap_lines()));
        frame.render_stateful_widget(pane, area, &mut self.log_state);
    }

    /// Is the app still running?
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Panel with keyboard focus
    pub fn focus(&self) -> Focus {
        self.focus
    }

    /// The viewer
    pub fn viewer(&self) -> &LogViewer<T> {
        &self.viewer
    }

    /// Log pane scroll position
    pub fn log_state(&self) -> &LogPaneState {
        &self.log_state
    }
}
