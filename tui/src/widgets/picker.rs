//! Picker Widget
//!
//! Multi-select list with an `All` entry on top. Entries can be grouped;
//! group labels are drawn as separators and are not selectable.

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, List, ListItem, ListState, StatefulWidget, Widget};

use logview_core::selection::group_containers;
use logview_core::{ContainerInfo, PodInfo, Selection};

use crate::theme;

/// One selectable entry
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PickerItem {
    /// Name sent to the viewer when toggled
    pub name: String,
    /// Dimmed text after the name
    pub detail: Option<String>,
    /// Whether the entry is selected
    pub checked: bool,
}

/// Entries under an optional label
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PickerGroup {
    pub label: Option<&'static str>,
    pub items: Vec<PickerItem>,
}

/// What the cursor is on
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PickerEntry {
    /// The `All` entry
    All,
    /// A named item
    Item(String),
}

/// Entries for the pod picker
#[must_use]
pub fn pod_groups(options: &[PodInfo], selection: &Selection) -> Vec<PickerGroup> {
    vec![PickerGroup {
        label: None,
        items: options
            .iter()
            .map(|pod| PickerItem {
                name: pod.name.clone(),
                detail: pod.status.clone(),
                checked: selection.contains(&pod.name),
            })
            .collect(),
    }]
}

/// Entries for the container picker, regular first and init after
#[must_use]
pub fn container_groups(options: &[ContainerInfo], selection: &Selection) -> Vec<PickerGroup> {
    let (regular, init) = group_containers(options);
    let items = |containers: Vec<&ContainerInfo>| {
        containers
            .into_iter()
            .map(|c| PickerItem {
                name: c.name.clone(),
                detail: None,
                checked: selection.contains(&c.name),
            })
            .collect::<Vec<_>>()
    };

    let mut groups = vec![PickerGroup {
        label: None,
        items: items(regular),
    }];
    if !init.is_empty() {
        groups.push(PickerGroup {
            label: Some("init"),
            items: items(init),
        });
    }
    groups
}

/// Number of cursor positions, `All` included
#[must_use]
pub fn entry_count(groups: &[PickerGroup]) -> usize {
    1 + groups.iter().map(|g| g.items.len()).sum::<usize>()
}

/// Entry under `cursor` (0 is `All`)
#[must_use]
pub fn entry_at(groups: &[PickerGroup], cursor: usize) -> Option<PickerEntry> {
    if cursor == 0 {
        return Some(PickerEntry::All);
    }
    groups
        .iter()
        .flat_map(|g| g.items.iter())
        .nth(cursor - 1)
        .map(|item| PickerEntry::Item(item.name.clone()))
}

/// A multi-select list
pub struct Picker<'a> {
    title: &'a str,
    groups: Vec<PickerGroup>,
    all_checked: bool,
    cursor: usize,
    focused: bool,
}

impl<'a> Picker<'a> {
    pub fn new(title: &'a str, groups: Vec<PickerGroup>, all_checked: bool) -> Self {
        Self {
            title,
            groups,
            all_checked,
            cursor: 0,
            focused: false,
        }
    }

    pub fn cursor(mut self, cursor: usize) -> Self {
        self.cursor = cursor;
        self
    }

    pub fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }
}

fn check_line(label: String, detail: Option<String>, checked: bool) -> Line<'static> {
    let mark = if checked { "[x] " } else { "[ ] " };
    let mut spans = vec![
        Span::styled(mark, theme::toggle_style(checked)),
        Span::raw(label),
    ];
    if let Some(detail) = detail {
        spans.push(Span::styled(format!("  {detail}"), Style::default().fg(theme::DIM_GRAY)));
    }
    Line::from(spans)
}

impl Widget for Picker<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mut rows = vec![ListItem::new(check_line("All".to_string(), None, self.all_checked))];
        let mut highlighted = (self.cursor == 0).then_some(0);
        let mut index = 0;

        for group in self.groups {
            if let Some(label) = group.label {
                rows.push(ListItem::new(Line::styled(
                    format!("-- {label} --"),
                    Style::default().fg(theme::DIM_GRAY),
                )));
            }
            for item in group.items {
                index += 1;
                if index == self.cursor {
                    highlighted = Some(rows.len());
                }
                rows.push(ListItem::new(check_line(item.name, item.detail, item.checked)));
            }
        }

        let block = Block::bordered()
            .title(self.title)
            .border_style(theme::border_style(self.focused));
        let mut list = List::new(rows).block(block);
        if self.focused {
            list = list.highlight_style(
                Style::default()
                    .bg(theme::HIGHLIGHT_BG)
                    .add_modifier(Modifier::BOLD),
            );
        }

        let mut state = ListState::default().with_selected(highlighted);
        StatefulWidget::render(list, area, buf, &mut state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn containers() -> Vec<ContainerInfo> {
        vec![
            ContainerInfo::regular("app"),
            ContainerInfo::init("migrate"),
            ContainerInfo::regular("sidecar"),
        ]
    }

    fn text(buf: &Buffer) -> String {
        let area = buf.area;
        (0..area.height)
            .map(|y| (0..area.width).map(|x| buf[(x, y)].symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_container_groups_put_init_last() {
        let groups = container_groups(&containers(), &Selection::from_items(["app"]));
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[1].label, Some("init"));
        assert_eq!(entry_count(&groups), 4);
        assert_eq!(entry_at(&groups, 0), Some(PickerEntry::All));
        assert_eq!(entry_at(&groups, 2), Some(PickerEntry::Item("sidecar".to_string())));
        assert_eq!(entry_at(&groups, 3), Some(PickerEntry::Item("migrate".to_string())));
        assert_eq!(entry_at(&groups, 4), None);
        assert!(groups[0].items[0].checked);
        assert!(!groups[0].items[1].checked);
    }

    #[test]
    fn test_no_init_group_without_init_containers() {
        let groups = container_groups(&[ContainerInfo::regular("app")], &Selection::All);
        assert_eq!(groups.len(), 1);
    }

    #[test]
    fn test_render_marks_checked_entries() {
        let pods = vec![PodInfo::new("web-0", "Running"), PodInfo::named("web-1")];
        let groups = pod_groups(&pods, &Selection::from_items(["web-1"]));
        let area = Rect::new(0, 0, 30, 6);
        let mut buf = Buffer::empty(area);

        Picker::new("Pods", groups, false)
            .cursor(1)
            .focused(true)
            .render(area, &mut buf);

        let rendered = text(&buf);
        assert!(rendered.contains("[ ] All"));
        assert!(rendered.contains("[ ] web-0  Running"));
        assert!(rendered.contains("[x] web-1"));
    }
}
