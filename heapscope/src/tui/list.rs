//! Listing panel - the rows of the current frame with a selection cursor.
//!
//! # Rendering Pattern
//!
//! One line per row:
//! ```text
//! <  com.example.Leak.name="foo"  >
//!    com.example.Leak.next=null
//! ```
//!
//! The panel keeps no copy of the rows; it renders whatever view the
//! session last delivered.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{block::BorderType, Block, Borders, Paragraph},
    Frame,
};

use super::theme::{row_color, CAUTION_AMBER, HUD_GREEN, INFO_DIM, SEL_LEFT, SEL_RIGHT};
use crate::navigation::View;

/// Scroll state of the listing
#[derive(Debug, Default)]
pub struct ListPanel {
    scroll_offset: usize,
}

impl ListPanel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the scroll position, used when a different frame is shown
    pub fn reset(&mut self) {
        self.scroll_offset = 0;
    }

    pub fn render(&mut self, f: &mut Frame, area: Rect, view: &View, selected: usize, busy: bool) {
        let visible = visible_row_count(area, view.rows.len());
        self.scroll_offset = visible_scroll_offset(selected, self.scroll_offset, visible);
        let max_len = (area.width as usize).saturating_sub(6);

        let mut lines: Vec<Line<'static>> = view
            .rows
            .iter()
            .enumerate()
            .skip(self.scroll_offset)
            .take(visible)
            .map(|(index, row)| render_row(index == selected, &truncate_for_display(row, max_len)))
            .collect();

        if view.rows.is_empty() {
            let hint = if view.depth == 0 { "Press / to search for a class" } else { "(empty)" };
            lines.push(Line::from(Span::styled(format!("   {hint}"), Style::new().fg(INFO_DIM))));
        }

        let position = if view.rows.is_empty() {
            String::new()
        } else {
            format!(" {}/{}", selected + 1, view.rows.len())
        };
        let title = format!("[ {}{position} ]", view.title);
        let border = if busy { CAUTION_AMBER } else { HUD_GREEN };

        let paragraph = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Plain)
                .title(title)
                .border_style(Style::default().fg(border)),
        );
        f.render_widget(paragraph, area);
    }
}

fn render_row(is_selected: bool, text: &str) -> Line<'static> {
    let (sel_l, sel_r) = if is_selected { (SEL_LEFT, SEL_RIGHT) } else { (" ", " ") };
    let base_style = Style::default().fg(row_color(text));
    let text_style = if is_selected {
        base_style.add_modifier(Modifier::BOLD | Modifier::REVERSED)
    } else {
        base_style
    };

    Line::from(vec![
        Span::styled(sel_l, Style::default().fg(CAUTION_AMBER)),
        Span::raw(" "),
        Span::styled(text.to_string(), text_style),
        Span::raw(" "),
        Span::styled(sel_r, Style::default().fg(CAUTION_AMBER)),
    ])
}

/// Cut `s` to `max_len` characters, marking the cut with `...`
fn truncate_for_display(s: &str, max_len: usize) -> String {
    if s.chars().count() > max_len {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    } else {
        s.to_string()
    }
}

/// Calculate scroll offset to keep selected item visible
fn visible_scroll_offset(selected: usize, current_offset: usize, visible_count: usize) -> usize {
    if selected < current_offset {
        selected
    } else if selected >= current_offset + visible_count {
        selected.saturating_sub(visible_count.saturating_sub(1))
    } else {
        current_offset
    }
}

/// Rows that fit inside the panel borders
fn visible_row_count(area: Rect, total_rows: usize) -> usize {
    (area.height.saturating_sub(2) as usize).max(1).min(total_rows.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_counts_characters() {
        assert_eq!(truncate_for_display("short", 10), "short");
        assert_eq!(truncate_for_display("com.example.VeryLongName", 10), "com.exa...");
        assert_eq!(truncate_for_display("ééééééééééé", 6), "ééé...");
    }

    #[test]
    fn test_scroll_follows_selection_both_ways() {
        assert_eq!(visible_scroll_offset(0, 0, 5), 0);
        assert_eq!(visible_scroll_offset(7, 0, 5), 3);
        assert_eq!(visible_scroll_offset(4, 3, 5), 3);
        assert_eq!(visible_scroll_offset(1, 3, 5), 1);
    }

    #[test]
    fn test_visible_rows_never_zero() {
        assert_eq!(visible_row_count(Rect::new(0, 0, 40, 2), 10), 1);
        assert_eq!(visible_row_count(Rect::new(0, 0, 40, 12), 3), 3);
        assert_eq!(visible_row_count(Rect::new(0, 0, 40, 12), 30), 10);
    }
}
