use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::theme::{CAUTION_AMBER, CRITICAL_RED, HUD_GREEN, INFO_DIM};
use crate::graph::SnapshotSummary;

/// Session state shown at the top of the status panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Loading,
    Ready,
    Failed(String),
}

/// Dump overview panel
pub struct StatusPanel {
    summary: Option<SnapshotSummary>,
}

impl StatusPanel {
    pub fn new(summary: Option<SnapshotSummary>) -> Self {
        Self { summary }
    }

    pub fn set_summary(&mut self, summary: SnapshotSummary) {
        self.summary = Some(summary);
    }

    pub fn render(&self, f: &mut Frame, area: Rect, state: &SessionState, depth: usize) {
        let mut lines = vec![];

        let (status_text, status_color) = match state {
            SessionState::Loading => ("[~] INDEXING", CAUTION_AMBER),
            SessionState::Ready => ("[-] NOMINAL", HUD_GREEN),
            SessionState::Failed(_) => ("[X] FAILED", CRITICAL_RED),
        };
        lines.push(Line::from(Span::styled(
            format!(" {status_text}"),
            Style::default().fg(status_color).add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(""));

        if let Some(summary) = &self.summary {
            let stats = [
                (" Objects ", summary.objects.to_string()),
                (" Classes ", summary.classes_with_instances.to_string()),
                (" Insts   ", summary.instances.to_string()),
                (" Ids     ", format!("{} bytes", summary.identifier_size)),
            ];
            for (label, value) in stats {
                lines.push(Line::from(vec![
                    Span::styled(label, Style::default().fg(INFO_DIM)),
                    Span::styled(value, Style::default().fg(HUD_GREEN)),
                ]));
            }
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                format!(" {}", summary.version),
                Style::default().fg(INFO_DIM),
            )));
        }

        lines.push(Line::from(vec![
            Span::styled(" Depth   ", Style::default().fg(INFO_DIM)),
            Span::styled(depth.to_string(), Style::default().fg(HUD_GREEN)),
        ]));

        if let SessionState::Failed(reason) = state {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                format!(" {reason}"),
                Style::default().fg(CRITICAL_RED),
            )));
        }

        let border_color = match state {
            SessionState::Failed(_) => CRITICAL_RED,
            SessionState::Loading => CAUTION_AMBER,
            SessionState::Ready => HUD_GREEN,
        };
        let paragraph = Paragraph::new(lines).wrap(ratatui::widgets::Wrap { trim: true }).block(
            Block::default()
                .borders(Borders::ALL)
                .title("Status")
                .border_style(Style::default().fg(border_color)),
        );

        f.render_widget(paragraph, area);
    }
}
