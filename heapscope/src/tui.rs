//! # Terminal User Interface (TUI)
//!
//! Interactive terminal UI using `ratatui`. The UI thread never touches the
//! dump: it submits requests to the session worker and redraws whatever view
//! comes back.
//!
//! ## View Modes
//!
//! - **Browse** - Listing of the current frame (default)
//! - **Search** - Text input for a class-name query
//! - **Help** - Keyboard shortcuts
//!
//! ## Layout
//!
//! ```text
//! ┌ header ─────────────────────────────────────────────┐
//! ├ Status ───────┬ [ 3 classes matching [Leak] 1/3 ] ──┤
//! │ [-] NOMINAL   │ < com.example.Leak >                │
//! │ Objects 1200  │   com.example.LeakHolder            │
//! ├───────────────┴─────────────────────────────────────┤
//! └ keys ───────────────────────────────────────────────┘
//! ```
//!
//! ## Sub-Modules
//!
//! - `list` - Listing panel with selection and scrolling
//! - `status` - Dump overview panel
//! - `theme` - Color scheme

// TUI rendering intentionally uses long functions for clarity
#![allow(clippy::too_many_lines)]

use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::debug;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Terminal,
};
use std::io;
use std::time::Duration;

mod list;
mod status;
mod theme;

use list::ListPanel;
use status::{SessionState, StatusPanel};
use theme::{CAUTION_AMBER, CRITICAL_RED, HUD_GREEN, INFO_DIM};

use crate::navigation::View;
use crate::session::{Reply, Request, SessionHandle};

// =============================================================================
// STYLE CONSTANTS
// =============================================================================

const STYLE_HEADING: Style = Style::new().fg(HUD_GREEN).add_modifier(Modifier::BOLD);
const STYLE_LABEL: Style = Style::new().fg(CAUTION_AMBER).add_modifier(Modifier::BOLD);
const STYLE_DIM: Style = Style::new().fg(INFO_DIM);
const STYLE_KEY: Style = Style::new().fg(CAUTION_AMBER);
const STYLE_TEXT: Style = Style::new().fg(ratatui::style::Color::White);

/// Rows moved by PageUp/PageDown
const PAGE_ROWS: usize = 10;

// =============================================================================
// VIEW MODES
// =============================================================================

/// Current view mode determines what's displayed and how keys are handled
#[derive(Debug, Clone, Copy, PartialEq)]
enum ViewMode {
    /// Main view: listing of the current frame
    Browse,
    /// Text input for a class-name query
    Search,
    /// Help overlay with keyboard shortcuts
    Help,
}

// =============================================================================
// APPLICATION STATE
// =============================================================================

/// UI state of the explorer, independent of the terminal
struct ExplorerApp {
    view: View,
    state: SessionState,
    /// Selected row per frame depth, so going back restores the position
    cursors: Vec<usize>,
    /// Requests submitted but not answered yet
    pending: usize,
    view_mode: ViewMode,
    search_query: String,
    should_quit: bool,
}

impl ExplorerApp {
    fn new() -> Self {
        Self {
            view: View { title: "Indexing heap dump...".to_string(), rows: Vec::new(), depth: 0 },
            state: SessionState::Loading,
            cursors: Vec::new(),
            pending: 0,
            view_mode: ViewMode::Browse,
            search_query: String::new(),
            should_quit: false,
        }
    }

    fn selected(&self) -> usize {
        self.view.depth.checked_sub(1).and_then(|d| self.cursors.get(d)).copied().unwrap_or(0)
    }

    fn set_selected(&mut self, row: usize) {
        if let Some(depth) = self.view.depth.checked_sub(1) {
            if let Some(cursor) = self.cursors.get_mut(depth) {
                *cursor = row.min(self.view.rows.len().saturating_sub(1));
            }
        }
    }

    fn busy(&self) -> bool {
        self.pending > 0 || self.state == SessionState::Loading
    }

    /// Apply a reply from the session worker
    fn apply_reply(&mut self, reply: Reply) {
        match reply {
            Reply::Ready(_) => {
                self.state = SessionState::Ready;
                self.view = View {
                    title: "No search yet".to_string(),
                    rows: Vec::new(),
                    depth: 0,
                };
            }
            Reply::View(view) => {
                self.pending = self.pending.saturating_sub(1);
                let depth = view.depth;
                self.cursors.truncate(depth);
                self.cursors.resize(depth, 0);
                self.view = view;
                let selected = self.selected();
                self.set_selected(selected);
            }
            Reply::Failed(err) => {
                self.pending = 0;
                self.state = SessionState::Failed(err.to_string());
            }
        }
    }

    /// Handle one key press, returning the request it triggers, if any
    fn handle_key(&mut self, key: KeyCode) -> Option<Request> {
        match self.view_mode {
            ViewMode::Help => {
                self.view_mode = ViewMode::Browse;
                None
            }
            ViewMode::Search => match key {
                KeyCode::Enter => {
                    self.view_mode = ViewMode::Browse;
                    self.cursors.clear();
                    self.request(Request::Search(self.search_query.clone()))
                }
                KeyCode::Esc => {
                    self.view_mode = ViewMode::Browse;
                    None
                }
                KeyCode::Backspace => {
                    self.search_query.pop();
                    None
                }
                KeyCode::Char(c) => {
                    self.search_query.push(c);
                    None
                }
                _ => None,
            },
            ViewMode::Browse => match key {
                KeyCode::Char('q') => {
                    self.should_quit = true;
                    None
                }
                KeyCode::Char('?') => {
                    self.view_mode = ViewMode::Help;
                    None
                }
                KeyCode::Char('/') => {
                    self.view_mode = ViewMode::Search;
                    None
                }
                KeyCode::Up | KeyCode::Char('k') => {
                    self.set_selected(self.selected().saturating_sub(1));
                    None
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    self.set_selected(self.selected() + 1);
                    None
                }
                KeyCode::PageUp => {
                    self.set_selected(self.selected().saturating_sub(PAGE_ROWS));
                    None
                }
                KeyCode::PageDown => {
                    self.set_selected(self.selected() + PAGE_ROWS);
                    None
                }
                KeyCode::Home => {
                    self.set_selected(0);
                    None
                }
                KeyCode::End => {
                    self.set_selected(usize::MAX);
                    None
                }
                KeyCode::Enter | KeyCode::Right if !self.view.rows.is_empty() => {
                    self.request(Request::Select(self.selected()))
                }
                KeyCode::Esc | KeyCode::Backspace | KeyCode::Left if self.view.depth > 1 => {
                    self.request(Request::Back)
                }
                _ => None,
            },
        }
    }

    /// Count a request as in flight; nothing is sent once the session failed
    fn request(&mut self, request: Request) -> Option<Request> {
        if matches!(self.state, SessionState::Failed(_)) {
            return None;
        }
        self.pending += 1;
        Some(request)
    }
}

// =============================================================================
// EVENT LOOP
// =============================================================================

/// Run the interactive explorer until the user quits
///
/// Replies are drained on this thread each tick; key presses become requests
/// for the session worker.
///
/// # Errors
/// Returns an error if terminal setup or rendering fails
pub fn run(session: &SessionHandle) -> Result<()> {
    // -------------------------------------------------------------------------
    // Terminal Setup
    // -------------------------------------------------------------------------
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // -------------------------------------------------------------------------
    // Application State
    // -------------------------------------------------------------------------
    let mut app = ExplorerApp::new();
    let mut status_panel = StatusPanel::new(None);
    let mut list_panel = ListPanel::new();

    // -------------------------------------------------------------------------
    // Main Event Loop
    // -------------------------------------------------------------------------
    loop {
        // Drain replies delivered since the last tick (non-blocking)
        session.drain_replies(|reply| {
            if let Reply::Ready(summary) = &reply {
                status_panel.set_summary(summary.clone());
            }
            if matches!(reply, Reply::View(_)) {
                list_panel.reset();
            }
            app.apply_reply(reply);
        });

        terminal.draw(|f| {
            let outer_layout = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(3), // Header
                    Constraint::Min(0),    // Main panels
                    Constraint::Length(3), // Status bar
                ])
                .split(f.area());

            // Header
            let header = Paragraph::new(vec![Line::from(vec![
                Span::styled("HEAPSCOPE", STYLE_HEADING),
                Span::styled(" | ", STYLE_DIM),
                Span::styled(breadcrumb(app.view.depth), Style::new().fg(CAUTION_AMBER)),
            ])])
            .block(Block::default().borders(Borders::ALL).border_style(Style::new().fg(HUD_GREEN)));
            f.render_widget(header, outer_layout[0]);

            // Main content area: Status (left) | Listing (right)
            let cols = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(25), Constraint::Percentage(75)])
                .split(outer_layout[1]);
            status_panel.render(f, cols[0], &app.state, app.view.depth);
            list_panel.render(f, cols[1], &app.view, app.selected(), app.busy());

            if app.view_mode == ViewMode::Search {
                render_search_overlay(f, f.area(), &app.search_query);
            }
            if app.view_mode == ViewMode::Help {
                render_help_overlay(f, f.area());
            }

            // Status bar keybinds
            let mode_indicator = match (&app.state, app.view_mode) {
                (SessionState::Failed(_), _) => {
                    Span::styled("[Failed]", Style::new().fg(CRITICAL_RED))
                }
                (_, ViewMode::Search) => Span::styled("[Search]", Style::new().fg(CAUTION_AMBER)),
                (_, ViewMode::Help) => Span::styled("[Help]", Style::new().fg(HUD_GREEN)),
                _ if app.busy() => Span::styled("[Working]", Style::new().fg(CAUTION_AMBER)),
                _ => Span::styled("[Ready]", Style::new().fg(HUD_GREEN)),
            };

            let status_line = Line::from(vec![
                Span::styled("Q", STYLE_KEY),
                Span::styled(":Quit ", STYLE_DIM),
                Span::styled("/", STYLE_KEY),
                Span::styled(":Search ", STYLE_DIM),
                Span::styled("Enter", STYLE_KEY),
                Span::styled(":Open ", STYLE_DIM),
                Span::styled("Esc", STYLE_KEY),
                Span::styled(":Back ", STYLE_DIM),
                Span::styled("?", STYLE_KEY),
                Span::styled(":Help ", STYLE_DIM),
                mode_indicator,
            ]);

            let status = Paragraph::new(vec![status_line]).block(
                Block::default().borders(Borders::ALL).border_style(Style::default().fg(HUD_GREEN)),
            );
            f.render_widget(status, outer_layout[2]);
        })?;

        // Handle keyboard input
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if let Some(request) = app.handle_key(key.code) {
                        debug!("Submitting {request:?}");
                        if session.submit(request).is_err() {
                            app.apply_reply(Reply::Failed(crate::domain::HeapError::SessionClosed));
                        }
                    }
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    // Cleanup terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    Ok(())
}

/// Header text naming the kind of frame on screen
fn breadcrumb(depth: usize) -> String {
    match depth {
        0 => "IDLE".to_string(),
        1 => "CLASSES".to_string(),
        2 => "CLASSES > INSTANCES".to_string(),
        n => format!("CLASSES > INSTANCES > FIELDS x{}", n - 2),
    }
}

// =============================================================================
// OVERLAY RENDERERS
// =============================================================================

/// Render the help overlay explaining the explorer and its keys
fn render_help_overlay(f: &mut ratatui::Frame, area: Rect) {
    let popup_area = centered_popup(area, 70, 22);

    let help_text = vec![
        Line::from(""),
        Line::from(Span::styled("  What You're Looking At", STYLE_HEADING)),
        Line::from(Span::styled(
            "  A heap dump: every object the process held when it was captured.",
            STYLE_DIM,
        )),
        Line::from(""),
        Line::from(Span::styled("  How to Walk It", STYLE_HEADING)),
        Line::from(vec![
            Span::styled("  Classes    ", STYLE_LABEL),
            Span::styled("Classes whose name contains your query.", STYLE_DIM),
        ]),
        Line::from(vec![
            Span::styled("  Instances  ", STYLE_LABEL),
            Span::styled("Objects of the chosen class, in dump order.", STYLE_DIM),
        ]),
        Line::from(vec![
            Span::styled("  Fields     ", STYLE_LABEL),
            Span::styled("Field values; open a reference to follow it.", STYLE_DIM),
        ]),
        Line::from(""),
        Line::from(Span::styled("  Keys", STYLE_HEADING)),
        Line::from(vec![
            Span::styled("  ↑↓", STYLE_KEY),
            Span::styled(" Select   ", STYLE_TEXT),
            Span::styled("Enter", STYLE_KEY),
            Span::styled(" Open   ", STYLE_TEXT),
            Span::styled("Esc", STYLE_KEY),
            Span::styled(" Back   ", STYLE_TEXT),
            Span::styled("/", STYLE_KEY),
            Span::styled(" Search   ", STYLE_TEXT),
            Span::styled("Q", STYLE_KEY),
            Span::styled(" Quit", STYLE_TEXT),
        ]),
        Line::from(""),
        Line::from(Span::styled("  Press any key to close", STYLE_DIM)),
    ];

    let help_widget = Paragraph::new(help_text).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Help ")
            .style(Style::new().bg(ratatui::style::Color::Black).fg(HUD_GREEN)),
    );

    f.render_widget(ratatui::widgets::Clear, popup_area);
    f.render_widget(help_widget, popup_area);
}

/// Create a centered popup area with given width percentage and height in lines
fn centered_popup(area: Rect, width_percent: u16, height_lines: u16) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Fill(1), Constraint::Length(height_lines), Constraint::Fill(1)])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - width_percent) / 2),
            Constraint::Percentage(width_percent),
            Constraint::Percentage((100 - width_percent) / 2),
        ])
        .split(vertical[1])[1]
}

/// Render search input overlay
fn render_search_overlay(f: &mut ratatui::Frame, area: Rect, query: &str) {
    let popup_area = centered_popup(area, 60, 3);

    let search_text = format!("Class name contains: {query}_");
    let search_widget = Paragraph::new(search_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Search Classes (Enter to search, Esc to cancel)")
                .style(Style::default().bg(ratatui::style::Color::Black).fg(HUD_GREEN)),
        )
        .style(Style::default().fg(CAUTION_AMBER));

    f.render_widget(ratatui::widgets::Clear, popup_area);
    f.render_widget(search_widget, popup_area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::HeapError;

    fn view(depth: usize, rows: usize) -> View {
        View {
            title: format!("depth {depth}"),
            rows: (0..rows).map(|i| format!("row {i}")).collect(),
            depth,
        }
    }

    fn ready_app() -> ExplorerApp {
        let mut app = ExplorerApp::new();
        app.state = SessionState::Ready;
        app
    }

    #[test]
    fn test_search_input_submits_query() {
        let mut app = ready_app();
        assert_eq!(app.handle_key(KeyCode::Char('/')), None);
        for c in "Leax".chars() {
            app.handle_key(KeyCode::Char(c));
        }
        app.handle_key(KeyCode::Backspace);
        app.handle_key(KeyCode::Char('k'));
        assert_eq!(app.handle_key(KeyCode::Enter), Some(Request::Search("Leak".to_string())));
        assert_eq!(app.view_mode, ViewMode::Browse);
        assert!(app.busy());
    }

    #[test]
    fn test_cursor_is_restored_after_back() {
        let mut app = ready_app();
        app.apply_reply(Reply::View(view(1, 5)));
        app.handle_key(KeyCode::Down);
        app.handle_key(KeyCode::Down);
        assert_eq!(app.handle_key(KeyCode::Enter), Some(Request::Select(2)));

        app.apply_reply(Reply::View(view(2, 3)));
        assert_eq!(app.selected(), 0);
        app.handle_key(KeyCode::End);
        assert_eq!(app.selected(), 2);

        assert_eq!(app.handle_key(KeyCode::Esc), Some(Request::Back));
        app.apply_reply(Reply::View(view(1, 5)));
        assert_eq!(app.selected(), 2);
        assert!(!app.busy());
    }

    #[test]
    fn test_back_at_root_and_open_on_empty_do_nothing() {
        let mut app = ready_app();
        app.apply_reply(Reply::View(view(1, 0)));
        assert_eq!(app.handle_key(KeyCode::Esc), None);
        assert_eq!(app.handle_key(KeyCode::Enter), None);
    }

    #[test]
    fn test_failed_session_stops_requests() {
        let mut app = ready_app();
        app.apply_reply(Reply::View(view(1, 2)));
        app.apply_reply(Reply::Failed(HeapError::SessionClosed));
        assert_eq!(app.handle_key(KeyCode::Enter), None);
        assert_eq!(app.handle_key(KeyCode::Char('q')), None);
        assert!(app.should_quit);
    }
}
