// src/ui/layout.rs

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Screen regions, computed once per frame.
pub struct AppLayout {
    pub status: Rect,
    pub results: Rect,
    pub history: Rect,
    pub log_panel: Rect,
    pub input: Rect,
    pub footer: Rect,
}

/// Status header on top, results next to the scan history in the middle, then the
/// filter input and a one-line footer. When `show_logs` is set the middle row gains a
/// log panel on the right.
pub fn create_layout(frame_size: Rect, show_logs: bool) -> AppLayout {
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6),
            Constraint::Min(0),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(frame_size);

    let content_constraints = if show_logs {
        vec![Constraint::Percentage(45), Constraint::Percentage(20), Constraint::Percentage(35)]
    } else {
        vec![Constraint::Percentage(70), Constraint::Percentage(30)]
    };

    let content_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(content_constraints)
        .split(main_chunks[1]);

    AppLayout {
        status: main_chunks[0],
        results: content_chunks[0],
        history: content_chunks[1],
        log_panel: if show_logs { content_chunks[2] } else { Rect::default() },
        input: main_chunks[2],
        footer: main_chunks[3],
    }
}
