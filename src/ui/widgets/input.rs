// src/ui/widgets/input.rs
use crate::app::App;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph},
};

/// Renders the active filter terms followed by the filter being typed.
pub fn render_input(frame: &mut Frame, app: &App, area: Rect) {
    let title = if app.editing { "Filter (Enter to add, Esc to cancel)" } else { "Filters (/ to add)" };
    let block = Block::default().borders(Borders::ALL).title(title);

    let mut spans: Vec<Span> = Vec::new();
    for filter in &app.filters {
        let (label, color) = if filter.negative {
            (format!("[!{}] ", filter.term), Color::Red)
        } else {
            (format!("[{}] ", filter.term), Color::Green)
        };
        spans.push(Span::styled(label, Style::default().fg(color)));
    }
    let prefix_width: usize = spans.iter().map(|s| s.content.chars().count()).sum();
    spans.push(Span::styled(app.input.as_str(), Style::default().fg(Color::Yellow)));

    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);

    if app.editing {
        let x = area.x + 1 + (prefix_width + app.input.chars().count()) as u16;
        frame.set_cursor_position((x.min(area.right().saturating_sub(2)), area.y + 1));
    }
}
