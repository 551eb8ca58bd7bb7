// src/ui/widgets/footer.rs

use crate::app::{App, ExportStatus};
use ratatui::{
    prelude::*,
    style::{Color, Style, Stylize},
    text::{Line, Span},
    widgets::Paragraph,
};

fn key(label: &str) -> Span<'_> {
    Span::styled(label, Style::new().bold().fg(Color::Yellow))
}

/// Renders the footer: the last export result if any, otherwise the key hints.
pub fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    let line = match &app.export_status {
        ExportStatus::Success(path) => Line::from(Span::styled(
            format!("Exported to {path}"),
            Style::new().fg(Color::Green),
        )),
        ExportStatus::Error(e) => Line::from(Span::styled(format!("Export failed: {e}"), Style::new().fg(Color::Red))),
        ExportStatus::Idle if app.editing => Line::from("Type a term, prefix with ! to exclude."),
        ExportStatus::Idle => {
            let mut spans = vec![key("/"), Span::raw(" filter  "), key("Del"), Span::raw(" clear  ")];
            spans.extend([key("s"), Span::raw(" sort  "), key("d"), Span::raw(" direction  ")]);
            spans.extend([key("Tab"), Span::raw(" collection  "), key("e"), Span::raw(" export  ")]);
            if app.state.is_active() {
                spans.extend([key("c"), Span::raw(" cancel  ")]);
            }
            spans.extend([key("l"), Span::raw(" logs  "), key("q"), Span::raw(" quit")]);
            Line::from(spans)
        }
    };

    let footer = Paragraph::new(line).alignment(Alignment::Center);
    frame.render_widget(footer, area);
}
