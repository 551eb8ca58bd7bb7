// src/ui/widgets/status_view.rs

use crate::app::{App, AppState};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};
use scanwatch::core::models::{format_duration, ScanStatus};

const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

fn status_style(status: ScanStatus) -> Style {
    match status {
        ScanStatus::Pending => Style::default().fg(Color::DarkGray),
        ScanStatus::Running => Style::default().fg(Color::Cyan),
        ScanStatus::Success => Style::default().fg(Color::Green).bold(),
        ScanStatus::Error | ScanStatus::Failed => Style::default().fg(Color::Red).bold(),
        ScanStatus::Cancelled => Style::default().fg(Color::Yellow),
    }
}

/// Renders the header with the watched scan's live record.
pub fn render_status(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title(format!("Scan ({})", app.tool));
    let mut lines = Vec::new();

    let target = match &app.scope_target {
        Some(t) => format!("{} ({})", t.scope_target, t.target_type),
        None => "-".to_string(),
    };
    lines.push(Line::from(vec![Span::raw("Target: "), Span::styled(target, Style::default().bold())]));

    match &app.record {
        Some(record) => {
            let mut spans = vec![
                Span::raw("Scan "),
                Span::styled(record.scan_id.clone(), Style::default().fg(Color::Yellow)),
                Span::raw("  "),
            ];
            if app.state.is_active() {
                spans.push(Span::raw(format!("{} ", SPINNER[app.spinner % SPINNER.len()])));
            }
            spans.push(Span::styled(record.status.to_string(), status_style(record.status)));
            if let Some(elapsed) = record.execution_time {
                spans.push(Span::raw(format!("  in {}", format_duration(elapsed))));
            }
            lines.push(Line::from(spans));
        }
        None => lines.push(Line::from(format!("{} Starting...", SPINNER[app.spinner % SPINNER.len()]))),
    }

    match &app.state {
        AppState::Failed(reason) => {
            lines.push(Line::from(Span::styled(reason.clone(), Style::default().fg(Color::Red))));
        }
        AppState::Cancelled => {
            lines.push(Line::from(Span::styled("Watching cancelled.", Style::default().fg(Color::Yellow))));
        }
        _ => {
            if let Some(err) = &app.last_error {
                lines.push(Line::from(Span::styled(err.clone(), Style::default().fg(Color::Yellow))));
            }
        }
    }

    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

/// Renders the scope target's scan history, newest first. The watched scan is highlighted.
pub fn render_history(frame: &mut Frame, app: &App, area: Rect) {
    let current = app.record.as_ref().map(|r| r.scan_id.as_str());
    let items: Vec<ListItem> = app
        .history
        .iter()
        .map(|scan| {
            let elapsed = scan.execution_time.map(format_duration).unwrap_or_default();
            let marker = if Some(scan.scan_id.as_str()) == current { "> " } else { "  " };
            ListItem::new(Line::from(vec![
                Span::raw(marker),
                Span::styled(
                    scan.created_at.format("%Y-%m-%d %H:%M").to_string(),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::raw(" "),
                Span::styled(format!("{:<8}", scan.status.to_string()), status_style(scan.status)),
                Span::raw(elapsed),
            ]))
        })
        .collect();

    let list = List::new(items).block(Block::default().borders(Borders::ALL).title("History"));
    frame.render_widget(list, area);
}
