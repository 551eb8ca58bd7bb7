// src/ui/widgets/results.rs

use crate::app::{App, AppState};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Tabs, Wrap},
};
use scanwatch::core::fetcher::{CollectionKind, FetchOutcome};
use scanwatch::core::view::{self, build_view, Column, SortDirection, ViewRow};

type ColumnSpec = (Column, &'static str, Constraint);

const DNS_COLUMNS: &[ColumnSpec] = &[
    (Column::Domain, "Domain", Constraint::Percentage(35)),
    (Column::Kind, "Type", Constraint::Length(8)),
    (Column::Value, "Record", Constraint::Percentage(40)),
    (Column::CreatedAt, "Created", Constraint::Length(19)),
];

const CLOUD_COLUMNS: &[ColumnSpec] = &[
    (Column::Domain, "Domain", Constraint::Percentage(60)),
    (Column::Kind, "Provider", Constraint::Length(10)),
    (Column::CreatedAt, "Created", Constraint::Length(19)),
];

const RAW_COLUMNS: &[ColumnSpec] = &[
    (Column::Domain, "Domain", Constraint::Percentage(25)),
    (Column::Value, "Output", Constraint::Percentage(55)),
    (Column::CreatedAt, "Created", Constraint::Length(19)),
];

/// Renders the collection tabs and the current tab's filtered/sorted table.
pub fn render_results(frame: &mut Frame, app: &mut App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let titles: Vec<String> = app
        .tabs
        .iter()
        .map(|kind| match app.results.as_ref() {
            Some(set) if set.failure_of(*kind).is_some() => format!("{} (!)", kind.title()),
            Some(set) => format!("{} ({})", kind.title(), set.len_of(*kind)),
            None => kind.title().to_string(),
        })
        .collect();
    let selected = app.tabs.iter().position(|k| *k == app.tab).unwrap_or(0);
    let tabs = Tabs::new(titles)
        .block(Block::default().borders(Borders::ALL).title("Results"))
        .select(selected)
        .highlight_style(Style::default().fg(Color::Yellow).bold());
    frame.render_widget(tabs, chunks[0]);

    let block = Block::default().borders(Borders::ALL);
    match build_table(app) {
        Ok(table) => frame.render_stateful_widget(table.block(block), chunks[1], &mut app.table_state),
        Err(message) => frame.render_widget(Paragraph::new(message).block(block).wrap(Wrap { trim: true }), chunks[1]),
    }
}

// The table owns its cell text so rendering can borrow `app.table_state` mutably.
fn build_table(app: &App) -> Result<Table<'static>, Text<'static>> {
    let Some(results) = &app.results else {
        let message = match &app.state {
            AppState::Finished | AppState::Failed(_) => "No results for this scan.",
            AppState::Cancelled => "Cancelled before results were available.",
            AppState::Starting | AppState::Watching => "Results appear once the scan succeeds.",
        };
        return Err(Text::styled(message, Style::default().fg(Color::DarkGray)));
    };

    match app.tab {
        CollectionKind::DnsRecords => table_or_message(app, results.dns_records.as_ref(), DNS_COLUMNS),
        CollectionKind::CloudDomains => table_or_message(app, results.cloud_domains.as_ref(), CLOUD_COLUMNS),
        CollectionKind::RawResults => table_or_message(app, results.raw_results.as_ref(), RAW_COLUMNS),
    }
}

fn table_or_message<R: ViewRow>(
    app: &App,
    outcome: Option<&FetchOutcome<R>>,
    columns: &[ColumnSpec],
) -> Result<Table<'static>, Text<'static>> {
    let rows = match outcome {
        None => return Err(Text::raw("Not requested.")),
        Some(FetchOutcome::Failed(cause)) => {
            return Err(Text::from(vec![
                Line::styled(format!("Failed to load {}", app.tab.title()), Style::default().fg(Color::Red).bold()),
                Line::styled(cause.clone(), Style::default().fg(Color::DarkGray)),
            ]));
        }
        Some(FetchOutcome::Ok(rows)) if rows.is_empty() => {
            return Err(Text::raw(format!("The scan found no {}.", app.tab.title().to_lowercase())));
        }
        Some(FetchOutcome::Ok(rows)) => rows,
    };

    let view = build_view(rows, &app.filters, app.sort);
    if view.is_empty() {
        return Err(Text::raw("No rows match the current filters."));
    }

    let header = Row::new(columns.iter().map(|(column, title, _)| {
        let marker = match app.sort {
            Some(spec) if spec.column == *column => match spec.direction {
                SortDirection::Ascending => " ▲",
                SortDirection::Descending => " ▼",
            },
            _ => "",
        };
        Cell::from(format!("{title}{marker}"))
    }))
    .style(Style::default().bold().underlined());

    let body: Vec<Row<'static>> = view
        .iter()
        .map(|row| Row::new(columns.iter().map(|(column, _, _)| Cell::from(cell_text(row.cell(*column))))))
        .collect();

    Ok(Table::new(body, columns.iter().map(|(_, _, width)| *width))
        .header(header)
        .row_highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol("> "))
}

fn cell_text(cell: view::Cell<'_>) -> String {
    match cell {
        view::Cell::Text(text) => text.into_owned(),
        view::Cell::Time(ts) => ts.format("%Y-%m-%d %H:%M:%S").to_string(),
    }
}
