// src/app.rs

use std::path::PathBuf;

use crossterm::event::KeyCode;
use ratatui::widgets::{ScrollbarState, TableState};
use scanwatch::core::export::export_view;
use scanwatch::core::fetcher::{CollectionKind, ResultSet};
use scanwatch::core::models::{ScanRecord, ScanStatus, ScopeTarget, Tool};
use scanwatch::core::poller::CancelToken;
use scanwatch::core::session::WatchEvent;
use scanwatch::core::view::{build_view, Column, FilterTerm, SortDirection, SortSpec};

pub enum ExportStatus {
    Idle,
    Success(String),
    Error(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppState {
    Starting,
    Watching,
    Finished,
    Failed(String),
    Cancelled,
}

impl AppState {
    pub fn is_active(&self) -> bool {
        matches!(self, AppState::Starting | AppState::Watching)
    }
}

pub struct App {
    pub should_quit: bool,
    pub state: AppState,
    pub tool: Tool,
    pub record: Option<ScanRecord>,
    pub scope_target: Option<ScopeTarget>,
    pub history: Vec<ScanRecord>,
    pub results: Option<ResultSet>,
    pub tab: CollectionKind,
    pub tabs: Vec<CollectionKind>,
    pub filters: Vec<FilterTerm>,
    pub input: String,
    pub editing: bool,
    pub sort: Option<SortSpec>,
    pub table_state: TableState,
    pub spinner: usize,
    pub last_error: Option<String>,
    pub show_logs: bool,
    pub log_content: Vec<String>,
    pub log_horizontal_scroll: usize,
    pub log_horizontal_scroll_state: ScrollbarState,
    pub export_status: ExportStatus,
    export_dir: PathBuf,
    cancel: CancelToken,
}

impl App {
    pub fn new(tool: Tool, tabs: Vec<CollectionKind>, cancel: CancelToken, export_dir: PathBuf) -> Self {
        let tab = tabs.first().copied().unwrap_or(CollectionKind::DnsRecords);
        Self {
            should_quit: false,
            state: AppState::Starting,
            tool,
            record: None,
            scope_target: None,
            history: Vec::new(),
            results: None,
            tab,
            tabs,
            filters: Vec::new(),
            input: String::new(),
            editing: false,
            sort: None,
            table_state: TableState::default(),
            spinner: 0,
            last_error: None,
            show_logs: false,
            log_content: Vec::new(),
            log_horizontal_scroll: 0,
            log_horizontal_scroll_state: ScrollbarState::default(),
            export_status: ExportStatus::Idle,
            export_dir,
            cancel,
        }
    }

    pub fn apply_event(&mut self, event: WatchEvent) {
        match event {
            WatchEvent::ScopeTarget(target) => self.scope_target = Some(target),
            WatchEvent::Status(record) => {
                if self.state == AppState::Starting && !record.status.is_terminal() {
                    self.state = AppState::Watching;
                }
                self.last_error = None;
                self.record = Some(record);
            }
            WatchEvent::PollRetry { attempt, error } => {
                self.last_error = Some(format!("retry #{attempt}: {error}"));
            }
            WatchEvent::History(mut scans) => {
                scans.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                self.history = scans;
            }
            WatchEvent::Results(set) => {
                self.results = Some(set);
                self.reset_selection();
            }
            WatchEvent::Finished(record) => {
                self.state = if record.status == ScanStatus::Cancelled {
                    AppState::Cancelled
                } else if record.status.is_failure() {
                    let reason = record
                        .error
                        .clone()
                        .unwrap_or_else(|| format!("scan ended with status {}", record.status));
                    AppState::Failed(reason)
                } else {
                    AppState::Finished
                };
                self.record = Some(record);
            }
            WatchEvent::Cancelled => self.state = AppState::Cancelled,
        }
    }

    /// The session could not run at all (bad target, create failed...).
    pub fn session_failed(&mut self, reason: String) {
        self.state = AppState::Failed(reason);
    }

    pub fn on_tick(&mut self) {
        if self.state.is_active() {
            self.spinner = self.spinner.wrapping_add(1);
        }
    }

    pub fn quit(&mut self) {
        self.cancel.cancel();
        self.should_quit = true;
    }

    pub fn handle_key(&mut self, key: KeyCode) {
        if self.editing {
            self.handle_filter_key(key);
            return;
        }
        // Export feedback stays on screen until the next key press.
        self.export_status = ExportStatus::Idle;
        match key {
            KeyCode::Char('q') => self.quit(),
            KeyCode::Char('c') => {
                if self.state.is_active() {
                    self.cancel.cancel();
                }
            }
            KeyCode::Char('/') => self.editing = true,
            KeyCode::Char('s') => self.cycle_sort_column(),
            KeyCode::Char('d') => self.flip_sort_direction(),
            KeyCode::Char('l') => self.show_logs = !self.show_logs,
            KeyCode::Char('e') => self.export(),
            KeyCode::Tab | KeyCode::Right => self.next_tab(),
            KeyCode::BackTab | KeyCode::Left => self.previous_tab(),
            KeyCode::Down => self.select_next(),
            KeyCode::Up => self.select_previous(),
            KeyCode::Backspace => {
                self.filters.pop();
                self.reset_selection();
            }
            KeyCode::Delete => {
                self.filters.clear();
                self.reset_selection();
            }
            KeyCode::Char('[') => self.scroll_logs_left(),
            KeyCode::Char(']') => self.scroll_logs_right(),
            _ => {}
        }
    }

    fn handle_filter_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Enter => {
                if let Some(term) = FilterTerm::parse(&self.input) {
                    self.filters.push(term);
                    self.reset_selection();
                }
                self.input.clear();
                self.editing = false;
            }
            KeyCode::Esc => {
                self.input.clear();
                self.editing = false;
            }
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Char(c) => self.input.push(c),
            _ => {}
        }
    }

    fn cycle_sort_column(&mut self) {
        self.sort = Some(match self.sort {
            None => SortSpec::new(Column::Domain, SortDirection::Ascending),
            Some(spec) => SortSpec::new(spec.column.next(), spec.direction),
        });
    }

    fn flip_sort_direction(&mut self) {
        self.sort = Some(match self.sort {
            None => SortSpec::new(Column::Domain, SortDirection::Descending),
            Some(spec) => SortSpec::new(spec.column, spec.direction.flip()),
        });
    }

    fn next_tab(&mut self) {
        if let Some(idx) = self.tabs.iter().position(|t| *t == self.tab) {
            self.tab = self.tabs[(idx + 1) % self.tabs.len()];
            self.reset_selection();
        }
    }

    fn previous_tab(&mut self) {
        if let Some(idx) = self.tabs.iter().position(|t| *t == self.tab) {
            self.tab = self.tabs[(idx + self.tabs.len() - 1) % self.tabs.len()];
            self.reset_selection();
        }
    }

    /// Number of rows the current tab shows after filtering.
    pub fn visible_len(&self) -> usize {
        let Some(results) = &self.results else {
            return 0;
        };
        match self.tab {
            CollectionKind::DnsRecords => results
                .dns_records
                .as_ref()
                .map_or(0, |o| build_view(o.rows(), &self.filters, None).len()),
            CollectionKind::CloudDomains => results
                .cloud_domains
                .as_ref()
                .map_or(0, |o| build_view(o.rows(), &self.filters, None).len()),
            CollectionKind::RawResults => results
                .raw_results
                .as_ref()
                .map_or(0, |o| build_view(o.rows(), &self.filters, None).len()),
        }
    }

    fn select_next(&mut self) {
        let len = self.visible_len();
        if len == 0 {
            return;
        }
        let next = self.table_state.selected().map_or(0, |i| (i + 1).min(len - 1));
        self.table_state.select(Some(next));
    }

    fn select_previous(&mut self) {
        let previous = self.table_state.selected().map_or(0, |i| i.saturating_sub(1));
        if self.visible_len() > 0 {
            self.table_state.select(Some(previous));
        }
    }

    fn reset_selection(&mut self) {
        let selected = (self.visible_len() > 0).then_some(0);
        self.table_state.select(selected);
    }

    fn scroll_logs_left(&mut self) {
        self.log_horizontal_scroll = self.log_horizontal_scroll.saturating_sub(4);
        self.log_horizontal_scroll_state = self.log_horizontal_scroll_state.position(self.log_horizontal_scroll);
    }

    fn scroll_logs_right(&mut self) {
        self.log_horizontal_scroll = self.log_horizontal_scroll.saturating_add(4);
        self.log_horizontal_scroll_state = self.log_horizontal_scroll_state.position(self.log_horizontal_scroll);
    }

    /// Writes the current tab's filtered/sorted view to the export directory.
    pub fn export(&mut self) {
        let Some(results) = &self.results else {
            self.export_status = ExportStatus::Error("No results to export yet.".to_string());
            return;
        };
        if let Some(cause) = results.failure_of(self.tab) {
            self.export_status = ExportStatus::Error(format!("{} failed to load: {cause}", self.tab.title()));
            return;
        }

        let dir = &self.export_dir;
        let scan_id = results.scan_id.as_str();
        let written = match self.tab {
            CollectionKind::DnsRecords => {
                let rows = results.dns_records.as_ref().map_or(&[][..], |o| o.rows());
                export_view(&build_view(rows, &self.filters, self.sort), self.tab, scan_id, dir)
            }
            CollectionKind::CloudDomains => {
                let rows = results.cloud_domains.as_ref().map_or(&[][..], |o| o.rows());
                export_view(&build_view(rows, &self.filters, self.sort), self.tab, scan_id, dir)
            }
            CollectionKind::RawResults => {
                let rows = results.raw_results.as_ref().map_or(&[][..], |o| o.rows());
                export_view(&build_view(rows, &self.filters, self.sort), self.tab, scan_id, dir)
            }
        };

        self.export_status = match written {
            Ok(path) => ExportStatus::Success(path.display().to_string()),
            Err(e) => ExportStatus::Error(e.to_string()),
        };
    }
}
