// src/core/view.rs

//! Pure filter/sort views over fetched result rows.

use std::borrow::Cow;
use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use strum::{Display, EnumIter, IntoEnumIterator};

use crate::core::models::{CloudDomain, DnsRecord, RawResult};

/// A column every row kind can be viewed through.
///
/// `Kind` is the record type of DNS rows and the provider of cloud rows; `Value` is the
/// resolved record or the raw tool output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum Column {
    Domain,
    Kind,
    Value,
    #[strum(to_string = "Created")]
    CreatedAt,
}

impl Column {
    pub fn next(self) -> Column {
        let all: Vec<Column> = Column::iter().collect();
        let idx = all.iter().position(|c| *c == self).unwrap_or(0);
        all[(idx + 1) % all.len()]
    }
}

pub enum Cell<'a> {
    Text(Cow<'a, str>),
    Time(DateTime<Utc>),
}

pub trait ViewRow {
    fn cell(&self, column: Column) -> Cell<'_>;
}

impl ViewRow for DnsRecord {
    fn cell(&self, column: Column) -> Cell<'_> {
        match column {
            Column::Domain => Cell::Text(Cow::Borrowed(&self.domain)),
            Column::Kind => Cell::Text(Cow::Borrowed(self.record_type.as_str())),
            Column::Value => Cell::Text(Cow::Borrowed(&self.record)),
            Column::CreatedAt => Cell::Time(self.created_at),
        }
    }
}

impl ViewRow for CloudDomain {
    fn cell(&self, column: Column) -> Cell<'_> {
        match column {
            Column::Domain => Cell::Text(Cow::Borrowed(&self.domain)),
            Column::Kind => Cell::Text(Cow::Borrowed(self.provider.as_str())),
            Column::Value => Cell::Text(Cow::Borrowed("")),
            Column::CreatedAt => Cell::Time(self.created_at),
        }
    }
}

impl ViewRow for RawResult {
    fn cell(&self, column: Column) -> Cell<'_> {
        match column {
            Column::Domain => Cell::Text(Cow::Borrowed(&self.domain)),
            Column::Kind => Cell::Text(Cow::Borrowed("")),
            Column::Value => Cell::Text(Cow::Borrowed(&self.raw_output)),
            Column::CreatedAt => Cell::Time(self.created_at),
        }
    }
}

// --- Filtering ---

/// One search term. A row matches when `contains(column, term) != negative`,
/// compared case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterTerm {
    pub term: String,
    pub negative: bool,
    pub column: Column,
}

impl FilterTerm {
    pub fn new(term: &str, negative: bool) -> Self {
        Self {
            term: term.to_string(),
            negative,
            column: Column::Domain,
        }
    }

    pub fn on(mut self, column: Column) -> Self {
        self.column = column;
        self
    }

    /// Parses user input: a leading `!` makes the term negative.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        let (term, negative) = match input.strip_prefix('!') {
            Some(rest) => (rest.trim(), true),
            None => (input, false),
        };
        (!term.is_empty()).then(|| FilterTerm::new(term, negative))
    }

    fn matches<R: ViewRow>(&self, row: &R) -> bool {
        // Empty terms constrain nothing, in either polarity.
        if self.term.is_empty() {
            return true;
        }
        let haystack = match row.cell(self.column) {
            Cell::Text(text) => text.to_lowercase(),
            Cell::Time(ts) => ts.to_rfc3339(),
        };
        haystack.contains(&self.term.to_lowercase()) != self.negative
    }
}

/// Rows matching every filter, in their original order.
pub fn apply_filters<'a, R: ViewRow>(rows: &'a [R], filters: &[FilterTerm]) -> Vec<&'a R> {
    rows.iter()
        .filter(|row| filters.iter().all(|f| f.matches(*row)))
        .collect()
}

// --- Sorting ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SortDirection {
    #[strum(to_string = "asc")]
    Ascending,
    #[strum(to_string = "desc")]
    Descending,
}

impl SortDirection {
    pub fn flip(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub column: Column,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(column: Column, direction: SortDirection) -> Self {
        Self { column, direction }
    }
}

fn compare_cells(a: Cell<'_>, b: Cell<'_>) -> Ordering {
    match (a, b) {
        (Cell::Text(a), Cell::Text(b)) => a.to_lowercase().cmp(&b.to_lowercase()),
        (Cell::Time(a), Cell::Time(b)) => a.cmp(&b),
        // A column yields the same cell kind for every row.
        (Cell::Text(_), Cell::Time(_)) => Ordering::Less,
        (Cell::Time(_), Cell::Text(_)) => Ordering::Greater,
    }
}

/// Sorts in place. The sort is stable, so rows with equal keys keep their order
/// in both directions.
pub fn sort_rows<R: ViewRow>(rows: &mut [&R], spec: SortSpec) {
    rows.sort_by(|a, b| {
        let ord = compare_cells(a.cell(spec.column), b.cell(spec.column));
        match spec.direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    });
}

/// Filters, then optionally sorts.
pub fn build_view<'a, R: ViewRow>(rows: &'a [R], filters: &[FilterTerm], sort: Option<SortSpec>) -> Vec<&'a R> {
    let mut view = apply_filters(rows, filters);
    if let Some(spec) = sort {
        sort_rows(&mut view, spec);
    }
    view
}
