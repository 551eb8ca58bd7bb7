// src/core/mod.rs

// The scan-watching engine. Everything here is independent of the terminal UI.

/// Typed HTTP access to the reconnaissance backend, behind the `ScanApi` trait.
pub mod client;

/// Error types for the API, poller, config, export and session layers.
pub mod errors;

/// JSON export of filtered/sorted result views.
pub mod export;

/// Concurrent retrieval of the result collections of a finished scan.
pub mod fetcher;

/// Scan records, statuses, result rows and the value types around them.
pub mod models;

/// The cancellable status polling loop.
pub mod poller;

/// Orchestrates create/resume, polling and fetching for one watched scan.
pub mod session;

/// Case-insensitive filtering and stable sorting of result rows.
pub mod view;

#[cfg(test)]
pub(crate) mod testing;
