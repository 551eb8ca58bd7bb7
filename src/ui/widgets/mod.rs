// src/ui/widgets/mod.rs

pub mod footer; // Key hints and export feedback.
pub mod input; // Filter terms and the filter input line.
pub mod log_view;
pub mod results; // Collection tabs and the filtered/sorted table.
pub mod status_view; // Live scan record and scan history.
