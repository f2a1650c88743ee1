//! Batch report generation.
//!
//! This module handles:
//! - Summary statistics over a `BatchResult`
//! - The end-of-batch console table
//! - Export to JSON and Markdown formats
//!
//! # Module Organization
//!
//! - `stats` - Counts and the one-line summary
//! - `table` - Width-aware console table
//! - `export` - JSON and Markdown files

mod export;
mod stats;
mod table;

pub use stats::{RunStats, summarize};

pub use export::{export_json_report, export_markdown_report};

pub use table::{StatusIcon, format_table, print_summary_table};
