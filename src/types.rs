/// Core data structures for batch generation
///
/// This module defines the dataset model (rows, columns, cell values),
/// the selection and naming configuration, and the per-row outcomes that
/// make up a `BatchResult`.
use crate::error::BatchError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// A scalar spreadsheet cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    DateTime(chrono::NaiveDateTime),
}

impl CellValue {
    /// Canonical, locale-independent stringification.
    ///
    /// Used for placeholder substitution, key matching and file naming so a
    /// value renders the same way everywhere.
    pub fn render(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Int(i) => i.to_string(),
            CellValue::Float(f) => render_float(*f),
            CellValue::Bool(true) => "TRUE".to_string(),
            CellValue::Bool(false) => "FALSE".to_string(),
            CellValue::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        CellValue::Int(i)
    }
}

impl From<f64> for CellValue {
    fn from(f: f64) -> Self {
        CellValue::Float(f)
    }
}

// Spreadsheets store every number as a double; 42.0 should read "42".
fn render_float(f: f64) -> String {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0; // 2^53
    if f.is_finite() && f.fract() == 0.0 && f.abs() < MAX_EXACT {
        format!("{}", f as i64)
    } else {
        format!("{}", f)
    }
}

/// An ordered table of rows sharing one set of unique column names
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl Dataset {
    /// Build a dataset, padding short rows with `Empty` and truncating long ones
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Result<Self, BatchError> {
        let mut seen = HashSet::new();
        for name in &columns {
            if !seen.insert(name.as_str()) {
                return Err(BatchError::Dataset(format!("Duplicate column name '{}'", name)));
            }
        }

        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut r| {
                r.resize(width, CellValue::Empty);
                r
            })
            .collect();

        Ok(Dataset { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row at a 0-based position
    pub fn row(&self, index: usize) -> Option<Row<'_>> {
        self.rows.get(index).map(|values| Row { columns: &self.columns, values })
    }

    /// All rows with their positional index
    pub fn rows(&self) -> impl Iterator<Item = (usize, Row<'_>)> {
        self.rows.iter().enumerate().map(move |(i, values)| (i, Row { columns: &self.columns, values }))
    }
}

/// Borrowed view of one dataset row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Row<'a> {
    columns: &'a [String],
    values: &'a [CellValue],
}

impl<'a> Row<'a> {
    /// Value by column name
    pub fn get(&self, column: &str) -> Option<&'a CellValue> {
        self.columns.iter().position(|c| c == column).and_then(|i| self.values.get(i))
    }

    /// Value by 0-based column position
    pub fn value_at(&self, index: usize) -> Option<&'a CellValue> {
        self.values.get(index)
    }

    /// The key column is always the first one
    pub fn key(&self) -> String {
        self.values.first().map(CellValue::render).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// (position, column name, value) in declaration order
    pub fn cells(self) -> impl Iterator<Item = (usize, &'a str, &'a CellValue)> + 'a {
        let columns = self.columns;
        self.values.iter().enumerate().map(move |(i, v)| (i, columns[i].as_str(), v))
    }
}

/// Which rows of the dataset to generate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Selection {
    /// Inclusive 0-based positional bounds
    RowRange { start: usize, end: usize },
    /// Keys matched, in the given order, against the first column
    KeyList(Vec<String>),
}

/// How placeholder tokens are located in shape text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum MatchMode {
    /// The shape's entire trimmed text is the bare letter, e.g. `A`
    #[value(name = "whole-text")]
    #[serde(rename = "whole-text")]
    WholeTextEquals,
    /// `{A}` anywhere inside a run
    #[default]
    #[value(name = "braced")]
    #[serde(rename = "braced")]
    BracedSubstring,
}

/// A reference to a column used to build output file names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnRef {
    Name(String),
    Index(usize),
}

impl ColumnRef {
    /// All-digit references are positional, anything else is a column name
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        match s.parse::<usize>() {
            Ok(i) => ColumnRef::Index(i),
            Err(_) => ColumnRef::Name(s.to_string()),
        }
    }
}

/// What to do when two rows in one batch produce the same file name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionPolicy {
    /// Later row replaces the earlier file
    #[default]
    Overwrite,
    /// Append `_2`, `_3`, ... to the later name
    Suffix,
    /// Record the later row as failed
    Fail,
}

/// Why a row or key produced no file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    NoMatchingRow,
}

/// Outcome of one selected row (or one unmatched key)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RowOutcome {
    Generated { path: PathBuf, overwrote: bool },
    Skipped(SkipReason),
    Failed(String),
}

/// One line of the batch ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowReport {
    /// Positional index in the dataset; None for keys that matched nothing
    pub index: Option<usize>,
    /// Key column value (or the requested key when unmatched)
    pub key: String,
    pub outcome: RowOutcome,
    /// Non-fatal notes such as skipped columns
    pub warnings: Vec<String>,
}

impl RowReport {
    pub fn is_generated(&self) -> bool {
        matches!(self.outcome, RowOutcome::Generated { .. })
    }

    /// Path of the written document, if any
    pub fn output_path(&self) -> Option<&Path> {
        match &self.outcome {
            RowOutcome::Generated { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Counts derived from a `BatchResult`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BatchSummary {
    pub generated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub total: usize,
}

/// Accumulated outcomes of one batch invocation
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BatchResult {
    /// Number of rows selected for generation
    pub total: usize,
    /// Rows processed so far, successful or not
    pub completed: usize,
    pub rows: Vec<RowReport>,
    pub cancelled: bool,
}

impl BatchResult {
    pub fn new(total: usize) -> Self {
        BatchResult { total, ..Default::default() }
    }

    /// Fraction of selected rows processed, in `[0, 1]`
    pub fn progress(&self) -> f64 {
        if self.total == 0 { 1.0 } else { self.completed as f64 / self.total as f64 }
    }

    pub fn generated_paths(&self) -> Vec<&Path> {
        self.rows.iter().filter_map(RowReport::output_path).collect()
    }

    pub fn summary(&self) -> BatchSummary {
        let mut summary = BatchSummary::default();
        for row in &self.rows {
            match row.outcome {
                RowOutcome::Generated { .. } => summary.generated += 1,
                RowOutcome::Skipped(_) => summary.skipped += 1,
                RowOutcome::Failed(_) => summary.failed += 1,
            }
        }
        summary.total = self.rows.len();
        summary
    }

    /// True when every selected row produced a file and no key was skipped
    pub fn is_clean(&self) -> bool {
        let s = self.summary();
        !self.cancelled && s.skipped == 0 && s.failed == 0
    }
}

/// Which downstream step produced a `StepOutcome`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepKind {
    Archive,
    ConvertPdf,
    Notify,
}

/// Result of one downstream delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryOutcome {
    /// Carries an identifier: a written path or a message id
    Delivered(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub kind: StepKind,
    /// What the step worked on (a file name, a recipient list)
    pub target: String,
    pub outcome: DeliveryOutcome,
}

/// Outcomes of the steps that run after generation; never alters the `BatchResult`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PostProcessReport {
    pub steps: Vec<StepOutcome>,
}

impl PostProcessReport {
    pub fn record(&mut self, kind: StepKind, target: impl Into<String>, outcome: DeliveryOutcome) {
        self.steps.push(StepOutcome { kind, target: target.into(), outcome });
    }

    pub fn failures(&self) -> usize {
        self.steps.iter().filter(|s| matches!(s.outcome, DeliveryOutcome::Failed(_))).count()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// A fully resolved, immutable batch job
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub template: PathBuf,
    pub data: PathBuf,
    pub sheet: Option<String>,
    pub output_dir: PathBuf,
    pub selection: Selection,
    pub file_name: Vec<ColumnRef>,
    pub match_mode: MatchMode,
    pub collision: CollisionPolicy,
}

#[cfg(test)]
#[path = "data_structures_test.rs"]
mod data_structures_test;
