//! Statistics for a finished batch.

use crate::types::{BatchResult, BatchSummary, RowOutcome};
use serde::Serialize;

/// Counts shown in the console footer and written to reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RunStats {
    pub summary: BatchSummary,
    /// Generated rows that replaced a file written earlier in the batch
    pub overwrites: usize,
    /// Non-fatal warnings across all rows
    pub warnings: usize,
    pub cancelled: bool,
}

impl RunStats {
    /// One-line summary, e.g. "3 generated, 1 skipped, 0 failed (4 entries)"
    pub fn headline(&self) -> String {
        let mut line = format!(
            "{} generated, {} skipped, {} failed ({} entries)",
            self.summary.generated, self.summary.skipped, self.summary.failed, self.summary.total
        );
        if self.overwrites > 0 {
            line.push_str(&format!(", {} overwritten", self.overwrites));
        }
        if self.cancelled {
            line.push_str(", cancelled");
        }
        line
    }
}

/// Calculate statistics for a batch.
pub fn summarize(result: &BatchResult) -> RunStats {
    let overwrites =
        result.rows.iter().filter(|r| matches!(r.outcome, RowOutcome::Generated { overwrote: true, .. })).count();
    let warnings = result.rows.iter().map(|r| r.warnings.len()).sum();

    RunStats { summary: result.summary(), overwrites, warnings, cancelled: result.cancelled }
}
