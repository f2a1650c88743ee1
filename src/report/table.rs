//! Console table output for batch results.
//!
//! One line per ledger entry: status icon, row index, key, and the output
//! file name or the reason nothing was written.

use super::stats::summarize;
use crate::types::{BatchResult, RowOutcome, RowReport, SkipReason};
use terminal_size::{Width, terminal_size};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const ROW_WIDTH: usize = 6;
const KEY_MIN_WIDTH: usize = 10;
const KEY_MAX_WIDTH: usize = 30;
const MIN_DETAIL_WIDTH: usize = 20;

/// Status icon for a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusIcon {
    Generated,
    Overwrote,
    Skipped,
    Failed,
}

impl StatusIcon {
    pub fn of(outcome: &RowOutcome) -> Self {
        match outcome {
            RowOutcome::Generated { overwrote: false, .. } => StatusIcon::Generated,
            RowOutcome::Generated { overwrote: true, .. } => StatusIcon::Overwrote,
            RowOutcome::Skipped(_) => StatusIcon::Skipped,
            RowOutcome::Failed(_) => StatusIcon::Failed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusIcon::Generated => "✓",
            StatusIcon::Overwrote => "↻",
            StatusIcon::Skipped => "⊘",
            StatusIcon::Failed => "✗",
        }
    }
}

/// Get terminal width or default to 100
fn terminal_width() -> usize {
    match terminal_size() {
        Some((Width(w), _)) => w as usize,
        None => 100,
    }
}

/// Truncate (with "...") or pad a string to an exact display width
fn fit(s: &str, width: usize) -> String {
    let current = UnicodeWidthStr::width(s);
    if current <= width {
        return format!("{}{}", s, " ".repeat(width - current));
    }

    let target = width.saturating_sub(3);
    let mut out = String::new();
    let mut used = 0;
    for c in s.chars() {
        let w = UnicodeWidthChar::width(c).unwrap_or(1);
        if used + w > target {
            break;
        }
        out.push(c);
        used += w;
    }
    if width >= 3 {
        out.push_str("...");
        used += 3;
    }
    out.push_str(&" ".repeat(width.saturating_sub(used)));
    out
}

fn detail(report: &RowReport) -> String {
    match &report.outcome {
        RowOutcome::Generated { path, .. } => {
            path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
        }
        RowOutcome::Skipped(SkipReason::NoMatchingRow) => "no matching row".to_string(),
        RowOutcome::Failed(msg) => msg.clone(),
    }
}

/// Render the whole table (header, rows, footer) for a given console width
pub fn format_table(result: &BatchResult, width: usize) -> String {
    let key_width = result
        .rows
        .iter()
        .map(|r| UnicodeWidthStr::width(r.key.as_str()))
        .max()
        .unwrap_or(0)
        .clamp(KEY_MIN_WIDTH, KEY_MAX_WIDTH);
    // icon and gap, then two " │ " separators
    let fixed = 3 + ROW_WIDTH + 3 + key_width + 3;
    let detail_width = width.saturating_sub(fixed).max(MIN_DETAIL_WIDTH);
    let rule = "─".repeat(fixed + detail_width);

    let mut out = String::new();
    out.push_str(&format!("   {} │ {} │ Output\n", fit("Row", ROW_WIDTH), fit("Key", key_width)));
    out.push_str(&rule);
    out.push('\n');

    for report in &result.rows {
        let row = report.index.map(|i| i.to_string()).unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "{}  {} │ {} │ {}\n",
            StatusIcon::of(&report.outcome).as_str(),
            fit(&row, ROW_WIDTH),
            fit(&report.key, key_width),
            fit(&detail(report), detail_width).trim_end()
        ));
    }

    out.push_str(&rule);
    out.push('\n');
    out.push_str(&summarize(result).headline());
    out.push('\n');
    out
}

/// Print the summary table, sized to the terminal unless `width` is given
pub fn print_summary_table(result: &BatchResult, width: Option<usize>) {
    print!("\n{}", format_table(result, width.unwrap_or_else(terminal_width)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn result() -> BatchResult {
        let mut result = BatchResult::new(2);
        result.completed = 2;
        result.rows = vec![
            RowReport {
                index: Some(0),
                key: "S1".into(),
                outcome: RowOutcome::Generated { path: PathBuf::from("/out/S1_Berlin.pptx"), overwrote: false },
                warnings: vec![],
            },
            RowReport {
                index: None,
                key: "S9".into(),
                outcome: RowOutcome::Skipped(SkipReason::NoMatchingRow),
                warnings: vec![],
            },
            RowReport {
                index: Some(4),
                key: "S5".into(),
                outcome: RowOutcome::Failed("Row 4: corrupt slide".into()),
                warnings: vec![],
            },
        ];
        result
    }

    #[test]
    fn test_fit_pads_and_truncates() {
        assert_eq!(fit("abc", 5), "abc  ");
        assert_eq!(fit("abcdefgh", 6), "abc...");
        assert_eq!(UnicodeWidthStr::width(fit("日本語日本語", 7).as_str()), 7);
    }

    #[test]
    fn test_table_lines() {
        let table = format_table(&result(), 80);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 7);
        assert!(lines[2].starts_with("✓"));
        assert!(lines[2].ends_with("S1_Berlin.pptx"));
        assert!(lines[3].contains("no matching row"));
        assert!(lines[3].contains(" -  "));
        assert!(lines[4].starts_with("✗"));
        assert!(lines[4].contains("corrupt slide"));
        assert_eq!(lines[6], "1 generated, 1 skipped, 1 failed (3 entries)");
    }

    #[test]
    fn test_narrow_console_truncates_detail() {
        let mut result = result();
        result.rows[2].outcome = RowOutcome::Failed("x".repeat(200));
        let table = format_table(&result, 40);
        let failed = table.lines().nth(4).unwrap();
        assert!(failed.ends_with("..."));
        assert!(UnicodeWidthStr::width(failed) <= 3 + ROW_WIDTH + 3 + KEY_MIN_WIDTH + 3 + MIN_DETAIL_WIDTH);
    }

    #[test]
    fn test_icons() {
        assert_eq!(StatusIcon::of(&RowOutcome::Failed(String::new())).as_str(), "✗");
        assert_eq!(
            StatusIcon::of(&RowOutcome::Generated { path: PathBuf::new(), overwrote: true }),
            StatusIcon::Overwrote
        );
    }
}
