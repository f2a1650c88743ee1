//! Report export functions for JSON and Markdown formats.
//!
//! This module handles writing the batch ledger to files for storage and
//! for sharing with whoever asked for the presentations.

use super::stats::summarize;
use super::table::{StatusIcon, format_table};
use crate::types::{BatchJob, BatchResult, DeliveryOutcome, PostProcessReport, RowOutcome, Selection};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Width of the console table embedded in Markdown reports
const MARKDOWN_TABLE_WIDTH: usize = 100;

fn describe_selection(selection: &Selection) -> String {
    match selection {
        Selection::RowRange { start, end } => format!("rows {}..={}", start, end),
        Selection::KeyList(keys) => format!("store ids {}", keys.join(", ")),
    }
}

/// Export the batch as JSON.
///
/// Includes the job inputs, summary counts, every ledger entry, and the
/// outcomes of any downstream steps.
pub fn export_json_report(
    job: &BatchJob,
    result: &BatchResult,
    post: &PostProcessReport,
    output_path: &Path,
) -> std::io::Result<()> {
    use serde_json::json;

    let stats = summarize(result);

    let report = json!({
        "generated_at": chrono::Local::now().to_rfc3339(),
        "template": job.template,
        "data": job.data,
        "output_dir": job.output_dir,
        "selection": job.selection,
        "match_mode": job.match_mode,
        "summary": {
            "generated": stats.summary.generated,
            "skipped": stats.summary.skipped,
            "failed": stats.summary.failed,
            "total": stats.summary.total,
            "overwrites": stats.overwrites,
            "warnings": stats.warnings,
            "cancelled": stats.cancelled,
        },
        "rows": result.rows,
        "post_process": post.steps,
    });

    let file = File::create(output_path)?;
    serde_json::to_writer_pretty(file, &report)?;

    Ok(())
}

/// Export the batch as Markdown with the console table in a code block.
pub fn export_markdown_report(
    job: &BatchJob,
    result: &BatchResult,
    post: &PostProcessReport,
    output_path: &Path,
) -> std::io::Result<()> {
    let mut file = File::create(output_path)?;
    let stats = summarize(result);

    writeln!(file, "# Deckmill Batch Report\n")?;
    writeln!(file, "**Generated**: {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"))?;
    writeln!(file, "**Template**: {}", job.template.display())?;
    writeln!(file, "**Data**: {}", job.data.display())?;
    writeln!(file, "**Selection**: {}\n", describe_selection(&job.selection))?;

    writeln!(file, "## Summary\n")?;
    writeln!(file, "- {} Generated: {}", StatusIcon::Generated.as_str(), stats.summary.generated)?;
    writeln!(file, "- {} Skipped: {}", StatusIcon::Skipped.as_str(), stats.summary.skipped)?;
    writeln!(file, "- {} Failed: {}", StatusIcon::Failed.as_str(), stats.summary.failed)?;
    if stats.overwrites > 0 {
        writeln!(file, "- {} Overwritten: {}", StatusIcon::Overwrote.as_str(), stats.overwrites)?;
    }
    if stats.cancelled {
        writeln!(file, "- Cancelled after {}/{} rows", result.completed, result.total)?;
    }
    writeln!(file, "- **Total**: {}\n", stats.summary.total)?;

    writeln!(file, "## Rows\n")?;
    writeln!(file, "```")?;
    write!(file, "{}", format_table(result, MARKDOWN_TABLE_WIDTH))?;
    writeln!(file, "```\n")?;

    let warned: Vec<_> = result.rows.iter().filter(|r| !r.warnings.is_empty()).collect();
    if !warned.is_empty() {
        writeln!(file, "## Warnings\n")?;
        for row in warned {
            for warning in &row.warnings {
                writeln!(file, "- `{}`: {}", row.key, warning)?;
            }
        }
        writeln!(file)?;
    }

    let failures: Vec<_> = result
        .rows
        .iter()
        .filter_map(|r| match &r.outcome {
            RowOutcome::Failed(msg) => Some(msg),
            _ => None,
        })
        .collect();
    if !failures.is_empty() {
        writeln!(file, "## Failures\n")?;
        for msg in failures {
            writeln!(file, "- {}", msg)?;
        }
        writeln!(file)?;
    }

    if !post.is_empty() {
        writeln!(file, "## Delivery\n")?;
        writeln!(file, "| Step | Target | Result |")?;
        writeln!(file, "|------|--------|--------|")?;
        for step in &post.steps {
            let outcome = match &step.outcome {
                DeliveryOutcome::Delivered(id) => format!("{} {}", StatusIcon::Generated.as_str(), id),
                DeliveryOutcome::Failed(msg) => format!("{} {}", StatusIcon::Failed.as_str(), msg),
            };
            writeln!(file, "| {:?} | {} | {} |", step.kind, step.target, outcome)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CollisionPolicy, MatchMode, RowReport, SkipReason, StepKind};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn job() -> BatchJob {
        BatchJob {
            template: PathBuf::from("template.pptx"),
            data: PathBuf::from("stores.xlsx"),
            sheet: None,
            output_dir: PathBuf::from("/out"),
            selection: Selection::KeyList(vec!["S1".into(), "S9".into()]),
            file_name: vec![],
            match_mode: MatchMode::BracedSubstring,
            collision: CollisionPolicy::Overwrite,
        }
    }

    fn result() -> BatchResult {
        let mut result = BatchResult::new(1);
        result.completed = 1;
        result.rows = vec![
            RowReport {
                index: Some(0),
                key: "S1".into(),
                outcome: RowOutcome::Generated { path: PathBuf::from("/out/S1.pptx"), overwrote: false },
                warnings: vec!["column 26 ('Extra') has no placeholder letter; not substituted".into()],
            },
            RowReport {
                index: None,
                key: "S9".into(),
                outcome: RowOutcome::Skipped(SkipReason::NoMatchingRow),
                warnings: vec![],
            },
        ];
        result
    }

    #[test]
    fn test_json_report_structure() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.json");
        let mut post = PostProcessReport::default();
        post.record(StepKind::Archive, "presentations.zip", DeliveryOutcome::Delivered("/out/presentations.zip".into()));

        export_json_report(&job(), &result(), &post, &path).unwrap();

        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["summary"]["generated"], 1);
        assert_eq!(value["summary"]["skipped"], 1);
        assert_eq!(value["rows"].as_array().unwrap().len(), 2);
        assert_eq!(value["rows"][1]["key"], "S9");
        assert_eq!(value["match_mode"], "braced");
        assert_eq!(value["post_process"][0]["kind"], "archive");
    }

    #[test]
    fn test_markdown_report_sections() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.md");

        export_markdown_report(&job(), &result(), &PostProcessReport::default(), &path).unwrap();

        let md = std::fs::read_to_string(&path).unwrap();
        assert!(md.starts_with("# Deckmill Batch Report"));
        assert!(md.contains("**Generated**: "));
        assert!(md.contains("**Selection**: store ids S1, S9"));
        assert!(md.contains("- ✓ Generated: 1"));
        assert!(md.contains("## Warnings"));
        assert!(md.contains("no matching row"));
        assert!(!md.contains("## Failures"));
        assert!(!md.contains("## Delivery"));
    }
}
