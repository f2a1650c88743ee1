// Copyright 2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

mod archive;
mod cli;
mod config;
mod convert;
mod dataset;
mod error;
mod naming;
mod notify;
mod placeholder;
mod presentation;
mod report;
mod runner;
mod selector;
mod types;
mod ui;

use archive::ResultPackager;
use config::BatchPlan;
use convert::SofficeConverter;
use error::BatchError;
use notify::{Attachment, HttpMailer, Message};
use presentation::TemplateFile;
use runner::{BatchGenerator, OutputLock};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use types::*;

/// Batch finished with skipped or failed rows
const EXIT_INCOMPLETE: i32 = 2;

fn main() {
    env_logger::init();

    // Parse CLI arguments
    let args = cli::CliArgs::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        ui::print_error(&e);
        std::process::exit(1);
    }

    let exit_code = match run(&args) {
        Ok(code) => code,
        Err(e) => {
            ui::print_error(&e.to_string());
            if e.is_fatal() { 1 } else { EXIT_INCOMPLETE }
        }
    };

    std::process::exit(exit_code);
}

fn run(args: &cli::CliArgs) -> Result<i32, BatchError> {
    // Step 1: Resolve configuration
    let plan = config::build_batch_plan(args)?;
    let job = &plan.job;

    // Step 2: Claim the output directory
    let _lock = OutputLock::acquire(&job.output_dir)?;
    if plan.clean {
        clean_output_dir(&job.output_dir, &[job.template.as_path(), job.data.as_path()])?;
    }

    // Step 3: Load inputs; a bad template is a configuration problem, not a row failure
    let template = TemplateFile::open(&job.template).map_err(|e| {
        BatchError::Configuration(format!("{} is not a usable presentation: {}", job.template.display(), e))
    })?;
    let dataset = dataset::load_dataset(&job.data, job.sheet.as_deref())?;
    ui::status(&format!(
        "Loaded {} rows x {} columns from {}",
        dataset.len(),
        dataset.columns().len(),
        job.data.display()
    ));

    // Step 4: Generate
    let generator = BatchGenerator::new(&template, &job.output_dir)
        .with_file_name(job.file_name.clone())
        .with_match_mode(job.match_mode)
        .with_collision_policy(job.collision);
    let result = generator.run(&dataset, &job.selection, &mut ui::ConsoleSink::new())?;

    report::print_summary_table(&result, args.console_width);

    // Step 5: Downstream steps and reports
    let mut post = PostProcessReport::default();
    let packaged = post_process(&plan, &result, &mut post);
    write_reports(&plan, &result, &post);

    if let Some(cmd) = retry_command(&result, &plan) {
        println!("\nTo retry the failed row(s):\n  {}\n", cmd);
    }

    // A requested archive that could not be written fails the run; the decks stay on disk
    packaged?;

    Ok(if result.is_clean() { 0 } else { EXIT_INCOMPLETE })
}

/// Remove presentations left over from earlier runs, keeping the inputs
fn clean_output_dir(dir: &Path, keep: &[&Path]) -> Result<(), BatchError> {
    let keep: HashSet<PathBuf> = keep.iter().filter_map(|p| fs::canonicalize(p).ok()).collect();
    let stale = ResultPackager::new(dir, archive::ArchiveFormat::None).entries()?;

    let mut removed = 0;
    for path in stale {
        if fs::canonicalize(&path).is_ok_and(|p| keep.contains(&p)) {
            continue;
        }
        fs::remove_file(&path)
            .map_err(|e| BatchError::Persistence(format!("Cannot remove {}: {}", path.display(), e)))?;
        removed += 1;
    }

    if removed > 0 {
        ui::status(&format!("Cleaned {} old presentations from {}", removed, dir.display()));
    }
    Ok(())
}

/// Convert, archive and notify
///
/// Every step is recorded in `post`. Conversion and notification failures
/// are only warnings; a failed archive write is returned as `Persistence`
/// once the remaining steps have run.
fn post_process(plan: &BatchPlan, result: &BatchResult, post: &mut PostProcessReport) -> Result<(), BatchError> {
    let job = &plan.job;

    // Overwritten rows share a path; each file is handled once
    let mut seen = HashSet::new();
    let generated: Vec<PathBuf> =
        result.generated_paths().into_iter().filter(|p| seen.insert(*p)).map(Path::to_path_buf).collect();

    if generated.is_empty() {
        return Ok(());
    }

    if let Some(soffice) = &plan.convert_pdf {
        ui::status(&format!("Converting {} presentations to PDF", generated.len()));
        convert::convert_all(&SofficeConverter::new(soffice), &generated, &job.output_dir, post);
    }

    let mut archive_path = None;
    let mut archive_error = None;
    if let Some((format, path)) = &plan.archive {
        let packager = ResultPackager::new(&job.output_dir, *format).exclude(&job.template).exclude(&job.data);
        let target = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        match packager.write_to(path) {
            Ok(count) => {
                ui::status(&format!("Packaged {} presentations into {}", count, path.display()));
                post.record(StepKind::Archive, target, DeliveryOutcome::Delivered(path.display().to_string()));
                archive_path = Some(path.clone());
            }
            Err(e) => {
                post.record(StepKind::Archive, target, DeliveryOutcome::Failed(e.to_string()));
                archive_error = Some(e);
            }
        }
    }

    if let Some(mailer) = &plan.notify {
        let files = match &archive_path {
            Some(path) => vec![path.clone()],
            None => generated,
        };
        let attachments: Result<Vec<Attachment>, _> = files.iter().map(|p| Attachment::from_path(p)).collect();
        match attachments {
            Ok(attachments) => {
                let message = Message::for_batch(&result.summary(), attachments);
                notify::deliver(&HttpMailer::new(mailer.clone()), &message, post);
            }
            Err(e) => {
                ui::print_warning(&e.to_string());
                post.record(StepKind::Notify, mailer.to.join(", "), DeliveryOutcome::Failed(e.to_string()));
            }
        }
    }

    archive_error.map_or(Ok(()), Err)
}

/// Write the JSON and Markdown reports that were asked for
fn write_reports(plan: &BatchPlan, result: &BatchResult, post: &PostProcessReport) {
    if let Some(path) = &plan.report_json {
        match report::export_json_report(&plan.job, result, post, path) {
            Ok(_) => ui::status(&format!("JSON report saved to: {}", path.display())),
            Err(e) => ui::print_warning(&format!("Failed to save JSON report: {}", e)),
        }
    }

    if let Some(path) = &plan.report_md {
        match report::export_markdown_report(&plan.job, result, post, path) {
            Ok(_) => ui::status(&format!("Markdown report saved to: {}", path.display())),
            Err(e) => ui::print_warning(&format!("Failed to save Markdown report: {}", e)),
        }
    }
}

/// Quote a command-line argument for a POSIX shell
fn shell_quote(arg: &str) -> String {
    format!("'{}'", arg.replace('\'', "'\\''"))
}

/// A command that regenerates only the rows that failed, if any did
fn retry_command(result: &BatchResult, plan: &BatchPlan) -> Option<String> {
    let mut failed: Vec<&str> = result
        .rows
        .iter()
        .filter(|r| matches!(r.outcome, RowOutcome::Failed(_)) && !r.key.is_empty())
        .map(|r| r.key.as_str())
        .collect();
    failed.sort_unstable();
    failed.dedup();

    // Keys containing the list separator cannot be passed back through --store-ids
    if failed.is_empty() || failed.iter().any(|k| k.contains(',')) {
        return None;
    }

    let job = &plan.job;
    let mut cmd = format!(
        "deckmill --template {} --data {} --output-dir {}",
        shell_quote(&job.template.to_string_lossy()),
        shell_quote(&job.data.to_string_lossy()),
        shell_quote(&job.output_dir.to_string_lossy())
    );
    if let Some(sheet) = &job.sheet {
        cmd.push_str(&format!(" --sheet {}", shell_quote(sheet)));
    }
    if !job.file_name.is_empty() {
        let columns: Vec<String> = job
            .file_name
            .iter()
            .map(|c| match c {
                ColumnRef::Index(i) => i.to_string(),
                ColumnRef::Name(n) => n.clone(),
            })
            .collect();
        cmd.push_str(&format!(" --name-columns {}", shell_quote(&columns.join(","))));
    }
    cmd.push_str(&format!(" --store-ids {}", shell_quote(&failed.join(","))));

    Some(cmd)
}
