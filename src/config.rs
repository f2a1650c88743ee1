/// Configuration resolution module
///
/// This module handles:
/// - Loading an optional TOML job file
/// - Merging it with CLI arguments (CLI wins)
/// - Building the row selection and file-name columns
/// - Validating and resolving input and output paths
use crate::archive::ArchiveFormat;
use crate::cli::{CliArgs, SearchOption, default_output_dir};
use crate::error::BatchError;
use crate::notify::{API_KEY_ENV, MailerConfig};
use crate::types::*;
use log::debug;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_SENDER: &str = "deckmill@localhost";

/// Entry of `file_name_order`: a column position or a column name
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NameEntry {
    Index(usize),
    Name(String),
}

impl NameEntry {
    fn to_column_ref(&self) -> ColumnRef {
        match self {
            NameEntry::Index(i) => ColumnRef::Index(*i),
            NameEntry::Name(s) => ColumnRef::parse(s),
        }
    }
}

/// Keys accepted in a `--job` file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobFile {
    pub template: Option<PathBuf>,
    pub data: Option<PathBuf>,
    pub sheet: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub search_option: Option<SearchOption>,
    pub start_row: Option<usize>,
    pub end_row: Option<usize>,
    pub store_id: Option<String>,
    #[serde(default)]
    pub file_name_order: Vec<NameEntry>,
    pub match_mode: Option<MatchMode>,
    pub on_collision: Option<CollisionPolicy>,
    pub archive: Option<ArchiveFormat>,
    pub archive_path: Option<PathBuf>,
    pub convert_pdf: Option<bool>,
    pub soffice: Option<PathBuf>,
    pub notify_endpoint: Option<String>,
    #[serde(default)]
    pub notify_to: Vec<String>,
    pub notify_from: Option<String>,
    pub report_json: Option<PathBuf>,
    pub report_md: Option<PathBuf>,
}

impl JobFile {
    pub fn load(path: &Path) -> Result<Self, BatchError> {
        let text = fs::read_to_string(path)
            .map_err(|e| BatchError::Configuration(format!("Cannot read job file {}: {}", path.display(), e)))?;
        Self::parse(&text).map_err(|e| BatchError::Configuration(format!("{}: {}", path.display(), e)))
    }

    pub fn parse(text: &str) -> Result<Self, String> {
        toml::from_str(text).map_err(|e| format!("invalid job file: {}", e))
    }
}

/// Everything a run needs: the batch itself plus the steps around it
#[derive(Debug, Clone)]
pub struct BatchPlan {
    pub job: BatchJob,
    /// Archive format and destination; None when results stay loose
    pub archive: Option<(ArchiveFormat, PathBuf)>,
    /// soffice binary when PDF conversion is requested
    pub convert_pdf: Option<PathBuf>,
    pub notify: Option<MailerConfig>,
    pub report_json: Option<PathBuf>,
    pub report_md: Option<PathBuf>,
    pub clean: bool,
}

/// Build a complete BatchPlan from CLI arguments
///
/// All configuration is resolved upfront; nothing is generated here, but
/// the output directory is created if it does not exist.
pub fn build_batch_plan(args: &CliArgs) -> Result<BatchPlan, BatchError> {
    debug!("Building batch plan from CLI args");

    // Step 1: Load the job file, if any
    let file = match &args.job {
        Some(path) => JobFile::load(path)?,
        None => JobFile::default(),
    };

    // Step 2: Resolve the batch itself
    let job = build_batch_job(args, &file)?;
    debug!("Resolved job: {:?}", job);

    // Step 3: Downstream steps
    let archive_format = args.archive.or(file.archive).unwrap_or_default();
    let archive = match archive_format.extension() {
        Some(ext) => {
            let path = args
                .archive_path
                .clone()
                .or(file.archive_path.clone())
                .unwrap_or_else(|| job.output_dir.join(format!("presentations.{}", ext)));
            Some((archive_format, path))
        }
        None => None,
    };

    let convert_pdf = (args.convert_pdf || file.convert_pdf.unwrap_or(false))
        .then(|| args.soffice.clone().or(file.soffice.clone()).unwrap_or_else(|| PathBuf::from("soffice")));

    let notify = resolve_notify(args, &file)?;

    Ok(BatchPlan {
        job,
        archive,
        convert_pdf,
        notify,
        report_json: args.report_json.clone().or(file.report_json),
        report_md: args.report_md.clone().or(file.report_md),
        clean: args.clean,
    })
}

/// Resolve inputs, selection, naming and output directory
pub fn build_batch_job(args: &CliArgs, file: &JobFile) -> Result<BatchJob, BatchError> {
    let template = require_file(args.template.as_ref().or(file.template.as_ref()), "template")?;
    let data = require_file(args.data.as_ref().or(file.data.as_ref()), "data")?;

    let selection = resolve_selection(
        args.search.or(file.search_option),
        args.start_row.or(file.start_row),
        args.end_row.or(file.end_row),
        args.store_ids.as_deref().or(file.store_id.as_deref()),
    )?;

    let file_name: Vec<ColumnRef> = if args.name_columns.is_empty() {
        file.file_name_order.iter().map(NameEntry::to_column_ref).collect()
    } else {
        args.name_columns.iter().filter(|s| !s.trim().is_empty()).map(|s| ColumnRef::parse(s)).collect()
    };

    let raw_output = args.output_dir.clone().or(file.output_dir.clone()).unwrap_or_else(default_output_dir);
    let output_dir = resolve_output_directory(&raw_output)?;

    Ok(BatchJob {
        template,
        data,
        sheet: args.sheet.clone().or(file.sheet.clone()),
        output_dir,
        selection,
        file_name,
        match_mode: args.match_mode.or(file.match_mode).unwrap_or_default(),
        collision: args.on_collision.or(file.on_collision).unwrap_or_default(),
    })
}

fn require_file(path: Option<&PathBuf>, what: &str) -> Result<PathBuf, BatchError> {
    let path = path.ok_or_else(|| BatchError::Configuration(format!("No {} file was provided", what)))?;
    if !path.is_file() {
        return Err(BatchError::Configuration(format!("{} file not found: {}", what, path.display())));
    }
    Ok(path.clone())
}

/// Turn the search option and its parameters into a `Selection`
///
/// Without an explicit search option the mode is inferred: store ids win,
/// then row bounds.
pub fn resolve_selection(
    search: Option<SearchOption>,
    start: Option<usize>,
    end: Option<usize>,
    store_ids: Option<&str>,
) -> Result<Selection, BatchError> {
    let search = match search {
        Some(s) => s,
        None if store_ids.is_some() => SearchOption::StoreId,
        None if start.is_some() || end.is_some() => SearchOption::Rows,
        None => {
            return Err(BatchError::Configuration(
                "No rows selected: use --start-row/--end-row or --store-ids".to_string(),
            ));
        }
    };

    match search {
        SearchOption::Rows => {
            let (start, end) = match (start, end) {
                (Some(s), Some(e)) => (s, e),
                _ => {
                    return Err(BatchError::Configuration(
                        "--search rows needs both --start-row and --end-row".to_string(),
                    ));
                }
            };
            if start > end {
                return Err(BatchError::Configuration(format!("start row {} is after end row {}", start, end)));
            }
            Ok(Selection::RowRange { start, end })
        }
        SearchOption::StoreId => {
            let keys = parse_store_ids(store_ids.unwrap_or_default());
            if keys.is_empty() {
                return Err(BatchError::Configuration("--search store-id needs at least one store id".to_string()));
            }
            Ok(Selection::KeyList(keys))
        }
    }
}

/// Split a comma-separated key list; entries are trimmed and blanks dropped
pub fn parse_store_ids(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
}

/// Normalise the output directory: expand `~`, create it, canonicalise
pub fn resolve_output_directory(raw: &Path) -> Result<PathBuf, BatchError> {
    let expanded = expand_home(raw)?;

    if expanded.exists() && !expanded.is_dir() {
        return Err(BatchError::Configuration(format!(
            "Output path {} exists and is not a directory",
            expanded.display()
        )));
    }

    fs::create_dir_all(&expanded).map_err(|e| {
        BatchError::Configuration(format!("Cannot create output directory {}: {}", expanded.display(), e))
    })?;

    let resolved = fs::canonicalize(&expanded)
        .map_err(|e| BatchError::Configuration(format!("Cannot resolve {}: {}", expanded.display(), e)))?;
    debug!("Output directory: {:?}", resolved);
    Ok(resolved)
}

fn expand_home(raw: &Path) -> Result<PathBuf, BatchError> {
    let Ok(rest) = raw.strip_prefix("~") else {
        return Ok(raw.to_path_buf());
    };
    let home = dirs::home_dir()
        .ok_or_else(|| BatchError::Configuration("Cannot expand '~': no home directory".to_string()))?;
    Ok(home.join(rest))
}

fn resolve_notify(args: &CliArgs, file: &JobFile) -> Result<Option<MailerConfig>, BatchError> {
    let Some(endpoint) = args.notify_endpoint.clone().or(file.notify_endpoint.clone()) else {
        return Ok(None);
    };

    let to = if args.notify_to.is_empty() { file.notify_to.clone() } else { args.notify_to.clone() };
    if to.is_empty() {
        return Err(BatchError::Configuration("--notify-endpoint needs at least one --notify-to".to_string()));
    }

    Ok(Some(MailerConfig {
        endpoint,
        api_key: env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty()),
        from: args.notify_from.clone().or(file.notify_from.clone()).unwrap_or_else(|| DEFAULT_SENDER.to_string()),
        to,
    }))
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
