use crate::archive::ArchiveFormat;
use crate::types::{CollisionPolicy, MatchMode};
use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::path::PathBuf;

/// Default directory for generated presentations
pub fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

/// How rows are picked from the sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
pub enum SearchOption {
    /// A contiguous range of row positions
    #[serde(rename = "rows")]
    Rows,
    /// A list of values matched against the first column
    #[value(name = "store-id", alias = "store_id")]
    #[serde(rename = "store_id")]
    StoreId,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "deckmill")]
#[command(about = "Fill a PowerPoint template once per spreadsheet row")]
#[command(version)]
pub struct CliArgs {
    /// Template presentation (.pptx) with {A}, {B}, ... placeholders
    #[arg(long, short = 't', value_name = "PPTX")]
    pub template: Option<PathBuf>,

    /// Spreadsheet with one row per presentation (.xlsx, .xls, .ods)
    #[arg(long, short = 'd', value_name = "SPREADSHEET")]
    pub data: Option<PathBuf>,

    /// Sheet to read (default: the first sheet)
    #[arg(long, value_name = "NAME")]
    pub sheet: Option<String>,

    /// Directory for generated presentations (default: ./output)
    #[arg(long, short = 'o', value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Select rows by position range or by key list
    #[arg(long, value_enum)]
    pub search: Option<SearchOption>,

    /// First row to generate (0 = first row below the header)
    #[arg(long, value_name = "N")]
    pub start_row: Option<usize>,

    /// Last row to generate, inclusive
    #[arg(long, value_name = "N")]
    pub end_row: Option<usize>,

    /// Comma-separated keys matched against the first column, e.g. "S1, S7, S12"
    #[arg(long, value_name = "KEYS")]
    pub store_ids: Option<String>,

    /// Columns whose values make up the file name, by name or 0-based position
    /// Examples: --name-columns Store City   or   --name-columns 0,2
    #[arg(long, value_name = "COLUMN", num_args = 1.., value_delimiter = ',')]
    pub name_columns: Vec<String>,

    /// Placeholder convention used in the template
    #[arg(long, value_enum)]
    pub match_mode: Option<MatchMode>,

    /// What to do when two rows produce the same file name
    #[arg(long, value_enum)]
    pub on_collision: Option<CollisionPolicy>,

    /// Bundle the generated presentations into one archive
    #[arg(long, value_enum)]
    pub archive: Option<ArchiveFormat>,

    /// Where to write the archive (default: inside the output directory)
    #[arg(long, value_name = "FILE")]
    pub archive_path: Option<PathBuf>,

    /// Also convert every generated presentation to PDF
    #[arg(long)]
    pub convert_pdf: bool,

    /// LibreOffice binary used for PDF conversion
    #[arg(long, value_name = "PATH")]
    pub soffice: Option<PathBuf>,

    /// HTTP endpoint of a transactional email API to send results to
    /// The API key is read from DECKMILL_MAIL_API_KEY
    #[arg(long, value_name = "URL")]
    pub notify_endpoint: Option<String>,

    /// Email recipients (requires --notify-endpoint)
    #[arg(long, value_name = "ADDRESS", num_args = 1..)]
    pub notify_to: Vec<String>,

    /// Sender address for notifications
    #[arg(long, value_name = "ADDRESS")]
    pub notify_from: Option<String>,

    /// Write the batch ledger as JSON
    #[arg(long, value_name = "FILE")]
    pub report_json: Option<PathBuf>,

    /// Write a Markdown batch report
    #[arg(long, value_name = "FILE")]
    pub report_md: Option<PathBuf>,

    /// TOML job file providing defaults for any of the options above
    #[arg(long, value_name = "FILE")]
    pub job: Option<PathBuf>,

    /// Delete existing .pptx files in the output directory before generating
    #[arg(long)]
    pub clean: bool,

    /// Override console width for the summary table (default: auto-detect)
    #[arg(long, value_name = "COLUMNS")]
    pub console_width: Option<usize>,
}

impl CliArgs {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        let mut args = CliArgs::parse();

        // "--name-columns 'Store, City'" arrives with padding around names
        args.name_columns =
            args.name_columns.iter().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();

        args
    }

    /// Validate argument combinations
    pub fn validate(&self) -> Result<(), String> {
        // A job file can supply the inputs; without one both are required
        if self.job.is_none() && (self.template.is_none() || self.data.is_none()) {
            return Err("Both --template and --data are required (or provide them in a --job file)".to_string());
        }

        if self.search == Some(SearchOption::Rows) && self.store_ids.is_some() {
            return Err("--store-ids cannot be used with --search rows".to_string());
        }

        if self.search == Some(SearchOption::StoreId) && (self.start_row.is_some() || self.end_row.is_some()) {
            return Err("--start-row/--end-row cannot be used with --search store-id".to_string());
        }

        if let (Some(start), Some(end)) = (self.start_row, self.end_row)
            && start > end
        {
            return Err(format!("--start-row ({}) must not be greater than --end-row ({})", start, end));
        }

        if self.archive_path.is_some() && self.archive == Some(ArchiveFormat::None) {
            return Err("--archive-path has no effect with --archive none".to_string());
        }

        if !self.notify_to.is_empty() && self.notify_endpoint.is_none() && self.job.is_none() {
            return Err("--notify-to requires --notify-endpoint".to_string());
        }

        Ok(())
    }
}
