/// User interface and status output utilities
///
/// This module handles:
/// - Serialized console output
/// - Colored error/warning prefixes
/// - Live batch progress (`ConsoleSink`)
use crate::error::BatchError;
use crate::runner::ProgressSink;
use crate::types::{BatchResult, RowOutcome, RowReport};
use lazy_static::lazy_static;
use std::io::Write;
use std::sync::Mutex;

/// Run `f` while holding the console lock so lines never interleave
fn status_lock<F>(f: F)
where
    F: FnOnce(),
{
    lazy_static! {
        static ref LOCK: Mutex<()> = Mutex::new(());
    }
    let _guard = LOCK.lock();
    f();
}

fn print_status_header() {
    print!("deckmill: ");
}

/// Print colored text to terminal, with fallback to plain text
fn print_color(s: &str, fg: term::color::Color) {
    if !really_print_color(s, fg) {
        print!("{}", s);
    }

    fn really_print_color(s: &str, fg: term::color::Color) -> bool {
        let Some(mut t) = term::stdout() else {
            return false;
        };
        if t.fg(fg).is_err() {
            return false;
        }
        let _ = t.attr(term::Attr::Bold);
        if write!(t, "{}", s).is_err() {
            return false;
        }
        let _ = t.reset();
        true
    }
}

/// Print a status message with "deckmill: " prefix
pub fn status(s: &str) {
    status_lock(|| {
        print_status_header();
        println!("{}", s);
    });
}

/// Print an error message with colored "error" prefix
pub fn print_error(msg: &str) {
    status_lock(|| {
        println!();
        print_color("error", term::color::BRIGHT_RED);
        println!(": {}", msg);
        println!();
    });
}

/// Print a warning with colored "warning" prefix
pub fn print_warning(msg: &str) {
    status_lock(|| {
        print_status_header();
        print_color("warning", term::color::BRIGHT_YELLOW);
        println!(": {}", msg);
    });
}

/// Progress line with percentage, e.g. "Generating presentation 2/4 (50%)"
pub fn progress_line(fraction: f64, status: &str) -> String {
    format!("{} ({:.0}%)", status, fraction * 100.0)
}

/// Streams batch progress to the terminal
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl ConsoleSink {
    pub fn new() -> Self {
        ConsoleSink
    }
}

impl ProgressSink for ConsoleSink {
    fn on_progress(&mut self, fraction: f64, status_text: &str) {
        status(&progress_line(fraction, status_text));
    }

    fn on_row(&mut self, report: &RowReport) {
        match &report.outcome {
            RowOutcome::Skipped(_) => print_warning(&BatchError::NoMatchingRow { key: report.key.clone() }.to_string()),
            RowOutcome::Failed(msg) => print_warning(msg),
            RowOutcome::Generated { path, overwrote: true } => {
                print_warning(&format!("{} was overwritten by row '{}'", path.display(), report.key))
            }
            RowOutcome::Generated { .. } => {}
        }
        for warning in &report.warnings {
            print_warning(warning);
        }
    }

    fn on_complete(&mut self, result: &BatchResult) {
        if result.cancelled {
            print_warning(&format!("{} after {}/{} rows", BatchError::Cancelled, result.completed, result.total));
        }
    }
}
