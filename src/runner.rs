use crate::error::BatchError;
use crate::naming;
use crate::placeholder::{MAX_ALIASED_COLUMNS, PlaceholderResolver, column_letter};
use crate::presentation::TemplateSource;
use crate::selector::{self, Selected};
use crate::types::*;
use fs2::FileExt;
use log::{debug, info, warn};
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Receives progress while a batch runs
pub trait ProgressSink {
    /// Called after every processed row with `completed / total`
    fn on_progress(&mut self, fraction: f64, status: &str);

    /// Called once per ledger entry, including unmatched keys
    fn on_row(&mut self, _report: &RowReport) {}

    /// Called once after the last row
    fn on_complete(&mut self, _result: &BatchResult) {}
}

/// Cooperative cancellation, checked before each row
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Exclusive claim on an output directory for the duration of a batch
///
/// The lock file stays in the directory after the batch; only the lock
/// on it is released.
pub struct OutputLock {
    file: File,
}

impl OutputLock {
    const FILE_NAME: &'static str = ".deckmill.lock";

    pub fn acquire(output_dir: &Path) -> Result<Self, BatchError> {
        let path = output_dir.join(Self::FILE_NAME);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| BatchError::Configuration(format!("Cannot create lock file {}: {}", path.display(), e)))?;

        file.try_lock_exclusive().map_err(|_| {
            BatchError::Configuration(format!("Another batch is already writing to {}", output_dir.display()))
        })?;

        debug!("Locked output directory {:?}", output_dir);
        Ok(OutputLock { file })
    }
}

impl Drop for OutputLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}

/// Generates one document per selected row
///
/// Built with the builder pattern; defaults are braced placeholders,
/// fallback file names and overwrite-on-collision.
pub struct BatchGenerator<'t, T: TemplateSource> {
    template: &'t T,
    output_dir: PathBuf,
    file_name: Vec<ColumnRef>,
    resolver: PlaceholderResolver,
    collision: CollisionPolicy,
    cancel: CancelToken,
}

impl<'t, T: TemplateSource> BatchGenerator<'t, T> {
    pub fn new(template: &'t T, output_dir: impl Into<PathBuf>) -> Self {
        BatchGenerator {
            template,
            output_dir: output_dir.into(),
            file_name: Vec::new(),
            resolver: PlaceholderResolver::default(),
            collision: CollisionPolicy::default(),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_file_name(mut self, columns: Vec<ColumnRef>) -> Self {
        self.file_name = columns;
        self
    }

    pub fn with_match_mode(mut self, mode: MatchMode) -> Self {
        self.resolver = PlaceholderResolver::new(mode);
        self
    }

    pub fn with_collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.collision = policy;
        self
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Run the batch
    ///
    /// Invalid selections and empty batches fail before any file is
    /// written. A row that fails is recorded and the batch moves on.
    pub fn run(
        &self,
        dataset: &Dataset,
        selection: &Selection,
        sink: &mut dyn ProgressSink,
    ) -> Result<BatchResult, BatchError> {
        // Step 1: Resolve the selection (bad bounds abort here)
        let selected = selector::select(dataset, selection)?;

        // Step 2: Refuse to run an empty batch
        let total = selected.iter().filter(|s| s.is_row()).count();
        if total == 0 {
            return Err(BatchError::EmptyBatch);
        }
        info!("Generating {} presentations into {}", total, self.output_dir.display());

        if dataset.columns().len() > MAX_ALIASED_COLUMNS {
            warn!(
                "Dataset has {} columns; columns after the 26th have no placeholder letter and will be skipped",
                dataset.columns().len()
            );
        }

        // Step 3: Process rows strictly in selection order
        let mut result = BatchResult::new(total);
        let mut written: HashSet<String> = HashSet::new();

        for entry in selected {
            if self.cancel.is_cancelled() {
                warn!("Batch cancelled after {}/{} rows", result.completed, total);
                result.cancelled = true;
                break;
            }

            let report = match entry {
                Selected::Missing { key } => RowReport {
                    index: None,
                    key,
                    outcome: RowOutcome::Skipped(SkipReason::NoMatchingRow),
                    warnings: Vec::new(),
                },
                Selected::Row { index, row } => {
                    let mut warnings = Vec::new();
                    let outcome = match self.process_row(index, row, &mut written, &mut warnings) {
                        Ok(outcome) => outcome,
                        Err(e) => {
                            warn!("{}", e);
                            RowOutcome::Failed(e.to_string())
                        }
                    };
                    result.completed += 1;
                    RowReport { index: Some(index), key: row.key(), outcome, warnings }
                }
            };

            let counted = report.index.is_some();
            sink.on_row(&report);
            result.rows.push(report);

            if counted {
                let status = format!("Generating presentation {}/{}", result.completed, total);
                sink.on_progress(result.progress(), &status);
            }
        }

        // Step 4: Hand back the ledger
        sink.on_complete(&result);
        Ok(result)
    }

    /// Load, fill, name and save one row's document
    fn process_row(
        &self,
        index: usize,
        row: Row<'_>,
        written: &mut HashSet<String>,
        warnings: &mut Vec<String>,
    ) -> Result<RowOutcome, BatchError> {
        debug!("Processing row {} (key '{}')", index, row.key());

        let mut deck = self.template.load().map_err(|e| BatchError::row(index, e))?;

        let mut rendered = Vec::new();
        for (column, name, value) in row.cells() {
            match column_letter(column) {
                Ok(_) => rendered.push((column, value.render())),
                Err(BatchError::UnsupportedColumnIndex(i)) => {
                    warnings.push(format!("column {} ('{}') has no placeholder letter; not substituted", i, name));
                }
                Err(e) => return Err(e),
            }
        }
        let cells: Vec<(usize, &str)> = rendered.iter().map(|(i, v)| (*i, v.as_str())).collect();
        self.resolver.resolve(&mut deck, &cells)?;

        let base = naming::file_name(&row, index, &self.file_name);
        let (name, overwrote) = self.claim_name(index, base, written)?;
        let path = self.output_dir.join(format!("{}.{}", name, naming::OUTPUT_EXTENSION));

        deck.save(&path).map_err(|e| BatchError::row(index, e))?;
        written.insert(name);

        debug!("Row {} saved to {:?}", index, path);
        Ok(RowOutcome::Generated { path, overwrote })
    }

    /// Apply the collision policy to a name already produced in this batch
    fn claim_name(&self, index: usize, base: String, written: &HashSet<String>) -> Result<(String, bool), BatchError> {
        if !written.contains(&base) {
            return Ok((base, false));
        }

        match self.collision {
            CollisionPolicy::Overwrite => {
                warn!("Row {} overwrites {}.{} written earlier in this batch", index, base, naming::OUTPUT_EXTENSION);
                Ok((base, true))
            }
            CollisionPolicy::Suffix => {
                let mut n = 2;
                loop {
                    let candidate = format!("{}_{}", base, n);
                    if !written.contains(&candidate) {
                        debug!("Row {} renamed to {} to avoid a collision", index, candidate);
                        return Ok((candidate, false));
                    }
                    n += 1;
                }
            }
            CollisionPolicy::Fail => Err(BatchError::RowProcessing {
                row: index,
                message: format!("output name '{}' was already used by an earlier row", base),
            }),
        }
    }
}

#[cfg(test)]
#[path = "runner_test.rs"]
mod runner_test;
