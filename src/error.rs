/// Error taxonomy for batch generation
///
/// Batch-fatal errors abort before any file is written (or, for
/// `Persistence`, after generation but before packaging). Everything else
/// is recorded per row in the `BatchResult` and the batch keeps going.
use crate::presentation::PresentationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BatchError {
    /// Invalid row bounds, missing inputs, bad flags
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The selection resolved to zero rows
    #[error("Nothing to generate: the selection matched no rows")]
    EmptyBatch,

    /// A requested key has no row with that key
    #[error("No row found with key '{key}'")]
    NoMatchingRow { key: String },

    /// Template load, mutation or write failed for a single row
    #[error("Row {row}: {message}")]
    RowProcessing { row: usize, message: String },

    /// Column index has no placeholder letter
    #[error("Column {0} has no placeholder alias (only columns 0-25 map to A-Z)")]
    UnsupportedColumnIndex(usize),

    /// Archive or report could not be written
    #[error("Failed to write {0}")]
    Persistence(String),

    /// Spreadsheet could not be read
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// The batch was stopped through its cancel token
    #[error("Batch cancelled")]
    Cancelled,
}

impl BatchError {
    /// Whether this error stops the whole batch
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BatchError::Configuration(_)
                | BatchError::EmptyBatch
                | BatchError::Persistence(_)
                | BatchError::Dataset(_)
                | BatchError::Cancelled
        )
    }

    pub(crate) fn row(row: usize, err: PresentationError) -> Self {
        BatchError::RowProcessing { row, message: err.to_string() }
    }
}
