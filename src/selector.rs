/// Row selection
///
/// Turns a `Selection` into the ordered list of rows to generate. Row
/// positions always refer to the original dataset, never to a filtered view.
use crate::error::BatchError;
use crate::types::{Dataset, Row, Selection};
use log::{debug, warn};

/// One entry of a resolved selection
#[derive(Debug, Clone, PartialEq)]
pub enum Selected<'a> {
    /// A row to generate, with its position in the dataset
    Row { index: usize, row: Row<'a> },
    /// A requested key that matched no row
    Missing { key: String },
}

impl Selected<'_> {
    pub fn is_row(&self) -> bool {
        matches!(self, Selected::Row { .. })
    }
}

/// Resolve `selection` against `dataset`.
///
/// Invalid row bounds are rejected before anything is returned. Keys are
/// processed in the order given; a key listed twice yields the row twice.
pub fn select<'a>(dataset: &'a Dataset, selection: &Selection) -> Result<Vec<Selected<'a>>, BatchError> {
    match selection {
        Selection::RowRange { start, end } => select_range(dataset, *start, *end),
        Selection::KeyList(keys) => Ok(select_keys(dataset, keys)),
    }
}

fn select_range(dataset: &Dataset, start: usize, end: usize) -> Result<Vec<Selected<'_>>, BatchError> {
    if start > end {
        return Err(BatchError::Configuration(format!("start row {} is after end row {}", start, end)));
    }
    if end >= dataset.len() {
        return Err(BatchError::Configuration(format!(
            "end row {} is out of bounds (the sheet has {} data rows, last index {})",
            end,
            dataset.len(),
            dataset.len().saturating_sub(1)
        )));
    }

    debug!("Selecting rows {}..={}", start, end);
    Ok((start..=end)
        .filter_map(|index| dataset.row(index).map(|row| Selected::Row { index, row }))
        .collect())
}

fn select_keys<'a>(dataset: &'a Dataset, keys: &[String]) -> Vec<Selected<'a>> {
    keys.iter()
        .map(|key| match dataset.rows().find(|(_, row)| row.key() == *key) {
            Some((index, row)) => {
                debug!("Key '{}' found at row {}", key, index);
                Selected::Row { index, row }
            }
            None => {
                warn!("No row found for key '{}'", key);
                Selected::Missing { key: key.clone() }
            }
        })
        .collect()
}
