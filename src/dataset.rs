/// Spreadsheet loading
///
/// This module handles:
/// - Opening `.xlsx`, `.xlsm`, `.xls` and `.ods` workbooks
/// - Picking the source sheet (first sheet unless named)
/// - Turning the header row into unique column names
/// - Converting cells into `CellValue`s
use crate::error::BatchError;
use crate::types::{CellValue, Dataset};
use calamine::{Data, Reader, open_workbook_auto};
use log::debug;
use std::collections::HashMap;
use std::path::Path;

/// Load the data rows of one sheet; the first row is the header.
pub fn load_dataset(path: &Path, sheet: Option<&str>) -> Result<Dataset, BatchError> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| BatchError::Dataset(format!("Failed to open {}: {}", path.display(), e)))?;

    let names = workbook.sheet_names();
    let sheet_name = match sheet {
        Some(wanted) => names.iter().find(|n| n.as_str() == wanted).cloned().ok_or_else(|| {
            BatchError::Dataset(format!("Sheet '{}' not found (available: {})", wanted, names.join(", ")))
        })?,
        None => names
            .first()
            .cloned()
            .ok_or_else(|| BatchError::Dataset(format!("{} contains no sheets", path.display())))?,
    };
    debug!("Reading sheet '{}' from {:?}", sheet_name, path);

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| BatchError::Dataset(format!("Failed to read sheet '{}': {}", sheet_name, e)))?;

    let mut rows = range.rows();
    let header = rows
        .next()
        .ok_or_else(|| BatchError::Dataset(format!("Sheet '{}' is empty (no header row)", sheet_name)))?;
    let columns = column_names(header.iter().map(cell_value).map(|v| v.render()));
    let data: Vec<Vec<CellValue>> = rows.map(|r| r.iter().map(cell_value).collect()).collect();

    debug!("Loaded {} rows x {} columns", data.len(), columns.len());
    Dataset::new(columns, data)
}

/// Convert a calamine cell
pub fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ndt) => CellValue::DateTime(ndt),
            None => CellValue::Float(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Text(format!("#{:?}", e)),
    }
}

/// Header labels made unique: blanks become `Unnamed: <i>`, repeats get `.1`, `.2`, ...
pub fn column_names<I>(labels: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut names = Vec::new();

    for (i, label) in labels.into_iter().enumerate() {
        let label = label.trim().to_string();
        let base = if label.is_empty() { format!("Unnamed: {}", i) } else { label };

        let mut name = base.clone();
        while seen.contains_key(&name) {
            let n = seen.entry(base.clone()).or_insert(0);
            *n += 1;
            name = format!("{}.{}", base, n);
        }
        seen.insert(name.clone(), 0);
        names.push(name);
    }

    names
}
