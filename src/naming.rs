/// Output file naming
///
/// Builds the base name of each generated document from an ordered list of
/// column references. Pure and deterministic: the same row, index and
/// references always give the same name.
use crate::types::{ColumnRef, Row};

/// Separator between the values of the referenced columns
pub const NAME_SEPARATOR: &str = "_";

/// Extension of generated documents
pub const OUTPUT_EXTENSION: &str = "pptx";

/// Name used when no referenced column yields a value
pub fn fallback_name(row_index: usize) -> String {
    format!("presentation_{}", row_index)
}

/// Derive the output base name (without extension) for a row.
///
/// Name references that don't exist and positional references past the end
/// of the row are skipped, as are empty values.
pub fn file_name(row: &Row<'_>, row_index: usize, columns: &[ColumnRef]) -> String {
    let parts: Vec<String> = columns
        .iter()
        .filter_map(|column| match column {
            ColumnRef::Name(name) => row.get(name),
            ColumnRef::Index(i) => row.value_at(*i),
        })
        .map(|value| sanitize(&value.render()))
        .filter(|s| !s.is_empty())
        .collect();

    if parts.is_empty() { fallback_name(row_index) } else { parts.join(NAME_SEPARATOR) }
}

/// Replace characters that cannot appear in a file name on common filesystems.
fn sanitize(value: &str) -> String {
    let cleaned: String = value
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            c if c.is_control() => '-',
            c => c,
        })
        .collect();
    // "." and ".." would escape the output directory
    if cleaned.chars().all(|c| c == '.') { String::new() } else { cleaned }
}
