/// Placeholder substitution
///
/// Each dataset column has a one-letter alias derived from its position
/// (column 0 is `A`, column 25 is `Z`). Shapes in the template refer to a
/// column through that alias, either as their whole text (`A`) or as a
/// braced token anywhere in the text (`{A}`), depending on `MatchMode`.
use crate::error::BatchError;
use crate::presentation::Presentation;
use crate::types::MatchMode;
use log::debug;

/// Number of columns that have a letter alias
pub const MAX_ALIASED_COLUMNS: usize = 26;

/// Letter alias for a 0-based column index.
pub fn column_letter(index: usize) -> Result<char, BatchError> {
    if index >= MAX_ALIASED_COLUMNS {
        return Err(BatchError::UnsupportedColumnIndex(index));
    }
    Ok((b'A' + index as u8) as char)
}

/// Rewrites placeholder occurrences in a template copy.
///
/// All columns of a row are substituted in a single pass over the
/// template's own text. Text written for one column is never matched
/// again, so a value such as `B` or `{C}` lands in the output verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderResolver {
    mode: MatchMode,
}

impl PlaceholderResolver {
    pub fn new(mode: MatchMode) -> Self {
        PlaceholderResolver { mode }
    }

    /// Substitute each `(column_index, value)` everywhere its token appears.
    ///
    /// A token that matches no shape is not an error. An index without a
    /// letter alias rejects the whole call before any text is touched.
    /// Returns the number of shapes that were changed.
    pub fn resolve(&self, deck: &mut Presentation, cells: &[(usize, &str)]) -> Result<usize, BatchError> {
        let tokens = cells
            .iter()
            .map(|&(index, value)| Ok((column_letter(index)?, value)))
            .collect::<Result<Vec<(char, &str)>, BatchError>>()?;

        let changed = match self.mode {
            MatchMode::WholeTextEquals => replace_whole_text(deck, &tokens),
            MatchMode::BracedSubstring => replace_braced(deck, &tokens),
        };
        if changed > 0 {
            debug!("{} placeholder(s) filled across {} shape(s)", tokens.len(), changed);
        }
        Ok(changed)
    }
}

/// Value for a letter; the last entry wins when a column is given twice
fn value_for<'v>(tokens: &[(char, &'v str)], letter: char) -> Option<&'v str> {
    tokens.iter().rev().find(|(l, _)| *l == letter).map(|(_, v)| *v)
}

// The shape's sole content is the placeholder, so every run is overwritten.
fn replace_whole_text(deck: &mut Presentation, tokens: &[(char, &str)]) -> usize {
    let mut changed = 0;

    for shape in deck.shapes_mut() {
        let Some(body) = shape.text_body_mut() else { continue };
        let text = body.text();
        let mut chars = text.trim().chars();
        let (Some(letter), None) = (chars.next(), chars.next()) else { continue };
        let Some(value) = value_for(tokens, letter) else { continue };

        body.runs_mut().for_each(|run| run.set_text(value));
        changed += 1;
    }
    changed
}

fn replace_braced(deck: &mut Presentation, tokens: &[(char, &str)]) -> usize {
    let mut changed = 0;

    for shape in deck.shapes_mut() {
        let name = shape.name().to_string();
        let Some(body) = shape.text_body_mut() else { continue };
        let mut touched = false;
        for run in body.runs_mut() {
            if let Some(filled) = fill_braced(run.text(), tokens) {
                run.set_text(filled);
                touched = true;
            }
        }
        if touched {
            changed += 1;
        } else if fill_braced(&body.text(), tokens).is_some() {
            debug!("Placeholder in shape '{}' is split across runs; left untouched", name);
        }
    }
    changed
}

/// Replace every known `{X}` token in `text`, scanning left to right.
///
/// Returns None when nothing was replaced.
fn fill_braced(text: &str, tokens: &[(char, &str)]) -> Option<String> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    let mut replaced = false;

    while let Some(pos) = rest.find('{') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        let mut chars = tail[1..].chars();
        let hit = match (chars.next(), chars.next()) {
            (Some(letter), Some('}')) => value_for(tokens, letter).map(|v| (v, letter.len_utf8() + 2)),
            _ => None,
        };
        match hit {
            Some((value, len)) => {
                out.push_str(value);
                rest = &tail[len..];
                replaced = true;
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);

    replaced.then_some(out)
}

#[cfg(test)]
#[path = "placeholder_test.rs"]
mod placeholder_test;
