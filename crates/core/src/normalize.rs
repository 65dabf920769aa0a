//! Text normalization shared by header matching and applicant-name search.
//!
//! `normalize` folds case and accents, turns `-`, `_`, `/` and `.` into
//! spaces, and collapses whitespace, so "LP-PROMOTION", "lp  promotion" and
//! "L.P/PROMOTION" all compare on the same spaced, lowercase form. Both
//! functions are idempotent.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Separators that become a single space.
const SEPARATORS: [char; 4] = ['-', '_', '/', '.'];

/// Normalize free text for comparison. Missing input normalizes to "".
pub fn normalize<'a>(text: impl Into<Option<&'a str>>) -> String {
    let Some(text) = text.into() else {
        return String::new();
    };
    let folded: String = fold(text)
        .chars()
        .map(|c| if SEPARATORS.contains(&c) { ' ' } else { c })
        .collect();
    collapse_whitespace(&folded)
}

/// Normalize a source column header.
///
/// Stricter than [`normalize`]: apostrophes (straight or curly) and every
/// other non-alphanumeric character become spaces, so "d'un" and "d’un"
/// both read "d un".
pub fn normalize_header(header: &str) -> String {
    let folded: String = fold(header)
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    collapse_whitespace(&folded)
}

/// Lowercase, decompose, and drop combining marks.
///
/// Lowercasing runs before the decomposition so that a decomposed capital
/// cannot reintroduce a mark on a second pass.
fn fold(text: &str) -> String {
    text.to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
