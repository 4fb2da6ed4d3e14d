//! Focus views: a read-only projection of a document that keeps only the
//! lines selected by the filters' dispositions.
//!
//! A line is visible when no included filter exists or at least one included
//! filter matched it, and no excluded filter matched it. Exclusion is applied
//! last and always wins.

use crate::engine::classifier::{line_count, split_lines};
use crate::filter::{Disposition, Filter};
use std::collections::BTreeSet;

/// Reserved scheme of focus-view identities
pub const FOCUS_SCHEME: &str = "focus";
const REVISION_MARKER: &str = "#rev=";

/// Ordered visible lines of a focus view with their text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusView {
    pub source: String,
    /// Original line numbers, ascending
    pub lines: Vec<usize>,
    /// Text of each visible line, verbatim, parallel to `lines`
    pub rows: Vec<String>,
    /// Lines in the source document
    pub line_count: usize,
}

impl FocusView {
    /// Every line of `text`, for when no filtering could be applied
    pub fn unfiltered(source: &str, text: &str) -> Self {
        let line_count = line_count(text);
        let lines: Vec<usize> = (0..line_count).collect();
        let rows = render(text, &lines);
        Self {
            source: source.to_string(),
            lines,
            rows,
            line_count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Visible rows as `(original line, text)`.
    ///
    /// The empty piece after a document's final newline terminates the last
    /// line rather than being a line of its own, so it is left out.
    pub fn visible_rows(&self) -> impl Iterator<Item = (usize, &str)> {
        self.lines
            .iter()
            .zip(&self.rows)
            .filter(|&(&line, row)| !(line + 1 == self.line_count && row.is_empty()))
            .map(|(&line, row)| (line, row.as_str()))
    }
}

/// Visible line numbers for a document of `line_count` lines.
pub fn visible_lines(
    line_count: usize,
    included: &[&BTreeSet<usize>],
    excluded: &[&BTreeSet<usize>],
) -> Vec<usize> {
    let mut candidates = BTreeSet::new();
    if included.is_empty() {
        candidates.extend(0..line_count);
    } else {
        for lines in included {
            candidates.extend(lines.iter().copied().filter(|&l| l < line_count));
        }
    }

    for lines in excluded {
        for line in lines.iter() {
            candidates.remove(line);
        }
    }

    candidates.into_iter().collect()
}

/// Text of `lines` of `text` in order, one per row, contents untouched
pub fn render(text: &str, lines: &[usize]) -> Vec<String> {
    let source: Vec<&str> = split_lines(text).collect();
    lines
        .iter()
        .filter_map(|&line| source.get(line).map(|row| row.to_string()))
        .collect()
}

/// Build the focus view of `document` from the filters' cached results.
///
/// Filters with disposition `None` are ignored. Returns `None` if any
/// participating filter has not analyzed `document` yet.
pub fn generate<'a>(
    document: &str,
    text: &str,
    filters: impl IntoIterator<Item = &'a Filter>,
) -> Option<FocusView> {
    let mut included = Vec::new();
    let mut excluded = Vec::new();

    for filter in filters {
        let bucket = match filter.disposition() {
            Disposition::Included => &mut included,
            Disposition::Excluded => &mut excluded,
            Disposition::None => continue,
        };
        bucket.push(filter.cache().lines(document)?);
    }

    let line_count = line_count(text);
    let lines = visible_lines(line_count, &included, &excluded);
    let rows = render(text, &lines);
    Some(FocusView {
        source: document.to_string(),
        lines,
        rows,
        line_count,
    })
}

/// Identity of the focus view of `original`. The revision relabels the view
/// so editors do not serve a stale copy.
pub fn focus_identity(original: &str, revision: u64) -> String {
    format!("{FOCUS_SCHEME}:{original}{REVISION_MARKER}{revision}")
}

/// Whether `identity` names a focus view
pub fn is_focus_identity(identity: &str) -> bool {
    identity
        .strip_prefix(FOCUS_SCHEME)
        .is_some_and(|rest| rest.starts_with(':'))
}

/// The document a focus view was derived from
pub fn original_identity(identity: &str) -> Option<&str> {
    let rest = identity.strip_prefix(FOCUS_SCHEME)?.strip_prefix(':')?;
    Some(match rest.rsplit_once(REVISION_MARKER) {
        Some((original, revision)) if revision.bytes().all(|b| b.is_ascii_digit()) => original,
        _ => rest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(values: &[usize]) -> BTreeSet<usize> {
        values.iter().copied().collect()
    }

    #[test]
    fn test_included_minus_excluded() {
        let error = set(&[1, 3]);
        let debug = set(&[3]);
        assert_eq!(visible_lines(5, &[&error], &[&debug]), vec![1]);
    }

    #[test]
    fn test_no_included_shows_everything_but_excluded() {
        let excluded = set(&[4]);
        assert_eq!(visible_lines(5, &[], &[&excluded]), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_no_filters_shows_everything() {
        assert_eq!(visible_lines(3, &[], &[]), vec![0, 1, 2]);
    }

    #[test]
    fn test_included_union_sorted() {
        let a = set(&[4, 0]);
        let b = set(&[2, 0]);
        assert_eq!(visible_lines(5, &[&a, &b], &[]), vec![0, 2, 4]);
    }

    #[test]
    fn test_included_filter_with_no_matches_hides_everything() {
        let none = set(&[]);
        assert!(visible_lines(5, &[&none], &[]).is_empty());
    }

    #[test]
    fn test_render_preserves_line_text() {
        let text = "zero\none\r\ntwo\nthree";
        assert_eq!(render(text, &[1, 3]), vec!["one\r", "three"]);
        assert!(render(text, &[]).is_empty());
    }

    #[test]
    fn test_single_empty_row_is_not_an_empty_view() {
        let view = FocusView {
            source: "doc".to_string(),
            lines: vec![1],
            rows: render("a\n\na", &[1]),
            line_count: 3,
        };
        assert!(!view.is_empty());
        assert_eq!(view.visible_rows().collect::<Vec<_>>(), vec![(1, "")]);
    }

    #[test]
    fn test_final_newline_is_not_a_row() {
        let view = FocusView::unfiltered("doc", "a\nb\n");
        assert_eq!(view.lines, vec![0, 1, 2]);
        assert_eq!(view.visible_rows().collect::<Vec<_>>(), vec![(0, "a"), (1, "b")]);

        let view = FocusView::unfiltered("doc", "a\n\n");
        assert_eq!(view.visible_rows().collect::<Vec<_>>(), vec![(0, "a"), (1, "")]);
    }

    #[test]
    fn test_focus_identity_round_trip() {
        let identity = focus_identity("file:///var/log/app.log", 7);
        assert_eq!(identity, "focus:file:///var/log/app.log#rev=7");
        assert!(is_focus_identity(&identity));
        assert_eq!(original_identity(&identity), Some("file:///var/log/app.log"));
    }

    #[test]
    fn test_focus_identity_checks() {
        assert!(!is_focus_identity("file:///focus.log"));
        assert!(!is_focus_identity("focused:/x"));
        assert_eq!(original_identity("file:///x"), None);
        assert_eq!(original_identity("focus:/a#rev=x"), Some("/a#rev=x"));
    }
}
