use std::collections::{BTreeSet, HashMap, HashSet};

/// Matched line numbers for one filter, keyed by document identity.
///
/// Holds no text and no matcher state. Clearing is always safe; the next
/// analysis rebuilds whatever was dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultCache {
    matched_lines: HashMap<String, BTreeSet<usize>>,
    analyzed: HashSet<String>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entry for `document` and mark it analyzed. Not additive.
    pub fn update(&mut self, document: &str, lines: BTreeSet<usize>) {
        self.matched_lines.insert(document.to_string(), lines);
        self.analyzed.insert(document.to_string());
    }

    pub fn is_analyzed(&self, document: &str) -> bool {
        self.analyzed.contains(document)
    }

    /// Cached lines for `document`, or `None` if it was never analyzed.
    ///
    /// An analyzed document with no matches yields an empty set, which is
    /// different from `None`.
    pub fn lines(&self, document: &str) -> Option<&BTreeSet<usize>> {
        if !self.is_analyzed(document) {
            return None;
        }
        static EMPTY: BTreeSet<usize> = BTreeSet::new();
        Some(self.matched_lines.get(document).unwrap_or(&EMPTY))
    }

    pub fn clear(&mut self) {
        self.matched_lines.clear();
        self.analyzed.clear();
    }

    pub fn clear_document(&mut self, document: &str) {
        self.matched_lines.remove(document);
        self.analyzed.remove(document);
    }

    pub fn documents(&self) -> impl Iterator<Item = &str> {
        self.analyzed.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(values: &[usize]) -> BTreeSet<usize> {
        values.iter().copied().collect()
    }

    #[test]
    fn test_update_marks_analyzed() {
        let mut cache = ResultCache::new();
        assert!(!cache.is_analyzed("file:///a.log"));
        assert_eq!(cache.lines("file:///a.log"), None);

        cache.update("file:///a.log", lines(&[1, 3]));
        assert!(cache.is_analyzed("file:///a.log"));
        assert_eq!(cache.lines("file:///a.log"), Some(&lines(&[1, 3])));
    }

    #[test]
    fn test_update_overwrites() {
        let mut cache = ResultCache::new();
        cache.update("doc", lines(&[1, 2, 3]));
        cache.update("doc", lines(&[7]));
        assert_eq!(cache.lines("doc"), Some(&lines(&[7])));
    }

    #[test]
    fn test_analyzed_without_matches_is_not_unanalyzed() {
        let mut cache = ResultCache::new();
        cache.update("doc", BTreeSet::new());
        assert_eq!(cache.lines("doc").map(BTreeSet::len), Some(0));
    }

    #[test]
    fn test_clear_document_only_touches_that_document() {
        let mut cache = ResultCache::new();
        cache.update("a", lines(&[0]));
        cache.update("b", lines(&[1]));
        cache.clear_document("a");
        assert!(!cache.is_analyzed("a"));
        assert_eq!(cache.lines("b"), Some(&lines(&[1])));

        cache.clear();
        assert!(!cache.is_analyzed("b"));
        assert_eq!(cache.documents().count(), 0);
    }
}
