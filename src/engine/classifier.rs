use super::combiner::{CombinedMatcher, MatchSpan};
use crate::filter::FilterId;
use std::collections::{BTreeMap, BTreeSet};

/// Split on `\n` only. A trailing `\r` stays part of its line, and a final
/// newline yields a last empty line.
pub fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    text.split('\n')
}

pub fn line_count(text: &str) -> usize {
    text.bytes().filter(|&b| b == b'\n').count() + 1
}

/// Result of one classification pass over a document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    matched_lines: BTreeMap<FilterId, BTreeSet<usize>>,
    winners: BTreeMap<usize, FilterId>,
    line_count: usize,
}

impl Classification {
    /// Lines matched by each filter of the pass. Filters that matched nothing
    /// are present with an empty set.
    pub fn matched_lines(&self) -> &BTreeMap<FilterId, BTreeSet<usize>> {
        &self.matched_lines
    }

    pub fn lines_for(&self, filter: FilterId) -> Option<&BTreeSet<usize>> {
        self.matched_lines.get(&filter)
    }

    /// Highest-priority filter per matched line
    pub fn winners(&self) -> &BTreeMap<usize, FilterId> {
        &self.winners
    }

    pub fn winner(&self, line: usize) -> Option<FilterId> {
        self.winners.get(&line).copied()
    }

    pub fn line_count(&self) -> usize {
        self.line_count
    }

    /// Lines each filter should decorate: the lines it won
    pub fn winning_lines(&self) -> BTreeMap<FilterId, BTreeSet<usize>> {
        let mut grouped: BTreeMap<FilterId, BTreeSet<usize>> = BTreeMap::new();
        for (&line, &filter) in &self.winners {
            grouped.entry(filter).or_default().insert(line);
        }
        grouped
    }

    pub fn into_matched_lines(self) -> BTreeMap<FilterId, BTreeSet<usize>> {
        self.matched_lines
    }
}

/// Rebuild a classification from per-filter line sets that are already in
/// combiner order (descending priority, ties in input order). The first
/// filter listed for a line wins it, which is the same rule [`classify`]
/// applies.
pub fn from_ranked_lines(
    line_count: usize,
    ranked: Vec<(FilterId, BTreeSet<usize>)>,
) -> Classification {
    let mut winners = BTreeMap::new();
    for (filter, lines) in &ranked {
        for &line in lines {
            winners.entry(line).or_insert(*filter);
        }
    }

    Classification {
        matched_lines: ranked.into_iter().collect(),
        winners,
        line_count,
    }
}

/// Classify every line of `text` against all alternatives of `matcher` in a
/// single scan.
///
/// Each line records every filter that matched anywhere on it. The winner of
/// a line is the matching alternative with the lowest position, which is the
/// highest-priority filter because alternatives are sorted by descending
/// priority. Where on the line a match occurs plays no part.
pub fn classify(text: &str, matcher: &CombinedMatcher) -> Classification {
    let mut matched_lines: BTreeMap<FilterId, BTreeSet<usize>> = matcher
        .alternatives()
        .iter()
        .map(|alt| (alt.filter, BTreeSet::new()))
        .collect();
    let mut winners = BTreeMap::new();
    let mut count = 0;

    for (line_number, line) in split_lines(text).enumerate() {
        count += 1;
        if matcher.is_empty() {
            continue;
        }

        let positions = matcher.matching_alternatives(line);
        let Some(&lowest) = positions.first() else {
            continue;
        };

        for position in positions {
            if let Some(alt) = matcher.alternative(position) {
                matched_lines
                    .entry(alt.filter)
                    .or_default()
                    .insert(line_number);
            }
        }
        if let Some(alt) = matcher.alternative(lowest) {
            winners.insert(line_number, alt.filter);
        }
    }

    Classification {
        matched_lines,
        winners,
        line_count: count,
    }
}

/// Highlight ranges within one line, left to right and non-overlapping.
///
/// Each range carries the filter whose alternative matched there; where
/// several could match at the same position the higher-priority one takes
/// it. Zero-length matches are dropped since there is nothing to paint.
pub fn classify_line_ranges(line: &str, matcher: &CombinedMatcher) -> Vec<MatchSpan> {
    matcher
        .spans(line)
        .into_iter()
        .filter(|span| span.end > span.start)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::combiner::MatcherEntry;
    use crate::filter::{CompiledPattern, PatternMode};

    fn entry(source: &str, priority: u8) -> MatcherEntry {
        MatcherEntry {
            filter: FilterId::new(),
            pattern: CompiledPattern::compile(source, PatternMode::Regex, true).unwrap(),
            priority,
            excluded: false,
        }
    }

    #[test]
    fn test_split_keeps_carriage_returns() {
        let lines: Vec<&str> = split_lines("a\r\nb\n").collect();
        assert_eq!(lines, vec!["a\r", "b", ""]);
        assert_eq!(line_count("a\r\nb\n"), 3);
        assert_eq!(line_count(""), 1);
    }

    #[test]
    fn test_higher_priority_wins_shared_line() {
        let error = entry("error", 100);
        let database = entry("database", 10);
        let matcher = CombinedMatcher::build(&[database.clone(), error.clone()]).unwrap();

        let result = classify("database error\nonly database\nnothing", &matcher);
        assert_eq!(result.lines_for(error.filter).unwrap(), &BTreeSet::from([0]));
        assert_eq!(result.lines_for(database.filter).unwrap(), &BTreeSet::from([0, 1]));
        assert_eq!(result.winner(0), Some(error.filter));
        assert_eq!(result.winner(1), Some(database.filter));
        assert_eq!(result.winner(2), None);
        assert_eq!(result.line_count(), 3);
    }

    #[test]
    fn test_overlapping_matches_are_all_recorded() {
        // leftmost-first alternation would consume "db err" and hide "error"
        let error = entry("error", 10);
        let db_err = entry("db err", 90);
        let matcher = CombinedMatcher::build(&[error.clone(), db_err.clone()]).unwrap();

        let result = classify("db error", &matcher);
        assert_eq!(result.lines_for(error.filter).unwrap(), &BTreeSet::from([0]));
        assert_eq!(result.lines_for(db_err.filter).unwrap(), &BTreeSet::from([0]));
        assert_eq!(result.winner(0), Some(db_err.filter));
    }

    #[test]
    fn test_repeated_matches_collapse() {
        let x = entry("x", 50);
        let matcher = CombinedMatcher::build(&[x.clone()]).unwrap();
        let result = classify("x x x\n\nx", &matcher);
        assert_eq!(result.lines_for(x.filter).unwrap(), &BTreeSet::from([0, 2]));
    }

    #[test]
    fn test_unmatched_filters_have_empty_sets() {
        let x = entry("x", 50);
        let matcher = CombinedMatcher::build(&[x.clone()]).unwrap();
        let result = classify("nothing here", &matcher);
        assert_eq!(result.lines_for(x.filter), Some(&BTreeSet::new()));
        assert!(result.winners().is_empty());
    }

    #[test]
    fn test_empty_matcher() {
        let result = classify("a\nb", &CombinedMatcher::empty());
        assert!(result.matched_lines().is_empty());
        assert!(result.winners().is_empty());
        assert_eq!(result.line_count(), 2);
    }

    #[test]
    fn test_empty_match_everywhere_terminates() {
        let anything = entry("z*", 50);
        let matcher = CombinedMatcher::build(&[anything.clone()]).unwrap();
        let result = classify("a\nb\nc", &matcher);
        assert_eq!(result.lines_for(anything.filter).unwrap().len(), 3);
    }

    #[test]
    fn test_rebuilt_classification_matches_single_pass() {
        let a = entry("a", 50);
        let b = entry("b", 50);
        let c = entry("c", 80);
        let entries = [a.clone(), b.clone(), c.clone()];
        let matcher = CombinedMatcher::build(&entries).unwrap();
        let text = "ab\nbc\nca\nabc\nnone";
        let scanned = classify(text, &matcher);

        let ranked = matcher
            .alternatives()
            .iter()
            .map(|alt| (alt.filter, scanned.lines_for(alt.filter).unwrap().clone()))
            .collect();
        assert_eq!(from_ranked_lines(line_count(text), ranked), scanned);
    }

    #[test]
    fn test_line_ranges_are_tagged_with_their_filter() {
        let error = entry("error", 100);
        let database = entry("database", 10);
        let matcher = CombinedMatcher::build(&[database.clone(), error.clone()]).unwrap();

        let ranges = classify_line_ranges("database error, database", &matcher);
        let tagged: Vec<(usize, usize, FilterId)> =
            ranges.iter().map(|r| (r.start, r.end, r.filter)).collect();
        assert_eq!(
            tagged,
            vec![
                (0, 8, database.filter),
                (9, 14, error.filter),
                (16, 24, database.filter),
            ]
        );
        assert_eq!(ranges[1].alternative, 1);
    }

    #[test]
    fn test_line_ranges_skip_empty_matches() {
        let maybe = entry("x*", 50);
        let matcher = CombinedMatcher::build(&[maybe.clone()]).unwrap();
        let ranges = classify_line_ranges("axxb", &matcher);
        assert_eq!(ranges.len(), 1);
        assert_eq!((ranges[0].start, ranges[0].end), (1, 3));
        assert!(classify_line_ranges("anything", &CombinedMatcher::empty()).is_empty());
    }

    #[test]
    fn test_winning_lines_groups_by_winner() {
        let a = entry("a", 90);
        let b = entry("b", 10);
        let matcher = CombinedMatcher::build(&[a.clone(), b.clone()]).unwrap();
        let result = classify("ab\nb\na", &matcher);
        let grouped = result.winning_lines();
        assert_eq!(grouped[&a.filter], BTreeSet::from([0, 2]));
        assert_eq!(grouped[&b.filter], BTreeSet::from([1]));
    }
}
