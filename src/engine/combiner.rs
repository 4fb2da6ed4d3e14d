use super::error::AnalysisError;
use crate::filter::{CompiledPattern, Filter, FilterId};
use regex::{CaptureLocations, Regex, RegexBuilder, RegexSet, RegexSetBuilder};

/// What the combiner needs to know about one eligible filter
#[derive(Debug, Clone)]
pub struct MatcherEntry {
    pub filter: FilterId,
    pub pattern: CompiledPattern,
    pub priority: u8,
    pub excluded: bool,
}

impl MatcherEntry {
    pub fn from_filter(filter: &Filter) -> Self {
        Self {
            filter: filter.id(),
            pattern: filter.pattern().clone(),
            priority: filter.priority(),
            excluded: filter.is_excluded(),
        }
    }
}

/// One alternative of the combined matcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alternative {
    pub filter: FilterId,
    pub excluded: bool,
    /// Capture group wrapping this alternative in the combined expression
    pub group: usize,
}

/// A matched span within a single line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchSpan {
    pub start: usize,
    pub end: usize,
    /// 1-based alternative position, lower means higher priority
    pub alternative: usize,
    pub filter: FilterId,
}

/// All eligible filters merged into one matcher.
///
/// Alternatives are ordered by descending priority; equal priorities keep the
/// input order. Alternative `k` (1-based) is `alternatives()[k - 1]`.
///
/// Two compiled forms share that order. The alternation regex wraps every
/// sub-pattern in its own capture group and reports where matches are. The
/// regex set reports every alternative that matches a line in one pass,
/// including ones a leftmost-first alternation would mask by overlapping
/// text. An empty filter set compiles to nothing and matches nothing.
#[derive(Debug, Clone)]
pub struct CombinedMatcher {
    alternatives: Vec<Alternative>,
    compiled: Option<(Regex, RegexSet)>,
}

impl CombinedMatcher {
    pub fn build(entries: &[MatcherEntry]) -> Result<Self, AnalysisError> {
        let mut sorted: Vec<&MatcherEntry> = entries.iter().collect();
        // stable: equal priorities keep input order
        sorted.sort_by(|a, b| b.priority.cmp(&a.priority));

        if sorted.is_empty() {
            return Ok(Self::empty());
        }

        let mut alternatives = Vec::with_capacity(sorted.len());
        let mut branches = Vec::with_capacity(sorted.len());
        let mut set_sources = Vec::with_capacity(sorted.len());
        let mut group = 1;

        for (position, entry) in sorted.iter().enumerate() {
            let expression = entry.pattern.expression();
            let renamed = prefix_group_names(expression, &format!("a{}_", position + 1));
            branches.push(format!("({renamed})"));
            set_sources.push(expression.to_string());
            alternatives.push(Alternative {
                filter: entry.filter,
                excluded: entry.excluded,
                group,
            });
            group += 1 + entry.pattern.inner_group_count();
        }

        let combine_error = |e: regex::Error| AnalysisError::Combine {
            count: sorted.len(),
            reason: e.to_string(),
        };
        let alternation = RegexBuilder::new(&branches.join("|"))
            .multi_line(true)
            .build()
            .map_err(combine_error)?;
        let set = RegexSetBuilder::new(&set_sources)
            .multi_line(true)
            .build()
            .map_err(combine_error)?;

        Ok(Self {
            alternatives,
            compiled: Some((alternation, set)),
        })
    }

    /// Build from live filters, keeping the caller's order for ties
    pub fn from_filters<'a>(
        filters: impl IntoIterator<Item = &'a Filter>,
    ) -> Result<Self, AnalysisError> {
        let entries: Vec<MatcherEntry> = filters.into_iter().map(MatcherEntry::from_filter).collect();
        Self::build(&entries)
    }

    pub fn empty() -> Self {
        Self {
            alternatives: Vec::new(),
            compiled: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.alternatives.is_empty()
    }

    pub fn len(&self) -> usize {
        self.alternatives.len()
    }

    pub fn alternatives(&self) -> &[Alternative] {
        &self.alternatives
    }

    /// Look up a 1-based alternative position
    pub fn alternative(&self, position: usize) -> Option<&Alternative> {
        position
            .checked_sub(1)
            .and_then(|idx| self.alternatives.get(idx))
    }

    /// The combined alternation source, `None` for an empty matcher
    pub fn expression(&self) -> Option<&str> {
        self.compiled.as_ref().map(|(alternation, _)| alternation.as_str())
    }

    /// 1-based positions of every alternative matching somewhere in `line`, ascending
    pub fn matching_alternatives(&self, line: &str) -> Vec<usize> {
        match &self.compiled {
            Some((_, set)) => set.matches(line).into_iter().map(|idx| idx + 1).collect(),
            None => Vec::new(),
        }
    }

    /// Matched spans within one line, scanning left to right.
    ///
    /// Zero-length matches advance the scan by one character so every line
    /// terminates.
    pub fn spans(&self, line: &str) -> Vec<MatchSpan> {
        let Some((alternation, _)) = &self.compiled else {
            return Vec::new();
        };

        let mut locations = alternation.capture_locations();
        let mut spans = Vec::new();
        let mut pos = 0;

        while pos <= line.len() {
            let Some(found) = alternation.captures_read_at(&mut locations, line, pos) else {
                break;
            };
            if let Some(position) = self.participating_alternative(&locations) {
                spans.push(MatchSpan {
                    start: found.start(),
                    end: found.end(),
                    alternative: position,
                    filter: self.alternatives[position - 1].filter,
                });
            }

            pos = if found.end() > found.start() {
                found.end()
            } else {
                match line[found.end()..].chars().next() {
                    Some(c) => found.end() + c.len_utf8(),
                    None => break,
                }
            };
        }

        spans
    }

    fn participating_alternative(&self, locations: &CaptureLocations) -> Option<usize> {
        self.alternatives
            .iter()
            .position(|alt| locations.get(alt.group).is_some())
            .map(|idx| idx + 1)
    }
}

/// Prefix every named capture group in `expression` so names stay unique
/// once several patterns are joined.
fn prefix_group_names(expression: &str, prefix: &str) -> String {
    let mut out = String::with_capacity(expression.len() + prefix.len());
    let mut chars = expression.char_indices().peekable();
    let mut class_depth = 0usize;

    while let Some((idx, c)) = chars.next() {
        match c {
            '\\' => {
                out.push(c);
                if let Some((_, escaped)) = chars.next() {
                    out.push(escaped);
                }
            }
            '[' => {
                class_depth += 1;
                out.push(c);
                // a leading ']' (or '^]') is a literal inside the class
                if let Some(&(_, '^')) = chars.peek() {
                    out.push('^');
                    chars.next();
                }
                if let Some(&(_, ']')) = chars.peek() {
                    out.push(']');
                    chars.next();
                }
            }
            ']' if class_depth > 0 => {
                class_depth -= 1;
                out.push(c);
            }
            '(' if class_depth == 0 => {
                out.push(c);
                let rest = &expression[idx + 1..];
                let opener = if rest.starts_with("?P<") {
                    Some("?P<")
                } else if rest.starts_with("?<") && !rest.starts_with("?<=") && !rest.starts_with("?<!") {
                    Some("?<")
                } else {
                    None
                };
                if let Some(opener) = opener {
                    out.push_str(opener);
                    out.push_str(prefix);
                    for _ in 0..opener.len() {
                        chars.next();
                    }
                }
            }
            _ => out.push(c),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::PatternMode;

    fn entry(source: &str, mode: PatternMode, priority: u8, excluded: bool) -> MatcherEntry {
        MatcherEntry {
            filter: FilterId::new(),
            pattern: CompiledPattern::compile(source, mode, true).unwrap(),
            priority,
            excluded,
        }
    }

    #[test]
    fn test_sorted_by_descending_priority() {
        let low = entry("low", PatternMode::Text, 10, false);
        let high = entry("high", PatternMode::Text, 90, true);
        let matcher = CombinedMatcher::build(&[low.clone(), high.clone()]).unwrap();

        assert_eq!(matcher.alternative(1).unwrap().filter, high.filter);
        assert!(matcher.alternative(1).unwrap().excluded);
        assert_eq!(matcher.alternative(2).unwrap().filter, low.filter);
        assert_eq!(matcher.alternative(0), None);
        assert_eq!(matcher.alternative(3), None);
        assert_eq!(matcher.expression(), Some("(high)|(low)"));
    }

    #[test]
    fn test_ties_keep_input_order() {
        let first = entry("a", PatternMode::Text, 50, false);
        let second = entry("b", PatternMode::Text, 50, false);
        let third = entry("c", PatternMode::Text, 50, false);
        let matcher =
            CombinedMatcher::build(&[first.clone(), second.clone(), third.clone()]).unwrap();
        let order: Vec<FilterId> = matcher.alternatives().iter().map(|a| a.filter).collect();
        assert_eq!(order, vec![first.filter, second.filter, third.filter]);
    }

    #[test]
    fn test_empty_set_matches_nothing() {
        let matcher = CombinedMatcher::build(&[]).unwrap();
        assert!(matcher.is_empty());
        assert!(matcher.matching_alternatives("anything").is_empty());
        assert!(matcher.spans("anything").is_empty());
        assert_eq!(matcher.expression(), None);
    }

    #[test]
    fn test_inner_groups_do_not_shift_alternatives() {
        let grouped = entry(r"(a)(b)", PatternMode::Regex, 90, false);
        let plain = entry("zz", PatternMode::Text, 10, false);
        let matcher = CombinedMatcher::build(&[grouped, plain.clone()]).unwrap();

        assert_eq!(matcher.alternatives()[0].group, 1);
        assert_eq!(matcher.alternatives()[1].group, 4);

        let spans = matcher.spans("xx zz");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].filter, plain.filter);
        assert_eq!(spans[0].alternative, 2);
    }

    #[test]
    fn test_duplicate_group_names_across_filters() {
        let a = entry(r"(?P<code>\d+)", PatternMode::Regex, 50, false);
        let b = entry(r"id=(?<code>\w+)", PatternMode::Regex, 50, false);
        let matcher = CombinedMatcher::build(&[a, b]).unwrap();
        assert_eq!(matcher.matching_alternatives("id=x1"), vec![1, 2]);
    }

    #[test]
    fn test_verbose_pattern_with_comment_combines() {
        let verbose = entry("(?x) fatal \\s+ error  # severity\n", PatternMode::Regex, 90, false);
        let plain = entry("warn", PatternMode::Text, 10, false);
        let matcher = CombinedMatcher::build(&[verbose.clone(), plain.clone()]).unwrap();

        assert_eq!(matcher.matching_alternatives("fatal  error"), vec![1]);
        assert_eq!(matcher.matching_alternatives("warn"), vec![2]);
        let spans = matcher.spans("warn then fatal error");
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[1].filter, verbose.filter);
    }

    #[test]
    fn test_prefix_group_names_skips_escapes_and_classes() {
        assert_eq!(prefix_group_names(r"(?P<x>a)", "p_"), r"(?P<p_x>a)");
        assert_eq!(prefix_group_names(r"(?<x>a)", "p_"), r"(?<p_x>a)");
        assert_eq!(prefix_group_names(r"\(?P<x>", "p_"), r"\(?P<x>");
        assert_eq!(prefix_group_names(r"[(?P<]x", "p_"), r"[(?P<]x");
        assert_eq!(prefix_group_names(r"[](?<y>]", "p_"), r"[](?<y>]");
    }

    #[test]
    fn test_zero_length_matches_terminate() {
        let empty = entry(r"x*", PatternMode::Regex, 50, false);
        let matcher = CombinedMatcher::build(&[empty]).unwrap();
        let spans = matcher.spans("abc");
        assert_eq!(spans.len(), 4);
        assert!(spans.iter().all(|s| s.start == s.end));
    }

    #[test]
    fn test_zero_length_matches_respect_char_boundaries() {
        let empty = entry(r"x*", PatternMode::Regex, 50, false);
        let matcher = CombinedMatcher::build(&[empty]).unwrap();
        let starts: Vec<usize> = matcher.spans("h\u{e9}\u{e9}").iter().map(|s| s.start).collect();
        assert_eq!(starts, vec![0, 1, 3, 5]);
    }
}
