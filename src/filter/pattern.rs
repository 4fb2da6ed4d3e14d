use super::error::FilterError;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a filter's source text is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternMode {
    /// Literal substring match; every metacharacter is escaped
    #[default]
    Text,
    /// Regular expression compiled as written
    Regex,
}

impl FromStr for PatternMode {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "literal" | "t" => Ok(PatternMode::Text),
            "regex" | "re" | "r" => Ok(PatternMode::Regex),
            _ => Err(FilterError::UnknownMode(s.to_string())),
        }
    }
}

impl fmt::Display for PatternMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternMode::Text => write!(f, "text"),
            PatternMode::Regex => write!(f, "regex"),
        }
    }
}

/// A single compiled matcher plus the source it came from.
///
/// `expression` is the regex source actually fed to the combiner. For text
/// mode it is the escaped literal, for regex mode the user source. When the
/// pattern is case-insensitive the flag is baked in as an inline group so it
/// survives concatenation with other patterns. The pattern is validated in
/// its embedded form `(?:expression)`.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    source: String,
    mode: PatternMode,
    case_sensitive: bool,
    expression: String,
    regex: Regex,
}

impl CompiledPattern {
    pub fn compile(
        source: &str,
        mode: PatternMode,
        case_sensitive: bool,
    ) -> Result<Self, FilterError> {
        if source.is_empty() {
            return Err(FilterError::EmptyPattern);
        }

        let body = match mode {
            PatternMode::Text => regex::escape(source),
            PatternMode::Regex => source.to_string(),
        };
        let expression = if case_sensitive {
            body
        } else {
            format!("(?i:{body})")
        };

        // compiled exactly as the combiner embeds it, so a pattern that only
        // parses at the top level (a trailing `(?x)` comment eating the closing
        // paren) is rejected here instead of breaking every combined matcher
        let regex = RegexBuilder::new(&format!("(?:{expression})"))
            .multi_line(true)
            .build()
            .map_err(|e| FilterError::InvalidPattern {
                source_text: source.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            source: source.to_string(),
            mode,
            case_sensitive,
            expression,
            regex,
        })
    }

    /// The text the user typed, unescaped
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn mode(&self) -> PatternMode {
        self.mode
    }

    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Regex source ready to be embedded in a combined alternation
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Number of capture groups inside this pattern, excluding the implicit group 0
    pub fn inner_group_count(&self) -> usize {
        self.regex.captures_len() - 1
    }

    pub fn is_match(&self, line: &str) -> bool {
        self.regex.is_match(line)
    }
}

impl PartialEq for CompiledPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
            && self.mode == other.mode
            && self.case_sensitive == other.case_sensitive
    }
}

impl Eq for CompiledPattern {}
