//! Multi-pattern line classification.
//!
//! All eligible filters are merged into one [`CombinedMatcher`] and every line
//! of a document is classified against it in a single scan. The
//! [`AnalysisService`] caches results per document so highlighting and focus
//! views share one pass.

pub mod classifier;
pub mod combiner;
pub mod error;
pub mod service;

pub use classifier::{
    Classification, classify, classify_line_ranges, from_ranked_lines, line_count, split_lines,
};
pub use combiner::{Alternative, CombinedMatcher, MatchSpan, MatcherEntry};
pub use error::AnalysisError;
pub use service::{AnalysisService, EngineOptions};
