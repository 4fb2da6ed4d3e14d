use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while analyzing a document
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Failed to combine {count} patterns: {reason}")]
    Combine { count: usize, reason: String },

    #[error("Failed to read document '{path}': {source}")]
    Document {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Filters kept changing while analyzing '{document}'")]
    Contended { document: String },

    #[error("Filtering is disabled for this project")]
    FilteringDisabled,

    #[error("Project lock poisoned")]
    Poisoned,
}
