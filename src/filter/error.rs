use thiserror::Error;

/// Errors raised while creating or editing a filter
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("Invalid pattern '{source_text}': {reason}")]
    InvalidPattern { source_text: String, reason: String },

    #[error("Empty pattern")]
    EmptyPattern,

    #[error("Unknown pattern mode: '{0}'. Valid modes are: text, regex")]
    UnknownMode(String),

    #[error("Unknown display disposition: '{0}'. Valid values are: included, excluded, none")]
    UnknownDisposition(String),
}
