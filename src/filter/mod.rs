//! Filters: named patterns with a priority, a focus-view disposition and a
//! per-document result cache.
//!
//! # Pattern modes
//!
//! ```text
//! text     literal substring match, metacharacters escaped ("a.b*c" matches only "a.b*c")
//! regex    regular expression compiled as written
//! ```
//!
//! # Dispositions
//!
//! ```text
//! included   matching lines are shown in the focus view
//! excluded   matching lines are hidden from the focus view (always wins)
//! none       no effect on the focus view, highlighting only
//! ```

pub mod cache;
pub mod entities;
pub mod error;
pub mod pattern;

pub use cache::ResultCache;
pub use entities::{
    DEFAULT_PRIORITY, Disposition, Filter, FilterId, FilterSpec, Group, GroupId, GroupSpec,
    MAX_PRIORITY, MIN_PRIORITY, clamp_priority,
};
pub use error::FilterError;
pub use pattern::{CompiledPattern, PatternMode};
