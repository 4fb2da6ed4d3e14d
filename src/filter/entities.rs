use super::cache::ResultCache;
use super::error::FilterError;
use super::pattern::{CompiledPattern, PatternMode};
use crate::color::highlight_color;
use crate::decoration::{DecorationHandle, DecorationHost, DecorationStyle};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub const MIN_PRIORITY: u8 = 0;
pub const MAX_PRIORITY: u8 = 100;
pub const DEFAULT_PRIORITY: u8 = 50;

/// Opaque, stable identity of a filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterId(Uuid);

impl FilterId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for FilterId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FilterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Opaque, stable identity of a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(Uuid);

impl GroupId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for GroupId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Effect of a filter on the focus view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Disposition {
    /// Matching lines are shown
    #[default]
    Included,
    /// Matching lines are hidden, even if an included filter matched them
    Excluded,
    /// No effect on the focus view
    None,
}

impl FromStr for Disposition {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "included" | "include" | "show" => Ok(Disposition::Included),
            "excluded" | "exclude" | "hide" => Ok(Disposition::Excluded),
            "none" | "ignore" => Ok(Disposition::None),
            _ => Err(FilterError::UnknownDisposition(s.to_string())),
        }
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Disposition::Included => write!(f, "included"),
            Disposition::Excluded => write!(f, "excluded"),
            Disposition::None => write!(f, "none"),
        }
    }
}

pub fn clamp_priority(priority: i64) -> u8 {
    priority.clamp(i64::from(MIN_PRIORITY), i64::from(MAX_PRIORITY)) as u8
}

/// Plain attributes of a filter, as exchanged with persistence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    #[serde(default)]
    pub id: FilterId,
    #[serde(default)]
    pub name: String,
    pub pattern: String,
    #[serde(default)]
    pub mode: PatternMode,
    #[serde(default = "default_true")]
    pub case_sensitive: bool,
    #[serde(default = "default_priority")]
    pub priority: i64,
    #[serde(default)]
    pub disposition: Disposition,
    #[serde(default = "default_true")]
    pub highlight_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<GroupId>,
    /// Left empty for new filters; the project assigns one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hue: Option<u16>,
}

fn default_true() -> bool {
    true
}

fn default_priority() -> i64 {
    i64::from(DEFAULT_PRIORITY)
}

impl FilterSpec {
    /// A text-mode spec with default settings
    pub fn text(pattern: &str) -> Self {
        Self {
            id: FilterId::new(),
            name: pattern.to_string(),
            pattern: pattern.to_string(),
            mode: PatternMode::Text,
            case_sensitive: true,
            priority: default_priority(),
            disposition: Disposition::default(),
            highlight_enabled: true,
            group_id: None,
            hue: None,
        }
    }

    /// A regex-mode spec with default settings
    pub fn regex(pattern: &str) -> Self {
        Self {
            mode: PatternMode::Regex,
            ..Self::text(pattern)
        }
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_disposition(mut self, disposition: Disposition) -> Self {
        self.disposition = disposition;
        self
    }

    pub fn with_highlight(mut self, enabled: bool) -> Self {
        self.highlight_enabled = enabled;
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_hue(mut self, hue: u16) -> Self {
        self.hue = Some(hue);
        self
    }

    pub fn case_insensitive(mut self) -> Self {
        self.case_sensitive = false;
        self
    }
}

/// A named pattern rule with its own priority, disposition and result cache
#[derive(Debug)]
pub struct Filter {
    id: FilterId,
    name: String,
    pattern: CompiledPattern,
    priority: u8,
    disposition: Disposition,
    highlight_enabled: bool,
    group_id: Option<GroupId>,
    hue: u16,
    decoration: Option<DecorationHandle>,
    cache: ResultCache,
}

impl Filter {
    pub fn from_spec(spec: &FilterSpec) -> Result<Self, FilterError> {
        let pattern = CompiledPattern::compile(&spec.pattern, spec.mode, spec.case_sensitive)?;
        Ok(Self {
            id: spec.id,
            name: if spec.name.is_empty() {
                spec.pattern.clone()
            } else {
                spec.name.clone()
            },
            pattern,
            priority: clamp_priority(spec.priority),
            disposition: spec.disposition,
            highlight_enabled: spec.highlight_enabled,
            group_id: spec.group_id,
            hue: spec.hue.unwrap_or(0) % 360,
            decoration: None,
            cache: ResultCache::new(),
        })
    }

    pub fn to_spec(&self) -> FilterSpec {
        FilterSpec {
            id: self.id,
            name: self.name.clone(),
            pattern: self.pattern.source().to_string(),
            mode: self.pattern.mode(),
            case_sensitive: self.pattern.case_sensitive(),
            priority: i64::from(self.priority),
            disposition: self.disposition,
            highlight_enabled: self.highlight_enabled,
            group_id: self.group_id,
            hue: Some(self.hue),
        }
    }

    pub fn id(&self) -> FilterId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &CompiledPattern {
        &self.pattern
    }

    pub fn priority(&self) -> u8 {
        self.priority
    }

    pub fn disposition(&self) -> Disposition {
        self.disposition
    }

    pub fn is_excluded(&self) -> bool {
        self.disposition == Disposition::Excluded
    }

    pub fn highlight_enabled(&self) -> bool {
        self.highlight_enabled
    }

    pub fn group_id(&self) -> Option<GroupId> {
        self.group_id
    }

    pub fn hue(&self) -> u16 {
        self.hue
    }

    pub fn decoration(&self) -> Option<DecorationHandle> {
        self.decoration
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut ResultCache {
        &mut self.cache
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    /// Replace the pattern. On a compile error the current pattern is kept.
    pub fn set_pattern(
        &mut self,
        source: &str,
        mode: PatternMode,
        case_sensitive: bool,
    ) -> Result<bool, FilterError> {
        let pattern = CompiledPattern::compile(source, mode, case_sensitive)?;
        if pattern == self.pattern {
            return Ok(false);
        }
        self.pattern = pattern;
        self.cache.clear();
        Ok(true)
    }

    /// Returns whether the stored priority changed after clamping
    pub fn set_priority(&mut self, priority: i64) -> bool {
        let priority = clamp_priority(priority);
        if priority == self.priority {
            return false;
        }
        self.priority = priority;
        self.cache.clear();
        true
    }

    pub fn set_disposition(&mut self, disposition: Disposition) -> bool {
        if disposition == self.disposition {
            return false;
        }
        self.disposition = disposition;
        self.cache.clear();
        true
    }

    pub fn set_highlight_enabled(&mut self, enabled: bool) -> bool {
        if enabled == self.highlight_enabled {
            return false;
        }
        self.highlight_enabled = enabled;
        self.cache.clear();
        true
    }

    pub fn set_hue(&mut self, hue: u16) {
        self.hue = hue % 360;
    }

    pub(crate) fn set_group(&mut self, group_id: Option<GroupId>) {
        self.group_id = group_id;
    }

    /// Rendering descriptor for the current properties, `None` when not highlighted
    pub fn decoration_style(&self) -> Option<DecorationStyle> {
        self.highlight_enabled.then(|| DecorationStyle {
            hue: self.hue,
            background: highlight_color(self.hue),
            strikethrough: self.is_excluded(),
        })
    }

    /// Release the current decoration (if any) and install one matching the
    /// current properties.
    pub fn refresh_decoration(&mut self, host: &mut dyn DecorationHost) {
        self.release_decoration(host);
        self.decoration = self.decoration_style().map(|style| host.create(&style));
    }

    pub fn release_decoration(&mut self, host: &mut dyn DecorationHost) {
        if let Some(handle) = self.decoration.take() {
            host.release(handle);
        }
    }
}

/// Plain attributes of a group, as exchanged with persistence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSpec {
    #[serde(default)]
    pub id: GroupId,
    pub name: String,
    #[serde(default = "default_priority")]
    pub priority: i64,
    #[serde(default)]
    pub disposition: Disposition,
    #[serde(default = "default_true")]
    pub highlight_enabled: bool,
}

impl GroupSpec {
    pub fn named(name: &str) -> Self {
        Self {
            id: GroupId::new(),
            name: name.to_string(),
            priority: default_priority(),
            disposition: Disposition::default(),
            highlight_enabled: true,
        }
    }
}

/// An organizational container. Does not own its members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    id: GroupId,
    pub name: String,
    priority: u8,
    pub disposition: Disposition,
    pub highlight_enabled: bool,
    members: BTreeSet<FilterId>,
}

impl Group {
    pub fn from_spec(spec: &GroupSpec) -> Self {
        Self {
            id: spec.id,
            name: spec.name.clone(),
            priority: clamp_priority(spec.priority),
            disposition: spec.disposition,
            highlight_enabled: spec.highlight_enabled,
            members: BTreeSet::new(),
        }
    }

    pub fn to_spec(&self) -> GroupSpec {
        GroupSpec {
            id: self.id,
            name: self.name.clone(),
            priority: i64::from(self.priority),
            disposition: self.disposition,
            highlight_enabled: self.highlight_enabled,
        }
    }

    pub fn id(&self) -> GroupId {
        self.id
    }

    pub fn priority(&self) -> u8 {
        self.priority
    }

    pub fn set_priority(&mut self, priority: i64) {
        self.priority = clamp_priority(priority);
    }

    pub fn members(&self) -> &BTreeSet<FilterId> {
        &self.members
    }

    pub fn contains(&self, filter: FilterId) -> bool {
        self.members.contains(&filter)
    }

    pub(crate) fn insert(&mut self, filter: FilterId) -> bool {
        self.members.insert(filter)
    }

    pub(crate) fn remove(&mut self, filter: FilterId) -> bool {
        self.members.remove(&filter)
    }

    /// Fill a new member's spec with this group's defaults
    pub fn apply_defaults(&self, spec: &mut FilterSpec) {
        spec.priority = i64::from(self.priority);
        spec.disposition = self.disposition;
        spec.highlight_enabled = self.highlight_enabled;
        spec.group_id = Some(self.id);
    }
}
