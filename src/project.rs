//! Projects own filters and groups.
//!
//! The project is the authoritative store: a filter that is not in
//! `filters` does not exist, whatever a group's member set says. Every change
//! that can alter a classification bumps `revision`, which the analysis
//! service uses to drop results computed against an older filter set.

use crate::color::HueAllocator;
use crate::decoration::DecorationHost;
use crate::engine::classifier::{Classification, from_ranked_lines};
use crate::filter::{
    Disposition, Filter, FilterError, FilterId, FilterSpec, Group, GroupId, GroupSpec, PatternMode,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("Filter '{0}' already exists")]
    DuplicateFilter(FilterId),

    #[error("Unknown filter '{0}'")]
    UnknownFilter(FilterId),

    #[error("Group '{0}' already exists")]
    DuplicateGroup(GroupId),

    #[error("Unknown group '{0}'")]
    UnknownGroup(GroupId),
}

/// Plain attributes of a project, as exchanged with persistence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSpec {
    pub name: String,
    #[serde(default = "default_enabled")]
    pub filtering_enabled: bool,
    #[serde(default)]
    pub groups: Vec<GroupSpec>,
    #[serde(default)]
    pub filters: Vec<FilterSpec>,
}

fn default_enabled() -> bool {
    true
}

/// A set of changes to apply to one filter. Unset fields are left alone.
#[derive(Debug, Clone, Default)]
pub struct FilterEdit {
    pub name: Option<String>,
    pub pattern: Option<(String, PatternMode, bool)>,
    pub priority: Option<i64>,
    pub disposition: Option<Disposition>,
    pub highlight_enabled: Option<bool>,
    pub hue: Option<u16>,
}

impl FilterEdit {
    pub fn pattern(source: &str, mode: PatternMode) -> Self {
        Self {
            pattern: Some((source.to_string(), mode, true)),
            ..Self::default()
        }
    }

    pub fn priority(priority: i64) -> Self {
        Self {
            priority: Some(priority),
            ..Self::default()
        }
    }

    pub fn disposition(disposition: Disposition) -> Self {
        Self {
            disposition: Some(disposition),
            ..Self::default()
        }
    }

    pub fn highlight(enabled: bool) -> Self {
        Self {
            highlight_enabled: Some(enabled),
            ..Self::default()
        }
    }
}

/// Changes to a group's defaults, propagated to its current members
#[derive(Debug, Clone, Default)]
pub struct GroupEdit {
    pub name: Option<String>,
    pub priority: Option<i64>,
    pub disposition: Option<Disposition>,
    pub highlight_enabled: Option<bool>,
}

#[derive(Debug)]
pub struct Project {
    name: String,
    filters: Vec<Filter>,
    groups: Vec<Group>,
    filtering_enabled: bool,
    revision: u64,
    hues: HueAllocator,
}

impl Project {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            filters: Vec::new(),
            groups: Vec::new(),
            filtering_enabled: true,
            revision: 0,
            hues: HueAllocator::default(),
        }
    }

    pub fn with_hue_allocator(mut self, hues: HueAllocator) -> Self {
        self.hues = hues;
        self
    }

    /// Build a project from plain attributes. Group memberships are rebuilt
    /// from each filter's `group_id`; references to unknown groups are dropped.
    /// Filters stored without a hue get one from `hues`.
    pub fn from_spec(spec: &ProjectSpec, hues: HueAllocator) -> Result<Self, ProjectError> {
        let mut project = Self::new(&spec.name).with_hue_allocator(hues);
        project.filtering_enabled = spec.filtering_enabled;

        for group in &spec.groups {
            if project.group(group.id).is_some() {
                return Err(ProjectError::DuplicateGroup(group.id));
            }
            project.groups.push(Group::from_spec(group));
        }

        for filter_spec in &spec.filters {
            let mut filter_spec = filter_spec.clone();
            if let Some(group_id) = filter_spec.group_id
                && project.group(group_id).is_none()
            {
                tracing::warn!(filter = %filter_spec.id, group = %group_id, "dropping reference to unknown group");
                filter_spec.group_id = None;
            }
            project.insert_filter(filter_spec)?;
        }

        Ok(project)
    }

    pub fn to_spec(&self) -> ProjectSpec {
        ProjectSpec {
            name: self.name.clone(),
            filtering_enabled: self.filtering_enabled,
            groups: self.groups.iter().map(Group::to_spec).collect(),
            filters: self.filters.iter().map(Filter::to_spec).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    /// Filters in project order, which breaks priority ties
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn filter(&self, id: FilterId) -> Option<&Filter> {
        self.filters.iter().find(|f| f.id() == id)
    }

    fn filter_mut(&mut self, id: FilterId) -> Result<&mut Filter, ProjectError> {
        self.filters
            .iter_mut()
            .find(|f| f.id() == id)
            .ok_or(ProjectError::UnknownFilter(id))
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.groups.iter().find(|g| g.id() == id)
    }

    fn group_mut(&mut self, id: GroupId) -> Result<&mut Group, ProjectError> {
        self.groups
            .iter_mut()
            .find(|g| g.id() == id)
            .ok_or(ProjectError::UnknownGroup(id))
    }

    /// Member filters of a group that actually exist, in project order
    pub fn group_filters(&self, id: GroupId) -> Vec<&Filter> {
        match self.group(id) {
            Some(group) => self
                .filters
                .iter()
                .filter(|f| group.contains(f.id()))
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn filtering_enabled(&self) -> bool {
        self.filtering_enabled
    }

    pub fn set_filtering_enabled(&mut self, enabled: bool) {
        if self.filtering_enabled != enabled {
            self.filtering_enabled = enabled;
            self.revision += 1;
        }
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Filters that take part in highlighting
    pub fn highlight_filters(&self) -> impl Iterator<Item = &Filter> {
        self.filters.iter().filter(|f| f.highlight_enabled())
    }

    /// Filters that take part in focus views
    pub fn focus_filters(&self) -> impl Iterator<Item = &Filter> {
        self.filters
            .iter()
            .filter(|f| f.disposition() != Disposition::None)
    }

    fn insert_filter(&mut self, mut spec: FilterSpec) -> Result<FilterId, ProjectError> {
        if self.filter(spec.id).is_some() {
            return Err(ProjectError::DuplicateFilter(spec.id));
        }
        if spec.hue.is_none() {
            let assigned: Vec<u16> = self.filters.iter().map(Filter::hue).collect();
            spec.hue = Some(self.hues.allocate(&assigned));
        }

        let filter = Filter::from_spec(&spec)?;
        let id = filter.id();
        if let Some(group_id) = filter.group_id() {
            self.group_mut(group_id)?.insert(id);
        }
        self.filters.push(filter);
        self.revision += 1;
        Ok(id)
    }

    /// Add a filter and install its decoration. A spec without a hue gets one
    /// from the project's allocator.
    pub fn add_filter(
        &mut self,
        spec: FilterSpec,
        host: &mut dyn DecorationHost,
    ) -> Result<FilterId, ProjectError> {
        let id = self.insert_filter(spec)?;
        self.filter_mut(id)?.refresh_decoration(host);
        tracing::debug!(filter = %id, revision = self.revision, "filter added");
        Ok(id)
    }

    /// Add a filter to a group, seeding it with the group's defaults
    pub fn add_filter_to_group(
        &mut self,
        group_id: GroupId,
        mut spec: FilterSpec,
        host: &mut dyn DecorationHost,
    ) -> Result<FilterId, ProjectError> {
        let group = self.group(group_id).ok_or(ProjectError::UnknownGroup(group_id))?;
        group.apply_defaults(&mut spec);
        self.add_filter(spec, host)
    }

    /// Move an existing filter into a group (or out of any group with `None`)
    pub fn set_filter_group(
        &mut self,
        id: FilterId,
        group_id: Option<GroupId>,
    ) -> Result<(), ProjectError> {
        if self.filter(id).is_none() {
            return Err(ProjectError::UnknownFilter(id));
        }
        if let Some(group_id) = group_id {
            self.group_mut(group_id)?.insert(id);
        }
        let filter = self.filter_mut(id)?;
        let previous = filter.group_id();
        filter.set_group(group_id);
        if let Some(previous) = previous.filter(|&p| Some(p) != group_id) {
            if let Ok(group) = self.group_mut(previous) {
                group.remove(id);
            }
        }
        Ok(())
    }

    /// Apply an edit. Invalid patterns are rejected before anything changes.
    ///
    /// Returns whether any classification-relevant property changed.
    pub fn update_filter(
        &mut self,
        id: FilterId,
        edit: FilterEdit,
        host: &mut dyn DecorationHost,
    ) -> Result<bool, ProjectError> {
        let filter = self.filter_mut(id)?;
        let style_before = filter.decoration_style();
        let mut changed = false;

        if let Some((source, mode, case_sensitive)) = &edit.pattern {
            changed |= filter.set_pattern(source, *mode, *case_sensitive)?;
        }
        if let Some(name) = &edit.name {
            filter.set_name(name);
        }
        if let Some(priority) = edit.priority {
            changed |= filter.set_priority(priority);
        }
        if let Some(disposition) = edit.disposition {
            changed |= filter.set_disposition(disposition);
        }
        if let Some(enabled) = edit.highlight_enabled {
            changed |= filter.set_highlight_enabled(enabled);
        }
        if let Some(hue) = edit.hue {
            filter.set_hue(hue);
        }

        if filter.decoration_style() != style_before {
            filter.refresh_decoration(host);
        }
        if changed {
            self.revision += 1;
            tracing::debug!(filter = %id, revision = self.revision, "filter changed");
        }
        Ok(changed)
    }

    /// Delete a filter, its group membership and its decoration
    pub fn remove_filter(
        &mut self,
        id: FilterId,
        host: &mut dyn DecorationHost,
    ) -> Result<FilterSpec, ProjectError> {
        let idx = self
            .filters
            .iter()
            .position(|f| f.id() == id)
            .ok_or(ProjectError::UnknownFilter(id))?;
        let mut filter = self.filters.remove(idx);
        filter.release_decoration(host);
        for group in &mut self.groups {
            group.remove(id);
        }
        self.revision += 1;
        Ok(filter.to_spec())
    }

    pub fn add_group(&mut self, spec: GroupSpec) -> Result<GroupId, ProjectError> {
        if self.group(spec.id).is_some() {
            return Err(ProjectError::DuplicateGroup(spec.id));
        }
        let group = Group::from_spec(&spec);
        let id = group.id();
        self.groups.push(group);
        Ok(id)
    }

    /// Change a group's defaults and push them to the current members
    pub fn update_group(
        &mut self,
        id: GroupId,
        edit: GroupEdit,
        host: &mut dyn DecorationHost,
    ) -> Result<(), ProjectError> {
        let group = self.group_mut(id)?;
        if let Some(name) = &edit.name {
            group.name = name.clone();
        }
        if let Some(priority) = edit.priority {
            group.set_priority(priority);
        }
        if let Some(disposition) = edit.disposition {
            group.disposition = disposition;
        }
        if let Some(enabled) = edit.highlight_enabled {
            group.highlight_enabled = enabled;
        }
        let members: Vec<FilterId> = group.members().iter().copied().collect();

        let member_edit = FilterEdit {
            priority: edit.priority,
            disposition: edit.disposition,
            highlight_enabled: edit.highlight_enabled,
            ..FilterEdit::default()
        };
        for member in members {
            match self.update_filter(member, member_edit.clone(), host) {
                Ok(_) => {}
                // membership pointing at a deleted filter
                Err(ProjectError::UnknownFilter(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Delete a group together with its member filters
    pub fn remove_group(
        &mut self,
        id: GroupId,
        host: &mut dyn DecorationHost,
    ) -> Result<Vec<FilterSpec>, ProjectError> {
        let idx = self
            .groups
            .iter()
            .position(|g| g.id() == id)
            .ok_or(ProjectError::UnknownGroup(id))?;
        let group = self.groups.remove(idx);

        let mut removed = Vec::new();
        for member in group.members() {
            match self.remove_filter(*member, host) {
                Ok(spec) => removed.push(spec),
                Err(ProjectError::UnknownFilter(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(removed)
    }

    /// Install decorations for every filter, e.g. after loading
    pub fn install_decorations(&mut self, host: &mut dyn DecorationHost) {
        for filter in &mut self.filters {
            filter.refresh_decoration(host);
        }
    }

    pub fn release_decorations(&mut self, host: &mut dyn DecorationHost) {
        for filter in &mut self.filters {
            filter.release_decoration(host);
        }
    }

    /// Make `next` the active project, releasing this project's decorations
    /// first. Returns the previous project.
    pub fn switch_to(&mut self, next: Project, host: &mut dyn DecorationHost) -> Project {
        self.release_decorations(host);
        let mut previous = std::mem::replace(self, next);
        self.revision = self.revision.max(previous.revision) + 1;
        previous.filters.iter_mut().for_each(|f| f.cache_mut().clear());
        self.install_decorations(host);
        previous
    }

    /// Forget cached results for one document, after its text changed
    pub fn clear_document(&mut self, document: &str) {
        for filter in &mut self.filters {
            filter.cache_mut().clear_document(document);
        }
    }

    /// Write one classification pass into the filters' caches.
    ///
    /// The pass is discarded if the project changed since `revision`. Entries
    /// naming filters that no longer exist are skipped.
    pub fn publish(
        &mut self,
        document: &str,
        revision: u64,
        classification: Classification,
    ) -> bool {
        if revision != self.revision {
            tracing::debug!(
                document,
                pass_revision = revision,
                current = self.revision,
                "discarding stale classification"
            );
            return false;
        }

        for (id, lines) in classification.into_matched_lines() {
            match self.filters.iter_mut().find(|f| f.id() == id) {
                Some(filter) => filter.cache_mut().update(document, lines),
                None => tracing::debug!(filter = %id, "ignoring result for unknown filter"),
            }
        }
        true
    }

    /// Rebuild the classification of `document` for the selected filters from
    /// their caches. `None` if any of them has not analyzed the document.
    pub fn cached_classification<'a>(
        &'a self,
        document: &str,
        line_count: usize,
        filters: impl IntoIterator<Item = &'a Filter>,
    ) -> Option<Classification> {
        let mut ranked: Vec<&Filter> = filters.into_iter().collect();
        ranked.sort_by(|a, b| b.priority().cmp(&a.priority()));

        let mut lines = Vec::with_capacity(ranked.len());
        for filter in ranked {
            let cached: &BTreeSet<usize> = filter.cache().lines(document)?;
            lines.push((filter.id(), cached.clone()));
        }
        Some(from_ranked_lines(line_count, lines))
    }
}
