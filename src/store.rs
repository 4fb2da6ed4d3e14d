//! Export and import of project definitions.
//!
//! Only plain attributes travel: caches, compiled matchers and decorations
//! are rebuilt after import. Exports are pretty JSON; imports accept JSON5
//! so hand-edited files may carry comments and trailing commas.

use crate::color::HueAllocator;
use crate::project::{Project, ProjectError, ProjectSpec};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to read project file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write project file '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse project definition: {0}")]
    Parse(String),
    #[error("Failed to serialize project: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Invalid project definition: {0}")]
    Project(#[from] ProjectError),
}

pub fn export_project(project: &Project) -> Result<String, StoreError> {
    Ok(serde_json::to_string_pretty(&project.to_spec())?)
}

/// Parse a project definition. Filters without a stored hue are colored by `hues`.
pub fn import_project(raw: &str, hues: HueAllocator) -> Result<Project, StoreError> {
    let spec: ProjectSpec =
        json5::from_str(raw).map_err(|e| StoreError::Parse(e.to_string()))?;
    Ok(Project::from_spec(&spec, hues)?)
}

pub fn load_project(path: &Path, hues: HueAllocator) -> Result<Project, StoreError> {
    let raw = fs::read_to_string(path).map_err(|source| StoreError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let project = import_project(&raw, hues)?;
    tracing::debug!(
        path = %path.display(),
        filters = project.filters().len(),
        groups = project.groups().len(),
        "loaded project"
    );
    Ok(project)
}

pub fn save_project(path: &Path, project: &Project) -> Result<(), StoreError> {
    let mut raw = export_project(project)?;
    raw.push('\n');
    fs::write(path, raw).map_err(|source| StoreError::Write {
        path: path.display().to_string(),
        source,
    })
}
