use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;

use crate::color::HueAllocator;
use crate::engine::EngineOptions;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub focus: FocusRules,
    pub colors: ColorRules,
    pub classifier: ClassifierRules,
}

impl AppConfig {
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            focus_respects_filtering_enabled: self.focus.respect_filtering_enabled,
        }
    }

    pub fn hue_allocator(&self) -> HueAllocator {
        HueAllocator::new(self.colors.min_hue_distance).with_start(self.colors.start_hue)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FocusRules {
    /// When true, switching filtering off also suppresses focus views
    pub respect_filtering_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorRules {
    /// Minimum angle between a new filter's hue and the previous one
    pub min_hue_distance: u16,
    pub start_hue: u16,
}

impl Default for ColorRules {
    fn default() -> Self {
        Self {
            min_hue_distance: 60,
            start_hue: 210,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierRules {
    /// Case sensitivity of filters created from the command line
    pub case_sensitive: bool,
}

impl Default for ClassifierRules {
    fn default() -> Self {
        Self {
            case_sensitive: true,
        }
    }
}

pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    if let Some(path) = path {
        load_config_from_path(path)
    } else {
        Ok(default_config().clone())
    }
}

pub fn load_config_from_path(path: &Path) -> Result<AppConfig, ConfigError> {
    let path_display = path.display().to_string();
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path_display.clone(),
        source,
    })?;

    toml::from_str::<AppConfig>(&raw).map_err(|source| ConfigError::Parse {
        path: path_display,
        source,
    })
}

pub fn default_config() -> &'static AppConfig {
    static DEFAULT_CONFIG: LazyLock<AppConfig> = LazyLock::new(AppConfig::default);
    &DEFAULT_CONFIG
}
