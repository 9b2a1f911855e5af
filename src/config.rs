//! Configuration management for the media monitor
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! environment variables, then command line flags (applied by the CLI).

use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use crate::core::ExtensionFilter;

/// Global configuration for the media monitor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Which files are tracked at all
    pub extensions: ExtensionsConfig,
    /// Drop directory whose finished files get organized
    pub organize: OrganizeConfig,
    /// Library directories mirrored into the store
    pub store: StoreConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtensionsConfig {
    /// Supported extensions, without the leading dot
    pub supported: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizeConfig {
    pub path: Option<PathBuf>,
    /// Channel organize events are published on
    pub channel: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub paths: Vec<PathBuf>,
    /// Channel new/delete events are published on
    pub channel: String,
}

impl Default for ExtensionsConfig {
    fn default() -> Self {
        Self {
            supported: vec!["mp3".to_string(), "ogg".to_string()],
        }
    }
}

impl Default for OrganizeConfig {
    fn default() -> Self {
        Self {
            path: None,
            channel: "organize".to_string(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            channel: "store".to_string(),
        }
    }
}

impl ExtensionsConfig {
    pub fn filter(&self) -> ExtensionFilter {
        ExtensionFilter::new(&self.supported)
    }
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}

impl MonitorConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load from `path` if given, otherwise start from defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Override values with environment variables if present
    pub fn apply_env(&mut self) {
        self.apply_vars(|key| std::env::var(key).ok());
    }

    fn apply_vars<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = var("MEDIA_MONITOR_EXTENSIONS") {
            self.extensions.supported = split_list(&val).map(str::to_string).collect();
        }

        if let Some(val) = var("MEDIA_MONITOR_ORGANIZE_DIR") {
            self.organize.path = Some(PathBuf::from(val));
        }

        if let Some(val) = var("MEDIA_MONITOR_STORE_DIRS") {
            self.store.paths = split_list(&val).map(PathBuf::from).collect();
        }

        if let Some(val) = var("MEDIA_MONITOR_ORGANIZE_CHANNEL") {
            self.organize.channel = val;
        }

        if let Some(val) = var("MEDIA_MONITOR_STORE_CHANNEL") {
            self.store.channel = val;
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.organize.path.is_none() && self.store.paths.is_empty() {
            return Err("No directories to watch: set an organize or store path".to_string());
        }

        if self.organize.channel.trim().is_empty() {
            return Err("organize channel must not be empty".to_string());
        }

        if self.store.channel.trim().is_empty() {
            return Err("store channel must not be empty".to_string());
        }

        for path in self.organize.path.iter().chain(&self.store.paths) {
            if !path.is_dir() {
                return Err(format!("Not a directory: {}", path.display()));
            }
        }

        if self.extensions.filter().is_empty() {
            tracing::warn!("No supported extensions configured, every file will be ignored");
        }

        Ok(())
    }
}
