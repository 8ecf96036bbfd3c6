use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use graft_util::errors::GraftError;

use crate::reference::PackageRef;

/// Global user configuration loaded from `~/.graft/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GlobalConfig {
    /// Remotes in priority order, from `[[remote]]`.
    #[serde(default, rename = "remote")]
    pub remotes: Vec<Remote>,

    #[serde(default)]
    pub resolve: ResolveConfig,

    /// References served from a local working copy instead of the cache.
    #[serde(default)]
    pub editables: Vec<String>,
}

/// A named recipe remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remote {
    pub name: String,
    pub url: String,
}

/// Resolution settings from `[resolve]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ResolveConfig {
    #[serde(default)]
    pub check_updates: bool,
    #[serde(default)]
    pub update: bool,
}

impl GlobalConfig {
    /// Load the global configuration, or return defaults if the file doesn't exist.
    pub fn load() -> miette::Result<Self> {
        Self::load_from(&Self::default_path())
    }

    pub fn load_from(path: &Path) -> miette::Result<Self> {
        if !path.is_file() {
            tracing::debug!("no global config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| GraftError::Config {
            message: format!("Failed to read global config: {e}"),
        })?;
        Self::from_str(&content).map_err(Into::into)
    }

    /// Parse a configuration from a string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, GraftError> {
        toml::from_str(content).map_err(|e| GraftError::Config {
            message: format!("Failed to parse global config: {e}"),
        })
    }

    /// Returns the default path to the global config file.
    pub fn default_path() -> PathBuf {
        dirs_path().join("config.toml")
    }

    pub fn editable_refs(&self) -> Result<Vec<PackageRef>, GraftError> {
        self.editables.iter().map(|s| PackageRef::parse(s)).collect()
    }
}

/// Returns the graft data directory: `$GRAFT_HOME`, else `~/.graft/`.
pub fn dirs_path() -> PathBuf {
    if let Ok(home) = std::env::var("GRAFT_HOME") {
        return PathBuf::from(home);
    }
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    Path::new(&home).join(".graft")
}
