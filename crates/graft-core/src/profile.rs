use std::collections::BTreeMap;
use std::path::Path;

use graft_util::errors::GraftError;
use serde::{Deserialize, Serialize};

use crate::options::DepsOptions;
use crate::reference::PackageRef;

/// A resolution profile: settings and option values applied to the whole graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Profile {
    #[serde(default)]
    pub settings: BTreeMap<String, String>,

    /// `"pkg:option" = "value"` entries handed to the root as downstream values.
    #[serde(default)]
    pub options: DepsOptions,

    /// Build requirements injected into the root after the graph is loaded.
    #[serde(default)]
    pub build_requires: Vec<String>,

    #[serde(default)]
    pub build_requires_options: DepsOptions,
}

impl Profile {
    /// Load and parse a profile file.
    pub fn from_path(path: &Path) -> miette::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| GraftError::Config {
            message: format!("Failed to read profile {}: {e}", path.display()),
        })?;
        Self::from_str(&content).map_err(Into::into)
    }

    /// Parse a profile from a string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, GraftError> {
        toml::from_str(content).map_err(|e| GraftError::Config {
            message: format!("Failed to parse profile: {e}"),
        })
    }

    pub fn build_requires(&self) -> Result<Vec<PackageRef>, GraftError> {
        self.build_requires
            .iter()
            .map(|s| PackageRef::parse(s))
            .collect()
    }
}
