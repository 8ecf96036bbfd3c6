//! The declarative recipe file format (`*.toml`).
//!
//! ```toml
//! requires = ["zlib/[>=1.2 <2]"]
//!
//! [package]
//! name = "app"
//! version = "1.0"
//!
//! [[requirement]]
//! ref = "gtest/1.10"
//! private = true
//!
//! [options]
//! shared = ["True", "False"]
//!
//! [default-options]
//! shared = "False"
//! "zlib:shared" = "True"
//!
//! [[conditional]]
//! option = "shared"
//! value = "True"
//! requires = ["openssl/1.1.1"]
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use graft_util::errors::GraftError;
use graft_util::fs::read_text;
use serde::{Deserialize, Serialize};

use crate::options::DepsOptions;
use crate::reference::PackageRef;
use crate::requirement::{Requirement, Requirements};

/// The parsed representation of a recipe file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RecipeFile {
    pub package: RecipePackage,

    /// This recipe is only an alias for another reference.
    #[serde(default)]
    pub alias: Option<String>,

    #[serde(default)]
    pub requires: Vec<String>,

    #[serde(default, rename = "requirement")]
    pub requirements: Vec<RequirementEntry>,

    /// Option name → allowed values.
    #[serde(default)]
    pub options: BTreeMap<String, Vec<String>>,

    /// Own option defaults (`shared`) and dependency values (`"zlib:shared"`).
    #[serde(default)]
    pub default_options: BTreeMap<String, String>,

    #[serde(default, rename = "conditional")]
    pub conditionals: Vec<ConditionalRequires>,

    #[serde(default, rename = "configure")]
    pub configure_rules: Vec<ConfigureRule>,

    #[serde(default)]
    pub python_requires: Vec<String>,
}

/// Package identity from the `[package]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecipePackage {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub revision: Option<String>,
}

/// A requirement with flags, from `[[requirement]]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequirementEntry {
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(default)]
    pub private: bool,
    #[serde(default, rename = "override")]
    pub is_override: bool,
}

/// Requirements added by the requirements hook when an own option has a value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionalRequires {
    pub option: String,
    pub value: String,
    #[serde(default)]
    pub requires: Vec<String>,
}

/// Dependency option values forced by the configure hook when an own option has a value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigureRule {
    pub option: String,
    pub value: String,
    #[serde(default)]
    pub set: DepsOptions,
}

impl RecipeFile {
    /// Load and parse a recipe file.
    pub fn from_path(path: &Path) -> miette::Result<Self> {
        let content = read_text(path)?;
        toml::from_str(&content).map_err(|e| {
            GraftError::Recipe {
                message: format!("Failed to parse {}: {e}", path.display()),
            }
            .into()
        })
    }

    /// Parse a recipe from a string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, GraftError> {
        toml::from_str(content).map_err(|e| GraftError::Recipe {
            message: format!("Failed to parse recipe: {e}"),
        })
    }

    /// The reference this recipe provides, including its revision if any.
    pub fn reference(&self) -> Result<PackageRef, GraftError> {
        let p = &self.package;
        if p.name.is_empty() || p.version.is_empty() {
            return Err(GraftError::Recipe {
                message: "[package] needs both name and version".to_string(),
            });
        }
        let mut reference = PackageRef::new(&p.name, &p.version);
        match (&p.user, &p.channel) {
            (Some(user), Some(channel)) => {
                reference = reference.with_user_channel(user, channel);
            }
            (None, None) => {}
            _ => {
                return Err(GraftError::Recipe {
                    message: format!("{}: user and channel must both be set", p.name),
                })
            }
        }
        if let Some(rev) = &p.revision {
            reference = reference.with_revision(rev);
        }
        Ok(reference)
    }

    pub fn alias_target(&self) -> Result<Option<PackageRef>, GraftError> {
        self.alias.as_deref().map(PackageRef::parse).transpose()
    }

    /// Requirements declared statically, before any hook runs.
    pub fn static_requirements(&self) -> Result<Requirements, GraftError> {
        let mut reqs = Requirements::new();
        for text in &self.requires {
            reqs.add(Requirement::new(PackageRef::parse(text)?))?;
        }
        for entry in &self.requirements {
            let mut req = Requirement::new(PackageRef::parse(&entry.reference)?);
            req.private = entry.private;
            req.is_override = entry.is_override;
            reqs.add(req)?;
        }
        Ok(reqs)
    }

    /// Own option defaults, i.e. `default-options` keys without a `pkg:` scope.
    pub fn own_defaults(&self) -> BTreeMap<&str, &str> {
        self.default_options
            .iter()
            .filter(|(k, _)| !k.contains(':'))
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }

    /// Dependency option defaults, i.e. `default-options` keys written `pkg:option`.
    pub fn deps_defaults(&self) -> DepsOptions {
        let mut deps = DepsOptions::new();
        for (key, value) in &self.default_options {
            if let Some((package, option)) = DepsOptions::split_key(key) {
                deps.set(package, option, value);
            }
        }
        deps
    }

    pub fn python_requires(&self) -> Result<Vec<PackageRef>, GraftError> {
        self.python_requires
            .iter()
            .map(|s| PackageRef::parse(s))
            .collect()
    }
}
