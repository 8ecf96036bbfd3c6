//! An index of recipe files, from a directory or built in memory.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use graft_core::config::Remote;
use graft_core::manifest::Manifest;
use graft_core::profile::Profile;
use graft_core::provider::{ManifestLoader, RecipeInfo, RecipeProvider, RecipeSearch, RecipeStatus};
use graft_core::recipe::RecipeFile;
use graft_core::reference::PackageRef;
use graft_util::errors::GraftError;
use graft_util::fs::toml_files;

use crate::loader::manifest_from_recipe;

#[derive(Debug, Clone)]
struct IndexEntry {
    location: PathBuf,
    reference: PackageRef,
    recipe: RecipeFile,
}

/// Recipes keyed by reference (without revision).
///
/// Acts as recipe provider, manifest loader and version search at once.
#[derive(Debug, Clone, Default)]
pub struct RecipeIndex {
    entries: BTreeMap<PackageRef, IndexEntry>,
    locations: BTreeMap<PathBuf, PackageRef>,
    editables: BTreeSet<PackageRef>,
    remote: Option<String>,
}

impl RecipeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every `*.toml` recipe directly inside `dir`.
    pub fn from_dir(dir: &Path) -> miette::Result<Self> {
        let mut index = Self::new();
        for path in toml_files(dir)? {
            let recipe = RecipeFile::from_path(&path)?;
            index.insert(recipe, path)?;
        }
        tracing::debug!("indexed {} recipes from {}", index.len(), dir.display());
        Ok(index)
    }

    /// Report recipes as coming from the named remote.
    pub fn with_remote(mut self, name: impl Into<String>) -> Self {
        self.remote = Some(name.into());
        self
    }

    pub fn add(&mut self, recipe: RecipeFile) -> Result<PackageRef, GraftError> {
        let reference = recipe.reference()?;
        let location = PathBuf::from(format!("memory/{}", reference.without_revision()));
        self.insert(recipe, location)
    }

    /// Parse and add a recipe written as TOML.
    pub fn add_str(&mut self, content: &str) -> Result<PackageRef, GraftError> {
        self.add(RecipeFile::from_str(content)?)
    }

    fn insert(&mut self, recipe: RecipeFile, location: PathBuf) -> Result<PackageRef, GraftError> {
        let reference = recipe.reference()?;
        let key = reference.without_revision();
        if let Some(existing) = self.entries.get(&key) {
            return Err(GraftError::Recipe {
                message: format!(
                    "{key} is provided by both {} and {}",
                    existing.location.display(),
                    location.display()
                ),
            });
        }
        self.locations.insert(location.clone(), key.clone());
        self.entries.insert(
            key,
            IndexEntry {
                location,
                reference: reference.clone(),
                recipe,
            },
        );
        Ok(reference)
    }

    /// Serve `reference` as an editable package.
    pub fn mark_editable(&mut self, reference: &PackageRef) {
        self.editables.insert(reference.without_revision());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn references(&self) -> impl Iterator<Item = &PackageRef> {
        self.entries.values().map(|e| &e.reference)
    }

    fn not_found(reference: &PackageRef) -> GraftError {
        GraftError::NotFound {
            reference: reference.to_string(),
        }
    }
}

impl RecipeProvider for RecipeIndex {
    fn get_recipe(
        &self,
        reference: &PackageRef,
        check_updates: bool,
        update: bool,
        remotes: &[Remote],
    ) -> miette::Result<RecipeInfo> {
        let key = reference.without_revision();
        let entry = self
            .entries
            .get(&key)
            .ok_or_else(|| Self::not_found(reference))?;
        if let (Some(wanted), Some(found)) = (&reference.revision, &entry.reference.revision) {
            if wanted != found {
                return Err(Self::not_found(reference).into());
            }
        }
        if check_updates || update {
            tracing::trace!("{reference}: index is up to date ({} remotes)", remotes.len());
        }

        let (status, found) = if self.editables.contains(&key) {
            (RecipeStatus::Editable, key)
        } else {
            (RecipeStatus::Cache, entry.reference.clone())
        };
        Ok(RecipeInfo {
            location: entry.location.clone(),
            status,
            remote: self.remote.clone(),
            reference: found,
        })
    }
}

impl ManifestLoader for RecipeIndex {
    fn load(
        &self,
        location: &Path,
        profile: &Profile,
        reference: &PackageRef,
        locked_python_requires: Option<&[PackageRef]>,
    ) -> miette::Result<Manifest> {
        let entry = self
            .locations
            .get(location)
            .and_then(|key| self.entries.get(key))
            .ok_or_else(|| GraftError::Recipe {
                message: format!("{reference}: no recipe at {}", location.display()),
            })?;
        Ok(manifest_from_recipe(
            &entry.recipe,
            profile,
            locked_python_requires,
        )?)
    }
}

impl RecipeSearch for RecipeIndex {
    fn versions(
        &self,
        name: &str,
        user: Option<&str>,
        channel: Option<&str>,
        _remotes: &[Remote],
    ) -> miette::Result<Vec<String>> {
        Ok(self
            .entries
            .keys()
            .filter(|r| r.name == name && r.user.as_deref() == user && r.channel.as_deref() == channel)
            .map(|r| r.version.clone())
            .collect())
    }
}
