//! Contracts of the collaborators the graph builder consumes.
//!
//! The builder never fetches, parses or pins anything itself: recipes come
//! from a [`RecipeProvider`] and a [`ManifestLoader`], version ranges go to a
//! [`RangeResolver`], pins come from an optional [`GraphLock`], and progress
//! is reported to a [`Recorder`].

use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::Remote;
use crate::manifest::Manifest;
use crate::profile::Profile;
use crate::reference::PackageRef;
use crate::requirement::{Requirement, Requirements};

/// Where a recipe was found and in which state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecipeStatus {
    /// Already in the local cache.
    #[default]
    Cache,
    Downloaded,
    Updated,
    /// Served from a local working copy; may carry no revision.
    Editable,
    /// The root recipe being resolved.
    Consumer,
}

impl fmt::Display for RecipeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RecipeStatus::Cache => "Cache",
            RecipeStatus::Downloaded => "Downloaded",
            RecipeStatus::Updated => "Updated",
            RecipeStatus::Editable => "Editable",
            RecipeStatus::Consumer => "Consumer",
        })
    }
}

/// The answer of a [`RecipeProvider`].
#[derive(Debug, Clone)]
pub struct RecipeInfo {
    pub location: PathBuf,
    pub status: RecipeStatus,
    pub remote: Option<String>,
    /// The reference actually found, revision included.
    pub reference: PackageRef,
}

/// Finds the recipe for a reference, locally or on a remote.
pub trait RecipeProvider {
    fn get_recipe(
        &self,
        reference: &PackageRef,
        check_updates: bool,
        update: bool,
        remotes: &[Remote],
    ) -> miette::Result<RecipeInfo>;
}

/// Turns a recipe location into a loaded [`Manifest`].
pub trait ManifestLoader {
    fn load(
        &self,
        location: &Path,
        profile: &Profile,
        reference: &PackageRef,
        locked_python_requires: Option<&[PackageRef]>,
    ) -> miette::Result<Manifest>;
}

/// Lists the versions available for a package.
pub trait RecipeSearch {
    fn versions(
        &self,
        name: &str,
        user: Option<&str>,
        channel: Option<&str>,
        remotes: &[Remote],
    ) -> miette::Result<Vec<String>>;
}

/// Rewrites a requirement whose version is a range to a concrete version.
pub trait RangeResolver {
    fn resolve(
        &self,
        requirement: &mut Requirement,
        consumer: &str,
        update: bool,
        remotes: &[Remote],
    ) -> miette::Result<()>;
}

/// Pinned requirement sets and node ids from a previous resolution.
pub trait GraphLock {
    /// Id of the root node in the lock.
    fn root_id(&self) -> usize;

    /// First id to hand out to nodes the lock does not know about.
    fn initial_counter(&self) -> Option<usize>;

    /// Replace `requirements` with the set locked for node `node_id`.
    fn lock_node(
        &self,
        node_id: usize,
        requirements: &mut Requirements,
        build_requires: bool,
    ) -> miette::Result<()>;

    fn python_requires(&self, locked_id: usize) -> Option<Vec<PackageRef>>;
}

/// Fire-and-forget sink for resolution events.
pub trait Recorder {
    fn recipe_fetched(&self, _reference: &PackageRef, _remote: Option<&str>) {}

    fn recipe_failed(&self, _reference: &PackageRef, _error: &str) {}
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRecorder;

impl Recorder for NullRecorder {}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRecorder;

impl Recorder for TracingRecorder {
    fn recipe_fetched(&self, reference: &PackageRef, remote: Option<&str>) {
        tracing::debug!(
            "recipe {reference} fetched from {}",
            remote.unwrap_or("local cache")
        );
    }

    fn recipe_failed(&self, reference: &PackageRef, error: &str) {
        tracing::error!("recipe {reference} failed: {error}");
    }
}
