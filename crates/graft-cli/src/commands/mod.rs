//! Command dispatch and the resolution session shared by the handlers.

mod graph;
mod info;
mod lock;

use std::path::{Path, PathBuf};

use graft_core::config::GlobalConfig;
use graft_core::lockfile::GraphLockFile;
use graft_core::manifest::Manifest;
use graft_core::profile::Profile;
use graft_core::provider::{GraphLock, TracingRecorder};
use graft_core::reference::PackageRef;
use graft_recipes::index::RecipeIndex;
use graft_recipes::loader::load_consumer;
use graft_resolver::version::SemverRangeResolver;
use graft_resolver::{DepsGraph, GraphBuilder, ResolveOptions};
use graft_util::errors::GraftError;
use graft_util::fs::find_ancestor_with;
use miette::Result;

use crate::cli::{Cli, Command, ResolveArgs};

/// File name of the root recipe looked up when none is given.
const ROOT_RECIPE: &str = "graft.toml";

/// Route a parsed CLI invocation to the appropriate command handler.
pub fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Graph {
            resolve,
            lockfile,
            build_requires,
            depth,
        } => graph::exec(&resolve, lockfile.as_deref(), &build_requires, depth),
        Command::Lock { resolve, output } => lock::exec(&resolve, &output),
        Command::Info {
            resolve,
            lockfile,
            json,
        } => info::exec(&resolve, lockfile.as_deref(), json),
    }
}

/// The root manifest, recipe index and options of one resolution.
pub(crate) struct Session {
    index: RecipeIndex,
    root: Manifest,
    opts: ResolveOptions,
}

impl Session {
    pub(crate) fn open(args: &ResolveArgs) -> Result<Self> {
        let recipe = match &args.recipe {
            Some(path) => path.clone(),
            None => find_root_recipe()?,
        };
        let index_dir = match &args.index {
            Some(dir) => dir.clone(),
            None => recipe.parent().unwrap_or(Path::new(".")).join("recipes"),
        };

        let config = match &args.config {
            Some(path) => GlobalConfig::load_from(path)?,
            None => GlobalConfig::load()?,
        };
        let profile = match &args.profile {
            Some(path) => Profile::from_path(path)?,
            None => Profile::default(),
        };

        let mut index = RecipeIndex::from_dir(&index_dir)?;
        if let Some(remote) = config.remotes.first() {
            index = index.with_remote(&remote.name);
        }
        for reference in config.editable_refs()? {
            tracing::debug!("{reference} is editable");
            index.mark_editable(&reference);
        }

        let root = load_consumer(&recipe, &profile)?;
        let opts = ResolveOptions {
            check_updates: config.resolve.check_updates,
            update: config.resolve.update || args.update,
            remotes: config.remotes,
            profile,
        };
        Ok(Self { index, root, opts })
    }

    /// Build the graph, then inject the profile's build requirements plus
    /// `extra_build_requires` into the root.
    pub(crate) fn resolve(
        self,
        lock: Option<&GraphLockFile>,
        extra_build_requires: &[String],
    ) -> Result<DepsGraph> {
        let Session { index, root, opts } = self;
        let resolver = SemverRangeResolver::new(&index);
        let recorder = TracingRecorder;
        let builder = GraphBuilder::new(&index, &index, &resolver).with_recorder(&recorder);
        let lock = lock.map(|l| l as &dyn GraphLock);

        let mut graph = builder.load_graph(root, &opts, lock)?;
        assign_package_ids(&mut graph);

        let mut build_requires = opts.profile.build_requires()?;
        for text in extra_build_requires {
            build_requires.push(PackageRef::parse(text)?);
        }
        if build_requires.is_empty() {
            return Ok(graph);
        }
        if let Some(root) = graph.root() {
            let added =
                builder.extend_build_requires(&mut graph, root, &build_requires, &opts, lock)?;
            tracing::debug!("{} nodes added by build requirements", added.len());
            assign_package_ids(&mut graph);
        }
        Ok(graph)
    }
}

fn find_root_recipe() -> Result<PathBuf> {
    let cwd = std::env::current_dir().map_err(GraftError::Io)?;
    let dir = find_ancestor_with(&cwd, ROOT_RECIPE).ok_or_else(|| GraftError::Generic {
        message: format!("Could not find {ROOT_RECIPE} in this directory or any parent"),
    })?;
    Ok(dir.join(ROOT_RECIPE))
}

/// Give every node without one a package id made of its reference and its
/// option values.
fn assign_package_ids(graph: &mut DepsGraph) {
    for idx in graph.nodes_without_package_id() {
        let node = graph.node(idx);
        let id = format!("{node}[{}]", node.manifest.options);
        graph.set_package_id(idx, id);
    }
}
