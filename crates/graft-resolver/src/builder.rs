//! Depth-first expansion of a root manifest into a [`DepsGraph`].
//!
//! ```text
//! load_graph(root)
//!     expand_node(root)
//!         node_requirements(node)          configure, requirements(), overrides, ranges
//!         for each requirement:
//!             expand_require(node, req)
//!                 name not visible      -> new node, expand_node(new node)
//!                 name already visible  -> close the diamond, check conflicts,
//!                                          expand_node(previous) if upstream changed
//! ```

use std::time::Instant;

use graft_core::config::Remote;
use graft_core::manifest::{Hook, Manifest};
use graft_core::options::DepsOptions;
use graft_core::profile::Profile;
use graft_core::provider::{
    GraphLock, ManifestLoader, NullRecorder, RangeResolver, RecipeProvider, RecipeStatus, Recorder,
};
use graft_core::reference::PackageRef;
use graft_core::requirement::{Requirement, Requirements};
use petgraph::graph::NodeIndex;

use crate::alias::{join, AliasTable};
use crate::conflict::{compare, Compatibility};
use crate::error::{ResolveError, ResolveResult};
use crate::graph::{DepsGraph, Node};

/// Inputs of one graph build besides the root manifest.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    pub check_updates: bool,
    /// Implies `check_updates`.
    pub update: bool,
    pub remotes: Vec<Remote>,
    pub profile: Profile,
}

/// Builds dependency graphs from the recipe collaborators it is given.
pub struct GraphBuilder<'a> {
    proxy: &'a dyn RecipeProvider,
    loader: &'a dyn ManifestLoader,
    resolver: &'a dyn RangeResolver,
    recorder: &'a dyn Recorder,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(
        proxy: &'a dyn RecipeProvider,
        loader: &'a dyn ManifestLoader,
        resolver: &'a dyn RangeResolver,
    ) -> Self {
        Self {
            proxy,
            loader,
            resolver,
            recorder: &NullRecorder,
        }
    }

    pub fn with_recorder(mut self, recorder: &'a dyn Recorder) -> Self {
        self.recorder = recorder;
        self
    }

    /// Resolve the full graph of `root`.
    ///
    /// With a lock, every requirement set comes from the lock and node ids
    /// continue after the highest locked id.
    pub fn load_graph(
        &self,
        root: Manifest,
        opts: &ResolveOptions,
        lock: Option<&dyn GraphLock>,
    ) -> ResolveResult<DepsGraph> {
        self.load_graph_with_aliases(root, opts, lock, AliasTable::new())
    }

    /// Like [`GraphBuilder::load_graph`], starting from a known alias table.
    pub fn load_graph_with_aliases(
        &self,
        root: Manifest,
        opts: &ResolveOptions,
        lock: Option<&dyn GraphLock>,
        aliases: AliasTable,
    ) -> ResolveResult<DepsGraph> {
        let start = Instant::now();
        let mut graph = DepsGraph::new(lock.and_then(|l| l.initial_counter()));
        graph.aliased = aliases;

        let name = root.name.clone().unwrap_or_default();
        let mut node = Node::new(name, None, root);
        node.recipe = RecipeStatus::Consumer;
        let root_idx = graph.add_node(node, lock.map(|l| l.root_id()));
        graph.set_root(root_idx);

        let mut expansion = self.expansion(&mut graph, opts, lock);
        expansion.expand_node(root_idx, &Requirements::new(), None, &opts.profile.options)?;

        tracing::debug!(
            "graph of {} nodes loaded in {:.3}s",
            graph.len(),
            start.elapsed().as_secs_f64()
        );
        Ok(graph)
    }

    pub(crate) fn expansion<'e>(
        &'e self,
        graph: &'e mut DepsGraph,
        opts: &'e ResolveOptions,
        lock: Option<&'e dyn GraphLock>,
    ) -> Expansion<'e> {
        Expansion {
            graph,
            proxy: self.proxy,
            loader: self.loader,
            resolver: self.resolver,
            recorder: self.recorder,
            opts,
            check_updates: opts.check_updates || opts.update,
            lock,
        }
    }
}

/// The state of one traversal: the graph being grown plus the collaborators.
pub(crate) struct Expansion<'e> {
    pub(crate) graph: &'e mut DepsGraph,
    proxy: &'e dyn RecipeProvider,
    loader: &'e dyn ManifestLoader,
    resolver: &'e dyn RangeResolver,
    recorder: &'e dyn Recorder,
    opts: &'e ResolveOptions,
    check_updates: bool,
    lock: Option<&'e dyn GraphLock>,
}

/// A fetched and loaded recipe, after following aliases.
struct ResolvedRecipe {
    reference: PackageRef,
    manifest: Manifest,
    status: RecipeStatus,
    remote: Option<String>,
    locked_id: Option<usize>,
}

impl Expansion<'_> {
    /// Configure a node, settle its requirements and expand each of them.
    fn expand_node(
        &mut self,
        idx: NodeIndex,
        down_reqs: &Requirements,
        down_ref: Option<&PackageRef>,
        down_options: &DepsOptions,
    ) -> ResolveResult<()> {
        let (new_options, new_reqs) =
            self.node_requirements(idx, down_reqs, down_ref, down_options)?;

        let requires: Vec<(String, Requirement)> = self
            .graph
            .node(idx)
            .manifest
            .requires
            .names()
            .into_iter()
            .zip(self.graph.node(idx).manifest.requires.values().cloned())
            .filter(|(_, req)| !req.is_override)
            .collect();
        for (key, mut require) in requires {
            self.expand_require(idx, &mut require, &new_reqs, &new_options)?;
            if let Some(slot) = self.graph.node_mut(idx).manifest.requires.get_mut(&key) {
                *slot = require;
            }
        }
        // an alias may have pointed a requirement at another package name
        self.graph.node_mut(idx).manifest.requires.rekey();
        Ok(())
    }

    /// Run the configuration hooks and compute the requirement set of a node.
    ///
    /// Returns the option values and requirements the node hands upstream.
    fn node_requirements(
        &mut self,
        idx: NodeIndex,
        down_reqs: &Requirements,
        down_ref: Option<&PackageRef>,
        down_options: &DepsOptions,
    ) -> ResolveResult<(DepsOptions, Requirements)> {
        let new_options = self.configure_node(idx, down_ref, down_options)?;

        let DepsGraph { graph, aliased, .. } = &mut *self.graph;
        let node = &mut graph[idx];
        if self.lock.is_none() {
            if let Err(previous) = node.manifest.check_evaluated_requires() {
                return Err(ResolveError::RequirementsNondeterminism {
                    consumer: node.manifest.display_name.clone(),
                    previous: previous.to_string(),
                    current: node.manifest.requires.to_string(),
                });
            }
        }
        aliased.resolve_all(&mut node.manifest.requires)?;

        if let Some(lock) = self.lock {
            lock.lock_node(node.id, &mut node.manifest.requires, false)
                .map_err(|e| ResolveError::Lock {
                    consumer: node.manifest.display_name.clone(),
                    message: e.to_string(),
                })?;
            return Ok((new_options, Requirements::new()));
        }

        node.manifest
            .requires
            .apply_downstream(down_reqs, node.reference.as_ref(), down_ref);
        let scope = node.manifest.display_name.clone();
        resolve_ranges(
            self.resolver,
            aliased,
            &mut node.manifest.requires,
            &scope,
            self.opts.update,
            &self.opts.remotes,
        )?;
        let new_reqs = node
            .manifest
            .requires
            .propagated(down_reqs, Some(node.name.as_str()));
        Ok((new_options, new_reqs))
    }

    /// Apply downstream options and run the hooks up to `requirements()`.
    fn configure_node(
        &mut self,
        idx: NodeIndex,
        down_ref: Option<&PackageRef>,
        down_options: &DepsOptions,
    ) -> ResolveResult<DepsOptions> {
        let Node {
            name,
            reference,
            manifest,
            ..
        } = self.graph.node_mut(idx);
        let label = reference
            .as_ref()
            .map_or_else(|| "Consumer".to_string(), ToString::to_string);
        let configuration = |message: String| ResolveError::Configuration {
            reference: label.clone(),
            message,
        };

        run_hook(manifest, Hook::ConfigOptions)?;
        manifest
            .options
            .propagate_upstream(down_options, down_ref, name)
            .map_err(configuration)?;
        run_hook(manifest, Hook::Configure)?;
        manifest.options.validate().map_err(configuration)?;
        run_hook(manifest, Hook::Requirements)?;

        Ok(manifest.options.deps_values().clone())
    }

    /// Expand one requirement of `idx`: either a new node or a diamond.
    pub(crate) fn expand_require(
        &mut self,
        idx: NodeIndex,
        require: &mut Requirement,
        new_reqs: &Requirements,
        new_options: &DepsOptions,
    ) -> ResolveResult<()> {
        let name = require.name().to_string();
        let closure = self.graph.closure(idx);
        if name == self.graph.node(idx).name || closure.ancestors().contains(&name) {
            return Err(ResolveError::LoopDetected {
                consumer: self.label(idx),
                requirement: require.reference.to_string(),
            });
        }

        let previous = closure.public_deps().get(&name);
        let reachable = closure.public_closure().contains_key(&name);
        match previous {
            Some(previous) if !(require.is_isolated() && !reachable) => {
                self.close_diamond(idx, previous, require, new_reqs, new_options)
            }
            _ => self.add_dependency(idx, require, new_reqs, new_options),
        }
    }

    /// `idx -> new node`: create, link and expand the new node.
    fn add_dependency(
        &mut self,
        idx: NodeIndex,
        require: &mut Requirement,
        new_reqs: &Requirements,
        new_options: &DepsOptions,
    ) -> ResolveResult<()> {
        let child = self.create_new_node(idx, require)?;
        let isolated = require.is_isolated();
        self.graph.closures.attach(idx, child, isolated);

        let down_ref = self.graph.node(idx).reference.clone();
        self.expand_node(child, new_reqs, down_ref.as_ref(), new_options)?;

        if !isolated {
            self.graph.closures.merge_transitive(idx, child);
        }
        Ok(())
    }

    /// `idx -> previous`: the name is already visible, so the requirement
    /// must agree with the node that provides it.
    fn close_diamond(
        &mut self,
        idx: NodeIndex,
        previous: NodeIndex,
        require: &mut Requirement,
        new_reqs: &Requirements,
        new_options: &DepsOptions,
    ) -> ResolveResult<()> {
        self.graph.aliased.resolve_requirement(require)?;
        self.check_conflict(idx, previous, require)?;

        if let Err(offending) = self.graph.closures.extend_ancestors(previous, idx) {
            return Err(ResolveError::LoopDetected {
                consumer: self.label(idx),
                requirement: self.label(offending),
            });
        }

        let isolated = require.is_isolated();
        if isolated {
            self.graph.closures.connect_reachable(idx, previous);
        } else {
            self.graph.closures.connect(idx, previous);
        }
        self.graph.add_edge(idx, previous, require.clone());
        tracing::trace!(
            "{} reaches existing {}",
            self.label(idx),
            self.label(previous)
        );

        if !isolated {
            let closures = &mut self.graph.closures;
            closures.merge_transitive(idx, previous);
            let upstream: Vec<NodeIndex> = closures
                .get(previous)
                .transitive_closure()
                .values()
                .copied()
                .collect();
            let dependents: Vec<NodeIndex> =
                closures.get(idx).dependents().iter().copied().collect();
            for node in upstream {
                closures.connect(idx, node);
                for &dependent in &dependents {
                    closures.connect(dependent, node);
                }
            }
        }

        if self.lock.is_none() && self.needs_reexpansion(previous, new_reqs, new_options) {
            tracing::debug!(
                "re-expanding {} for {}",
                self.label(previous),
                self.label(idx)
            );
            let down_ref = self.graph.node(idx).reference.clone();
            self.expand_node(previous, new_reqs, down_ref.as_ref(), new_options)?;
        }
        Ok(())
    }

    /// Fail when `require` disagrees with `previous`. A version mismatch gets
    /// one more chance: the requested recipe may turn out to be an alias of
    /// the reference already in the graph.
    fn check_conflict(
        &mut self,
        idx: NodeIndex,
        previous: NodeIndex,
        require: &mut Requirement,
    ) -> ResolveResult<()> {
        let previous_ref = match &self.graph.node(previous).reference {
            Some(reference) => reference.clone(),
            None => {
                return Err(ResolveError::LoopDetected {
                    consumer: self.label(idx),
                    requirement: require.reference.to_string(),
                })
            }
        };

        match compare(&previous_ref, &require.reference) {
            Compatibility::Compatible => return Ok(()),
            Compatibility::RevisionMismatch => {
                return Err(self.conflict_error(idx, &previous_ref, require, true))
            }
            Compatibility::VersionMismatch => {}
        }

        let requested = require.reference.clone();
        self.resolve_recipe(idx, require)?;
        if require.reference == requested {
            return Err(self.conflict_error(idx, &previous_ref, require, false));
        }
        match compare(&previous_ref, &require.reference) {
            Compatibility::Compatible => Ok(()),
            Compatibility::VersionMismatch => {
                Err(self.conflict_error(idx, &previous_ref, require, false))
            }
            Compatibility::RevisionMismatch => {
                Err(self.conflict_error(idx, &previous_ref, require, true))
            }
        }
    }

    fn conflict_error(
        &self,
        idx: NodeIndex,
        previous: &PackageRef,
        require: &Requirement,
        revision: bool,
    ) -> ResolveError {
        let consumer = self.label(idx);
        let requested = require.reference.to_string();
        let previous = previous.to_string();
        if revision {
            ResolveError::RevisionConflict {
                consumer,
                requested,
                previous,
            }
        } else {
            ResolveError::ReferenceConflict {
                consumer,
                requested,
                previous,
            }
        }
    }

    /// Whether the values coming from downstream disagree with what is
    /// already resolved upstream of `previous`.
    ///
    /// Only the propagated requirements and options are compared; subtrees
    /// added privately since `previous` was expanded are not rechecked.
    fn needs_reexpansion(
        &self,
        previous: NodeIndex,
        new_reqs: &Requirements,
        new_options: &DepsOptions,
    ) -> bool {
        let closure = self.graph.closure(previous).public_closure();
        for req in new_reqs.values() {
            let Some(&node) = closure.get(req.name()) else {
                continue;
            };
            if let Some(reference) = &self.graph.node(node).reference {
                if !compare(reference, &req.reference).is_compatible() {
                    return true;
                }
            }
        }
        for (package, values) in new_options.iter() {
            let Some(&node) = closure.get(package) else {
                continue;
            };
            let options = &self.graph.node(node).manifest.options;
            if values
                .iter()
                .any(|(option, value)| options.get(option) != Some(value.as_str()))
            {
                return true;
            }
        }
        false
    }

    fn create_new_node(&mut self, idx: NodeIndex, require: &mut Requirement) -> ResolveResult<NodeIndex> {
        let resolved = self.resolve_recipe(idx, require)?;
        tracing::debug!("new node: {}", resolved.reference);

        let mut node = Node::new(
            resolved.reference.name.clone(),
            Some(resolved.reference),
            resolved.manifest,
        );
        node.revision_pinned = require.reference.revision.is_some();
        node.recipe = resolved.status;
        node.remote = resolved.remote;

        let child = self.graph.add_node(node, resolved.locked_id);
        self.graph.add_edge(idx, child, require.clone());
        Ok(child)
    }

    /// Fetch and load the recipe for `require`, following alias recipes.
    /// Every alias met on the way is cached and `require` ends up pointing
    /// at the final target.
    fn resolve_recipe(&mut self, idx: NodeIndex, require: &mut Requirement) -> ResolveResult<ResolvedRecipe> {
        let mut first_alias: Option<PackageRef> = None;
        let mut seen: Vec<PackageRef> = Vec::new();
        loop {
            let info = self
                .proxy
                .get_recipe(
                    &require.reference,
                    self.check_updates,
                    self.opts.update,
                    &self.opts.remotes,
                )
                .map_err(|e| self.recipe_failure(idx, require, e))?;
            self.recorder
                .recipe_fetched(&info.reference, info.remote.as_deref());

            let locked_id = require.locked_id;
            let locked_python_requires = locked_id
                .and_then(|id| self.lock.and_then(|lock| lock.python_requires(id)));
            let mut manifest = self
                .loader
                .load(
                    &info.location,
                    &self.opts.profile,
                    &require.reference,
                    locked_python_requires.as_deref(),
                )
                .map_err(|e| self.recipe_failure(idx, require, e))?;
            if info.status == RecipeStatus::Editable {
                manifest.in_local_cache = false;
                manifest.develop = true;
            }

            let Some(target) = manifest.alias.take() else {
                return Ok(ResolvedRecipe {
                    reference: info.reference,
                    manifest,
                    status: info.status,
                    remote: info.remote,
                    locked_id,
                });
            };

            let alias = info.reference.without_revision();
            if seen.contains(&alias) {
                seen.push(alias);
                return Err(ResolveError::AliasCycle {
                    reference: seen[0].to_string(),
                    chain: join(&seen),
                });
            }
            seen.push(alias.clone());
            self.graph
                .aliased
                .record(&alias, &target, first_alias.as_ref());
            first_alias.get_or_insert(alias);
            require.reference = target;
        }
    }

    fn recipe_failure(&self, idx: NodeIndex, require: &Requirement, error: miette::Report) -> ResolveError {
        let consumer = self.graph.node(idx);
        let message = error.to_string();
        self.recorder.recipe_failed(&require.reference, &message);
        if consumer.reference.is_some() {
            tracing::error!(
                "Failed requirement '{}' from '{}'",
                require.reference,
                consumer.manifest.display_name
            );
        }
        ResolveError::RecipeResolution {
            consumer: consumer.manifest.display_name.clone(),
            requirement: require.reference.to_string(),
            message,
        }
    }

    /// How a node is named in error messages.
    fn label(&self, idx: NodeIndex) -> String {
        self.graph.node(idx).to_string()
    }

    /// Resolve ranges of a requirement set that does not belong to a node yet.
    pub(crate) fn resolve_requirements(
        &mut self,
        requires: &mut Requirements,
        consumer: &str,
    ) -> ResolveResult<()> {
        resolve_ranges(
            self.resolver,
            &self.graph.aliased,
            requires,
            consumer,
            self.opts.update,
            &self.opts.remotes,
        )
    }
}

/// Pin every version range, then apply aliases the new pins may have hit.
fn resolve_ranges(
    resolver: &dyn RangeResolver,
    aliased: &AliasTable,
    requires: &mut Requirements,
    consumer: &str,
    update: bool,
    remotes: &[Remote],
) -> ResolveResult<()> {
    for require in requires.values_mut() {
        let requested = require.reference.to_string();
        resolver
            .resolve(require, consumer, update, remotes)
            .map_err(|e| ResolveError::RangeUnresolved {
                consumer: consumer.to_string(),
                requirement: requested,
                message: e.to_string(),
            })?;
    }
    aliased.resolve_all(requires)
}

fn run_hook(manifest: &mut Manifest, hook: Hook) -> ResolveResult<()> {
    manifest
        .run_hook(hook)
        .map_err(|e| ResolveError::UserHook {
            manifest: manifest.display_name.clone(),
            hook: hook.to_string(),
            message: e.to_string(),
        })
}
