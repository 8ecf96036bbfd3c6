//! Attaching build-time requirements to a node of a resolved graph.

use std::collections::BTreeSet;

use graft_core::provider::GraphLock;
use graft_core::reference::PackageRef;
use graft_core::requirement::{Requirement, Requirements};
use petgraph::graph::NodeIndex;

use crate::builder::{GraphBuilder, ResolveOptions};
use crate::error::{ResolveError, ResolveResult};
use crate::graph::DepsGraph;

impl GraphBuilder<'_> {
    /// Expand `references` as build requirements of `node`.
    ///
    /// Returns the nodes that have no package id yet, which after a fresh
    /// build are the ones this call added. Those nodes are moved to the front
    /// of `node`'s reachable set so they take precedence over its regular
    /// dependencies.
    pub fn extend_build_requires(
        &self,
        graph: &mut DepsGraph,
        node: NodeIndex,
        references: &[PackageRef],
        opts: &ResolveOptions,
        lock: Option<&dyn GraphLock>,
    ) -> ResolveResult<BTreeSet<NodeIndex>> {
        // Options come from the node itself, already settled by downstream.
        let new_options = graph.node(node).manifest.build_requires_options.clone();
        let scope = graph.node(node).manifest.display_name.clone();
        let node_id = graph.node(node).id;

        let mut requires: Requirements = references
            .iter()
            .map(|reference| Requirement::new(reference.clone()).build())
            .collect();

        if let Some(lock) = lock {
            lock.lock_node(node_id, &mut requires, true)
                .map_err(|e| ResolveError::Lock {
                    consumer: scope.clone(),
                    message: e.to_string(),
                })?;
        }

        let mut expansion = self.expansion(graph, opts, lock);
        expansion.resolve_requirements(&mut requires, &scope)?;

        let new_reqs = Requirements::new();
        for mut require in requires.values().cloned().collect::<Vec<_>>() {
            expansion.expand_require(node, &mut require, &new_reqs, &new_options)?;
        }

        let new_nodes = expansion.graph.nodes_without_package_id();
        expansion.graph.closures.prioritize(node, &new_nodes);
        tracing::debug!("{scope}: {} build requirements added", references.len());
        Ok(new_nodes)
    }
}
