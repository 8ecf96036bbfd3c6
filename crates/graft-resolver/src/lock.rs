//! Capturing a lock file from a resolved graph.

use graft_core::lockfile::{GraphLockFile, LockedNode};

use crate::graph::DepsGraph;

/// Pin every node of `graph` with its reference and the ids it requires.
///
/// Loading the same root with the captured lock reproduces the same nodes
/// with the same ids.
pub fn capture_lock(graph: &DepsGraph) -> GraphLockFile {
    let mut lock = GraphLockFile::default();
    if let Some(root) = graph.root() {
        lock.root = graph.node(root).id;
    }
    for (idx, node) in graph.nodes() {
        let mut locked = LockedNode {
            reference: node.reference.clone(),
            python_requires: node.manifest.python_requires.clone(),
            ..Default::default()
        };
        for (dep, requirement) in graph.dependencies_of(idx) {
            let id = graph.node(dep).id;
            let ids = if requirement.build_require {
                &mut locked.build_requires
            } else {
                &mut locked.requires
            };
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        lock.insert(node.id, locked);
    }
    lock
}
