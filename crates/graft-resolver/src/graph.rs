//! The resolved dependency graph.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use graft_core::manifest::Manifest;
use graft_core::provider::RecipeStatus;
use graft_core::reference::PackageRef;
use graft_core::requirement::Requirement;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::alias::AliasTable;
use crate::closure::{ClosureStore, NodeClosure};

/// One resolved package instance.
#[derive(Debug)]
pub struct Node {
    /// Sequential id, or the id pinned by a lock file.
    pub id: usize,
    pub name: String,
    /// Absent for a root recipe that is not itself a package.
    pub reference: Option<PackageRef>,
    pub manifest: Manifest,
    pub recipe: RecipeStatus,
    pub remote: Option<String>,
    /// The requirement that created this node named an explicit revision.
    pub revision_pinned: bool,
    /// Content id assigned after the graph is built.
    pub package_id: Option<String>,
}

impl Node {
    pub fn new(name: impl Into<String>, reference: Option<PackageRef>, manifest: Manifest) -> Self {
        Self {
            id: 0,
            name: name.into(),
            reference,
            manifest,
            recipe: RecipeStatus::default(),
            remote: None,
            revision_pinned: false,
            package_id: None,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reference {
            Some(reference) => write!(f, "{reference}"),
            None => f.write_str(&self.manifest.display_name),
        }
    }
}

/// Nodes, requirement-labelled edges (several per pair allowed), the
/// closure of every node and the alias table of the build.
#[derive(Debug, Default)]
pub struct DepsGraph {
    pub(crate) graph: DiGraph<Node, Requirement>,
    pub(crate) closures: ClosureStore,
    pub aliased: AliasTable,
    root: Option<NodeIndex>,
    next_id: usize,
}

impl DepsGraph {
    /// An empty graph handing out ids from `initial_id` (0 when absent).
    pub fn new(initial_id: Option<usize>) -> Self {
        Self {
            next_id: initial_id.unwrap_or(0),
            ..Self::default()
        }
    }

    /// Add a node, giving it `locked_id` or the next free id.
    pub fn add_node(&mut self, mut node: Node, locked_id: Option<usize>) -> NodeIndex {
        node.id = match locked_id {
            Some(id) => id,
            None => {
                let id = self.next_id;
                self.next_id += 1;
                id
            }
        };
        let name = node.name.clone();
        let idx = self.graph.add_node(node);
        self.closures.push(idx, &name);
        idx
    }

    pub(crate) fn set_root(&mut self, idx: NodeIndex) {
        self.closures.init_root(idx);
        self.root = Some(idx);
    }

    /// Link `from` to `to` through `requirement`.
    ///
    /// A pair of nodes may be linked by several requirements (a package can
    /// be both a regular and a build requirement of the same consumer).
    /// Linking a pair again with an equal requirement, as a re-expanded node
    /// does, keeps the existing edge.
    pub fn add_edge(&mut self, from: NodeIndex, to: NodeIndex, requirement: Requirement) {
        let exists = self
            .graph
            .edges_connecting(from, to)
            .any(|edge| *edge.weight() == requirement);
        if !exists {
            self.graph.add_edge(from, to, requirement);
        }
    }

    pub fn root(&self) -> Option<NodeIndex> {
        self.root
    }

    pub fn node(&self, idx: NodeIndex) -> &Node {
        &self.graph[idx]
    }

    pub fn node_mut(&mut self, idx: NodeIndex) -> &mut Node {
        &mut self.graph[idx]
    }

    pub fn closure(&self, idx: NodeIndex) -> &NodeClosure {
        self.closures.get(idx)
    }

    /// All nodes in creation order, root first.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeIndex, &Node)> {
        self.graph
            .node_indices()
            .map(move |idx| (idx, &self.graph[idx]))
    }

    /// Nodes of the given package name, in creation order.
    pub fn find_by_name(&self, name: &str) -> Vec<NodeIndex> {
        self.nodes()
            .filter(|(_, node)| node.name == name)
            .map(|(idx, _)| idx)
            .collect()
    }

    pub fn find_by_id(&self, id: usize) -> Option<NodeIndex> {
        self.nodes().find(|(_, node)| node.id == id).map(|(idx, _)| idx)
    }

    /// Every edge as (from, to, requirement), in insertion order.
    pub fn edges(&self) -> Vec<(NodeIndex, NodeIndex, &Requirement)> {
        self.graph
            .edge_references()
            .map(|e| (e.source(), e.target(), e.weight()))
            .collect()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Direct dependencies of a node, in the order the edges were added.
    pub fn dependencies_of(&self, idx: NodeIndex) -> Vec<(NodeIndex, &Requirement)> {
        let mut edges: Vec<_> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| (e.id(), e.target(), e.weight()))
            .collect();
        edges.sort_by_key(|(id, _, _)| *id);
        edges.into_iter().map(|(_, to, req)| (to, req)).collect()
    }

    /// Nodes with an edge to this one, in the order the edges were added.
    pub fn dependents_of(&self, idx: NodeIndex) -> Vec<(NodeIndex, &Requirement)> {
        let mut edges: Vec<_> = self
            .graph
            .edges_directed(idx, Direction::Incoming)
            .map(|e| (e.id(), e.source(), e.weight()))
            .collect();
        edges.sort_by_key(|(id, _, _)| *id);
        edges.into_iter().map(|(_, from, req)| (from, req)).collect()
    }

    pub fn set_package_id(&mut self, idx: NodeIndex, package_id: impl Into<String>) {
        self.graph[idx].package_id = Some(package_id.into());
    }

    /// Nodes that have not been given a content id yet.
    pub fn nodes_without_package_id(&self) -> BTreeSet<NodeIndex> {
        self.nodes()
            .filter(|(_, node)| node.package_id.is_none())
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Print the dependency tree to a string.
    pub fn print_tree(&self, max_depth: Option<usize>) -> String {
        let mut output = String::new();
        let Some(root) = self.root else {
            return output;
        };
        output.push_str(&format!("{}\n", self.graph[root]));

        let mut visited = HashSet::new();
        visited.insert(root);
        let deps = self.dependencies_of(root);
        let count = deps.len();
        for (i, (idx, req)) in deps.iter().enumerate() {
            let is_last = i == count - 1;
            self.print_subtree(&mut output, *idx, req, "", is_last, 1, max_depth, &mut visited);
        }
        output
    }

    #[allow(clippy::too_many_arguments)]
    fn print_subtree(
        &self,
        output: &mut String,
        idx: NodeIndex,
        requirement: &Requirement,
        prefix: &str,
        is_last: bool,
        depth: usize,
        max_depth: Option<usize>,
        visited: &mut HashSet<NodeIndex>,
    ) {
        let connector = if is_last { "└── " } else { "├── " };
        let node = &self.graph[idx];
        let tag = if requirement.build_require {
            " (build)"
        } else if requirement.private {
            " (private)"
        } else {
            ""
        };
        output.push_str(&format!("{prefix}{connector}{node}{tag}\n"));

        if let Some(max) = max_depth {
            if depth >= max {
                return;
            }
        }

        if !visited.insert(idx) {
            return;
        }

        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        let deps = self.dependencies_of(idx);
        let count = deps.len();
        for (i, (child, req)) in deps.iter().enumerate() {
            let is_last = i == count - 1;
            self.print_subtree(
                output,
                *child,
                req,
                &child_prefix,
                is_last,
                depth + 1,
                max_depth,
                visited,
            );
        }

        visited.remove(&idx);
    }

    /// Find the path from the root to the first node of package `name`.
    pub fn find_path(&self, name: &str) -> Option<Vec<&Node>> {
        let root = self.root?;
        let target = self.find_by_name(name).into_iter().next()?;
        let mut path = Vec::new();
        let mut visited = HashSet::new();
        if self.dfs_path(root, target, &mut path, &mut visited) {
            Some(path.iter().map(|&idx| &self.graph[idx]).collect())
        } else {
            None
        }
    }

    fn dfs_path(
        &self,
        current: NodeIndex,
        target: NodeIndex,
        path: &mut Vec<NodeIndex>,
        visited: &mut HashSet<NodeIndex>,
    ) -> bool {
        path.push(current);
        if current == target {
            return true;
        }
        if !visited.insert(current) {
            path.pop();
            return false;
        }
        for (next, _) in self.dependencies_of(current) {
            if self.dfs_path(next, target, path, visited) {
                return true;
            }
        }
        path.pop();
        false
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package(name: &str, version: &str) -> Node {
        let reference = PackageRef::new(name, version);
        Node::new(name, Some(reference), Manifest::for_package(name, version))
    }

    /// app -> a -> c, app -> b -> c, app -(build)-> cmake
    fn diamond() -> (DepsGraph, Vec<NodeIndex>) {
        let mut graph = DepsGraph::new(None);
        let root = graph.add_node(Node::new("app", None, Manifest::new("app (graft.toml)")), None);
        graph.set_root(root);
        let a = graph.add_node(package("a", "1.0"), None);
        let b = graph.add_node(package("b", "1.0"), None);
        let c = graph.add_node(package("c", "1.0"), None);
        let cmake = graph.add_node(package("cmake", "3.16"), None);
        graph.add_edge(root, a, Requirement::new(PackageRef::new("a", "1.0")));
        graph.add_edge(root, b, Requirement::new(PackageRef::new("b", "1.0")));
        graph.add_edge(a, c, Requirement::new(PackageRef::new("c", "1.0")));
        graph.add_edge(b, c, Requirement::new(PackageRef::new("c", "1.0")));
        graph.add_edge(
            root,
            cmake,
            Requirement::new(PackageRef::new("cmake", "3.16")).build(),
        );
        (graph, vec![root, a, b, c, cmake])
    }

    #[test]
    fn ids_are_sequential_unless_locked() {
        let mut graph = DepsGraph::new(Some(10));
        let first = graph.add_node(package("a", "1.0"), None);
        let locked = graph.add_node(package("b", "1.0"), Some(3));
        let next = graph.add_node(package("c", "1.0"), None);
        assert_eq!(graph.node(first).id, 10);
        assert_eq!(graph.node(locked).id, 3);
        assert_eq!(graph.node(next).id, 11);
        assert_eq!(graph.find_by_id(3), Some(locked));
    }

    #[test]
    fn dependencies_keep_insertion_order() {
        let (graph, n) = diamond();
        let deps: Vec<NodeIndex> = graph.dependencies_of(n[0]).into_iter().map(|(i, _)| i).collect();
        assert_eq!(deps, vec![n[1], n[2], n[4]]);
        let dependents: Vec<NodeIndex> = graph.dependents_of(n[3]).into_iter().map(|(i, _)| i).collect();
        assert_eq!(dependents, vec![n[1], n[2]]);
    }

    #[test]
    fn relinking_with_the_same_requirement_keeps_one_edge() {
        let (mut graph, n) = diamond();
        graph.add_edge(n[1], n[3], Requirement::new(PackageRef::new("c", "1.0")));
        assert_eq!(graph.edge_count(), 5);
    }

    #[test]
    fn a_pair_can_carry_several_requirements() {
        let (mut graph, n) = diamond();
        graph.add_edge(n[1], n[3], Requirement::new(PackageRef::new("c", "1.0")).build());
        assert_eq!(graph.edge_count(), 6);
        let flags: Vec<bool> = graph
            .dependencies_of(n[1])
            .into_iter()
            .map(|(_, req)| req.build_require)
            .collect();
        assert_eq!(flags, vec![false, true]);
    }

    #[test]
    fn print_tree_marks_build_requirements() {
        let (graph, _) = diamond();
        let tree = graph.print_tree(None);
        let expected = "\
app (graft.toml)
├── a/1.0
│   └── c/1.0
├── b/1.0
│   └── c/1.0
└── cmake/3.16 (build)
";
        assert_eq!(tree, expected);
    }

    #[test]
    fn print_tree_respects_depth() {
        let (graph, _) = diamond();
        let tree = graph.print_tree(Some(1));
        assert!(!tree.contains("c/1.0"));
        assert!(tree.contains("b/1.0"));
    }

    #[test]
    fn find_path_to_package() {
        let (graph, _) = diamond();
        let path: Vec<String> = graph
            .find_path("c")
            .unwrap()
            .iter()
            .map(|n| n.to_string())
            .collect();
        assert_eq!(path, vec!["app (graft.toml)", "a/1.0", "c/1.0"]);
        assert!(graph.find_path("zlib").is_none());
    }

    #[test]
    fn package_ids() {
        let (mut graph, n) = diamond();
        assert_eq!(graph.nodes_without_package_id().len(), 5);
        graph.set_package_id(n[3], "abc");
        assert!(!graph.nodes_without_package_id().contains(&n[3]));
    }
}
