//! Per-node visibility sets and the rules that keep them consistent while
//! the graph grows.
//!
//! Every node owns one [`NodeClosure`] in the [`ClosureStore`], addressed by
//! its graph index:
//!
//! - `ancestors`: names on the paths from the root to the node, for loop detection.
//! - `public_deps`: names visible for conflict checks, used to detect diamonds.
//! - `public_closure`: every node reachable from this one, in discovery order.
//! - `transitive_closure`: the publicly propagating part of the reachable set.
//! - `dependents`: nodes that already depend on this one publicly.

use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use indexmap::IndexMap;
use petgraph::graph::NodeIndex;

/// Conflict-visible names of a node.
///
/// Public children start from their parent's map and private children from
/// their parent's reachable set. The map is shared until the first write and
/// copied then, so inheriting it is cheap and no write leaks into another node.
#[derive(Debug, Clone, Default)]
pub struct PublicDeps(Rc<BTreeMap<String, NodeIndex>>);

impl PublicDeps {
    /// A handle to the same map; the next write on either side copies it.
    pub fn share(&self) -> Self {
        Self(Rc::clone(&self.0))
    }

    pub fn get(&self, name: &str) -> Option<NodeIndex> {
        self.0.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn insert(&mut self, name: &str, node: NodeIndex) {
        Rc::make_mut(&mut self.0).insert(name.to_string(), node);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &NodeIndex)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, NodeIndex)> for PublicDeps {
    fn from_iter<I: IntoIterator<Item = (String, NodeIndex)>>(iter: I) -> Self {
        Self(Rc::new(iter.into_iter().collect()))
    }
}

/// Visibility state of one node.
#[derive(Debug, Clone)]
pub struct NodeClosure {
    name: String,
    ancestors: BTreeSet<String>,
    public_deps: PublicDeps,
    public_closure: IndexMap<String, NodeIndex>,
    transitive_closure: IndexMap<String, NodeIndex>,
    dependents: BTreeSet<NodeIndex>,
}

impl NodeClosure {
    fn new(name: &str, node: NodeIndex) -> Self {
        let own: IndexMap<String, NodeIndex> = IndexMap::from([(name.to_string(), node)]);
        Self {
            name: name.to_string(),
            ancestors: BTreeSet::new(),
            public_deps: PublicDeps::default(),
            public_closure: own.clone(),
            transitive_closure: own,
            dependents: BTreeSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ancestors(&self) -> &BTreeSet<String> {
        &self.ancestors
    }

    pub fn public_deps(&self) -> &PublicDeps {
        &self.public_deps
    }

    pub fn public_closure(&self) -> &IndexMap<String, NodeIndex> {
        &self.public_closure
    }

    pub fn transitive_closure(&self) -> &IndexMap<String, NodeIndex> {
        &self.transitive_closure
    }

    pub fn dependents(&self) -> &BTreeSet<NodeIndex> {
        &self.dependents
    }
}

/// Closures of every node of a graph, indexed like the graph's nodes.
#[derive(Debug, Clone, Default)]
pub struct ClosureStore {
    closures: Vec<NodeClosure>,
}

impl ClosureStore {
    pub fn get(&self, node: NodeIndex) -> &NodeClosure {
        &self.closures[node.index()]
    }

    fn get_mut(&mut self, node: NodeIndex) -> &mut NodeClosure {
        &mut self.closures[node.index()]
    }

    /// Register a node. Its reachable and transitive sets start with itself.
    pub(crate) fn push(&mut self, node: NodeIndex, name: &str) {
        debug_assert_eq!(node.index(), self.closures.len());
        self.closures.push(NodeClosure::new(name, node));
    }

    /// The root sees only itself and has no ancestors.
    pub(crate) fn init_root(&mut self, root: NodeIndex) {
        let closure = self.get_mut(root);
        let name = closure.name.clone();
        closure.ancestors.clear();
        closure.public_deps = PublicDeps::default();
        closure.public_deps.insert(&name, root);
    }

    /// Link a just created `child` under `parent`.
    ///
    /// An isolated (private or build) child checks conflicts only against
    /// what the parent can already reach. A public child inherits the
    /// parent's conflict scope, joins the parent's transitive set and becomes
    /// reachable from everything that already depends on the parent.
    pub(crate) fn attach(&mut self, parent: NodeIndex, child: NodeIndex, isolated: bool) {
        let name = self.get(child).name.clone();
        let mut ancestors = self.get(parent).ancestors.clone();
        let parent_name = &self.get(parent).name;
        if !parent_name.is_empty() {
            ancestors.insert(parent_name.clone());
        }
        self.get_mut(child).ancestors = ancestors;

        if isolated {
            self.connect_reachable(parent, child);
            let mut deps: PublicDeps = self
                .get(parent)
                .public_closure
                .iter()
                .map(|(k, v)| (k.clone(), *v))
                .collect();
            deps.insert(&name, child);
            self.get_mut(child).public_deps = deps;
        } else {
            self.connect(parent, child);
            self.get_mut(parent)
                .transitive_closure
                .insert(name.clone(), child);
            let mut deps = self.get(parent).public_deps.share();
            deps.insert(&name, child);
            self.get_mut(child).public_deps = deps;

            let dependents: Vec<NodeIndex> = self.get(parent).dependents.iter().copied().collect();
            for dependent in dependents {
                self.connect(dependent, child);
            }
        }
    }

    /// Make `to` reachable and conflict-visible from `from`, and record
    /// `from` as one of its dependents.
    pub(crate) fn connect(&mut self, from: NodeIndex, to: NodeIndex) {
        let name = self.get(to).name.clone();
        let closure = self.get_mut(from);
        closure.public_closure.insert(name.clone(), to);
        closure.public_deps.insert(&name, to);
        self.get_mut(to).dependents.insert(from);
    }

    /// Make `to` reachable from `from` without exposing it to conflict
    /// checks or making `from` a dependent.
    pub(crate) fn connect_reachable(&mut self, from: NodeIndex, to: NodeIndex) {
        let name = self.get(to).name.clone();
        self.get_mut(from).public_closure.insert(name, to);
    }

    /// Add the transitive set of `from` to the transitive set of `into`.
    pub(crate) fn merge_transitive(&mut self, into: NodeIndex, from: NodeIndex) {
        if into == from {
            return;
        }
        let upstream = self.get(from).transitive_closure.clone();
        let target = &mut self.get_mut(into).transitive_closure;
        for (name, node) in upstream {
            target.insert(name, node);
        }
    }

    /// A new path now reaches `previous` through `via`: every node reachable
    /// from `previous` gains the ancestors of `via` plus `via` itself.
    ///
    /// Fails with the first reachable node whose own name would become one of
    /// its ancestors.
    pub(crate) fn extend_ancestors(
        &mut self,
        previous: NodeIndex,
        via: NodeIndex,
    ) -> Result<(), NodeIndex> {
        let mut union = self.get(via).ancestors.clone();
        let via_name = &self.get(via).name;
        if !via_name.is_empty() {
            union.insert(via_name.clone());
        }
        let reachable: Vec<NodeIndex> = self
            .get(previous)
            .public_closure
            .values()
            .copied()
            .collect();
        for node in reachable {
            let closure = self.get_mut(node);
            if union.contains(&closure.name) {
                return Err(node);
            }
            closure.ancestors.extend(union.iter().cloned());
        }
        Ok(())
    }

    /// Move the entries of `node`'s reachable set that are in `first` ahead
    /// of the others, keeping the relative order within both groups.
    pub(crate) fn prioritize(&mut self, node: NodeIndex, first: &BTreeSet<NodeIndex>) {
        self.get_mut(node)
            .public_closure
            .sort_by(|_, a, _, b| (!first.contains(a)).cmp(&!first.contains(b)));
    }

    pub fn len(&self) -> usize {
        self.closures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closures.is_empty()
    }
}
