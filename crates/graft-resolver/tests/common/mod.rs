#![allow(dead_code)]

use graft_core::manifest::Manifest;
use graft_core::reference::PackageRef;
use graft_core::requirement::Requirement;
use graft_recipes::index::RecipeIndex;
use graft_resolver::version::SemverRangeResolver;
use graft_resolver::{DepsGraph, GraphBuilder, ResolveOptions, ResolveResult};
use petgraph::graph::NodeIndex;

pub fn r(text: &str) -> PackageRef {
    PackageRef::parse(text).unwrap()
}

/// Add a plain package `name/version` requiring `requires`.
pub fn package(index: &mut RecipeIndex, reference: &str, requires: &[&str]) {
    let reference = r(reference);
    let requires: Vec<String> = requires.iter().map(|s| format!("\"{s}\"")).collect();
    let mut toml = format!(
        "requires = [{}]\n\n[package]\nname = \"{}\"\nversion = \"{}\"\n",
        requires.join(", "),
        reference.name,
        reference.version
    );
    if let Some(rev) = &reference.revision {
        toml.push_str(&format!("revision = \"{rev}\"\n"));
    }
    index.add_str(&toml).unwrap();
}

pub fn alias(index: &mut RecipeIndex, reference: &str, target: &str) {
    let reference = r(reference);
    index
        .add_str(&format!(
            "alias = \"{target}\"\n\n[package]\nname = \"{}\"\nversion = \"{}\"\n",
            reference.name, reference.version
        ))
        .unwrap();
}

/// The root recipe `app/0.1` with the given requirements.
pub fn root(requires: Vec<Requirement>) -> Manifest {
    let mut manifest = Manifest::for_package("app", "0.1");
    for req in requires {
        manifest.requires.insert(req);
    }
    manifest
}

pub fn req(text: &str) -> Requirement {
    Requirement::new(r(text))
}

pub fn load(index: &RecipeIndex, root: Manifest) -> ResolveResult<DepsGraph> {
    load_with(index, root, &ResolveOptions::default())
}

pub fn load_with(index: &RecipeIndex, root: Manifest, opts: &ResolveOptions) -> ResolveResult<DepsGraph> {
    let resolver = SemverRangeResolver::new(index);
    GraphBuilder::new(index, index, &resolver).load_graph(root, opts, None)
}

/// References of every node of package `name`, in creation order.
pub fn versions_of(graph: &DepsGraph, name: &str) -> Vec<String> {
    graph
        .find_by_name(name)
        .into_iter()
        .map(|idx| graph.node(idx).to_string())
        .collect()
}

pub fn single(graph: &DepsGraph, name: &str) -> NodeIndex {
    let found = graph.find_by_name(name);
    assert_eq!(found.len(), 1, "expected one '{name}' node, found {found:?}");
    found[0]
}
