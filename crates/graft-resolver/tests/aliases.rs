mod common;

use std::cell::RefCell;
use std::collections::BTreeMap;

use common::*;
use graft_core::config::Remote;
use graft_core::provider::{RecipeInfo, RecipeProvider};
use graft_core::reference::PackageRef;
use graft_recipes::index::RecipeIndex;
use graft_resolver::alias::AliasTable;
use graft_resolver::version::SemverRangeResolver;
use graft_resolver::{GraphBuilder, ResolveError, ResolveOptions};

/// Counts how often each reference is fetched.
struct CountingProvider<'a> {
    index: &'a RecipeIndex,
    fetched: RefCell<BTreeMap<String, u32>>,
}

impl<'a> CountingProvider<'a> {
    fn new(index: &'a RecipeIndex) -> Self {
        Self {
            index,
            fetched: RefCell::new(BTreeMap::new()),
        }
    }

    fn count(&self, reference: &str) -> u32 {
        self.fetched.borrow().get(reference).copied().unwrap_or(0)
    }
}

impl RecipeProvider for CountingProvider<'_> {
    fn get_recipe(
        &self,
        reference: &PackageRef,
        check_updates: bool,
        update: bool,
        remotes: &[Remote],
    ) -> miette::Result<RecipeInfo> {
        *self
            .fetched
            .borrow_mut()
            .entry(reference.to_string())
            .or_default() += 1;
        self.index.get_recipe(reference, check_updates, update, remotes)
    }
}

#[test]
fn alias_chains_collapse() {
    let mut index = RecipeIndex::new();
    alias(&mut index, "zlib/latest", "zlib/stable");
    alias(&mut index, "zlib/stable", "zlib/1.2.11");
    package(&mut index, "zlib/1.2.11", &[]);

    let graph = load(&index, root(vec![req("zlib/latest")])).unwrap();
    assert_eq!(versions_of(&graph, "zlib"), vec!["zlib/1.2.11"]);
    assert_eq!(graph.aliased.get(&r("zlib/latest")), Some(&r("zlib/1.2.11")));
    assert_eq!(graph.aliased.get(&r("zlib/stable")), Some(&r("zlib/1.2.11")));
}

#[test]
fn alias_cycle_is_an_error() {
    let mut index = RecipeIndex::new();
    alias(&mut index, "zlib/latest", "zlib/next");
    alias(&mut index, "zlib/next", "zlib/latest");

    let err = load(&index, root(vec![req("zlib/latest")])).unwrap_err();
    match err {
        ResolveError::AliasCycle { reference, chain } => {
            assert_eq!(reference, "zlib/latest");
            assert_eq!(chain, "zlib/latest -> zlib/next -> zlib/latest");
        }
        other => panic!("expected an alias cycle, got {other}"),
    }
}

#[test]
fn second_path_uses_the_cached_alias() {
    let mut index = RecipeIndex::new();
    package(&mut index, "x/1.0", &["zlib/latest"]);
    package(&mut index, "y/1.0", &["zlib/latest"]);
    alias(&mut index, "zlib/latest", "zlib/1.2.11");
    package(&mut index, "zlib/1.2.11", &[]);

    let provider = CountingProvider::new(&index);
    let resolver = SemverRangeResolver::new(&index);
    let builder = GraphBuilder::new(&provider, &index, &resolver);
    let graph = builder
        .load_graph(
            root(vec![req("x/1.0"), req("y/1.0")]),
            &ResolveOptions::default(),
            None,
        )
        .unwrap();

    assert_eq!(provider.count("zlib/latest"), 1);
    let zlib = single(&graph, "zlib");
    assert_eq!(graph.dependents_of(zlib).len(), 2);
    for (_, requirement) in graph.dependents_of(zlib) {
        assert_eq!(requirement.reference, r("zlib/1.2.11"));
    }
}

#[test]
fn alias_reconciles_a_diamond() {
    let mut index = RecipeIndex::new();
    package(&mut index, "a/1.0", &["zlib/1.2.11"]);
    package(&mut index, "b/1.0", &["zlib/latest"]);
    alias(&mut index, "zlib/latest", "zlib/1.2.11");
    package(&mut index, "zlib/1.2.11", &[]);

    let graph = load(&index, root(vec![req("a/1.0"), req("b/1.0")])).unwrap();
    let zlib = single(&graph, "zlib");
    assert_eq!(graph.dependents_of(zlib).len(), 2);
    assert_eq!(graph.aliased.len(), 1);
}

#[test]
fn alias_to_a_different_version_still_conflicts() {
    let mut index = RecipeIndex::new();
    package(&mut index, "a/1.0", &["zlib/1.2.11"]);
    package(&mut index, "b/1.0", &["zlib/latest"]);
    alias(&mut index, "zlib/latest", "zlib/1.3");
    package(&mut index, "zlib/1.2.11", &[]);
    package(&mut index, "zlib/1.3", &[]);

    let err = load(&index, root(vec![req("a/1.0"), req("b/1.0")])).unwrap_err();
    match err {
        ResolveError::ReferenceConflict {
            requested, previous, ..
        } => {
            assert_eq!(requested, "zlib/1.3");
            assert_eq!(previous, "zlib/1.2.11");
        }
        other => panic!("expected a reference conflict, got {other}"),
    }
}

#[test]
fn seeded_table_skips_the_alias_recipe() {
    let mut index = RecipeIndex::new();
    package(&mut index, "zlib/1.2.11", &[]);
    let mut aliases = AliasTable::new();
    aliases.insert(&r("zlib/latest"), r("zlib/1.2.11"));

    let resolver = SemverRangeResolver::new(&index);
    let graph = GraphBuilder::new(&index, &index, &resolver)
        .load_graph_with_aliases(
            root(vec![req("zlib/latest")]),
            &ResolveOptions::default(),
            None,
            aliases,
        )
        .unwrap();
    assert_eq!(versions_of(&graph, "zlib"), vec!["zlib/1.2.11"]);
}

#[test]
fn alias_to_missing_target_fails() {
    let mut index = RecipeIndex::new();
    alias(&mut index, "zlib/latest", "zlib/9.9");

    let err = load(&index, root(vec![req("zlib/latest")])).unwrap_err();
    match err {
        ResolveError::RecipeResolution { requirement, .. } => {
            assert_eq!(requirement, "zlib/9.9");
        }
        other => panic!("expected a recipe failure, got {other}"),
    }
}
