mod common;

use common::*;
use graft_core::lockfile::{GraphLockFile, LockedNode};
use graft_core::provider::GraphLock;
use graft_recipes::index::RecipeIndex;
use graft_resolver::lock::capture_lock;
use graft_resolver::version::SemverRangeResolver;
use graft_resolver::{DepsGraph, GraphBuilder, ResolveError, ResolveOptions};
use tempfile::TempDir;

fn diamond_index() -> RecipeIndex {
    let mut index = RecipeIndex::new();
    package(&mut index, "a/1.0", &["c/[>=1.0 <2]"]);
    package(&mut index, "b/1.0", &["c/1.0"]);
    package(&mut index, "c/1.0", &[]);
    index
}

fn load_locked(index: &RecipeIndex, lock: &GraphLockFile) -> Result<DepsGraph, ResolveError> {
    let resolver = SemverRangeResolver::new(index);
    GraphBuilder::new(index, index, &resolver).load_graph(
        root(vec![req("a/1.0"), req("b/1.0")]),
        &ResolveOptions::default(),
        Some(lock as &dyn GraphLock),
    )
}

fn summary(graph: &DepsGraph) -> Vec<(usize, String)> {
    graph
        .nodes()
        .map(|(_, node)| (node.id, node.to_string()))
        .collect()
}

#[test]
fn captured_lock_lists_every_node() {
    let index = diamond_index();
    let graph = load(&index, root(vec![req("a/1.0"), req("b/1.0")])).unwrap();
    let lock = capture_lock(&graph);

    assert_eq!(lock.root, 0);
    assert_eq!(lock.nodes.len(), 4);
    assert_eq!(lock.node(0).unwrap().requires, vec![1, 3]);
    assert_eq!(lock.node(1).unwrap().requires, vec![2]);
    assert_eq!(lock.node(3).unwrap().requires, vec![2]);
    assert_eq!(lock.node(2).unwrap().reference, Some(r("c/1.0")));
    assert_eq!(lock.node(0).unwrap().reference, None);
}

#[test]
fn locked_graph_reproduces_ids() {
    let index = diamond_index();
    let graph = load(&index, root(vec![req("a/1.0"), req("b/1.0")])).unwrap();
    let lock = capture_lock(&graph);

    let locked = load_locked(&index, &lock).unwrap();
    assert_eq!(summary(&locked), summary(&graph));
    assert_eq!(locked.print_tree(None), graph.print_tree(None));
}

#[test]
fn lock_wins_over_newer_versions() {
    let index = diamond_index();
    let graph = load(&index, root(vec![req("a/1.0"), req("b/1.0")])).unwrap();
    let lock = capture_lock(&graph);

    let mut newer = diamond_index();
    package(&mut newer, "c/1.5", &[]);
    let unlocked = load(&newer, root(vec![req("a/1.0")])).unwrap();
    assert_eq!(versions_of(&unlocked, "c"), vec!["c/1.5"]);

    let locked = load_locked(&newer, &lock).unwrap();
    assert_eq!(versions_of(&locked, "c"), vec!["c/1.0"]);
}

#[test]
fn lock_survives_a_round_trip_through_disk() {
    let index = diamond_index();
    let graph = load(&index, root(vec![req("a/1.0"), req("b/1.0")])).unwrap();

    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("graft.lock");
    capture_lock(&graph).write(&path).unwrap();
    let lock = GraphLockFile::from_path(&path).unwrap();

    let locked = load_locked(&index, &lock).unwrap();
    assert_eq!(summary(&locked), summary(&graph));
}

#[test]
fn unknown_root_id_is_a_lock_error() {
    let index = diamond_index();
    let mut lock = GraphLockFile {
        root: 5,
        ..Default::default()
    };
    lock.insert(
        0,
        LockedNode {
            requires: vec![1],
            ..Default::default()
        },
    );

    let err = load_locked(&index, &lock).unwrap_err();
    match err {
        ResolveError::Lock { consumer, message } => {
            assert_eq!(consumer, "app/0.1");
            assert!(message.contains("node 5 is not in the lockfile"), "got: {message}");
        }
        other => panic!("expected a lock error, got {other}"),
    }
}

#[test]
fn build_requires_keep_their_locked_ids() {
    let mut index = diamond_index();
    package(&mut index, "cmake/3.16", &[]);
    let resolver = SemverRangeResolver::new(&index);
    let builder = GraphBuilder::new(&index, &index, &resolver);
    let opts = ResolveOptions::default();
    let cmake = [r("cmake/3.16")];

    let mut graph = builder
        .load_graph(root(vec![req("a/1.0"), req("b/1.0")]), &opts, None)
        .unwrap();
    let root_idx = graph.root().unwrap();
    builder
        .extend_build_requires(&mut graph, root_idx, &cmake, &opts, None)
        .unwrap();
    let lock = capture_lock(&graph);
    assert_eq!(lock.node(0).unwrap().build_requires, vec![4]);

    let mut locked = builder
        .load_graph(
            root(vec![req("a/1.0"), req("b/1.0")]),
            &opts,
            Some(&lock as &dyn GraphLock),
        )
        .unwrap();
    let root_idx = locked.root().unwrap();
    builder
        .extend_build_requires(
            &mut locked,
            root_idx,
            &cmake,
            &opts,
            Some(&lock as &dyn GraphLock),
        )
        .unwrap();
    let node = locked.node(single(&locked, "cmake"));
    assert_eq!(node.id, 4);
    assert_eq!(summary(&locked), summary(&graph));
}

#[test]
fn package_required_both_ways_stays_in_both_lock_lists() {
    let mut index = RecipeIndex::new();
    package(&mut index, "x/1.0", &[]);
    let resolver = SemverRangeResolver::new(&index);
    let builder = GraphBuilder::new(&index, &index, &resolver);
    let opts = ResolveOptions::default();
    let x = [r("x/1.0")];

    let mut graph = builder.load_graph(root(vec![req("x/1.0")]), &opts, None).unwrap();
    let root_idx = graph.root().unwrap();
    builder
        .extend_build_requires(&mut graph, root_idx, &x, &opts, None)
        .unwrap();

    let flags: Vec<bool> = graph
        .dependencies_of(root_idx)
        .into_iter()
        .map(|(_, req)| req.build_require)
        .collect();
    assert_eq!(flags, vec![false, true]);

    let lock = capture_lock(&graph);
    assert_eq!(lock.node(0).unwrap().requires, vec![1]);
    assert_eq!(lock.node(0).unwrap().build_requires, vec![1]);

    let mut locked = builder
        .load_graph(root(vec![req("x/1.0")]), &opts, Some(&lock as &dyn GraphLock))
        .unwrap();
    let root_idx = locked.root().unwrap();
    builder
        .extend_build_requires(&mut locked, root_idx, &x, &opts, Some(&lock as &dyn GraphLock))
        .unwrap();
    assert_eq!(summary(&locked), summary(&graph));
    let relocked = capture_lock(&locked);
    assert_eq!(relocked.node(0).unwrap().requires, vec![1]);
    assert_eq!(relocked.node(0).unwrap().build_requires, vec![1]);
}
