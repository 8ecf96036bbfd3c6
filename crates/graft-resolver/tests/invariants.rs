mod common;

use common::*;
use graft_recipes::index::RecipeIndex;
use graft_resolver::DepsGraph;

/// app -> a -> (c, d), app -> b -(private)-> e -> c/2.0, b -> d -> c
fn wide_index() -> RecipeIndex {
    let mut index = RecipeIndex::new();
    package(&mut index, "a/1.0", &["c/1.0", "d/1.0"]);
    index
        .add_str(
            r#"
[package]
name = "b"
version = "1.0"

[[requirement]]
ref = "e/1.0"
private = true

[[requirement]]
ref = "d/1.0"
"#,
        )
        .unwrap();
    package(&mut index, "c/1.0", &[]);
    package(&mut index, "c/2.0", &[]);
    package(&mut index, "d/1.0", &["c/1.0"]);
    package(&mut index, "e/1.0", &["c/2.0"]);
    index
}

fn wide_graph() -> DepsGraph {
    load(&wide_index(), root(vec![req("a/1.0"), req("b/1.0")])).unwrap()
}

#[test]
fn resolution_is_deterministic() {
    let first = wide_graph();
    let second = wide_graph();
    assert_eq!(first.print_tree(None), second.print_tree(None));

    let ids = |graph: &DepsGraph| -> Vec<(usize, String)> {
        graph
            .nodes()
            .map(|(_, node)| (node.id, node.to_string()))
            .collect()
    };
    assert_eq!(ids(&first), ids(&second));
}

#[test]
fn no_node_is_its_own_ancestor() {
    let graph = wide_graph();
    for (idx, node) in graph.nodes() {
        assert!(
            !graph.closure(idx).ancestors().contains(&node.name),
            "{node} lists itself as an ancestor"
        );
    }
}

#[test]
fn public_edges_agree_with_the_conflict_scope() {
    let graph = wide_graph();
    for (from, to, requirement) in graph.edges() {
        if requirement.is_isolated() {
            continue;
        }
        let target = graph.node(to);
        let visible = graph.closure(from).public_deps().get(&target.name);
        assert_eq!(visible, Some(to), "{} -> {target}", graph.node(from));
    }
}

#[test]
fn private_subtree_stays_out_of_the_root_scope() {
    let graph = wide_graph();
    assert_eq!(versions_of(&graph, "c"), vec!["c/1.0", "c/2.0"]);

    let root = graph.root().unwrap();
    let c_public = graph.find_by_name("c")[0];
    assert_eq!(graph.closure(root).public_deps().get("c"), Some(c_public));
    assert!(!graph.closure(root).public_deps().contains("e"));

    let b = single(&graph, "b");
    let e = single(&graph, "e");
    assert!(graph.closure(b).public_closure().contains_key("e"));
    assert!(!graph.closure(e).dependents().contains(&b));
}

#[test]
fn every_edge_points_at_a_node_of_the_requested_name() {
    let graph = wide_graph();
    for (_, to, requirement) in graph.edges() {
        assert_eq!(graph.node(to).name, requirement.name());
        assert_eq!(
            graph.node(to).reference.as_ref(),
            Some(&requirement.reference)
        );
    }
}

#[test]
fn shared_dependency_is_reachable_from_every_dependent() {
    let graph = wide_graph();
    let c = graph.find_by_name("c")[0];
    for name in ["app", "a", "b", "d"] {
        let node = graph.find_by_name(name)[0];
        assert_eq!(
            graph.closure(node).public_closure().get("c"),
            Some(&c),
            "c not reachable from {name}"
        );
    }
}
