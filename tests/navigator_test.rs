//! Integration tests for traversal and pathfinding.

use rstest::rstest;
use serde_json::json;

use kastle::domain::{ErrorKind, NodeId, VersionId};
use kastle::infrastructure::di::ServiceContainer;
use kastle::util::testing;

/// A version with `count` nodes, wired by index pairs in insertion order.
fn version_with(
    count: usize,
    edges: &[(usize, usize)],
) -> (ServiceContainer, VersionId, Vec<NodeId>) {
    testing::init_test_setup();
    let c = ServiceContainer::in_memory().expect("in-memory container");
    let tree = c.graph.create_tree("T").unwrap();
    let v = c.graph.create_version(tree.id, None, None).unwrap();
    let nodes: Vec<NodeId> = (0..count)
        .map(|i| c.graph.add_node(v.id, json!({ "n": i })).unwrap().id)
        .collect();
    for &(from, to) in edges {
        c.graph
            .add_edge(v.id, nodes[from], nodes[to], json!({"relation": "dependency"}))
            .unwrap();
    }
    (c, v.id, nodes)
}

fn order(c: &ServiceContainer, v: VersionId, start: NodeId) -> Vec<NodeId> {
    c.navigator
        .traverse(v, start)
        .unwrap()
        .into_iter()
        .map(|step| step.node.id)
        .collect()
}

#[test]
fn given_two_connected_nodes_when_navigating_then_edge_is_directed() {
    let (c, v, n) = version_with(2, &[(0, 1)]);

    assert_eq!(order(&c, v, n[0]), vec![n[0], n[1]]);
    assert_eq!(c.navigator.find_path(v, n[0], n[1]).unwrap(), vec![n[0], n[1]]);
    assert!(c.navigator.find_path(v, n[1], n[0]).unwrap().is_empty());
}

#[test]
fn given_traversal_when_visiting_then_each_step_carries_outgoing_edges() {
    let (c, v, n) = version_with(3, &[(0, 1), (0, 2)]);

    let steps = c.navigator.traverse(v, n[0]).unwrap();

    assert_eq!(steps[0].edges.len(), 2);
    assert_eq!(steps[0].edges[0].outgoing_node_id, n[1]);
    assert!(steps[1].edges.is_empty());
    assert_eq!(steps[0].edges[0].data, json!({"relation": "dependency"}));
}

#[rstest]
#[case::self_loop(1, vec![(0, 0)])]
#[case::two_cycle(2, vec![(0, 1), (1, 0)])]
#[case::ring(4, vec![(0, 1), (1, 2), (2, 3), (3, 0)])]
#[case::dense(3, vec![(0, 1), (1, 0), (1, 2), (2, 1), (2, 0), (0, 2)])]
fn given_cyclic_graph_when_traversing_then_terminates_with_each_node_once(
    #[case] count: usize,
    #[case] edges: Vec<(usize, usize)>,
) {
    let (c, v, n) = version_with(count, &edges);

    let mut seen = order(&c, v, n[0]);

    assert_eq!(seen.len(), count);
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), count);
}

#[rstest]
#[case::chain(vec![(0, 1), (1, 2), (2, 3)], vec![0, 1, 2, 3])]
#[case::branches(vec![(0, 1), (1, 3), (0, 2)], vec![0, 1, 3, 2])]
#[case::diamond(vec![(0, 1), (0, 2), (1, 3), (2, 3)], vec![0, 1, 3, 2])]
fn given_graph_when_traversing_then_preorder_in_edge_order(
    #[case] edges: Vec<(usize, usize)>,
    #[case] expected: Vec<usize>,
) {
    let (c, v, n) = version_with(4, &edges);

    let expected: Vec<NodeId> = expected.into_iter().map(|i| n[i]).collect();
    assert_eq!(order(&c, v, n[0]), expected);
}

#[test]
fn given_start_equals_end_when_finding_path_then_single_node() {
    let (c, v, n) = version_with(2, &[(0, 1)]);

    assert_eq!(c.navigator.find_path(v, n[1], n[1]).unwrap(), vec![n[1]]);
}

#[test]
fn given_longer_path_first_in_edge_order_when_finding_path_then_not_shortest() {
    // 0 -> 1 -> 2 -> 3 was added before the shortcut 0 -> 3
    let (c, v, n) = version_with(4, &[(0, 1), (1, 2), (2, 3), (0, 3)]);

    let path = c.navigator.find_path(v, n[0], n[3]).unwrap();

    assert_eq!(path, vec![n[0], n[1], n[2], n[3]]);
}

#[test]
fn given_dead_end_branch_when_finding_path_then_backtracks() {
    let (c, v, n) = version_with(5, &[(0, 1), (1, 2), (0, 3), (3, 4)]);

    let path = c.navigator.find_path(v, n[0], n[4]).unwrap();

    assert_eq!(path, vec![n[0], n[3], n[4]]);
}

#[test]
fn given_cycle_without_target_when_finding_path_then_empty() {
    let (c, v, n) = version_with(3, &[(0, 1), (1, 0)]);

    assert!(c.navigator.find_path(v, n[0], n[2]).unwrap().is_empty());
}

#[test]
fn given_node_of_other_version_when_traversing_then_not_found() {
    let (c, v, n) = version_with(1, &[]);
    let tree = c.graph.version(v).unwrap().tree_id;
    let other = c.graph.create_version(tree, None, None).unwrap();

    let err = c.navigator.traverse(other.id, n[0]).unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::NotFound));

    let err = c.navigator.find_path(other.id, n[0], n[0]).unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::NotFound));
}

#[test]
fn given_long_chain_when_walking_then_no_stack_overflow() {
    let count = 5_000;
    let edges: Vec<(usize, usize)> = (0..count - 1).map(|i| (i, i + 1)).collect();
    let (c, v, n) = version_with(count, &edges);

    assert_eq!(order(&c, v, n[0]).len(), count);
    assert_eq!(c.navigator.find_path(v, n[0], n[count - 1]).unwrap().len(), count);
}

#[test]
fn given_navigator_when_consumed_lazily_then_stops_early() {
    let (c, v, n) = version_with(3, &[(0, 1), (1, 2)]);

    let first_two: Vec<NodeId> = c
        .navigator
        .with_navigator(|nav| Ok(nav.traverse(v, n[0])?.take(2).map(|s| s.node.id).collect()))
        .unwrap();

    assert_eq!(first_two, vec![n[0], n[1]]);
}

#[test]
fn given_restored_version_when_traversing_then_same_shape_as_source() {
    let (c, v, n) = version_with(3, &[(0, 1), (1, 2)]);
    let tree = c.graph.version(v).unwrap().tree_id;
    c.versions.create_tag(tree, "v1.0", None).unwrap();

    let copy = c.versions.restore_from_tag(tree, "v1.0").unwrap();
    let copy_root = c.graph.nodes(copy.id).unwrap()[0].id;

    let source: Vec<_> = c
        .navigator
        .traverse(v, n[0])
        .unwrap()
        .into_iter()
        .map(|s| s.node.data)
        .collect();
    let copied: Vec<_> = c
        .navigator
        .traverse(copy.id, copy_root)
        .unwrap()
        .into_iter()
        .map(|s| s.node.data)
        .collect();
    assert_eq!(copied, source);
}
