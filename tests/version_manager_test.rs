//! Integration tests for tagging, restoring and branching.

use serde_json::{json, Value};

use kastle::application::ApplicationError;
use kastle::domain::{DomainError, ErrorKind, TreeEdge, TreeId, TreeNode, VersionId};
use kastle::infrastructure::di::ServiceContainer;
use kastle::util::testing;

struct Fixture {
    c: ServiceContainer,
    tree: TreeId,
    v1: VersionId,
}

/// Tree "T" with V1 = N1 {"setting":"value1"} -> N2 {"setting":"value2"}.
fn fixture() -> Fixture {
    testing::init_test_setup();
    let c = ServiceContainer::in_memory().expect("in-memory container");
    let tree = c.graph.create_tree("T").unwrap();
    let v1 = c.graph.create_version(tree.id, None, None).unwrap();
    let n1 = c.graph.add_node(v1.id, json!({"setting": "value1"})).unwrap();
    let n2 = c.graph.add_node(v1.id, json!({"setting": "value2"})).unwrap();
    c.graph
        .add_edge(v1.id, n1.id, n2.id, json!({"relation": "dependency"}))
        .unwrap();
    Fixture {
        c,
        tree: tree.id,
        v1: v1.id,
    }
}

fn payloads(nodes: &[TreeNode]) -> Vec<Value> {
    nodes.iter().map(|n| n.data.clone()).collect()
}

/// Edges as (source payload, target payload, edge payload).
fn topology(c: &ServiceContainer, version: VersionId) -> Vec<(Value, Value, Value)> {
    c.graph
        .edges(version)
        .unwrap()
        .iter()
        .map(|e: &TreeEdge| {
            (
                c.graph.node(e.incoming_node_id).unwrap().data,
                c.graph.node(e.outgoing_node_id).unwrap().data,
                e.data.clone(),
            )
        })
        .collect()
}

// ============================================================
// create_tag
// ============================================================

#[test]
fn given_current_version_when_tagging_then_tag_and_description_set() {
    let f = fixture();

    let tagged = f.c.versions.create_tag(f.tree, "v1.0", Some("baseline")).unwrap();

    assert_eq!(tagged.id, f.v1);
    assert_eq!(tagged.tag.as_deref(), Some("v1.0"));
    assert_eq!(tagged.description.as_deref(), Some("baseline"));
    assert!(tagged.tag_created_at.is_some());
    assert_eq!(f.c.graph.find_version_by_tag(f.tree, "v1.0").unwrap().id, f.v1);
}

#[test]
fn given_tag_used_by_other_version_when_tagging_current_then_conflict() {
    let f = fixture();
    f.c.versions.create_tag(f.tree, "v1.0", None).unwrap();
    f.c.graph.create_version(f.tree, None, None).unwrap();

    let err = f.c.versions.create_tag(f.tree, "v1.0", None).unwrap_err();

    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::DuplicateTag { .. })
    ));
    assert_eq!(err.kind(), Some(ErrorKind::Conflict));
}

#[test]
fn given_same_tag_on_same_version_when_tagging_again_then_allowed() {
    let f = fixture();
    f.c.versions.create_tag(f.tree, "v1.0", None).unwrap();

    let again = f.c.versions.create_tag(f.tree, "v1.0", Some("updated")).unwrap();

    assert_eq!(again.description.as_deref(), Some("updated"));
}

#[test]
fn given_retagged_version_when_looking_up_old_tag_then_not_found() {
    let f = fixture();
    f.c.versions.create_tag(f.tree, "draft", None).unwrap();
    f.c.versions.create_tag(f.tree, "v1.0", None).unwrap();

    assert!(f.c.graph.find_version_by_tag(f.tree, "draft").is_err());
    assert_eq!(f.c.graph.find_version_by_tag(f.tree, "v1.0").unwrap().id, f.v1);
}

#[test]
fn given_tag_with_surrounding_whitespace_when_looking_up_then_found() {
    // Arrange
    let f = fixture();
    f.c.versions.create_tag(f.tree, " v1.0 ", None).unwrap();

    // Act
    let found = f.c.graph.find_version_by_tag(f.tree, "v1.0 ").unwrap();
    let restored = f.c.versions.restore_from_tag(f.tree, " v1.0").unwrap();

    // Assert
    assert_eq!(found.id, f.v1);
    assert_eq!(found.tag.as_deref(), Some("v1.0"));
    assert_eq!(restored.parent_version_id, Some(f.v1));
    assert_eq!(
        restored.description.as_deref(),
        Some("Restored version from tag v1.0")
    );
}

#[test]
fn given_tree_without_versions_when_tagging_then_not_found() {
    let f = fixture();
    let empty = f.c.graph.create_tree("empty").unwrap();

    let err = f.c.versions.create_tag(empty.id, "v1.0", None).unwrap_err();

    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::NoCurrentVersion(_))
    ));
}

// ============================================================
// restore_from_tag
// ============================================================

#[test]
fn given_tagged_version_when_restoring_then_new_current_copy_with_new_identities() {
    let f = fixture();
    f.c.versions.create_tag(f.tree, "v1.0", None).unwrap();
    let original_nodes = f.c.graph.nodes(f.v1).unwrap();
    let original_edges = f.c.graph.edges(f.v1).unwrap();

    let v2 = f.c.versions.restore_from_tag(f.tree, "v1.0").unwrap();

    assert_ne!(v2.id, f.v1);
    assert_eq!(v2.parent_version_id, Some(f.v1));
    assert_eq!(v2.tag, None);
    assert_eq!(
        v2.description.as_deref(),
        Some("Restored version from tag v1.0")
    );
    assert_eq!(f.c.graph.tree(f.tree).unwrap().current_version, Some(v2.id));

    let copied_nodes = f.c.graph.nodes(v2.id).unwrap();
    assert_eq!(payloads(&copied_nodes), payloads(&original_nodes));
    assert!(copied_nodes
        .iter()
        .all(|n| original_nodes.iter().all(|o| o.id != n.id)));
    let copied_edges = f.c.graph.edges(v2.id).unwrap();
    assert_eq!(copied_edges.len(), 1);
    assert_ne!(copied_edges[0].id, original_edges[0].id);
    assert_eq!(topology(&f.c, v2.id), topology(&f.c, f.v1));
}

#[test]
fn given_restore_when_done_then_tagged_version_untouched() {
    let f = fixture();
    let tagged = f.c.versions.create_tag(f.tree, "v1.0", None).unwrap();
    let nodes_before = f.c.graph.nodes(f.v1).unwrap();
    let edges_before = f.c.graph.edges(f.v1).unwrap();

    f.c.versions.restore_from_tag(f.tree, "v1.0").unwrap();

    assert_eq!(f.c.graph.version(f.v1).unwrap(), tagged);
    assert_eq!(f.c.graph.nodes(f.v1).unwrap(), nodes_before);
    assert_eq!(f.c.graph.edges(f.v1).unwrap(), edges_before);
}

#[test]
fn given_tag_when_restored_twice_then_two_independent_versions() {
    let f = fixture();
    f.c.versions.create_tag(f.tree, "v1.0", None).unwrap();

    let first = f.c.versions.restore_from_tag(f.tree, "v1.0").unwrap();
    let second = f.c.versions.restore_from_tag(f.tree, "v1.0").unwrap();

    assert_ne!(first.id, second.id);
    assert_eq!(second.parent_version_id, Some(f.v1));
    assert_eq!(f.c.graph.tree(f.tree).unwrap().current_version, Some(second.id));
    assert_eq!(
        f.c.versions.latest_version(f.tree).unwrap().map(|v| v.id),
        Some(second.id)
    );
}

#[test]
fn given_unknown_tag_when_restoring_then_not_found_and_nothing_changes() {
    let f = fixture();

    let err = f.c.versions.restore_from_tag(f.tree, "missing").unwrap_err();

    assert_eq!(err.kind(), Some(ErrorKind::NotFound));
    assert_eq!(f.c.graph.versions(f.tree).unwrap().len(), 1);
    assert_eq!(f.c.graph.tree(f.tree).unwrap().current_version, Some(f.v1));
}

#[test]
fn given_restored_copy_when_modified_then_tagged_version_unaffected() {
    let f = fixture();
    f.c.versions.create_tag(f.tree, "v1.0", None).unwrap();
    let v2 = f.c.versions.restore_from_tag(f.tree, "v1.0").unwrap();

    f.c.graph.add_node(v2.id, json!({"setting": "value3"})).unwrap();

    assert_eq!(f.c.graph.nodes(f.v1).unwrap().len(), 2);
    assert_eq!(f.c.graph.nodes(v2.id).unwrap().len(), 3);
}

#[test]
fn given_tag_on_other_tree_when_restoring_then_not_found() {
    let f = fixture();
    f.c.versions.create_tag(f.tree, "v1.0", None).unwrap();
    let other = f.c.graph.create_tree("other").unwrap();

    let err = f.c.versions.restore_from_tag(other.id, "v1.0").unwrap_err();

    assert_eq!(err.kind(), Some(ErrorKind::NotFound));
}

// ============================================================
// branch_from_tag and lineage
// ============================================================

#[test]
fn given_tag_when_branching_then_copy_described_as_new_version() {
    let f = fixture();
    f.c.versions.create_tag(f.tree, "v1.0", None).unwrap();

    let branch = f.c.versions.branch_from_tag(f.tree, "v1.0").unwrap();

    assert_eq!(branch.description.as_deref(), Some("New version from tag v1.0"));
    assert_eq!(branch.parent_version_id, Some(f.v1));
    assert_eq!(
        f.c.versions.current_version(f.tree).unwrap().map(|v| v.id),
        Some(branch.id)
    );
}

#[test]
fn given_chain_of_restores_when_asking_lineage_then_newest_first() {
    let f = fixture();
    f.c.versions.create_tag(f.tree, "v1.0", None).unwrap();
    let v2 = f.c.versions.restore_from_tag(f.tree, "v1.0").unwrap();
    f.c.versions.create_tag(f.tree, "v2.0", None).unwrap();
    let v3 = f.c.versions.branch_from_tag(f.tree, "v2.0").unwrap();

    let chain: Vec<VersionId> = f
        .c
        .versions
        .lineage(v3.id)
        .unwrap()
        .iter()
        .map(|v| v.id)
        .collect();

    assert_eq!(chain, vec![v3.id, v2.id, f.v1]);
}
