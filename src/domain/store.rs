//! Indexed record store for trees, versions, nodes and edges.
//!
//! All writes go through a [`Staging`] batch: operations are validated against
//! the committed state plus whatever the batch already staged, and only the
//! resulting [`Record`]s are ever applied. A failed operation therefore never
//! leaves a half-written record behind.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{instrument, trace};

use crate::domain::entities::{
    EdgeId, NodeId, Payload, Tree, TreeEdge, TreeId, TreeNode, TreeVersion, VersionId,
};
use crate::domain::error::{DomainError, DomainResult};

/// Unit of change persisted to the journal and applied to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    Tree(Tree),
    Version(TreeVersion),
    Node(TreeNode),
    Edge(TreeEdge),
    Tag {
        version_id: VersionId,
        tag: String,
        description: Option<String>,
        at: DateTime<Utc>,
    },
    Current {
        tree_id: TreeId,
        version_id: VersionId,
    },
}

/// Next free identity per record kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct IdSequence {
    tree: u64,
    version: u64,
    node: u64,
    edge: u64,
}

impl Default for IdSequence {
    fn default() -> Self {
        Self {
            tree: 1,
            version: 1,
            node: 1,
            edge: 1,
        }
    }
}

fn bump(next: &mut u64) -> u64 {
    let id = *next;
    *next += 1;
    id
}

/// In-memory graph store with the lookups the navigator and version manager need.
#[derive(Debug, Default, Clone)]
pub struct GraphStore {
    trees: BTreeMap<TreeId, Tree>,
    versions: BTreeMap<VersionId, TreeVersion>,
    nodes: BTreeMap<NodeId, TreeNode>,
    edges: BTreeMap<EdgeId, TreeEdge>,
    versions_by_tree: HashMap<TreeId, Vec<VersionId>>,
    nodes_by_version: HashMap<VersionId, Vec<NodeId>>,
    edges_by_version: HashMap<VersionId, Vec<EdgeId>>,
    /// (version, incoming node) -> edges in insertion order
    edges_from: HashMap<(VersionId, NodeId), Vec<EdgeId>>,
    /// (version, outgoing node) -> edges in insertion order
    edges_to: HashMap<(VersionId, NodeId), Vec<EdgeId>>,
    tags: HashMap<(TreeId, String), VersionId>,
    next: IdSequence,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store by replaying records in order.
    pub fn from_records<I>(records: I) -> DomainResult<Self>
    where
        I: IntoIterator<Item = Record>,
    {
        let mut store = Self::new();
        for record in records {
            store.apply(record)?;
        }
        Ok(store)
    }

    /// Start a write batch against the current state.
    pub fn stage(&self) -> Staging<'_> {
        Staging {
            store: self,
            next: self.next,
            records: Vec::new(),
            now: Utc::now(),
            trees: HashSet::new(),
            versions: HashMap::new(),
            nodes: HashMap::new(),
            tags: HashMap::new(),
            released: HashSet::new(),
            current: HashMap::new(),
        }
    }

    /// Apply a batch; nothing is applied unless every record checks out.
    pub fn apply_all(&mut self, records: Vec<Record>) -> DomainResult<()> {
        self.check_batch(&records)?;
        records.into_iter().try_for_each(|r| self.apply(r))
    }

    /// Verify that every record of a batch references something that exists,
    /// either already in the store or earlier in the same batch.
    pub fn check_batch(&self, records: &[Record]) -> DomainResult<()> {
        let mut trees = HashSet::new();
        let mut versions = HashSet::new();
        let mut nodes = HashMap::new();
        let has_tree = |trees: &HashSet<TreeId>, id: TreeId| {
            if trees.contains(&id) {
                Ok(())
            } else {
                self.tree(id).map(|_| ())
            }
        };
        let has_version = |versions: &HashSet<VersionId>, id: VersionId| {
            if versions.contains(&id) {
                Ok(())
            } else {
                self.version(id).map(|_| ())
            }
        };

        for record in records {
            match record {
                Record::Tree(tree) => {
                    trees.insert(tree.id);
                }
                Record::Version(version) => {
                    has_tree(&trees, version.tree_id)?;
                    versions.insert(version.id);
                }
                Record::Node(node) => {
                    has_version(&versions, node.version_id)?;
                    nodes.insert(node.id, node.version_id);
                }
                Record::Edge(edge) => {
                    has_version(&versions, edge.version_id)?;
                    for id in [edge.incoming_node_id, edge.outgoing_node_id] {
                        let owner = match nodes.get(&id) {
                            Some(owner) => *owner,
                            None => self.node(id)?.version_id,
                        };
                        if owner != edge.version_id {
                            return Err(DomainError::NodeOutsideVersion {
                                node: id,
                                version: edge.version_id,
                            });
                        }
                    }
                }
                Record::Tag { version_id, .. } => has_version(&versions, *version_id)?,
                Record::Current {
                    tree_id,
                    version_id,
                } => {
                    has_tree(&trees, *tree_id)?;
                    has_version(&versions, *version_id)?;
                }
            }
        }
        Ok(())
    }

    /// Apply one record, checking that everything it references exists.
    #[instrument(level = "trace", skip(self))]
    pub fn apply(&mut self, record: Record) -> DomainResult<()> {
        match record {
            Record::Tree(tree) => {
                self.next.tree = self.next.tree.max(tree.id.get() + 1);
                self.versions_by_tree.entry(tree.id).or_default();
                self.trees.insert(tree.id, tree);
            }
            Record::Version(version) => {
                self.tree(version.tree_id)?;
                self.next.version = self.next.version.max(version.id.get() + 1);
                if let Some(tag) = &version.tag {
                    self.tags.insert((version.tree_id, tag.clone()), version.id);
                }
                self.versions_by_tree
                    .entry(version.tree_id)
                    .or_default()
                    .push(version.id);
                self.versions.insert(version.id, version);
            }
            Record::Node(node) => {
                self.version(node.version_id)?;
                self.next.node = self.next.node.max(node.id.get() + 1);
                self.nodes_by_version
                    .entry(node.version_id)
                    .or_default()
                    .push(node.id);
                self.nodes.insert(node.id, node);
            }
            Record::Edge(edge) => {
                self.node_in_version(edge.version_id, edge.incoming_node_id)?;
                self.node_in_version(edge.version_id, edge.outgoing_node_id)?;
                self.next.edge = self.next.edge.max(edge.id.get() + 1);
                self.edges_by_version
                    .entry(edge.version_id)
                    .or_default()
                    .push(edge.id);
                self.edges_from
                    .entry((edge.version_id, edge.incoming_node_id))
                    .or_default()
                    .push(edge.id);
                self.edges_to
                    .entry((edge.version_id, edge.outgoing_node_id))
                    .or_default()
                    .push(edge.id);
                self.edges.insert(edge.id, edge);
            }
            Record::Tag {
                version_id,
                tag,
                description,
                at,
            } => {
                let version = self
                    .versions
                    .get_mut(&version_id)
                    .ok_or_else(|| DomainError::not_found("version", version_id))?;
                if let Some(old) = version.tag.take() {
                    let key = (version.tree_id, old);
                    if self.tags.get(&key) == Some(&version_id) {
                        self.tags.remove(&key);
                    }
                }
                self.tags.insert((version.tree_id, tag.clone()), version_id);
                version.tag = Some(tag);
                version.description = description;
                version.tag_created_at = Some(at);
            }
            Record::Current {
                tree_id,
                version_id,
            } => {
                self.version(version_id)?;
                let tree = self
                    .trees
                    .get_mut(&tree_id)
                    .ok_or_else(|| DomainError::not_found("tree", tree_id))?;
                tree.current_version = Some(version_id);
            }
        }
        Ok(())
    }

    pub fn tree(&self, id: TreeId) -> DomainResult<&Tree> {
        self.trees
            .get(&id)
            .ok_or_else(|| DomainError::not_found("tree", id))
    }

    pub fn trees(&self) -> impl Iterator<Item = &Tree> {
        self.trees.values()
    }

    /// Look up a tree by its name; the first created wins on duplicates.
    pub fn tree_by_name(&self, name: &str) -> DomainResult<&Tree> {
        self.trees
            .values()
            .find(|t| t.name == name)
            .ok_or_else(|| DomainError::not_found("tree", name))
    }

    pub fn version(&self, id: VersionId) -> DomainResult<&TreeVersion> {
        self.versions
            .get(&id)
            .ok_or_else(|| DomainError::not_found("version", id))
    }

    pub fn node(&self, id: NodeId) -> DomainResult<&TreeNode> {
        self.nodes
            .get(&id)
            .ok_or_else(|| DomainError::not_found("node", id))
    }

    pub fn edge(&self, id: EdgeId) -> DomainResult<&TreeEdge> {
        self.edges
            .get(&id)
            .ok_or_else(|| DomainError::not_found("edge", id))
    }

    /// Node lookup scoped to a version.
    pub fn node_in_version(&self, version: VersionId, id: NodeId) -> DomainResult<&TreeNode> {
        self.version(version)?;
        let node = self.node(id)?;
        if node.version_id != version {
            return Err(DomainError::NodeOutsideVersion { node: id, version });
        }
        Ok(node)
    }

    /// Versions of a tree in creation order.
    pub fn versions_of(&self, tree: TreeId) -> DomainResult<Vec<&TreeVersion>> {
        self.tree(tree)?;
        Ok(self
            .versions_by_tree
            .get(&tree)
            .map(|ids| ids.iter().filter_map(|id| self.versions.get(id)).collect())
            .unwrap_or_default())
    }

    pub fn nodes_of(&self, version: VersionId) -> DomainResult<Vec<&TreeNode>> {
        self.version(version)?;
        Ok(lookup_all(self.nodes_by_version.get(&version), &self.nodes))
    }

    pub fn edges_of(&self, version: VersionId) -> DomainResult<Vec<&TreeEdge>> {
        self.version(version)?;
        Ok(lookup_all(self.edges_by_version.get(&version), &self.edges))
    }

    /// Outgoing edge ids of `node` inside `version`, insertion order.
    pub fn edge_ids_from(&self, version: VersionId, node: NodeId) -> &[EdgeId] {
        self.edges_from
            .get(&(version, node))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Edges leaving `node` in `version`, in the order they were added.
    pub fn get_edges_from(&self, version: VersionId, node: NodeId) -> Vec<&TreeEdge> {
        lookup_all(self.edges_from.get(&(version, node)), &self.edges)
    }

    /// Edges arriving at `node` in `version`, in the order they were added.
    pub fn get_edges_to(&self, version: VersionId, node: NodeId) -> Vec<&TreeEdge> {
        lookup_all(self.edges_to.get(&(version, node)), &self.edges)
    }

    /// Surrounding whitespace is ignored, as it is when tagging.
    pub fn find_version_by_tag(&self, tree: TreeId, tag: &str) -> DomainResult<&TreeVersion> {
        self.tree(tree)?;
        let tag = tag.trim();
        self.tags
            .get(&(tree, tag.to_string()))
            .and_then(|id| self.versions.get(id))
            .ok_or_else(|| DomainError::TagNotFound {
                tree,
                tag: tag.to_string(),
            })
    }

    pub fn current_version(&self, tree: TreeId) -> DomainResult<Option<&TreeVersion>> {
        let tree = self.tree(tree)?;
        Ok(tree
            .current_version
            .and_then(|id| self.versions.get(&id)))
    }

    /// Most recently created version of a tree.
    pub fn latest_version(&self, tree: TreeId) -> DomainResult<Option<&TreeVersion>> {
        Ok(self.versions_of(tree)?.into_iter().max_by_key(|v| v.id))
    }
}

fn lookup_all<'a, K: Ord, V>(ids: Option<&Vec<K>>, table: &'a BTreeMap<K, V>) -> Vec<&'a V> {
    ids.map(|ids| ids.iter().filter_map(|id| table.get(id)).collect())
        .unwrap_or_default()
}

/// Pending write batch.
///
/// Borrows the store immutably; nothing becomes visible until the caller
/// applies [`Staging::into_records`].
pub struct Staging<'a> {
    store: &'a GraphStore,
    next: IdSequence,
    records: Vec<Record>,
    now: DateTime<Utc>,
    trees: HashSet<TreeId>,
    versions: HashMap<VersionId, TreeId>,
    nodes: HashMap<NodeId, VersionId>,
    tags: HashMap<(TreeId, String), VersionId>,
    /// Committed tags given up by their version in this batch
    released: HashSet<(TreeId, String)>,
    current: HashMap<TreeId, VersionId>,
}

impl<'a> Staging<'a> {
    pub fn store(&self) -> &'a GraphStore {
        self.store
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    pub fn create_tree(&mut self, name: &str) -> DomainResult<Tree> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::Validation("tree name must not be blank".into()));
        }
        let tree = Tree {
            id: TreeId(bump(&mut self.next.tree)),
            name: name.to_string(),
            created_at: self.now,
            current_version: None,
        };
        trace!("staging tree {}", tree.id);
        self.trees.insert(tree.id);
        self.records.push(Record::Tree(tree.clone()));
        Ok(tree)
    }

    /// Create a version and make it the tree's current version.
    pub fn create_version(
        &mut self,
        tree_id: TreeId,
        tag: Option<&str>,
        description: Option<&str>,
    ) -> DomainResult<TreeVersion> {
        if !self.has_tree(tree_id) {
            return Err(DomainError::Validation(format!(
                "tree {tree_id} does not exist"
            )));
        }
        let tag = tag.map(|t| self.check_tag(tree_id, t, None)).transpose()?;
        let version = TreeVersion {
            id: VersionId(bump(&mut self.next.version)),
            tree_id,
            parent_version_id: None,
            tag_created_at: tag.as_ref().map(|_| self.now),
            tag,
            description: description.map(str::to_string),
            created_at: self.now,
        };
        self.push_version(version.clone());
        self.set_current(tree_id, version.id);
        Ok(version)
    }

    pub fn add_node(&mut self, version_id: VersionId, data: Payload) -> DomainResult<TreeNode> {
        if !self.has_version(version_id) {
            return Err(DomainError::not_found("version", version_id));
        }
        Ok(self.push_node(version_id, data))
    }

    pub fn add_edge(
        &mut self,
        version_id: VersionId,
        incoming_node_id: NodeId,
        outgoing_node_id: NodeId,
        data: Payload,
    ) -> DomainResult<TreeEdge> {
        if !self.has_version(version_id) {
            return Err(DomainError::not_found("version", version_id));
        }
        self.check_membership(version_id, incoming_node_id)?;
        self.check_membership(version_id, outgoing_node_id)?;
        Ok(self.push_edge(version_id, incoming_node_id, outgoing_node_id, data))
    }

    /// Overwrite tag and description of an existing version.
    pub fn tag_version(
        &mut self,
        version_id: VersionId,
        tag: &str,
        description: Option<&str>,
    ) -> DomainResult<()> {
        let tree_id = self
            .tree_of(version_id)
            .ok_or_else(|| DomainError::not_found("version", version_id))?;
        let tag = self.check_tag(tree_id, tag, Some(version_id))?;
        // a version carries one tag; its previous one becomes free
        self.tags.retain(|_, holder| *holder != version_id);
        if let Some(old) = self.store.version(version_id).ok().and_then(|v| v.tag.clone()) {
            self.released.insert((tree_id, old));
        }
        self.tags.insert((tree_id, tag.clone()), version_id);
        self.records.push(Record::Tag {
            version_id,
            tag,
            description: description.map(str::to_string),
            at: self.now,
        });
        Ok(())
    }

    /// Copy a committed version's nodes and edges into a fresh untagged
    /// version of the same tree and make the copy current.
    ///
    /// Edge order is preserved so traversal and pathfinding on the copy
    /// behave exactly as on the source.
    #[instrument(level = "debug", skip(self, description))]
    pub fn copy_version(
        &mut self,
        source_id: VersionId,
        description: String,
    ) -> DomainResult<TreeVersion> {
        let store = self.store;
        let source = store.version(source_id)?;
        let version = TreeVersion {
            id: VersionId(bump(&mut self.next.version)),
            tree_id: source.tree_id,
            parent_version_id: Some(source_id),
            tag: None,
            description: Some(description),
            created_at: self.now,
            tag_created_at: None,
        };
        self.push_version(version.clone());

        let mut old_to_new = HashMap::new();
        for node in store.nodes_of(source_id)? {
            let copy = self.push_node(version.id, node.data.clone());
            old_to_new.insert(node.id, copy.id);
        }
        for edge in store.edges_of(source_id)? {
            let incoming = *old_to_new
                .get(&edge.incoming_node_id)
                .ok_or_else(|| DomainError::not_found("node", edge.incoming_node_id))?;
            let outgoing = *old_to_new
                .get(&edge.outgoing_node_id)
                .ok_or_else(|| DomainError::not_found("node", edge.outgoing_node_id))?;
            self.push_edge(version.id, incoming, outgoing, edge.data.clone());
        }
        self.set_current(version.tree_id, version.id);
        trace!(
            "copied {} nodes from {} into {}",
            old_to_new.len(),
            source_id,
            version.id
        );
        Ok(version)
    }

    /// Current version of a tree, including changes staged in this batch.
    pub fn current_version(&self, tree_id: TreeId) -> DomainResult<Option<VersionId>> {
        if let Some(id) = self.current.get(&tree_id) {
            return Ok(Some(*id));
        }
        if self.trees.contains(&tree_id) {
            return Ok(None);
        }
        Ok(self.store.tree(tree_id)?.current_version)
    }

    fn has_tree(&self, id: TreeId) -> bool {
        self.trees.contains(&id) || self.store.tree(id).is_ok()
    }

    fn has_version(&self, id: VersionId) -> bool {
        self.versions.contains_key(&id) || self.store.version(id).is_ok()
    }

    fn tree_of(&self, version: VersionId) -> Option<TreeId> {
        self.versions
            .get(&version)
            .copied()
            .or_else(|| self.store.version(version).ok().map(|v| v.tree_id))
    }

    fn check_membership(&self, version: VersionId, node: NodeId) -> DomainResult<()> {
        let owner = match self.nodes.get(&node) {
            Some(owner) => *owner,
            None => self.store.node(node)?.version_id,
        };
        if owner != version {
            return Err(DomainError::NodeOutsideVersion { node, version });
        }
        Ok(())
    }

    /// Validate a tag; `owner` may already carry it.
    fn check_tag(&self, tree: TreeId, tag: &str, owner: Option<VersionId>) -> DomainResult<String> {
        let tag = tag.trim();
        if tag.is_empty() {
            return Err(DomainError::Validation("tag must not be blank".into()));
        }
        let key = (tree, tag.to_string());
        let holder = self
            .tags
            .get(&key)
            .or_else(|| {
                if self.released.contains(&key) {
                    None
                } else {
                    self.store.tags.get(&key)
                }
            })
            .copied();
        match holder {
            Some(existing) if Some(existing) != owner => Err(DomainError::DuplicateTag {
                tree,
                tag: tag.to_string(),
            }),
            _ => Ok(key.1),
        }
    }

    fn push_version(&mut self, version: TreeVersion) {
        trace!("staging version {}", version.id);
        if let Some(tag) = &version.tag {
            self.tags.insert((version.tree_id, tag.clone()), version.id);
        }
        self.versions.insert(version.id, version.tree_id);
        self.records.push(Record::Version(version));
    }

    fn push_node(&mut self, version_id: VersionId, data: Payload) -> TreeNode {
        let node = TreeNode {
            id: NodeId(bump(&mut self.next.node)),
            version_id,
            data,
            created_at: self.now,
        };
        self.nodes.insert(node.id, version_id);
        self.records.push(Record::Node(node.clone()));
        node
    }

    fn push_edge(
        &mut self,
        version_id: VersionId,
        incoming_node_id: NodeId,
        outgoing_node_id: NodeId,
        data: Payload,
    ) -> TreeEdge {
        let edge = TreeEdge {
            id: EdgeId(bump(&mut self.next.edge)),
            version_id,
            incoming_node_id,
            outgoing_node_id,
            data,
            created_at: self.now,
        };
        self.records.push(Record::Edge(edge.clone()));
        edge
    }

    fn set_current(&mut self, tree_id: TreeId, version_id: VersionId) {
        self.current.insert(tree_id, version_id);
        self.records.push(Record::Current {
            tree_id,
            version_id,
        });
    }
}
