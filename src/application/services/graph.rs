//! Graph store service
//!
//! Record-level operations: trees, versions, nodes and edges.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::application::store::SharedStore;
use crate::application::ApplicationResult;
use crate::domain::{NodeId, Payload, Tree, TreeEdge, TreeId, TreeNode, TreeVersion, VersionId};

/// Service for creating and reading graph records.
pub struct GraphService {
    store: Arc<SharedStore>,
}

impl GraphService {
    pub fn new(store: Arc<SharedStore>) -> Self {
        Self { store }
    }

    #[instrument(level = "debug", skip(self))]
    pub fn create_tree(&self, name: &str) -> ApplicationResult<Tree> {
        let tree = self.store.commit(|s| s.create_tree(name))?;
        debug!("created tree {} '{}'", tree.id, tree.name);
        Ok(tree)
    }

    /// Create a version and make it the tree's current version.
    ///
    /// # Errors
    /// Unknown tree, blank tag, or a tag already used in this tree.
    #[instrument(level = "debug", skip(self))]
    pub fn create_version(
        &self,
        tree: TreeId,
        tag: Option<&str>,
        description: Option<&str>,
    ) -> ApplicationResult<TreeVersion> {
        let version = self
            .store
            .commit(|s| s.create_version(tree, tag, description))?;
        debug!("created version {}", version);
        Ok(version)
    }

    #[instrument(level = "debug", skip(self, data))]
    pub fn add_node(&self, version: VersionId, data: Payload) -> ApplicationResult<TreeNode> {
        Ok(self.store.commit(|s| s.add_node(version, data))?)
    }

    /// Connect two nodes of the same version with a directed edge.
    #[instrument(level = "debug", skip(self, data))]
    pub fn add_edge(
        &self,
        version: VersionId,
        incoming: NodeId,
        outgoing: NodeId,
        data: Payload,
    ) -> ApplicationResult<TreeEdge> {
        Ok(self
            .store
            .commit(|s| s.add_edge(version, incoming, outgoing, data))?)
    }

    /// Outgoing edges of `node` in `version`, insertion order.
    pub fn get_edges_from(
        &self,
        version: VersionId,
        node: NodeId,
    ) -> ApplicationResult<Vec<TreeEdge>> {
        let store = self.store.read()?;
        store.version(version)?;
        let edges = store
            .get_edges_from(version, node)
            .into_iter()
            .cloned()
            .collect();
        Ok(edges)
    }

    pub fn find_version_by_tag(&self, tree: TreeId, tag: &str) -> ApplicationResult<TreeVersion> {
        Ok(self.store.read()?.find_version_by_tag(tree, tag)?.clone())
    }

    pub fn tree(&self, id: TreeId) -> ApplicationResult<Tree> {
        Ok(self.store.read()?.tree(id)?.clone())
    }

    /// Resolve a tree from either its numeric id or its name.
    pub fn resolve_tree(&self, key: &str) -> ApplicationResult<Tree> {
        let store = self.store.read()?;
        let key = key.trim();
        let by_id = key
            .parse::<TreeId>()
            .ok()
            .and_then(|id| store.tree(id).ok());
        let tree = match by_id {
            Some(tree) => tree.clone(),
            None => store.tree_by_name(key)?.clone(),
        };
        Ok(tree)
    }

    pub fn trees(&self) -> ApplicationResult<Vec<Tree>> {
        Ok(self.store.read()?.trees().cloned().collect())
    }

    pub fn version(&self, id: VersionId) -> ApplicationResult<TreeVersion> {
        Ok(self.store.read()?.version(id)?.clone())
    }

    pub fn versions(&self, tree: TreeId) -> ApplicationResult<Vec<TreeVersion>> {
        Ok(self
            .store
            .read()?
            .versions_of(tree)?
            .into_iter()
            .cloned()
            .collect())
    }

    pub fn node(&self, id: NodeId) -> ApplicationResult<TreeNode> {
        Ok(self.store.read()?.node(id)?.clone())
    }

    pub fn nodes(&self, version: VersionId) -> ApplicationResult<Vec<TreeNode>> {
        Ok(self
            .store
            .read()?
            .nodes_of(version)?
            .into_iter()
            .cloned()
            .collect())
    }

    pub fn edges(&self, version: VersionId) -> ApplicationResult<Vec<TreeEdge>> {
        Ok(self
            .store
            .read()?
            .edges_of(version)?
            .into_iter()
            .cloned()
            .collect())
    }

    /// Node lookup that also checks version membership.
    pub fn node_in_version(&self, version: VersionId, id: NodeId) -> ApplicationResult<TreeNode> {
        Ok(self.store.read()?.node_in_version(version, id)?.clone())
    }
}
