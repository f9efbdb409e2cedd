//! Navigation service
//!
//! Read-only queries over one version: traversal, pathfinding, neighbours
//! and tree rendering. Everything runs under the store's read lock, so a
//! query never observes a half-committed batch.

use std::sync::Arc;

use termtree::Tree;
use tracing::instrument;

use crate::application::store::SharedStore;
use crate::application::ApplicationResult;
use crate::domain::{DomainResult, Navigator, NodeId, TreeEdge, TreeNode, VersionId};

/// Owned form of a traversal step.
#[derive(Debug, Clone, PartialEq)]
pub struct TraversalStep {
    pub node: TreeNode,
    pub edges: Vec<TreeEdge>,
}

pub struct NavigationService {
    store: Arc<SharedStore>,
}

impl NavigationService {
    pub fn new(store: Arc<SharedStore>) -> Self {
        Self { store }
    }

    /// Run `f` with a navigator over the current store snapshot.
    ///
    /// Use this to consume [`Navigator::traverse`] lazily, e.g. to stop early.
    pub fn with_navigator<R, F>(&self, f: F) -> ApplicationResult<R>
    where
        F: FnOnce(Navigator<'_>) -> DomainResult<R>,
    {
        let store = self.store.read()?;
        let result = f(Navigator::new(&store))?;
        Ok(result)
    }

    /// Every node reachable from `start`, each once, depth-first.
    #[instrument(level = "debug", skip(self))]
    pub fn traverse(&self, version: VersionId, start: NodeId) -> ApplicationResult<Vec<TraversalStep>> {
        self.with_navigator(|nav| {
            Ok(nav
                .traverse(version, start)?
                .map(|visit| TraversalStep {
                    node: visit.node.clone(),
                    edges: visit.edges.into_iter().cloned().collect(),
                })
                .collect())
        })
    }

    #[instrument(level = "debug", skip(self))]
    pub fn find_path(
        &self,
        version: VersionId,
        start: NodeId,
        end: NodeId,
    ) -> ApplicationResult<Vec<NodeId>> {
        self.with_navigator(|nav| nav.find_path(version, start, end))
    }

    pub fn children(&self, version: VersionId, node: NodeId) -> ApplicationResult<Vec<TreeNode>> {
        self.with_navigator(|nav| Ok(nav.children(version, node)?.into_iter().cloned().collect()))
    }

    pub fn parents(&self, version: VersionId, node: NodeId) -> ApplicationResult<Vec<TreeNode>> {
        self.with_navigator(|nav| Ok(nav.parents(version, node)?.into_iter().cloned().collect()))
    }

    pub fn render(&self, version: VersionId, start: NodeId) -> ApplicationResult<Tree<String>> {
        self.with_navigator(|nav| nav.render(version, start))
    }
}
