//! Read-only walks over one version's graph.
//!
//! Both walks are depth-first with an explicit stack of frames
//! (node id + cursor into its outgoing edges), so graph depth never turns
//! into call-stack depth. A visited-set keyed by node id guarantees
//! termination on cyclic graphs.

use std::collections::HashSet;

use itertools::Itertools;
use termtree::Tree;
use tracing::{debug, instrument};

use crate::domain::entities::{NodeId, TreeEdge, TreeNode, VersionId};
use crate::domain::error::DomainResult;
use crate::domain::store::GraphStore;

/// One emitted node together with its outgoing edges.
#[derive(Debug, Clone, PartialEq)]
pub struct Visit<'a> {
    pub node: &'a TreeNode,
    pub edges: Vec<&'a TreeEdge>,
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    node: NodeId,
    cursor: usize,
}

impl Frame {
    fn new(node: NodeId) -> Self {
        Self { node, cursor: 0 }
    }
}

/// Navigator bound to a store snapshot.
#[derive(Debug, Clone, Copy)]
pub struct Navigator<'a> {
    store: &'a GraphStore,
}

impl<'a> Navigator<'a> {
    pub fn new(store: &'a GraphStore) -> Self {
        Self { store }
    }

    /// Lazy pre-order walk of everything reachable from `start`.
    ///
    /// Children are visited in edge-insertion order. Each reachable node is
    /// emitted exactly once.
    ///
    /// # Errors
    /// `start` must be a node of `version`.
    #[instrument(level = "debug", skip(self))]
    pub fn traverse(&self, version: VersionId, start: NodeId) -> DomainResult<Traversal<'a>> {
        self.store.node_in_version(version, start)?;
        Ok(Traversal {
            store: self.store,
            version,
            pending: Some(start),
            stack: Vec::new(),
            visited: HashSet::new(),
        })
    }

    /// Depth-first search for a path `start -> ... -> end`.
    ///
    /// Returns the node ids along the first path found when following edges
    /// in insertion order, or an empty vector if `end` is unreachable. This is
    /// not necessarily the shortest path.
    ///
    /// # Errors
    /// Both endpoints must be nodes of `version`.
    #[instrument(level = "debug", skip(self))]
    pub fn find_path(
        &self,
        version: VersionId,
        start: NodeId,
        end: NodeId,
    ) -> DomainResult<Vec<NodeId>> {
        self.store.node_in_version(version, start)?;
        self.store.node_in_version(version, end)?;

        let mut visited = HashSet::from([start]);
        let mut stack = vec![Frame::new(start)];

        while let Some(frame) = stack.last_mut() {
            if frame.node == end {
                let path: Vec<NodeId> = stack.iter().map(|f| f.node).collect();
                debug!("path found with {} nodes", path.len());
                return Ok(path);
            }
            match self.store.edge_ids_from(version, frame.node).get(frame.cursor) {
                Some(edge_id) => {
                    frame.cursor += 1;
                    let target = self.store.edge(*edge_id)?.outgoing_node_id;
                    if visited.insert(target) {
                        stack.push(Frame::new(target));
                    }
                }
                None => {
                    stack.pop();
                }
            }
        }

        debug!("no path from {} to {}", start, end);
        Ok(Vec::new())
    }

    /// Direct successors of `node`, in edge order, without duplicates.
    pub fn children(&self, version: VersionId, node: NodeId) -> DomainResult<Vec<&'a TreeNode>> {
        self.store.node_in_version(version, node)?;
        self.store
            .get_edges_from(version, node)
            .into_iter()
            .map(|e| e.outgoing_node_id)
            .unique()
            .map(|id| self.store.node(id))
            .collect()
    }

    /// Direct predecessors of `node`, in edge order, without duplicates.
    pub fn parents(&self, version: VersionId, node: NodeId) -> DomainResult<Vec<&'a TreeNode>> {
        self.store.node_in_version(version, node)?;
        self.store
            .get_edges_to(version, node)
            .into_iter()
            .map(|e| e.incoming_node_id)
            .unique()
            .map(|id| self.store.node(id))
            .collect()
    }

    /// Render the subgraph reachable from `start` as a tree.
    ///
    /// A node reached a second time is shown as a `(seen)` leaf and not
    /// expanded again.
    pub fn render(&self, version: VersionId, start: NodeId) -> DomainResult<Tree<String>> {
        let root = self.store.node_in_version(version, start)?;
        let mut visited = HashSet::from([start]);
        let mut stack = vec![(Frame::new(start), Tree::new(root.to_string()))];
        let mut finished = None;

        while let Some((frame, branch)) = stack.last_mut() {
            match self.store.edge_ids_from(version, frame.node).get(frame.cursor) {
                Some(edge_id) => {
                    frame.cursor += 1;
                    let edge = self.store.edge(*edge_id)?;
                    let target = self.store.node(edge.outgoing_node_id)?;
                    let label = format!("[{}] {}", edge.data, target);
                    if visited.insert(target.id) {
                        stack.push((Frame::new(target.id), Tree::new(label)));
                    } else {
                        branch.push(Tree::new(format!("{label} (seen)")));
                    }
                }
                None => {
                    if let Some((_, done)) = stack.pop() {
                        match stack.last_mut() {
                            Some((_, parent)) => {
                                parent.push(done);
                            }
                            None => finished = Some(done),
                        }
                    }
                }
            }
        }

        Ok(finished.unwrap_or_else(|| Tree::new(root.to_string())))
    }
}

/// Iterator returned by [`Navigator::traverse`].
#[derive(Debug)]
pub struct Traversal<'a> {
    store: &'a GraphStore,
    version: VersionId,
    pending: Option<NodeId>,
    stack: Vec<Frame>,
    visited: HashSet<NodeId>,
}

impl<'a> Traversal<'a> {
    fn enter(&mut self, id: NodeId) -> Option<Visit<'a>> {
        let node = self.store.node(id).ok()?;
        self.stack.push(Frame::new(id));
        Some(Visit {
            node,
            edges: self.store.get_edges_from(self.version, id),
        })
    }
}

impl<'a> Iterator for Traversal<'a> {
    type Item = Visit<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(start) = self.pending.take() {
            self.visited.insert(start);
            return self.enter(start);
        }
        while let Some(frame) = self.stack.last_mut() {
            let edges = self.store.edge_ids_from(self.version, frame.node);
            let Some(edge_id) = edges.get(frame.cursor) else {
                self.stack.pop();
                continue;
            };
            frame.cursor += 1;
            let Ok(edge) = self.store.edge(*edge_id) else {
                continue;
            };
            let target = edge.outgoing_node_id;
            if self.visited.insert(target) {
                if let Some(visit) = self.enter(target) {
                    return Some(visit);
                }
            }
        }
        None
    }
}
