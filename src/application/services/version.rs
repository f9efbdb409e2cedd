//! Version manager
//!
//! Moves a tree between versions: tagging the current version, restoring a
//! tagged version as a fresh copy, and branching from a tag. Tagged versions
//! are never modified by a restore; a restore always moves forward to a new
//! version.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{info, instrument};

use crate::application::store::SharedStore;
use crate::application::ApplicationResult;
use crate::domain::{DomainError, TreeId, TreeVersion, VersionId};

pub struct VersionManager {
    store: Arc<SharedStore>,
}

impl VersionManager {
    pub fn new(store: Arc<SharedStore>) -> Self {
        Self { store }
    }

    /// Tag the tree's current version, overwriting its tag and description.
    ///
    /// Re-applying the tag the current version already carries is allowed.
    ///
    /// # Errors
    /// - the tree is unknown or has no current version
    /// - `tag` is used by another version of the tree
    #[instrument(level = "debug", skip(self))]
    pub fn create_tag(
        &self,
        tree: TreeId,
        tag: &str,
        description: Option<&str>,
    ) -> ApplicationResult<TreeVersion> {
        let version_id = self.store.commit(|s| {
            let current = s
                .current_version(tree)?
                .ok_or(DomainError::NoCurrentVersion(tree))?;
            s.tag_version(current, tag, description)?;
            Ok(current)
        })?;
        info!("tagged {} as '{}'", version_id, tag);
        Ok(self.store.read()?.version(version_id)?.clone())
    }

    /// Make a copy of the version tagged `tag` the tree's current version.
    ///
    /// The copy gets new identities for every node and edge, identical
    /// payloads and topology, no tag, and `parent_version_id` pointing at the
    /// tagged version. The copy and the pointer move are one atomic batch.
    #[instrument(level = "debug", skip(self))]
    pub fn restore_from_tag(&self, tree: TreeId, tag: &str) -> ApplicationResult<TreeVersion> {
        let tag = tag.trim();
        let version = self.copy_tagged(tree, tag, format!("Restored version from tag {tag}"))?;
        info!("restored '{}' of tree {} into {}", tag, tree, version.id);
        Ok(version)
    }

    /// Start a new line of work from a tagged version.
    ///
    /// Same copy semantics as [`VersionManager::restore_from_tag`].
    #[instrument(level = "debug", skip(self))]
    pub fn branch_from_tag(&self, tree: TreeId, tag: &str) -> ApplicationResult<TreeVersion> {
        let tag = tag.trim();
        let version = self.copy_tagged(tree, tag, format!("New version from tag {tag}"))?;
        info!("branched '{}' of tree {} into {}", tag, tree, version.id);
        Ok(version)
    }

    pub fn current_version(&self, tree: TreeId) -> ApplicationResult<Option<TreeVersion>> {
        Ok(self.store.read()?.current_version(tree)?.cloned())
    }

    pub fn latest_version(&self, tree: TreeId) -> ApplicationResult<Option<TreeVersion>> {
        Ok(self.store.read()?.latest_version(tree)?.cloned())
    }

    /// The version followed by the versions it was copied from, newest first.
    pub fn lineage(&self, version: VersionId) -> ApplicationResult<Vec<TreeVersion>> {
        let store = self.store.read()?;
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut next = Some(version);
        while let Some(id) = next {
            if !seen.insert(id) {
                break;
            }
            let v = store.version(id)?;
            next = v.parent_version_id;
            chain.push(v.clone());
        }
        Ok(chain)
    }

    fn copy_tagged(
        &self,
        tree: TreeId,
        tag: &str,
        description: String,
    ) -> ApplicationResult<TreeVersion> {
        Ok(self.store.commit(|s| {
            let source = s.store().find_version_by_tag(tree, tag)?.id;
            s.copy_version(source, description)
        })?)
    }
}
