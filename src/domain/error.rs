//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::entities::{NodeId, TreeId, VersionId};

/// Coarse classification surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Validation,
}

/// Domain errors represent violated graph invariants.
/// None of them are transient; callers get them immediately.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("tag '{tag}' not found in tree {tree}")]
    TagNotFound { tree: TreeId, tag: String },

    #[error("tree {0} has no current version")]
    NoCurrentVersion(TreeId),

    #[error("node {node} does not belong to version {version}")]
    NodeOutsideVersion { node: NodeId, version: VersionId },

    #[error("tag '{tag}' already used in tree {tree}")]
    DuplicateTag { tree: TreeId, tag: String },

    #[error("validation failed: {0}")]
    Validation(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::NotFound { .. }
            | DomainError::TagNotFound { .. }
            | DomainError::NoCurrentVersion(_)
            | DomainError::NodeOutsideVersion { .. } => ErrorKind::NotFound,
            DomainError::DuplicateTag { .. } => ErrorKind::Conflict,
            DomainError::Validation(_) => ErrorKind::Validation,
        }
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
