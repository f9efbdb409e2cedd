//! Domain entities: trees, versions, nodes and edges

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque payload attached to nodes and edges.
///
/// The core never looks inside; it is stored and copied as-is.
pub type Payload = serde_json::Value;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            pub fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            /// Accepts `42` as well as the display form `T42`/`V42`/...
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                let digits = s
                    .strip_prefix($prefix)
                    .or_else(|| s.strip_prefix(&$prefix.to_lowercase()))
                    .unwrap_or(s);
                digits.parse().map(Self)
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }
    };
}

record_id!(
    /// Identity of a [`Tree`].
    TreeId,
    "T"
);
record_id!(
    /// Identity of a [`TreeVersion`].
    VersionId,
    "V"
);
record_id!(
    /// Identity of a [`TreeNode`].
    NodeId,
    "N"
);
record_id!(
    /// Identity of a [`TreeEdge`].
    EdgeId,
    "E"
);

/// A named, versioned graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub id: TreeId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    /// Active version; only moved by the version manager
    pub current_version: Option<VersionId>,
}

/// Snapshot of a tree's graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeVersion {
    pub id: VersionId,
    pub tree_id: TreeId,
    /// Version this one was copied from (restore or branch)
    pub parent_version_id: Option<VersionId>,
    /// Unique per tree when present
    pub tag: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub tag_created_at: Option<DateTime<Utc>>,
}

impl TreeVersion {
    pub fn is_tagged(&self) -> bool {
        self.tag.is_some()
    }
}

impl fmt::Display for TreeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tag {
            Some(tag) => write!(f, "{} [{}]", self.id, tag),
            None => write!(f, "{}", self.id),
        }
    }
}

/// Graph vertex carrying an opaque payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    pub id: NodeId,
    pub version_id: VersionId,
    pub data: Payload,
    pub created_at: DateTime<Utc>,
}

impl fmt::Display for TreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.id, self.data)
    }
}

/// Directed edge `incoming_node_id -> outgoing_node_id`.
///
/// Both endpoints belong to `version_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEdge {
    pub id: EdgeId,
    pub version_id: VersionId,
    pub incoming_node_id: NodeId,
    pub outgoing_node_id: NodeId,
    pub data: Payload,
    pub created_at: DateTime<Utc>,
}

impl fmt::Display for TreeEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} -> {} {}",
            self.id, self.incoming_node_id, self.outgoing_node_id, self.data
        )
    }
}
