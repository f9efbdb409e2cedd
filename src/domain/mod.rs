//! Domain layer: entities, record store and graph walks
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod entities;
pub mod error;
pub mod navigator;
pub mod store;

pub use entities::*;
pub use error::{DomainError, DomainResult, ErrorKind};
pub use navigator::{Navigator, Traversal, Visit};
pub use store::{GraphStore, Record, Staging};
