//! Application services
//!
//! Each service wraps a shared store and exposes one slice of the API.

pub mod graph;
pub mod navigation;
pub mod version;

pub use graph::GraphService;
pub use navigation::{NavigationService, TraversalStep};
pub use version::VersionManager;
