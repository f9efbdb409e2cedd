//! Infrastructure layer: journal implementations and DI container
//!
//! This layer implements the storage boundary trait and wires up services.

pub mod di;
pub mod error;
pub mod traits;

pub use error::{InfraError, InfraResult};
