//! Error conversion helpers for journal I/O
//!
//! Provides extension traits for cleaner error handling with location context.

use std::io;

use crate::application::{ApplicationError, ApplicationResult};

/// Extension trait for converting `io::Result` to `ApplicationResult` with context.
pub trait IoResultExt<T> {
    /// Add location context to an I/O error.
    ///
    /// # Example
    /// ```ignore
    /// journal.append(&records)
    ///     .with_location_context("append batch", &journal.location())?;
    /// ```
    fn with_location_context(self, action: &str, location: &str) -> ApplicationResult<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn with_location_context(self, action: &str, location: &str) -> ApplicationResult<T> {
        self.map_err(|e| ApplicationError::OperationFailed {
            context: format!("{}: {}", action, location),
            source: Box::new(e),
        })
    }
}
