//! Application-level errors (wraps domain errors)

use thiserror::Error;

use crate::domain::{DomainError, ErrorKind};

/// Application errors wrap domain errors and add application-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("config error: {message}")]
    Config { message: String },

    #[error("graph store lock poisoned")]
    LockPoisoned,

    #[error("operation failed: {context}")]
    OperationFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ApplicationError {
    /// Domain classification, if this error came from a violated invariant.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            ApplicationError::Domain(e) => Some(e.kind()),
            _ => None,
        }
    }
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
