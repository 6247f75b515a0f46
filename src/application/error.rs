//! Application-level errors (wraps domain errors)

use thiserror::Error;

use crate::domain::DomainError;

/// Application errors wrap domain errors and add application-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("binding not found: {0}")]
    BindingNotFound(String),

    #[error("bound node path not found: {0}")]
    DanglingBinding(String),

    #[error("config error: {message}")]
    Config { message: String },
}

impl ApplicationError {
    /// True if the underlying failure is a user-facing validation problem.
    pub fn is_validation(&self) -> bool {
        match self {
            ApplicationError::Domain(e) => e.is_validation(),
            _ => false,
        }
    }

    /// The wrapped domain error, if any.
    pub fn as_domain(&self) -> Option<&DomainError> {
        match self {
            ApplicationError::Domain(e) => Some(e),
            _ => None,
        }
    }
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
