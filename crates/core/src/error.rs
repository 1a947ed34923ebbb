// Central Error Type for the Application

use crate::domain::FileType;
use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    /// Backend failures pass through unchanged
    #[error(transparent)]
    Backend(#[from] crate::port::BackendError),

    #[error("No print backend registered for {0}")]
    NoBackend(FileType),

    #[error("Busy: cannot start {0} while another task is running")]
    Busy(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
