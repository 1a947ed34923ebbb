// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid duplex mode: {0}")]
    InvalidDuplex(String),

    #[error("Invalid orientation mode: {0}")]
    InvalidOrientationMode(String),

    #[error("Invalid sort column: {0}")]
    InvalidSortColumn(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
