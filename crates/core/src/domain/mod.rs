// Domain Layer - Pure business logic and entities

pub mod error;
pub mod failure;
pub mod job;
pub mod rules;
pub mod settings;

// Re-exports
pub use error::DomainError;
pub use failure::{classify_failure, FailureCategory};
pub use job::{extension_of, DuplexMode, FileType, JobId, JobStatus, PrintJob};
pub use rules::{Rule, RuleSet};
pub use settings::{OrientationMode, PrintSettings};
