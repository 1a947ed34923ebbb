// Batchprint Core - Domain Logic, Ports & Execution Engine
// NO process spawning, NO document formats (backends live behind ports)

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

pub use error::{AppError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
