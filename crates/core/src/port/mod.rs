// Port Layer - Interfaces for external dependencies

pub mod id_provider; // For deterministic testing
pub mod print_backend;
pub mod printer_provider;
pub mod time_provider;

// Re-exports
pub use id_provider::IdProvider;
pub use print_backend::{BackendError, PrintBackend, SheetExtent};
pub use printer_provider::PrinterProvider;
pub use time_provider::TimeProvider;
