// Batchprint Infrastructure - System Adapters
// Implements: PrintBackend (lp, LibreOffice), PrinterProvider (lpstat)

pub mod command_runner;
pub mod constants;
pub mod lp_backend;
pub mod lpstat_provider;
pub mod office_backend;
pub mod xlsx;

pub use command_runner::{CommandError, CommandOutput, CommandRunner};
pub use lp_backend::LpBackend;
pub use lpstat_provider::LpstatPrinterProvider;
pub use office_backend::OfficeBackend;
pub use xlsx::{XlsxError, XlsxInspector};
