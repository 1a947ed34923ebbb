// Print Backend Port
// Abstraction over whatever actually renders a document to a printer

use crate::domain::PrintJob;
use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Backend errors. The Display text becomes the job's failure message,
/// so variants carry human-readable detail.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("{0}")]
    Failed(String),

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("print timed out after {0}s")]
    Timeout(u64),

    #[error("{0}")]
    Unsupported(String),

    #[error("IO error: {0}")]
    Io(String),
}

/// Used-range extent of one worksheet (points)
#[derive(Debug, Clone, PartialEq)]
pub struct SheetExtent {
    pub name: String,
    pub width: f64,
    pub height: f64,
}

/// Print Backend trait
///
/// Implementations:
/// - LpBackend: CUPS `lp` (infra-system)
/// - OfficeBackend: LibreOffice conversion + `lp` (infra-system)
///
/// `print` is treated as opaque and potentially slow. Timeouts, if any,
/// are the implementation's responsibility.
#[async_trait]
pub trait PrintBackend: Send + Sync {
    /// Print a job
    ///
    /// # Errors
    /// Any failure, described well enough to show to a user
    async fn print(&self, job: &PrintJob) -> Result<(), BackendError>;

    /// List worksheet names in workbook order (Excel capability)
    async fn list_sheets(&self, _file_path: &Path) -> Result<Vec<String>, BackendError> {
        Err(BackendError::Unsupported(
            "this backend cannot list sheets".to_string(),
        ))
    }

    /// Measure used ranges of the given sheets (all sheets when empty)
    async fn measure_sheets(
        &self,
        _file_path: &Path,
        _sheets: &[String],
    ) -> Result<Vec<SheetExtent>, BackendError> {
        Err(BackendError::Unsupported(
            "this backend cannot measure sheets".to_string(),
        ))
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::domain::JobId;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    type PrintHook = Arc<dyn Fn(&PrintJob) + Send + Sync>;

    /// Mock Print Backend for testing
    ///
    /// Succeeds unless the job's file name was registered with `fail_on`
    /// or `panic_on`. Records every job it was asked to print.
    #[derive(Default)]
    pub struct MockPrintBackend {
        failures: Mutex<HashMap<String, String>>,
        panics: Mutex<Vec<String>>,
        printed: Mutex<Vec<JobId>>,
        sheets: Mutex<HashMap<String, Vec<SheetExtent>>>,
        delay: Mutex<Option<Duration>>,
        hook: Mutex<Option<PrintHook>>,
    }

    impl MockPrintBackend {
        pub fn new() -> Self {
            Self::default()
        }

        /// Fail jobs whose file name equals `file_name` with `message`
        pub fn fail_on(self, file_name: impl Into<String>, message: impl Into<String>) -> Self {
            self.failures
                .lock()
                .unwrap()
                .insert(file_name.into(), message.into());
            self
        }

        /// Panic while printing `file_name`
        pub fn panic_on(self, file_name: impl Into<String>) -> Self {
            self.panics.lock().unwrap().push(file_name.into());
            self
        }

        /// Sleep before every print
        pub fn with_delay(self, delay: Duration) -> Self {
            *self.delay.lock().unwrap() = Some(delay);
            self
        }

        /// Run `hook` at the start of every print (e.g. to request cancellation)
        pub fn with_hook(self, hook: impl Fn(&PrintJob) + Send + Sync + 'static) -> Self {
            *self.hook.lock().unwrap() = Some(Arc::new(hook));
            self
        }

        /// Register the sheets of a workbook by file name
        pub fn with_sheets(self, file_name: impl Into<String>, sheets: Vec<SheetExtent>) -> Self {
            self.sheets.lock().unwrap().insert(file_name.into(), sheets);
            self
        }

        pub fn printed(&self) -> Vec<JobId> {
            self.printed.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.printed.lock().unwrap().len()
        }

        fn workbook(&self, file_path: &Path) -> Result<Vec<SheetExtent>, BackendError> {
            let name = file_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            self.sheets
                .lock()
                .unwrap()
                .get(&name)
                .cloned()
                .ok_or_else(|| BackendError::FileNotFound(file_path.display().to_string()))
        }
    }

    #[async_trait]
    impl PrintBackend for MockPrintBackend {
        async fn print(&self, job: &PrintJob) -> Result<(), BackendError> {
            self.printed.lock().unwrap().push(job.id.clone());

            let hook = self.hook.lock().unwrap().clone();
            if let Some(hook) = hook {
                hook(job);
            }

            let delay = *self.delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            let name = job.file_name();
            if self.panics.lock().unwrap().contains(&name) {
                panic!("mock backend panicked on {}", name); // panic isolation testing
            }
            let failure = self.failures.lock().unwrap().get(&name).cloned();
            match failure {
                Some(message) => Err(BackendError::Failed(message)),
                None => Ok(()),
            }
        }

        async fn list_sheets(&self, file_path: &Path) -> Result<Vec<String>, BackendError> {
            Ok(self
                .workbook(file_path)?
                .into_iter()
                .map(|sheet| sheet.name)
                .collect())
        }

        async fn measure_sheets(
            &self,
            file_path: &Path,
            sheets: &[String],
        ) -> Result<Vec<SheetExtent>, BackendError> {
            let all = self.workbook(file_path)?;
            if sheets.is_empty() {
                return Ok(all);
            }
            sheets
                .iter()
                .map(|wanted| {
                    all.iter()
                        .find(|sheet| &sheet.name == wanted)
                        .cloned()
                        .ok_or_else(|| BackendError::Failed(format!("sheet not found: {}", wanted)))
                })
                .collect()
        }
    }
}
