// CUPS `lp` print backend
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use batchprint_core::domain::{DuplexMode, PrintJob};
use batchprint_core::port::{BackendError, PrintBackend};

use crate::command_runner::CommandRunner;
use crate::constants::{DEFAULT_LP_PROGRAM, DEFAULT_PDF_TIMEOUT_SECS};

/// Submits files to CUPS with `lp`. Prints PDFs directly and is the final
/// step for converted office documents.
#[derive(Debug, Clone)]
pub struct LpBackend {
    program: PathBuf,
    runner: CommandRunner,
}

impl Default for LpBackend {
    fn default() -> Self {
        Self::new(
            DEFAULT_LP_PROGRAM,
            Duration::from_secs(DEFAULT_PDF_TIMEOUT_SECS),
        )
    }
}

impl LpBackend {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            runner: CommandRunner::new(timeout),
        }
    }

    /// Command line for submitting `file` with the job's options
    pub fn submit_args(job: &PrintJob, file: &Path, landscape: bool) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();
        if !job.printer_name.is_empty() {
            args.push("-d".into());
            args.push(job.printer_name.clone().into());
        }
        args.push("-n".into());
        args.push(job.copies.max(1).to_string().into());
        args.push("-t".into());
        args.push(job.file_name().into());
        args.push("-o".into());
        args.push(format!("sides={}", sides(job.duplex)).into());
        if !job.paper_size.is_empty() {
            args.push("-o".into());
            args.push(format!("media={}", job.paper_size).into());
        }
        if landscape {
            args.push("-o".into());
            args.push("landscape".into());
        }
        args.push("--".into());
        args.push(file.as_os_str().to_os_string());
        args
    }

    /// Submit `file` (the job's own file or a converted copy)
    pub async fn submit(&self, job: &PrintJob, file: &Path, landscape: bool) -> Result<(), BackendError> {
        let args = Self::submit_args(job, file, landscape);
        let output = self.runner.run(self.program.as_os_str(), args).await?;
        if !output.success() {
            return Err(BackendError::Failed(format!(
                "printer rejected the job: {}",
                output.failure_text()
            )));
        }
        info!(
            job_id = %job.id,
            printer = %job.display_printer(),
            response = %output.stdout.trim(),
            "Submitted to print queue"
        );
        Ok(())
    }
}

/// CUPS `sides` option value
fn sides(duplex: DuplexMode) -> &'static str {
    match duplex {
        DuplexMode::Off => "one-sided",
        DuplexMode::LongEdge => "two-sided-long-edge",
        DuplexMode::ShortEdge => "two-sided-short-edge",
    }
}

/// Missing input files fail before any program is started
pub(crate) fn ensure_exists(path: &Path) -> Result<(), BackendError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(BackendError::FileNotFound(path.display().to_string()))
    }
}

#[async_trait]
impl PrintBackend for LpBackend {
    async fn print(&self, job: &PrintJob) -> Result<(), BackendError> {
        ensure_exists(&job.file_path)?;
        self.submit(job, &job.file_path, false).await
    }
}
