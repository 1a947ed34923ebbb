// Office documents: LibreOffice headless conversion to PDF, then `lp`
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use batchprint_core::application::{recommend_orientation, Orientation};
use batchprint_core::domain::{extension_of, FileType, OrientationMode, PrintJob};
use batchprint_core::port::{BackendError, PrintBackend, SheetExtent};

use crate::command_runner::CommandRunner;
use crate::constants::{DEFAULT_OFFICE_TIMEOUT_SECS, DEFAULT_SOFFICE_PROGRAM};
use crate::lp_backend::{ensure_exists, LpBackend};
use crate::xlsx::XlsxInspector;

/// Workbook formats the inspector can read
const INSPECTABLE_EXTENSIONS: &[&str] = &[".xlsx", ".xlsm"];

/// Prints Word, Excel and PowerPoint files. Also answers sheet queries for
/// Excel workbooks.
pub struct OfficeBackend {
    soffice: PathBuf,
    runner: CommandRunner,
    lp: LpBackend,
    inspector: XlsxInspector,
    orientation_mode: OrientationMode,
}

impl OfficeBackend {
    pub fn new(
        soffice: impl Into<PathBuf>,
        timeout: Duration,
        lp: LpBackend,
        orientation_mode: OrientationMode,
    ) -> Self {
        Self {
            soffice: soffice.into(),
            runner: CommandRunner::new(timeout),
            lp,
            inspector: XlsxInspector::new(),
            orientation_mode,
        }
    }

    pub fn with_defaults(lp: LpBackend, orientation_mode: OrientationMode) -> Self {
        Self::new(
            DEFAULT_SOFFICE_PROGRAM,
            Duration::from_secs(DEFAULT_OFFICE_TIMEOUT_SECS),
            lp,
            orientation_mode,
        )
    }

    /// Command line for converting `file` into `out_dir`
    pub fn convert_args(file: &Path, out_dir: &Path) -> Vec<OsString> {
        vec![
            "--headless".into(),
            "--norestore".into(),
            "--convert-to".into(),
            "pdf".into(),
            "--outdir".into(),
            out_dir.as_os_str().to_os_string(),
            file.as_os_str().to_os_string(),
        ]
    }

    async fn convert_to_pdf(
        &self,
        job: &PrintJob,
        source: &Path,
        out_dir: &Path,
    ) -> Result<PathBuf, BackendError> {
        let args = Self::convert_args(source, out_dir);
        let output = self.runner.run(self.soffice.as_os_str(), args).await?;
        if !output.success() {
            return Err(BackendError::Failed(format!(
                "LibreOffice conversion failed: {}",
                output.failure_text()
            )));
        }

        let stem = source
            .file_stem()
            .map(|s| s.to_os_string())
            .unwrap_or_default();
        let pdf = out_dir.join(stem).with_extension("pdf");
        if !pdf.is_file() {
            return Err(BackendError::Failed(format!(
                "LibreOffice produced no PDF for {}",
                job.file_name()
            )));
        }
        info!(job_id = %job.id, pdf = %pdf.display(), "Converted to PDF");
        Ok(pdf)
    }

    /// Whether an Excel job should go out in landscape. Analysis problems
    /// fall back to the printer's default orientation.
    async fn wants_landscape(&self, job: &PrintJob) -> bool {
        if job.file_type != FileType::Excel
            || !self.orientation_mode.applies_to(job.excel_auto_orientation)
        {
            return false;
        }
        match self.measure_sheets(&job.file_path, &job.excel_sheets).await {
            Ok(extents) => recommend_orientation(&extents).0 == Orientation::Landscape,
            Err(e) => {
                warn!(job_id = %job.id, error = %e, "Orientation check skipped");
                false
            }
        }
    }

    /// Copy of the workbook in `work_dir` showing only the job's selected
    /// sheets. Hidden sheets are left out of the PDF export.
    async fn restrict_to_sheets(&self, job: &PrintJob, work_dir: &Path) -> Result<PathBuf, BackendError> {
        let copy = work_dir.join(job.file_path.file_name().unwrap_or_default());
        let sheets = job.excel_sheets.clone();
        let dest = copy.clone();
        self.inspect(&job.file_path, move |inspector, path| {
            inspector.write_with_visible_sheets(&path, &dest, &sheets)
        })
        .await?;
        info!(job_id = %job.id, sheets = %job.excel_sheets.join(", "), "Printing selected sheets");
        Ok(copy)
    }

    fn ensure_inspectable(path: &Path) -> Result<(), BackendError> {
        if INSPECTABLE_EXTENSIONS.contains(&extension_of(path).as_str()) {
            Ok(())
        } else {
            Err(BackendError::Unsupported(format!(
                "sheet inspection needs an .xlsx or .xlsm workbook: {}",
                path.display()
            )))
        }
    }

    /// Run a blocking inspector call off the async runtime
    async fn inspect<T, F>(&self, path: &Path, f: F) -> Result<T, BackendError>
    where
        T: Send + 'static,
        F: FnOnce(XlsxInspector, PathBuf) -> Result<T, crate::xlsx::XlsxError> + Send + 'static,
    {
        ensure_exists(path)?;
        Self::ensure_inspectable(path)?;
        let inspector = self.inspector;
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || f(inspector, path))
            .await
            .map_err(|e| BackendError::Failed(format!("workbook inspection failed: {}", e)))?
            .map_err(BackendError::from)
    }
}

#[async_trait]
impl PrintBackend for OfficeBackend {
    async fn print(&self, job: &PrintJob) -> Result<(), BackendError> {
        ensure_exists(&job.file_path)?;
        let work_dir = tempfile::tempdir().map_err(|e| BackendError::Io(e.to_string()))?;
        let source = if job.file_type == FileType::Excel && !job.excel_sheets.is_empty() {
            self.restrict_to_sheets(job, work_dir.path()).await?
        } else {
            job.file_path.clone()
        };

        let landscape = self.wants_landscape(job).await;
        let pdf = self.convert_to_pdf(job, &source, work_dir.path()).await?;
        self.lp.submit(job, &pdf, landscape).await
    }

    async fn list_sheets(&self, file_path: &Path) -> Result<Vec<String>, BackendError> {
        self.inspect(file_path, |inspector, path| inspector.sheet_names(&path))
            .await
    }

    async fn measure_sheets(
        &self,
        file_path: &Path,
        sheets: &[String],
    ) -> Result<Vec<SheetExtent>, BackendError> {
        let sheets = sheets.to_vec();
        self.inspect(file_path, move |inspector, path| inspector.measure(&path, &sheets))
            .await
    }
}
