// Excel orientation pre-analysis
//
// Measures the used range of each selected sheet and recommends a page
// orientation per workbook. Shares the execution slot with print runs.

use crate::application::constants::LANDSCAPE_RATIO;
use crate::application::dispatch::BackendRegistry;
use crate::application::executor::{
    cancel_channel, snapshot, CancelSender, CancelToken, ExecutionSlot, JobSelection, SlotGuard,
};
use crate::application::job_manager::JobManager;
use crate::domain::{FileType, JobId, PrintJob};
use crate::error::{AppError, Result};
use crate::port::{PrintBackend, SheetExtent};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Landscape,
    Portrait,
    Undetermined,
}

impl Orientation {
    pub fn label(self) -> &'static str {
        match self {
            Orientation::Landscape => "Landscape",
            Orientation::Portrait => "Portrait",
            Orientation::Undetermined => "Undetermined",
        }
    }
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Whether one sheet's used range reads as landscape
pub fn is_landscape(extent: &SheetExtent) -> bool {
    extent.width > extent.height * LANDSCAPE_RATIO
}

/// Majority vote over sheets; ties go to portrait
pub fn recommend_orientation(extents: &[SheetExtent]) -> (Orientation, String) {
    if extents.is_empty() {
        return (Orientation::Undetermined, "no sheets to measure".to_string());
    }
    let landscape = extents.iter().filter(|e| is_landscape(e)).count();
    let portrait = extents.len() - landscape;
    if landscape > portrait {
        (
            Orientation::Landscape,
            format!("wider than tall ({} of {} sheets)", landscape, extents.len()),
        )
    } else {
        (
            Orientation::Portrait,
            format!("taller than wide ({} of {} sheets)", portrait, extents.len()),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrientationResult {
    pub job_id: JobId,
    pub file_name: String,
    pub recommendation: Orientation,
    pub reason: String,
}

impl OrientationResult {
    /// Only determined results are offered for selection
    pub fn is_determined(&self) -> bool {
        self.recommendation != Orientation::Undetermined
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrientationReport {
    pub results: Vec<OrientationResult>,
    pub cancelled: bool,
}

pub struct OrientationHandle {
    cancel: CancelSender,
    join: JoinHandle<OrientationReport>,
}

impl OrientationHandle {
    pub fn request_cancel(&self) {
        self.cancel.cancel();
    }

    pub fn canceller(&self) -> CancelSender {
        self.cancel.clone()
    }

    pub async fn wait(self) -> Result<OrientationReport> {
        self.join
            .await
            .map_err(|e| AppError::Internal(format!("orientation analysis failed: {}", e)))
    }
}

pub struct OrientationAnalyzer {
    backends: Arc<BackendRegistry>,
    slot: ExecutionSlot,
}

impl OrientationAnalyzer {
    pub fn new(backends: Arc<BackendRegistry>, slot: ExecutionSlot) -> Self {
        Self { backends, slot }
    }

    /// Analyze the Excel jobs among `selection`. Non-Excel jobs are ignored.
    ///
    /// # Errors
    /// - `AppError::Busy` while a print run or another analysis is active
    /// - `AppError::NoBackend` when no Excel backend is registered
    pub fn start(&self, manager: &JobManager, selection: JobSelection) -> Result<OrientationHandle> {
        let backend = self
            .backends
            .resolve(FileType::Excel)
            .ok_or(AppError::NoBackend(FileType::Excel))?;
        let guard = self.slot.try_acquire("orientation analysis")?;

        let jobs: Vec<PrintJob> = snapshot(manager, &selection)
            .into_iter()
            .filter(|job| job.file_type == FileType::Excel)
            .collect();
        info!(jobs = jobs.len(), "Starting orientation analysis");

        let (cancel, token) = cancel_channel();
        let join = tokio::spawn(analyze(jobs, backend, token, guard));
        Ok(OrientationHandle { cancel, join })
    }
}

async fn analyze(
    jobs: Vec<PrintJob>,
    backend: Arc<dyn PrintBackend>,
    token: CancelToken,
    _guard: SlotGuard,
) -> OrientationReport {
    let mut report = OrientationReport::default();

    for job in &jobs {
        if token.is_cancelled() {
            warn!(analyzed = report.results.len(), "Orientation analysis cancelled");
            report.cancelled = true;
            break;
        }

        let (recommendation, reason) =
            match backend.measure_sheets(&job.file_path, &job.excel_sheets).await {
                Ok(extents) => recommend_orientation(&extents),
                Err(e) => {
                    warn!(job_id = %job.id, error = %e, "Could not analyze workbook");
                    (Orientation::Undetermined, format!("could not analyze: {}", e))
                }
            };

        info!(job_id = %job.id, recommendation = %recommendation, "Workbook analyzed");
        report.results.push(OrientationResult {
            job_id: job.id.clone(),
            file_name: job.file_name(),
            recommendation,
            reason,
        });
    }

    report
}
