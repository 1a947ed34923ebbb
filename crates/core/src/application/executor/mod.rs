// Job Executor - sequential print loop over a job snapshot

mod cancel;
mod panic_guard;
mod slot;

pub use cancel::{cancel_channel, CancelSender, CancelToken};
pub use panic_guard::{join_error_message, panic_message};
pub use slot::{ExecutionSlot, SlotGuard};

use crate::application::constants::{CANCELLED_MESSAGE, UNEXPECTED_ERROR_MESSAGE};
use crate::application::dispatch::BackendRegistry;
use crate::application::job_manager::JobManager;
use crate::domain::{JobId, JobStatus, PrintJob};
use crate::error::{AppError, Result};
use crate::port::TimeProvider;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Which jobs a run covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobSelection {
    /// Every enabled job, in queue order
    AllEnabled,
    /// Exactly these jobs, in the given order (unknown ids are dropped)
    Jobs(Vec<JobId>),
}

/// Observer contract of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutorEvent {
    JobStatus {
        job_id: JobId,
        status: JobStatus,
        message: String,
    },
    Progress {
        completed: usize,
        total: usize,
        current_file: String,
    },
    /// Separate from the FAILED status so callers can react per failure
    JobFailed { job_id: JobId },
    /// Sent exactly once, last
    Finished { cancelled: bool },
}

/// Completion value of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub cancelled: bool,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped_by_cancel: usize,
    pub elapsed_ms: i64,
}

/// A running print job batch
pub struct RunHandle {
    cancel: CancelSender,
    events: mpsc::UnboundedReceiver<ExecutorEvent>,
    join: JoinHandle<RunOutcome>,
}

impl RunHandle {
    /// Ask the run to stop after the current job
    pub fn request_cancel(&self) {
        self.cancel.cancel();
    }

    /// Handle for cancelling from elsewhere (e.g. a Ctrl+C task)
    pub fn canceller(&self) -> CancelSender {
        self.cancel.clone()
    }

    /// Next event; `None` once the run has finished and all events are drained
    pub async fn next_event(&mut self) -> Option<ExecutorEvent> {
        self.events.recv().await
    }

    /// Wait for the run to complete
    pub async fn wait(self) -> Result<RunOutcome> {
        self.join
            .await
            .map_err(|e| AppError::Internal(format!("print run task failed: {}", e)))
    }
}

/// Starts print runs. Jobs run strictly one at a time, in snapshot order.
pub struct JobExecutor {
    backends: Arc<BackendRegistry>,
    slot: ExecutionSlot,
    time_provider: Arc<dyn TimeProvider>,
}

impl JobExecutor {
    pub fn new(
        backends: Arc<BackendRegistry>,
        slot: ExecutionSlot,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            backends,
            slot,
            time_provider,
        }
    }

    /// Snapshot the selected jobs and start a run on a background task.
    ///
    /// # Errors
    /// `AppError::Busy` while another run or analysis holds the slot
    pub fn start(&self, manager: &JobManager, selection: JobSelection) -> Result<RunHandle> {
        let (cancel, token) = cancel_channel();
        self.start_with_cancel(manager, selection, cancel, token)
    }

    /// Like `start`, with a caller-created cancellation channel
    pub fn start_with_cancel(
        &self,
        manager: &JobManager,
        selection: JobSelection,
        cancel: CancelSender,
        token: CancelToken,
    ) -> Result<RunHandle> {
        let guard = self.slot.try_acquire("print run")?;
        let snapshot = snapshot(manager, &selection);
        let (tx, events) = mpsc::unbounded_channel();

        info!(jobs = snapshot.len(), selection = ?selection, "Starting print run");

        let run = PrintRun {
            snapshot,
            backends: Arc::clone(&self.backends),
            token,
            tx,
            time_provider: Arc::clone(&self.time_provider),
        };
        let join = tokio::spawn(run.execute(guard));

        Ok(RunHandle {
            cancel,
            events,
            join,
        })
    }
}

/// Fixed list of jobs for a run, captured once
pub(crate) fn snapshot(manager: &JobManager, selection: &JobSelection) -> Vec<PrintJob> {
    match selection {
        JobSelection::AllEnabled => manager.get_enabled_jobs().into_iter().cloned().collect(),
        JobSelection::Jobs(ids) => ids
            .iter()
            .filter_map(|id| manager.find_job_by_id(id))
            .cloned()
            .collect(),
    }
}

struct PrintRun {
    snapshot: Vec<PrintJob>,
    backends: Arc<BackendRegistry>,
    token: CancelToken,
    tx: mpsc::UnboundedSender<ExecutorEvent>,
    time_provider: Arc<dyn TimeProvider>,
}

impl PrintRun {
    fn emit(&self, event: ExecutorEvent) {
        // Receiver gone means nobody is listening; the run still completes
        let _ = self.tx.send(event);
    }

    fn emit_status(&self, job_id: &str, status: JobStatus, message: impl Into<String>) {
        self.emit(ExecutorEvent::JobStatus {
            job_id: job_id.to_string(),
            status,
            message: message.into(),
        });
    }

    async fn execute(self, guard: SlotGuard) -> RunOutcome {
        let started_at = self.time_provider.now_millis();
        let total = self.snapshot.len();
        let mut outcome = RunOutcome {
            cancelled: false,
            total,
            succeeded: 0,
            failed: 0,
            skipped_by_cancel: 0,
            elapsed_ms: 0,
        };
        let mut completed = 0;

        for (index, job) in self.snapshot.iter().enumerate() {
            if self.token.is_cancelled() {
                // Hard stop: this job and everything after it
                outcome.cancelled = true;
                for rest in &self.snapshot[index..] {
                    self.emit_status(&rest.id, JobStatus::Cancelled, CANCELLED_MESSAGE);
                    outcome.skipped_by_cancel += 1;
                }
                warn!(
                    completed = completed,
                    remaining = outcome.skipped_by_cancel,
                    "Print run cancelled"
                );
                break;
            }

            let file_name = job.file_name();
            self.emit_status(&job.id, JobStatus::Printing, "");
            self.emit(ExecutorEvent::Progress {
                completed,
                total,
                current_file: file_name.clone(),
            });

            match self.print_one(job).await {
                Ok(()) => {
                    info!(job_id = %job.id, file = %file_name, "Job printed");
                    self.emit_status(&job.id, JobStatus::Success, "");
                    outcome.succeeded += 1;
                }
                Err(message) => {
                    error!(job_id = %job.id, file = %file_name, error = %message, "Job failed");
                    self.emit_status(&job.id, JobStatus::Failed, message);
                    self.emit(ExecutorEvent::JobFailed {
                        job_id: job.id.clone(),
                    });
                    outcome.failed += 1;
                }
            }

            completed += 1;
            self.emit(ExecutorEvent::Progress {
                completed,
                total,
                current_file: file_name,
            });
        }

        outcome.elapsed_ms = self.time_provider.now_millis() - started_at;
        info!(
            cancelled = outcome.cancelled,
            succeeded = outcome.succeeded,
            failed = outcome.failed,
            elapsed_ms = outcome.elapsed_ms,
            "Print run finished"
        );

        // Free the slot before announcing completion so a listener can
        // start the next task right away
        drop(guard);
        self.emit(ExecutorEvent::Finished {
            cancelled: outcome.cancelled,
        });
        outcome
    }

    /// Dispatch one job to its backend. Errors and panics both come back as
    /// a failure message.
    async fn print_one(&self, job: &PrintJob) -> std::result::Result<(), String> {
        let Some(backend) = self.backends.resolve(job.file_type) else {
            // Registry lacks this file type; the rest of the run continues
            error!(job_id = %job.id, file_type = %job.file_type, "No backend for file type");
            return Err(AppError::NoBackend(job.file_type).to_string());
        };

        info!(
            job_id = %job.id,
            file = %job.file_path.display(),
            printer = %job.display_printer(),
            copies = job.copies,
            duplex = %job.duplex,
            paper_size = %job.paper_size,
            "Printing"
        );

        // Own task so a panicking backend cannot take down the run
        let task_job = job.clone();
        let handle = tokio::spawn(async move { backend.print(&task_job).await });

        match handle.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                let message = e.to_string();
                if message.trim().is_empty() {
                    Err(UNEXPECTED_ERROR_MESSAGE.to_string())
                } else {
                    Err(message)
                }
            }
            Err(join_err) => Err(join_error_message(&job.id, join_err)),
        }
    }
}

#[cfg(test)]
mod executor_test;
