// Job Manager - the ordered print queue and every mutation on it

mod sort;


pub use sort::SortColumn;

use crate::application::constants::MANAGER_EVENT_CAPACITY;
use crate::application::dispatch::BackendRegistry;
use crate::application::executor::ExecutorEvent;
use crate::application::rules_engine::RulesEngine;
use crate::domain::{
    classify_failure, FileType, JobId, JobStatus, PrintJob, PrintSettings, RuleSet,
};
use crate::error::{AppError, Result};
use crate::port::{IdProvider, PrinterProvider};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Change notification emitted after a mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagerEvent {
    /// Collection-level or batch change
    JobsChanged,
    /// A single job's fields changed
    JobUpdated(JobId),
}

/// Owns the ordered job collection.
///
/// Single owner, no internal locking. Lookups by unknown id are silent
/// no-ops. Bulk operations emit one notification, not one per job.
pub struct JobManager {
    jobs: Vec<PrintJob>,
    settings: PrintSettings,
    rules: RulesEngine,
    printer_provider: Arc<dyn PrinterProvider>,
    id_provider: Arc<dyn IdProvider>,
    backends: Arc<BackendRegistry>,
    events: broadcast::Sender<ManagerEvent>,
}

impl JobManager {
    pub fn new(
        settings: PrintSettings,
        rules: RuleSet,
        printer_provider: Arc<dyn PrinterProvider>,
        id_provider: Arc<dyn IdProvider>,
        backends: Arc<BackendRegistry>,
    ) -> Self {
        let (events, _) = broadcast::channel(MANAGER_EVENT_CAPACITY);
        Self {
            jobs: Vec::new(),
            settings,
            rules: RulesEngine::new(rules),
            printer_provider,
            id_provider,
            backends,
            events,
        }
    }

    /// Receive change notifications from now on
    pub fn subscribe(&self) -> broadcast::Receiver<ManagerEvent> {
        self.events.subscribe()
    }

    fn notify(&self, event: ManagerEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    pub fn settings(&self) -> &PrintSettings {
        &self.settings
    }

    /// Replace the defaults used for new jobs. Existing jobs are untouched
    /// until `apply_settings_to_jobs`.
    pub fn update_settings(&mut self, settings: PrintSettings) {
        self.settings = settings;
    }

    pub fn rules(&self) -> &RuleSet {
        self.rules.rules()
    }

    /// Existing jobs keep their printers until `apply_rules`.
    pub fn replace_rules(&mut self, rules: RuleSet) {
        self.rules.replace_rules(rules);
    }

    /// Printer used when no rule matches
    pub fn default_printer(&self) -> String {
        if self.settings.use_default_printer {
            self.printer_provider.default_printer_name()
        } else {
            self.settings.selected_printer.clone()
        }
    }

    // ------------------------------------------------------------------
    // Read access
    // ------------------------------------------------------------------

    pub fn jobs(&self) -> &[PrintJob] {
        &self.jobs
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    pub fn get_job(&self, index: usize) -> Option<&PrintJob> {
        self.jobs.get(index)
    }

    pub fn find_job_by_id(&self, job_id: &str) -> Option<&PrintJob> {
        self.jobs.iter().find(|job| job.id == job_id)
    }

    fn find_job_mut(&mut self, job_id: &str) -> Option<&mut PrintJob> {
        self.jobs.iter_mut().find(|job| job.id == job_id)
    }

    /// Enabled jobs that failed in the last run
    pub fn get_failed_jobs(&self) -> Vec<&PrintJob> {
        self.jobs
            .iter()
            .filter(|job| job.enabled && job.status == JobStatus::Failed)
            .collect()
    }

    pub fn get_enabled_jobs(&self) -> Vec<&PrintJob> {
        self.jobs.iter().filter(|job| job.enabled).collect()
    }

    // ------------------------------------------------------------------
    // Ingestion
    // ------------------------------------------------------------------

    /// Queue documents. Duplicates (by normalized path) and unsupported
    /// types are skipped silently. Returns how many jobs were added.
    pub fn add_files<I, P>(&mut self, paths: I) -> usize
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut known: HashSet<PathBuf> =
            self.jobs.iter().map(|job| job.file_path.clone()).collect();
        let mut default_printer: Option<String> = None;
        let mut added = 0;

        for path in paths {
            let normalized = normalize_path(path.as_ref());
            if known.contains(&normalized) {
                debug!(path = %normalized.display(), "Skipping duplicate file");
                continue;
            }
            if !FileType::from_path(&normalized).is_supported() {
                debug!(path = %normalized.display(), "Skipping unsupported file type");
                continue;
            }

            let default = default_printer.get_or_insert_with(|| self.default_printer());
            let printer = self.rules.resolve_printer(&normalized, default);
            let job = PrintJob::new(
                self.id_provider.generate_id(),
                normalized.clone(),
                printer,
                &self.settings,
            );

            known.insert(normalized);
            self.jobs.push(job);
            added += 1;
        }

        if added > 0 {
            info!(added = added, total = self.jobs.len(), "Jobs added");
            self.notify(ManagerEvent::JobsChanged);
        }
        added
    }

    /// Queue every file under `folder` (top level only unless `recursive`).
    /// A missing path or a non-directory is a no-op.
    pub fn add_folder(&mut self, folder: &Path, recursive: bool) -> usize {
        if !folder.is_dir() {
            debug!(folder = %folder.display(), "Not a directory, nothing to add");
            return 0;
        }
        self.add_files(folder_files(folder, recursive))
    }

    /// Queue a mix of files and folders as one batch. Folders expand in
    /// place, in file-name order, so the queue follows argument order.
    pub fn add_paths<I, P>(&mut self, paths: I, recursive: bool) -> usize
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut files = Vec::new();
        for path in paths {
            let path = path.as_ref();
            if path.is_dir() {
                files.extend(folder_files(path, recursive));
            } else {
                files.push(path.to_path_buf());
            }
        }
        self.add_files(files)
    }

    // ------------------------------------------------------------------
    // Collection edits
    // ------------------------------------------------------------------

    pub fn clear(&mut self) {
        self.jobs.clear();
        self.notify(ManagerEvent::JobsChanged);
    }

    /// Move a job. `from` outside the collection is ignored; `to` is clamped.
    pub fn move_job(&mut self, from_index: usize, to_index: usize) {
        if from_index >= self.jobs.len() {
            return;
        }
        let to_index = to_index.min(self.jobs.len() - 1);
        if from_index == to_index {
            return;
        }
        let job = self.jobs.remove(from_index);
        self.jobs.insert(to_index, job);
        self.notify(ManagerEvent::JobsChanged);
    }

    /// Returns how many jobs were removed
    pub fn remove_jobs(&mut self, job_ids: &[JobId]) -> usize {
        if job_ids.is_empty() {
            return 0;
        }
        let ids: HashSet<&str> = job_ids.iter().map(String::as_str).collect();
        let before = self.jobs.len();
        self.jobs.retain(|job| !ids.contains(job.id.as_str()));
        let removed = before - self.jobs.len();
        if removed > 0 {
            self.notify(ManagerEvent::JobsChanged);
        }
        removed
    }

    /// Stable sort; ties keep their previous relative order in both directions
    pub fn sort_jobs(&mut self, column: SortColumn, descending: bool) {
        if descending {
            self.jobs
                .sort_by_cached_key(|job| std::cmp::Reverse(column.key(job)));
        } else {
            self.jobs.sort_by_cached_key(|job| column.key(job));
        }
        self.notify(ManagerEvent::JobsChanged);
    }

    // ------------------------------------------------------------------
    // Per-job and bulk field updates
    // ------------------------------------------------------------------

    pub fn set_job_enabled(&mut self, job_id: &str, enabled: bool) {
        if let Some(job) = self.find_job_mut(job_id) {
            job.enabled = enabled;
            self.notify(ManagerEvent::JobUpdated(job_id.to_string()));
        }
    }

    pub fn set_jobs_enabled(&mut self, job_ids: &[JobId], enabled: bool) {
        let updated = self.update_matching(job_ids, |job| job.enabled = enabled);
        if updated {
            self.notify(ManagerEvent::JobsChanged);
        }
    }

    /// Assign a printer by hand; protects the job from non-forced rule runs
    pub fn set_job_printer(&mut self, job_id: &str, printer_name: &str) {
        if let Some(job) = self.find_job_mut(job_id) {
            job.printer_name = printer_name.to_string();
            job.manual_printer = true;
            self.notify(ManagerEvent::JobUpdated(job_id.to_string()));
        }
    }

    pub fn set_jobs_printer(&mut self, job_ids: &[JobId], printer_name: &str) {
        let updated = self.update_matching(job_ids, |job| {
            job.printer_name = printer_name.to_string();
            job.manual_printer = true;
        });
        if updated {
            self.notify(ManagerEvent::JobsChanged);
        }
    }

    /// Restrict an Excel job to `sheet_names` (empty = all sheets)
    pub fn set_job_sheets(&mut self, job_id: &str, sheet_names: &[String]) {
        if let Some(job) = self.find_job_mut(job_id) {
            job.excel_sheets = sheet_names.to_vec();
            self.notify(ManagerEvent::JobUpdated(job_id.to_string()));
        }
    }

    /// Record a status. FAILED also stores a classified summary; any other
    /// status clears it.
    pub fn set_job_status(&mut self, job_id: &str, status: JobStatus, message: impl Into<String>) {
        let message = message.into();
        let Some(job) = self.find_job_mut(job_id) else {
            return;
        };

        if !job.status.can_transition_to(status) {
            debug!(
                job_id = %job_id,
                from = %job.status,
                to = %status,
                "Unexpected job status transition"
            );
        }

        job.summary = if status == JobStatus::Failed {
            Some(classify_failure(&message))
        } else {
            None
        };
        job.status = status;
        job.message = message;
        self.notify(ManagerEvent::JobUpdated(job_id.to_string()));
    }

    /// Apply a status event coming from an executor run. Other events are
    /// ignored. Returns true if the event carried a status.
    pub fn apply_status_event(&mut self, event: &ExecutorEvent) -> bool {
        match event {
            ExecutorEvent::JobStatus {
                job_id,
                status,
                message,
            } => {
                self.set_job_status(job_id, *status, message.clone());
                true
            }
            _ => false,
        }
    }

    /// Re-resolve printers from the rules. Without `force`, hand-picked
    /// printers are kept; with `force`, every job is re-resolved and loses
    /// its manual flag. Always notifies, even when nothing changed.
    pub fn apply_rules(&mut self, force: bool) {
        let default_printer = self.default_printer();
        let mut resolved = 0;
        for job in &mut self.jobs {
            if force || !job.manual_printer {
                job.printer_name = self.rules.resolve_printer(&job.file_path, &default_printer);
                if force {
                    job.manual_printer = false;
                }
                resolved += 1;
            }
        }
        info!(force = force, resolved = resolved, "Rules applied");
        self.notify(ManagerEvent::JobsChanged);
    }

    /// Overwrite copies, duplex and paper size on every job with the current
    /// settings. Unlike printers there is no manual protection here.
    pub fn apply_settings_to_jobs(&mut self) {
        let settings = &self.settings;
        for job in &mut self.jobs {
            job.copies = settings.copies.max(1);
            job.duplex = settings.duplex;
            job.paper_size = settings.paper_size.clone();
        }
        self.notify(ManagerEvent::JobsChanged);
    }

    pub fn reset_statuses(&mut self) {
        for job in &mut self.jobs {
            job.reset_status();
        }
        self.notify(ManagerEvent::JobsChanged);
    }

    pub fn reset_statuses_for(&mut self, job_ids: &[JobId]) {
        let updated = self.update_matching(job_ids, PrintJob::reset_status);
        if updated {
            self.notify(ManagerEvent::JobsChanged);
        }
    }

    /// Put every FAILED job back to WAITING (retry)
    pub fn reset_failed_jobs(&mut self) {
        let mut updated = false;
        for job in self.jobs.iter_mut().filter(|j| j.status == JobStatus::Failed) {
            job.reset_status();
            updated = true;
        }
        if updated {
            self.notify(ManagerEvent::JobsChanged);
        }
    }

    // ------------------------------------------------------------------
    // Excel
    // ------------------------------------------------------------------

    /// Sheet names of a workbook. Backend failures are returned unchanged.
    pub async fn list_excel_sheets(&self, file_path: &Path) -> Result<Vec<String>> {
        let backend = self
            .backends
            .resolve(FileType::Excel)
            .ok_or(AppError::NoBackend(FileType::Excel))?;
        Ok(backend.list_sheets(file_path).await?)
    }

    /// Record which Excel jobs get automatic orientation (after analysis)
    pub fn apply_orientation_choices(&mut self, job_ids: &[JobId]) {
        let ids: HashSet<&str> = job_ids.iter().map(String::as_str).collect();
        for job in self
            .jobs
            .iter_mut()
            .filter(|job| job.file_type == FileType::Excel)
        {
            job.excel_auto_orientation = ids.contains(job.id.as_str());
        }
        self.notify(ManagerEvent::JobsChanged);
    }

    /// Apply `update` to every job whose id is listed; true if any matched
    fn update_matching(&mut self, job_ids: &[JobId], mut update: impl FnMut(&mut PrintJob)) -> bool {
        let ids: HashSet<&str> = job_ids.iter().map(String::as_str).collect();
        let mut updated = false;
        for job in self
            .jobs
            .iter_mut()
            .filter(|job| ids.contains(job.id.as_str()))
        {
            update(job);
            updated = true;
        }
        updated
    }
}

/// Files under `folder` in file-name order
fn folder_files(folder: &Path, recursive: bool) -> Vec<PathBuf> {
    let max_depth = if recursive { usize::MAX } else { 1 };
    WalkDir::new(folder)
        .min_depth(1)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.into_path())
        .filter(|path| path.is_file())
        .collect()
}

/// Absolute, lexically cleaned path (no filesystem access)
pub fn normalize_path(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    absolute.components().collect()
}
