//! Print run scenarios: job manager + executor + in-memory backends

use async_trait::async_trait;
use batchprint_core::application::{
    cancel_channel, BackendRegistry, ExecutionSlot, ExecutorEvent, JobExecutor, JobManager,
    JobSelection, Orientation, OrientationAnalyzer, RunHandle,
};
use batchprint_core::domain::{FileType, JobStatus, PrintJob, PrintSettings, RuleSet};
use batchprint_core::port::id_provider::mocks::SequentialIdProvider;
use batchprint_core::port::print_backend::mocks::MockPrintBackend;
use batchprint_core::port::printer_provider::mocks::FixedPrinterProvider;
use batchprint_core::port::time_provider::SystemTimeProvider;
use batchprint_core::port::{BackendError, PrintBackend, SheetExtent};
use batchprint_core::AppError;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const ALL_TYPES: [FileType; 4] = [FileType::Pdf, FileType::Word, FileType::Excel, FileType::Ppt];

fn registry(backend: Arc<dyn PrintBackend>) -> Arc<BackendRegistry> {
    let mut registry = BackendRegistry::new();
    for file_type in ALL_TYPES {
        registry.register(file_type, Arc::clone(&backend));
    }
    Arc::new(registry)
}

fn manager(backends: Arc<BackendRegistry>, rules: RuleSet, files: &[&str]) -> JobManager {
    let mut manager = JobManager::new(
        PrintSettings::default(),
        rules,
        Arc::new(FixedPrinterProvider::new("Office")),
        Arc::new(SequentialIdProvider::new()),
        backends,
    );
    manager.add_files(files.iter().map(|f| format!("/queue/{}", f)));
    manager
}

fn executor(backends: Arc<BackendRegistry>, slot: ExecutionSlot) -> JobExecutor {
    JobExecutor::new(backends, slot, Arc::new(SystemTimeProvider))
}

async fn drive(manager: &mut JobManager, handle: &mut RunHandle) -> Vec<ExecutorEvent> {
    let mut events = Vec::new();
    while let Some(event) = handle.next_event().await {
        manager.apply_status_event(&event);
        events.push(event);
    }
    events
}

fn status_of(manager: &JobManager, file_name: &str) -> JobStatus {
    manager
        .jobs()
        .iter()
        .find(|job| job.file_name() == file_name)
        .map(|job| job.status)
        .unwrap()
}

/// Records the printer of every job and fails each file's first attempt
/// when it is listed as flaky
#[derive(Default)]
struct FlakyBackend {
    flaky: Mutex<HashSet<String>>,
    printed: Mutex<Vec<(String, String)>>,
}

impl FlakyBackend {
    fn flaky_on(files: &[&str]) -> Self {
        Self {
            flaky: Mutex::new(files.iter().map(|f| f.to_string()).collect()),
            printed: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl PrintBackend for FlakyBackend {
    async fn print(&self, job: &PrintJob) -> Result<(), BackendError> {
        let name = job.file_name();
        self.printed
            .lock()
            .unwrap()
            .push((name.clone(), job.printer_name.clone()));
        if self.flaky.lock().unwrap().remove(&name) {
            return Err(BackendError::Failed(format!(
                "printer {} is offline",
                job.printer_name
            )));
        }
        Ok(())
    }
}

/// Tracks how many prints are in flight at once
#[derive(Default)]
struct OverlapTracker {
    active: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl PrintBackend for OverlapTracker {
    async fn print(&self, _job: &PrintJob) -> Result<(), BackendError> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn test_failures_are_exactly_the_failing_set() {
    let files = ["f0.pdf", "f1.docx", "f2.xlsx", "f3.pptx", "f4.pdf", "f5.pdf"];
    let failing = ["f1.docx", "f4.pdf"];
    let mut backend = MockPrintBackend::new();
    for file in failing {
        backend = backend.fail_on(file, "Access is denied");
    }
    let backends = registry(Arc::new(backend));
    let mut manager = manager(backends.clone(), RuleSet::empty(), &files);
    let executor = executor(backends, ExecutionSlot::new());

    let mut handle = executor.start(&manager, JobSelection::AllEnabled).unwrap();
    let events = drive(&mut manager, &mut handle).await;
    let outcome = handle.wait().await.unwrap();

    for file in files {
        let expected = if failing.contains(&file) {
            JobStatus::Failed
        } else {
            JobStatus::Success
        };
        assert_eq!(status_of(&manager, file), expected, "{}", file);
    }
    let failed_events = events
        .iter()
        .filter(|e| matches!(e, ExecutorEvent::JobFailed { .. }))
        .count();
    assert_eq!(failed_events, failing.len());
    let finished: Vec<_> = events
        .iter()
        .filter(|e| matches!(e, ExecutorEvent::Finished { .. }))
        .collect();
    assert_eq!(finished, vec![&ExecutorEvent::Finished { cancelled: false }]);
    assert_eq!(events.last(), Some(&ExecutorEvent::Finished { cancelled: false }));
    assert_eq!((outcome.succeeded, outcome.failed), (4, 2));
    assert_eq!(manager.get_failed_jobs().len(), 2);
}

#[tokio::test]
async fn test_cancel_during_job_k_finishes_it_and_cancels_the_rest() {
    let files = ["f0.pdf", "f1.pdf", "f2.pdf", "f3.pdf", "f4.pdf"];
    let (cancel, token) = cancel_channel();
    let trigger = cancel.clone();
    let backend = MockPrintBackend::new().with_hook(move |job: &PrintJob| {
        if job.file_name() == "f2.pdf" {
            trigger.cancel();
        }
    });
    let backend = Arc::new(backend);
    let backends = registry(backend.clone());
    let mut manager = manager(backends.clone(), RuleSet::empty(), &files);
    let executor = executor(backends, ExecutionSlot::new());

    let mut handle = executor
        .start_with_cancel(&manager, JobSelection::AllEnabled, cancel, token)
        .unwrap();
    let events = drive(&mut manager, &mut handle).await;
    let outcome = handle.wait().await.unwrap();

    let statuses: Vec<JobStatus> = manager.jobs().iter().map(|job| job.status).collect();
    assert_eq!(
        statuses,
        vec![
            JobStatus::Success,
            JobStatus::Success,
            JobStatus::Success,
            JobStatus::Cancelled,
            JobStatus::Cancelled
        ]
    );
    assert_eq!(backend.call_count(), 3);
    assert_eq!(events.last(), Some(&ExecutorEvent::Finished { cancelled: true }));
    assert!(outcome.cancelled);
    assert_eq!(outcome.skipped_by_cancel, 2);
}

#[tokio::test]
async fn test_jobs_never_overlap() {
    let tracker = Arc::new(OverlapTracker::default());
    let backends = registry(tracker.clone());
    let mut manager = manager(
        backends.clone(),
        RuleSet::empty(),
        &["a.pdf", "b.docx", "c.xlsx", "d.pptx"],
    );
    let executor = executor(backends, ExecutionSlot::new());

    let mut handle = executor.start(&manager, JobSelection::AllEnabled).unwrap();
    drive(&mut manager, &mut handle).await;
    handle.wait().await.unwrap();

    assert_eq!(tracker.peak.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_print_run_and_analysis_share_one_slot() {
    let backend = MockPrintBackend::new().with_delay(Duration::from_millis(50));
    let backends = registry(Arc::new(backend));
    let mut manager = manager(backends.clone(), RuleSet::empty(), &["a.pdf", "b.xlsx"]);
    let slot = ExecutionSlot::new();
    let executor = executor(backends.clone(), slot.clone());
    let analyzer = OrientationAnalyzer::new(backends, slot.clone());

    let mut handle = executor.start(&manager, JobSelection::AllEnabled).unwrap();

    assert!(matches!(
        analyzer.start(&manager, JobSelection::AllEnabled),
        Err(AppError::Busy(_))
    ));
    assert!(matches!(
        executor.start(&manager, JobSelection::AllEnabled),
        Err(AppError::Busy(_))
    ));

    drive(&mut manager, &mut handle).await;
    handle.wait().await.unwrap();

    assert!(!slot.is_busy());
    assert!(analyzer.start(&manager, JobSelection::AllEnabled).is_ok());
}

#[tokio::test]
async fn test_retry_runs_only_failed_jobs() {
    let backend = Arc::new(FlakyBackend::flaky_on(&["b.pdf", "d.pdf"]));
    let backends = registry(backend.clone());
    let mut manager = manager(
        backends.clone(),
        RuleSet::empty(),
        &["a.pdf", "b.pdf", "c.pdf", "d.pdf"],
    );
    let executor = executor(backends, ExecutionSlot::new());

    let mut handle = executor.start(&manager, JobSelection::AllEnabled).unwrap();
    drive(&mut manager, &mut handle).await;
    handle.wait().await.unwrap();

    let failed: Vec<String> = manager
        .get_failed_jobs()
        .iter()
        .map(|job| job.id.clone())
        .collect();
    assert_eq!(failed, vec!["job-2", "job-4"]);
    let failed_job = manager.find_job_by_id("job-2").unwrap();
    assert_eq!(failed_job.message, "printer Office is offline");
    assert!(failed_job.summary.is_some());

    manager.reset_failed_jobs();
    assert_eq!(status_of(&manager, "b.pdf"), JobStatus::Waiting);

    let mut retry = executor.start(&manager, JobSelection::Jobs(failed)).unwrap();
    drive(&mut manager, &mut retry).await;
    let outcome = retry.wait().await.unwrap();

    assert_eq!((outcome.total, outcome.succeeded), (2, 2));
    assert!(manager.get_failed_jobs().is_empty());
    let printed: Vec<String> = backend
        .printed
        .lock()
        .unwrap()
        .iter()
        .map(|(name, _)| name.clone())
        .collect();
    assert_eq!(printed, vec!["a.pdf", "b.pdf", "c.pdf", "d.pdf", "b.pdf", "d.pdf"]);
}

#[tokio::test]
async fn test_rules_decide_printer_handed_to_backend() {
    let backend = Arc::new(FlakyBackend::default());
    let backends = registry(backend.clone());
    let mut rules = RuleSet::default();
    rules.set_rule("pdf", "LaserA");
    rules.set_rule(".XLSX", "Plotter");
    let mut manager = manager(backends.clone(), rules, &["a.pdf", "b.xlsx", "c.docx"]);
    manager.set_job_printer("job-3", "Color");
    let executor = executor(backends, ExecutionSlot::new());

    let mut handle = executor.start(&manager, JobSelection::AllEnabled).unwrap();
    drive(&mut manager, &mut handle).await;
    handle.wait().await.unwrap();

    assert_eq!(
        *backend.printed.lock().unwrap(),
        vec![
            ("a.pdf".to_string(), "LaserA".to_string()),
            ("b.xlsx".to_string(), "Plotter".to_string()),
            ("c.docx".to_string(), "Color".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_orientation_choices_reach_excel_jobs() {
    let sheet = |name: &str, width: f64, height: f64| SheetExtent {
        name: name.to_string(),
        width,
        height,
    };
    let backend = MockPrintBackend::new()
        .with_sheets("wide.xlsx", vec![sheet("Q1", 900.0, 300.0)])
        .with_sheets("tall.xlsx", vec![sheet("List", 300.0, 900.0)]);
    let backends = registry(Arc::new(backend));
    let mut manager = manager(
        backends.clone(),
        RuleSet::empty(),
        &["wide.xlsx", "memo.pdf", "tall.xlsx", "gone.xlsx"],
    );
    let analyzer = OrientationAnalyzer::new(backends, ExecutionSlot::new());

    let report = analyzer
        .start(&manager, JobSelection::AllEnabled)
        .unwrap()
        .wait()
        .await
        .unwrap();

    let recommendations: Vec<(String, Orientation)> = report
        .results
        .iter()
        .map(|r| (r.file_name.clone(), r.recommendation))
        .collect();
    assert_eq!(
        recommendations,
        vec![
            ("wide.xlsx".to_string(), Orientation::Landscape),
            ("tall.xlsx".to_string(), Orientation::Portrait),
            ("gone.xlsx".to_string(), Orientation::Undetermined),
        ]
    );

    let chosen: Vec<String> = report
        .results
        .iter()
        .filter(|r| r.recommendation == Orientation::Landscape)
        .map(|r| r.job_id.clone())
        .collect();
    manager.apply_orientation_choices(&chosen);

    let flags: Vec<(String, bool)> = manager
        .jobs()
        .iter()
        .map(|job| (job.file_name(), job.excel_auto_orientation))
        .collect();
    assert_eq!(
        flags,
        vec![
            ("wide.xlsx".to_string(), true),
            ("memo.pdf".to_string(), false),
            ("tall.xlsx".to_string(), false),
            ("gone.xlsx".to_string(), false),
        ]
    );
}
