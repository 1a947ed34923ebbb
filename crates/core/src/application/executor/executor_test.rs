//! Unit tests for the sequential print loop

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::domain::{FailureCategory, FileType, PrintSettings, RuleSet};
    use crate::port::id_provider::mocks::SequentialIdProvider;
    use crate::port::print_backend::mocks::MockPrintBackend;
    use crate::port::printer_provider::mocks::FixedPrinterProvider;
    use crate::port::time_provider::mocks::SteppingTimeProvider;
    use std::time::Duration;

    fn registry_with(backend: Arc<MockPrintBackend>) -> Arc<BackendRegistry> {
        let mut registry = BackendRegistry::new();
        for file_type in [FileType::Pdf, FileType::Word, FileType::Excel, FileType::Ppt] {
            registry.register(file_type, backend.clone());
        }
        Arc::new(registry)
    }

    fn setup(backend: MockPrintBackend, files: &[&str]) -> (JobManager, JobExecutor, Arc<MockPrintBackend>) {
        let backend = Arc::new(backend);
        let registry = registry_with(backend.clone());
        let mut manager = JobManager::new(
            PrintSettings::default(),
            RuleSet::empty(),
            Arc::new(FixedPrinterProvider::new("Office")),
            Arc::new(SequentialIdProvider::new()),
            registry.clone(),
        );
        manager.add_files(files.iter().map(|f| format!("/queue/{}", f)));

        let executor = JobExecutor::new(
            registry,
            ExecutionSlot::new(),
            Arc::new(SteppingTimeProvider::new(1_000, 250)),
        );
        (manager, executor, backend)
    }

    /// Drain every event, applying statuses to the manager like a caller would
    async fn drive(manager: &mut JobManager, handle: &mut RunHandle) -> Vec<ExecutorEvent> {
        let mut events = Vec::new();
        while let Some(event) = handle.next_event().await {
            manager.apply_status_event(&event);
            events.push(event);
        }
        events
    }

    fn statuses(manager: &JobManager) -> Vec<JobStatus> {
        manager.jobs().iter().map(|job| job.status).collect()
    }

    fn failed_ids(events: &[ExecutorEvent]) -> Vec<JobId> {
        events
            .iter()
            .filter_map(|event| match event {
                ExecutorEvent::JobFailed { job_id } => Some(job_id.clone()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_all_jobs_succeed_in_order() {
        let (mut manager, executor, backend) =
            setup(MockPrintBackend::new(), &["a.pdf", "b.docx", "c.xlsx"]);

        let mut handle = executor.start(&manager, JobSelection::AllEnabled).unwrap();
        let events = drive(&mut manager, &mut handle).await;
        let outcome = handle.wait().await.unwrap();

        assert_eq!(backend.printed(), vec!["job-1", "job-2", "job-3"]);
        assert_eq!(statuses(&manager), vec![JobStatus::Success; 3]);
        assert_eq!(events.last(), Some(&ExecutorEvent::Finished { cancelled: false }));
        assert!(failed_ids(&events).is_empty());
        assert_eq!(outcome.succeeded, 3);
        assert_eq!(outcome.failed, 0);
        assert_eq!(outcome.elapsed_ms, 250);
    }

    #[tokio::test]
    async fn test_printing_precedes_terminal_status() {
        let (mut manager, executor, _) = setup(MockPrintBackend::new(), &["a.pdf"]);

        let mut handle = executor.start(&manager, JobSelection::AllEnabled).unwrap();
        let events = drive(&mut manager, &mut handle).await;

        assert_eq!(
            events,
            vec![
                ExecutorEvent::JobStatus {
                    job_id: "job-1".to_string(),
                    status: JobStatus::Printing,
                    message: String::new(),
                },
                ExecutorEvent::Progress {
                    completed: 0,
                    total: 1,
                    current_file: "a.pdf".to_string(),
                },
                ExecutorEvent::JobStatus {
                    job_id: "job-1".to_string(),
                    status: JobStatus::Success,
                    message: String::new(),
                },
                ExecutorEvent::Progress {
                    completed: 1,
                    total: 1,
                    current_file: "a.pdf".to_string(),
                },
                ExecutorEvent::Finished { cancelled: false },
            ]
        );
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let backend = MockPrintBackend::new().fail_on("b.pdf", "Printer 'LaserA' is offline");
        let (mut manager, executor, _) = setup(backend, &["a.pdf", "b.pdf", "c.pdf"]);

        let mut handle = executor.start(&manager, JobSelection::AllEnabled).unwrap();
        let events = drive(&mut manager, &mut handle).await;
        let outcome = handle.wait().await.unwrap();

        assert_eq!(
            statuses(&manager),
            vec![JobStatus::Success, JobStatus::Failed, JobStatus::Success]
        );
        assert_eq!(failed_ids(&events), vec!["job-2"]);
        assert_eq!(events.last(), Some(&ExecutorEvent::Finished { cancelled: false }));

        let failed = manager.find_job_by_id("job-2").unwrap();
        assert_eq!(failed.message, "Printer 'LaserA' is offline");
        assert_eq!(failed.summary, Some(FailureCategory::PrinterUnreachable));
        assert_eq!((outcome.succeeded, outcome.failed), (2, 1));
    }

    #[tokio::test]
    async fn test_empty_error_text_gets_generic_message() {
        let backend = MockPrintBackend::new().fail_on("a.pdf", "");
        let (mut manager, executor, _) = setup(backend, &["a.pdf"]);

        let mut handle = executor.start(&manager, JobSelection::AllEnabled).unwrap();
        drive(&mut manager, &mut handle).await;

        let job = manager.find_job_by_id("job-1").unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.message, UNEXPECTED_ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn test_backend_panic_becomes_failure() {
        let backend = MockPrintBackend::new().panic_on("b.pdf");
        let (mut manager, executor, _) = setup(backend, &["a.pdf", "b.pdf", "c.pdf"]);

        let mut handle = executor.start(&manager, JobSelection::AllEnabled).unwrap();
        let events = drive(&mut manager, &mut handle).await;

        assert_eq!(
            statuses(&manager),
            vec![JobStatus::Success, JobStatus::Failed, JobStatus::Success]
        );
        assert_eq!(failed_ids(&events), vec!["job-2"]);
        assert!(manager
            .find_job_by_id("job-2")
            .unwrap()
            .message
            .starts_with("print backend panicked"));
    }

    #[tokio::test]
    async fn test_cancel_before_job_k_marks_rest_cancelled() {
        let (cancel, token) = cancel_channel();
        let trigger = cancel.clone();
        // Request cancellation while job 2 is printing: job 2 finishes, 3..4 are cancelled
        let backend = MockPrintBackend::new().with_hook(move |job| {
            if job.file_name() == "b.pdf" {
                trigger.cancel();
            }
        });
        let (mut manager, executor, backend) =
            setup(backend, &["a.pdf", "b.pdf", "c.pdf", "d.pdf"]);

        let mut handle = executor
            .start_with_cancel(&manager, JobSelection::AllEnabled, cancel, token)
            .unwrap();
        let events = drive(&mut manager, &mut handle).await;
        let outcome = handle.wait().await.unwrap();

        assert_eq!(backend.printed(), vec!["job-1", "job-2"]);
        assert_eq!(
            statuses(&manager),
            vec![
                JobStatus::Success,
                JobStatus::Success,
                JobStatus::Cancelled,
                JobStatus::Cancelled
            ]
        );
        assert_eq!(manager.find_job_by_id("job-4").unwrap().message, CANCELLED_MESSAGE);
        assert_eq!(events.last(), Some(&ExecutorEvent::Finished { cancelled: true }));
        assert!(outcome.cancelled);
        assert_eq!(outcome.skipped_by_cancel, 2);
    }

    #[tokio::test]
    async fn test_cancel_before_start_prints_nothing() {
        let (mut manager, executor, backend) = setup(MockPrintBackend::new(), &["a.pdf", "b.pdf"]);
        let (cancel, token) = cancel_channel();
        cancel.cancel();

        let mut handle = executor
            .start_with_cancel(&manager, JobSelection::AllEnabled, cancel, token)
            .unwrap();
        let events = drive(&mut manager, &mut handle).await;

        assert_eq!(backend.call_count(), 0);
        assert_eq!(statuses(&manager), vec![JobStatus::Cancelled; 2]);
        assert_eq!(events.last(), Some(&ExecutorEvent::Finished { cancelled: true }));
    }

    #[tokio::test]
    async fn test_empty_run_still_finishes() {
        let (mut manager, executor, _) = setup(MockPrintBackend::new(), &[]);

        let mut handle = executor.start(&manager, JobSelection::AllEnabled).unwrap();
        let events = drive(&mut manager, &mut handle).await;

        assert_eq!(events, vec![ExecutorEvent::Finished { cancelled: false }]);
    }

    #[tokio::test]
    async fn test_selection_follows_caller_order_and_drops_unknown_ids() {
        let (mut manager, executor, backend) =
            setup(MockPrintBackend::new(), &["a.pdf", "b.pdf", "c.pdf"]);
        manager.set_job_enabled("job-1", false);

        let selection = JobSelection::Jobs(vec![
            "job-3".to_string(),
            "missing".to_string(),
            "job-1".to_string(),
        ]);
        let mut handle = executor.start(&manager, selection).unwrap();
        drive(&mut manager, &mut handle).await;

        assert_eq!(backend.printed(), vec!["job-3", "job-1"]);
        assert_eq!(manager.find_job_by_id("job-2").unwrap().status, JobStatus::Waiting);
    }

    #[tokio::test]
    async fn test_disabled_jobs_are_not_snapshotted() {
        let (mut manager, executor, backend) = setup(MockPrintBackend::new(), &["a.pdf", "b.pdf"]);
        manager.set_job_enabled("job-2", false);

        let mut handle = executor.start(&manager, JobSelection::AllEnabled).unwrap();
        drive(&mut manager, &mut handle).await;

        assert_eq!(backend.printed(), vec!["job-1"]);
    }

    #[tokio::test]
    async fn test_missing_backend_fails_the_job() {
        let backend = Arc::new(MockPrintBackend::new());
        let registry = Arc::new(BackendRegistry::new().with(FileType::Pdf, backend.clone()));
        let mut manager = JobManager::new(
            PrintSettings::default(),
            RuleSet::empty(),
            Arc::new(FixedPrinterProvider::new("Office")),
            Arc::new(SequentialIdProvider::new()),
            registry.clone(),
        );
        manager.add_files(["/queue/report.docx", "/queue/a.pdf"]);
        let executor = JobExecutor::new(
            registry,
            ExecutionSlot::new(),
            Arc::new(SteppingTimeProvider::new(0, 1)),
        );

        let mut handle = executor.start(&manager, JobSelection::AllEnabled).unwrap();
        let events = drive(&mut manager, &mut handle).await;

        let word = manager.find_job_by_id("job-1").unwrap();
        assert_eq!(word.status, JobStatus::Failed);
        assert_eq!(word.message, "No print backend registered for Word");
        assert_eq!(manager.find_job_by_id("job-2").unwrap().status, JobStatus::Success);
        assert_eq!(failed_ids(&events), vec!["job-1"]);
    }

    #[tokio::test]
    async fn test_second_run_is_rejected_while_busy() {
        let backend = MockPrintBackend::new().with_delay(Duration::from_millis(50));
        let (mut manager, executor, _) = setup(backend, &["a.pdf"]);

        let mut handle = executor.start(&manager, JobSelection::AllEnabled).unwrap();
        let second = executor.start(&manager, JobSelection::AllEnabled);
        assert!(matches!(second, Err(AppError::Busy(_))));

        drive(&mut manager, &mut handle).await;
        handle.wait().await.unwrap();

        assert!(executor.start(&manager, JobSelection::AllEnabled).is_ok());
    }

    #[tokio::test]
    async fn test_run_completes_without_listener() {
        let (manager, executor, backend) = setup(MockPrintBackend::new(), &["a.pdf", "b.pdf"]);

        let handle = executor.start(&manager, JobSelection::AllEnabled).unwrap();
        let outcome = tokio_test::assert_ok!(handle.wait().await);

        assert_eq!(backend.call_count(), 2);
        assert_eq!(outcome.total, 2);
        assert!(!outcome.cancelled);
    }
}
