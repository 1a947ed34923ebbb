// Composition root: concrete adapters behind the core ports

use std::sync::Arc;
use std::time::Duration;

use batchprint_core::application::{
    BackendRegistry, ExecutionSlot, JobExecutor, JobManager, OrientationAnalyzer,
};
use batchprint_core::domain::FileType;
use batchprint_core::port::id_provider::UuidProvider;
use batchprint_core::port::time_provider::SystemTimeProvider;
use batchprint_core::port::PrintBackend;
use batchprint_infra_system::{LpBackend, LpstatPrinterProvider, OfficeBackend};

use crate::config::AppConfig;

/// Everything a command needs, sharing one execution slot
pub struct App {
    pub manager: JobManager,
    pub executor: JobExecutor,
    pub analyzer: OrientationAnalyzer,
}

impl App {
    pub fn build(config: &AppConfig) -> Self {
        let backends = Arc::new(build_registry(config));
        let slot = ExecutionSlot::new();

        let manager = JobManager::new(
            config.settings.clone(),
            config.rule_set(),
            Arc::new(LpstatPrinterProvider::new(&config.backends.lpstat_program)),
            Arc::new(UuidProvider),
            Arc::clone(&backends),
        );
        let executor = JobExecutor::new(
            Arc::clone(&backends),
            slot.clone(),
            Arc::new(SystemTimeProvider),
        );
        let analyzer = OrientationAnalyzer::new(backends, slot);

        Self {
            manager,
            executor,
            analyzer,
        }
    }
}

/// PDF goes straight to `lp`; Office formats share one LibreOffice backend
pub fn build_registry(config: &AppConfig) -> BackendRegistry {
    let backends = &config.backends;
    let pdf = LpBackend::new(
        &backends.lp_program,
        Duration::from_secs(backends.pdf_timeout_secs),
    );
    let office: Arc<dyn PrintBackend> = Arc::new(OfficeBackend::new(
        &backends.soffice_program,
        Duration::from_secs(backends.office_timeout_secs),
        LpBackend::new(
            &backends.lp_program,
            Duration::from_secs(backends.pdf_timeout_secs),
        ),
        config.settings.excel_orientation_mode,
    ));

    BackendRegistry::new()
        .with(FileType::Pdf, Arc::new(pdf))
        .with(FileType::Word, Arc::clone(&office))
        .with(FileType::Excel, Arc::clone(&office))
        .with(FileType::Ppt, office)
}
