// Application Layer - Use Cases and Business Logic

pub mod constants;
pub mod dispatch;
pub mod executor;
pub mod job_manager;
pub mod orientation;
pub mod rules_engine;

// Re-exports
pub use dispatch::BackendRegistry;
pub use executor::{
    cancel_channel, CancelSender, CancelToken, ExecutionSlot, ExecutorEvent, JobExecutor,
    JobSelection, RunHandle, RunOutcome,
};
pub use job_manager::{JobManager, ManagerEvent, SortColumn};
pub use orientation::{
    recommend_orientation, Orientation, OrientationAnalyzer, OrientationHandle, OrientationReport,
    OrientationResult,
};
pub use rules_engine::RulesEngine;
