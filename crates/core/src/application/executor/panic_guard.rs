// Panic isolation for backend calls
use std::any::Any;
use tokio::task::JoinError;
use tracing::error;

/// Readable message from a panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// Turn a failed backend task into a job failure message.
///
/// A panicking backend must not take the run down with it; the panic is
/// logged and reported like any other backend error.
pub fn join_error_message(job_id: &str, join_err: JoinError) -> String {
    if join_err.is_panic() {
        let payload = join_err.into_panic();
        let panic_msg = panic_message(payload.as_ref());
        error!(job_id = %job_id, panic_msg = %panic_msg, "Print backend panicked");
        format!("print backend panicked: {}", panic_msg)
    } else {
        error!(job_id = %job_id, "Print backend task was aborted");
        "print backend task was aborted".to_string()
    }
}
