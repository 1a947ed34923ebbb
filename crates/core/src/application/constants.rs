// Application constants (no magic values)

/// Buffered JobManager notifications per subscriber before it lags
pub const MANAGER_EVENT_CAPACITY: usize = 256;

/// Message stored on jobs skipped by cancellation
pub const CANCELLED_MESSAGE: &str = "Cancelled";

/// Failure message when a backend error carries no text
pub const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred.";

/// A sheet counts as landscape when width exceeds height by this factor
pub const LANDSCAPE_RATIO: f64 = 1.05;
