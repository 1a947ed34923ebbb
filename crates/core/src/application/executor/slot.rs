// Execution slot: at most one background task (print run or orientation
// analysis) outstanding at a time

use crate::error::{AppError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct ExecutionSlot {
    busy: Arc<AtomicBool>,
}

impl ExecutionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the slot for `task`, or fail with `AppError::Busy`
    pub fn try_acquire(&self, task: &str) -> Result<SlotGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| SlotGuard {
                busy: Arc::clone(&self.busy),
            })
            .map_err(|_| AppError::Busy(task.to_string()))
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Releases the slot when dropped
pub struct SlotGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}
