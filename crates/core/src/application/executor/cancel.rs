// Run Cancellation Token

use tokio::sync::watch;

/// Cancellation signal observed by a running task.
///
/// Sticky: once requested it stays requested for the rest of the run.
#[derive(Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// Check if cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }
}

/// Requests cancellation; cheap to clone and hand to a signal handler
#[derive(Clone)]
pub struct CancelSender {
    tx: std::sync::Arc<watch::Sender<bool>>,
}

impl CancelSender {
    /// Request cancellation. The running job finishes first.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Create a cancellation channel
pub fn cancel_channel() -> (CancelSender, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (
        CancelSender {
            tx: std::sync::Arc::new(tx),
        },
        CancelToken { rx },
    )
}
