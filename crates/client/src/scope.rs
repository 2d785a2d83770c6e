use std::sync::Arc;

use tokio::sync::watch;

/// Cancellable execution scope shared by a service handle and every action
/// executed through it.
///
/// Clones observe the same signal. Cancellation is sticky: once triggered,
/// all current and future waits resolve immediately.
#[derive(Debug, Clone)]
pub struct ExecutionScope {
    cancel_tx: Arc<watch::Sender<bool>>,
}

impl ExecutionScope {
    pub fn new() -> Self {
        let (cancel_tx, _cancel_rx) = watch::channel(false);
        Self {
            cancel_tx: Arc::new(cancel_tx),
        }
    }

    pub fn cancel(&self) {
        self.cancel_tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel_tx.borrow()
    }

    /// Resolves once the scope is cancelled.
    pub async fn cancelled(&self) {
        let mut cancel_rx = self.cancel_tx.subscribe();
        // The sender lives as long as `self`, so this only returns on cancel.
        let _ = cancel_rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for ExecutionScope {
    fn default() -> Self {
        Self::new()
    }
}
