use std::time::Duration;

use tokio_util::sync::{CancellationToken, DropGuard};

/// Single-use shutdown signal shared between a bridge handle and its task.
///
/// Triggering is idempotent and lock-free, so any number of tasks may call
/// [`trigger`](Self::trigger) concurrently. The data channel is never closed
/// to request shutdown.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    token: CancellationToken,
}

impl Shutdown {
    /// Create an untriggered signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive a signal that fires when `self` fires, but can also fire alone.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
        }
    }

    /// Request shutdown.
    pub fn trigger(&self) {
        self.token.cancel();
    }

    /// Returns true once shutdown has been requested.
    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Wait until shutdown is requested.
    pub async fn triggered(&self) {
        self.token.cancelled().await;
    }

    /// Sleep for `delay` unless shutdown is requested first.
    ///
    /// Returns `false` if the sleep was cut short by shutdown. A zero delay
    /// still yields to the scheduler once.
    pub async fn sleep(&self, delay: Duration) -> bool {
        if delay.is_zero() {
            tokio::task::yield_now().await;
            return !self.is_triggered();
        }
        tokio::select! {
            biased;
            _ = self.token.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }

    /// Guard that triggers this signal when dropped.
    pub(crate) fn drop_guard(&self) -> DropGuard {
        self.token.clone().drop_guard()
    }
}
