use std::future::Future;

use tokio_util::sync::CancellationToken;

/// Per-invocation execution context handed to every stage and capability.
#[derive(Debug, Clone, Default)]
pub struct Context {
    cancel: CancellationToken,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context that is cancelled together with `token`
    pub fn with_cancellation(token: CancellationToken) -> Self {
        Self { cancel: token }
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once the invocation has been cancelled
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    /// Drive `fut` to completion unless the invocation is cancelled first.
    /// Returns `None` on cancellation; the future is dropped in that case.
    pub async fn run_until_cancelled<F>(&self, fut: F) -> Option<F::Output>
    where
        F: Future,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            output = fut => Some(output),
        }
    }
}
