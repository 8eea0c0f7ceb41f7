use crate::error::FetchError;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Deadline and retry budget applied to one class of external call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallPolicy {
    pub timeout: Duration,
    /// Extra attempts after a retryable failure.
    pub retries: u32,
}

impl CallPolicy {
    #[must_use]
    pub const fn new(timeout: Duration, retries: u32) -> Self {
        Self { timeout, retries }
    }

    #[must_use]
    pub const fn from_millis(timeout_ms: u64, retries: u32) -> Self {
        Self::new(Duration::from_millis(timeout_ms), retries)
    }

    /// Runs `op` under the deadline, repeating it while the failure is retryable.
    ///
    /// # Errors
    /// Returns the last error once the budget is spent, or the first non-retryable one.
    pub async fn run<T, F, Fut>(&self, call: &str, mut op: F) -> Result<T, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut attempt = 0;
        loop {
            let result = match tokio::time::timeout(self.timeout, op()).await {
                Ok(result) => result,
                Err(_) => Err(FetchError::timeout(call, self.timeout)),
            };

            match result {
                Err(e) if e.is_retryable() && attempt < self.retries => {
                    attempt += 1;
                    warn!(call, attempt, error = %e, "External call failed, retrying");
                }
                other => return other,
            }
        }
    }
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self::from_millis(10_000, 1)
    }
}
