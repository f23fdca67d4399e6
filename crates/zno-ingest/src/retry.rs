//! Reconnect-and-retry policy
//!
//! Database work is retried in a flat loop: on a connection-class failure the
//! caller waits a fixed delay and starts over on a fresh connection. Any other
//! error ends the loop immediately. Waiting goes through `tokio::time`, so
//! tests drive the delay with a paused clock.

use crate::error::{IngestError, Result};
use crate::store::Connector;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Default pause between reconnect attempts
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Fixed wait before every retry
    pub delay: Duration,
    /// Total attempts allowed; `None` retries forever
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::unbounded(DEFAULT_RETRY_DELAY)
    }
}

impl RetryPolicy {
    pub fn unbounded(delay: Duration) -> Self {
        Self {
            delay,
            max_attempts: None,
        }
    }

    pub fn bounded(delay: Duration, max_attempts: u32) -> Self {
        Self {
            delay,
            max_attempts: Some(max_attempts),
        }
    }

    /// Handle the failure of attempt number `attempt` (1-based)
    ///
    /// Returns `Ok(())` after sleeping when the caller should try again,
    /// otherwise the error to surface.
    pub async fn backoff(&self, operation: &str, attempt: u32, err: IngestError) -> Result<()> {
        if !err.is_connection_error() {
            return Err(err);
        }

        if self.max_attempts.is_some_and(|max| attempt >= max) {
            return Err(IngestError::RetriesExhausted {
                attempts: attempt,
                source: Box::new(err),
            });
        }

        warn!(
            operation,
            attempt,
            delay_ms = self.delay.as_millis() as u64,
            error = %err,
            "Database connection error. Trying to reconnect..."
        );
        tokio::time::sleep(self.delay).await;
        Ok(())
    }
}

/// Run `op` until it succeeds, fails fatally, or the policy gives up
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, operation: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => policy.backoff(operation, attempt, err).await?,
        }
    }
}

/// Open a connection, retrying per `policy`
pub async fn connect_with_retry<C: Connector>(connector: &C, policy: &RetryPolicy) -> Result<C::Store> {
    retry(policy, "connect", move || connector.connect()).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn lost() -> IngestError {
        IngestError::ConnectionLost("connection refused".to_string())
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_success_with_fixed_delay() {
        let calls = Cell::new(0u32);
        let started = tokio::time::Instant::now();

        let value = retry(&RetryPolicy::default(), "test", || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move {
                if n < 4 {
                    Err(lost())
                } else {
                    Ok(n)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(value, 4);
        let waited = started.elapsed();
        assert!(waited >= DEFAULT_RETRY_DELAY * 3, "waited {:?}", waited);
        assert!(waited < DEFAULT_RETRY_DELAY * 4, "waited {:?}", waited);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_errors_are_not_retried() {
        let calls = Cell::new(0u32);
        let result: Result<()> = retry(&RetryPolicy::default(), "test", || {
            calls.set(calls.get() + 1);
            async { Err(IngestError::MissingProgress("zno".into())) }
        })
        .await;

        assert!(matches!(result, Err(IngestError::MissingProgress(_))));
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_policy_gives_up() {
        let calls = Cell::new(0u32);
        let policy = RetryPolicy::bounded(Duration::from_millis(10), 3);
        let result: Result<()> = retry(&policy, "test", || {
            calls.set(calls.get() + 1);
            async { Err(lost()) }
        })
        .await;

        match result {
            Err(IngestError::RetriesExhausted { attempts, source }) => {
                assert_eq!(attempts, 3);
                assert!(source.is_connection_error());
            },
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(calls.get(), 3);
    }
}
