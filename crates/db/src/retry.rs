//! Bounded retry for read paths. Writes are never routed through here;
//! a write that failed mid-transaction must surface, not repeat.

use std::future::Future;
use std::time::Duration;

use crate::repositories::RepositoryError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadRetryPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReadRetryPolicy {
    fn default() -> Self {
        Self { max_retries: 2, base_delay_ms: 50, max_delay_ms: 400 }
    }
}

impl ReadRetryPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

/// Runs `operation` under the default policy, repeating it only while the
/// failure looks transient (pool exhaustion, I/O, a locked database file).
/// Domain conflicts and decode failures return on the first attempt.
pub async fn with_read_retries<T, F, Fut>(operation: F) -> Result<T, RepositoryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RepositoryError>>,
{
    retry_with_policy(&ReadRetryPolicy::default(), operation).await
}

pub async fn retry_with_policy<T, F, Fut>(
    policy: &ReadRetryPolicy,
    mut operation: F,
) -> Result<T, RepositoryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RepositoryError>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) if attempt < policy.max_retries && is_transient(&error) => {
                let delay = policy.backoff(attempt);
                attempt += 1;
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
            Err(error) => return Err(error),
        }
    }
}

fn is_transient(error: &RepositoryError) -> bool {
    match error {
        RepositoryError::Database(sqlx::Error::Io(_))
        | RepositoryError::Database(sqlx::Error::PoolTimedOut) => true,
        RepositoryError::Database(sqlx::Error::Database(db)) => {
            let message = db.message().to_ascii_lowercase();
            message.contains("locked") || message.contains("busy")
        }
        _ => false,
    }
}
