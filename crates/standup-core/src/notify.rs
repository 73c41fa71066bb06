//! Notifier interface and bounded retry.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::NotifierConfig;
use crate::error::{Result, StandupError};
use crate::types::{Action, Member};

/// Delivery channel for prompts, escalation actions and summaries.
///
/// Every method may fail; callers wrap them in [`retry`].
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_prompt(&self, member: &Member) -> Result<()>;
    async fn send_action(&self, member: &Member, action: &Action) -> Result<()>;
    /// Post a team-wide summary to the management target.
    async fn send_summary(&self, text: &str) -> Result<()>;
}

/// Notifier that only logs. Used for dry runs and when no chat token is
/// configured.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_prompt(&self, member: &Member) -> Result<()> {
        tracing::info!(member = %member.id, target = %member.target, "prompt (log only)");
        Ok(())
    }

    async fn send_action(&self, member: &Member, action: &Action) -> Result<()> {
        tracing::info!(member = %member.id, target = %member.target, %action, "action (log only)");
        Ok(())
    }

    async fn send_summary(&self, text: &str) -> Result<()> {
        tracing::info!(chars = text.len(), "summary (log only)");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RetryPolicy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// No waiting between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }

    /// Delay before attempt `attempt + 1`: `base * 2^(attempt - 1)`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(6);
        self.base_delay * (1u32 << exp)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(500))
    }
}

impl From<&NotifierConfig> for RetryPolicy {
    fn from(cfg: &NotifierConfig) -> Self {
        Self::new(cfg.max_attempts, Duration::from_millis(cfg.base_delay_ms))
    }
}

/// Run `op` until it succeeds or `policy.max_attempts` is reached.
///
/// Returns the last result together with the number of attempts made.
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, op: F) -> (Result<T>, u32)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    retry_when(policy, |_| true, op).await
}

/// Like [`retry`] but only retries errors that are transient
/// (`StoreUnavailable`); anything else is returned after one attempt.
pub async fn retry_transient<T, F, Fut>(policy: &RetryPolicy, op: F) -> (Result<T>, u32)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    retry_when(policy, StandupError::is_transient, op).await
}

async fn retry_when<T, F, Fut>(
    policy: &RetryPolicy,
    should_retry: impl Fn(&StandupError) -> bool,
    mut op: F,
) -> (Result<T>, u32)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(v) => return (Ok(v), attempt),
            Err(e) if attempt < policy.max_attempts && should_retry(&e) => {
                let delay = policy.delay_after(attempt);
                tracing::warn!(attempt, ?delay, error = %e, "attempt failed, retrying");
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
            Err(e) => return (Err(e), attempt),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn backoff_doubles() {
        let p = RetryPolicy::new(5, Duration::from_millis(100));
        assert_eq!(p.delay_after(1), Duration::from_millis(100));
        assert_eq!(p.delay_after(2), Duration::from_millis(200));
        assert_eq!(p.delay_after(3), Duration::from_millis(400));
    }

    #[test]
    fn zero_attempts_is_clamped_to_one() {
        assert_eq!(RetryPolicy::immediate(0).max_attempts, 1);
    }

    #[tokio::test]
    async fn retry_stops_on_first_success() {
        let calls = AtomicU32::new(0);
        let (res, attempts) = retry(&RetryPolicy::immediate(3), || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                Err(StandupError::NotifierFailure {
                    member: "bob".into(),
                    reason: "rate_limited".into(),
                })
            } else {
                Ok(n)
            }
        })
        .await;
        assert_eq!(res.unwrap(), 1);
        assert_eq!(attempts, 2);
    }

    #[tokio::test]
    async fn retry_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let (res, attempts) = retry(&RetryPolicy::immediate(3), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(StandupError::NotifierFailure {
                member: "bob".into(),
                reason: "down".into(),
            })
        })
        .await;
        assert!(res.is_err());
        assert_eq!(attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retry_transient_does_not_retry_invariant_violations() {
        let calls = AtomicU32::new(0);
        let (res, attempts) = retry_transient(&RetryPolicy::immediate(3), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(StandupError::InvariantViolation("dup".into()))
        })
        .await;
        assert!(res.is_err());
        assert_eq!(attempts, 1);
    }

    #[tokio::test]
    async fn retry_transient_retries_store_unavailable() {
        let calls = AtomicU32::new(0);
        let (_, attempts) = retry_transient(&RetryPolicy::immediate(4), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(StandupError::StoreUnavailable("locked".into()))
        })
        .await;
        assert_eq!(attempts, 4);
    }
}
