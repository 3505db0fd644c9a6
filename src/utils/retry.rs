//! Retry utilities for rate-limited API calls.

use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;
use tokio::time::sleep;

/// Extra wait added on top of a service-supplied retry hint
pub const HINT_PADDING: Duration = Duration::from_secs(1);

/// Longest service-supplied retry hint that is honoured; larger hints are
/// clamped to it
pub const MAX_RETRY_HINT: Duration = Duration::from_secs(600);

/// Configuration for retry behavior
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    /// Wait used when the service gives no hint
    pub default_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            default_wait: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, default_wait: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            default_wait,
        }
    }

    /// Wait before the next attempt: the hint plus padding, else the default
    pub fn wait_for(&self, hint: Option<Duration>) -> Duration {
        match hint {
            Some(hint) => hint.saturating_add(HINT_PADDING),
            None => self.default_wait,
        }
    }
}

/// Failure of a single attempt
#[derive(Debug)]
pub enum AttemptError<E> {
    /// Rate limited; carries the service's retry-after hint when present
    RateLimited(Option<Duration>),
    /// Not worth retrying
    Permanent(E),
}

/// Final failure of a retried operation
#[derive(Debug)]
pub enum RetryError<E> {
    /// Every attempt was rate limited
    Exhausted { attempts: u32 },
    /// An attempt failed with a non-retryable error
    Permanent(E),
}

fn retry_hint_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)try again in (?:(\d+)m)?(\d+(?:\.\d+)?)(ms|s)\b")
            .unwrap_or_else(|e| panic!("invalid retry hint pattern: {e}"))
    })
}

/// Retry hint from a number of seconds, clamped to [`MAX_RETRY_HINT`].
///
/// Negative and NaN values are not a hint.
pub fn hint_from_secs(seconds: f64) -> Option<Duration> {
    if seconds.is_nan() || seconds < 0.0 {
        return None;
    }
    let seconds = seconds.min(MAX_RETRY_HINT.as_secs_f64());
    Duration::try_from_secs_f64(seconds).ok()
}

/// Parse a "try again in N s" hint out of a rate-limit message.
///
/// Accepts `2.5s`, `1m2.5s` and `750ms`.
pub fn parse_retry_after(message: &str) -> Option<Duration> {
    let caps = retry_hint_regex().captures(message)?;

    let minutes: f64 = match caps.get(1) {
        Some(m) => m.as_str().parse().ok()?,
        None => 0.0,
    };
    let value: f64 = caps.get(2)?.as_str().parse().ok()?;
    let seconds = match caps.get(3)?.as_str().to_ascii_lowercase().as_str() {
        "ms" => value / 1000.0,
        _ => value,
    };

    hint_from_secs(minutes * 60.0 + seconds)
}

/// Execute an async operation, retrying while it is rate limited.
///
/// There is no wait after the final attempt.
pub async fn with_retry<T, E, F, Fut>(policy: RetryPolicy, mut operation: F) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<T, AttemptError<E>>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation(attempt).await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::info!("Request succeeded on attempt {}", attempt);
                }
                return Ok(result);
            }
            Err(AttemptError::Permanent(error)) => return Err(RetryError::Permanent(error)),
            Err(AttemptError::RateLimited(hint)) => {
                if attempt >= max_attempts {
                    tracing::warn!("Still rate limited after {} attempts, giving up", attempt);
                    return Err(RetryError::Exhausted { attempts: attempt });
                }

                let delay = policy.wait_for(hint);
                tracing::warn!(
                    "Rate limit reached (attempt {}/{}), waiting {:.2}s before retrying",
                    attempt,
                    max_attempts,
                    delay.as_secs_f64()
                );
                sleep(delay).await;
            }
        }
    }
}
