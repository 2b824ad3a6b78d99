// Retry policy for the request executor
//
// Attempt budget, base delay and the retryable-status predicate are plain
// data injected into the client, so tests can swap in fast, deterministic
// backoff without touching the executor.

use std::time::Duration;

use reqwest::StatusCode;

/// What the executor does with one response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Verdict {
    Success,
    Retry,
    Terminal,
}

/// Bounded exponential backoff.
///
/// The delay after failed attempt `n` (1-based) is `base_delay * 2^(n-1)`.
/// No jitter: this client only coordinates its own calls.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts per logical call, including the first. Minimum 1.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub base_delay: Duration,
    /// Which non-success statuses are worth another attempt.
    pub retryable_status: fn(StatusCode) -> bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            retryable_status: default_retryable_status,
        }
    }
}

/// 401, 403, 429 and every 5xx.
///
/// 403 is included because NTLM negotiation behind the IIS Administration
/// API surfaces mid-handshake failures as 403. Use
/// [`retryable_status_strict`] where that is known not to happen.
pub fn default_retryable_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 401 | 403 | 429) || status.is_server_error()
}

/// Like [`default_retryable_status`] but treats 403 as a genuine denial.
pub fn retryable_status_strict(status: StatusCode) -> bool {
    status != StatusCode::FORBIDDEN && default_retryable_status(status)
}

impl RetryPolicy {
    /// Policy that retries without sleeping. Meant for tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn with_retryable_status(mut self, predicate: fn(StatusCode) -> bool) -> Self {
        self.retryable_status = predicate;
        self
    }

    /// Attempt budget, never below one.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay to wait after failed attempt `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }

    /// Sum of every backoff delay a call can sleep through.
    pub fn worst_case_backoff(&self) -> Duration {
        (1..self.attempts())
            .map(|attempt| self.backoff(attempt))
            .fold(Duration::ZERO, Duration::saturating_add)
    }

    pub(crate) fn verdict(&self, status: StatusCode) -> Verdict {
        let code = status.as_u16();
        if (200..400).contains(&code) {
            Verdict::Success
        } else if (self.retryable_status)(status) {
            Verdict::Retry
        } else {
            Verdict::Terminal
        }
    }
}
