//! Retry policy.
//!
//! # Responsibilities
//! - Classify transport errors and upstream statuses as retryable or terminal
//! - Compute the delay before the next attempt
//!
//! # Design Decisions
//! - Immutable once built; a dispatch snapshots one policy for its whole life
//! - Transport errors are matched by signature substring, statuses by set lookup
//! - Jittered backoff prevents synchronized retry storms

use std::collections::BTreeSet;
use std::time::Duration;

use crate::config::RetryConfig;
use crate::resilience::backoff::calculate_backoff;

/// What a single attempt produced, for classification.
#[derive(Debug, Clone, Copy)]
pub enum AttemptOutcome<'a> {
    /// Transport failed with this message.
    Error(&'a str),
    /// Upstream answered with this status.
    Status(u16),
}

/// Retry policy derived from [`RetryConfig`].
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay_ms: u64,
    max_delay_ms: u64,
    retryable_statuses: BTreeSet<u16>,
    retryable_signatures: Vec<String>,
    deadline: Option<Duration>,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
            retryable_statuses: config.retryable_status_codes.iter().copied().collect(),
            retryable_signatures: config.retryable_error_signatures.clone(),
            deadline: (config.deadline_ms > 0).then(|| Duration::from_millis(config.deadline_ms)),
        }
    }

    /// Number of retries after the first attempt.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Total wall-clock bound for one dispatch, if any.
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    pub fn retryable_statuses(&self) -> impl Iterator<Item = u16> + '_ {
        self.retryable_statuses.iter().copied()
    }

    /// Delay to wait before retry `attempt_index + 1`.
    pub fn delay(&self, attempt_index: u32) -> Duration {
        calculate_backoff(attempt_index, self.base_delay_ms, self.max_delay_ms)
    }

    /// Whether the outcome is a transient condition worth retrying.
    pub fn is_retryable(&self, outcome: AttemptOutcome<'_>) -> bool {
        match outcome {
            AttemptOutcome::Error(message) => self
                .retryable_signatures
                .iter()
                .any(|signature| message.contains(signature.as_str())),
            AttemptOutcome::Status(status) => self.retryable_statuses.contains(&status),
        }
    }

    /// Whether another attempt is allowed after attempt number `attempt` (0-based).
    pub fn has_attempts_left(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
