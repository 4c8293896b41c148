//! Exponential backoff with symmetric jitter.

use std::time::Duration;
use rand::Rng;

/// Fraction of the capped delay used as the jitter amplitude (±25%).
pub const JITTER_RATIO: f64 = 0.25;

/// Capped exponential delay in milliseconds, before jitter.
///
/// `base_ms * 2^attempt_index`, saturating, then capped at `max_ms`.
pub fn capped_delay_ms(attempt_index: u32, base_ms: u64, max_ms: u64) -> u64 {
    let factor = 2u64.checked_pow(attempt_index).unwrap_or(u64::MAX);
    base_ms.saturating_mul(factor).min(max_ms)
}

/// Apply a jitter factor in `[-1.0, 1.0]` (scaled by [`JITTER_RATIO`]) and floor.
pub fn apply_jitter(delay_ms: u64, unit: f64) -> u64 {
    let unit = unit.clamp(-1.0, 1.0);
    let jitter = delay_ms as f64 * JITTER_RATIO * unit;
    (delay_ms as f64 + jitter).floor().max(0.0) as u64
}

/// Calculate the backoff before retry number `attempt_index + 1`.
///
/// Result lies in `[0.75 * capped, 1.25 * capped]`.
pub fn calculate_backoff(attempt_index: u32, base_ms: u64, max_ms: u64) -> Duration {
    let capped = capped_delay_ms(attempt_index, base_ms, max_ms);
    if capped == 0 {
        return Duration::ZERO;
    }
    let unit = rand::thread_rng().gen_range(-1.0..=1.0);
    Duration::from_millis(apply_jitter(capped, unit))
}
