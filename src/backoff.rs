use std::time::Duration;

const MIN_RETRY_DELAY_SECS: f64 = 10.0;
const MAX_RETRY_DELAY_SECS: f64 = 3600.0;

/// Delay before the next retry after `consecutive_errors` failed sends in a row.
///
/// The first failure waits a fixed 10 seconds. After that the delay is drawn from an
/// exponentially growing slot: `jitter` (in `0..1`) picks the point inside it. The result is
/// multiplied by `linear_factor` and clamped to 10 seconds .. 1 hour.
pub(crate) fn delay_for(consecutive_errors: u32, linear_factor: u32, jitter: f64) -> Duration {
    let mut delay_secs = MIN_RETRY_DELAY_SECS;
    if consecutive_errors > 1 {
        let backoff_slot = (2f64.powi(consecutive_errors.min(64) as i32) - 1.0) / 2.0;
        let mut backoff_delay = (jitter.clamp(0.0, 1.0) * backoff_slot * 10.0).floor() + 1.0;
        backoff_delay *= linear_factor as f64;
        delay_secs = backoff_delay.max(delay_secs);
    }
    Duration::from_secs_f64(delay_secs.min(MAX_RETRY_DELAY_SECS))
}
