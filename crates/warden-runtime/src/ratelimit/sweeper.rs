//! Background eviction task.

use super::clock::as_millis;
use super::RateLimiter;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Default background sweep period in seconds.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Spawns a task that calls [`RateLimiter::sweep`] every `period`.
///
/// The task runs until the returned handle is aborted or the runtime
/// shuts down.
///
/// # Panics
///
/// Panics if called outside a tokio runtime.
pub fn spawn_sweeper(limiter: Arc<RateLimiter>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let period = period.max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        debug!(period_ms = as_millis(period), "rate limit sweeper started");

        loop {
            ticker.tick().await;
            limiter.sweep();
        }
    })
}
