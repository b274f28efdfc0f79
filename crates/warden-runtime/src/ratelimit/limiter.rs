//! Fixed-window rate limiter.
//!
//! # Locking
//!
//! ```text
//! table: RwLock<HashMap<RateLimitKey, Arc<Mutex<CounterSet>>>>
//!          │ read lock: lookup (shared by all keys)
//!          │ write lock: first call for a key, sweep
//!          ▼
//! per-key Mutex: every policy of one call evaluated atomically
//! ```
//!
//! Calls on different keys only share the table read lock. Calls on the
//! same key are serialized by that key's mutex, so the boundary call at
//! `count == limit` is admitted exactly once.
//!
//! # Eviction
//!
//! A key is evicted once every counter's `window_start` is older than
//! `eviction_multiple × longest window`. The longest window is the
//! largest window of any policy ever checked. Sweeps run at most once
//! per longest window from [`RateLimiter::check`], or from a background
//! task (see [`spawn_sweeper`](super::spawn_sweeper)).

use super::clock::{as_millis, Clock, SystemClock};
use super::RateLimitPolicy;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use warden_types::UserId;

/// Default eviction safety multiple.
pub const DEFAULT_EVICTION_MULTIPLE: u32 = 2;

/// Counter key: one identity on one route group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateLimitKey {
    /// The caller.
    pub user: UserId,
    /// Route group, e.g. `"contacts"`.
    pub group: String,
}

impl RateLimitKey {
    /// Creates a key.
    #[must_use]
    pub fn new(user: UserId, group: impl Into<String>) -> Self {
        Self {
            user,
            group: group.into(),
        }
    }
}

impl std::fmt::Display for RateLimitKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.user, self.group)
    }
}

/// Outcome of one [`RateLimiter::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitResult {
    /// `true` if every bound policy admitted the call.
    pub allowed: bool,
    /// Calls left under the tightest policy; `None` when unbounded.
    pub remaining: Option<u64>,
    /// Time until the tightest policy's window resets.
    pub reset_after: Option<Duration>,
    /// Set only when denied: the longest wait across denying policies.
    pub retry_after: Option<Duration>,
}

impl RateLimitResult {
    /// Result for a route with no policies.
    #[must_use]
    pub fn unlimited() -> Self {
        Self {
            allowed: true,
            remaining: None,
            reset_after: None,
            retry_after: None,
        }
    }

    /// `retry_after` in whole seconds, rounded up.
    #[must_use]
    pub fn retry_after_seconds(&self) -> Option<u64> {
        self.retry_after.map(ceil_secs)
    }

    /// `reset_after` in whole seconds, rounded up.
    #[must_use]
    pub fn reset_after_seconds(&self) -> Option<u64> {
        self.reset_after.map(ceil_secs)
    }
}

fn ceil_secs(d: Duration) -> u64 {
    d.as_secs() + u64::from(d.subsec_nanos() > 0)
}

#[derive(Debug, Clone, Copy)]
struct Counter {
    policy: RateLimitPolicy,
    window_start: Duration,
    count: u64,
}

#[derive(Debug, Default)]
struct CounterSet {
    counters: Vec<Counter>,
    /// Set by the sweeper when the entry is removed from the table.
    evicted: bool,
}

impl CounterSet {
    fn counter_mut(&mut self, policy: RateLimitPolicy, now: Duration) -> &mut Counter {
        let pos = match self.counters.iter().position(|c| c.policy == policy) {
            Some(pos) => pos,
            None => {
                self.counters.push(Counter {
                    policy,
                    window_start: now,
                    count: 0,
                });
                self.counters.len() - 1
            }
        };
        &mut self.counters[pos]
    }

    fn idle_for(&self, now: Duration, horizon: Duration) -> bool {
        self.counters
            .iter()
            .all(|c| now.saturating_sub(c.window_start) >= horizon)
    }

    fn apply(&mut self, policies: &[RateLimitPolicy], now: Duration) -> RateLimitResult {
        let mut allowed = true;
        let mut remaining = u64::MAX;
        let mut reset_after = Duration::ZERO;
        let mut retry_after: Option<Duration> = None;

        for (i, &policy) in policies.iter().enumerate() {
            if policies[..i].contains(&policy) {
                continue;
            }

            let window = policy.window();
            let counter = self.counter_mut(policy, now);
            if now.saturating_sub(counter.window_start) >= window {
                counter.window_start = now;
                counter.count = 0;
            }
            counter.count = counter.count.saturating_add(1);

            let until_reset = window.saturating_sub(now.saturating_sub(counter.window_start));
            if counter.count > policy.limit {
                allowed = false;
                retry_after = Some(retry_after.map_or(until_reset, |r| r.max(until_reset)));
            }

            let left = policy.limit.saturating_sub(counter.count);
            if left < remaining || (left == remaining && until_reset > reset_after) {
                remaining = left;
                reset_after = until_reset;
            }
        }

        RateLimitResult {
            allowed,
            remaining: Some(remaining),
            reset_after: Some(reset_after),
            retry_after,
        }
    }
}

/// Per-key fixed-window rate limiter.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use warden_runtime::ratelimit::{ManualClock, RateLimitKey, RateLimitPolicy, RateLimiter};
/// use warden_types::UserId;
///
/// let clock = Arc::new(ManualClock::new());
/// let limiter = RateLimiter::new(clock.clone());
/// let key = RateLimitKey::new(UserId::new(), "contacts");
/// let policies = [RateLimitPolicy::new(60, 2)];
///
/// assert!(limiter.check(&key, &policies).allowed);
/// assert!(limiter.check(&key, &policies).allowed);
/// assert!(!limiter.check(&key, &policies).allowed);
///
/// clock.advance(Duration::from_secs(60));
/// assert!(limiter.check(&key, &policies).allowed);
/// ```
#[derive(Debug)]
pub struct RateLimiter {
    clock: Arc<dyn Clock>,
    table: RwLock<HashMap<RateLimitKey, Arc<Mutex<CounterSet>>>>,
    eviction_multiple: u32,
    longest_window_ms: AtomicU64,
    last_sweep_ms: AtomicU64,
}

impl RateLimiter {
    /// Creates an empty limiter on the given clock.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            table: RwLock::new(HashMap::new()),
            eviction_multiple: DEFAULT_EVICTION_MULTIPLE,
            longest_window_ms: AtomicU64::new(0),
            last_sweep_ms: AtomicU64::new(0),
        }
    }

    /// Creates an empty limiter on the system clock.
    #[must_use]
    pub fn system() -> Self {
        Self::new(Arc::new(SystemClock::new()))
    }

    /// Sets the eviction multiple (minimum 1).
    #[must_use]
    pub fn with_eviction_multiple(mut self, multiple: u32) -> Self {
        self.eviction_multiple = multiple.max(1);
        self
    }

    /// The limiter's clock.
    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Counts one call for `key` against every policy and reports the outcome.
    ///
    /// Denied calls are still counted. An empty policy list always allows.
    pub fn check(&self, key: &RateLimitKey, policies: &[RateLimitPolicy]) -> RateLimitResult {
        if policies.is_empty() {
            return RateLimitResult::unlimited();
        }

        let longest = policies
            .iter()
            .map(|p| as_millis(p.window()))
            .max()
            .unwrap_or(0);
        self.longest_window_ms.fetch_max(longest, Ordering::Relaxed);
        self.maybe_sweep();

        loop {
            let entry = self.entry(key);
            let mut set = entry.lock();
            if set.evicted {
                continue;
            }
            let now = self.clock.now();
            return set.apply(policies, now);
        }
    }

    /// Clears every counter.
    pub fn reset(&self) {
        let mut table = self.table.write();
        for (_, entry) in table.drain() {
            entry.lock().evicted = true;
        }
        debug!("rate limiter reset");
    }

    /// Evicts idle keys and returns how many were removed.
    ///
    /// Keys whose lock is currently held are kept.
    pub fn sweep(&self) -> usize {
        let horizon = self.longest_window().saturating_mul(self.eviction_multiple);
        let now = self.clock.now();
        self.last_sweep_ms.store(as_millis(now), Ordering::Relaxed);

        let mut table = self.table.write();
        let before = table.len();
        table.retain(|_, entry| match entry.try_lock() {
            Some(mut set) if set.idle_for(now, horizon) => {
                set.evicted = true;
                false
            }
            _ => true,
        });
        let removed = before - table.len();

        if removed > 0 {
            debug!(removed, active = table.len(), "evicted idle rate limit keys");
        }
        removed
    }

    /// Number of keys currently tracked.
    #[must_use]
    pub fn active_keys(&self) -> usize {
        self.table.read().len()
    }

    /// Longest window of any policy checked so far.
    #[must_use]
    pub fn longest_window(&self) -> Duration {
        Duration::from_millis(self.longest_window_ms.load(Ordering::Relaxed))
    }

    fn entry(&self, key: &RateLimitKey) -> Arc<Mutex<CounterSet>> {
        if let Some(entry) = self.table.read().get(key) {
            return Arc::clone(entry);
        }
        let mut table = self.table.write();
        Arc::clone(table.entry(key.clone()).or_default())
    }

    fn maybe_sweep(&self) {
        let longest = self.longest_window_ms.load(Ordering::Relaxed);
        let now = as_millis(self.clock.now());
        let last = self.last_sweep_ms.load(Ordering::Relaxed);
        if longest == 0 || now.saturating_sub(last) < longest {
            return;
        }
        // One caller wins the slot; the rest skip.
        if self
            .last_sweep_ms
            .compare_exchange(last, now, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
        {
            self.sweep();
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::system()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::ManualClock;
    use std::sync::Barrier;
    use std::thread;

    fn limiter() -> (Arc<ManualClock>, RateLimiter) {
        let clock = Arc::new(ManualClock::new());
        (clock.clone(), RateLimiter::new(clock))
    }

    fn key(group: &str) -> RateLimitKey {
        RateLimitKey::new(UserId::new(), group)
    }

    #[test]
    fn tenth_allowed_eleventh_denied() {
        let (clock, limiter) = limiter();
        let key = key("contacts");
        let policies = [RateLimitPolicy::STRICT];

        for i in 0..10 {
            clock.advance(Duration::from_millis(100));
            let result = limiter.check(&key, &policies);
            assert!(result.allowed, "call {} should be allowed", i + 1);
            assert_eq!(result.remaining, Some(9 - i));
            assert_eq!(result.retry_after, None);
        }

        let denied = limiter.check(&key, &policies);
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, Some(0));
        let retry = denied.retry_after_seconds().expect("retry set when denied");
        assert!(retry > 0 && retry <= 60, "retry = {retry}");
        // Window opened at 0.1s; the 11th call lands at 1.0s.
        assert_eq!(denied.retry_after, Some(Duration::from_millis(59_100)));
        assert_eq!(retry, 60);
    }

    #[test]
    fn window_reset_after_exhaustion() {
        let (clock, limiter) = limiter();
        let key = key("contacts");
        let policies = [RateLimitPolicy::new(60, 3)];

        for _ in 0..5 {
            limiter.check(&key, &policies);
        }
        assert!(!limiter.check(&key, &policies).allowed);

        clock.advance(Duration::from_secs(60));
        let fresh = limiter.check(&key, &policies);
        assert!(fresh.allowed);
        assert_eq!(fresh.remaining, Some(2));
        assert_eq!(fresh.reset_after_seconds(), Some(60));
    }

    #[test]
    fn denied_calls_keep_counting_within_window() {
        let (clock, limiter) = limiter();
        let key = key("deals");
        let policies = [RateLimitPolicy::new(10, 1)];

        assert!(limiter.check(&key, &policies).allowed);
        clock.advance(Duration::from_secs(4));
        let denied = limiter.check(&key, &policies);
        assert!(!denied.allowed);
        assert_eq!(denied.retry_after_seconds(), Some(6));

        clock.advance(Duration::from_secs(5));
        assert!(!limiter.check(&key, &policies).allowed);

        clock.advance(Duration::from_secs(1));
        assert!(limiter.check(&key, &policies).allowed);
    }

    #[test]
    fn all_policies_must_pass_and_retry_is_max() {
        let (clock, limiter) = limiter();
        let key = key("search");
        let short = RateLimitPolicy::new(1, 2);
        let long = RateLimitPolicy::new(60, 3);

        assert!(limiter.check(&key, &[short, long]).allowed);
        assert!(limiter.check(&key, &[short, long]).allowed);
        clock.advance(Duration::from_secs(1));
        assert!(limiter.check(&key, &[short, long]).allowed);

        // Short window has room again, long window is exhausted.
        clock.advance(Duration::from_secs(1));
        let denied = limiter.check(&key, &[short, long]);
        assert!(!denied.allowed);
        assert_eq!(denied.retry_after, Some(Duration::from_secs(58)));

        // Both deny: the longer wait is reported.
        limiter.check(&key, &[short, long]);
        let denied = limiter.check(&key, &[short, long]);
        assert!(!denied.allowed);
        assert_eq!(denied.retry_after, Some(Duration::from_secs(58)));
    }

    #[test]
    fn remaining_reports_tightest_policy() {
        let (_clock, limiter) = limiter();
        let key = key("search");
        let result = limiter.check(
            &key,
            &[RateLimitPolicy::new(1, 5), RateLimitPolicy::new(60, 2)],
        );
        assert_eq!(result.remaining, Some(1));
        assert_eq!(result.reset_after, Some(Duration::from_secs(60)));
    }

    #[test]
    fn duplicate_policy_counts_once() {
        let (_clock, limiter) = limiter();
        let key = key("contacts");
        let policy = RateLimitPolicy::new(60, 2);

        assert!(limiter.check(&key, &[policy, policy]).allowed);
        assert!(limiter.check(&key, &[policy, policy]).allowed);
        assert!(!limiter.check(&key, &[policy, policy]).allowed);
    }

    #[test]
    fn empty_policies_are_unlimited() {
        let (_clock, limiter) = limiter();
        let key = key("health");
        for _ in 0..1000 {
            assert_eq!(limiter.check(&key, &[]), RateLimitResult::unlimited());
        }
        assert_eq!(limiter.active_keys(), 0);
    }

    #[test]
    fn keys_are_independent() {
        let (_clock, limiter) = limiter();
        let user = UserId::new();
        let a_contacts = RateLimitKey::new(user, "contacts");
        let a_deals = RateLimitKey::new(user, "deals");
        let b_contacts = RateLimitKey::new(UserId::new(), "contacts");
        let policies = [RateLimitPolicy::new(60, 1)];

        assert!(limiter.check(&a_contacts, &policies).allowed);
        assert!(!limiter.check(&a_contacts, &policies).allowed);

        assert!(limiter.check(&a_deals, &policies).allowed);
        assert!(limiter.check(&b_contacts, &policies).allowed);
        assert_eq!(limiter.active_keys(), 3);
    }

    #[test]
    fn sweep_evicts_only_idle_keys() {
        let (clock, limiter) = limiter();
        let policies = [RateLimitPolicy::new(60, 10)];
        let idle = key("contacts");
        let busy = key("contacts");

        limiter.check(&idle, &policies);
        clock.advance(Duration::from_secs(100));
        limiter.check(&busy, &policies);

        clock.advance(Duration::from_secs(20));
        assert_eq!(limiter.sweep(), 1);
        assert_eq!(limiter.active_keys(), 1);

        // A swept key starts over.
        let result = limiter.check(&idle, &policies);
        assert_eq!(result.remaining, Some(9));
    }

    #[test]
    fn eviction_multiple_scales_horizon() {
        let clock = Arc::new(ManualClock::new());
        let limiter = RateLimiter::new(clock.clone()).with_eviction_multiple(3);
        limiter.check(&key("contacts"), &[RateLimitPolicy::new(10, 1)]);

        clock.advance(Duration::from_secs(29));
        assert_eq!(limiter.sweep(), 0);
        clock.advance(Duration::from_secs(1));
        assert_eq!(limiter.sweep(), 1);
    }

    #[test]
    fn check_triggers_sweep_once_per_longest_window() {
        let (clock, limiter) = limiter();
        let policies = [RateLimitPolicy::new(60, 10)];

        limiter.check(&key("a"), &policies);
        assert_eq!(limiter.active_keys(), 1);

        clock.advance(Duration::from_secs(121));
        limiter.check(&key("b"), &policies);
        assert_eq!(limiter.active_keys(), 1);
        assert_eq!(limiter.longest_window(), Duration::from_secs(60));
    }

    #[test]
    fn reset_clears_counters() {
        let (_clock, limiter) = limiter();
        let key = key("contacts");
        let policies = [RateLimitPolicy::new(60, 1)];

        limiter.check(&key, &policies);
        assert!(!limiter.check(&key, &policies).allowed);

        limiter.reset();
        assert_eq!(limiter.active_keys(), 0);
        assert!(limiter.check(&key, &policies).allowed);
    }

    #[test]
    fn check_holding_a_detached_entry_moves_to_the_live_one() {
        let (_clock, limiter) = limiter();
        let limiter = Arc::new(limiter);
        let key = key("contacts");
        let policies = [RateLimitPolicy::new(60, 2)];
        assert!(limiter.check(&key, &policies).allowed);

        let stale = limiter.entry(&key);
        let mut guard = stale.lock();

        let waiter = {
            let limiter = Arc::clone(&limiter);
            let key = key.clone();
            thread::spawn(move || limiter.check(&key, &policies))
        };
        // Let the waiter fetch the entry and block on its lock.
        thread::sleep(Duration::from_millis(50));

        // Detach the entry as reset and sweep do.
        limiter.table.write().remove(&key);
        guard.evicted = true;
        drop(guard);

        let result = waiter.join().expect("waiter panicked");
        assert!(result.allowed);
        assert_eq!(result.remaining, Some(1), "counted on a fresh set");
        assert_eq!(stale.lock().counters[0].count, 1, "detached set untouched");
        assert!(!Arc::ptr_eq(&stale, &limiter.entry(&key)));
    }

    #[test]
    fn reset_racing_checks_never_over_admits_a_window() {
        const THREADS: usize = 8;
        const CALLS: usize = 500;
        const RESETS: usize = 200;
        const LIMIT: u64 = 5;

        let (_clock, limiter) = limiter();
        let limiter = Arc::new(limiter);
        let key = key("deals");
        let admitted = Arc::new(AtomicU64::new(0));
        let barrier = Arc::new(Barrier::new(THREADS + 1));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                let key = key.clone();
                let admitted = Arc::clone(&admitted);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    for _ in 0..CALLS {
                        if limiter.check(&key, &[RateLimitPolicy::new(60, LIMIT)]).allowed {
                            admitted.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                })
            })
            .collect();

        barrier.wait();
        let mut detached = Vec::new();
        for _ in 0..RESETS {
            let entry = limiter.table.read().get(&key).cloned();
            limiter.reset();
            if let Some(entry) = entry {
                let count = entry.lock().counters.first().map_or(0, |c| c.count);
                detached.push((entry, count));
            }
        }

        for handle in handles {
            handle.join().expect("checker panicked");
        }

        for (entry, count_at_reset) in detached {
            let set = entry.lock();
            assert!(set.evicted);
            assert_eq!(set.counters.first().map_or(0, |c| c.count), count_at_reset);
        }
        // One fresh set per reset plus the first, each admitting at most LIMIT.
        assert!(admitted.load(Ordering::Relaxed) <= LIMIT * (RESETS as u64 + 1));
    }
}
