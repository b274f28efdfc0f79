//! Per-key fixed-window rate limiting.
//!
//! # Overview
//!
//! ```text
//! RateLimitKey (user, route group)
//!        │
//!        ▼
//! RateLimiter::check(key, &[RateLimitPolicy]) ──► RateLimitResult
//!        │                                          allowed, remaining,
//!        │                                          reset_after, retry_after
//!        └── sweep() / spawn_sweeper(): evict idle keys
//! ```
//!
//! Each call counts against every policy bound to the route. The call is
//! denied if any policy's count exceeds its limit.
//!
//! # Presets
//!
//! | Preset | Window | Limit |
//! |--------|--------|-------|
//! | `strict` | 60s | 10 |
//! | `moderate` | 60s | 30 |
//! | `relaxed` | 60s | 100 |
//! | `none` | | unlimited |

mod clock;
mod limiter;
mod policy;
mod sweeper;

pub use clock::{Clock, ManualClock, SystemClock};
pub use limiter::{RateLimitKey, RateLimitResult, RateLimiter, DEFAULT_EVICTION_MULTIPLE};
pub use policy::{builtin_preset, RateLimitPolicy, NO_LIMIT_PRESET};
pub use sweeper::{spawn_sweeper, DEFAULT_SWEEP_INTERVAL_SECS};
