//! Rate limit policies and named presets.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A fixed-window quota: at most `limit` calls per `window_secs`.
///
/// # Example
///
/// ```
/// use warden_runtime::ratelimit::RateLimitPolicy;
/// use std::time::Duration;
///
/// let policy = RateLimitPolicy::new(60, 10);
/// assert_eq!(policy.window(), Duration::from_secs(60));
/// assert!(policy.is_valid());
/// assert!(!RateLimitPolicy::new(0, 10).is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    /// Window length in seconds.
    pub window_secs: u64,
    /// Calls admitted per window.
    pub limit: u64,
}

impl RateLimitPolicy {
    /// 10 calls per minute.
    pub const STRICT: Self = Self::new(60, 10);
    /// 30 calls per minute.
    pub const MODERATE: Self = Self::new(60, 30);
    /// 100 calls per minute.
    pub const RELAXED: Self = Self::new(60, 100);

    /// Creates a policy.
    #[must_use]
    pub const fn new(window_secs: u64, limit: u64) -> Self {
        Self { window_secs, limit }
    }

    /// Window length.
    #[must_use]
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    /// Returns `true` if both window and limit are non-zero.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.window_secs > 0 && self.limit > 0
    }
}

impl std::fmt::Display for RateLimitPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}s", self.limit, self.window_secs)
    }
}

/// Preset name that disables throttling.
pub const NO_LIMIT_PRESET: &str = "none";

/// Returns the built-in preset for `name`, if any.
///
/// | Name | Policy |
/// |------|--------|
/// | `strict` | 60s / 10 |
/// | `moderate` | 60s / 30 |
/// | `relaxed` | 60s / 100 |
/// | `none` | no policies |
#[must_use]
pub fn builtin_preset(name: &str) -> Option<Vec<RateLimitPolicy>> {
    match name {
        "strict" => Some(vec![RateLimitPolicy::STRICT]),
        "moderate" => Some(vec![RateLimitPolicy::MODERATE]),
        "relaxed" => Some(vec![RateLimitPolicy::RELAXED]),
        NO_LIMIT_PRESET => Some(Vec::new()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_presets() {
        assert_eq!(builtin_preset("strict"), Some(vec![RateLimitPolicy::new(60, 10)]));
        assert_eq!(builtin_preset("moderate"), Some(vec![RateLimitPolicy::new(60, 30)]));
        assert_eq!(builtin_preset("relaxed"), Some(vec![RateLimitPolicy::new(60, 100)]));
        assert_eq!(builtin_preset("none"), Some(Vec::new()));
        assert_eq!(builtin_preset("STRICT"), None);
        assert_eq!(builtin_preset("burst"), None);
    }

    #[test]
    fn deserializes_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            policies: Vec<RateLimitPolicy>,
        }

        let w: Wrapper =
            toml::from_str("policies = [{ window_secs = 1, limit = 5 }]").expect("parse");
        assert_eq!(w.policies, vec![RateLimitPolicy::new(1, 5)]);
        assert_eq!(w.policies[0].to_string(), "5/1s");
    }
}
