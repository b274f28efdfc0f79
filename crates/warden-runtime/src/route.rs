//! Route group to rate limit policy bindings.
//!
//! Bindings are resolved once at startup from [`RateLimitConfig`]; the
//! gatekeeper then does a plain map lookup per call.

use crate::config::{ConfigError, RateLimitConfig, RouteConfig};
use crate::ratelimit::{builtin_preset, RateLimitPolicy};
use std::collections::HashMap;
use std::sync::Arc;

/// Resolved route group bindings.
///
/// # Example
///
/// ```
/// use warden_runtime::ratelimit::RateLimitPolicy;
/// use warden_runtime::RouteTable;
///
/// let table = RouteTable::default().with_route("contacts", vec![RateLimitPolicy::STRICT]);
/// assert_eq!(table.policies_for("contacts"), &[RateLimitPolicy::STRICT]);
/// assert_eq!(table.policies_for("reports"), &[RateLimitPolicy::MODERATE]);
/// ```
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: HashMap<String, Arc<[RateLimitPolicy]>>,
    fallback: Arc<[RateLimitPolicy]>,
}

impl RouteTable {
    /// Creates a table whose unlisted groups use `fallback`.
    #[must_use]
    pub fn new(fallback: Vec<RateLimitPolicy>) -> Self {
        Self {
            routes: HashMap::new(),
            fallback: fallback.into(),
        }
    }

    /// Binds `group` to `policies`, replacing any previous binding.
    #[must_use]
    pub fn with_route(
        mut self,
        group: impl Into<String>,
        policies: Vec<RateLimitPolicy>,
    ) -> Self {
        self.routes.insert(group.into(), policies.into());
        self
    }

    /// Resolves and validates all bindings in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for an unknown preset, a zero window or
    /// limit, a custom preset with no policies, a route that sets both
    /// or neither of `preset` and `policies`, or two routes with the
    /// same group.
    pub fn from_config(config: &RateLimitConfig) -> Result<Self, ConfigError> {
        for (name, preset) in &config.presets {
            // Only the built-in `none` preset turns throttling off.
            if preset.policies.is_empty() {
                return Err(ConfigError::EmptyPreset(name.clone()));
            }
            validate(&preset.policies, || format!("preset '{name}'"))?;
        }

        let fallback = resolve_preset(config, &config.default_preset, "default_preset")?;
        let mut table = Self::new(fallback);

        for route in &config.routes {
            if table.routes.contains_key(&route.group) {
                return Err(ConfigError::DuplicateRoute(route.group.clone()));
            }
            let policies = resolve_route(config, route)?;
            table.routes.insert(route.group.clone(), policies.into());
        }

        tracing::debug!(
            routes = table.routes.len(),
            default_preset = %config.default_preset,
            "resolved rate limit routes"
        );
        Ok(table)
    }

    /// Policies bound to `group`, or the fallback binding.
    #[must_use]
    pub fn policies_for(&self, group: &str) -> &[RateLimitPolicy] {
        self.routes.get(group).unwrap_or(&self.fallback)
    }

    /// Number of explicitly bound groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns `true` if no group is explicitly bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl Default for RouteTable {
    /// Every group falls back to the `moderate` preset.
    fn default() -> Self {
        Self::new(vec![RateLimitPolicy::MODERATE])
    }
}

fn resolve_route(
    config: &RateLimitConfig,
    route: &RouteConfig,
) -> Result<Vec<RateLimitPolicy>, ConfigError> {
    match (&route.preset, route.policies.is_empty()) {
        (Some(_), false) => Err(ConfigError::InvalidBinding {
            group: route.group.clone(),
            reason: "sets both preset and policies",
        }),
        (None, true) => Err(ConfigError::InvalidBinding {
            group: route.group.clone(),
            reason: "sets neither preset nor policies",
        }),
        (Some(name), true) => resolve_preset(config, name, &format!("route '{}'", route.group)),
        (None, false) => {
            validate(&route.policies, || format!("route '{}'", route.group))?;
            Ok(route.policies.clone())
        }
    }
}

/// Custom presets shadow built-in ones of the same name.
fn resolve_preset(
    config: &RateLimitConfig,
    name: &str,
    used_by: &str,
) -> Result<Vec<RateLimitPolicy>, ConfigError> {
    config
        .presets
        .get(name)
        .map(|preset| preset.policies.clone())
        .or_else(|| builtin_preset(name))
        .ok_or_else(|| ConfigError::unknown_preset(name, used_by))
}

fn validate(
    policies: &[RateLimitPolicy],
    context: impl FnOnce() -> String,
) -> Result<(), ConfigError> {
    if policies.iter().all(RateLimitPolicy::is_valid) {
        Ok(())
    } else {
        Err(ConfigError::invalid_policy(context()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PresetConfig, WardenConfig};
    use warden_types::ErrorCode;

    fn config(text: &str) -> RateLimitConfig {
        WardenConfig::from_toml(text).expect("parse config").rate_limits
    }

    #[test]
    fn resolves_presets_and_explicit_policies() {
        let table = RouteTable::from_config(&config(
            r#"
[rate_limits]
default_preset = "relaxed"

[rate_limits.presets.burst]
policies = [{ window_secs = 1, limit = 5 }, { window_secs = 60, limit = 100 }]

[[rate_limits.routes]]
group = "contacts"
preset = "strict"

[[rate_limits.routes]]
group = "search"
preset = "burst"

[[rate_limits.routes]]
group = "deals"
policies = [{ window_secs = 10, limit = 3 }]

[[rate_limits.routes]]
group = "health"
preset = "none"
"#,
        ))
        .expect("valid routes");

        assert_eq!(table.len(), 4);
        assert_eq!(table.policies_for("contacts"), &[RateLimitPolicy::STRICT]);
        assert_eq!(table.policies_for("search").len(), 2);
        assert_eq!(table.policies_for("deals"), &[RateLimitPolicy::new(10, 3)]);
        assert!(table.policies_for("health").is_empty());
        assert_eq!(table.policies_for("anything"), &[RateLimitPolicy::RELAXED]);
    }

    #[test]
    fn default_preset_none_disables_fallback() {
        let mut rate_limits = RateLimitConfig::default();
        rate_limits.default_preset = "none".into();
        let table = RouteTable::from_config(&rate_limits).expect("valid");
        assert!(table.policies_for("contacts").is_empty());
        assert!(table.is_empty());
    }

    #[test]
    fn custom_preset_shadows_builtin() {
        let mut rate_limits = RateLimitConfig::default();
        rate_limits.presets.insert(
            "strict".into(),
            PresetConfig {
                policies: vec![RateLimitPolicy::new(60, 5)],
            },
        );
        rate_limits.default_preset = "strict".into();

        let table = RouteTable::from_config(&rate_limits).expect("valid");
        assert_eq!(table.policies_for("x"), &[RateLimitPolicy::new(60, 5)]);
    }

    #[test]
    fn rejects_unknown_preset() {
        let err = RouteTable::from_config(&config(
            r#"
[[rate_limits.routes]]
group = "contacts"
preset = "burst"
"#,
        ))
        .unwrap_err();
        assert_eq!(err.code(), "CONFIG_UNKNOWN_PRESET");
        assert!(err.to_string().contains("contacts"), "got: {err}");

        let mut rate_limits = RateLimitConfig::default();
        rate_limits.default_preset = "lenient".into();
        let err = RouteTable::from_config(&rate_limits).unwrap_err();
        assert!(err.to_string().contains("default_preset"), "got: {err}");
    }

    #[test]
    fn rejects_zero_window_or_limit() {
        let err = RouteTable::from_config(&config(
            r#"
[[rate_limits.routes]]
group = "deals"
policies = [{ window_secs = 0, limit = 3 }]
"#,
        ))
        .unwrap_err();
        assert_eq!(err.code(), "CONFIG_INVALID_POLICY");

        let err = RouteTable::from_config(&config(
            r#"
[rate_limits.presets.broken]
policies = [{ window_secs = 60, limit = 0 }]
"#,
        ))
        .unwrap_err();
        assert!(err.to_string().contains("broken"), "got: {err}");
    }

    #[test]
    fn rejects_custom_preset_without_policies() {
        let err = RouteTable::from_config(&config(
            r#"
[rate_limits.presets.open]
policies = []

[[rate_limits.routes]]
group = "contacts"
preset = "open"
"#,
        ))
        .unwrap_err();
        assert!(matches!(err, ConfigError::EmptyPreset(ref name) if name == "open"));
        assert_eq!(err.code(), "CONFIG_EMPTY_PRESET");

        // Shadowing `none` with an empty preset is rejected too.
        let err = RouteTable::from_config(&config(
            r#"
[rate_limits.presets.none]
"#,
        ))
        .unwrap_err();
        assert_eq!(err.code(), "CONFIG_EMPTY_PRESET");
    }

    #[test]
    fn rejects_ambiguous_bindings() {
        let err = RouteTable::from_config(&config(
            r#"
[[rate_limits.routes]]
group = "deals"
preset = "strict"
policies = [{ window_secs = 10, limit = 3 }]
"#,
        ))
        .unwrap_err();
        assert_eq!(err.code(), "CONFIG_INVALID_BINDING");

        let err = RouteTable::from_config(&config(
            r#"
[[rate_limits.routes]]
group = "deals"
"#,
        ))
        .unwrap_err();
        assert!(err.to_string().contains("neither"), "got: {err}");
    }

    #[test]
    fn rejects_duplicate_group() {
        let err = RouteTable::from_config(&config(
            r#"
[[rate_limits.routes]]
group = "deals"
preset = "strict"

[[rate_limits.routes]]
group = "deals"
preset = "relaxed"
"#,
        ))
        .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateRoute(ref g) if g == "deals"));
    }
}
