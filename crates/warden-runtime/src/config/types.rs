//! Configuration types.
//!
//! All types implement [`Default`] for compile-time fallback values.

use crate::ratelimit::{RateLimitPolicy, DEFAULT_EVICTION_MULTIPLE, DEFAULT_SWEEP_INTERVAL_SECS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Main configuration structure.
///
/// This is the unified configuration after merging all layers.
///
/// # Example
///
/// ```
/// use warden_runtime::config::WardenConfig;
///
/// let config = WardenConfig::default();
/// assert!(!config.debug);
/// assert_eq!(config.rate_limits.default_preset, "moderate");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WardenConfig {
    /// Enable debug logging.
    pub debug: bool,

    /// Rate limit bindings.
    pub rate_limits: RateLimitConfig,

    /// Role/grant source location.
    pub permissions: PermissionsConfig,
}

impl WardenConfig {
    /// Creates a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializes to TOML string.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Deserializes from TOML string.
    ///
    /// # Errors
    ///
    /// Returns error if deserialization fails.
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Applies one config layer on top of this config.
    ///
    /// Every key the layer sets overrides the current value, including
    /// keys set back to their default.
    pub fn merge(&mut self, layer: &ConfigLayer) {
        if let Some(debug) = layer.debug {
            self.debug = debug;
        }

        self.rate_limits.merge(&layer.rate_limits);
        self.permissions.merge(&layer.permissions);
    }
}

/// Rate limit configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Preset applied to groups with no route entry.
    pub default_preset: String,

    /// Idle keys are evicted after this many longest windows.
    pub eviction_multiple: u32,

    /// Background sweep period in seconds.
    pub sweep_interval_secs: u64,

    /// Custom named presets.
    pub presets: BTreeMap<String, PresetConfig>,

    /// Per-group bindings.
    pub routes: Vec<RouteConfig>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            default_preset: "moderate".into(),
            eviction_multiple: DEFAULT_EVICTION_MULTIPLE,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            presets: BTreeMap::new(),
            routes: Vec::new(),
        }
    }
}

impl RateLimitConfig {
    fn merge(&mut self, layer: &RateLimitLayer) {
        if let Some(preset) = &layer.default_preset {
            self.default_preset.clone_from(preset);
        }
        if let Some(multiple) = layer.eviction_multiple {
            self.eviction_multiple = multiple;
        }
        if let Some(secs) = layer.sweep_interval_secs {
            self.sweep_interval_secs = secs;
        }

        for (name, preset) in &layer.presets {
            self.presets.insert(name.clone(), preset.clone());
        }

        // A later layer rebinds a group rather than adding a duplicate.
        for route in &layer.routes {
            match self.routes.iter_mut().find(|r| r.group == route.group) {
                Some(existing) => *existing = route.clone(),
                None => self.routes.push(route.clone()),
            }
        }
    }
}

/// A custom named preset.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PresetConfig {
    /// Policies that must all pass.
    pub policies: Vec<RateLimitPolicy>,
}

/// Binding of one route group to a preset or explicit policies.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RouteConfig {
    /// Route group name.
    pub group: String,

    /// Named preset (built-in or custom).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,

    /// Explicit policies.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub policies: Vec<RateLimitPolicy>,
}

/// Permission source configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PermissionsConfig {
    /// Path to the role/grant TOML source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
}

impl PermissionsConfig {
    fn merge(&mut self, other: &Self) {
        if other.source.is_some() {
            self.source.clone_from(&other.source);
        }
    }
}

/// One config file as written.
///
/// Unlike [`WardenConfig`], absent keys stay `None` so that a layer
/// only overrides what it actually sets.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConfigLayer {
    /// Enable debug logging.
    pub debug: Option<bool>,

    /// Rate limit settings set by this layer.
    pub rate_limits: RateLimitLayer,

    /// Role/grant source location.
    pub permissions: PermissionsConfig,
}

impl ConfigLayer {
    /// Deserializes from TOML string.
    ///
    /// # Errors
    ///
    /// Returns error if deserialization fails.
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Resolves a relative `permissions.source` against `base`.
    pub(crate) fn rebase_paths(&mut self, base: &Path) {
        if let Some(source) = self.permissions.source.as_mut() {
            if source.is_relative() {
                *source = base.join(&*source);
            }
        }
    }
}

/// Rate limit keys of one [`ConfigLayer`].
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct RateLimitLayer {
    /// Preset applied to groups with no route entry.
    pub default_preset: Option<String>,

    /// Idle keys are evicted after this many longest windows.
    pub eviction_multiple: Option<u32>,

    /// Background sweep period in seconds.
    pub sweep_interval_secs: Option<u64>,

    /// Custom named presets, merged by name.
    pub presets: BTreeMap<String, PresetConfig>,

    /// Per-group bindings, merged by group.
    pub routes: Vec<RouteConfig>,
}
