//! Configuration management with hierarchical layering.
//!
//! # Architecture
//!
//! ```text
//! Priority (highest to lowest):
//!
//! ┌───────────────────────────────────────────┐
//! │  1. Environment Variables (WARDEN_*)      │  Runtime override
//! ├───────────────────────────────────────────┤
//! │  2. Project Config (.warden/config.toml)  │  Deployment-specific
//! ├───────────────────────────────────────────┤
//! │  3. Global Config (~/.warden/config.toml) │  Host defaults
//! ├───────────────────────────────────────────┤
//! │  4. Default Values (compile-time)         │  Fallback
//! └───────────────────────────────────────────┘
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Config Field | Type |
//! |----------|--------------|------|
//! | `WARDEN_DEBUG` | `debug` | bool |
//! | `WARDEN_DEFAULT_PRESET` | `rate_limits.default_preset` | String |
//! | `WARDEN_EVICTION_MULTIPLE` | `rate_limits.eviction_multiple` | u32 |
//! | `WARDEN_PERMISSIONS_SOURCE` | `permissions.source` | PathBuf |
//!
//! # Example Configuration
//!
//! ```toml
//! # ~/.warden/config.toml
//! debug = false
//!
//! [rate_limits]
//! default_preset = "moderate"      # strict | moderate | relaxed | none | <custom>
//! eviction_multiple = 2
//! sweep_interval_secs = 60
//!
//! [rate_limits.presets.burst]
//! policies = [{ window_secs = 1, limit = 5 }, { window_secs = 60, limit = 100 }]
//!
//! [[rate_limits.routes]]
//! group = "contacts"
//! preset = "strict"
//!
//! [[rate_limits.routes]]
//! group = "deals"
//! policies = [{ window_secs = 10, limit = 3 }]
//!
//! [permissions]
//! source = "roles.toml"            # relative to ~/.warden here, to the project root in .warden/
//! ```
//!
//! `sweep_interval_secs` is the period of the task started by
//! [`Gatekeeper::spawn_sweeper`](crate::Gatekeeper::spawn_sweeper).

mod error;
mod loader;
mod types;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use types::{
    ConfigLayer, PermissionsConfig, PresetConfig, RateLimitConfig, RateLimitLayer, RouteConfig,
    WardenConfig,
};

/// Default global config directory.
pub fn default_config_dir() -> std::path::PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(".warden")
}

/// Default global config file path.
pub fn default_config_path() -> std::path::PathBuf {
    default_config_dir().join("config.toml")
}

/// Project config directory name.
pub const PROJECT_CONFIG_DIR: &str = ".warden";

/// Project config file name.
pub const PROJECT_CONFIG_FILE: &str = "config.toml";
