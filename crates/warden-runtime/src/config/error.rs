//! Configuration errors.

use std::path::PathBuf;
use thiserror::Error;
use warden_auth::IndexError;
use warden_types::ErrorCode;

/// Configuration error type.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file.
    #[error("failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("failed to parse config file '{path}': {source}")]
    ParseToml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Invalid environment variable value.
    #[error("invalid value for environment variable '{name}': {message}")]
    InvalidEnvVar { name: String, message: String },

    /// A preset name is neither built in nor defined under `[rate_limits.presets]`.
    #[error("unknown rate limit preset '{preset}' (used by {used_by})")]
    UnknownPreset { preset: String, used_by: String },

    /// A policy has a zero window or zero limit.
    #[error("invalid rate limit policy in {context}: window_secs and limit must be > 0")]
    InvalidPolicy { context: String },

    /// A custom preset lists no policies.
    #[error("rate limit preset '{0}' has no policies (use 'none' to disable throttling)")]
    EmptyPreset(String),

    /// A route binds both or neither of `preset` and `policies`.
    #[error("route '{group}' {reason}")]
    InvalidBinding { group: String, reason: &'static str },

    /// Two routes share a group.
    #[error("duplicate rate limit route '{0}'")]
    DuplicateRoute(String),

    /// The permission source failed to load or build.
    #[error(transparent)]
    Permissions(#[from] IndexError),
}

impl ConfigError {
    /// Creates a read file error.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadFile {
            path: path.into(),
            source,
        }
    }

    /// Creates a parse TOML error.
    pub fn parse_toml(path: impl Into<PathBuf>, source: toml::de::Error) -> Self {
        Self::ParseToml {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid env var error.
    pub fn invalid_env_var(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidEnvVar {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates an unknown preset error.
    pub fn unknown_preset(preset: impl Into<String>, used_by: impl Into<String>) -> Self {
        Self::UnknownPreset {
            preset: preset.into(),
            used_by: used_by.into(),
        }
    }

    /// Creates an invalid policy error.
    pub fn invalid_policy(context: impl Into<String>) -> Self {
        Self::InvalidPolicy {
            context: context.into(),
        }
    }
}

impl ErrorCode for ConfigError {
    fn code(&self) -> &'static str {
        match self {
            Self::ReadFile { .. } => "CONFIG_READ_FILE",
            Self::ParseToml { .. } => "CONFIG_PARSE_TOML",
            Self::InvalidEnvVar { .. } => "CONFIG_INVALID_ENV_VAR",
            Self::UnknownPreset { .. } => "CONFIG_UNKNOWN_PRESET",
            Self::InvalidPolicy { .. } => "CONFIG_INVALID_POLICY",
            Self::EmptyPreset(_) => "CONFIG_EMPTY_PRESET",
            Self::InvalidBinding { .. } => "CONFIG_INVALID_BINDING",
            Self::DuplicateRoute(_) => "CONFIG_DUPLICATE_ROUTE",
            Self::Permissions(_) => "CONFIG_PERMISSIONS",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            Self::ReadFile { .. } => true,
            Self::Permissions(e) => e.is_recoverable(),
            _ => false,
        }
    }
}
