//! Permission index build errors.
//!
//! [`IndexError`] is the configuration error raised while building a
//! [`PermissionIndex`](crate::PermissionIndex) from role/grant source data.
//! A failed build never installs a partial index: on reload, the previous
//! snapshot stays active.
//!
//! | Error | Code | Recoverable |
//! |-------|------|-------------|
//! | [`IndexError::DuplicateGrant`] | `INDEX_DUPLICATE_GRANT` | No |
//! | [`IndexError::DuplicateRole`] | `INDEX_DUPLICATE_ROLE` | No |
//! | [`IndexError::UnknownGrant`] | `INDEX_UNKNOWN_GRANT` | No |
//! | [`IndexError::EmptyField`] | `INDEX_EMPTY_FIELD` | No |
//! | [`IndexError::Parse`] | `INDEX_PARSE` | No |
//! | [`IndexError::ReadSource`] | `INDEX_READ_SOURCE` | Yes |

use std::path::PathBuf;
use thiserror::Error;
use warden_types::{ErrorCode, GrantId, RoleId};

/// Malformed role/grant source data.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Two grant definitions share an id.
    #[error("duplicate grant id '{0}'")]
    DuplicateGrant(GrantId),

    /// Two role definitions share an id.
    #[error("duplicate role id '{0}'")]
    DuplicateRole(RoleId),

    /// A role references a grant id missing from the grant catalog.
    #[error("role '{role}' references unknown grant '{grant}'")]
    UnknownGrant {
        /// The referencing role.
        role: RoleId,
        /// The missing grant id.
        grant: GrantId,
    },

    /// A grant has an empty `resource` or `action`.
    #[error("grant '{grant}' has an empty {field}")]
    EmptyField {
        /// The offending grant.
        grant: GrantId,
        /// Which field was empty.
        field: &'static str,
    },

    /// Source text is not valid TOML or does not match the schema.
    #[error("failed to parse permission source: {0}")]
    Parse(#[from] toml::de::Error),

    /// Source file could not be read.
    #[error("failed to read permission source '{path}': {source}")]
    ReadSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl IndexError {
    /// Creates a read source error.
    pub fn read_source(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadSource {
            path: path.into(),
            source,
        }
    }
}

impl ErrorCode for IndexError {
    fn code(&self) -> &'static str {
        match self {
            Self::DuplicateGrant(_) => "INDEX_DUPLICATE_GRANT",
            Self::DuplicateRole(_) => "INDEX_DUPLICATE_ROLE",
            Self::UnknownGrant { .. } => "INDEX_UNKNOWN_GRANT",
            Self::EmptyField { .. } => "INDEX_EMPTY_FIELD",
            Self::Parse(_) => "INDEX_PARSE",
            Self::ReadSource { .. } => "INDEX_READ_SOURCE",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, Self::ReadSource { .. })
    }
}
