//! Grants, roles, and the source data they are loaded from.
//!
//! # Source Format
//!
//! Role/grant source data is a grant catalog plus roles referencing it
//! by id. Identities may also hold catalog grant ids directly.
//!
//! ```toml
//! [[grants]]
//! id = "deal.close.company"
//! resource = "deal"
//! action = "close"
//! scope = "company"
//!
//! [[grants]]
//! id = "task.update.own"
//! resource = "task"
//! action = "update"
//! scope = "own"
//!
//! [[roles]]
//! id = "sales_manager"
//! grants = ["deal.close.company", "task.update.own"]
//! ```

use crate::IndexError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use warden_types::{GrantId, RoleId, ScopeLevel};

/// A permitted `(resource, action, scope)` tuple.
///
/// Immutable once built into an index.
///
/// # Example
///
/// ```
/// use warden_auth::Grant;
/// use warden_types::ScopeLevel;
///
/// let grant = Grant::new("deal", "close", ScopeLevel::Company);
/// assert!(grant.matches("deal", "close"));
/// assert!(!grant.matches("deal", "delete"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Grant {
    /// Resource kind, e.g. `"contact"`.
    pub resource: String,
    /// Action on the resource, e.g. `"update"`.
    pub action: String,
    /// Breadth of access.
    pub scope: ScopeLevel,
}

impl Grant {
    /// Creates a grant.
    #[must_use]
    pub fn new(resource: impl Into<String>, action: impl Into<String>, scope: ScopeLevel) -> Self {
        Self {
            resource: resource.into(),
            action: action.into(),
            scope,
        }
    }

    /// Returns `true` if this grant is for `(resource, action)`.
    #[must_use]
    pub fn matches(&self, resource: &str, action: &str) -> bool {
        self.resource == resource && self.action == action
    }
}

impl std::fmt::Display for Grant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}@{}", self.resource, self.action, self.scope)
    }
}

/// A named entry in the grant catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantDef {
    /// Catalog id.
    pub id: GrantId,
    /// Resource kind.
    pub resource: String,
    /// Action on the resource.
    pub action: String,
    /// Breadth of access.
    pub scope: ScopeLevel,
}

impl GrantDef {
    /// Creates a catalog entry.
    #[must_use]
    pub fn new(
        id: impl Into<GrantId>,
        resource: impl Into<String>,
        action: impl Into<String>,
        scope: ScopeLevel,
    ) -> Self {
        Self {
            id: id.into(),
            resource: resource.into(),
            action: action.into(),
            scope,
        }
    }

    /// Returns the `(resource, action, scope)` tuple.
    #[must_use]
    pub fn to_grant(&self) -> Grant {
        Grant::new(self.resource.clone(), self.action.clone(), self.scope)
    }
}

/// A role: an id and the catalog grants it confers, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDef {
    /// Role id.
    pub id: RoleId,
    /// Referenced grant ids.
    #[serde(default)]
    pub grants: Vec<GrantId>,
}

impl RoleDef {
    /// Creates a role from grant ids.
    #[must_use]
    pub fn new<I, G>(id: impl Into<RoleId>, grants: I) -> Self
    where
        I: IntoIterator<Item = G>,
        G: Into<GrantId>,
    {
        Self {
            id: id.into(),
            grants: grants.into_iter().map(Into::into).collect(),
        }
    }
}

/// Complete role/grant source data for one index build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionSource {
    /// Grant catalog.
    pub grants: Vec<GrantDef>,
    /// Roles referencing the catalog.
    pub roles: Vec<RoleDef>,
}

impl PermissionSource {
    /// Creates source data from its parts.
    #[must_use]
    pub fn new(grants: Vec<GrantDef>, roles: Vec<RoleDef>) -> Self {
        Self { grants, roles }
    }

    /// Parses source data from TOML.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Parse`] if the text is not valid TOML,
    /// does not match the schema, or names an unknown scope level.
    pub fn from_toml(text: &str) -> Result<Self, IndexError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads and parses a TOML source file.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::ReadSource`] if the file cannot be read, or
    /// [`IndexError::Parse`] if it cannot be parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, IndexError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| IndexError::read_source(path, e))?;
        Self::from_toml(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SOURCE: &str = r#"
[[grants]]
id = "deal.close.company"
resource = "deal"
action = "close"
scope = "company"

[[grants]]
id = "task.update.own"
resource = "task"
action = "update"
scope = "OWN"

[[roles]]
id = "sales_manager"
grants = ["deal.close.company", "task.update.own"]

[[roles]]
id = "viewer"
"#;

    #[test]
    fn parses_toml_source() {
        let source = PermissionSource::from_toml(SOURCE).expect("parse source");
        assert_eq!(source.grants.len(), 2);
        assert_eq!(source.grants[1].scope, ScopeLevel::Own);
        assert_eq!(source.roles.len(), 2);
        assert_eq!(source.roles[0].grants.len(), 2);
        assert!(source.roles[1].grants.is_empty());
    }

    #[test]
    fn rejects_unknown_scope() {
        let text = r#"
[[grants]]
id = "x"
resource = "deal"
action = "close"
scope = "tenant"
"#;
        let err = PermissionSource::from_toml(text).unwrap_err();
        assert!(matches!(err, IndexError::Parse(_)));
        assert!(err.to_string().contains("tenant"), "got: {err}");
    }

    #[test]
    fn reads_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        file.write_all(SOURCE.as_bytes()).expect("write source");

        let source = PermissionSource::from_file(file.path()).expect("read source");
        assert_eq!(source.roles[0].id, RoleId::new("sales_manager"));
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = PermissionSource::from_file("/nonexistent/roles.toml").unwrap_err();
        assert!(matches!(err, IndexError::ReadSource { .. }));
    }

    #[test]
    fn grant_display_and_match() {
        let def = GrantDef::new("c", "contact", "read", ScopeLevel::Team);
        let grant = def.to_grant();
        assert_eq!(grant.to_string(), "contact:read@team");
        assert!(grant.matches("contact", "read"));
        assert!(!grant.matches("contacts", "read"));
    }
}
