//! Scope levels for permission grants.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Hierarchical breadth of access conferred by a grant.
///
/// Scope levels form a closed, totally ordered set:
///
/// ```text
/// Global
///   └── Company   (any resource owned inside the actor's company)
///         └── Team   (resources owned by one of the actor's teams)
///               └── Own   (resources the actor owns)
/// ```
///
/// A grant at level `L` covers every request whose required level is
/// `<= L`. Equality at a boundary is sufficient.
///
/// # Example
///
/// ```
/// use warden_types::ScopeLevel;
///
/// assert!(ScopeLevel::Own < ScopeLevel::Team);
/// assert!(ScopeLevel::Company.covers(ScopeLevel::Team));
/// assert!(ScopeLevel::Company.covers(ScopeLevel::Company));
/// assert!(!ScopeLevel::Company.covers(ScopeLevel::Global));
///
/// let parsed: ScopeLevel = "TEAM".parse().unwrap();
/// assert_eq!(parsed, ScopeLevel::Team);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum ScopeLevel {
    /// Resources owned by the actor.
    Own,
    /// Resources owned by any of the actor's teams.
    Team,
    /// Resources owned anywhere in the actor's company.
    Company,
    /// Any resource, across companies.
    Global,
}

impl ScopeLevel {
    /// All levels in ascending order.
    pub const ALL: [ScopeLevel; 4] = [Self::Own, Self::Team, Self::Company, Self::Global];

    /// Returns `true` if a grant at this level satisfies `required`.
    #[must_use]
    pub fn covers(self, required: ScopeLevel) -> bool {
        self >= required
    }

    /// Returns the lowercase name used in source data and on the wire.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Own => "own",
            Self::Team => "team",
            Self::Company => "company",
            Self::Global => "global",
        }
    }
}

impl std::fmt::Display for ScopeLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a [`ScopeLevel`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown scope level '{input}' (expected own, team, company or global)")]
pub struct ParseScopeError {
    /// The rejected input.
    pub input: String,
}

impl FromStr for ScopeLevel {
    type Err = ParseScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "own" => Ok(Self::Own),
            "team" => Ok(Self::Team),
            "company" => Ok(Self::Company),
            "global" => Ok(Self::Global),
            _ => Err(ParseScopeError {
                input: s.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for ScopeLevel {
    type Error = ParseScopeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
