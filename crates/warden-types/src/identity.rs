//! Actor identity and resource ownership.
//!
//! An [`Identity`] is produced by the authentication collaborator and only
//! read by the gatekeeper. A [`ResourceOwner`] describes who owns the
//! concrete resource instance a request targets.

use crate::{CompanyId, GrantId, RoleId, TeamId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// An authenticated actor.
///
/// # Example
///
/// ```
/// use warden_types::{CompanyId, Identity, RoleId, TeamId, UserId};
///
/// let team = TeamId::new();
/// let identity = Identity::new(UserId::new(), CompanyId::new())
///     .with_team(team)
///     .with_role("sales_rep");
///
/// assert!(identity.is_member_of(team));
/// assert!(identity.role_ids.contains(&RoleId::new("sales_rep")));
/// assert!(identity.grant_ids.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// The acting user.
    pub id: UserId,
    /// The company the user belongs to.
    pub company_id: CompanyId,
    /// Teams the user is a member of.
    #[serde(default)]
    pub team_ids: HashSet<TeamId>,
    /// Roles assigned to the user.
    #[serde(default)]
    pub role_ids: HashSet<RoleId>,
    /// Grants assigned directly to the user, outside any role.
    #[serde(default)]
    pub grant_ids: HashSet<GrantId>,
}

impl Identity {
    /// Creates an identity with no teams, roles or direct grants.
    #[must_use]
    pub fn new(id: UserId, company_id: CompanyId) -> Self {
        Self {
            id,
            company_id,
            team_ids: HashSet::new(),
            role_ids: HashSet::new(),
            grant_ids: HashSet::new(),
        }
    }

    /// Adds team membership.
    #[must_use]
    pub fn with_team(mut self, team: TeamId) -> Self {
        self.team_ids.insert(team);
        self
    }

    /// Adds a role assignment.
    #[must_use]
    pub fn with_role(mut self, role: impl Into<RoleId>) -> Self {
        self.role_ids.insert(role.into());
        self
    }

    /// Adds a directly assigned grant.
    #[must_use]
    pub fn with_grant(mut self, grant: impl Into<GrantId>) -> Self {
        self.grant_ids.insert(grant.into());
        self
    }

    /// Returns `true` if the actor belongs to `team`.
    #[must_use]
    pub fn is_member_of(&self, team: TeamId) -> bool {
        self.team_ids.contains(&team)
    }
}

/// Ownership of a concrete resource instance.
///
/// Every field is optional: records without an assigned user or team
/// simply cannot be reached through that relationship. A missing
/// `company_id` never matches the actor's company.
///
/// # Example
///
/// ```
/// use warden_types::{CompanyId, ResourceOwner, TeamId, UserId};
///
/// let company = CompanyId::new();
/// let owner = ResourceOwner::new(Some(UserId::new()), Some(TeamId::new()), Some(company));
/// assert_eq!(owner.company_id, Some(company));
///
/// let unassigned = ResourceOwner::company(company);
/// assert!(unassigned.user_id.is_none());
/// assert!(unassigned.team_id.is_none());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceOwner {
    /// User who owns (or is assigned) the resource.
    #[serde(default)]
    pub user_id: Option<UserId>,
    /// Team the resource belongs to.
    #[serde(default)]
    pub team_id: Option<TeamId>,
    /// Company the resource belongs to.
    #[serde(default)]
    pub company_id: Option<CompanyId>,
}

impl ResourceOwner {
    /// Creates an owner description from its parts.
    #[must_use]
    pub fn new(
        user_id: Option<UserId>,
        team_id: Option<TeamId>,
        company_id: Option<CompanyId>,
    ) -> Self {
        Self {
            user_id,
            team_id,
            company_id,
        }
    }

    /// A resource owned by a user, inside a team and company.
    #[must_use]
    pub fn user(user_id: UserId, team_id: TeamId, company_id: CompanyId) -> Self {
        Self::new(Some(user_id), Some(team_id), Some(company_id))
    }

    /// A resource owned by a team, not assigned to any user.
    #[must_use]
    pub fn team(team_id: TeamId, company_id: CompanyId) -> Self {
        Self::new(None, Some(team_id), Some(company_id))
    }

    /// A resource owned by a company only.
    #[must_use]
    pub fn company(company_id: CompanyId) -> Self {
        Self::new(None, None, Some(company_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_accumulates_sets() {
        let t1 = TeamId::new();
        let t2 = TeamId::new();
        let identity = Identity::new(UserId::new(), CompanyId::new())
            .with_team(t1)
            .with_team(t2)
            .with_team(t1)
            .with_role("a")
            .with_role("b")
            .with_grant("g");

        assert_eq!(identity.team_ids.len(), 2);
        assert_eq!(identity.role_ids.len(), 2);
        assert!(identity.grant_ids.contains(&GrantId::new("g")));
        assert!(identity.is_member_of(t2));
        assert!(!identity.is_member_of(TeamId::new()));
    }

    #[test]
    fn identity_deserializes_with_defaults() {
        let user = UserId::new();
        let company = CompanyId::new();
        let json = format!(r#"{{"id":"{}","company_id":"{}"}}"#, user.uuid(), company.uuid());

        let identity: Identity = serde_json::from_str(&json).expect("deserialize identity");
        assert_eq!(identity.id, user);
        assert_eq!(identity.company_id, company);
        assert!(identity.team_ids.is_empty());
        assert!(identity.role_ids.is_empty());
    }

    #[test]
    fn owner_constructors() {
        let company = CompanyId::new();
        let team = TeamId::new();

        let by_team = ResourceOwner::team(team, company);
        assert_eq!(by_team.team_id, Some(team));
        assert!(by_team.user_id.is_none());

        assert_eq!(ResourceOwner::default().company_id, None);
    }
}
