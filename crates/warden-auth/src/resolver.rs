//! Scope resolution.
//!
//! Decides whether an actor's granted scope for `(resource, action)`
//! covers their actual relationship to the resource owner.
//!
//! # Relationship
//!
//! | Condition (first match) | Required scope |
//! |-------------------------|----------------|
//! | no owner (collection / create) | `Own` |
//! | `owner.user_id == actor.id` | `Own` |
//! | `owner.team_id ∈ actor.team_ids` | `Team` |
//! | `owner.company_id == actor.company_id` | `Company` |
//! | otherwise | `Global` |
//!
//! The check passes iff `granted >= required`. `Global` is only reachable
//! through a `Global` grant; it is never inferred from a relationship.
//!
//! # Default Deny
//!
//! An identity referencing a role or direct grant absent from the
//! snapshot is denied with [`DenialCause::InternalInconsistency`]
//! regardless of what its other roles grant.

use crate::{IndexSnapshot, PermissionIndex};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warden_types::{Identity, ResourceOwner, ScopeLevel};

/// Why a permission check was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialCause {
    /// No role or direct grant covers `(resource, action)`.
    NoGrant,
    /// A grant exists but its scope is narrower than the relationship requires.
    InsufficientScope,
    /// The identity references roles or grants missing from the index.
    InternalInconsistency,
}

impl DenialCause {
    /// Returns the cause as a string.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoGrant => "no_grant",
            Self::InsufficientScope => "insufficient_scope",
            Self::InternalInconsistency => "internal_inconsistency",
        }
    }
}

/// Outcome of a single permission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedCheck {
    /// Whether the actor may perform the action.
    pub allowed: bool,
    /// Minimal scope covering the actor's relationship to the owner.
    pub required_scope: ScopeLevel,
    /// Highest scope the actor holds for `(resource, action)`.
    pub resolved_scope: Option<ScopeLevel>,
    /// Set iff `allowed` is `false`.
    pub denial: Option<DenialCause>,
}

impl ResolvedCheck {
    fn allow(required_scope: ScopeLevel, resolved_scope: ScopeLevel) -> Self {
        Self {
            allowed: true,
            required_scope,
            resolved_scope: Some(resolved_scope),
            denial: None,
        }
    }

    fn deny(
        required_scope: ScopeLevel,
        resolved_scope: Option<ScopeLevel>,
        cause: DenialCause,
    ) -> Self {
        Self {
            allowed: false,
            required_scope,
            resolved_scope,
            denial: Some(cause),
        }
    }
}

/// Returns the minimal scope level covering `identity`'s relationship to `owner`.
///
/// # Example
///
/// ```
/// use warden_auth::relationship;
/// use warden_types::{CompanyId, Identity, ResourceOwner, ScopeLevel, TeamId, UserId};
///
/// let company = CompanyId::new();
/// let team = TeamId::new();
/// let actor = Identity::new(UserId::new(), company).with_team(team);
///
/// assert_eq!(relationship(&actor, None), ScopeLevel::Own);
/// assert_eq!(relationship(&actor, Some(&ResourceOwner::team(team, company))), ScopeLevel::Team);
/// assert_eq!(relationship(&actor, Some(&ResourceOwner::company(company))), ScopeLevel::Company);
/// assert_eq!(relationship(&actor, Some(&ResourceOwner::company(CompanyId::new()))), ScopeLevel::Global);
/// ```
#[must_use]
pub fn relationship(identity: &Identity, owner: Option<&ResourceOwner>) -> ScopeLevel {
    let Some(owner) = owner else {
        return ScopeLevel::Own;
    };

    if owner.user_id == Some(identity.id) {
        ScopeLevel::Own
    } else if owner.team_id.is_some_and(|team| identity.is_member_of(team)) {
        ScopeLevel::Team
    } else if owner.company_id == Some(identity.company_id) {
        ScopeLevel::Company
    } else {
        ScopeLevel::Global
    }
}

/// Permission check seam used by the gatekeeper.
///
/// [`ScopeResolver`] is the production implementation; tests substitute
/// their own to observe or force outcomes.
pub trait AccessPolicy: Send + Sync {
    /// Checks whether `identity` may perform `action` on `resource`
    /// owned by `owner` (`None` for collection-level requests).
    fn resolve(
        &self,
        identity: &Identity,
        resource: &str,
        action: &str,
        owner: Option<&ResourceOwner>,
    ) -> ResolvedCheck;
}

/// Resolves permissions against a shared [`PermissionIndex`].
///
/// Pure and cheap: each call takes one snapshot and performs map lookups.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use warden_auth::{AccessPolicy, GrantDef, PermissionIndex, PermissionSource, RoleDef, ScopeResolver};
/// use warden_types::{CompanyId, Identity, ResourceOwner, ScopeLevel, TeamId, UserId};
///
/// let source = PermissionSource::new(
///     vec![GrantDef::new("deal.close.company", "deal", "close", ScopeLevel::Company)],
///     vec![RoleDef::new("manager", ["deal.close.company"])],
/// );
/// let resolver = ScopeResolver::new(Arc::new(PermissionIndex::build(&source).unwrap()));
///
/// let company = CompanyId::new();
/// let actor = Identity::new(UserId::new(), company).with_role("manager");
/// let deal = ResourceOwner::user(UserId::new(), TeamId::new(), company);
///
/// let check = resolver.resolve(&actor, "deal", "close", Some(&deal));
/// assert!(check.allowed);
/// assert_eq!(check.required_scope, ScopeLevel::Company);
/// assert_eq!(check.resolved_scope, Some(ScopeLevel::Company));
/// ```
#[derive(Debug, Clone)]
pub struct ScopeResolver {
    index: Arc<PermissionIndex>,
}

impl ScopeResolver {
    /// Creates a resolver over a shared index.
    #[must_use]
    pub fn new(index: Arc<PermissionIndex>) -> Self {
        Self { index }
    }

    /// Returns the underlying index.
    #[must_use]
    pub fn index(&self) -> &Arc<PermissionIndex> {
        &self.index
    }

    /// Resolves a check against an explicit snapshot.
    #[must_use]
    pub fn resolve_in(
        snapshot: &IndexSnapshot,
        identity: &Identity,
        resource: &str,
        action: &str,
        owner: Option<&ResourceOwner>,
    ) -> ResolvedCheck {
        let required = relationship(identity, owner);

        let missing_roles = identity
            .role_ids
            .iter()
            .filter(|role| !snapshot.contains_role(role))
            .count();
        let missing_grants = identity
            .grant_ids
            .iter()
            .filter(|grant| snapshot.grant(grant).is_none())
            .count();
        if missing_roles > 0 || missing_grants > 0 {
            tracing::warn!(
                user = %identity.id,
                generation = snapshot.generation(),
                missing_roles,
                missing_grants,
                "identity references entries absent from permission index, denying"
            );
            return ResolvedCheck::deny(required, None, DenialCause::InternalInconsistency);
        }

        let from_roles = snapshot.lookup(&identity.role_ids, resource, action);
        let direct = identity
            .grant_ids
            .iter()
            .filter_map(|id| snapshot.grant(id))
            .filter(|grant| grant.matches(resource, action))
            .map(|grant| grant.scope)
            .max();

        match from_roles.max(direct) {
            None => ResolvedCheck::deny(required, None, DenialCause::NoGrant),
            Some(granted) if granted.covers(required) => ResolvedCheck::allow(required, granted),
            Some(granted) => {
                ResolvedCheck::deny(required, Some(granted), DenialCause::InsufficientScope)
            }
        }
    }
}

impl AccessPolicy for ScopeResolver {
    fn resolve(
        &self,
        identity: &Identity,
        resource: &str,
        action: &str,
        owner: Option<&ResourceOwner>,
    ) -> ResolvedCheck {
        let snapshot = self.index.snapshot();
        Self::resolve_in(&snapshot, identity, resource, action, owner)
    }
}
