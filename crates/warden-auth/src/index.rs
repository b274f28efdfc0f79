//! Role → grant permission index.
//!
//! # Architecture
//!
//! ```text
//! PermissionSource ──build──► IndexSnapshot (immutable)
//!                                  │
//! PermissionIndex ── RwLock<Arc<IndexSnapshot>> ──► readers clone the Arc
//!        │
//!        └── reload(): build new snapshot, then swap the Arc
//! ```
//!
//! Grants live in an arena (`Vec<Grant>`); roles hold indices into it.
//! Grants never reference roles back, so the structure is acyclic.
//!
//! # Snapshot Semantics
//!
//! A snapshot is never mutated once published. [`PermissionIndex::reload`]
//! builds the replacement completely before taking the write lock, so a
//! failed build leaves the previous snapshot active and readers holding
//! an old `Arc` finish against the data they started with.

use crate::{Grant, IndexError, PermissionSource};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use warden_types::{GrantId, RoleId, ScopeLevel};

type ActionScopes = HashMap<String, HashMap<String, ScopeLevel>>;

/// Immutable, fully validated view of the role/grant source data.
#[derive(Debug, Default)]
pub struct IndexSnapshot {
    generation: u64,
    /// Grant arena, one entry per catalog id.
    grants: Vec<Grant>,
    catalog: HashMap<GrantId, usize>,
    /// Per role: arena indices, at most one per `(resource, action)`.
    roles: HashMap<RoleId, Vec<usize>>,
    /// Flattened `(role, resource, action) → max scope`.
    flat: HashMap<RoleId, ActionScopes>,
}

impl IndexSnapshot {
    /// Validates `source` and builds a snapshot.
    ///
    /// Several grants for the same `(resource, action)` within one role
    /// collapse to the highest scope; lower-scope duplicates are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError`] on duplicate ids, empty fields, or a role
    /// referencing an unknown grant.
    pub fn build(source: &PermissionSource) -> Result<Self, IndexError> {
        let mut grants = Vec::with_capacity(source.grants.len());
        let mut catalog = HashMap::with_capacity(source.grants.len());

        for def in &source.grants {
            if def.resource.trim().is_empty() {
                return Err(IndexError::EmptyField {
                    grant: def.id.clone(),
                    field: "resource",
                });
            }
            if def.action.trim().is_empty() {
                return Err(IndexError::EmptyField {
                    grant: def.id.clone(),
                    field: "action",
                });
            }
            if catalog.insert(def.id.clone(), grants.len()).is_some() {
                return Err(IndexError::DuplicateGrant(def.id.clone()));
            }
            grants.push(def.to_grant());
        }

        let mut roles = HashMap::with_capacity(source.roles.len());
        let mut flat = HashMap::with_capacity(source.roles.len());

        for role in &source.roles {
            if roles.contains_key(&role.id) {
                return Err(IndexError::DuplicateRole(role.id.clone()));
            }

            let mut slots: Vec<usize> = Vec::with_capacity(role.grants.len());
            let mut by_pair: HashMap<(&str, &str), usize> = HashMap::new();

            for grant_id in &role.grants {
                let Some(&idx) = catalog.get(grant_id) else {
                    return Err(IndexError::UnknownGrant {
                        role: role.id.clone(),
                        grant: grant_id.clone(),
                    });
                };
                let grant = &grants[idx];
                let pair = (grant.resource.as_str(), grant.action.as_str());

                match by_pair.get(&pair) {
                    Some(&slot) => {
                        if grant.scope > grants[slots[slot]].scope {
                            slots[slot] = idx;
                        }
                    }
                    None => {
                        by_pair.insert(pair, slots.len());
                        slots.push(idx);
                    }
                }
            }

            let mut scopes: ActionScopes = HashMap::new();
            for &idx in &slots {
                let grant = &grants[idx];
                scopes
                    .entry(grant.resource.clone())
                    .or_default()
                    .insert(grant.action.clone(), grant.scope);
            }

            flat.insert(role.id.clone(), scopes);
            roles.insert(role.id.clone(), slots);
        }

        Ok(Self {
            generation: 0,
            grants,
            catalog,
            roles,
            flat,
        })
    }

    /// Reload counter; `0` for the initial build.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of roles.
    #[must_use]
    pub fn role_count(&self) -> usize {
        self.roles.len()
    }

    /// Number of catalog grants.
    #[must_use]
    pub fn grant_count(&self) -> usize {
        self.grants.len()
    }

    /// Returns `true` if the role exists in this snapshot.
    #[must_use]
    pub fn contains_role(&self, role: &RoleId) -> bool {
        self.roles.contains_key(role)
    }

    /// Returns a catalog grant by id.
    #[must_use]
    pub fn grant(&self, id: &GrantId) -> Option<&Grant> {
        self.catalog.get(id).map(|&idx| &self.grants[idx])
    }

    /// Returns the effective grants of a role in declaration order,
    /// or `None` if the role does not exist.
    pub fn role_grants(&self, role: &RoleId) -> Option<impl Iterator<Item = &Grant> + '_> {
        self.roles
            .get(role)
            .map(|slots| slots.iter().map(|&idx| &self.grants[idx]))
    }

    /// Returns the scope a single role grants for `(resource, action)`.
    #[must_use]
    pub fn role_scope(&self, role: &RoleId, resource: &str, action: &str) -> Option<ScopeLevel> {
        self.flat
            .get(role)
            .and_then(|by_resource| by_resource.get(resource))
            .and_then(|by_action| by_action.get(action))
            .copied()
    }

    /// Returns the maximum scope any of `roles` grants for `(resource, action)`.
    ///
    /// Roles absent from the snapshot contribute nothing.
    pub fn lookup<'a, I>(&self, roles: I, resource: &str, action: &str) -> Option<ScopeLevel>
    where
        I: IntoIterator<Item = &'a RoleId>,
    {
        roles
            .into_iter()
            .filter_map(|role| self.role_scope(role, resource, action))
            .max()
    }
}

/// Shared, reloadable permission index.
///
/// Safe for unlimited concurrent readers. Readers never observe a
/// half-updated index.
///
/// # Example
///
/// ```
/// use warden_auth::{GrantDef, PermissionIndex, PermissionSource, RoleDef};
/// use warden_types::{RoleId, ScopeLevel};
///
/// let source = PermissionSource::new(
///     vec![
///         GrantDef::new("deal.close.team", "deal", "close", ScopeLevel::Team),
///         GrantDef::new("deal.close.company", "deal", "close", ScopeLevel::Company),
///     ],
///     vec![
///         RoleDef::new("rep", ["deal.close.team"]),
///         RoleDef::new("manager", ["deal.close.company"]),
///     ],
/// );
///
/// let index = PermissionIndex::build(&source).unwrap();
/// let roles = [RoleId::new("rep"), RoleId::new("manager")];
///
/// assert_eq!(index.lookup(&roles, "deal", "close"), Some(ScopeLevel::Company));
/// assert_eq!(index.lookup(&roles, "deal", "delete"), None);
/// ```
#[derive(Debug, Default)]
pub struct PermissionIndex {
    current: RwLock<Arc<IndexSnapshot>>,
}

impl PermissionIndex {
    /// Builds an index from source data.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError`] if the source data is malformed.
    pub fn build(source: &PermissionSource) -> Result<Self, IndexError> {
        let snapshot = IndexSnapshot::build(source)?;
        tracing::debug!(
            roles = snapshot.role_count(),
            grants = snapshot.grant_count(),
            "permission index built"
        );
        Ok(Self {
            current: RwLock::new(Arc::new(snapshot)),
        })
    }

    /// Creates an index with no roles; every lookup returns `None`.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the current snapshot.
    ///
    /// The returned `Arc` stays valid across reloads.
    #[must_use]
    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        Arc::clone(&self.current.read())
    }

    /// Returns the current snapshot's generation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.current.read().generation
    }

    /// Returns the maximum scope across `roles` for `(resource, action)`,
    /// or `None` if no role grants that pair.
    pub fn lookup<'a, I>(&self, roles: I, resource: &str, action: &str) -> Option<ScopeLevel>
    where
        I: IntoIterator<Item = &'a RoleId>,
    {
        self.snapshot().lookup(roles, resource, action)
    }

    /// Atomically replaces the snapshot with one built from `source`.
    ///
    /// Returns the new generation.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError`] if the source data is malformed. The
    /// previous snapshot remains active.
    pub fn reload(&self, source: &PermissionSource) -> Result<u64, IndexError> {
        let mut snapshot = match IndexSnapshot::build(source) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    active_generation = self.generation(),
                    "permission index reload rejected, keeping previous snapshot"
                );
                return Err(e);
            }
        };

        let mut current = self.current.write();
        snapshot.generation = current.generation.saturating_add(1);
        let generation = snapshot.generation;
        tracing::info!(
            generation,
            roles = snapshot.role_count(),
            grants = snapshot.grant_count(),
            "permission index reloaded"
        );
        *current = Arc::new(snapshot);

        Ok(generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GrantDef, RoleDef};

    fn sample_source() -> PermissionSource {
        PermissionSource::new(
            vec![
                GrantDef::new("deal.close.own", "deal", "close", ScopeLevel::Own),
                GrantDef::new("deal.close.company", "deal", "close", ScopeLevel::Company),
                GrantDef::new("task.update.own", "task", "update", ScopeLevel::Own),
                GrantDef::new("contact.read.team", "contact", "read", ScopeLevel::Team),
            ],
            vec![
                RoleDef::new("rep", ["task.update.own", "contact.read.team"]),
                RoleDef::new(
                    "manager",
                    ["deal.close.own", "deal.close.company", "deal.close.own"],
                ),
            ],
        )
    }

    #[test]
    fn highest_scope_wins_within_role() {
        let snapshot = IndexSnapshot::build(&sample_source()).expect("build");
        let manager = RoleId::new("manager");

        assert_eq!(
            snapshot.role_scope(&manager, "deal", "close"),
            Some(ScopeLevel::Company)
        );

        let grants: Vec<_> = snapshot
            .role_grants(&manager)
            .expect("manager exists")
            .collect();
        assert_eq!(grants.len(), 1, "duplicates must collapse to one entry");
        assert_eq!(grants[0].scope, ScopeLevel::Company);
    }

    #[test]
    fn role_grants_keep_declaration_order() {
        let snapshot = IndexSnapshot::build(&sample_source()).expect("build");
        let grants: Vec<_> = snapshot
            .role_grants(&RoleId::new("rep"))
            .expect("rep exists")
            .map(ToString::to_string)
            .collect();
        assert_eq!(grants, vec!["task:update@own", "contact:read@team"]);
    }

    #[test]
    fn lookup_takes_max_across_roles() {
        let index = PermissionIndex::build(&sample_source()).expect("build");
        let both = [RoleId::new("rep"), RoleId::new("manager")];

        assert_eq!(index.lookup(&both, "deal", "close"), Some(ScopeLevel::Company));
        assert_eq!(index.lookup(&both, "contact", "read"), Some(ScopeLevel::Team));
        assert_eq!(index.lookup(&both, "contact", "delete"), None);
        assert_eq!(index.lookup(&[RoleId::new("ghost")], "deal", "close"), None);
    }

    #[test]
    fn cross_role_conflict_is_not_an_error() {
        let source = PermissionSource::new(
            vec![
                GrantDef::new("a", "deal", "close", ScopeLevel::Team),
                GrantDef::new("b", "deal", "close", ScopeLevel::Global),
            ],
            vec![RoleDef::new("x", ["a", "b"]), RoleDef::new("y", ["a"])],
        );
        let index = PermissionIndex::build(&source).expect("conflicts resolve, not fail");
        assert_eq!(
            index.lookup(&[RoleId::new("x")], "deal", "close"),
            Some(ScopeLevel::Global)
        );
    }

    #[test]
    fn malformed_sources_are_rejected() {
        let dup_grant = PermissionSource::new(
            vec![
                GrantDef::new("g", "deal", "close", ScopeLevel::Own),
                GrantDef::new("g", "deal", "read", ScopeLevel::Own),
            ],
            vec![],
        );
        assert!(matches!(
            IndexSnapshot::build(&dup_grant),
            Err(IndexError::DuplicateGrant(_))
        ));

        let dup_role = PermissionSource::new(
            vec![],
            vec![
                RoleDef::new("r", Vec::<GrantId>::new()),
                RoleDef::new("r", Vec::<GrantId>::new()),
            ],
        );
        assert!(matches!(
            IndexSnapshot::build(&dup_role),
            Err(IndexError::DuplicateRole(_))
        ));

        let unknown = PermissionSource::new(vec![], vec![RoleDef::new("r", ["missing"])]);
        assert!(matches!(
            IndexSnapshot::build(&unknown),
            Err(IndexError::UnknownGrant { .. })
        ));

        let empty = PermissionSource::new(
            vec![GrantDef::new("g", "deal", "  ", ScopeLevel::Own)],
            vec![],
        );
        assert!(matches!(
            IndexSnapshot::build(&empty),
            Err(IndexError::EmptyField { field: "action", .. })
        ));
    }

    #[test]
    fn reload_bumps_generation_and_swaps() {
        let index = PermissionIndex::build(&sample_source()).expect("build");
        assert_eq!(index.generation(), 0);

        let before = index.snapshot();
        let replacement = PermissionSource::new(
            vec![GrantDef::new("deal.close.global", "deal", "close", ScopeLevel::Global)],
            vec![RoleDef::new("rep", ["deal.close.global"])],
        );
        assert_eq!(index.reload(&replacement).expect("reload"), 1);

        let rep = [RoleId::new("rep")];
        assert_eq!(index.lookup(&rep, "deal", "close"), Some(ScopeLevel::Global));
        assert_eq!(index.lookup(&rep, "task", "update"), None);

        // Old snapshot is unaffected.
        assert_eq!(before.lookup(&rep, "task", "update"), Some(ScopeLevel::Own));
        assert_eq!(before.generation(), 0);
    }

    #[test]
    fn failed_reload_keeps_previous_snapshot() {
        let index = PermissionIndex::build(&sample_source()).expect("build");
        let broken = PermissionSource::new(vec![], vec![RoleDef::new("rep", ["nope"])]);

        assert!(index.reload(&broken).is_err());
        assert_eq!(index.generation(), 0);
        assert_eq!(
            index.lookup(&[RoleId::new("rep")], "task", "update"),
            Some(ScopeLevel::Own)
        );
    }

    #[test]
    fn empty_index_denies_everything() {
        let index = PermissionIndex::empty();
        assert_eq!(index.snapshot().role_count(), 0);
        assert_eq!(index.lookup(&[RoleId::new("rep")], "deal", "close"), None);
    }

    #[test]
    fn catalog_lookup() {
        let snapshot = IndexSnapshot::build(&sample_source()).expect("build");
        let grant = snapshot
            .grant(&GrantId::new("contact.read.team"))
            .expect("catalog entry");
        assert!(grant.matches("contact", "read"));
        assert!(snapshot.grant(&GrantId::new("nope")).is_none());
        assert_eq!(snapshot.grant_count(), 4);
        assert!(snapshot.contains_role(&RoleId::new("manager")));
    }
}
