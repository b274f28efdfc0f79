//! Per-call access decisions.
//!
//! # Evaluation Order
//!
//! ```text
//! evaluate(identity, route, owner)
//!        │
//!        ├─► RateLimiter::check(identity.id, route.group)
//!        │        │ denied ──► Decision { reason: RateLimited }   (permission never checked)
//!        │        ▼
//!        ├─► AccessPolicy::resolve(identity, resource, action, owner)
//!        │        │ denied ──► Decision { reason: PermissionDenied }
//!        │        ▼
//!        └─► Decision { allowed: true }
//! ```
//!
//! Rate limiting is checked first. A throttled caller always gets
//! `RateLimited`, even when it also lacks permission, and learns nothing
//! about its grants. The call that is denied for permission still
//! consumes rate limit quota.
//!
//! Denials are values, never errors. The only fallible operation is
//! [`Gatekeeper::reload`].

use crate::config::{ConfigError, WardenConfig};
use crate::ratelimit::{
    spawn_sweeper, Clock, RateLimitKey, RateLimitResult, RateLimiter, DEFAULT_SWEEP_INTERVAL_SECS,
};
use crate::RouteTable;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use warden_auth::{
    AccessPolicy, DenialCause, IndexError, PermissionIndex, PermissionSource, ResolvedCheck,
    ScopeResolver,
};
use warden_types::{Identity, ResourceOwner, ScopeLevel};

/// The endpoint being called.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Route {
    /// Rate limit group, e.g. `"contacts"`.
    pub group: String,
    /// Resource kind checked for permission.
    pub resource: String,
    /// Action checked for permission.
    pub action: String,
}

impl Route {
    /// Creates a route.
    #[must_use]
    pub fn new(
        group: impl Into<String>,
        resource: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            resource: resource.into(),
            action: action.into(),
        }
    }
}

/// Why a call was rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    /// Not rejected.
    #[default]
    None,
    /// The actor lacks a sufficient grant.
    PermissionDenied,
    /// The actor exceeded a rate limit on this route group.
    RateLimited,
}

/// Outcome of [`Gatekeeper::evaluate`].
///
/// `reason` and `retry_after_seconds` are what the HTTP layer must
/// surface; the remaining fields are diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// `true` only if both checks passed.
    pub allowed: bool,
    /// Rejection reason, [`Reason::None`] when allowed.
    pub reason: Reason,
    /// Scope the relationship requires; `None` when rate limited.
    pub required_scope: Option<ScopeLevel>,
    /// Highest scope the actor holds; `None` when rate limited or ungranted.
    pub resolved_scope: Option<ScopeLevel>,
    /// Seconds to wait, set only when rate limited.
    pub retry_after_seconds: Option<u64>,
    /// Calls left in the tightest window; `None` when unbounded.
    pub remaining: Option<u64>,
    /// Seconds until the tightest window resets.
    pub reset_after_seconds: Option<u64>,
    /// Permission denial detail.
    pub denial: Option<DenialCause>,
}

impl Decision {
    fn rate_limited(limit: &RateLimitResult) -> Self {
        Self {
            allowed: false,
            reason: Reason::RateLimited,
            required_scope: None,
            resolved_scope: None,
            retry_after_seconds: limit.retry_after_seconds(),
            remaining: limit.remaining,
            reset_after_seconds: limit.reset_after_seconds(),
            denial: None,
        }
    }

    fn checked(check: &ResolvedCheck, limit: &RateLimitResult) -> Self {
        Self {
            allowed: check.allowed,
            reason: if check.allowed {
                Reason::None
            } else {
                Reason::PermissionDenied
            },
            required_scope: Some(check.required_scope),
            resolved_scope: check.resolved_scope,
            retry_after_seconds: None,
            remaining: limit.remaining,
            reset_after_seconds: limit.reset_after_seconds(),
            denial: check.denial,
        }
    }

    /// Conventional HTTP status: 200, 403 or 429.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        match self.reason {
            Reason::None => 200,
            Reason::PermissionDenied => 403,
            Reason::RateLimited => 429,
        }
    }
}

/// Combines rate limiting and scope resolution into one decision per call.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use warden_auth::{GrantDef, PermissionIndex, PermissionSource, RoleDef};
/// use warden_runtime::ratelimit::{ManualClock, RateLimitPolicy, RateLimiter};
/// use warden_runtime::{Gatekeeper, Reason, Route, RouteTable};
/// use warden_types::{CompanyId, Identity, ScopeLevel, UserId};
///
/// let source = PermissionSource::new(
///     vec![GrantDef::new("contact.read.own", "contact", "read", ScopeLevel::Own)],
///     vec![RoleDef::new("member", ["contact.read.own"])],
/// );
/// let gatekeeper = Gatekeeper::new(
///     Arc::new(PermissionIndex::build(&source).unwrap()),
///     Arc::new(RateLimiter::new(Arc::new(ManualClock::new()))),
///     RouteTable::new(vec![RateLimitPolicy::new(60, 1)]),
/// );
///
/// let actor = Identity::new(UserId::new(), CompanyId::new()).with_role("member");
/// let route = Route::new("contacts", "contact", "read");
///
/// assert!(gatekeeper.evaluate(&actor, &route, None).allowed);
/// assert_eq!(gatekeeper.evaluate(&actor, &route, None).reason, Reason::RateLimited);
/// ```
pub struct Gatekeeper {
    index: Arc<PermissionIndex>,
    policy: Arc<dyn AccessPolicy>,
    limiter: Arc<RateLimiter>,
    routes: RouteTable,
    sweep_interval: Duration,
}

impl Gatekeeper {
    /// Creates a gatekeeper resolving permissions against `index`.
    #[must_use]
    pub fn new(index: Arc<PermissionIndex>, limiter: Arc<RateLimiter>, routes: RouteTable) -> Self {
        let policy: Arc<dyn AccessPolicy> = Arc::new(ScopeResolver::new(Arc::clone(&index)));
        Self {
            index,
            policy,
            limiter,
            routes,
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
        }
    }

    /// Builds a gatekeeper from loaded configuration.
    ///
    /// Without a configured permission source the index is empty and
    /// every permission check denies.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the route bindings are invalid or the
    /// permission source cannot be read or built.
    pub fn from_config(config: &WardenConfig, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        let source = match &config.permissions.source {
            Some(path) => PermissionSource::from_file(path)?,
            None => {
                warn!("no permission source configured, all permission checks will deny");
                PermissionSource::default()
            }
        };
        let index = Arc::new(PermissionIndex::build(&source)?);
        let routes = RouteTable::from_config(&config.rate_limits)?;
        let limiter = Arc::new(
            RateLimiter::new(clock).with_eviction_multiple(config.rate_limits.eviction_multiple),
        );

        Ok(Self::new(index, limiter, routes).with_sweep_interval(Duration::from_secs(
            config.rate_limits.sweep_interval_secs,
        )))
    }

    /// Sets the period used by [`spawn_sweeper`](Self::spawn_sweeper).
    #[must_use]
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Replaces the permission check, keeping the index for reloads.
    #[must_use]
    pub fn with_access_policy(mut self, policy: Arc<dyn AccessPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Decides whether `identity` may call `route` on the resource owned
    /// by `owner` (`None` for collection or create requests).
    pub fn evaluate(
        &self,
        identity: &Identity,
        route: &Route,
        owner: Option<&ResourceOwner>,
    ) -> Decision {
        let key = RateLimitKey::new(identity.id, route.group.as_str());
        let limit = self.limiter.check(&key, self.routes.policies_for(&route.group));

        if !limit.allowed {
            info!(
                user = %identity.id,
                group = %route.group,
                retry_after_seconds = limit.retry_after_seconds(),
                "request rate limited"
            );
            return Decision::rate_limited(&limit);
        }

        let check = self
            .policy
            .resolve(identity, &route.resource, &route.action, owner);
        let decision = Decision::checked(&check, &limit);

        if decision.allowed {
            debug!(
                user = %identity.id,
                resource = %route.resource,
                action = %route.action,
                required = %check.required_scope,
                "request allowed"
            );
        } else {
            info!(
                user = %identity.id,
                resource = %route.resource,
                action = %route.action,
                required = %check.required_scope,
                resolved = ?check.resolved_scope,
                denial = check.denial.map(DenialCause::as_str),
                "permission denied"
            );
        }

        decision
    }

    /// Rebuilds the permission index from `source`.
    ///
    /// Returns the new index generation.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError`] if `source` is malformed; the previous
    /// index stays active.
    pub fn reload(&self, source: &PermissionSource) -> Result<u64, IndexError> {
        self.index.reload(source)
    }

    /// The permission index.
    #[must_use]
    pub fn index(&self) -> &Arc<PermissionIndex> {
        &self.index
    }

    /// The rate limiter.
    #[must_use]
    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// The route bindings.
    #[must_use]
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Period of the background eviction sweep.
    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }

    /// Starts evicting idle rate limit keys every [`sweep_interval`](Self::sweep_interval).
    ///
    /// Abort the returned handle to stop the task.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn spawn_sweeper(&self) -> JoinHandle<()> {
        spawn_sweeper(Arc::clone(&self.limiter), self.sweep_interval)
    }
}

impl std::fmt::Debug for Gatekeeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gatekeeper")
            .field("generation", &self.index.generation())
            .field("active_keys", &self.limiter.active_keys())
            .field("routes", &self.routes.len())
            .field("sweep_interval", &self.sweep_interval)
            .finish_non_exhaustive()
    }
}
