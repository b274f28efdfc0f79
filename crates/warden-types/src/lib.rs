//! Core types for warden.
//!
//! This crate holds the vocabulary shared by every layer of the
//! access gatekeeper: identifiers, the scope hierarchy, and the
//! identity/ownership records a request is evaluated against.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  warden-types   : IDs, ScopeLevel, Identity, ErrorCode ◄ HERE│
//! ├─────────────────────────────────────────────────────────────┤
//! │  warden-auth    : PermissionIndex, ScopeResolver            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  warden-runtime : RateLimiter, Gatekeeper, config           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  warden-cli     : validate / check commands                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use warden_types::{CompanyId, Identity, ResourceOwner, ScopeLevel, TeamId, UserId};
//!
//! let company = CompanyId::new();
//! let team = TeamId::new();
//! let actor = Identity::new(UserId::new(), company)
//!     .with_team(team)
//!     .with_role("sales_rep");
//!
//! let owner = ResourceOwner::team(team, company);
//! assert!(actor.is_member_of(owner.team_id.unwrap()));
//! assert!(ScopeLevel::Company.covers(ScopeLevel::Team));
//! ```

mod error;
mod id;
mod identity;
mod scope;

pub use error::{assert_error_code, assert_error_codes, ErrorCode};
pub use id::{CompanyId, GrantId, RoleId, TeamId, UserId};
pub use identity::{Identity, ResourceOwner};
pub use scope::{ParseScopeError, ScopeLevel};
