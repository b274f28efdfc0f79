//! Permission primitives for warden.
//!
//! This crate answers "may this identity perform this action on this
//! resource instance?" without any I/O on the hot path.
//!
//! # Architecture
//!
//! ```text
//! PermissionSource (TOML)                 role/grant source data
//!        │ build / reload
//!        ▼
//! PermissionIndex ── Arc<IndexSnapshot>   immutable between reloads
//!        │ snapshot()
//!        ▼
//! ScopeResolver (AccessPolicy)            relationship vs granted scope
//!        │
//!        ▼
//! ResolvedCheck { allowed, required_scope, resolved_scope, denial }
//! ```
//!
//! # Design Principles
//!
//! - **Highest scope wins**: overlapping grants for one `(resource, action)`
//!   collapse to the broadest scope; they are never double-counted
//! - **Copy-on-write snapshots**: reloads swap an `Arc`, never mutate in place
//! - **Default deny**: any dangling reference resolves to denial

mod error;
mod grant;
mod index;
mod resolver;

pub use error::IndexError;
pub use grant::{Grant, GrantDef, PermissionSource, RoleDef};
pub use index::{IndexSnapshot, PermissionIndex};
pub use resolver::{relationship, AccessPolicy, DenialCause, ResolvedCheck, ScopeResolver};
