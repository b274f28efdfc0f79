//! Runtime layer for warden.
//!
//! Wires the permission primitives from `warden-auth` together with
//! per-key rate limiting into a single per-call [`Gatekeeper`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                       Gatekeeper                        │
//! │  evaluate(identity, route, owner) -> Decision           │
//! └──────────────┬──────────────────────────┬───────────────┘
//!                │ 1. rate limit            │ 2. permission
//!                ▼                          ▼
//! ┌──────────────────────────┐  ┌──────────────────────────┐
//! │ RouteTable → RateLimiter │  │ ScopeResolver            │
//! │ per-key fixed windows    │  │ over PermissionIndex     │
//! └──────────────────────────┘  └──────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`ratelimit`]: fixed-window counters, presets, clocks, sweeper
//! - [`config`]: layered TOML configuration
//! - [`RouteTable`]: route group → policy bindings
//! - [`Gatekeeper`]: the single entry point per inbound call

pub mod config;
mod gatekeeper;
pub mod ratelimit;
mod route;

pub use gatekeeper::{Decision, Gatekeeper, Reason, Route};
pub use route::RouteTable;
