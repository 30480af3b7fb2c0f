//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Registration (at startup):
//!     method + RoutePath + handlers
//!     → pattern.rs (rewrite `*`, compile to regex + capture keys)
//!     → router.rs (append in registration order)
//!
//! Incoming Request (method, path)
//!     → router.rs (walk routes in order, filter by method)
//!     → pattern.rs matcher (evaluate path)
//!     → Return: RouteMatch { route, params } or None
//! ```
//!
//! # Design Decisions
//! - Routes are immutable once registered
//! - Deterministic: same input always matches same route
//! - First match wins (ordered by registration)
//! - Match results are returned by value, never stored on the route

pub mod method;
pub mod params;
pub mod pattern;
pub mod route;
pub mod router;

pub use method::HttpMethod;
pub use params::Params;
pub use pattern::{PatternError, PatternOptions, RoutePath};
pub use route::{Route, RouteKind, RouteMatch};
pub use router::{RouteError, Router};
