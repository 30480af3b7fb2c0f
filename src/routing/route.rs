//! Registered routes and lookup results.

use std::fmt;

use crate::app::handler::BoxedHandler;
use crate::routing::method::HttpMethod;
use crate::routing::params::Params;
use crate::routing::pattern::{CompiledPattern, RoutePath};

/// How a route decides whether a path matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    /// Registered as `*`: matches every path without running the matcher.
    CatchAll,
    /// Matches through the compiled pattern.
    Pattern,
}

/// One registered method + path + handler chain.
///
/// Immutable once registered; lookups never write to it.
pub struct Route {
    method: HttpMethod,
    path: RoutePath,
    kind: RouteKind,
    handlers: Vec<BoxedHandler>,
    pattern: CompiledPattern,
}

impl Route {
    pub(crate) fn new(
        method: HttpMethod,
        path: RoutePath,
        kind: RouteKind,
        handlers: Vec<BoxedHandler>,
        pattern: CompiledPattern,
    ) -> Self {
        Self {
            method,
            path,
            kind,
            handlers,
            pattern,
        }
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// The path after wildcard normalization.
    pub fn path(&self) -> &RoutePath {
        &self.path
    }

    pub fn kind(&self) -> RouteKind {
        self.kind
    }

    pub fn handlers(&self) -> &[BoxedHandler] {
        &self.handlers
    }

    pub fn pattern(&self) -> &CompiledPattern {
        &self.pattern
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("kind", &self.kind)
            .field("handlers", &self.handlers.len())
            .field("keys", &self.pattern.keys())
            .finish()
    }
}

/// Result of a successful lookup, owned by the dispatch that asked for it.
#[derive(Debug, Clone)]
pub struct RouteMatch<'a> {
    pub route: &'a Route,
    pub params: Params,
}
