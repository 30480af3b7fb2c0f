//! Route registration and lookup.
//!
//! # Responsibilities
//! - Compile and store routes in registration order
//! - Look up the first route matching a method and path
//! - Extract and percent-decode captured parameters
//!
//! # Design Decisions
//! - Append-only: no removal, no de-duplication
//! - First registered, first matched; no specificity scoring
//! - Lookup returns a [`RouteMatch`] value and never writes to the route
//! - Explicit `None` rather than a silent default

use axum::http::Method;
use regex::Captures;

use crate::app::handler::{self, BoxedHandler, Handler};
use crate::observability::metrics;
use crate::routing::method::HttpMethod;
use crate::routing::params::Params;
use crate::routing::pattern::{self, Key, PatternError, PatternOptions, RoutePath};
use crate::routing::route::{Route, RouteKind, RouteMatch};

/// Value of the positional capture reported by catch-all routes.
pub const CATCH_ALL_CAPTURE: &str = "(.*)";

/// Errors raised while registering a route.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("route {method} {path} has no handlers")]
    NoHandlers { method: HttpMethod, path: String },

    #[error("invalid route path {path}: {source}")]
    Pattern {
        path: String,
        #[source]
        source: PatternError,
    },
}

/// Ordered collection of routes.
#[derive(Debug, Default)]
pub struct Router {
    routes: Vec<Route>,
    options: PatternOptions,
}

impl Router {
    /// Create an empty router compiling patterns with `options`.
    pub fn new(options: PatternOptions) -> Self {
        Self {
            routes: Vec::new(),
            options,
        }
    }

    pub fn options(&self) -> PatternOptions {
        self.options
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Register a route. Nothing is added if the path fails to compile.
    pub fn register_route(
        &mut self,
        method: HttpMethod,
        path: impl Into<RoutePath>,
        handlers: Vec<BoxedHandler>,
    ) -> Result<&mut Self, RouteError> {
        let path = path.into();
        if handlers.is_empty() {
            return Err(RouteError::NoHandlers {
                method,
                path: path.to_string(),
            });
        }

        let kind = if path.is_catch_all() {
            RouteKind::CatchAll
        } else {
            RouteKind::Pattern
        };

        let normalized = path.with_wildcard_groups();
        let compiled = pattern::compile(&normalized, self.options).map_err(|source| {
            RouteError::Pattern {
                path: path.to_string(),
                source,
            }
        })?;

        tracing::debug!(
            method = %method,
            path = %path,
            keys = compiled.keys().len(),
            handlers = handlers.len(),
            "Route registered"
        );
        metrics::record_route_registered();

        self.routes
            .push(Route::new(method, normalized, kind, handlers, compiled));
        Ok(self)
    }

    /// Find the first route accepting `method` whose pattern matches `path`.
    pub fn find_route(&self, method: &Method, path: &str) -> Option<RouteMatch<'_>> {
        for route in &self.routes {
            if !route.method().accepts(method) {
                continue;
            }

            if route.kind() == RouteKind::CatchAll {
                let mut params = Params::new();
                params.insert("0", CATCH_ALL_CAPTURE);
                return Some(RouteMatch { route, params });
            }

            let Some(captures) = route.pattern().regex().captures(path) else {
                continue;
            };

            return Some(RouteMatch {
                route,
                params: extract_params(&captures, route.pattern().keys()),
            });
        }

        tracing::debug!(method = %method, path = %path, "No route matched");
        None
    }

    /// Route GET requests for `path` to `handler`.
    pub fn get<H: Handler>(
        &mut self,
        path: impl Into<RoutePath>,
        handler: H,
    ) -> Result<&mut Self, RouteError> {
        self.register_route(HttpMethod::Get, path, vec![handler::boxed(handler)])
    }

    /// Route POST requests for `path` to `handler`.
    pub fn post<H: Handler>(
        &mut self,
        path: impl Into<RoutePath>,
        handler: H,
    ) -> Result<&mut Self, RouteError> {
        self.register_route(HttpMethod::Post, path, vec![handler::boxed(handler)])
    }
}

/// Pair capture group `i` with key `i - 1`, skipping groups that did not
/// participate in the match.
fn extract_params(captures: &Captures<'_>, keys: &[Key]) -> Params {
    let mut params = Params::new();
    for (key, group) in keys.iter().zip(captures.iter().skip(1)) {
        if let Some(value) = group {
            params.insert(key.name.as_str(), decode(value.as_str()));
        }
    }
    params
}

/// Percent-decode a captured value, keeping it verbatim if the bytes are not
/// valid UTF-8.
fn decode(value: &str) -> String {
    match urlencoding::decode(value) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpRequest, HttpResponse};
    use regex::Regex;

    fn noop() -> BoxedHandler {
        handler::boxed(|_req: HttpRequest, res: HttpResponse| async move { res })
    }

    fn router() -> Router {
        Router::new(PatternOptions::default())
    }

    #[test]
    fn test_literal_route() {
        let mut router = router();
        router.register_route(HttpMethod::Get, "/", vec![noop()]).unwrap();

        assert!(router.find_route(&Method::GET, "/").is_some());
        assert!(router.find_route(&Method::POST, "/").is_none());
        assert!(router.find_route(&Method::GET, "/missing").is_none());
    }

    #[test]
    fn test_named_param_is_decoded() {
        let mut router = router();
        router.register_route(HttpMethod::Get, "/cat/:id", vec![noop()]).unwrap();

        let m = router.find_route(&Method::GET, "/cat/123").unwrap();
        assert_eq!(m.params.get("id"), Some("123"));

        let m = router.find_route(&Method::GET, "/cat/hello%20there").unwrap();
        assert_eq!(m.params.get("id"), Some("hello there"));
    }

    #[test]
    fn test_invalid_utf8_escape_kept_verbatim() {
        let mut router = router();
        router.register_route(HttpMethod::Get, "/cat/:id", vec![noop()]).unwrap();

        let m = router.find_route(&Method::GET, "/cat/%FF").unwrap();
        assert_eq!(m.params.get("id"), Some("%FF"));
    }

    #[test]
    fn test_wildcards_are_positional() {
        let mut router = router();
        router.register_route(HttpMethod::Get, "/assets/*", vec![noop()]).unwrap();
        router
            .register_route(HttpMethod::Get, "/books/*/apply/*", vec![noop()])
            .unwrap();

        let m = router.find_route(&Method::GET, "/assets/files/image.png").unwrap();
        assert_eq!(m.params.get_index(0), Some("files/image.png"));

        let m = router.find_route(&Method::GET, "/books/1/apply/buy").unwrap();
        assert_eq!(m.params.get_index(0), Some("1"));
        assert_eq!(m.params.get_index(1), Some("buy"));
    }

    #[test]
    fn test_catch_all_respects_method() {
        let mut router = router();
        router.register_route(HttpMethod::Post, "*", vec![noop()]).unwrap();

        let m = router.find_route(&Method::POST, "/cat/adopt").unwrap();
        assert_eq!(m.route.kind(), RouteKind::CatchAll);
        assert_eq!(m.params.get("0"), Some(CATCH_ALL_CAPTURE));
        assert!(router.find_route(&Method::GET, "/").is_none());
    }

    #[test]
    fn test_all_method_matches_any() {
        let mut router = router();
        router.register_route(HttpMethod::All, "/ping", vec![noop()]).unwrap();

        assert!(router.find_route(&Method::GET, "/ping").is_some());
        assert!(router.find_route(&Method::DELETE, "/ping").is_some());
    }

    #[test]
    fn test_list_omits_unmatched_groups() {
        let mut router = router();
        router
            .register_route(HttpMethod::Get, ["/cat/:id", "/kitten/:name"], vec![noop()])
            .unwrap();

        let m = router.find_route(&Method::GET, "/kitten/7").unwrap();
        assert_eq!(m.params.get("name"), Some("7"));
        assert!(!m.params.contains("id"));
        assert_eq!(m.params.len(), 1);
    }

    #[test]
    fn test_regex_route() {
        let mut router = router();
        let regex = Regex::new(r"/cat|/kitten").unwrap();
        router.register_route(HttpMethod::Get, regex, vec![noop()]).unwrap();

        assert!(router.find_route(&Method::GET, "/cat").is_some());
        assert!(router.find_route(&Method::GET, "/kitten").is_some());
        assert!(router.find_route(&Method::GET, "/ct").is_none());
    }

    #[test]
    fn test_first_registered_wins() {
        let mut router = router();
        router.register_route(HttpMethod::Get, "/cat/:id", vec![noop()]).unwrap();
        router.register_route(HttpMethod::Get, "/cat/:name", vec![noop()]).unwrap();

        let m = router.find_route(&Method::GET, "/cat/1").unwrap();
        assert!(std::ptr::eq(m.route, &router.routes()[0]));
        assert_eq!(m.params.get("id"), Some("1"));
    }

    #[test]
    fn test_repeated_lookup_is_stable() {
        let mut router = router();
        router.register_route(HttpMethod::Get, "/cat/:id", vec![noop()]).unwrap();

        let first = router.find_route(&Method::GET, "/cat/1").unwrap().params;
        let second = router.find_route(&Method::GET, "/cat/1").unwrap().params;
        assert_eq!(first, second);
    }

    #[test]
    fn test_failed_registration_adds_nothing() {
        let mut router = router();
        let err = router
            .register_route(HttpMethod::Get, "/cat/(", vec![noop()])
            .unwrap_err();
        assert!(matches!(err, RouteError::Pattern { .. }));
        assert!(router.is_empty());

        let err = router
            .register_route(HttpMethod::Get, "/cat", Vec::new())
            .unwrap_err();
        assert!(matches!(err, RouteError::NoHandlers { .. }));
        assert!(router.is_empty());
    }

    #[test]
    fn test_chained_registration() {
        let mut router = router();
        router
            .get("/a", |_req: HttpRequest, res: HttpResponse| async move { res })
            .unwrap()
            .post("/b", |_req: HttpRequest, res: HttpResponse| async move { res })
            .unwrap();
        assert_eq!(router.len(), 2);
        assert_eq!(router.routes()[1].method(), HttpMethod::Post);
    }
}
