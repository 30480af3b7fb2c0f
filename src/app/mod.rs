//! Application: route registration and request dispatch.
//!
//! # Data Flow
//! ```text
//! Registration (before serving):
//!     App::get / post / route(_chain)
//!     → routing::Router::register_route
//!
//! Dispatch (App::serve):
//!     Request<Body>
//!     → Router::find_route (method + path)
//!     → None: 404 Not Found
//!     → Some: HttpRequest + HttpResponse bound to this app
//!         → handler 1 → Next → handler 2 → ... → Respond
//!     → Response<Body>
//! ```
//!
//! # Design Decisions
//! - Registration needs `&mut App`; serving needs `Arc<App>`, so the route
//!   table is frozen before the first request
//! - Handler errors are returned to the host, never turned into responses here
//! - A chain that runs out of handlers sends the last working response

pub mod handler;

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode};
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};

use crate::http::query::QueryParams;
use crate::http::{HttpRequest, HttpResponse};
use crate::observability::metrics;
use crate::routing::{HttpMethod, PatternOptions, RouteError, RoutePath, Router};

pub use handler::{BoxError, BoxedHandler, Handler, IntoOutcome, Outcome};

/// Body sent when no route matches.
pub const NOT_FOUND_BODY: &str = "404 Not Found";

/// Route matching settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Treat `/Cat` and `/cat` as different paths.
    pub case_sensitive_routing: bool,

    /// Treat `/cat` and `/cat/` as different paths.
    pub strict_routing: bool,
}

impl From<AppSettings> for PatternOptions {
    fn from(settings: AppSettings) -> Self {
        Self {
            sensitive: settings.case_sensitive_routing,
            strict: settings.strict_routing,
        }
    }
}

/// Errors returned by [`App::serve`].
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("handler for {method} {path} failed: {source}")]
    Handler {
        method: Method,
        path: String,
        #[source]
        source: BoxError,
    },
}

/// A routed application.
#[derive(Debug, Default)]
pub struct App {
    router: Router,
    settings: AppSettings,
}

impl App {
    pub fn new(settings: AppSettings) -> Self {
        Self {
            router: Router::new(settings.into()),
            settings,
        }
    }

    pub fn settings(&self) -> AppSettings {
        self.settings
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Register `handlers` as a chain for `method` and `path`.
    pub fn route_chain(
        &mut self,
        method: HttpMethod,
        path: impl Into<RoutePath>,
        handlers: Vec<BoxedHandler>,
    ) -> Result<&mut Self, RouteError> {
        self.router.register_route(method, path, handlers)?;
        Ok(self)
    }

    pub fn route<H: Handler>(
        &mut self,
        method: HttpMethod,
        path: impl Into<RoutePath>,
        handler: H,
    ) -> Result<&mut Self, RouteError> {
        self.route_chain(method, path, vec![handler::boxed(handler)])
    }

    pub fn get<H: Handler>(
        &mut self,
        path: impl Into<RoutePath>,
        handler: H,
    ) -> Result<&mut Self, RouteError> {
        self.route(HttpMethod::Get, path, handler)
    }

    pub fn post<H: Handler>(
        &mut self,
        path: impl Into<RoutePath>,
        handler: H,
    ) -> Result<&mut Self, RouteError> {
        self.route(HttpMethod::Post, path, handler)
    }

    /// Route every method for `path` to `handler`.
    pub fn all<H: Handler>(
        &mut self,
        path: impl Into<RoutePath>,
        handler: H,
    ) -> Result<&mut Self, RouteError> {
        self.route(HttpMethod::All, path, handler)
    }

    pub fn get_chain(
        &mut self,
        path: impl Into<RoutePath>,
        handlers: Vec<BoxedHandler>,
    ) -> Result<&mut Self, RouteError> {
        self.route_chain(HttpMethod::Get, path, handlers)
    }

    pub fn post_chain(
        &mut self,
        path: impl Into<RoutePath>,
        handlers: Vec<BoxedHandler>,
    ) -> Result<&mut Self, RouteError> {
        self.route_chain(HttpMethod::Post, path, handlers)
    }

    /// Freeze the route table for serving.
    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Dispatch one request through the first matching route.
    pub async fn serve(
        self: &Arc<Self>,
        request: Request<Body>,
    ) -> Result<Response<Body>, DispatchError> {
        let start = Instant::now();
        let method = request.method().clone();
        let path = request.uri().path().to_string();

        let Some(matched) = self.router.find_route(&method, &path) else {
            metrics::record_dispatch(&method, StatusCode::NOT_FOUND, start);
            return Ok(not_found());
        };

        tracing::debug!(
            method = %method,
            path = %path,
            route = %matched.route.path(),
            handlers = matched.route.handlers().len(),
            "Dispatching request"
        );

        let app = Arc::downgrade(self);
        let query = QueryParams::parse(request.uri().query().unwrap_or_default());
        let mut req = HttpRequest::dispatched(request, matched.params, query, app.clone());
        let mut res = HttpResponse::attached(app);

        for handler in matched.route.handlers() {
            let outcome = handler.call(req, res).await.map_err(|source| {
                metrics::record_dispatch(&method, StatusCode::INTERNAL_SERVER_ERROR, start);
                DispatchError::Handler {
                    method: method.clone(),
                    path: path.clone(),
                    source,
                }
            })?;

            match outcome {
                Outcome::Respond(response) => {
                    metrics::record_dispatch(&method, response.status(), start);
                    return Ok(response.into_response());
                }
                Outcome::Next(next_req, next_res) => {
                    req = next_req;
                    res = next_res;
                }
            }
        }

        tracing::warn!(
            method = %method,
            path = %path,
            "Handler chain ended without a response, sending working response"
        );
        metrics::record_dispatch(&method, res.status(), start);
        Ok(res.into_response())
    }
}

fn not_found() -> Response<Body> {
    let mut response = Response::new(Body::from(NOT_FOUND_BODY));
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers;

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_text(response: Response<Body>) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_not_found() {
        let app = App::default().into_shared();
        let response = app.serve(get("/nothing")).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().is_empty());
        assert_eq!(body_text(response).await, NOT_FOUND_BODY);
    }

    #[tokio::test]
    async fn test_handler_sees_params_and_app() {
        let mut app = App::default();
        app.get("/cat/:id", |req: HttpRequest, res: HttpResponse| async move {
            assert!(req.app().is_some());
            assert!(res.app().is_some());
            res.send(format!("cat {}", req.param("id").unwrap_or_default()))
        })
        .unwrap();
        let app = app.into_shared();

        let response = app.serve(get("/cat/42")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "cat 42");
    }

    #[tokio::test]
    async fn test_exhausted_chain_sends_working_response() {
        let mut app = App::default();
        app.get_chain(
            "/",
            handlers![|req: HttpRequest, res: HttpResponse| async move {
                Outcome::next(req, res.code(StatusCode::ACCEPTED).send("partial"))
            }],
        )
        .unwrap();
        let app = app.into_shared();

        let response = app.serve(get("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(body_text(response).await, "partial");
    }

    #[tokio::test]
    async fn test_handler_error_is_returned() {
        let mut app = App::default();
        app.get("/boom", |_req: HttpRequest, _res: HttpResponse| async move {
            Err::<HttpResponse, BoxError>("exploded".into())
        })
        .unwrap();
        let app = app.into_shared();

        let err = app.serve(get("/boom")).await.unwrap_err();
        let DispatchError::Handler { method, path, source } = err;
        assert_eq!(method, Method::GET);
        assert_eq!(path, "/boom");
        assert_eq!(source.to_string(), "exploded");
    }

    #[tokio::test]
    async fn test_settings_reach_matcher() {
        let mut app = App::new(AppSettings {
            case_sensitive_routing: true,
            strict_routing: true,
        });
        app.get("/cat", |_req: HttpRequest, res: HttpResponse| async move { res })
            .unwrap();
        let app = app.into_shared();

        assert_eq!(app.serve(get("/cat")).await.unwrap().status(), StatusCode::OK);
        assert_eq!(
            app.serve(get("/Cat")).await.unwrap().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            app.serve(get("/cat/")).await.unwrap().status(),
            StatusCode::NOT_FOUND
        );
    }
}
