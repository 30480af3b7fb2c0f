//! Edge Router Library
//!
//! Express-style routing for async HTTP handlers: register routes with
//! path patterns, then hand each incoming request to [`App::serve`].

pub mod app;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use app::{App, AppSettings, BoxError, DispatchError, Handler, Outcome};
pub use config::ServerConfig;
pub use http::{HttpRequest, HttpResponse, HttpServer, QueryParams};
pub use lifecycle::Shutdown;
pub use routing::{HttpMethod, Params, RoutePath, Router};
