//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, timeout, tracing)
//!     → App::serve
//!         → request.rs (HttpRequest: params, query, body readers)
//!         → response.rs (HttpResponse: status, headers, body builders)
//!     → Send to client
//! ```

pub mod query;
pub mod request;
pub mod response;
pub mod server;

pub use query::QueryParams;
pub use request::{BodyError, HttpRequest, MakeRequestUuid, X_REQUEST_ID};
pub use response::{HttpResponse, ResponseError};
pub use server::HttpServer;
