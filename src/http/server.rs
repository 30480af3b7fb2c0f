//! HTTP server hosting an [`App`].
//!
//! # Responsibilities
//! - Create the Axum router that hands every request to `App::serve`
//! - Wire up middleware (request ID, tracing, timeout)
//! - Turn dispatch failures into `500 Internal Server Error`
//! - Serve on a listener until shutdown is signalled

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{Request, Response, StatusCode},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::app::App;
use crate::config::ServerConfig;
use crate::http::request::{MakeRequestUuid, X_REQUEST_ID};
use crate::lifecycle::shutdown;
use crate::observability::tracing::RequestSpan;

/// Body sent when a handler fails.
pub const INTERNAL_ERROR_BODY: &str = "500 Internal Server Error";

/// HTTP server for an edge router app.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
}

impl HttpServer {
    /// Create a server dispatching every request to `app`.
    pub fn new(config: ServerConfig, app: Arc<App>) -> Self {
        let router = Self::build_router(&config, app);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ServerConfig, app: Arc<App>) -> Router {
        let request_id = axum::http::HeaderName::from_static(X_REQUEST_ID);

        Router::new().fallback(dispatch).with_state(app).layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
                .layer(TraceLayer::new_for_http().make_span_with(RequestSpan))
                .layer(PropagateRequestIdLayer::new(request_id))
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    Duration::from_secs(config.timeouts.request_secs),
                )),
        )
    }

    /// The fully layered router, for driving the server without a socket.
    pub fn into_router(self) -> Router {
        self.router
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown_rx` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown::wait(shutdown_rx))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Fallback handler: every request goes through the app's own router.
async fn dispatch(State(app): State<Arc<App>>, request: Request<Body>) -> Response<Body> {
    match app.serve(request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, "Request dispatch failed");
            internal_error()
        }
    }
}

fn internal_error() -> Response<Body> {
    let mut response = Response::new(Body::from(INTERNAL_ERROR_BODY));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}
