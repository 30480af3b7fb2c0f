//! Edge router demo server.
//!
//! Loads a TOML config, builds a small routed app and serves it until
//! SIGINT/SIGTERM.
//!
//! ```text
//! CLI args → config::load_config → App (routes) → HttpServer::run
//!                                                      ↑
//!                              lifecycle::shutdown_on_signal
//! ```

use std::path::PathBuf;

use axum::http::StatusCode;
use clap::Parser;
use serde_json::json;
use tokio::net::TcpListener;

use edge_router::app::{App, BoxError, Outcome};
use edge_router::config::{self, ServerConfig};
use edge_router::http::{HttpRequest, HttpResponse, HttpServer};
use edge_router::lifecycle::{shutdown_on_signal, Shutdown};
use edge_router::observability::{logging, metrics};
use edge_router::handlers;

#[derive(Parser)]
#[command(name = "edge-router")]
#[command(about = "Express-style HTTP router demo server", long_about = None)]
struct Cli {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.observability.log_level);
    tracing::info!("edge-router v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        case_sensitive_routing = config.routing.case_sensitive_routing,
        strict_routing = config.routing.strict_routing,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let app = demo_app(&config)?.into_shared();
    tracing::info!(routes = app.router().len(), "Routes registered");

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let shutdown_rx = shutdown.subscribe();
    shutdown_on_signal(shutdown);

    HttpServer::new(config, app).run(listener, shutdown_rx).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Routes served by the demo binary.
fn demo_app(config: &ServerConfig) -> Result<App, Box<dyn std::error::Error>> {
    let mut app = App::new(config.routing);

    app.get("/", |_req: HttpRequest, res: HttpResponse| async move {
        res.html("<h1>edge-router</h1>")
    })?
    .get("/cat/:id", |req: HttpRequest, res: HttpResponse| async move {
        res.json(&json!({ "id": req.param("id") }))
    })?
    .get("/search", |req: HttpRequest, res: HttpResponse| async move {
        res.json(&json!({ "query": req.query().get("q") }))
    })?
    .post("/login", login)?
    .get("/assets/*", |req: HttpRequest, res: HttpResponse| async move {
        res.send(format!("asset {}", req.params().get_index(0).unwrap_or_default()))
    })?
    .get_chain(
        "/admin",
        handlers![require_authorization, |_req: HttpRequest, res: HttpResponse| async move {
            res.send("admin area")
        }],
    )?;

    Ok(app)
}

async fn login(mut req: HttpRequest, res: HttpResponse) -> Result<HttpResponse, BoxError> {
    let form = req.form().await?;
    let Some(user) = form.get("username") else {
        return Ok(res.code(StatusCode::BAD_REQUEST).send("missing username"));
    };
    Ok(res.send(format!("welcome {user}")))
}

async fn require_authorization(req: HttpRequest, res: HttpResponse) -> Outcome {
    if req.header("authorization").is_some() {
        Outcome::next(req, res)
    } else {
        Outcome::respond(res.code(StatusCode::UNAUTHORIZED).send("unauthorized"))
    }
}
