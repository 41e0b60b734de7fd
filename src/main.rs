//! summer demo server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server ──▶ dispatch::Dispatcher ──▶ routing::RouteTable
//!                     (request id,      (context, auth hook,     (fits / score /
//!                      trace span)       handler, recovery)       params)
//!     Client Response                          │
//!     ◀────────────── ResponseBuilder ◀────────┘
//!
//!     Cross-cutting: config, observability, lifecycle
//! ```

use std::path::PathBuf;

use clap::Parser;
use serde_json::json;
use thiserror::Error;

use summer::config::{load_config, ServerConfig};
use summer::dispatch::{Dispatcher, DispatcherBuilder, HandlerError};
use summer::http::{self, HttpServer, RequestContext};
use summer::lifecycle::{signals, Shutdown};
use summer::observability::{logging, metrics};

#[derive(Debug, Parser)]
#[command(name = "summer", version, about = "JSON route-dispatch demo server")]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[derive(Debug, Error)]
enum SystemsError {
    #[error("systems backend unavailable")]
    Unavailable,
}

fn systems() -> DispatcherBuilder {
    Dispatcher::builder()
        .resource("/v1", |r| {
            r.get("/systems/ping", |_ctx: RequestContext| async {
                Err::<serde_json::Value, _>(HandlerError::new(SystemsError::Unavailable))
            })
            .get("/systems/:id", |ctx: RequestContext| async move {
                tracing::info!(params = ?ctx.params, query = ?ctx.query, "Describing system");
                Ok::<_, HandlerError>(json!(ctx.params))
            })
            .post("/systems/:id", |ctx: RequestContext| async move {
                Ok::<_, HandlerError>(json!({ "body": ctx.body, "params": ctx.params }))
            });
        })
        .get("/ping", |_ctx: RequestContext| async {
            Ok::<_, HandlerError>(json!({ "pong": true }))
        })
        .on_error(|e: SystemsError| async move {
            Ok::<_, HandlerError>((503u16, json!({ "error": e.to_string() })))
        })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.observability)?;

    tracing::info!("summer v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_body_size = config.limits.max_body_size,
        config_file = ?cli.config,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let dispatcher = systems()
        .max_body_size(config.limits.max_body_size)
        .build();

    let listener = http::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = tokio::spawn(HttpServer::new(dispatcher).run(listener, shutdown.subscribe()));

    signals::wait_for_signal().await;
    shutdown.trigger();

    server.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}
