//! The autocomplete HTTP service: a read-only front on the name index,
//! safe to run beside the ingester without coordination.

use anyhow::Context;
use autocomplete::NameIndex;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use clap::Parser;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{self, CorsLayer};
use tower_http::trace::TraceLayer;

/// Serves prefix autocomplete over all known system names.
#[derive(Debug, Parser)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(flatten)]
    logging: cli_common::LogArgs,

    /// Path to the newline-delimited system name cache written by
    /// rp-export-names.
    #[clap(long, env = "RP_NAMES_FILE", default_value = "data/system_names.txt")]
    names_file: std::path::PathBuf,

    #[clap(long, env, default_value = "8000")]
    port: u16,

    #[clap(long, env, default_value = "0.0.0.0")]
    bind_addr: std::net::IpAddr,
}

const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 100;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    cli_common::init_logging(&args.logging);
    tracing::debug!(?args, "successfully parsed arguments");

    let index = NameIndex::load(&args.names_file).context("loading system name cache")?;

    let app = Router::new()
        .route("/api/autocomplete", get(autocomplete_handler))
        .route("/api/stats", get(stats_handler))
        .route("/api/health", get(health_handler))
        .with_state(Arc::new(index))
        .layer(
            CorsLayer::new()
                .allow_origin(cors::Any)
                .allow_headers([axum::http::header::CONTENT_TYPE, axum::http::header::ACCEPT]),
        )
        .layer(TraceLayer::new_for_http());

    let bind_addr = std::net::SocketAddr::new(args.bind_addr, args.port);
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .context("failed to bind server port")?;
    tracing::info!(%bind_addr, "serving autocomplete");

    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Debug, serde::Deserialize)]
struct AutocompleteParams {
    q: String,
    limit: Option<usize>,
}

#[derive(Debug, serde::Serialize)]
struct AutocompleteResponse {
    query: String,
    results: Vec<String>,
    count: usize,
    limit: usize,
    response_time_ms: f64,
    success: bool,
}

async fn autocomplete_handler(
    State(index): State<Arc<NameIndex>>,
    Query(params): Query<AutocompleteParams>,
) -> Json<AutocompleteResponse> {
    let started = Instant::now();
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let results = index.search(&params.q, limit);
    let response_time_ms = started.elapsed().as_secs_f64() * 1000.0;

    Json(AutocompleteResponse {
        query: params.q,
        count: results.len(),
        results,
        limit,
        response_time_ms: (response_time_ms * 100.0).round() / 100.0,
        success: true,
    })
}

async fn stats_handler(State(index): State<Arc<NameIndex>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": "system_autocomplete",
        "stats": index.stats(),
        "success": true,
    }))
}

async fn health_handler(State(index): State<Arc<NameIndex>>) -> Json<serde_json::Value> {
    let stats = index.stats();
    Json(serde_json::json!({
        "status": "healthy",
        "loaded": stats.loaded,
        "total_systems": stats.total_systems,
        "memory_mb": (stats.estimated_memory_mb * 10.0).round() / 10.0,
        "success": true,
    }))
}
