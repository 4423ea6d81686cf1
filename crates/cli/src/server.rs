//! HTTP API over the current dataset snapshot.

use anyhow::Context;
use axum::extract::Query;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use cadop_core::engine;
use cadop_core::format::Envelope;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storage::{DatasetStore, ReloadOutcome, StatusReport};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReloadResponse {
    pub outcome: String,
    pub records_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn router(store: Arc<DatasetStore>, cors: bool) -> Router {
    let app = Router::new()
        .route("/api/search", get(handle_search))
        .route("/api/test", get(handle_status))
        .route("/api/reload", post(handle_reload))
        .layer(Extension(store));
    if cors {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}

pub async fn handle_search(
    Extension(store): Extension<Arc<DatasetStore>>,
    Query(params): Query<SearchParams>,
) -> (StatusCode, Json<Envelope>) {
    let query = params.q.unwrap_or_default();
    let snapshot = store.snapshot();
    info!(
        "Searching for '{}' in {} records",
        query,
        snapshot.dataset().len()
    );

    let outcome = engine::search(snapshot.dataset(), &query);
    let status = match &outcome {
        Ok(results) => {
            info!("Found {} results for '{}'", results.len(), query);
            StatusCode::OK
        }
        Err(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
        Err(e) => {
            warn!("Search failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(Envelope::from_outcome(&outcome)))
}

pub async fn handle_status(Extension(store): Extension<Arc<DatasetStore>>) -> Json<StatusReport> {
    Json(store.snapshot().status())
}

pub async fn handle_reload(
    Extension(store): Extension<Arc<DatasetStore>>,
) -> (StatusCode, Json<ReloadResponse>) {
    let worker = Arc::clone(&store);
    let outcome = match tokio::task::spawn_blocking(move || worker.reload()).await {
        Ok(outcome) => outcome,
        Err(e) => ReloadOutcome::Failed(format!("reload task failed: {}", e)),
    };
    let records_count = store.snapshot().dataset().len();
    let (status, response) = match outcome {
        ReloadOutcome::Unchanged => (
            StatusCode::OK,
            ReloadResponse {
                outcome: "unchanged".to_string(),
                records_count,
                error: None,
            },
        ),
        ReloadOutcome::Replaced { records } => (
            StatusCode::OK,
            ReloadResponse {
                outcome: "replaced".to_string(),
                records_count: records,
                error: None,
            },
        ),
        ReloadOutcome::Unsettled => (
            StatusCode::CONFLICT,
            ReloadResponse {
                outcome: "unsettled".to_string(),
                records_count,
                error: Some("dataset file is still being written".to_string()),
            },
        ),
        ReloadOutcome::Failed(error) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ReloadResponse {
                outcome: "failed".to_string(),
                records_count,
                error: Some(error),
            },
        ),
    };
    (status, Json(response))
}

pub async fn serve(store: Arc<DatasetStore>, bind: &str, cors: bool) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("bind {}", bind))?;
    info!("HTTP server listening on {}", listener.local_addr()?);
    info!("Press Ctrl+C to shutdown");
    axum::serve(listener, router(store, cors))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
