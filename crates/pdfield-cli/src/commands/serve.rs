//! Serve command - HTTP extraction service.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use clap::Args;
use console::style;
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use pdfield_core::{ExtractionResult, JobBatch, PdfieldError, RequestOrchestrator};

use super::{build_orchestrator, load_config, with_data_root};

/// Arguments for the serve command.
#[derive(Args)]
pub struct ServeArgs {
    /// Bind address (default from config)
    #[arg(long)]
    host: Option<String>,

    /// Bind port (default from config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory job paths are resolved against
    #[arg(short, long)]
    data_root: Option<PathBuf>,
}

pub async fn run(args: ServeArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let mut config = with_data_root(load_config(config_path)?, args.data_root);
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    // Requests may only name documents under the data root.
    let orchestrator = Arc::new(build_orchestrator(&config)?.confined_to_data_root());
    let app = router(orchestrator);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Serving documents from {}", config.documents.data_root.display());
    println!("{} Listening on http://{}", style("✓").green(), addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Routes of the extraction service.
pub fn router(orchestrator: Arc<RequestOrchestrator>) -> Router {
    Router::new()
        .route("/extract", post(extract))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(orchestrator)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

/// Accepts one job or an array of jobs; always answers with an array.
async fn extract(
    State(orchestrator): State<Arc<RequestOrchestrator>>,
    payload: Result<Json<JobBatch>, JsonRejection>,
) -> Result<Json<Vec<ExtractionResult>>, ApiError> {
    let Json(batch) = payload.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    let jobs = batch.into_jobs();
    info!("Received {} job(s)", jobs.len());

    let results = orchestrator.run_batch(&jobs).await?;
    Ok(Json(results))
}

/// Error body `{"detail": ...}` with a status.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: detail.into(),
        }
    }
}

impl From<PdfieldError> for ApiError {
    fn from(err: PdfieldError) -> Self {
        if err.is_client_error() {
            warn!("Rejected batch: {}", err);
            Self::bad_request(err.to_string())
        } else {
            error!("Batch failed: {}", err);
            Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                detail: err.to_string(),
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({"detail": self.detail}))).into_response()
    }
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
