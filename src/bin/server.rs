use axum::{
    Json, Router,
    http::StatusCode,
    routing::{get, post},
};
use cut_optimizer::solver::{Job, PackOptions, Packed, pack_jobs, pack_pipe_with, pack_sheet_with};
use cut_optimizer::types::{CutPiece, Layout, LinearCut, PipeLayout, StockPipe, StockSheet};
use serde::{Deserialize, Serialize};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

#[derive(Deserialize, Serialize)]
struct SheetRequest {
    stock: StockSheet,
    cuts: Vec<CutPiece>,
    #[serde(default)]
    options: PackOptions,
}

#[derive(Deserialize, Serialize)]
struct PipeRequest {
    stock: StockPipe,
    cuts: Vec<LinearCut>,
    #[serde(default)]
    options: PackOptions,
}

#[derive(Deserialize, Serialize)]
struct BatchRequest {
    jobs: Vec<Job>,
}

#[derive(Serialize)]
struct SheetResponse {
    #[serde(flatten)]
    layout: Layout,
    placed_count: usize,
    waste_percent: f64,
}

#[derive(Serialize)]
#[serde(untagged)]
enum BatchItem {
    Ok(Packed),
    Err { error: String },
}

type ApiError = (StatusCode, String);

fn bad_request(e: impl std::fmt::Display) -> ApiError {
    (StatusCode::BAD_REQUEST, e.to_string())
}

/// Packing is CPU-bound; keep it off the async workers.
async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await.map_err(|e| {
        tracing::error!(error = %e, "packing task failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "packing failed".to_string())
    })?
}

async fn sheet(Json(req): Json<SheetRequest>) -> Result<Json<SheetResponse>, ApiError> {
    tracing::info!(
        body = serde_json::to_string(&req).unwrap_or_default(),
        "POST /sheet"
    );

    let layout = blocking(move || {
        pack_sheet_with(&req.stock, &req.cuts, &req.options).map_err(bad_request)
    })
    .await?;

    Ok(Json(SheetResponse {
        placed_count: layout.placed_count(),
        waste_percent: layout.waste_percent(),
        layout,
    }))
}

async fn pipe(Json(req): Json<PipeRequest>) -> Result<Json<PipeLayout>, ApiError> {
    tracing::info!(
        body = serde_json::to_string(&req).unwrap_or_default(),
        "POST /pipe"
    );

    let layout = blocking(move || {
        pack_pipe_with(&req.stock, &req.cuts, &req.options).map_err(bad_request)
    })
    .await?;

    Ok(Json(layout))
}

async fn batch(Json(req): Json<BatchRequest>) -> Result<Json<Vec<BatchItem>>, ApiError> {
    tracing::info!(jobs = req.jobs.len(), "POST /batch");

    let results = blocking(move || Ok(pack_jobs(&req.jobs))).await?;

    Ok(Json(
        results
            .into_iter()
            .map(|r| match r {
                Ok(packed) => BatchItem::Ok(packed),
                Err(e) => BatchItem::Err {
                    error: e.to_string(),
                },
            })
            .collect(),
    ))
}

fn app() -> Router {
    Router::new()
        .route("/up", get(|| async { "ok" }))
        .route("/sheet", post(sheet))
        .route("/pipe", post(pipe))
        .route("/batch", post(batch))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

#[tokio::main]
async fn main() {
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open("development.log")
        .expect("failed to open development.log");

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_target(false)
        .with_ansi(false)
        .with_max_level(Level::INFO)
        .init();

    // Reporting stays off unless a DSN is configured.
    let _sentry = std::env::var("SENTRY_DSN").ok().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    let port = std::env::var("PORT").unwrap_or_else(|_| "3001".to_string());
    let addr = format!("0.0.0.0:{port}");

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    eprintln!("Listening on {addr}");
    axum::serve(listener, app()).await.unwrap();
}
