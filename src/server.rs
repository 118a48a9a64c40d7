//! HTTP service surface for the enrichment pipeline.
//!
//! Input-validation failures are structured error bodies, not HTTP errors:
//! the batch contract is that the caller always gets a status field back.

use axum::{
    extract::{Json, State},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::batch::{BatchScheduler, DEFAULT_MAX_CONCURRENT_ROWS};
use crate::pipeline::{enrich_single, Services, SingleEnrichment};
use crate::table;

#[derive(Clone)]
pub struct AppState {
    pub services: Services,
}

#[derive(Deserialize)]
struct InvokeRequest {
    input_csv: String,
    #[serde(default = "default_max_concurrent")]
    max_concurrent_rows: usize,
}

fn default_max_concurrent() -> usize {
    DEFAULT_MAX_CONCURRENT_ROWS
}

#[derive(Serialize)]
#[serde(untagged)]
enum InvokeResponse {
    Success {
        status: &'static str,
        output_csv: String,
        rows_processed: usize,
    },
    Error {
        status: &'static str,
        error: String,
    },
}

impl InvokeResponse {
    fn error(message: impl ToString) -> Self {
        InvokeResponse::Error {
            status: "error",
            error: message.to_string(),
        }
    }
}

async fn invoke(
    State(state): State<AppState>,
    Json(request): Json<InvokeRequest>,
) -> Json<InvokeResponse> {
    let rows = match table::parse_input(&request.input_csv) {
        Ok(rows) => rows,
        Err(e) => return Json(InvokeResponse::error(e)),
    };

    let scheduler = BatchScheduler::new(state.services.clone(), request.max_concurrent_rows);
    let records = scheduler.process(rows).await;

    match table::write_output(&records) {
        Ok(output_csv) => Json(InvokeResponse::Success {
            status: "success",
            rows_processed: records.len(),
            output_csv,
        }),
        Err(e) => Json(InvokeResponse::error(e)),
    }
}

#[derive(Deserialize)]
struct EnrichRequest {
    vendor_name: String,
    #[serde(default)]
    vendor_url: String,
    #[serde(default)]
    product_name: String,
    #[serde(default)]
    product_url: String,
}

async fn enrich(
    State(state): State<AppState>,
    Json(request): Json<EnrichRequest>,
) -> Json<SingleEnrichment> {
    let result = enrich_single(
        &state.services,
        &request.vendor_name,
        &request.vendor_url,
        &request.product_name,
        &request.product_url,
    )
    .await;
    Json(result)
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let stats = state.services.cache.stats().await;
    Json(serde_json::json!({
        "status": "ok",
        "cache": {
            "size": stats.size,
            "hits": stats.hits,
            "misses": stats.misses,
        },
        "catalog": {
            "taxonomy": state.services.catalog.taxonomy.len(),
            "attributes": state.services.catalog.attributes.len(),
        },
    }))
}

pub fn router(services: Services) -> Router {
    Router::new()
        .route("/invoke", post(invoke))
        .route("/enrich", post(enrich))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { services })
}

pub async fn serve(services: Services, port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("enrichment service listening on {addr}");
    axum::serve(listener, router(services)).await?;
    Ok(())
}
