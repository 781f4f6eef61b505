//! HTTP API module
//!
//! Routes for health, version, listing records and deleting a random record.

use crate::airtable::RecordStore;
use crate::config::SharedConfig;
use crate::error::{ErrorBody, ServiceError};
use crate::records::{self, DeletionReport, RecordListing};
use crate::selection::RandomSource;
use axum::{
    extract::State,
    http::{StatusCode, Uri},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// API state shared across handlers
pub struct ApiState<S> {
    pub config: SharedConfig,
    pub store: S,
    pub random: Arc<dyn RandomSource>,
}

impl<S: RecordStore> ApiState<S> {
    pub fn new(config: SharedConfig, store: S, random: Arc<dyn RandomSource>) -> Self {
        Self {
            config,
            store,
            random,
        }
    }
}

/// Create the API router
pub fn create_api_router<S: RecordStore>(state: Arc<ApiState<S>>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/version", get(version))
        .route("/records", get(list_records::<S>))
        .route("/delete-random", post(delete_random::<S>))
        .fallback(not_found)
        .with_state(state)
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

/// Health check endpoint
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
    })
}

/// Version response
#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub version: String,
    pub service: String,
}

async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
    })
}

/// List the first few records of the configured table
async fn list_records<S: RecordStore>(
    State(state): State<Arc<ApiState<S>>>,
) -> Result<Json<RecordListing>, ServiceError> {
    let listing = records::list_records(&state.store, &state.config.get().airtable).await?;
    Ok(Json(listing))
}

/// Delete one randomly selected record
async fn delete_random<S: RecordStore>(
    State(state): State<Arc<ApiState<S>>>,
) -> Result<Json<DeletionReport>, ServiceError> {
    let report = records::delete_random(
        &state.store,
        &state.config.get().airtable,
        state.random.as_ref(),
    )
    .await?;
    Ok(Json(report))
}

async fn not_found(uri: Uri) -> impl IntoResponse {
    let body = ErrorBody::new("Not found").with_details(uri.path());
    (StatusCode::NOT_FOUND, Json(body))
}
