//! HTTP Server module
//!
//! Wires the API router to the Airtable client, adds request logging and
//! serves until a termination signal arrives.

use crate::airtable::{AirtableClient, RecordStore};
use crate::api::{create_api_router, ApiState};
use crate::config::SharedConfig;
use crate::selection::{RandomSource, ThreadRandom};
use axum::{
    body::Body,
    http::{HeaderValue, Request, Response},
    middleware::{self, Next},
    Router,
};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Header carrying the per-request identifier
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request timing and logging middleware
pub async fn request_logging(req: Request<Body>, next: Next) -> Response<Body> {
    let start = Instant::now();
    let request_id = uuid::Uuid::new_v4().to_string();
    let method = req.method().to_string();
    let path = req.uri().path().to_string();

    let mut response = next.run(req).await;

    let latency = start.elapsed().as_secs_f64() * 1000.0;
    let status = response.status().as_u16();

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    // Probes hit /healthz constantly
    if path == "/healthz" {
        tracing::debug!(
            request_id = %request_id,
            method = %method,
            path = %path,
            status = %status,
            latency_ms = %latency,
            "Request processed"
        );
    } else {
        tracing::info!(
            request_id = %request_id,
            method = %method,
            path = %path,
            status = %status,
            latency_ms = %latency,
            "Request processed"
        );
    }

    response
}

/// Create the main server router
pub fn create_server_router<S: RecordStore>(
    config: SharedConfig,
    store: S,
    random: Arc<dyn RandomSource>,
) -> Router {
    let api_state = Arc::new(ApiState::new(config, store, random));

    create_api_router(api_state)
        .layer(middleware::from_fn(request_logging))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Start the HTTP server
pub async fn start_server(config: SharedConfig) -> anyhow::Result<()> {
    let app_config = config.get();
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);

    if let Err(e) = app_config.airtable.table() {
        tracing::warn!(error = %e, "Airtable is not fully configured; data endpoints will fail");
    }

    let client = AirtableClient::new(&app_config.airtable.api_url)?;
    let app = create_server_router(config.clone(), client, Arc::new(ThreadRandom));

    tracing::info!(
        addr = %addr,
        table = %app_config.airtable.table_name,
        "Starting HTTP server"
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining in-flight requests");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::airtable::mock::{sample_records, MockStore};
    use crate::config::AppConfig;
    use crate::selection::FixedRandom;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn create_test_app(store: MockStore) -> Router {
        let mut config = AppConfig::default();
        config.airtable.token = Some("pat".to_string());
        config.airtable.base_id = Some("appBase".to_string());
        create_server_router(SharedConfig::new(config), store, Arc::new(FixedRandom(0.0)))
    }

    async fn body_json(response: Response<Body>) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = create_test_app(MockStore::new());

        let request = Request::builder()
            .uri("/healthz")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));

        let body = body_json(response).await;
        assert_eq!(body["status"], "healthy");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_version_endpoint() {
        let app = create_test_app(MockStore::new());

        let request = Request::builder()
            .uri("/version")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["service"], "airtable-roulette");
        assert!(body["version"].is_string());
    }

    #[tokio::test]
    async fn test_unknown_path_is_json_404() {
        let app = create_test_app(MockStore::new());

        let request = Request::builder()
            .uri("/nope")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Not found");
        assert_eq!(body["details"], "/nope");
    }

    #[tokio::test]
    async fn test_delete_random_requires_post() {
        let store = MockStore::with_records(sample_records(2));
        let app = create_test_app(store.clone());

        let request = Request::builder()
            .uri("/delete-random")
            .method("GET")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert!(store.calls().is_empty());
    }
}
