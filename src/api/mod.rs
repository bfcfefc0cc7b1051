//! Liveness and metrics endpoints.
//!
//! `/healthz` confirms the inbound subscription still exists; process
//! orchestration uses it to decide whether to restart the relay after a
//! queue failure. Not part of the delivery pipeline's own correctness.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::metrics::encode_metrics;
use crate::queue::QueueTransport;

/// Bound on the subscription check; a hung queue connection must not make
/// the probe hang with it.
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct AppState {
    pub transport: Arc<dyn QueueTransport>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(transport: Arc<dyn QueueTransport>) -> Self {
        Self {
            transport,
            start_time: Instant::now(),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    uptime_seconds: u64,
}

/// Checks whether we can confirm that our subscription still exists.
async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    tracing::debug!("healthz: checking that subscription exists");

    let exists = tokio::time::timeout(PROBE_TIMEOUT, state.transport.subscription_exists()).await;

    let healthy = match exists {
        Ok(Ok(true)) => true,
        Ok(Ok(false)) => {
            tracing::error!("healthz: subscription no longer exists");
            false
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, "healthz: subscription check failed");
            false
        }
        Err(_) => {
            tracing::error!("healthz: subscription check timed out");
            false
        }
    };

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthResponse {
            status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: state.start_time.elapsed().as_secs(),
        }),
    )
}

async fn metrics() -> impl IntoResponse {
    match encode_metrics() {
        Ok(text) => (StatusCode::OK, text).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
