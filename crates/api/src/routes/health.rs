//! Health and readiness endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::Utc;
use serde::Serialize;
use store::{NotificationJobStore, Store};

use crate::routes::bookings::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Reachability of the durable store backing bookings, holds and the
    /// notification retry queue.
    pub store: &'static str,
}

/// GET /health — liveness plus a store round-trip.
///
/// The retry-queue poll doubles as the readiness probe: it touches the
/// same store the booking flow and both background workers run against.
pub async fn check<S: Store>(
    State(state): State<Arc<AppState<S>>>,
) -> (StatusCode, Json<HealthResponse>) {
    match state.store.due_jobs(Utc::now(), 1).await {
        Ok(_) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                store: "ok",
            }),
        ),
        Err(e) => {
            tracing::error!(error = %e, "health probe could not reach the store");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "degraded",
                    store: "unreachable",
                }),
            )
        }
    }
}
