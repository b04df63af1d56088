//! Payment gateway callback endpoints.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use settlement::Outcome;
use store::Store;

use crate::error::ApiError;
use crate::routes::bookings::AppState;

/// Header carrying the gateway's HMAC signature over the raw body.
pub const SIGNATURE_HEADER: &str = "x-gateway-signature";

/// Acknowledgement body. Anything the processor accepted, replay or
/// not, is a 200 with `received: true` so the gateway stops retrying.
fn ack(outcome: Outcome, verified: Option<bool>) -> Json<serde_json::Value> {
    let mut body = match outcome {
        Outcome::Applied(status) => serde_json::json!({
            "received": true,
            "outcome": "applied",
            "status": status.as_str(),
        }),
        Outcome::Replayed => serde_json::json!({ "received": true, "outcome": "replayed" }),
        Outcome::Ignored => serde_json::json!({ "received": true, "outcome": "ignored" }),
    };
    if let Some(verified) = verified {
        body["verified"] = verified.into();
    }
    Json(body)
}

/// POST /webhooks/payment — signed webhook delivery.
#[tracing::instrument(skip(state, headers, body))]
pub async fn payment<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::BadRequest(format!("missing {SIGNATURE_HEADER} header")))?;

    let outcome = state.processor.process_webhook(&body, signature).await?;
    Ok(ack(outcome, None))
}

/// POST /ipn/payment — unsigned, form-encoded IPN delivery, verified
/// against the gateway before anything is applied.
#[tracing::instrument(skip(state, body))]
pub async fn ipn<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    let outcome = state.processor.process_ipn(&body).await?;
    Ok(ack(outcome, Some(true)))
}
