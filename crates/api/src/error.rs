//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use calendar::CalendarError;
use reservations::ReservationError;
use settlement::SettlementError;
use store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Reservation flow error.
    Reservation(ReservationError),
    /// Settlement flow error.
    Settlement(SettlementError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(msg) => simple(StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => simple(StatusCode::BAD_REQUEST, msg),
            ApiError::Reservation(err) => reservation_response(err),
            ApiError::Settlement(err) => settlement_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                simple(StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        }
    }
}

fn simple(status: StatusCode, message: String) -> Response {
    let body = serde_json::json!({ "error": message });
    (status, axum::Json(body)).into_response()
}

fn calendar_response(err: CalendarError) -> Response {
    match err {
        CalendarError::UnknownItem(_) => simple(StatusCode::NOT_FOUND, err.to_string()),
        CalendarError::Conflict { ref conflicts } => {
            let body = serde_json::json!({
                "error": err.to_string(),
                "conflicts": conflicts
                    .iter()
                    .map(|r| serde_json::json!({
                        "start_date": r.start().to_string(),
                        "end_date": r.end().to_string(),
                    }))
                    .collect::<Vec<_>>(),
            });
            (StatusCode::CONFLICT, axum::Json(body)).into_response()
        }
        CalendarError::Blackout { .. } => simple(StatusCode::CONFLICT, err.to_string()),
        CalendarError::BelowMinimum { .. } => simple(StatusCode::BAD_REQUEST, err.to_string()),
        CalendarError::Store(e) => store_response(e),
    }
}

fn store_response(err: StoreError) -> Response {
    match err {
        StoreError::VersionConflict { .. } | StoreError::RangeConflict { .. } => {
            simple(StatusCode::CONFLICT, err.to_string())
        }
        StoreError::NotFound(_) => simple(StatusCode::NOT_FOUND, err.to_string()),
        other => {
            tracing::error!(error = %other, "store error");
            simple(StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
        }
    }
}

fn reservation_response(err: ReservationError) -> Response {
    match err {
        ReservationError::Validation(_) | ReservationError::Pricing(_) => {
            simple(StatusCode::BAD_REQUEST, err.to_string())
        }
        ReservationError::RateLimited { retry_after_secs } => (
            StatusCode::TOO_MANY_REQUESTS,
            [(axum::http::header::RETRY_AFTER, retry_after_secs.to_string())],
            axum::Json(serde_json::json!({ "error": err.to_string() })),
        )
            .into_response(),
        ReservationError::Calendar(e) => calendar_response(e),
        ReservationError::Gateway { booking_id, .. } => {
            // The reservation survived; tell the client how to follow up.
            let body = serde_json::json!({
                "error": "payment could not be started",
                "booking_id": booking_id.to_string(),
                "message": "Your dates are held. Our concierge team will reach out \
                            shortly to complete payment, or you can retry.",
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(body)).into_response()
        }
        ReservationError::NotFound(id) => {
            simple(StatusCode::NOT_FOUND, format!("booking not found: {id}"))
        }
        ReservationError::State(e) => simple(StatusCode::CONFLICT, e.to_string()),
        ReservationError::Store(e) => store_response(e),
    }
}

fn settlement_response(err: SettlementError) -> Response {
    match err {
        SettlementError::BadSignature | SettlementError::Malformed(_) => {
            simple(StatusCode::BAD_REQUEST, err.to_string())
        }
        SettlementError::UnverifiedEvent(_) => simple(StatusCode::BAD_REQUEST, err.to_string()),
        SettlementError::Gateway(e) => {
            tracing::error!(error = %e, "gateway unreachable during verification");
            simple(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
        SettlementError::Store(e) => store_response(e),
    }
}

impl From<ReservationError> for ApiError {
    fn from(err: ReservationError) -> Self {
        ApiError::Reservation(err)
    }
}

impl From<SettlementError> for ApiError {
    fn from(err: SettlementError) -> Self {
        ApiError::Settlement(err)
    }
}

impl From<CalendarError> for ApiError {
    fn from(err: CalendarError) -> Self {
        ApiError::Reservation(ReservationError::Calendar(err))
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Reservation(ReservationError::Store(err))
    }
}
