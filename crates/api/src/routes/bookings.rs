//! Reservation and booking lifecycle endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use calendar::AvailabilityCalendar;
use chrono::{DateTime, Utc};
use common::BookingId;
use domain::{Booking, PriceBreakdown};
use reservations::{BookingOrchestrator, ReservationRequest};
use serde::{Deserialize, Serialize};
use settlement::PaymentEventProcessor;
use store::Store;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store> {
    pub orchestrator: BookingOrchestrator<S>,
    pub calendar: Arc<AvailabilityCalendar<S>>,
    pub processor: PaymentEventProcessor<S>,
    pub store: S,
}

// -- Request types --

#[derive(Deserialize)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct BookingResponse {
    pub booking_id: String,
    pub item_id: String,
    pub start_date: String,
    pub end_date: String,
    pub status: String,
    pub disputed: bool,
    pub payment_intent_ref: Option<String>,
    pub pricing: PriceBreakdown,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BookingResponse {
    fn from_booking(booking: &Booking) -> Self {
        Self {
            booking_id: booking.id().to_string(),
            item_id: booking.item_id().to_string(),
            start_date: booking.range().start().to_string(),
            end_date: booking.range().end().to_string(),
            status: booking.status().as_str().to_string(),
            disputed: booking.is_disputed(),
            payment_intent_ref: booking.payment_intent_ref().map(str::to_string),
            pricing: booking.pricing().clone(),
            created_at: booking.created_at(),
            updated_at: booking.updated_at(),
        }
    }
}

#[derive(Serialize)]
pub struct ReservationResponse {
    #[serde(flatten)]
    pub booking: BookingResponse,
    pub hold_expires_at: DateTime<Utc>,
    pub payment: PaymentResponse,
}

#[derive(Serialize)]
pub struct PaymentResponse {
    pub intent_ref: String,
    pub client_secret: String,
}

fn parse_booking_id(id: &str) -> Result<BookingId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("invalid booking id: {e}")))?;
    Ok(BookingId::from_uuid(uuid))
}

// -- Handlers --

/// POST /bookings — run the reservation flow.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<ReservationRequest>,
) -> Result<Json<ReservationResponse>, ApiError> {
    let rate_key = if req.email.trim().is_empty() {
        "anonymous".to_string()
    } else {
        req.email.trim().to_lowercase()
    };

    let reservation = state.orchestrator.reserve(&req, &rate_key).await?;

    let response = ReservationResponse {
        booking: BookingResponse::from_booking(&reservation.booking),
        hold_expires_at: reservation.hold.expires_at,
        payment: PaymentResponse {
            intent_ref: reservation.payment.intent_ref,
            client_secret: reservation.payment.client_secret,
        },
    };
    Ok(Json(response))
}

/// GET /bookings/:id — load a booking.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, ApiError> {
    let booking_id = parse_booking_id(&id)?;
    let booking = state.orchestrator.get(booking_id).await?;
    Ok(Json(BookingResponse::from_booking(&booking)))
}

/// POST /bookings/:id/cancel — manual cancellation.
#[tracing::instrument(skip(state, req))]
pub async fn cancel<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<CancelRequest>,
) -> Result<Json<BookingResponse>, ApiError> {
    let booking_id = parse_booking_id(&id)?;
    let reason = req.reason.as_deref().unwrap_or("cancelled by customer");
    let booking = state.orchestrator.cancel(booking_id, reason).await?;
    Ok(Json(BookingResponse::from_booking(&booking)))
}
