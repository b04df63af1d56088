//! Availability query endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use calendar::CalendarError;
use common::ItemId;
use domain::DateRange;
use serde::{Deserialize, Serialize};
use store::Store;

use crate::error::ApiError;
use crate::routes::bookings::AppState;

#[derive(Deserialize)]
pub struct AvailabilityRequest {
    #[serde(default)]
    pub item_id: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
}

#[derive(Serialize)]
pub struct RangeResponse {
    pub start_date: String,
    pub end_date: String,
}

impl RangeResponse {
    fn from_range(range: &DateRange) -> Self {
        Self {
            start_date: range.start().to_string(),
            end_date: range.end().to_string(),
        }
    }
}

#[derive(Serialize)]
pub struct AvailabilityResponse {
    pub available: bool,
    pub conflicts: Vec<RangeResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blackout_reason: Option<String>,
}

/// POST /availability/check — advisory check whether a range is open.
///
/// Unavailability is a 200 with `available: false`; only malformed
/// requests and unknown items are errors. A range shorter than the
/// item's minimum stay reports no conflicts, just `available: false`.
#[tracing::instrument(skip(state, req), fields(item_id = %req.item_id))]
pub async fn check<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<AvailabilityRequest>,
) -> Result<Json<AvailabilityResponse>, ApiError> {
    let start = req
        .start_date
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid start_date: {}", req.start_date)))?;
    let end = req
        .end_date
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid end_date: {}", req.end_date)))?;
    let range = DateRange::new(start, end).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let item_id = ItemId::new(req.item_id.as_str());
    let response = match state.calendar.check(&item_id, range).await {
        Ok(()) => AvailabilityResponse {
            available: true,
            conflicts: Vec::new(),
            blackout_reason: None,
        },
        Err(CalendarError::Conflict { conflicts }) => AvailabilityResponse {
            available: false,
            conflicts: conflicts.iter().map(RangeResponse::from_range).collect(),
            blackout_reason: None,
        },
        Err(CalendarError::Blackout { requested, blackout }) => AvailabilityResponse {
            available: false,
            conflicts: vec![RangeResponse::from_range(&blackout)],
            blackout_reason: Some(CalendarError::Blackout { requested, blackout }.to_string()),
        },
        Err(CalendarError::BelowMinimum { .. }) => AvailabilityResponse {
            available: false,
            conflicts: Vec::new(),
            blackout_reason: None,
        },
        Err(e) => return Err(e.into()),
    };
    Ok(Json(response))
}
