use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use viaro_core::identity::Caller;
use viaro_reservation::{Booking, DelayRecord, DelayRequest};

use crate::error::AppError;
use crate::state::AppState;
use crate::trips::TripResponse;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct DelayTripRequest {
    pub delay_minutes: u32,
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct DelayTripResponse {
    pub trip: TripResponse,
    pub record: DelayRecord,
}

#[derive(Debug, Serialize)]
pub struct ReleaseHoldsResponse {
    pub trip_id: String,
    pub released: u32,
}

// ============================================================================
// Handlers
// ============================================================================

/// PUT /v1/trips/{id}/delay (admin)
///
/// Re-applying a delay replaces the previous one; the shift is always
/// computed from the original schedule.
pub async fn delay_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<String>,
    Extension(caller): Extension<Caller>,
    Json(req): Json<DelayTripRequest>,
) -> Result<Json<DelayTripResponse>, AppError> {
    let result = state
        .engine
        .apply_delay(
            &caller,
            DelayRequest {
                trip_id,
                delay_minutes: req.delay_minutes,
                reason: req.reason,
            },
        )
        .await;
    state.metrics.observe("apply_delay", &result);
    let (trip, record) = result?;
    Ok(Json(DelayTripResponse {
        trip: TripResponse::from_trip(&trip),
        record,
    }))
}

/// DELETE /v1/trips/{id}/delay (admin)
pub async fn clear_trip_delay(
    State(state): State<AppState>,
    Path(trip_id): Path<String>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<TripResponse>, AppError> {
    let result = state.engine.clear_delay(&caller, &trip_id).await;
    state.metrics.observe("clear_delay", &result);
    let trip = result?;
    Ok(Json(TripResponse::from_trip(&trip)))
}

/// GET /v1/admin/delays (admin)
pub async fn delay_history(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Vec<DelayRecord>>, AppError> {
    let records = state.engine.delay_history(&caller).await?;
    Ok(Json(records))
}

/// GET /v1/admin/bookings (admin)
pub async fn all_bookings(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let bookings = state.engine.all_bookings(&caller).await?;
    Ok(Json(bookings))
}

/// POST /v1/admin/trips/{id}/release-holds (admin)
///
/// Manual trigger for the same sweep the background worker runs.
pub async fn release_holds(
    State(state): State<AppState>,
    Path(trip_id): Path<String>,
) -> Result<Json<ReleaseHoldsResponse>, AppError> {
    let result = state.engine.release_expired_holds(&trip_id).await;
    state.metrics.observe("release_holds", &result);
    let released = result?;
    state.metrics.add_released_holds(released);
    Ok(Json(ReleaseHoldsResponse { trip_id, released }))
}
