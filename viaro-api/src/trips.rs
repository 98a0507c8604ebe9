use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use viaro_core::identity::Caller;
use viaro_reservation::AvailabilityView;
use viaro_trip::{Route, Schedule, Trip, TripDraft, TripFilter, TripStatus};

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// Response Types
// ============================================================================

/// Public view of a trip. The seat ledger never leaves the engine; clients
/// that need seat-level detail use the availability endpoint.
#[derive(Debug, Serialize)]
pub struct TripResponse {
    pub id: String,
    pub operator: String,
    pub vehicle_number: String,
    pub route: Route,
    pub schedule: Schedule,
    pub status: TripStatus,
    pub capacity: u32,
    pub available_seats: u32,
    pub fare: i64,
    pub delay_minutes: Option<u32>,
    pub delay_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TripResponse {
    pub(crate) fn from_trip(trip: &Trip) -> Self {
        Self {
            id: trip.id.clone(),
            operator: trip.operator.clone(),
            vehicle_number: trip.vehicle_number.clone(),
            route: trip.route.clone(),
            schedule: trip.schedule.clone(),
            status: trip.status(),
            capacity: trip.capacity,
            available_seats: trip.available_seats(),
            fare: trip.fare,
            delay_minutes: trip.delay.as_ref().map(|d| d.delay_minutes),
            delay_reason: trip.delay.as_ref().map(|d| d.reason.clone()),
            created_at: trip.created_at,
            updated_at: trip.updated_at,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /v1/trips (admin)
pub async fn create_trip(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(draft): Json<TripDraft>,
) -> Result<Json<TripResponse>, AppError> {
    let result = state.engine.create_trip(&caller, draft).await;
    state.metrics.observe("create_trip", &result);
    let trip = result?;
    Ok(Json(TripResponse::from_trip(&trip)))
}

/// GET /v1/trips
///
/// Filters are optional and combine with AND semantics. `date` matches the
/// UTC calendar day of departure.
pub async fn search_trips(
    State(state): State<AppState>,
    Query(filter): Query<TripFilter>,
) -> Result<Json<Vec<TripResponse>>, AppError> {
    let trips = state.engine.search_trips(&filter).await?;
    Ok(Json(trips.iter().map(TripResponse::from_trip).collect()))
}

/// GET /v1/trips/{id}
pub async fn get_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<String>,
) -> Result<Json<TripResponse>, AppError> {
    let trip = state.engine.get_trip(&trip_id).await?;
    Ok(Json(TripResponse::from_trip(&trip)))
}

/// GET /v1/trips/{id}/availability
pub async fn get_availability(
    State(state): State<AppState>,
    Path(trip_id): Path<String>,
) -> Result<Json<AvailabilityView>, AppError> {
    let view = state.engine.availability(&trip_id).await?;
    Ok(Json(view))
}
