use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;
use viaro_core::identity::Caller;
use viaro_core::payment::PaymentRecord;
use viaro_reservation::{
    Booking, CancelRequest, ConfirmRequest, ContactDetails, HoldReceipt, HoldRequest,
};

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct HoldSeatsRequest {
    pub seats: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct BookSeatsRequest {
    pub seats: Vec<String>,
    pub payment: PaymentRecord,
    pub contact: Option<ContactDetails>,
}

#[derive(Debug, Deserialize)]
pub struct CancelBookingRequest {
    pub reason: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /v1/trips/{id}/hold
///
/// Replaces any earlier holds the caller had on this trip; the receipt
/// carries the shared expiry deadline for the new set.
pub async fn hold_seats(
    State(state): State<AppState>,
    Path(trip_id): Path<String>,
    Extension(caller): Extension<Caller>,
    Json(req): Json<HoldSeatsRequest>,
) -> Result<Json<HoldReceipt>, AppError> {
    let result = state
        .engine
        .hold(
            &caller,
            HoldRequest {
                trip_id,
                seats: req.seats,
            },
        )
        .await;
    state.metrics.observe("hold", &result);
    Ok(Json(result?))
}

/// POST /v1/trips/{id}/book
pub async fn book_seats(
    State(state): State<AppState>,
    Path(trip_id): Path<String>,
    Extension(caller): Extension<Caller>,
    Json(req): Json<BookSeatsRequest>,
) -> Result<Json<Booking>, AppError> {
    let result = state
        .engine
        .confirm(
            &caller,
            ConfirmRequest {
                trip_id,
                seats: req.seats,
                payment: req.payment,
                contact: req.contact,
            },
        )
        .await;
    state.metrics.observe("book", &result);
    Ok(Json(result?))
}

/// POST /v1/bookings/{id}/cancel
pub async fn cancel_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    Extension(caller): Extension<Caller>,
    Json(req): Json<CancelBookingRequest>,
) -> Result<Json<Booking>, AppError> {
    let result = state
        .engine
        .cancel(
            &caller,
            CancelRequest {
                booking_id,
                reason: req.reason,
            },
        )
        .await;
    state.metrics.observe("cancel", &result);
    Ok(Json(result?))
}

/// GET /v1/bookings/{id}/ticket
///
/// The booking embeds its schedule snapshot, which is the ticket: seats,
/// route and departure as sold, regardless of later delays.
pub async fn get_ticket(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Booking>, AppError> {
    let booking = state.engine.ticket(&caller, booking_id).await?;
    Ok(Json(booking))
}

/// GET /v1/me/bookings
pub async fn my_bookings(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let bookings = state.engine.my_bookings(&caller).await?;
    Ok(Json(bookings))
}
