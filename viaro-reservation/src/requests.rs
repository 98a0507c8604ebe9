use uuid::Uuid;
use viaro_core::payment::PaymentRecord;
use viaro_core::{ReservationError, ReservationResult};

use crate::booking::ContactDetails;

pub const MIN_DELAY_MINUTES: u32 = 1;
pub const MAX_DELAY_MINUTES: u32 = 480;
pub const MIN_DELAY_REASON_CHARS: usize = 3;
pub const MIN_CANCEL_REASON_CHARS: usize = 5;

/// Ask for a temporary claim on specific seats of one trip.
#[derive(Debug, Clone)]
pub struct HoldRequest {
    pub trip_id: String,
    pub seats: Vec<String>,
}

/// Turn held (or still free) seats into a paid booking.
#[derive(Debug, Clone)]
pub struct ConfirmRequest {
    pub trip_id: String,
    pub seats: Vec<String>,
    pub payment: PaymentRecord,
    pub contact: Option<ContactDetails>,
}

#[derive(Debug, Clone)]
pub struct CancelRequest {
    pub booking_id: Uuid,
    pub reason: String,
}

impl CancelRequest {
    pub fn validate(&self) -> ReservationResult<String> {
        let reason = self.reason.trim();
        if reason.len() < MIN_CANCEL_REASON_CHARS {
            return Err(ReservationError::Validation(format!(
                "cancellation reason must be at least {MIN_CANCEL_REASON_CHARS} characters"
            )));
        }
        Ok(reason.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct DelayRequest {
    pub trip_id: String,
    pub delay_minutes: u32,
    pub reason: String,
}

impl DelayRequest {
    pub fn validate(&self) -> ReservationResult<(u32, String)> {
        if !(MIN_DELAY_MINUTES..=MAX_DELAY_MINUTES).contains(&self.delay_minutes) {
            return Err(ReservationError::Validation(format!(
                "delay_minutes must be between {MIN_DELAY_MINUTES} and {MAX_DELAY_MINUTES}"
            )));
        }
        let reason = self.reason.trim();
        if reason.len() < MIN_DELAY_REASON_CHARS {
            return Err(ReservationError::Validation(format!(
                "delay reason must be at least {MIN_DELAY_REASON_CHARS} characters"
            )));
        }
        Ok((self.delay_minutes, reason.to_string()))
    }
}

/// Shared seat-list hygiene: non-empty, no blank ids, no duplicates.
/// Returns the trimmed list in request order.
pub(crate) fn validate_seats(seats: &[String]) -> ReservationResult<Vec<String>> {
    if seats.is_empty() {
        return Err(ReservationError::Validation(
            "at least one seat is required".to_string(),
        ));
    }
    let mut cleaned: Vec<String> = Vec::with_capacity(seats.len());
    for raw in seats {
        let seat = raw.trim();
        if seat.is_empty() {
            return Err(ReservationError::Validation(
                "seat ids must not be blank".to_string(),
            ));
        }
        if cleaned.iter().any(|existing| existing == seat) {
            return Err(ReservationError::Validation(format!(
                "seat {seat} appears twice in the request"
            )));
        }
        cleaned.push(seat.to_string());
    }
    Ok(cleaned)
}
