use async_trait::async_trait;
use uuid::Uuid;
use viaro_core::ReservationError;
use viaro_trip::{Trip, TripFilter};

use crate::booking::{Booking, BookingStatus};
use crate::delay::DelayRecord;

/// Trip persistence. `update_trip` is the serialization point: it commits
/// atomically only when the stored version still equals `expected_version`,
/// bumping the version by one. Everything else about per-trip isolation
/// falls out of that single rule.
#[async_trait]
pub trait TripStore: Send + Sync {
    async fn insert_trip(&self, trip: &Trip) -> Result<(), StoreError>;

    async fn get_trip(&self, id: &str) -> Result<Trip, StoreError>;

    async fn list_trips(&self, filter: &TripFilter, limit: usize) -> Result<Vec<Trip>, StoreError>;

    /// Ids of every known trip, for housekeeping passes.
    async fn list_trip_ids(&self) -> Result<Vec<String>, StoreError>;

    async fn update_trip(&self, trip: &Trip, expected_version: u64) -> Result<(), StoreError>;
}

/// Booking persistence. The status guard on `update_booking` keeps racing
/// cancels from both writing a cancellation record.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn insert_booking(&self, booking: &Booking) -> Result<(), StoreError>;

    async fn get_booking(&self, id: Uuid) -> Result<Booking, StoreError>;

    /// Overwrite `booking` only while its stored status is still
    /// `expect_status`; otherwise fail with [`StoreError::StateConflict`].
    async fn update_booking(
        &self,
        booking: &Booking,
        expect_status: BookingStatus,
    ) -> Result<(), StoreError>;

    async fn list_bookings_for_user(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<Booking>, StoreError>;

    async fn list_bookings(&self, limit: usize) -> Result<Vec<Booking>, StoreError>;
}

/// The delay journal: append new records, retire superseded ones.
#[async_trait]
pub trait DelayLedger: Send + Sync {
    async fn append(&self, record: &DelayRecord) -> Result<(), StoreError>;

    async fn deactivate(&self, id: Uuid) -> Result<(), StoreError>;

    /// Most recent first.
    async fn list_recent(&self, limit: usize) -> Result<Vec<DelayRecord>, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Trip not found: {0}")]
    TripNotFound(String),

    #[error("Trip already exists: {0}")]
    DuplicateTrip(String),

    #[error("Booking not found: {0}")]
    BookingNotFound(Uuid),

    #[error("Stale version for trip {0}")]
    VersionConflict(String),

    #[error("Booking {0} is not in the expected state")]
    StateConflict(Uuid),

    #[error("Backend failure: {0}")]
    Backend(String),
}

impl From<StoreError> for ReservationError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::TripNotFound(id) => ReservationError::TripNotFound(id),
            StoreError::DuplicateTrip(id) => ReservationError::DuplicateTrip(id),
            StoreError::BookingNotFound(id) => ReservationError::BookingNotFound(id),
            // A conflict that escapes the engine's retry loop means the trip
            // is too contended right now, not that the request was wrong.
            StoreError::VersionConflict(id) => ReservationError::Contended(id),
            StoreError::StateConflict(_) => ReservationError::AlreadyCancelled,
            StoreError::Backend(msg) => ReservationError::Storage(msg),
        }
    }
}
