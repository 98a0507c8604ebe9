use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;
use viaro_trip::{Trip, TripFilter};

use crate::booking::{Booking, BookingStatus};
use crate::delay::DelayRecord;
use crate::repository::{BookingStore, DelayLedger, StoreError, TripStore};

/// HashMap-backed store. This is the real default backend for single-node
/// deployments, not just a test double; the version check in `update_trip`
/// gives it the same isolation contract as the SQL store.
#[derive(Default)]
pub struct MemoryStore {
    trips: RwLock<HashMap<String, Trip>>,
    bookings: RwLock<HashMap<Uuid, Booking>>,
    delays: RwLock<Vec<DelayRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TripStore for MemoryStore {
    async fn insert_trip(&self, trip: &Trip) -> Result<(), StoreError> {
        let mut trips = self.trips.write().await;
        if trips.contains_key(&trip.id) {
            return Err(StoreError::DuplicateTrip(trip.id.clone()));
        }
        trips.insert(trip.id.clone(), trip.clone());
        Ok(())
    }

    async fn get_trip(&self, id: &str) -> Result<Trip, StoreError> {
        self.trips
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::TripNotFound(id.to_string()))
    }

    async fn list_trips(&self, filter: &TripFilter, limit: usize) -> Result<Vec<Trip>, StoreError> {
        let trips = self.trips.read().await;
        let mut matched: Vec<Trip> = trips
            .values()
            .filter(|trip| filter.matches(trip))
            .cloned()
            .collect();
        matched.sort_by_key(|trip| trip.schedule.departure);
        matched.truncate(limit);
        Ok(matched)
    }

    async fn list_trip_ids(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.trips.read().await.keys().cloned().collect())
    }

    async fn update_trip(&self, trip: &Trip, expected_version: u64) -> Result<(), StoreError> {
        let mut trips = self.trips.write().await;
        let stored = trips
            .get_mut(&trip.id)
            .ok_or_else(|| StoreError::TripNotFound(trip.id.clone()))?;
        if stored.version != expected_version {
            return Err(StoreError::VersionConflict(trip.id.clone()));
        }
        let mut committed = trip.clone();
        committed.version = expected_version + 1;
        *stored = committed;
        Ok(())
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn insert_booking(&self, booking: &Booking) -> Result<(), StoreError> {
        let mut bookings = self.bookings.write().await;
        if bookings.contains_key(&booking.id) {
            return Err(StoreError::Backend(format!(
                "booking id collision: {}",
                booking.id
            )));
        }
        bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn get_booking(&self, id: Uuid) -> Result<Booking, StoreError> {
        self.bookings
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(StoreError::BookingNotFound(id))
    }

    async fn update_booking(
        &self,
        booking: &Booking,
        expect_status: BookingStatus,
    ) -> Result<(), StoreError> {
        let mut bookings = self.bookings.write().await;
        let stored = bookings
            .get_mut(&booking.id)
            .ok_or(StoreError::BookingNotFound(booking.id))?;
        if stored.status != expect_status {
            return Err(StoreError::StateConflict(booking.id));
        }
        *stored = booking.clone();
        Ok(())
    }

    async fn list_bookings_for_user(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<Booking>, StoreError> {
        let bookings = self.bookings.read().await;
        let mut mine: Vec<Booking> = bookings
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        mine.truncate(limit);
        Ok(mine)
    }

    async fn list_bookings(&self, limit: usize) -> Result<Vec<Booking>, StoreError> {
        let bookings = self.bookings.read().await;
        let mut all: Vec<Booking> = bookings.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all.truncate(limit);
        Ok(all)
    }
}

#[async_trait]
impl DelayLedger for MemoryStore {
    async fn append(&self, record: &DelayRecord) -> Result<(), StoreError> {
        self.delays.write().await.push(record.clone());
        Ok(())
    }

    async fn deactivate(&self, id: Uuid) -> Result<(), StoreError> {
        let mut delays = self.delays.write().await;
        if let Some(record) = delays.iter_mut().find(|r| r.id == id) {
            record.is_active = false;
        }
        Ok(())
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<DelayRecord>, StoreError> {
        let delays = self.delays.read().await;
        Ok(delays.iter().rev().take(limit).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use viaro_trip::TripDraft;

    fn trip(id: &str) -> Trip {
        let now = Utc::now();
        TripDraft {
            id: Some(id.to_string()),
            operator: "Northline".to_string(),
            vehicle_number: "NL-204".to_string(),
            origin: "Hamburg".to_string(),
            destination: "Berlin".to_string(),
            departure: now + Duration::hours(24),
            arrival: now + Duration::hours(28),
            fare: 2400,
            capacity: 40,
        }
        .into_trip(now)
        .unwrap()
    }

    #[tokio::test]
    async fn test_stale_writer_loses() {
        let store = MemoryStore::new();
        store.insert_trip(&trip("TRP-cas")).await.unwrap();

        // Two readers load version 1; only the first commit lands.
        let first = store.get_trip("TRP-cas").await.unwrap();
        let second = store.get_trip("TRP-cas").await.unwrap();

        store.update_trip(&first, first.version).await.unwrap();
        let err = store.update_trip(&second, second.version).await.unwrap_err();
        assert!(matches!(err, StoreError::VersionConflict(_)));

        assert_eq!(store.get_trip("TRP-cas").await.unwrap().version, 2);
    }

    #[tokio::test]
    async fn test_duplicate_trip_rejected() {
        let store = MemoryStore::new();
        store.insert_trip(&trip("TRP-dup")).await.unwrap();
        let err = store.insert_trip(&trip("TRP-dup")).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateTrip(_)));
    }

    #[tokio::test]
    async fn test_trip_listing_sorts_by_departure_and_truncates() {
        let store = MemoryStore::new();
        let mut late = trip("TRP-late");
        late.schedule.departure = late.schedule.departure + Duration::hours(6);
        store.insert_trip(&late).await.unwrap();
        store.insert_trip(&trip("TRP-early")).await.unwrap();

        let all = store
            .list_trips(&TripFilter::default(), 100)
            .await
            .unwrap();
        assert_eq!(all[0].id, "TRP-early");

        let capped = store.list_trips(&TripFilter::default(), 1).await.unwrap();
        assert_eq!(capped.len(), 1);
    }

    #[tokio::test]
    async fn test_delay_journal_is_newest_first() {
        let store = MemoryStore::new();
        let t = trip("TRP-d");
        let now = Utc::now();
        let applied = viaro_trip::model::AppliedDelay {
            previous_record: None,
            original: t.schedule.clone(),
            updated: t.schedule.shifted_by_minutes(30),
        };
        let older = DelayRecord::new(
            Uuid::new_v4(),
            t.id.clone(),
            30,
            "traffic".to_string(),
            "ops".to_string(),
            &applied,
            now,
        );
        let newer = DelayRecord::new(
            Uuid::new_v4(),
            t.id.clone(),
            45,
            "weather".to_string(),
            "ops".to_string(),
            &applied,
            now,
        );
        store.append(&older).await.unwrap();
        store.append(&newer).await.unwrap();

        let recent = store.list_recent(10).await.unwrap();
        assert_eq!(recent[0].id, newer.id);

        store.deactivate(older.id).await.unwrap();
        let recent = store.list_recent(10).await.unwrap();
        assert!(!recent[1].is_active);
        assert!(recent[0].is_active);
    }
}
