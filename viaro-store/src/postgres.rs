use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use viaro_reservation::booking::{Booking, BookingStatus};
use viaro_reservation::delay::DelayRecord;
use viaro_reservation::repository::{BookingStore, DelayLedger, StoreError, TripStore};
use viaro_trip::{Route, Schedule, Trip, TripFilter};

/// Postgres-backed store. The seat ledger and delay state ride along as
/// JSONB since they are only ever read and written whole, under the
/// `version` compare-and-swap guard.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal structs for type-safe querying
#[derive(sqlx::FromRow)]
struct TripRow {
    id: String,
    operator: String,
    vehicle_number: String,
    origin: String,
    destination: String,
    departure: DateTime<Utc>,
    arrival: DateTime<Utc>,
    capacity: i32,
    fare: i64,
    delay: Option<serde_json::Value>,
    ledger: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: i64,
}

impl TripRow {
    fn into_trip(self) -> Result<Trip, StoreError> {
        let ledger = serde_json::from_value(self.ledger).map_err(decode_error)?;
        let delay = self
            .delay
            .map(serde_json::from_value)
            .transpose()
            .map_err(decode_error)?;

        Ok(Trip {
            id: self.id,
            operator: self.operator,
            vehicle_number: self.vehicle_number,
            route: Route {
                origin: self.origin,
                destination: self.destination,
            },
            schedule: Schedule {
                departure: self.departure,
                arrival: self.arrival,
            },
            capacity: self.capacity as u32,
            fare: self.fare,
            delay,
            ledger,
            created_at: self.created_at,
            updated_at: self.updated_at,
            version: self.version as u64,
        })
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    trip_id: String,
    user_id: String,
    seats: serde_json::Value,
    schedule_snapshot: serde_json::Value,
    contact: Option<serde_json::Value>,
    payment: serde_json::Value,
    status: String,
    cancellation: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BookingRow {
    fn into_booking(self) -> Result<Booking, StoreError> {
        Ok(Booking {
            id: self.id,
            trip_id: self.trip_id,
            user_id: self.user_id,
            seats: serde_json::from_value(self.seats).map_err(decode_error)?,
            schedule_snapshot: serde_json::from_value(self.schedule_snapshot)
                .map_err(decode_error)?,
            contact: self
                .contact
                .map(serde_json::from_value)
                .transpose()
                .map_err(decode_error)?,
            payment: serde_json::from_value(self.payment).map_err(decode_error)?,
            status: status_from_label(&self.status)?,
            cancellation: self
                .cancellation
                .map(serde_json::from_value)
                .transpose()
                .map_err(decode_error)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct DelayRow {
    id: Uuid,
    trip_id: String,
    delay_minutes: i32,
    reason: String,
    applied_by: String,
    original_departure: DateTime<Utc>,
    original_arrival: DateTime<Utc>,
    new_departure: DateTime<Utc>,
    new_arrival: DateTime<Utc>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<DelayRow> for DelayRecord {
    fn from(row: DelayRow) -> Self {
        DelayRecord {
            id: row.id,
            trip_id: row.trip_id,
            delay_minutes: row.delay_minutes as u32,
            reason: row.reason,
            applied_by: row.applied_by,
            original_departure: row.original_departure,
            original_arrival: row.original_arrival,
            new_departure: row.new_departure,
            new_arrival: row.new_arrival,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

fn decode_error(err: serde_json::Error) -> StoreError {
    StoreError::Backend(format!("column decode failed: {err}"))
}

fn encode_error(err: serde_json::Error) -> StoreError {
    StoreError::Backend(format!("column encode failed: {err}"))
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn status_label(status: &BookingStatus) -> &'static str {
    match status {
        BookingStatus::Confirmed => "CONFIRMED",
        BookingStatus::Cancelled => "CANCELLED",
    }
}

fn status_from_label(label: &str) -> Result<BookingStatus, StoreError> {
    match label {
        "CONFIRMED" => Ok(BookingStatus::Confirmed),
        "CANCELLED" => Ok(BookingStatus::Cancelled),
        other => Err(StoreError::Backend(format!(
            "unknown booking status: {other}"
        ))),
    }
}

#[async_trait]
impl TripStore for PgStore {
    async fn insert_trip(&self, trip: &Trip) -> Result<(), StoreError> {
        let ledger = serde_json::to_value(&trip.ledger).map_err(encode_error)?;
        let delay = trip
            .delay
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(encode_error)?;

        sqlx::query(
            r#"
            INSERT INTO trips (id, operator, vehicle_number, origin, destination, departure, arrival, capacity, fare, delay, ledger, created_at, updated_at, version)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(&trip.id)
        .bind(&trip.operator)
        .bind(&trip.vehicle_number)
        .bind(&trip.route.origin)
        .bind(&trip.route.destination)
        .bind(trip.schedule.departure)
        .bind(trip.schedule.arrival)
        .bind(trip.capacity as i32)
        .bind(trip.fare)
        .bind(delay)
        .bind(ledger)
        .bind(trip.created_at)
        .bind(trip.updated_at)
        .bind(trip.version as i64)
        .execute(&self.pool)
        .await
        .map_err(|err| match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::DuplicateTrip(trip.id.clone())
            }
            _ => backend(err),
        })?;

        Ok(())
    }

    async fn get_trip(&self, id: &str) -> Result<Trip, StoreError> {
        let row = sqlx::query_as::<_, TripRow>(
            "SELECT id, operator, vehicle_number, origin, destination, departure, arrival, capacity, fare, delay, ledger, created_at, updated_at, version FROM trips WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.ok_or_else(|| StoreError::TripNotFound(id.to_string()))?
            .into_trip()
    }

    async fn list_trips(&self, filter: &TripFilter, limit: usize) -> Result<Vec<Trip>, StoreError> {
        let rows = sqlx::query_as::<_, TripRow>(
            r#"
            SELECT id, operator, vehicle_number, origin, destination, departure, arrival, capacity, fare, delay, ledger, created_at, updated_at, version
            FROM trips
            WHERE ($1::text IS NULL OR lower(origin) = lower($1))
              AND ($2::text IS NULL OR lower(destination) = lower($2))
              AND ($3::date IS NULL OR (departure AT TIME ZONE 'UTC')::date = $3)
              AND ($4::bigint IS NULL OR fare >= $4)
              AND ($5::bigint IS NULL OR fare <= $5)
            ORDER BY departure
            LIMIT $6
            "#,
        )
        .bind(filter.origin.as_deref().map(str::trim))
        .bind(filter.destination.as_deref().map(str::trim))
        .bind(filter.date)
        .bind(filter.min_fare)
        .bind(filter.max_fare)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter().map(TripRow::into_trip).collect()
    }

    async fn list_trip_ids(&self) -> Result<Vec<String>, StoreError> {
        sqlx::query_scalar::<_, String>("SELECT id FROM trips")
            .fetch_all(&self.pool)
            .await
            .map_err(backend)
    }

    async fn update_trip(&self, trip: &Trip, expected_version: u64) -> Result<(), StoreError> {
        let ledger = serde_json::to_value(&trip.ledger).map_err(encode_error)?;
        let delay = trip
            .delay
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(encode_error)?;

        let result = sqlx::query(
            r#"
            UPDATE trips
            SET operator = $1, vehicle_number = $2, origin = $3, destination = $4,
                departure = $5, arrival = $6, capacity = $7, fare = $8,
                delay = $9, ledger = $10, updated_at = $11, version = version + 1
            WHERE id = $12 AND version = $13
            "#,
        )
        .bind(&trip.operator)
        .bind(&trip.vehicle_number)
        .bind(&trip.route.origin)
        .bind(&trip.route.destination)
        .bind(trip.schedule.departure)
        .bind(trip.schedule.arrival)
        .bind(trip.capacity as i32)
        .bind(trip.fare)
        .bind(delay)
        .bind(ledger)
        .bind(trip.updated_at)
        .bind(&trip.id)
        .bind(expected_version as i64)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            // Zero rows is either a stale version or a trip that was never
            // there; look again to report the right one.
            let exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM trips WHERE id = $1)",
            )
            .bind(&trip.id)
            .fetch_one(&self.pool)
            .await
            .map_err(backend)?;

            return if exists {
                Err(StoreError::VersionConflict(trip.id.clone()))
            } else {
                Err(StoreError::TripNotFound(trip.id.clone()))
            };
        }

        Ok(())
    }
}

#[async_trait]
impl BookingStore for PgStore {
    async fn insert_booking(&self, booking: &Booking) -> Result<(), StoreError> {
        let seats = serde_json::to_value(&booking.seats).map_err(encode_error)?;
        let snapshot = serde_json::to_value(&booking.schedule_snapshot).map_err(encode_error)?;
        let contact = booking
            .contact
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(encode_error)?;
        let payment = serde_json::to_value(&booking.payment).map_err(encode_error)?;
        let cancellation = booking
            .cancellation
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(encode_error)?;

        sqlx::query(
            r#"
            INSERT INTO bookings (id, trip_id, user_id, seats, schedule_snapshot, contact, payment, status, cancellation, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(booking.id)
        .bind(&booking.trip_id)
        .bind(&booking.user_id)
        .bind(seats)
        .bind(snapshot)
        .bind(contact)
        .bind(payment)
        .bind(status_label(&booking.status))
        .bind(cancellation)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(())
    }

    async fn get_booking(&self, id: Uuid) -> Result<Booking, StoreError> {
        let row = sqlx::query_as::<_, BookingRow>(
            "SELECT id, trip_id, user_id, seats, schedule_snapshot, contact, payment, status, cancellation, created_at, updated_at FROM bookings WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.ok_or(StoreError::BookingNotFound(id))?.into_booking()
    }

    async fn update_booking(
        &self,
        booking: &Booking,
        expect_status: BookingStatus,
    ) -> Result<(), StoreError> {
        let seats = serde_json::to_value(&booking.seats).map_err(encode_error)?;
        let snapshot = serde_json::to_value(&booking.schedule_snapshot).map_err(encode_error)?;
        let contact = booking
            .contact
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(encode_error)?;
        let payment = serde_json::to_value(&booking.payment).map_err(encode_error)?;
        let cancellation = booking
            .cancellation
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(encode_error)?;

        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET seats = $1, schedule_snapshot = $2, contact = $3, payment = $4,
                status = $5, cancellation = $6, updated_at = $7
            WHERE id = $8 AND status = $9
            "#,
        )
        .bind(seats)
        .bind(snapshot)
        .bind(contact)
        .bind(payment)
        .bind(status_label(&booking.status))
        .bind(cancellation)
        .bind(booking.updated_at)
        .bind(booking.id)
        .bind(status_label(&expect_status))
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            let exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM bookings WHERE id = $1)",
            )
            .bind(booking.id)
            .fetch_one(&self.pool)
            .await
            .map_err(backend)?;

            return if exists {
                Err(StoreError::StateConflict(booking.id))
            } else {
                Err(StoreError::BookingNotFound(booking.id))
            };
        }

        Ok(())
    }

    async fn list_bookings_for_user(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<Booking>, StoreError> {
        let rows = sqlx::query_as::<_, BookingRow>(
            "SELECT id, trip_id, user_id, seats, schedule_snapshot, contact, payment, status, cancellation, created_at, updated_at FROM bookings WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2",
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter().map(BookingRow::into_booking).collect()
    }

    async fn list_bookings(&self, limit: usize) -> Result<Vec<Booking>, StoreError> {
        let rows = sqlx::query_as::<_, BookingRow>(
            "SELECT id, trip_id, user_id, seats, schedule_snapshot, contact, payment, status, cancellation, created_at, updated_at FROM bookings ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter().map(BookingRow::into_booking).collect()
    }
}

#[async_trait]
impl DelayLedger for PgStore {
    async fn append(&self, record: &DelayRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO delay_records (id, trip_id, delay_minutes, reason, applied_by, original_departure, original_arrival, new_departure, new_arrival, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(record.id)
        .bind(&record.trip_id)
        .bind(record.delay_minutes as i32)
        .bind(&record.reason)
        .bind(&record.applied_by)
        .bind(record.original_departure)
        .bind(record.original_arrival)
        .bind(record.new_departure)
        .bind(record.new_arrival)
        .bind(record.is_active)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(())
    }

    async fn deactivate(&self, id: Uuid) -> Result<(), StoreError> {
        // Ids that are no longer present are fine to ignore.
        sqlx::query("UPDATE delay_records SET is_active = FALSE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        Ok(())
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<DelayRecord>, StoreError> {
        let rows = sqlx::query_as::<_, DelayRow>(
            "SELECT id, trip_id, delay_minutes, reason, applied_by, original_departure, original_arrival, new_departure, new_arrival, is_active, created_at FROM delay_records ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        Ok(rows.into_iter().map(DelayRecord::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use viaro_trip::TripDraft;

    fn sample_trip() -> Trip {
        let now = Utc::now();
        TripDraft {
            id: Some("TRP-pg-test".to_string()),
            operator: "Skyline Travels".to_string(),
            vehicle_number: "MH-12-SK-4321".to_string(),
            origin: "Pune".to_string(),
            destination: "Mumbai".to_string(),
            departure: now + Duration::hours(24),
            arrival: now + Duration::hours(28),
            fare: 45000,
            capacity: 40,
        }
        .into_trip(now)
        .unwrap()
    }

    #[test]
    fn test_trip_row_decodes_back_to_trip() {
        let trip = sample_trip();
        let row = TripRow {
            id: trip.id.clone(),
            operator: trip.operator.clone(),
            vehicle_number: trip.vehicle_number.clone(),
            origin: trip.route.origin.clone(),
            destination: trip.route.destination.clone(),
            departure: trip.schedule.departure,
            arrival: trip.schedule.arrival,
            capacity: trip.capacity as i32,
            fare: trip.fare,
            delay: None,
            ledger: serde_json::to_value(&trip.ledger).unwrap(),
            created_at: trip.created_at,
            updated_at: trip.updated_at,
            version: trip.version as i64,
        };

        let decoded = row.into_trip().unwrap();
        assert_eq!(decoded.id, "TRP-pg-test");
        assert_eq!(decoded.route.origin, "Pune");
        assert_eq!(decoded.capacity, 40);
        assert_eq!(decoded.version, 1);
        assert_eq!(decoded.ledger.booked_count(), 0);
    }

    #[test]
    fn test_booking_status_labels_round_trip() {
        for status in [BookingStatus::Confirmed, BookingStatus::Cancelled] {
            let label = status_label(&status);
            assert_eq!(status_from_label(label).unwrap(), status);
        }
        assert!(status_from_label("REFUNDED").is_err());
    }
}
