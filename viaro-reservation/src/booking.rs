use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use viaro_core::payment::PaymentRecord;
use viaro_core::{ReservationError, ReservationResult};
use viaro_shared::pii::Masked;
use viaro_trip::{Route, Trip};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
}

/// Refund pipeline state. Spellings match the payloads the refund processor
/// already emits, `No Refund` space included.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RefundStatus {
    Processing,
    Completed,
    #[serde(rename = "No Refund")]
    NoRefund,
}

/// The trip as sold, frozen at confirmation time. Later delays or other trip
/// mutations never touch this; it is what the ticket shows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleSnapshot {
    pub route: Route,
    pub operator: String,
    pub vehicle_number: String,
    pub departure: DateTime<Utc>,
    pub arrival: DateTime<Utc>,
    pub fare: i64,
}

impl ScheduleSnapshot {
    pub fn capture(trip: &Trip) -> Self {
        Self {
            route: trip.route.clone(),
            operator: trip.operator.clone(),
            vehicle_number: trip.vehicle_number.clone(),
            departure: trip.schedule.departure,
            arrival: trip.schedule.arrival,
            fare: trip.fare,
        }
    }
}

/// How to reach the passenger. Wrapped in [`Masked`] so debug logging never
/// leaks contact data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactDetails {
    pub email: Masked<String>,
    pub phone: Masked<String>,
}

impl ContactDetails {
    pub fn validate(&self) -> ReservationResult<()> {
        if !self.email.0.contains('@') {
            return Err(ReservationError::Validation(
                "contact email is not valid".to_string(),
            ));
        }
        if self.phone.0.trim().len() < 7 {
            return Err(ReservationError::Validation(
                "contact phone is too short".to_string(),
            ));
        }
        Ok(())
    }
}

/// Everything recorded when a booking is cancelled, including the refund
/// decision made at that moment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancellationRecord {
    pub cancelled_at: DateTime<Utc>,
    pub reason: String,
    pub refund_percentage: u8,
    pub refund_amount: i64,
    pub refund_status: RefundStatus,
    pub estimated_refund_date: Option<DateTime<Utc>>,
}

/// The single source of truth for a confirmed sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub trip_id: String,
    pub user_id: String,
    pub seats: Vec<String>,
    pub schedule_snapshot: ScheduleSnapshot,
    pub contact: Option<ContactDetails>,
    pub payment: PaymentRecord,
    pub status: BookingStatus,
    pub cancellation: Option<CancellationRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn new(
        id: Uuid,
        trip: &Trip,
        user_id: String,
        seats: Vec<String>,
        contact: Option<ContactDetails>,
        payment: PaymentRecord,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            trip_id: trip.id.clone(),
            user_id,
            seats,
            schedule_snapshot: ScheduleSnapshot::capture(trip),
            contact,
            payment,
            status: BookingStatus::Confirmed,
            cancellation: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == BookingStatus::Cancelled
    }

    /// Move to `Cancelled` and attach the refund decision.
    pub fn cancel(&mut self, record: CancellationRecord) {
        self.updated_at = record.cancelled_at;
        self.cancellation = Some(record);
        self.status = BookingStatus::Cancelled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use viaro_core::payment::{PaymentMethod, PaymentState};

    fn payment() -> PaymentRecord {
        PaymentRecord {
            total_amount: 4800,
            discount: 0,
            final_amount: 4800,
            method: PaymentMethod::CreditCard,
            status: PaymentState::Completed,
            transaction_id: None,
            paid_at: None,
        }
    }

    #[test]
    fn test_snapshot_is_frozen_against_trip_mutation() {
        let now = Utc::now();
        let mut trip = viaro_trip::TripDraft {
            id: Some("TRP-frozen".to_string()),
            operator: "Northline".to_string(),
            vehicle_number: "NL-204".to_string(),
            origin: "Hamburg".to_string(),
            destination: "Berlin".to_string(),
            departure: now + chrono::Duration::hours(24),
            arrival: now + chrono::Duration::hours(28),
            fare: 2400,
            capacity: 40,
        }
        .into_trip(now)
        .unwrap();

        let booking = Booking::new(
            Uuid::new_v4(),
            &trip,
            "user-1".to_string(),
            vec!["A1".to_string()],
            None,
            payment(),
            now,
        );
        let sold_departure = booking.schedule_snapshot.departure;

        trip.apply_delay(90, "breakdown".to_string(), "ops".to_string(), Uuid::new_v4(), now);
        assert_eq!(booking.schedule_snapshot.departure, sold_departure);
        assert_ne!(trip.schedule.departure, sold_departure);
    }

    #[test]
    fn test_contact_validation() {
        let good = ContactDetails {
            email: Masked("rider@example.com".to_string()),
            phone: Masked("5550123456".to_string()),
        };
        assert!(good.validate().is_ok());

        let bad_email = ContactDetails {
            email: Masked("not-an-email".to_string()),
            phone: Masked("5550123456".to_string()),
        };
        assert!(bad_email.validate().is_err());
    }

    #[test]
    fn test_refund_status_wire_spelling() {
        assert_eq!(
            serde_json::to_string(&RefundStatus::NoRefund).unwrap(),
            "\"No Refund\""
        );
        assert_eq!(
            serde_json::to_string(&RefundStatus::Processing).unwrap(),
            "\"Processing\""
        );
    }
}
