use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct HoldPlacedEvent {
    pub trip_id: String,
    pub user_id: String,
    pub seats: Vec<String>,
    pub expires_at: DateTime<Utc>,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct HoldsReleasedEvent {
    pub trip_id: String,
    pub released: u32,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct BookingConfirmedEvent {
    pub trip_id: String,
    pub booking_id: Uuid,
    pub seats: Vec<String>,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct BookingCancelledEvent {
    pub trip_id: String,
    pub booking_id: Uuid,
    pub seats: Vec<String>,
    pub refund_amount: i64,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct ScheduleDelayedEvent {
    pub trip_id: String,
    pub delay_minutes: u32,
    pub new_departure: DateTime<Utc>,
    pub new_arrival: DateTime<Utc>,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct ScheduleRestoredEvent {
    pub trip_id: String,
    pub departure: DateTime<Utc>,
    pub arrival: DateTime<Utc>,
    pub timestamp: i64,
}

/// Everything the engine publishes on the live ledger channel. Internally
/// tagged so SSE consumers can switch on `type` without guessing the shape.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerEvent {
    HoldPlaced(HoldPlacedEvent),
    HoldsReleased(HoldsReleasedEvent),
    BookingConfirmed(BookingConfirmedEvent),
    BookingCancelled(BookingCancelledEvent),
    ScheduleDelayed(ScheduleDelayedEvent),
    ScheduleRestored(ScheduleRestoredEvent),
}

impl LedgerEvent {
    pub fn trip_id(&self) -> &str {
        match self {
            LedgerEvent::HoldPlaced(e) => &e.trip_id,
            LedgerEvent::HoldsReleased(e) => &e.trip_id,
            LedgerEvent::BookingConfirmed(e) => &e.trip_id,
            LedgerEvent::BookingCancelled(e) => &e.trip_id,
            LedgerEvent::ScheduleDelayed(e) => &e.trip_id,
            LedgerEvent::ScheduleRestored(e) => &e.trip_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_event_is_internally_tagged() {
        let event = LedgerEvent::HoldsReleased(HoldsReleasedEvent {
            trip_id: "TRP-1".to_string(),
            released: 3,
            timestamp: 1_700_000_000,
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "HOLDS_RELEASED");
        assert_eq!(json["trip_id"], "TRP-1");
        assert_eq!(json["released"], 3);
    }
}
