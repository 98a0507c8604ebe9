use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use viaro_trip::model::AppliedDelay;

/// Append-only journal entry for one schedule delay. At most one record per
/// trip is active at a time; re-delaying or clearing retires the previous
/// one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelayRecord {
    pub id: Uuid,
    pub trip_id: String,
    pub delay_minutes: u32,
    pub reason: String,
    pub applied_by: String,
    pub original_departure: DateTime<Utc>,
    pub original_arrival: DateTime<Utc>,
    pub new_departure: DateTime<Utc>,
    pub new_arrival: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl DelayRecord {
    pub fn new(
        id: Uuid,
        trip_id: String,
        delay_minutes: u32,
        reason: String,
        applied_by: String,
        applied: &AppliedDelay,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            trip_id,
            delay_minutes,
            reason,
            applied_by,
            original_departure: applied.original.departure,
            original_arrival: applied.original.arrival,
            new_departure: applied.updated.departure,
            new_arrival: applied.updated.arrival,
            is_active: true,
            created_at: now,
        }
    }
}
