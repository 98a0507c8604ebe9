use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use viaro_core::{ReservationError, ReservationResult};

use crate::ledger::SeatLedger;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Route {
    pub origin: String,
    pub destination: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Schedule {
    pub departure: DateTime<Utc>,
    pub arrival: DateTime<Utc>,
}

impl Schedule {
    pub fn shifted_by_minutes(&self, minutes: u32) -> Schedule {
        let shift = Duration::minutes(i64::from(minutes));
        Schedule {
            departure: self.departure + shift,
            arrival: self.arrival + shift,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TripStatus {
    Scheduled,
    Delayed,
}

/// Live delay bookkeeping. `original` always carries the schedule as it was
/// before the FIRST delay, so repeated delays re-base instead of stacking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelayState {
    pub delay_minutes: u32,
    pub reason: String,
    pub original: Schedule,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
    pub record_id: Uuid,
}

/// Core trip structure. `schedule` holds the currently effective times; when
/// a delay is active the pre-delay times live in `delay.original`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trip {
    pub id: String,
    pub operator: String,
    pub vehicle_number: String,
    pub route: Route,
    pub schedule: Schedule,
    pub capacity: u32,
    pub fare: i64,
    pub delay: Option<DelayState>,
    pub ledger: SeatLedger,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Bumped by the store on every committed write; stale writers lose.
    pub version: u64,
}

/// What `Trip::apply_delay` changed, for the caller to journal.
#[derive(Debug, Clone)]
pub struct AppliedDelay {
    pub previous_record: Option<Uuid>,
    pub original: Schedule,
    pub updated: Schedule,
}

/// What `Trip::clear_delay` undid.
#[derive(Debug, Clone)]
pub struct ClearedDelay {
    pub record_id: Uuid,
    pub restored: Schedule,
}

impl Trip {
    pub fn status(&self) -> TripStatus {
        if self.delay.is_some() {
            TripStatus::Delayed
        } else {
            TripStatus::Scheduled
        }
    }

    /// Seats still open for sale. Holds do not reduce this figure; they only
    /// block specific seat ids.
    pub fn available_seats(&self) -> u32 {
        self.capacity.saturating_sub(self.ledger.booked_count())
    }

    pub fn remaining_after(&self, requested: u32) -> Option<u32> {
        self.available_seats().checked_sub(requested)
    }

    /// Shift the schedule by `minutes` relative to the pre-delay times.
    /// Applying a delay on top of an existing one replaces it; delays never
    /// accumulate. Returns the id of the delay record being superseded, if
    /// any, along with the schedules the caller needs to journal.
    pub fn apply_delay(
        &mut self,
        minutes: u32,
        reason: String,
        applied_by: String,
        record_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppliedDelay {
        let (original, previous_record) = match &self.delay {
            Some(existing) => (existing.original.clone(), Some(existing.record_id)),
            None => (self.schedule.clone(), None),
        };
        let updated = original.shifted_by_minutes(minutes);

        self.schedule = updated.clone();
        self.delay = Some(DelayState {
            delay_minutes: minutes,
            reason,
            original: original.clone(),
            updated_at: now,
            updated_by: applied_by,
            record_id,
        });
        self.updated_at = now;

        AppliedDelay {
            previous_record,
            original,
            updated,
        }
    }

    /// Restore the pre-delay schedule. The active record id is captured
    /// before the delay state is dropped so the caller can retire it.
    pub fn clear_delay(&mut self, now: DateTime<Utc>) -> ReservationResult<ClearedDelay> {
        let delay = self.delay.take().ok_or(ReservationError::NotDelayed)?;

        self.schedule = delay.original.clone();
        self.updated_at = now;

        Ok(ClearedDelay {
            record_id: delay.record_id,
            restored: delay.original,
        })
    }
}

/// Validated input for trip creation. `id` is optional; absent ids get a
/// generated `TRP-` identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripDraft {
    pub id: Option<String>,
    pub operator: String,
    pub vehicle_number: String,
    pub origin: String,
    pub destination: String,
    pub departure: DateTime<Utc>,
    pub arrival: DateTime<Utc>,
    pub fare: i64,
    pub capacity: u32,
}

impl TripDraft {
    pub fn into_trip(self, now: DateTime<Utc>) -> ReservationResult<Trip> {
        let operator = require_text("operator", &self.operator)?;
        let vehicle_number = require_text("vehicle_number", &self.vehicle_number)?;
        let origin = require_text("origin", &self.origin)?;
        let destination = require_text("destination", &self.destination)?;

        if origin.eq_ignore_ascii_case(&destination) {
            return Err(ReservationError::Validation(
                "origin and destination must differ".to_string(),
            ));
        }
        if self.arrival <= self.departure {
            return Err(ReservationError::Validation(
                "arrival must be after departure".to_string(),
            ));
        }
        if self.capacity == 0 {
            return Err(ReservationError::Validation(
                "capacity must be at least 1".to_string(),
            ));
        }
        if self.fare < 0 {
            return Err(ReservationError::Validation(
                "fare must not be negative".to_string(),
            ));
        }

        let id = match self.id {
            Some(id) => {
                let id = id.trim().to_string();
                if id.is_empty() {
                    return Err(ReservationError::Validation(
                        "id must not be blank".to_string(),
                    ));
                }
                id
            }
            None => format!("TRP-{}", Uuid::new_v4().simple()),
        };

        Ok(Trip {
            id,
            operator,
            vehicle_number,
            route: Route {
                origin,
                destination,
            },
            schedule: Schedule {
                departure: self.departure,
                arrival: self.arrival,
            },
            capacity: self.capacity,
            fare: self.fare,
            delay: None,
            ledger: SeatLedger::new(),
            created_at: now,
            updated_at: now,
            version: 1,
        })
    }
}

fn require_text(field: &str, value: &str) -> ReservationResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ReservationError::Validation(format!(
            "{field} must not be blank"
        )));
    }
    Ok(trimmed.to_string())
}

/// Search filter for trip listings. Empty filter matches everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TripFilter {
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub date: Option<NaiveDate>,
    pub min_fare: Option<i64>,
    pub max_fare: Option<i64>,
}

impl TripFilter {
    pub fn matches(&self, trip: &Trip) -> bool {
        if let Some(origin) = &self.origin {
            if !trip.route.origin.eq_ignore_ascii_case(origin.trim()) {
                return false;
            }
        }
        if let Some(destination) = &self.destination {
            if !trip
                .route
                .destination
                .eq_ignore_ascii_case(destination.trim())
            {
                return false;
            }
        }
        if let Some(date) = self.date {
            if trip.schedule.departure.date_naive() != date {
                return false;
            }
        }
        if let Some(min) = self.min_fare {
            if trip.fare < min {
                return false;
            }
        }
        if let Some(max) = self.max_fare {
            if trip.fare > max {
                return false;
            }
        }
        true
    }
}
