use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use viaro_core::{ReservationError, ReservationResult};

/// A temporary claim on a single seat. Expired holds stay in the ledger as
/// dead entries until the next mutation sweeps them; no timer ever fires.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeatHold {
    pub seat: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
}

impl SeatHold {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Authoritative seat state for one trip: confirmed seats plus live holds.
///
/// Invariant: a seat id never appears in `booked` and in an active hold at
/// the same time. All mutations check against active holds only, so an
/// expired hold is claimable even before a sweep physically removes it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeatLedger {
    booked: BTreeSet<String>,
    holds: Vec<SeatHold>,
}

impl SeatLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn booked_seats(&self) -> impl Iterator<Item = &str> {
        self.booked.iter().map(|s| s.as_str())
    }

    pub fn booked_count(&self) -> u32 {
        self.booked.len() as u32
    }

    pub fn is_booked(&self, seat: &str) -> bool {
        self.booked.contains(seat)
    }

    /// The user currently holding `seat`, if any non-expired hold covers it.
    pub fn holder_of(&self, seat: &str, now: DateTime<Utc>) -> Option<&SeatHold> {
        self.holds
            .iter()
            .find(|h| h.seat == seat && h.is_active(now))
    }

    pub fn active_holds(&self, now: DateTime<Utc>) -> Vec<SeatHold> {
        self.holds
            .iter()
            .filter(|h| h.is_active(now))
            .cloned()
            .collect()
    }

    /// Drop every expired hold. Returns how many were removed.
    pub fn sweep_expired(&mut self, now: DateTime<Utc>) -> u32 {
        let before = self.holds.len();
        self.holds.retain(|h| h.is_active(now));
        (before - self.holds.len()) as u32
    }

    /// Place holds for `user_id` on `seats`, all expiring at `expires_at`.
    ///
    /// A new hold replaces all of the user's previous holds on this trip.
    /// Conflicts are collected across the whole request so the caller sees
    /// every unavailable seat at once, and nothing is mutated on failure.
    pub fn place_holds(
        &mut self,
        user_id: &str,
        seats: &[String],
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> ReservationResult<()> {
        let mut unavailable = Vec::new();
        for seat in seats {
            if self.is_booked(seat) {
                unavailable.push(seat.clone());
            } else if let Some(hold) = self.holder_of(seat, now) {
                if hold.user_id != user_id {
                    unavailable.push(seat.clone());
                }
            }
        }
        if !unavailable.is_empty() {
            return Err(ReservationError::SeatsUnavailable {
                seats: unavailable,
            });
        }

        // Re-holding is replace, not extend: the user's earlier holds on this
        // trip are dropped before the new ones land.
        self.holds.retain(|h| h.user_id != user_id);
        for seat in seats {
            self.holds.push(SeatHold {
                seat: seat.clone(),
                user_id: user_id.to_string(),
                expires_at,
            });
        }
        Ok(())
    }

    /// Promote `seats` to booked for `user_id`. A prior hold is not required,
    /// but a seat booked or actively held by someone else blocks the whole
    /// request. No partial promotion: the ledger is untouched on error.
    pub fn promote(
        &mut self,
        user_id: &str,
        seats: &[String],
        now: DateTime<Utc>,
    ) -> ReservationResult<()> {
        for seat in seats {
            if self.is_booked(seat) {
                return Err(ReservationError::SeatAlreadyBooked { seat: seat.clone() });
            }
            if let Some(hold) = self.holder_of(seat, now) {
                if hold.user_id != user_id {
                    return Err(ReservationError::SeatHeldByOther { seat: seat.clone() });
                }
            }
        }

        self.holds
            .retain(|h| !(h.user_id == user_id && seats.contains(&h.seat)));
        for seat in seats {
            self.booked.insert(seat.clone());
        }
        Ok(())
    }

    /// Return cancelled seats to the open pool. Seats not currently booked
    /// are ignored; returns how many were actually released.
    pub fn release_booked(&mut self, seats: &[String]) -> u32 {
        let mut released = 0;
        for seat in seats {
            if self.booked.remove(seat) {
                released += 1;
            }
        }
        released
    }

    #[cfg(test)]
    fn assert_invariants(&self, now: DateTime<Utc>) {
        for hold in self.holds.iter().filter(|h| h.is_active(now)) {
            assert!(
                !self.booked.contains(&hold.seat),
                "seat {} is both booked and actively held",
                hold.seat
            );
        }
    }
}
