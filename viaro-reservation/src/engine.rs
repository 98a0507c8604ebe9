use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;
use viaro_core::identity::Caller;
use viaro_core::{ReservationError, ReservationResult};
use viaro_shared::models::events::{
    BookingCancelledEvent, BookingConfirmedEvent, HoldPlacedEvent, HoldsReleasedEvent, LedgerEvent,
    ScheduleDelayedEvent, ScheduleRestoredEvent,
};
use viaro_trip::{Trip, TripDraft, TripFilter};

use crate::booking::{Booking, BookingStatus, CancellationRecord};
use crate::delay::DelayRecord;
use crate::refund::RefundPolicy;
use crate::repository::{BookingStore, DelayLedger, StoreError, TripStore};
use crate::requests::{validate_seats, CancelRequest, ConfirmRequest, DelayRequest, HoldRequest};

/// Attempts before a contended trip is reported as unavailable. Each retry
/// re-reads and re-validates, so a loser never commits against stale state.
const MAX_CAS_RETRIES: usize = 8;
const EVENT_CHANNEL_CAPACITY: usize = 256;
const TRIP_SEARCH_LIMIT: usize = 100;
const BOOKING_LIST_LIMIT: usize = 200;
const DELAY_HISTORY_LIMIT: usize = 100;

/// What a successful hold tells the caller: which seats, until when.
#[derive(Debug, Clone, Serialize)]
pub struct HoldReceipt {
    pub trip_id: String,
    pub seats: Vec<String>,
    pub expires_at: DateTime<Utc>,
}

/// Seat state of one trip as reported to clients. Holder identities stay
/// internal; only the blocked seat ids and their deadlines go out.
#[derive(Debug, Clone, Serialize)]
pub struct AvailabilityView {
    pub trip_id: String,
    pub capacity: u32,
    pub booked_seats: Vec<String>,
    pub active_holds: Vec<HeldSeatView>,
    pub available_seats: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct HeldSeatView {
    pub seat: String,
    pub expires_at: DateTime<Utc>,
}

/// Coordinates every seat-state transition. All writes to one trip funnel
/// through a read-validate-mutate-commit loop against the trip's version, so
/// per-trip operations serialize without any cross-trip blocking.
pub struct ReservationEngine {
    trips: Arc<dyn TripStore>,
    bookings: Arc<dyn BookingStore>,
    delays: Arc<dyn DelayLedger>,
    refund_policy: RefundPolicy,
    hold_duration: Duration,
    events: broadcast::Sender<LedgerEvent>,
}

impl ReservationEngine {
    pub fn new(
        trips: Arc<dyn TripStore>,
        bookings: Arc<dyn BookingStore>,
        delays: Arc<dyn DelayLedger>,
        refund_policy: RefundPolicy,
        hold_seconds: u64,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            trips,
            bookings,
            delays,
            refund_policy,
            hold_duration: Duration::seconds(hold_seconds as i64),
            events,
        }
    }

    /// Live feed of ledger changes, for SSE fan-out.
    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.events.subscribe()
    }

    fn publish(&self, event: LedgerEvent) {
        // No subscribers is normal; receivers come and go with SSE clients.
        let _ = self.events.send(event);
    }

    /// Optimistic per-trip write loop. The closure may run several times;
    /// it must derive everything from the trip state it is handed.
    async fn with_trip<T>(
        &self,
        trip_id: &str,
        mut apply: impl FnMut(&mut Trip, DateTime<Utc>) -> ReservationResult<T>,
    ) -> ReservationResult<T> {
        for attempt in 0..MAX_CAS_RETRIES {
            let now = Utc::now();
            let mut trip = self.trips.get_trip(trip_id).await?;
            let expected = trip.version;
            let outcome = apply(&mut trip, now)?;
            match self.trips.update_trip(&trip, expected).await {
                Ok(()) => return Ok(outcome),
                Err(StoreError::VersionConflict(_)) => {
                    debug!("version conflict on trip {} (attempt {})", trip_id, attempt + 1);
                    continue;
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(ReservationError::Contended(trip_id.to_string()))
    }

    // ==================== Trip catalog ====================

    pub async fn create_trip(&self, caller: &Caller, draft: TripDraft) -> ReservationResult<Trip> {
        if !caller.is_admin() {
            return Err(ReservationError::Forbidden(
                "only admins can create trips".to_string(),
            ));
        }
        let trip = draft.into_trip(Utc::now())?;
        self.trips.insert_trip(&trip).await?;
        info!("trip {} created by {}", trip.id, caller.id);
        Ok(trip)
    }

    pub async fn get_trip(&self, trip_id: &str) -> ReservationResult<Trip> {
        Ok(self.trips.get_trip(trip_id).await?)
    }

    pub async fn search_trips(&self, filter: &TripFilter) -> ReservationResult<Vec<Trip>> {
        Ok(self.trips.list_trips(filter, TRIP_SEARCH_LIMIT).await?)
    }

    pub async fn trip_ids(&self) -> ReservationResult<Vec<String>> {
        Ok(self.trips.list_trip_ids().await?)
    }

    /// Read-only seat picture. Reads filter expired holds instead of
    /// sweeping them; only mutations pay the write.
    pub async fn availability(&self, trip_id: &str) -> ReservationResult<AvailabilityView> {
        let trip = self.trips.get_trip(trip_id).await?;
        let now = Utc::now();
        Ok(AvailabilityView {
            trip_id: trip.id.clone(),
            capacity: trip.capacity,
            booked_seats: trip.ledger.booked_seats().map(String::from).collect(),
            active_holds: trip
                .ledger
                .active_holds(now)
                .into_iter()
                .map(|h| HeldSeatView {
                    seat: h.seat,
                    expires_at: h.expires_at,
                })
                .collect(),
            available_seats: trip.available_seats(),
        })
    }

    // ==================== Seat lifecycle ====================

    pub async fn hold(&self, caller: &Caller, req: HoldRequest) -> ReservationResult<HoldReceipt> {
        let seats = validate_seats(&req.seats)?;

        let receipt = self
            .with_trip(&req.trip_id, |trip, now| {
                // 1. Drop dead holds before looking at anything.
                trip.ledger.sweep_expired(now);

                // 2. Sanity: a request can never claim more seats than exist.
                if seats.len() as u32 > trip.capacity {
                    return Err(ReservationError::Validation(format!(
                        "cannot hold {} seats on a {}-seat vehicle",
                        seats.len(),
                        trip.capacity
                    )));
                }

                // 3. Claim. Replaces any earlier holds by this user.
                let expires_at = now + self.hold_duration;
                trip.ledger.place_holds(&caller.id, &seats, expires_at, now)?;

                Ok(HoldReceipt {
                    trip_id: trip.id.clone(),
                    seats: seats.clone(),
                    expires_at,
                })
            })
            .await?;

        info!(
            "user {} holds {} seat(s) on {} until {}",
            caller.id,
            receipt.seats.len(),
            receipt.trip_id,
            receipt.expires_at
        );
        self.publish(LedgerEvent::HoldPlaced(HoldPlacedEvent {
            trip_id: receipt.trip_id.clone(),
            user_id: caller.id.clone(),
            seats: receipt.seats.clone(),
            expires_at: receipt.expires_at,
            timestamp: Utc::now().timestamp(),
        }));
        Ok(receipt)
    }

    pub async fn confirm(&self, caller: &Caller, req: ConfirmRequest) -> ReservationResult<Booking> {
        // 1. Validate the request before touching any state.
        let seats = validate_seats(&req.seats)?;
        req.payment.validate()?;
        if !req.payment.is_completed() {
            return Err(ReservationError::PaymentNotCompleted);
        }
        if let Some(contact) = &req.contact {
            contact.validate()?;
        }

        // Minted once so retries of the write loop keep a stable id.
        let booking_id = Uuid::new_v4();

        // 2. Promote the seats under the trip's version guard.
        let booking = self
            .with_trip(&req.trip_id, |trip, now| {
                trip.ledger.sweep_expired(now);

                let requested = seats.len() as u32;
                let available = trip.available_seats();
                if requested > available {
                    return Err(ReservationError::CapacityExceeded {
                        requested,
                        available,
                    });
                }
                trip.ledger.promote(&caller.id, &seats, now)?;

                Ok(Booking::new(
                    booking_id,
                    trip,
                    caller.id.clone(),
                    seats.clone(),
                    req.contact.clone(),
                    req.payment.clone(),
                    now,
                ))
            })
            .await?;

        // 3. Persist the booking. The seats are already committed, so a
        //    failed append rolls them back before the error surfaces.
        if let Err(err) = self.bookings.insert_booking(&booking).await {
            warn!(
                "booking append failed for trip {}, releasing {} seat(s): {}",
                booking.trip_id,
                booking.seats.len(),
                err
            );
            let release = self
                .with_trip(&req.trip_id, |trip, now| {
                    trip.ledger.sweep_expired(now);
                    trip.ledger.release_booked(&seats);
                    Ok(())
                })
                .await;
            if let Err(release_err) = release {
                warn!(
                    "seat rollback failed for trip {}: {}",
                    booking.trip_id, release_err
                );
            }
            return Err(err.into());
        }

        info!(
            "booking {} confirmed for user {} on trip {} ({} seats)",
            booking.id,
            caller.id,
            booking.trip_id,
            booking.seats.len()
        );
        self.publish(LedgerEvent::BookingConfirmed(BookingConfirmedEvent {
            trip_id: booking.trip_id.clone(),
            booking_id: booking.id,
            seats: booking.seats.clone(),
            timestamp: Utc::now().timestamp(),
        }));
        Ok(booking)
    }

    pub async fn cancel(&self, caller: &Caller, req: CancelRequest) -> ReservationResult<Booking> {
        // 1. Validate and authorize against the stored booking.
        let reason = req.validate()?;
        let mut booking = self.bookings.get_booking(req.booking_id).await?;
        if !caller.can_manage(&booking.user_id) {
            return Err(ReservationError::Forbidden(
                "not allowed to cancel this booking".to_string(),
            ));
        }
        if booking.is_cancelled() {
            return Err(ReservationError::AlreadyCancelled);
        }

        // 2. Quote the refund against the live departure when the trip still
        //    exists; a delayed trip widens the refund window on purpose.
        let departure = match self.trips.get_trip(&booking.trip_id).await {
            Ok(trip) => trip.schedule.departure,
            Err(StoreError::TripNotFound(_)) => booking.schedule_snapshot.departure,
            Err(err) => return Err(err.into()),
        };
        let now = Utc::now();
        let quote = self
            .refund_policy
            .quote(booking.payment.final_amount, departure, now);

        // 3. Free the seats first. If the guarded booking write below loses a
        //    race, releasing already-free seats was a no-op anyway.
        let seats = booking.seats.clone();
        match self
            .with_trip(&booking.trip_id, |trip, now| {
                trip.ledger.sweep_expired(now);
                trip.ledger.release_booked(&seats);
                Ok(())
            })
            .await
        {
            Ok(()) | Err(ReservationError::TripNotFound(_)) => {}
            Err(err) => return Err(err),
        }

        // 4. Flip the booking, guarded against a concurrent cancel.
        booking.cancel(CancellationRecord {
            cancelled_at: now,
            reason,
            refund_percentage: quote.percentage,
            refund_amount: quote.amount,
            refund_status: quote.status,
            estimated_refund_date: quote.estimated_refund_date,
        });
        self.bookings
            .update_booking(&booking, BookingStatus::Confirmed)
            .await?;

        info!(
            "booking {} cancelled by {} ({}% refund, {} minor units)",
            booking.id, caller.id, quote.percentage, quote.amount
        );
        self.publish(LedgerEvent::BookingCancelled(BookingCancelledEvent {
            trip_id: booking.trip_id.clone(),
            booking_id: booking.id,
            seats: booking.seats.clone(),
            refund_amount: quote.amount,
            timestamp: Utc::now().timestamp(),
        }));
        Ok(booking)
    }

    /// Sweep expired holds off one trip. Correctness never depends on this
    /// being called; it only reclaims ledger space and makes availability
    /// views tidier.
    pub async fn release_expired_holds(&self, trip_id: &str) -> ReservationResult<u32> {
        for attempt in 0..MAX_CAS_RETRIES {
            let now = Utc::now();
            let mut trip = self.trips.get_trip(trip_id).await?;
            let expected = trip.version;
            let released = trip.ledger.sweep_expired(now);
            if released == 0 {
                return Ok(0);
            }
            match self.trips.update_trip(&trip, expected).await {
                Ok(()) => {
                    info!("released {} expired hold(s) on trip {}", released, trip_id);
                    self.publish(LedgerEvent::HoldsReleased(HoldsReleasedEvent {
                        trip_id: trip_id.to_string(),
                        released,
                        timestamp: Utc::now().timestamp(),
                    }));
                    return Ok(released);
                }
                Err(StoreError::VersionConflict(_)) => {
                    debug!("version conflict sweeping trip {} (attempt {})", trip_id, attempt + 1);
                    continue;
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(ReservationError::Contended(trip_id.to_string()))
    }

    // ==================== Schedule disruption ====================

    pub async fn apply_delay(
        &self,
        caller: &Caller,
        req: DelayRequest,
    ) -> ReservationResult<(Trip, DelayRecord)> {
        if !caller.is_admin() {
            return Err(ReservationError::Forbidden(
                "only admins can delay trips".to_string(),
            ));
        }
        let (minutes, reason) = req.validate()?;
        let record_id = Uuid::new_v4();

        let (trip, record, previous) = self
            .with_trip(&req.trip_id, |trip, now| {
                trip.ledger.sweep_expired(now);
                let applied =
                    trip.apply_delay(minutes, reason.clone(), caller.id.clone(), record_id, now);
                let record = DelayRecord::new(
                    record_id,
                    trip.id.clone(),
                    minutes,
                    reason.clone(),
                    caller.id.clone(),
                    &applied,
                    now,
                );
                Ok((trip.clone(), record, applied.previous_record))
            })
            .await?;

        // The trip commit is the source of truth; journal bookkeeping follows.
        if let Some(previous_id) = previous {
            self.delays.deactivate(previous_id).await?;
        }
        self.delays.append(&record).await?;

        info!(
            "trip {} delayed {} min by {} ({})",
            trip.id, minutes, caller.id, record.reason
        );
        self.publish(LedgerEvent::ScheduleDelayed(ScheduleDelayedEvent {
            trip_id: trip.id.clone(),
            delay_minutes: minutes,
            new_departure: trip.schedule.departure,
            new_arrival: trip.schedule.arrival,
            timestamp: Utc::now().timestamp(),
        }));
        Ok((trip, record))
    }

    pub async fn clear_delay(&self, caller: &Caller, trip_id: &str) -> ReservationResult<Trip> {
        if !caller.is_admin() {
            return Err(ReservationError::Forbidden(
                "only admins can clear delays".to_string(),
            ));
        }

        let (trip, cleared) = self
            .with_trip(trip_id, |trip, now| {
                trip.ledger.sweep_expired(now);
                let cleared = trip.clear_delay(now)?;
                Ok((trip.clone(), cleared))
            })
            .await?;

        self.delays.deactivate(cleared.record_id).await?;

        info!("delay cleared on trip {} by {}", trip.id, caller.id);
        self.publish(LedgerEvent::ScheduleRestored(ScheduleRestoredEvent {
            trip_id: trip.id.clone(),
            departure: trip.schedule.departure,
            arrival: trip.schedule.arrival,
            timestamp: Utc::now().timestamp(),
        }));
        Ok(trip)
    }

    // ==================== Booking reads ====================

    /// Ticket view: the booking as sold, owner or admin only.
    pub async fn ticket(&self, caller: &Caller, booking_id: Uuid) -> ReservationResult<Booking> {
        let booking = self.bookings.get_booking(booking_id).await?;
        if !caller.can_manage(&booking.user_id) {
            return Err(ReservationError::Forbidden(
                "not allowed to view this booking".to_string(),
            ));
        }
        Ok(booking)
    }

    pub async fn my_bookings(&self, caller: &Caller) -> ReservationResult<Vec<Booking>> {
        Ok(self
            .bookings
            .list_bookings_for_user(&caller.id, BOOKING_LIST_LIMIT)
            .await?)
    }

    pub async fn all_bookings(&self, caller: &Caller) -> ReservationResult<Vec<Booking>> {
        if !caller.is_admin() {
            return Err(ReservationError::Forbidden(
                "only admins can list all bookings".to_string(),
            ));
        }
        Ok(self.bookings.list_bookings(BOOKING_LIST_LIMIT).await?)
    }

    pub async fn delay_history(&self, caller: &Caller) -> ReservationResult<Vec<DelayRecord>> {
        if !caller.is_admin() {
            return Err(ReservationError::Forbidden(
                "only admins can view the delay journal".to_string(),
            ));
        }
        Ok(self.delays.list_recent(DELAY_HISTORY_LIMIT).await?)
    }
}
