pub mod ledger;
pub mod model;

pub use ledger::{SeatHold, SeatLedger};
pub use model::{DelayState, Route, Schedule, Trip, TripDraft, TripFilter, TripStatus};
