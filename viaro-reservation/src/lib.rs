pub mod booking;
pub mod delay;
pub mod engine;
pub mod memory;
pub mod refund;
pub mod repository;
pub mod requests;

pub use booking::{
    Booking, BookingStatus, CancellationRecord, ContactDetails, RefundStatus, ScheduleSnapshot,
};
pub use delay::DelayRecord;
pub use engine::{AvailabilityView, HoldReceipt, ReservationEngine};
pub use memory::MemoryStore;
pub use refund::{RefundPolicy, RefundQuote, RefundTier};
pub use repository::{BookingStore, DelayLedger, StoreError, TripStore};
pub use requests::{CancelRequest, ConfirmRequest, DelayRequest, HoldRequest};
