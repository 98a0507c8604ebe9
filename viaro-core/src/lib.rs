pub mod error;
pub mod identity;
pub mod payment;

pub use error::{ErrorKind, ReservationError, ReservationResult};
