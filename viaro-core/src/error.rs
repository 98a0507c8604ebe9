use uuid::Uuid;

/// Coarse classification used by transport layers (HTTP status mapping) and
/// by callers deciding whether to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The referenced trip or booking does not exist.
    NotFound,
    /// A business rule rejected the operation against current state.
    Conflict,
    /// The request itself is malformed.
    InvalidInput,
    /// The caller is not allowed to perform the operation.
    Unauthorized,
    /// A stated precondition (e.g. completed payment) does not hold.
    PreconditionFailed,
    /// Infrastructure trouble or contention; safe to retry with backoff.
    Unavailable,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::PreconditionFailed => "precondition_failed",
            ErrorKind::Unavailable => "unavailable",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReservationError {
    #[error("Trip not found: {0}")]
    TripNotFound(String),
    #[error("Trip already exists: {0}")]
    DuplicateTrip(String),
    #[error("Booking not found: {0}")]
    BookingNotFound(Uuid),
    #[error("Seat {seat} is already booked")]
    SeatAlreadyBooked { seat: String },
    #[error("Seat {seat} is temporarily held by another user")]
    SeatHeldByOther { seat: String },
    #[error("Seats unavailable: {}", seats.join(", "))]
    SeatsUnavailable { seats: Vec<String> },
    #[error("Not enough seats left: requested {requested}, available {available}")]
    CapacityExceeded { requested: u32, available: u32 },
    #[error("Payment not completed")]
    PaymentNotCompleted,
    #[error("Booking is already cancelled")]
    AlreadyCancelled,
    #[error("Trip is not currently delayed")]
    NotDelayed,
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Not authorized: {0}")]
    Forbidden(String),
    #[error("Storage unavailable: {0}")]
    Storage(String),
    #[error("Operation contended, retries exhausted for trip {0}")]
    Contended(String),
}

impl ReservationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReservationError::TripNotFound(_) | ReservationError::BookingNotFound(_) => {
                ErrorKind::NotFound
            }
            ReservationError::DuplicateTrip(_)
            | ReservationError::SeatAlreadyBooked { .. }
            | ReservationError::SeatHeldByOther { .. }
            | ReservationError::SeatsUnavailable { .. }
            | ReservationError::CapacityExceeded { .. }
            | ReservationError::AlreadyCancelled
            | ReservationError::NotDelayed => ErrorKind::Conflict,
            ReservationError::Validation(_) => ErrorKind::InvalidInput,
            ReservationError::Forbidden(_) => ErrorKind::Unauthorized,
            ReservationError::PaymentNotCompleted => ErrorKind::PreconditionFailed,
            ReservationError::Storage(_) | ReservationError::Contended(_) => ErrorKind::Unavailable,
        }
    }

    /// Whether a caller may reasonably retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Unavailable
    }
}

pub type ReservationResult<T> = Result<T, ReservationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_as_documented() {
        assert_eq!(
            ReservationError::TripNotFound("TRP-x".into()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            ReservationError::SeatAlreadyBooked { seat: "A1".into() }.kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            ReservationError::PaymentNotCompleted.kind(),
            ErrorKind::PreconditionFailed
        );
        assert_eq!(
            ReservationError::Storage("db down".into()).kind(),
            ErrorKind::Unavailable
        );
        assert!(ReservationError::Contended("TRP-x".into()).is_retryable());
        assert!(!ReservationError::AlreadyCancelled.is_retryable());
    }

    #[test]
    fn seat_list_renders_in_message() {
        let err = ReservationError::SeatsUnavailable {
            seats: vec!["A1".into(), "B2".into()],
        };
        assert_eq!(err.to_string(), "Seats unavailable: A1, B2");
    }
}
