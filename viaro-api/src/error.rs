use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use viaro_core::{ErrorKind, ReservationError};

/// Application-wide error type for API handlers.
pub enum AppError {
    /// Domain error surfaced by the reservation engine
    Reservation(ReservationError),
    /// Catch-all for internal errors
    Anyhow(anyhow::Error),
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::Unauthorized => StatusCode::FORBIDDEN,
        ErrorKind::PreconditionFailed => StatusCode::PRECONDITION_FAILED,
        ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            // Storage and contention details stay in the logs, not the body.
            AppError::Reservation(err) if err.kind() == ErrorKind::Unavailable => {
                tracing::error!("Backend unavailable: {:?}", err);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Service temporarily unavailable".to_string(),
                )
            }
            AppError::Reservation(err) => (status_for(err.kind()), err.to_string()),
            AppError::Anyhow(err) => {
                tracing::error!("Internal server error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<ReservationError> for AppError {
    fn from(err: ReservationError) -> Self {
        Self::Reservation(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Anyhow(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_documented_statuses() {
        let cases = [
            (
                ReservationError::TripNotFound("TRP-1".into()),
                StatusCode::NOT_FOUND,
            ),
            (
                ReservationError::SeatAlreadyBooked { seat: "A1".into() },
                StatusCode::CONFLICT,
            ),
            (
                ReservationError::Validation("bad".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                ReservationError::Forbidden("nope".into()),
                StatusCode::FORBIDDEN,
            ),
            (
                ReservationError::PaymentNotCompleted,
                StatusCode::PRECONDITION_FAILED,
            ),
            (
                ReservationError::Storage("db down".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];

        for (err, expected) in cases {
            let response = AppError::Reservation(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[tokio::test]
    async fn storage_detail_is_not_leaked() {
        let response =
            AppError::Reservation(ReservationError::Storage("password=hunter2".into()))
                .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Service temporarily unavailable");
    }
}
