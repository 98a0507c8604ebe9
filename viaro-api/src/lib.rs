use axum::{
    extract::State,
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod admin;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod reservations;
pub mod state;
pub mod stream;
pub mod sweeper;
pub mod trips;

pub use state::{AppState, AuthConfig};

use crate::middleware::auth::{admin_auth_middleware, auth_middleware};

/// Builds the full application router.
///
/// Three tiers: public discovery endpoints, customer endpoints behind token
/// auth, and admin endpoints behind token auth plus a role check.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let public = Router::new()
        .route("/health", get(health_check))
        .route("/v1/trips", get(trips::search_trips))
        .route("/v1/trips/{id}", get(trips::get_trip))
        .route("/v1/trips/{id}/availability", get(trips::get_availability))
        .route("/metrics", get(metrics_handler));

    let customer = Router::new()
        .route("/v1/trips/{id}/hold", post(reservations::hold_seats))
        .route("/v1/trips/{id}/book", post(reservations::book_seats))
        .route("/v1/trips/{id}/stream", get(stream::trip_stream))
        .route("/v1/bookings/{id}/cancel", post(reservations::cancel_booking))
        .route("/v1/bookings/{id}/ticket", get(reservations::get_ticket))
        .route("/v1/me/bookings", get(reservations::my_bookings))
        .layer(from_fn_with_state(state.clone(), auth_middleware));

    let admin = Router::new()
        .route("/v1/trips", post(trips::create_trip))
        .route(
            "/v1/trips/{id}/delay",
            put(admin::delay_trip).delete(admin::clear_trip_delay),
        )
        .route("/v1/admin/bookings", get(admin::all_bookings))
        .route("/v1/admin/delays", get(admin::delay_history))
        .route(
            "/v1/admin/trips/{id}/release-holds",
            post(admin::release_holds),
        )
        .layer(from_fn_with_state(state.clone(), admin_auth_middleware));

    Router::new()
        .merge(public)
        .merge(customer)
        .merge(admin)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health
async fn health_check() -> &'static str {
    "OK"
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> Result<String, error::AppError> {
    let body = state.metrics.export().map_err(anyhow::Error::new)?;
    Ok(body)
}
