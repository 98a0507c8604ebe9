use std::sync::Arc;

use viaro_reservation::ReservationEngine;

use crate::metrics::Metrics;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ReservationEngine>,
    pub auth: AuthConfig,
    pub metrics: Arc<Metrics>,
}

/// Authentication configuration for verifying bearer tokens.
#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
}
