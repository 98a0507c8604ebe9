use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use viaro_api::{app, metrics::Metrics, sweeper, AppState, AuthConfig};
use viaro_reservation::{MemoryStore, ReservationEngine};
use viaro_store::{Config, DbClient, PgStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "viaro_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;

    // Postgres when a database URL is configured, otherwise the in-memory
    // store. The engine only sees the trait objects either way.
    let engine = match &config.database.url {
        Some(url) => {
            let db = DbClient::new(url).await?;
            db.migrate().await?;
            let store = Arc::new(PgStore::new(db.pool.clone()));
            tracing::info!("Connected to Postgres");
            Arc::new(ReservationEngine::new(
                store.clone(),
                store.clone(),
                store,
                config.business_rules.refund.clone(),
                config.business_rules.seat_hold_seconds,
            ))
        }
        None => {
            tracing::warn!("No database configured, running on the in-memory store");
            let store = Arc::new(MemoryStore::new());
            Arc::new(ReservationEngine::new(
                store.clone(),
                store.clone(),
                store,
                config.business_rules.refund.clone(),
                config.business_rules.seat_hold_seconds,
            ))
        }
    };

    let metrics = Arc::new(Metrics::new()?);

    if config.sweeper.enabled {
        sweeper::spawn_sweeper(
            engine.clone(),
            metrics.clone(),
            config.sweeper.interval_seconds,
        );
    }

    let state = AppState {
        engine,
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
        },
        metrics,
    };

    let app = app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Viaro API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
