use std::sync::Arc;

use tokio::time::{interval, Duration};
use tracing::{debug, error, info};
use viaro_reservation::ReservationEngine;

use crate::metrics::Metrics;

/// Spawns the background hold sweeper.
///
/// Expired holds are already ignored by every read and reclaimed lazily by
/// writes; the sweeper exists so seat maps converge even on idle trips and
/// so watchers of the event stream hear about released seats promptly.
pub fn spawn_sweeper(
    engine: Arc<ReservationEngine>,
    metrics: Arc<Metrics>,
    interval_seconds: u64,
) {
    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(interval_seconds.max(1)));
        info!("Hold sweeper running every {}s", interval_seconds.max(1));

        loop {
            ticker.tick().await;

            let trip_ids = match engine.trip_ids().await {
                Ok(ids) => ids,
                Err(err) => {
                    error!("Sweeper could not list trips: {}", err);
                    continue;
                }
            };

            for trip_id in trip_ids {
                match engine.release_expired_holds(&trip_id).await {
                    Ok(0) => {}
                    Ok(released) => {
                        metrics.add_released_holds(released);
                        debug!("Sweeper released {} hold(s) on {}", released, trip_id);
                    }
                    Err(err) => error!("Sweep of {} failed: {}", trip_id, err),
                }
            }
        }
    });
}
