use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    Extension,
};
use futures_util::{Stream, StreamExt};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use viaro_core::identity::Caller;
use viaro_shared::models::events::LedgerEvent;

use crate::error::AppError;
use crate::state::AppState;

/// GET /v1/trips/{id}/stream
///
/// Server-sent events carrying every ledger change for one trip. All events
/// are named `ledger`; the payload's `type` field identifies the change.
pub async fn trip_stream(
    State(state): State<AppState>,
    Path(trip_id): Path<String>,
    Extension(_caller): Extension<Caller>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    // Unknown trips get a 404 up front instead of a silently empty stream.
    state.engine.get_trip(&trip_id).await?;

    let rx: broadcast::Receiver<LedgerEvent> = state.engine.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(move |result| {
        let trip_id = trip_id.clone();
        async move {
            match result {
                Ok(event) if event.trip_id() == trip_id => {
                    let data = serde_json::to_string(&event).ok()?;
                    Some(Ok::<_, Infallible>(
                        Event::default().event("ledger").data(data),
                    ))
                }
                // Events for other trips and lagged receivers are skipped.
                _ => None,
            }
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
