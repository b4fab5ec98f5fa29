//! Server-sent change notifications
//!
//! Views keep one `GET /api/events` stream open and re-read the affected
//! collection whenever an event arrives.

use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use taskdesk_core::events::Notification;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tokio_stream::{Stream, StreamExt};

use crate::state::AppState;

fn to_event(notification: &Notification) -> Event {
    let event = Event::default().event(notification.name());
    match notification {
        Notification::TasksUpdated => event.data("{}"),
        Notification::ProfileUpdated(user) => event
            .json_data(user)
            .unwrap_or_else(|_| Event::default().event(notification.name()).data("{}")),
        Notification::StorageChanged { key } => event.data(key.as_str()),
    }
}

/// GET /api/events
async fn stream_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.ctx().events().subscribe();
    tracing::debug!("event stream opened");

    let stream = BroadcastStream::new(rx).filter_map(|item| match item {
        Ok(notification) => Some(Ok(to_event(&notification))),
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::warn!(skipped, "event stream lagged");
            None
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/events", get(stream_events))
}
