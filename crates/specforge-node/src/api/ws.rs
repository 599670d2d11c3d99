//! WebSocket event stream.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures::StreamExt;
use serde::Deserialize;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tracing::warn;
use uuid::Uuid;

use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct EventFilter {
    /// Only forward events for this run.
    pub run_id: Option<Uuid>,
}

/// Pipeline event stream.
pub async fn event_stream(
    ws: WebSocketUpgrade,
    Query(filter): Query<EventFilter>,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_event_stream(socket, filter, state))
}

async fn handle_event_stream(mut socket: WebSocket, filter: EventFilter, state: AppState) {
    let mut events = BroadcastStream::new(state.events.subscribe());

    // Subscribed: anything emitted from now on is delivered.
    let hello = serde_json::json!({
        "type": "connected",
        "message": "Connected to event stream"
    });
    if socket.send(Message::Text(hello.to_string())).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            event = events.next() => {
                match event {
                    Some(Ok(event)) => {
                        if filter.run_id.is_some_and(|id| id != event.run_id()) {
                            continue;
                        }
                        let Ok(json) = serde_json::to_string(&event) else {
                            continue;
                        };
                        if socket.send(Message::Text(json)).await.is_err() {
                            break;
                        }
                    }
                    Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                        warn!(skipped, "event subscriber lagged");
                    }
                    None => break,
                }
            }
            _ = state.shutdown.cancelled() => {
                let _ = socket.send(Message::Close(None)).await;
                break;
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    Some(Ok(Message::Ping(data))) => {
                        let _ = socket.send(Message::Pong(data)).await;
                    }
                    _ => {}
                }
            }
        }
    }
}
