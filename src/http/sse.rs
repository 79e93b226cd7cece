//! Streaming transport: `GET /sse` opens a session and streams JSON-RPC
//! responses back as Server-Sent Events; the client posts requests to the
//! advertised `/message` URL.

use super::AppState;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{self, Stream};
use std::convert::Infallible;
use std::time::Duration;

/// Heartbeat cadence for the `:ping` SSE comment line.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Drops the session when the SSE stream ends (client disconnect, idle
/// reaper, or process shutdown), so in-flight tool calls bound to it can
/// be cancelled.
struct SessionGuard {
    sessions: crate::session::SessionManager,
    session_id: String,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.sessions.close(&self.session_id);
    }
}

pub async fn handler(State(state): State<AppState>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (session_id, rx) = state.core.sessions().open();
    state.core.sessions().mark_attached(&session_id);
    tracing::info!(session_id = %session_id, "sse session opened");

    let endpoint_event = Event::default().event("endpoint").data(format!("/message?sessionId={session_id}"));
    let endpoint_stream = stream::once(async move { Ok(endpoint_event) });

    let guard = SessionGuard { sessions: state.core.sessions().clone(), session_id };
    let message_stream = stream::unfold((rx, guard), |(mut rx, guard)| async move {
        rx.recv().await.map(|frame| {
            let data = serde_json::to_string(&frame).unwrap_or_default();
            (Ok(Event::default().event("message").data(data)), (rx, guard))
        })
    });

    Sse::new(endpoint_stream.chain(message_stream)).keep_alive(KeepAlive::new().interval(HEARTBEAT_INTERVAL).text("ping"))
}
