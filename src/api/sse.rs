//! The server-push channel: one SSE stream per (room, pid).
//!
//! Every (re)connection starts with a fresh full snapshot; afterwards the
//! stream carries one full snapshot per room mutation, plus heartbeat
//! comments. Teardown goes through the identity-checked unregister so a
//! stale stream can never evict a newer connection for the same pid.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use tokio::sync::mpsc;

use crate::application::game::snapshot::room_snapshot;
use crate::infrastructure::app_state::AppState;
use crate::infrastructure::subscribers::Subscribers;

/// Keep-alive cadence for idle streams.
const HEARTBEAT: Duration = Duration::from_secs(25);

struct ConnectionGuard {
    subscribers: Arc<Subscribers>,
    code: String,
    pid: String,
    conn_id: u64,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.subscribers.unregister(&self.code, &self.pid, self.conn_id);
    }
}

/// GET /api/events/:code/:pid
pub async fn events_handler(
    State(state): State<Arc<AppState>>,
    Path((code, pid)): Path<(String, String)>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let code = code.trim().to_lowercase();

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let conn_id = state.subscribers.register(&code, &pid, tx);
    let guard = ConnectionGuard {
        subscribers: state.subscribers.clone(),
        code: code.clone(),
        pid: pid.clone(),
        conn_id,
    };

    // The first message is always a fresh snapshot, so reconnects recover
    // without any client-side state.
    let initial = match state.rooms.get(&code) {
        Some(slot) => {
            let room = slot.lock().await;
            serde_json::to_string(&room_snapshot(&room, Some(&pid))).ok()
        }
        None => None,
    };

    let stream = async_stream::stream! {
        let _guard = guard;
        tracing::debug!("subscriber {} attached to room {}", pid, code);

        if let Some(snapshot) = initial {
            yield Ok(Event::default().event("snapshot").data(snapshot));
        }

        let mut heartbeat = tokio::time::interval(HEARTBEAT);
        heartbeat.tick().await; // the immediate first tick

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    yield Ok(Event::default().comment("heartbeat"));
                }
                message = rx.recv() => {
                    match message {
                        Some(snapshot) => {
                            yield Ok(Event::default().event("snapshot").data(snapshot));
                        }
                        None => {
                            // Replaced by a newer connection for this pid.
                            tracing::debug!("subscriber {} replaced in room {}", pid, code);
                            break;
                        }
                    }
                }
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}
