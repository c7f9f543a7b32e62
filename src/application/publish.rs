//! The snapshot -> persist -> fan-out tail of every mutation.
//!
//! Called while the caller still holds the room lock, so subscribers see
//! room states in exactly the order mutations applied. Persistence is best
//! effort; the in-memory room is the authority.

use crate::application::game::snapshot::room_snapshot;
use crate::domain::entities::room::Room;
use crate::infrastructure::app_state::AppState;

pub async fn publish_room(state: &AppState, room: &Room) {
    let payloads: Vec<(String, String)> = state
        .subscribers
        .pids(&room.code)
        .into_iter()
        .filter_map(|pid| {
            serde_json::to_string(&room_snapshot(room, Some(&pid)))
                .ok()
                .map(|json| (pid, json))
        })
        .collect();

    state.store.save_room(room).await;
    state.subscribers.push(&room.code, &payloads);
}
