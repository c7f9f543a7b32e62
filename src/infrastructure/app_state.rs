//! Application state shared across all handlers.

use std::sync::Arc;

use crate::infrastructure::rooms::RoomRegistry;
use crate::infrastructure::store::RoomStore;
use crate::infrastructure::subscribers::Subscribers;

pub struct AppState {
    /// Authoritative in-memory rooms.
    pub rooms: Arc<RoomRegistry>,
    /// Per-room SSE fan-out.
    pub subscribers: Arc<Subscribers>,
    /// Best-effort durable snapshots.
    pub store: RoomStore,
}

impl AppState {
    /// Boot: connect storage (or degrade), then reload surviving rooms
    /// into the registry.
    pub async fn new() -> anyhow::Result<Self> {
        let store = RoomStore::connect().await;
        let rooms = Arc::new(RoomRegistry::new());
        for room in store.recover().await {
            rooms.insert(room);
        }
        Ok(AppState {
            rooms,
            subscribers: Arc::new(Subscribers::new()),
            store,
        })
    }

}
