//! The global room registry.
//!
//! Only this type inserts or removes room codes. Each room lives in its own
//! async mutex slot; the registry map itself is only ever locked for quick
//! lookups and insertions, never across I/O.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tokio::sync::Mutex;

use crate::domain::entities::room::{generate_room_code, Room};

pub struct RoomRegistry {
    rooms: RwLock<HashMap<String, Arc<Mutex<Room>>>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        RoomRegistry {
            rooms: RwLock::new(HashMap::new()),
        }
    }

    /// Create a room under a fresh code. Collisions regenerate.
    pub fn create(&self) -> (String, Arc<Mutex<Room>>) {
        let mut rooms = self.rooms.write().unwrap();
        let code = loop {
            let candidate = generate_room_code();
            if !rooms.contains_key(&candidate) {
                break candidate;
            }
        };
        let slot = Arc::new(Mutex::new(Room::new(code.clone())));
        rooms.insert(code.clone(), slot.clone());
        (code, slot)
    }

    /// Re-insert a recovered room under its persisted code.
    pub fn insert(&self, room: Room) -> Arc<Mutex<Room>> {
        let mut rooms = self.rooms.write().unwrap();
        let code = room.code.clone();
        let slot = Arc::new(Mutex::new(room));
        rooms.insert(code, slot.clone());
        slot
    }

    pub fn get(&self, code: &str) -> Option<Arc<Mutex<Room>>> {
        self.rooms.read().unwrap().get(code).cloned()
    }

    pub fn remove(&self, code: &str) {
        self.rooms.write().unwrap().remove(code);
    }

    pub fn codes(&self) -> Vec<String> {
        self.rooms.read().unwrap().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.rooms.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_yields_unique_codes() {
        let registry = RoomRegistry::new();
        let (a, _) = registry.create();
        let (b, _) = registry.create();
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
        assert!(registry.get(&a).is_some());
    }

    #[tokio::test]
    async fn test_remove_drops_slot() {
        let registry = RoomRegistry::new();
        let (code, _) = registry.create();
        registry.remove(&code);
        assert!(registry.get(&code).is_none());
    }

    #[tokio::test]
    async fn test_insert_keeps_persisted_code() {
        let registry = RoomRegistry::new();
        let slot = registry.insert(Room::new("abcde"));
        assert_eq!(slot.lock().await.code, "abcde");
        assert!(registry.get("abcde").is_some());
    }
}
