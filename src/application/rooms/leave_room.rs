use std::sync::Arc;

use crate::application::publish::publish_room;
use crate::domain::entities::room::RoomStatus;
use crate::infrastructure::app_state::AppState;

pub struct LeaveRoomInput {
    pub code: String,
    pub pid: String,
}

/// Leave a waiting or finished room. The creator seat hands off to the
/// next member; an emptied room is removed entirely.
pub struct LeaveRoom {
    state: Arc<AppState>,
}

impl LeaveRoom {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    pub async fn execute(&self, input: LeaveRoomInput) -> Result<(), LeaveRoomError> {
        let code = input.code.trim().to_lowercase();
        let slot = self
            .state
            .rooms
            .get(&code)
            .ok_or(LeaveRoomError::RoomNotFound)?;
        let mut room = slot.lock().await;

        if room.member(&input.pid).is_none() {
            return Err(LeaveRoomError::NotAMember);
        }
        if room.status == RoomStatus::Playing {
            return Err(LeaveRoomError::GameInProgress);
        }

        room.members.retain(|m| m.pid != input.pid);

        // A room of nothing but AI seats has nobody left to act for it.
        if room.members.iter().all(|m| m.is_ai) {
            let code = room.code.clone();
            drop(room);
            self.state.rooms.remove(&code);
            self.state.store.delete_room(&code).await;
            tracing::info!("room {} emptied and removed", code);
            return Ok(());
        }

        publish_room(&self.state, &room).await;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LeaveRoomError {
    #[error("room not found")]
    RoomNotFound,
    #[error("not a member of this room")]
    NotAMember,
    #[error("cannot leave while the game is playing")]
    GameInProgress,
}
