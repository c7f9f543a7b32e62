use std::sync::Arc;

use crate::application::publish::publish_room;
use crate::domain::entities::room::RoomStatus;
use crate::infrastructure::app_state::AppState;

pub struct PlayAgainInput {
    pub code: String,
    pub pid: String,
}

pub struct PlayAgainOutput {
    pub next_room: String,
}

/// Spin up a rematch room with the same seats and options. Idempotent:
/// repeat calls return the room already created.
pub struct PlayAgain {
    state: Arc<AppState>,
}

impl PlayAgain {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    pub async fn execute(&self, input: PlayAgainInput) -> Result<PlayAgainOutput, PlayAgainError> {
        let code = input.code.trim().to_lowercase();
        let slot = self
            .state
            .rooms
            .get(&code)
            .ok_or(PlayAgainError::RoomNotFound)?;
        let mut room = slot.lock().await;

        if room.member(&input.pid).is_none() {
            return Err(PlayAgainError::NotAMember);
        }
        if room.status != RoomStatus::Finished {
            return Err(PlayAgainError::NotFinished);
        }

        if let Some(next) = &room.next_room {
            return Ok(PlayAgainOutput {
                next_room: next.clone(),
            });
        }

        // The finished room's lock is held throughout, so concurrent
        // playAgain calls serialize and agree on one rematch code.
        let (next_code, next_slot) = self.state.rooms.create();
        {
            let mut next = next_slot.lock().await;
            next.members = room.members.clone();
            next.options = room.options;
            publish_room(&self.state, &next).await;
        }

        room.next_room = Some(next_code.clone());
        tracing::info!("room {} rematches into {}", code, next_code);
        publish_room(&self.state, &room).await;

        Ok(PlayAgainOutput {
            next_room: next_code,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PlayAgainError {
    #[error("room not found")]
    RoomNotFound,
    #[error("not a member of this room")]
    NotAMember,
    #[error("the game has not finished")]
    NotFinished,
}
