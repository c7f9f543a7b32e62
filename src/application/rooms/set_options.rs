use std::sync::Arc;

use crate::application::publish::publish_room;
use crate::domain::entities::room::{RoomOptions, RoomStatus};
use crate::infrastructure::app_state::AppState;

pub struct SetOptionsInput {
    pub code: String,
    pub pid: String,
    pub slamdowns_allowed: bool,
}

pub struct SetOptionsOutput {
    pub options: RoomOptions,
}

/// Creator-only, pre-start option changes. Slamdowns silently collapse to
/// off when any seat is AI.
pub struct SetOptions {
    state: Arc<AppState>,
}

impl SetOptions {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    pub async fn execute(&self, input: SetOptionsInput) -> Result<SetOptionsOutput, SetOptionsError> {
        let code = input.code.trim().to_lowercase();
        let slot = self
            .state
            .rooms
            .get(&code)
            .ok_or(SetOptionsError::RoomNotFound)?;
        let mut room = slot.lock().await;

        if room.member(&input.pid).is_none() {
            return Err(SetOptionsError::NotAMember);
        }
        if room.creator_pid() != Some(input.pid.as_str()) {
            return Err(SetOptionsError::NotCreator);
        }
        if room.status != RoomStatus::Waiting {
            return Err(SetOptionsError::AlreadyStarted);
        }

        room.options.slamdowns_allowed = input.slamdowns_allowed && !room.has_ai_member();
        let options = room.options;
        publish_room(&self.state, &room).await;

        Ok(SetOptionsOutput { options })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SetOptionsError {
    #[error("room not found")]
    RoomNotFound,
    #[error("not a member of this room")]
    NotAMember,
    #[error("only the room creator can change options")]
    NotCreator,
    #[error("options are locked once the game starts")]
    AlreadyStarted,
}
