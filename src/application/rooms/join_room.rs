use std::sync::Arc;

use uuid::Uuid;

use crate::application::publish::publish_room;
use crate::domain::entities::player::clamp_name;
use crate::domain::entities::room::{Member, RoomStatus};
use crate::infrastructure::app_state::AppState;

/// Seats cap, AI included.
pub const MAX_MEMBERS: usize = 8;

pub struct JoinRoomInput {
    pub code: String,
    pub pid: Option<String>,
    pub name: String,
}

pub struct JoinRoomOutput {
    pub code: String,
    pub pid: String,
}

/// Join a waiting room, or rejoin one the pid already belongs to.
pub struct JoinRoom {
    state: Arc<AppState>,
}

impl JoinRoom {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    pub async fn execute(&self, input: JoinRoomInput) -> Result<JoinRoomOutput, JoinRoomError> {
        let code = input.code.trim().to_lowercase();
        let slot = self
            .state
            .rooms
            .get(&code)
            .ok_or(JoinRoomError::RoomNotFound)?;
        let mut room = slot.lock().await;

        let pid = input
            .pid
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        // A returning member just picks their seat back up.
        if room.member(&pid).is_some() {
            return Ok(JoinRoomOutput { code, pid });
        }

        if room.status != RoomStatus::Waiting {
            return Err(JoinRoomError::AlreadyStarted);
        }
        if room.members.len() >= MAX_MEMBERS {
            return Err(JoinRoomError::RoomFull);
        }
        let name = clamp_name(input.name);
        if name.is_empty() {
            return Err(JoinRoomError::Validation("name is required".into()));
        }

        room.members.push(Member {
            pid: pid.clone(),
            name,
            is_ai: false,
        });
        publish_room(&self.state, &room).await;

        Ok(JoinRoomOutput { code, pid })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JoinRoomError {
    #[error("room not found")]
    RoomNotFound,
    #[error("game already started")]
    AlreadyStarted,
    #[error("room is full")]
    RoomFull,
    #[error("{0}")]
    Validation(String),
}
