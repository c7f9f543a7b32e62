use std::sync::Arc;

use uuid::Uuid;

use crate::application::publish::publish_room;
use crate::domain::entities::player::clamp_name;
use crate::domain::entities::room::Member;
use crate::infrastructure::app_state::AppState;

/// Most AI seats a room can hold.
pub const MAX_AI_COUNT: usize = 3;

pub struct CreateRoomInput {
    pub name: String,
    pub pid: Option<String>,
    pub ai_count: usize,
}

pub struct CreateRoomOutput {
    pub code: String,
    pub pid: String,
}

/// Create a room and seat the creator plus any requested AI players.
pub struct CreateRoom {
    state: Arc<AppState>,
}

impl CreateRoom {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    pub async fn execute(&self, input: CreateRoomInput) -> Result<CreateRoomOutput, CreateRoomError> {
        let name = clamp_name(input.name);
        if name.is_empty() {
            return Err(CreateRoomError::Validation("name is required".into()));
        }
        if input.ai_count > MAX_AI_COUNT {
            return Err(CreateRoomError::Validation(format!(
                "aiCount must be 0..{}",
                MAX_AI_COUNT
            )));
        }

        let pid = input
            .pid
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let (code, slot) = self.state.rooms.create();
        let mut room = slot.lock().await;
        room.members.push(Member {
            pid: pid.clone(),
            name,
            is_ai: false,
        });
        for i in 0..input.ai_count {
            room.members.push(Member {
                pid: Uuid::new_v4().to_string(),
                name: format!("CPU {}", i + 1),
                is_ai: true,
            });
        }

        tracing::info!("room {} created by {}", code, pid);
        publish_room(&self.state, &room).await;

        Ok(CreateRoomOutput { code, pid })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CreateRoomError {
    #[error("{0}")]
    Validation(String),
}
