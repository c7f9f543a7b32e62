use std::sync::Arc;

use crate::application::publish::publish_room;
use crate::domain::entities::game::Game;
use crate::domain::entities::player::Player;
use crate::domain::entities::room::RoomStatus;
use crate::infrastructure::app_state::AppState;

pub struct StartGameInput {
    pub code: String,
    pub pid: String,
    pub slamdowns_allowed: Option<bool>,
}

pub struct StartGameOutput {
    /// The opening turn belongs to an AI seat; the caller should kick the
    /// room's worker.
    pub ai_turn: bool,
}

/// Deal the first hand and move the room to `playing`.
pub struct StartGame {
    state: Arc<AppState>,
}

impl StartGame {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    pub async fn execute(&self, input: StartGameInput) -> Result<StartGameOutput, StartGameError> {
        let code = input.code.trim().to_lowercase();
        let slot = self
            .state
            .rooms
            .get(&code)
            .ok_or(StartGameError::RoomNotFound)?;
        let mut room = slot.lock().await;

        if room.member(&input.pid).is_none() {
            return Err(StartGameError::NotAMember);
        }
        if room.creator_pid() != Some(input.pid.as_str()) {
            return Err(StartGameError::NotCreator);
        }
        if !room.can_start() {
            return Err(if room.status != RoomStatus::Waiting {
                StartGameError::AlreadyStarted
            } else {
                StartGameError::NotEnoughPlayers
            });
        }

        if let Some(requested) = input.slamdowns_allowed {
            room.options.slamdowns_allowed = requested && !room.has_ai_member();
        }

        let players: Vec<Player> = room
            .members
            .iter()
            .map(|m| {
                if m.is_ai {
                    Player::ai(m.pid.clone(), m.name.clone())
                } else {
                    Player::human(m.pid.clone(), m.name.clone())
                }
            })
            .collect();

        let mut game = Game::new(players, room.effective_slamdowns(), None);
        game.start_game();
        let ai_turn = game.current_player().is_ai();

        room.game = Some(game);
        room.status = RoomStatus::Playing;
        room.winner = None;
        room.last_turn = None;
        room.last_round = None;
        room.round_banner_turns_left = 0;

        tracing::info!("room {} started with {} players", code, room.members.len());
        publish_room(&self.state, &room).await;

        Ok(StartGameOutput { ai_turn })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StartGameError {
    #[error("room not found")]
    RoomNotFound,
    #[error("not a member of this room")]
    NotAMember,
    #[error("only the room creator can start the game")]
    NotCreator,
    #[error("need at least 2 players to start")]
    NotEnoughPlayers,
    #[error("game already started")]
    AlreadyStarted,
}
