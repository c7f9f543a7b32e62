use std::sync::Arc;

use crate::application::game::turn_record;
use crate::application::publish::publish_room;
use crate::domain::entities::game::{
    DrawSource, IllegalAction, TurnAction, YanivOutcome,
};
use crate::domain::entities::room::{DrawKind, RoomStatus, TurnRecord};
use crate::domain::value_objects::card::{Card, CardView};
use crate::infrastructure::app_state::AppState;

/// The three things a client can do on the action endpoint.
pub enum ActionKind {
    Play { discard: Vec<u8>, draw: DrawRequest },
    DeclareYaniv,
    DeclareSlamdown,
}

pub enum DrawRequest {
    Deck,
    Pile(usize),
}

pub struct SubmitActionInput {
    pub code: String,
    pub pid: String,
    pub kind: ActionKind,
}

pub struct SubmitActionOutput {
    /// The turn has passed to an AI seat; the caller should kick the
    /// room's worker.
    pub ai_turn: bool,
}

enum Applied {
    Turn(TurnRecord, bool),
    Round(YanivOutcome),
    Slam(TurnRecord),
}

/// Apply one player action as a single atomic unit: mutate, record,
/// publish.
pub struct SubmitAction {
    state: Arc<AppState>,
}

impl SubmitAction {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    pub async fn execute(
        &self,
        input: SubmitActionInput,
    ) -> Result<SubmitActionOutput, SubmitActionError> {
        let code = input.code.trim().to_lowercase();
        let slot = self
            .state
            .rooms
            .get(&code)
            .ok_or(SubmitActionError::RoomNotFound)?;
        let mut room = slot.lock().await;

        if room.status != RoomStatus::Playing {
            return Err(SubmitActionError::NotPlaying);
        }

        let applied = {
            let game = room.game.as_mut().ok_or(SubmitActionError::NotPlaying)?;
            let seat = game
                .players
                .iter()
                .position(|p| p.pid == input.pid)
                .ok_or(SubmitActionError::NotSeated)?;

            match input.kind {
                ActionKind::Play { discard, draw } => {
                    if seat != game.current_player_index {
                        return Err(SubmitActionError::NotYourTurn);
                    }
                    let cards = discard
                        .iter()
                        .map(|&id| Card::from_id(id))
                        .collect::<Option<Vec<Card>>>()
                        .ok_or_else(|| SubmitActionError::Validation("unknown card id".into()))?;
                    game.start_turn();
                    let action = TurnAction {
                        discard: cards,
                        draw: match draw {
                            DrawRequest::Deck => DrawSource::Deck,
                            DrawRequest::Pile(i) => DrawSource::Pile(i),
                        },
                    };
                    let outcome = game.play_turn(&action)?;
                    let ai_next = game.current_player().is_ai();
                    Applied::Turn(turn_record(&outcome), ai_next)
                }
                ActionKind::DeclareYaniv => {
                    if seat != game.current_player_index {
                        return Err(SubmitActionError::NotYourTurn);
                    }
                    Applied::Round(game.declare_yaniv(seat)?)
                }
                ActionKind::DeclareSlamdown => {
                    let card = game.perform_slamdown(seat)?;
                    let actor = game.players[seat].name.clone();
                    Applied::Slam(TurnRecord {
                        actor,
                        discarded: vec![CardView::from(card)],
                        draw_source: DrawKind::Slamdown,
                        drawn: None,
                    })
                }
            }
        };

        let mut ai_turn = false;
        match applied {
            Applied::Turn(record, ai_next) => {
                room.note_turn(record);
                ai_turn = ai_next;
            }
            Applied::Round(outcome) => {
                room.note_round(outcome.result);
                match outcome.winner {
                    Some(winner) => {
                        room.status = RoomStatus::Finished;
                        room.winner = Some(winner);
                    }
                    None => {
                        ai_turn = room
                            .game
                            .as_ref()
                            .map(|g| g.current_player().is_ai())
                            .unwrap_or(false);
                    }
                }
            }
            Applied::Slam(record) => {
                // A slamdown is a bonus discard, not a turn: the banner
                // clock does not tick.
                room.last_turn = Some(record);
            }
        }

        publish_room(&self.state, &room).await;
        Ok(SubmitActionOutput { ai_turn })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitActionError {
    #[error("room not found")]
    RoomNotFound,
    #[error("the game is not running")]
    NotPlaying,
    #[error("not seated in this game")]
    NotSeated,
    #[error("not your turn")]
    NotYourTurn,
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Illegal(#[from] IllegalAction),
}
