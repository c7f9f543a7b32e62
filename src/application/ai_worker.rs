//! Cooperative AI turn worker.
//!
//! At most one drain loop runs per room, guarded by `ai_worker_active`.
//! Each iteration re-takes the room lock, re-checks status, plays exactly
//! one AI move, and publishes before unlocking, so subscribers see every
//! intermediate state in order. The loop exits when the turn reaches a
//! human, the game ends, or the room vanishes.

use std::sync::Arc;
use std::time::Duration;

use crate::application::game::turn_record;
use crate::application::publish::publish_room;
use crate::domain::ai::DrawChoice;
use crate::domain::entities::game::{
    DrawSource, IllegalAction, TurnAction, YanivOutcome,
};
use crate::domain::entities::room::{Room, RoomStatus, TurnRecord};
use crate::infrastructure::app_state::AppState;

/// Pause between AI moves so clients can render each one.
const MOVE_PACING: Duration = Duration::from_millis(200);

/// Safety cap on moves per drain; a loop that long means a stuck game.
const MAX_ITERATIONS: usize = 50;

/// Kick the worker for a room if no drain is already running.
pub fn kick(state: Arc<AppState>, code: String) {
    tokio::spawn(async move {
        run(state, code).await;
    });
}

async fn run(state: Arc<AppState>, code: String) {
    // Claim the single-worker guard under the room lock.
    {
        let Some(slot) = state.rooms.get(&code) else { return };
        let mut room = slot.lock().await;
        if room.ai_worker_active || room.status != RoomStatus::Playing {
            return;
        }
        let is_ai_turn = room
            .game
            .as_ref()
            .map(|g| g.current_player().is_ai())
            .unwrap_or(false);
        if !is_ai_turn {
            return;
        }
        room.ai_worker_active = true;
    }

    let mut iterations = 0;
    loop {
        tokio::time::sleep(MOVE_PACING).await;

        let Some(slot) = state.rooms.get(&code) else {
            // Room vanished; nothing to clear.
            return;
        };
        let mut room = slot.lock().await;

        iterations += 1;
        if iterations > MAX_ITERATIONS {
            tracing::warn!("AI worker hit max iterations for room {}", code);
            room.ai_worker_active = false;
            return;
        }
        if room.status != RoomStatus::Playing {
            room.ai_worker_active = false;
            return;
        }
        let still_ai = room
            .game
            .as_ref()
            .map(|g| g.current_player().is_ai())
            .unwrap_or(false);
        if !still_ai {
            room.ai_worker_active = false;
            return;
        }

        match step(&mut room) {
            Ok(()) => {}
            Err(e) => {
                // Engine errors here are bugs; log and stand down rather
                // than spin.
                tracing::error!("AI worker stopped in room {}: {}", code, e);
                room.ai_worker_active = false;
                return;
            }
        }

        let finished = room.status == RoomStatus::Finished;
        publish_room(&state, &room).await;
        if finished {
            room.ai_worker_active = false;
            return;
        }
    }
}

enum Step {
    Turn(TurnRecord),
    Round(YanivOutcome),
}

/// Play exactly one AI move.
fn step(room: &mut Room) -> Result<(), IllegalAction> {
    let applied = {
        let game = room.game.as_mut().ok_or(IllegalAction::BadDrawTarget)?;
        let (idx, _) = game.start_turn();
        let view = game.turn_view(idx);
        let brain = match game.players[idx].brain() {
            Some(brain) => brain,
            None => return Ok(()),
        };

        if game.can_declare_yaniv(idx) && brain.should_declare_yaniv(&view) {
            tracing::debug!("{} declares Yaniv", game.players[idx].name);
            Step::Round(game.declare_yaniv(idx)?)
        } else {
            let decision = brain.decide_action(&view);
            let action = TurnAction {
                discard: decision.discard,
                draw: match decision.draw {
                    DrawChoice::Deck => DrawSource::Deck,
                    DrawChoice::Pile(i) => DrawSource::Pile(i),
                },
            };
            let outcome = match game.play_turn(&action) {
                Ok(outcome) => outcome,
                Err(e) => {
                    // The policy should only emit legal moves; fall back to
                    // the simplest one before giving up.
                    tracing::warn!(
                        "AI move rejected ({}); falling back to a single discard",
                        e
                    );
                    let fallback = highest_single(game.players[idx].hand.as_slice());
                    game.play_turn(&TurnAction {
                        discard: vec![fallback],
                        draw: DrawSource::Deck,
                    })?
                }
            };
            Step::Turn(turn_record(&outcome))
        }
    };

    match applied {
        Step::Turn(record) => room.note_turn(record),
        Step::Round(outcome) => {
            room.note_round(outcome.result);
            if let Some(winner) = outcome.winner {
                room.status = RoomStatus::Finished;
                room.winner = Some(winner);
            }
        }
    }
    Ok(())
}

fn highest_single(
    hand: &[crate::domain::value_objects::card::Card],
) -> crate::domain::value_objects::card::Card {
    hand.iter()
        .copied()
        .max_by_key(|c| c.value())
        .unwrap_or(hand[0])
}
