pub mod snapshot;
mod submit_action;

pub use submit_action::*;

use crate::domain::entities::game::TurnOutcome;
use crate::domain::entities::room::{DrawKind, TurnRecord};
use crate::domain::value_objects::card::CardView;

/// Client-facing record of an executed turn.
pub fn turn_record(outcome: &TurnOutcome) -> TurnRecord {
    TurnRecord {
        actor: outcome.actor_name.clone(),
        discarded: outcome
            .discarded
            .iter()
            .copied()
            .map(CardView::from)
            .collect(),
        draw_source: if outcome.from_deck {
            DrawKind::Deck
        } else {
            DrawKind::Pile
        },
        drawn: outcome.drawn_from_pile.map(CardView::from),
    }
}
