//! AI observer and policy engine.
//!
//! Each AI player owns one brain: opponent models built from public turn
//! information plus memo caches over its own hand. Brains are per-player
//! and per-room; nothing in here is shared, because hand contents are
//! private. All methods take `&self` with interior locking so the game can
//! call through the player seat without juggling mutable borrows.

mod enumerate;
mod memo;
mod observer;
mod policy;

pub use enumerate::discard_options;
pub use observer::OpponentModel;

use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::value_objects::card::Card;

use memo::MemoCaches;

/// Default deck-rollout sample width.
pub const ROLLOUT_SAMPLES: usize = 24;

/// Public seat facts an AI can always see about an opponent.
#[derive(Debug, Clone)]
pub struct OpponentPublic {
    pub pid: String,
    pub score: u16,
    pub hand_count: usize,
}

/// Everything visible to the acting AI at decision time.
#[derive(Debug, Clone)]
pub struct TurnView {
    pub hand: Vec<Card>,
    pub draw_options: Vec<Card>,
    pub last_discard: Vec<Card>,
    pub discard_pile: Vec<Card>,
    pub deck_size: usize,
    pub own_score: u16,
    pub opponents: Vec<OpponentPublic>,
}

/// Where to draw from after discarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawChoice {
    Deck,
    /// Index into the current pile pickup options.
    Pile(usize),
}

/// A chosen turn.
#[derive(Debug, Clone)]
pub struct TurnDecision {
    pub discard: Vec<Card>,
    pub draw: DrawChoice,
}

/// Observed facts about one completed turn by another player.
#[derive(Debug, Clone)]
pub struct TurnObservation {
    pub actor_pid: String,
    pub actor_score: u16,
    /// Hand size after the turn.
    pub hand_count: usize,
    pub discarded: Vec<Card>,
    /// Revealed only for pile draws; deck draws stay hidden.
    pub drawn: Option<Card>,
}

/// The observing AI's own visible zones, used to re-estimate unknown hands.
#[derive(Debug, Clone)]
pub struct VisibleContext {
    pub own_hand: Vec<Card>,
    pub discard_pile: Vec<Card>,
    pub draw_options: Vec<Card>,
}

pub(crate) struct BrainState {
    pub(crate) observers: HashMap<String, OpponentModel>,
    pub(crate) caches: MemoCaches,
}

impl BrainState {
    pub(crate) fn new() -> Self {
        BrainState {
            observers: HashMap::new(),
            caches: MemoCaches::new(),
        }
    }
}

/// One AI player's complete decision state.
pub struct AiBrain {
    state: RwLock<BrainState>,
    rollout_samples: usize,
}

impl AiBrain {
    pub fn new() -> Self {
        AiBrain {
            state: RwLock::new(BrainState::new()),
            rollout_samples: ROLLOUT_SAMPLES,
        }
    }

    /// A fresh round: all observer state and every memo cache resets.
    pub fn observe_round(&self, opponents: &[OpponentPublic]) {
        let Ok(mut state) = self.state.write() else {
            return;
        };
        state.observers = opponents
            .iter()
            .map(|o| {
                (
                    o.pid.clone(),
                    OpponentModel::new(o.pid.clone(), o.score, o.hand_count),
                )
            })
            .collect();
        state.caches.clear();
    }

    /// Fold one observed opponent turn into the models.
    pub fn observe_turn(&self, obs: &TurnObservation, ctx: &VisibleContext) {
        let Ok(mut state) = self.state.write() else {
            return;
        };
        let model = state
            .observers
            .entry(obs.actor_pid.clone())
            .or_insert_with(|| {
                OpponentModel::new(obs.actor_pid.clone(), obs.actor_score, obs.hand_count)
            });
        model.score = obs.actor_score;
        model.record_turn(&obs.discarded, obs.drawn, obs.hand_count);

        // Known cards anywhere are no longer candidates for unknown hands.
        let known_all: Vec<Card> = state
            .observers
            .values()
            .flat_map(|m| m.known_cards.iter().copied())
            .collect();
        let unseen = observer::unseen_cards(
            &ctx.own_hand,
            &ctx.discard_pile,
            &known_all,
            &ctx.draw_options,
        );
        let (mean_unseen, _) = observer::value_stats(&unseen);
        for model in state.observers.values_mut() {
            model.refresh_estimate(mean_unseen);
        }
    }

    /// Pick a (discard, draw) pair for the current turn.
    pub fn decide_action(&self, view: &TurnView) -> TurnDecision {
        match self.state.write() {
            Ok(mut state) => policy::decide(&mut state, view, self.rollout_samples),
            Err(_) => TurnDecision {
                discard: vec![view.hand[0]],
                draw: DrawChoice::Deck,
            },
        }
    }

    /// Whether to call Yaniv instead of playing.
    pub fn should_declare_yaniv(&self, view: &TurnView) -> bool {
        match self.state.read() {
            Ok(state) => policy::should_declare(&state, view),
            Err(_) => false,
        }
    }

    /// Current estimate of one opponent's hand value, if modeled.
    pub fn estimated_score(&self, pid: &str) -> Option<f64> {
        self.state
            .read()
            .ok()
            .and_then(|s| s.observers.get(pid).map(|m| m.estimated_score))
    }
}

impl Default for AiBrain {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AiBrain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let opponents = self
            .state
            .read()
            .map(|s| s.observers.len())
            .unwrap_or_default();
        f.debug_struct("AiBrain")
            .field("opponents", &opponents)
            .field("rolloutSamples", &self.rollout_samples)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::card::Suit;

    fn c(rank: u8, suit: Suit) -> Card {
        Card::from_rank_suit(rank, suit)
    }

    fn seat(pid: &str) -> OpponentPublic {
        OpponentPublic {
            pid: pid.to_string(),
            score: 0,
            hand_count: 5,
        }
    }

    #[test]
    fn test_observe_round_resets_models_and_caches() {
        let brain = AiBrain::new();
        brain.observe_round(&[seat("p2"), seat("p3")]);
        assert!(brain.estimated_score("p2").is_some());

        brain.observe_turn(
            &TurnObservation {
                actor_pid: "p2".to_string(),
                actor_score: 0,
                hand_count: 5,
                discarded: vec![c(13, Suit::Spades)],
                drawn: Some(c(2, Suit::Hearts)),
            },
            &VisibleContext {
                own_hand: vec![c(5, Suit::Clubs)],
                discard_pile: vec![c(13, Suit::Spades)],
                draw_options: vec![c(13, Suit::Spades)],
            },
        );
        let with_pickup = brain.estimated_score("p2").unwrap();

        brain.observe_round(&[seat("p2"), seat("p3")]);
        let fresh = brain.estimated_score("p2").unwrap();
        assert_ne!(with_pickup, fresh);
    }

    #[test]
    fn test_pile_pickup_lowers_estimate_of_low_card_collector() {
        let brain = AiBrain::new();
        brain.observe_round(&[seat("p2")]);
        let before = brain.estimated_score("p2").unwrap();
        brain.observe_turn(
            &TurnObservation {
                actor_pid: "p2".to_string(),
                actor_score: 0,
                hand_count: 5,
                discarded: vec![c(13, Suit::Spades)],
                drawn: Some(c(1, Suit::Hearts)),
            },
            &VisibleContext {
                own_hand: vec![],
                discard_pile: vec![c(13, Suit::Spades)],
                draw_options: vec![c(13, Suit::Spades)],
            },
        );
        let after = brain.estimated_score("p2").unwrap();
        assert!(after < before);
    }
}
