//! The Yaniv game engine.
//!
//! Owns the deck, hands, turn cursor, and scoring. Every mutation keeps the
//! 54-card conservation invariant: hands + deck + discard pile is always a
//! permutation of the full deck. The RNG is injected (seeded) so deals and
//! reshuffles are reproducible in tests.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::domain::ai::{OpponentPublic, TurnObservation, TurnView, VisibleContext};
use crate::domain::entities::player::Player;
use crate::domain::services::discard::{self, run_bounds, Discard};
use crate::domain::value_objects::card::{full_deck, Card, CardView};

pub const HAND_SIZE: usize = 5;
/// Hand value at or under which Yaniv may be declared.
pub const YANIV_LIMIT: u16 = 5;
pub const ASSAF_PENALTY: u16 = 30;
pub const RESET_STEP: u16 = 50;
/// Scores strictly above this eliminate the player.
pub const ELIMINATION_SCORE: u16 = 100;

#[derive(Debug, thiserror::Error)]
pub enum IllegalAction {
    #[error("draw choice out of range")]
    BadDrawTarget,
    #[error("discarded card not in hand")]
    CardNotInHand,
    #[error("discard is not a legal single, set, or run")]
    InvalidDiscard,
    #[error("hand value too high to call Yaniv")]
    HandTooHigh,
    #[error("no slamdown available")]
    SlamdownUnavailable,
    #[error("cannot slam down the last card")]
    SlamdownLastCard,
    #[error("draw pile exhausted")]
    DeckExhausted,
}

/// Where the turn draws from after discarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawSource {
    Deck,
    /// Index into the current pile pickup options.
    Pile(usize),
}

/// A submitted turn.
#[derive(Debug, Clone)]
pub struct TurnAction {
    pub discard: Vec<Card>,
    pub draw: DrawSource,
}

/// What one executed turn looked like from the table.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub actor_pid: String,
    pub actor_name: String,
    /// In play order (run order for runs).
    pub discarded: Vec<Card>,
    pub from_deck: bool,
    /// The drawn card when taken from the pile; deck draws stay hidden.
    pub drawn_from_pile: Option<Card>,
    pub slamdown_available: bool,
}

/// End-of-round bookkeeping pushed to clients as `lastRound`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundResult {
    pub declarer: String,
    pub declarer_hand_value: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assaf: Option<AssafRecord>,
    pub resets: Vec<String>,
    pub eliminations: Vec<String>,
    pub scores: Vec<PlayerRoundScore>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssafRecord {
    pub by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRoundScore {
    pub name: String,
    pub gained: u16,
    pub total: u16,
    pub final_hand: Vec<CardView>,
}

/// Result of a Yaniv declaration.
#[derive(Debug, Clone)]
pub struct YanivOutcome {
    pub result: RoundResult,
    /// Set when the round left exactly one player standing.
    pub winner: Option<String>,
}

pub struct Game {
    pub players: Vec<Player>,
    /// Draw pile, top at the end.
    pub deck: Vec<Card>,
    /// Full discard history; `last_discard` is always its suffix.
    pub discard_pile: Vec<Card>,
    pub last_discard: Vec<Card>,
    pub current_player_index: usize,
    /// Scores as they stood when the last Yaniv was declared.
    pub previous_scores: Vec<u16>,
    pub slamdown_player: Option<usize>,
    pub slamdown_card: Option<Card>,
    pub slamdowns_allowed: bool,
    rng: ChaCha8Rng,
}

impl Game {
    /// Seat the players and pick a random starting seat. Slamdowns silently
    /// collapse to off when any seat is AI.
    pub fn new(players: Vec<Player>, slamdowns_allowed: bool, seed: Option<u64>) -> Game {
        debug_assert!(players.len() >= 2);
        let mut rng = match seed {
            Some(s) => ChaCha8Rng::seed_from_u64(s),
            None => ChaCha8Rng::from_entropy(),
        };
        let start = rng.gen_range(0..players.len());
        let slamdowns_allowed = slamdowns_allowed && players.iter().all(|p| !p.is_ai());
        Game {
            players,
            deck: Vec::new(),
            discard_pile: Vec::new(),
            last_discard: Vec::new(),
            current_player_index: start,
            previous_scores: Vec::new(),
            slamdown_player: None,
            slamdown_card: None,
            slamdowns_allowed,
            rng,
        }
    }

    /// Deal the opening hands and flip the first discard.
    pub fn start_game(&mut self) {
        self.deal_round();
    }

    fn deal_round(&mut self) {
        let mut deck = full_deck();
        deck.shuffle(&mut self.rng);

        for player in &mut self.players {
            player.hand.clear();
            for _ in 0..HAND_SIZE {
                if let Some(card) = deck.pop() {
                    player.hand.push(card);
                }
            }
        }

        self.discard_pile.clear();
        self.last_discard.clear();
        if let Some(top) = deck.pop() {
            self.discard_pile.push(top);
            self.last_discard.push(top);
        }
        self.deck = deck;
        self.slamdown_player = None;
        self.slamdown_card = None;
        self.notify_round();
    }

    /// Sort the current hand for a stable client render and report the
    /// pile pickup options. Safe to call repeatedly.
    pub fn start_turn(&mut self) -> (usize, Vec<Card>) {
        let idx = self.current_player_index;
        self.players[idx].sort_hand();
        (idx, self.draw_options())
    }

    pub fn draw_options(&self) -> Vec<Card> {
        discard::draw_options(&self.last_discard)
    }

    pub fn current_player(&self) -> &Player {
        &self.players[self.current_player_index]
    }

    pub fn can_declare_yaniv(&self, idx: usize) -> bool {
        self.players[idx].hand_value() <= YANIV_LIMIT
    }

    /// Execute the current player's turn: validate, draw, discard, detect
    /// slamdown, notify observers, advance the cursor. Validation failures
    /// leave the game untouched.
    pub fn play_turn(&mut self, action: &TurnAction) -> Result<TurnOutcome, IllegalAction> {
        let idx = self.current_player_index;
        let options = self.draw_options();

        let pile_card = match action.draw {
            DrawSource::Deck => None,
            DrawSource::Pile(i) => {
                Some(*options.get(i).ok_or(IllegalAction::BadDrawTarget)?)
            }
        };

        if action.discard.is_empty() {
            return Err(IllegalAction::InvalidDiscard);
        }

        // Discards come out of the hand plus, for pile draws, the card
        // being picked up (the player sees it before committing).
        {
            let mut pool: Vec<u8> = self.players[idx].hand.iter().map(Card::id).collect();
            if let Some(card) = pile_card {
                pool.push(card.id());
            }
            for card in &action.discard {
                let pos = pool
                    .iter()
                    .position(|&id| id == card.id())
                    .ok_or(IllegalAction::CardNotInHand)?;
                pool.swap_remove(pos);
            }
        }

        let validated = discard::validate(&action.discard).ok_or(IllegalAction::InvalidDiscard)?;

        // Point of no return: everything below must succeed.
        let drawn = match action.draw {
            DrawSource::Deck => {
                if self.deck.is_empty() {
                    self.rebuild_deck();
                }
                self.deck.pop().ok_or(IllegalAction::DeckExhausted)?
            }
            DrawSource::Pile(_) => {
                let card = pile_card.expect("pile draw resolved above");
                if let Some(pos) = self.last_discard.iter().position(|c| c.id() == card.id()) {
                    self.last_discard.remove(pos);
                }
                if let Some(pos) = self.discard_pile.iter().rposition(|c| c.id() == card.id()) {
                    self.discard_pile.remove(pos);
                }
                card
            }
        };

        let player = &mut self.players[idx];
        player.hand.push(drawn);
        for card in &action.discard {
            if let Some(pos) = player.hand.iter().position(|c| c.id() == card.id()) {
                player.hand.remove(pos);
            }
        }

        // Runs land in validator order so the pile ends line up for pickup.
        let played = validated.cards().to_vec();
        self.discard_pile.extend(played.iter().copied());
        self.last_discard = played.clone();

        // Any discard expires a pending slamdown before a new one can arm.
        self.slamdown_player = None;
        self.slamdown_card = None;
        let from_deck = matches!(action.draw, DrawSource::Deck);
        let slamdown_available = from_deck
            && self.slamdowns_allowed
            && !self.players[idx].is_ai()
            && self.players[idx].hand.len() >= 2
            && slamdown_matches(&validated, drawn);
        if slamdown_available {
            self.slamdown_player = Some(idx);
            self.slamdown_card = Some(drawn);
        }

        let outcome = TurnOutcome {
            actor_pid: self.players[idx].pid.clone(),
            actor_name: self.players[idx].name.clone(),
            discarded: played,
            from_deck,
            drawn_from_pile: (!from_deck).then_some(drawn),
            slamdown_available,
        };
        self.notify_turn(idx, &outcome);

        self.current_player_index = (idx + 1) % self.players.len();
        Ok(outcome)
    }

    /// Discard the armed slamdown card onto the pile it extends.
    pub fn perform_slamdown(&mut self, idx: usize) -> Result<Card, IllegalAction> {
        if self.slamdown_player != Some(idx) {
            return Err(IllegalAction::SlamdownUnavailable);
        }
        let card = self.slamdown_card.ok_or(IllegalAction::SlamdownUnavailable)?;
        if self.players[idx].hand.len() <= 1 {
            return Err(IllegalAction::SlamdownLastCard);
        }
        let pos = self.players[idx]
            .hand
            .iter()
            .position(|c| c.id() == card.id())
            .ok_or(IllegalAction::SlamdownUnavailable)?;
        self.players[idx].hand.remove(pos);
        self.discard_pile.push(card);
        self.last_discard.push(card);
        self.slamdown_player = None;
        self.slamdown_card = None;
        Ok(card)
    }

    /// Score the round, prune eliminated players, then either crown a
    /// winner or redeal.
    pub fn declare_yaniv(&mut self, idx: usize) -> Result<YanivOutcome, IllegalAction> {
        let declarer_value = self.players[idx].hand_value();
        if declarer_value > YANIV_LIMIT {
            return Err(IllegalAction::HandTooHigh);
        }
        let declarer_name = self.players[idx].name.clone();

        // Snapshots before any mutation: scores for the reset rule, hands
        // for the round report.
        self.previous_scores = self.players.iter().map(|p| p.score).collect();
        let final_hands: Vec<Vec<CardView>> = self
            .players
            .iter()
            .map(|p| {
                let mut hand = p.hand.to_vec();
                hand.sort_unstable_by_key(Card::id);
                hand.into_iter().map(CardView::from).collect()
            })
            .collect();

        let hand_values: Vec<u16> = self.players.iter().map(|p| p.hand_value()).collect();
        let others_min = hand_values
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != idx)
            .map(|(_, &v)| v)
            .min();

        let clean = others_min.map_or(true, |min| declarer_value < min);
        let mut gains = vec![0u16; self.players.len()];
        let mut assaf = None;
        if clean {
            for (i, gain) in gains.iter_mut().enumerate() {
                if i != idx {
                    *gain = hand_values[i];
                }
            }
        } else {
            gains[idx] = ASSAF_PENALTY;
            let min = others_min.unwrap_or(0);
            let by = hand_values
                .iter()
                .enumerate()
                .find(|(i, &v)| *i != idx && v == min)
                .map(|(i, _)| self.players[i].name.clone());
            assaf = by.map(|by| AssafRecord { by });
        }

        for (player, &gain) in self.players.iter_mut().zip(&gains) {
            player.score += gain;
        }

        let mut resets = Vec::new();
        for (i, player) in self.players.iter_mut().enumerate() {
            let landed = player.score;
            if (landed == RESET_STEP || landed == 2 * RESET_STEP)
                && self.previous_scores[i] < landed
            {
                player.score -= RESET_STEP;
                resets.push(player.name.clone());
            }
        }

        let scores = self
            .players
            .iter()
            .enumerate()
            .map(|(i, p)| PlayerRoundScore {
                name: p.name.clone(),
                gained: gains[i],
                total: p.score,
                final_hand: final_hands[i].clone(),
            })
            .collect();

        let eliminations: Vec<String> = self
            .players
            .iter()
            .filter(|p| p.score > ELIMINATION_SCORE)
            .map(|p| p.name.clone())
            .collect();
        self.players.retain(|p| p.score <= ELIMINATION_SCORE);
        if !self.players.is_empty() {
            self.current_player_index %= self.players.len();
        }

        self.slamdown_player = None;
        self.slamdown_card = None;

        let result = RoundResult {
            declarer: declarer_name,
            declarer_hand_value: declarer_value,
            assaf,
            resets,
            eliminations,
            scores,
        };

        let winner = if self.players.len() == 1 {
            Some(self.players[0].name.clone())
        } else {
            None
        };
        if winner.is_none() {
            self.deal_round();
        }

        Ok(YanivOutcome { result, winner })
    }

    /// The visible world for the seat about to act.
    pub fn turn_view(&self, idx: usize) -> TurnView {
        TurnView {
            hand: self.players[idx].hand.to_vec(),
            draw_options: self.draw_options(),
            last_discard: self.last_discard.clone(),
            discard_pile: self.discard_pile.clone(),
            deck_size: self.deck.len(),
            own_score: self.players[idx].score,
            opponents: self
                .players
                .iter()
                .filter(|p| p.pid != self.players[idx].pid)
                .map(|p| OpponentPublic {
                    pid: p.pid.clone(),
                    score: p.score,
                    hand_count: p.hand.len(),
                })
                .collect(),
        }
    }

    /// Empty deck at draw time: everything discarded before the current
    /// `last_discard` comes back, reshuffled.
    fn rebuild_deck(&mut self) {
        let keep = self.last_discard.len();
        let cut = self.discard_pile.len().saturating_sub(keep);
        let mut recovered: Vec<Card> = self.discard_pile.drain(..cut).collect();
        recovered.shuffle(&mut self.rng);
        self.deck = recovered;
    }

    fn notify_round(&self) {
        for player in &self.players {
            let Some(brain) = player.brain() else { continue };
            let seats: Vec<OpponentPublic> = self
                .players
                .iter()
                .filter(|p| p.pid != player.pid)
                .map(|p| OpponentPublic {
                    pid: p.pid.clone(),
                    score: p.score,
                    hand_count: p.hand.len(),
                })
                .collect();
            brain.observe_round(&seats);
        }
    }

    fn notify_turn(&self, actor: usize, outcome: &TurnOutcome) {
        let obs = TurnObservation {
            actor_pid: self.players[actor].pid.clone(),
            actor_score: self.players[actor].score,
            hand_count: self.players[actor].hand.len(),
            discarded: outcome.discarded.clone(),
            drawn: outcome.drawn_from_pile,
        };
        let draw_options = self.draw_options();
        for (i, player) in self.players.iter().enumerate() {
            if i == actor {
                continue;
            }
            let Some(brain) = player.brain() else { continue };
            let ctx = VisibleContext {
                own_hand: player.hand.to_vec(),
                discard_pile: self.discard_pile.clone(),
                draw_options: draw_options.clone(),
            };
            brain.observe_turn(&obs, &ctx);
        }
    }

    /// Every card the game owns, sorted by id. A legal state is exactly
    /// `0..54`.
    pub fn card_census(&self) -> Vec<u8> {
        let mut ids: Vec<u8> = self
            .players
            .iter()
            .flat_map(|p| p.hand.iter().map(Card::id))
            .chain(self.deck.iter().map(Card::id))
            .chain(self.discard_pile.iter().map(Card::id))
            .collect();
        ids.sort_unstable();
        ids
    }
}

/// Does the freshly drawn card extend the just-discarded set or run?
/// Single-card discards never arm a slamdown.
fn slamdown_matches(played: &Discard, drawn: Card) -> bool {
    match played {
        Discard::Single(_) => false,
        Discard::Set(_) => match played.set_rank() {
            Some(rank) => !drawn.is_joker() && drawn.rank_index() == rank,
            None => drawn.is_joker(),
        },
        Discard::Run(ordered) => {
            if drawn.is_joker() {
                return false;
            }
            match run_bounds(ordered) {
                Some((suit, low, high)) => {
                    drawn.suit() == Some(suit)
                        && ((low > 1 && drawn.rank_index() == low - 1)
                            || (high < 13 && drawn.rank_index() == high + 1))
                }
                None => false,
            }
        }
    }
}

// ============================================================================
// Persisted form
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSeatSnapshot {
    pub pid: String,
    pub name: String,
    pub is_ai: bool,
    pub score: u16,
    pub hand: Vec<u8>,
}

/// The durable form of a game. The deck itself is not persisted: recovery
/// rebuilds it from the 54-card deck minus hands and discard pile, then
/// reshuffles.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub players: Vec<PlayerSeatSnapshot>,
    pub discard_pile: Vec<u8>,
    pub last_discard_size: usize,
    pub current_player_index: usize,
    pub previous_scores: Vec<u16>,
    pub slamdown_player: Option<usize>,
    pub slamdown_card: Option<u8>,
    pub slamdowns_allowed: bool,
}

impl Game {
    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            players: self
                .players
                .iter()
                .map(|p| PlayerSeatSnapshot {
                    pid: p.pid.clone(),
                    name: p.name.clone(),
                    is_ai: p.is_ai(),
                    score: p.score,
                    hand: p.hand.iter().map(Card::id).collect(),
                })
                .collect(),
            discard_pile: self.discard_pile.iter().map(Card::id).collect(),
            last_discard_size: self.last_discard.len(),
            current_player_index: self.current_player_index,
            previous_scores: self.previous_scores.clone(),
            slamdown_player: self.slamdown_player,
            slamdown_card: self.slamdown_card.map(|c| c.id()),
            slamdowns_allowed: self.slamdowns_allowed,
        }
    }

    pub fn from_snapshot(snap: GameSnapshot, seed: Option<u64>) -> Game {
        let mut players = Vec::with_capacity(snap.players.len());
        for seat in &snap.players {
            let mut player = if seat.is_ai {
                Player::ai(seat.pid.clone(), seat.name.clone())
            } else {
                Player::human(seat.pid.clone(), seat.name.clone())
            };
            player.score = seat.score;
            player.hand = seat.hand.iter().filter_map(|&id| Card::from_id(id)).collect();
            players.push(player);
        }

        let discard_pile: Vec<Card> = snap
            .discard_pile
            .iter()
            .filter_map(|&id| Card::from_id(id))
            .collect();
        let cut = discard_pile.len().saturating_sub(snap.last_discard_size);
        let last_discard = discard_pile[cut..].to_vec();

        let mut rng = match seed {
            Some(s) => ChaCha8Rng::seed_from_u64(s),
            None => ChaCha8Rng::from_entropy(),
        };
        let used: std::collections::HashSet<u8> = players
            .iter()
            .flat_map(|p| p.hand.iter().map(Card::id))
            .chain(discard_pile.iter().map(Card::id))
            .collect();
        let mut deck: Vec<Card> = full_deck()
            .into_iter()
            .filter(|c| !used.contains(&c.id()))
            .collect();
        deck.shuffle(&mut rng);

        let current = if players.is_empty() {
            0
        } else {
            snap.current_player_index % players.len()
        };

        Game {
            players,
            deck,
            discard_pile,
            last_discard,
            current_player_index: current,
            previous_scores: snap.previous_scores,
            slamdown_player: snap.slamdown_player,
            slamdown_card: snap.slamdown_card.and_then(Card::from_id),
            slamdowns_allowed: snap.slamdowns_allowed,
            rng,
        }
    }
}


#[cfg(test)]
mod conservation_props {
    use super::*;
    use crate::domain::ai::discard_options;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        /// Random legal turns never create or destroy cards, and
        /// `last_discard` stays a suffix of the pile.
        #[test]
        fn cards_are_conserved_over_random_play(seed in any::<u64>(), turns in 1usize..40) {
            let players = vec![
                Player::human("p1", "Ada"),
                Player::human("p2", "Ben"),
                Player::human("p3", "Cy"),
            ];
            let mut game = Game::new(players, false, Some(seed));
            game.start_game();

            let full: Vec<u8> = (0..54).collect();
            for step in 0..turns {
                let (idx, options) = game.start_turn();
                let hand: Vec<Card> = game.players[idx].hand.to_vec();
                let mut candidates = discard_options(&hand);
                prop_assert!(!candidates.is_empty());
                let pick = candidates.swap_remove(seed as usize % candidates.len());
                let draw = if step % 3 == 0 && !options.is_empty() {
                    DrawSource::Pile(step % options.len())
                } else {
                    DrawSource::Deck
                };
                game.play_turn(&TurnAction { discard: pick, draw }).unwrap();

                prop_assert_eq!(game.card_census(), full.clone());
                let pile = &game.discard_pile;
                let suffix = &pile[pile.len() - game.last_discard.len()..];
                prop_assert_eq!(suffix, game.last_discard.as_slice());
            }
        }
    }
}
