//! Opponent modeling from public information.
//!
//! Each AI tracks, per opponent: the cards they are known to hold (pile
//! pickups not yet discarded), an estimate of their total hand value, and
//! soft collection signals (ranks and suit-adjacent ranks they have picked
//! up, never pruned). All of it resets on a new round.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::domain::value_objects::card::{full_deck, Card, Suit};

/// Mean card value of the untouched 54-card deck.
pub const DECK_MEAN_VALUE: f64 = 340.0 / 54.0;

/// What one AI believes about one opponent.
#[derive(Debug, Clone)]
pub struct OpponentModel {
    pub pid: String,
    pub score: u16,
    pub hand_count: usize,
    /// Cards drawn from the pile and not seen discarded since.
    pub known_cards: Vec<Card>,
    /// Expected total hand value.
    pub estimated_score: f64,
    pub pickup_history: Vec<Card>,
    pub discard_history: Vec<Card>,
    /// Rank -> pile pickups of that rank this round. Never pruned.
    pub collected_ranks: HashMap<u8, u32>,
    /// Suit -> rank indexes picked up in that suit. Never pruned.
    pub collected_suit_ranks: HashMap<Suit, BTreeSet<u8>>,
}

impl OpponentModel {
    pub fn new(pid: impl Into<String>, score: u16, hand_count: usize) -> Self {
        OpponentModel {
            pid: pid.into(),
            score,
            hand_count,
            known_cards: Vec::new(),
            estimated_score: hand_count as f64 * DECK_MEAN_VALUE,
            pickup_history: Vec::new(),
            discard_history: Vec::new(),
            collected_ranks: HashMap::new(),
            collected_suit_ranks: HashMap::new(),
        }
    }

    /// Record one observed turn by this opponent.
    pub fn record_turn(&mut self, discarded: &[Card], drawn: Option<Card>, hand_count: usize) {
        for card in discarded {
            if let Some(pos) = self.known_cards.iter().position(|c| c == card) {
                self.known_cards.remove(pos);
            }
            self.discard_history.push(*card);
        }

        if let Some(card) = drawn {
            self.known_cards.push(card);
            self.pickup_history.push(card);
            if !card.is_joker() {
                *self.collected_ranks.entry(card.rank_index()).or_insert(0) += 1;
                if let Some(suit) = card.suit() {
                    self.collected_suit_ranks
                        .entry(suit)
                        .or_default()
                        .insert(card.rank_index());
                }
            }
        }

        self.hand_count = hand_count;
    }

    pub fn known_value(&self) -> u16 {
        self.known_cards.iter().map(|c| c.value() as u16).sum()
    }

    /// Cards in hand beyond the known pickups.
    pub fn unknown_count(&self) -> usize {
        self.hand_count.saturating_sub(self.known_cards.len())
    }

    /// Re-estimate total hand value given the mean value of unseen cards.
    pub fn refresh_estimate(&mut self, mean_unseen: f64) {
        self.estimated_score = self.known_value() as f64 + self.unknown_count() as f64 * mean_unseen;
    }

    /// Whether this opponent recently let go of the given rank.
    pub fn recently_discarded_rank(&self, rank: u8) -> bool {
        self.discard_history
            .iter()
            .rev()
            .take(3)
            .any(|c| !c.is_joker() && c.rank_index() == rank)
    }
}

/// The deck minus everything this AI can see: its own hand, the public
/// discard pile, every opponent's known cards, and its own visible draw
/// options.
pub fn unseen_cards(
    own_hand: &[Card],
    discard_pile: &[Card],
    known_elsewhere: &[Card],
    draw_options: &[Card],
) -> Vec<Card> {
    let mut seen: HashSet<u8> = HashSet::new();
    seen.extend(own_hand.iter().map(Card::id));
    seen.extend(discard_pile.iter().map(Card::id));
    seen.extend(known_elsewhere.iter().map(Card::id));
    seen.extend(draw_options.iter().map(Card::id));
    full_deck()
        .into_iter()
        .filter(|c| !seen.contains(&c.id()))
        .collect()
}

/// Population mean and variance of card values.
pub fn value_stats(cards: &[Card]) -> (f64, f64) {
    if cards.is_empty() {
        return (DECK_MEAN_VALUE, 0.0);
    }
    let n = cards.len() as f64;
    let mean = cards.iter().map(|c| c.value() as f64).sum::<f64>() / n;
    let var = cards
        .iter()
        .map(|c| {
            let d = c.value() as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    (mean, var)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::card::Suit::*;

    fn c(rank: u8, suit: Suit) -> Card {
        Card::from_rank_suit(rank, suit)
    }

    #[test]
    fn test_pickup_becomes_known_until_discarded() {
        let mut model = OpponentModel::new("p2", 0, 5);
        model.record_turn(&[c(13, Spades)], Some(c(4, Hearts)), 5);
        assert_eq!(model.known_cards, vec![c(4, Hearts)]);
        assert_eq!(model.known_value(), 4);

        model.record_turn(&[c(4, Hearts)], None, 4);
        assert!(model.known_cards.is_empty());
        // Collection signals survive the discard.
        assert_eq!(model.collected_ranks.get(&4), Some(&1));
        assert!(model.collected_suit_ranks[&Hearts].contains(&4));
    }

    #[test]
    fn test_estimate_combines_known_and_unknown() {
        let mut model = OpponentModel::new("p2", 0, 5);
        model.record_turn(&[], Some(c(2, Clubs)), 5);
        model.refresh_estimate(6.0);
        // 2 known + 4 unknown * 6.0
        assert!((model.estimated_score - 26.0).abs() < 1e-9);
    }

    #[test]
    fn test_unseen_excludes_all_visible_zones() {
        let own = vec![c(1, Clubs), c(2, Clubs)];
        let pile = vec![c(3, Clubs)];
        let known = vec![c(4, Clubs)];
        let options = vec![c(5, Clubs)];
        let unseen = unseen_cards(&own, &pile, &known, &options);
        assert_eq!(unseen.len(), 54 - 5);
        for zone in [&own, &pile, &known, &options] {
            for card in zone {
                assert!(!unseen.contains(card));
            }
        }
    }

    #[test]
    fn test_recently_discarded_rank_window() {
        let mut model = OpponentModel::new("p2", 0, 5);
        for rank in [9, 10, 11, 12] {
            model.record_turn(&[c(rank, Clubs)], None, 5);
        }
        assert!(!model.recently_discarded_rank(9));
        assert!(model.recently_discarded_rank(12));
    }
}
