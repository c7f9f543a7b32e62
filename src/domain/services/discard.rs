//! Discard validation.
//!
//! A discard is legal iff it is a single card, a set (all non-jokers share a
//! rank, any number of jokers), or a run of 3+ same-suit cards where jokers
//! fill the interior gaps and any leftover jokers extend the ends without
//! running past A or K. Validation is deterministic and side-effect free.

use crate::domain::value_objects::card::{Card, Suit};

/// A validated discard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discard {
    Single(Card),
    /// Cards in the order they were given.
    Set(Vec<Card>),
    /// Cards reordered into run order, jokers interleaved into their gaps
    /// and leftovers placed on a legal end.
    Run(Vec<Card>),
}

impl Discard {
    /// The cards in play order (run order for runs).
    pub fn cards(&self) -> &[Card] {
        match self {
            Discard::Single(card) => std::slice::from_ref(card),
            Discard::Set(cards) => cards,
            Discard::Run(cards) => cards,
        }
    }

    pub fn is_run(&self) -> bool {
        matches!(self, Discard::Run(_))
    }

    /// The shared rank of a set's non-jokers (`None` for an all-joker set).
    pub fn set_rank(&self) -> Option<u8> {
        match self {
            Discard::Set(cards) => cards.iter().find(|c| !c.is_joker()).map(Card::rank_index),
            _ => None,
        }
    }
}

/// Validate a candidate discard. Returns `None` if illegal.
pub fn validate(cards: &[Card]) -> Option<Discard> {
    match cards.len() {
        0 => None,
        1 => Some(Discard::Single(cards[0])),
        _ => {
            if is_set(cards) {
                Some(Discard::Set(cards.to_vec()))
            } else if cards.len() >= 3 {
                build_run(cards).map(Discard::Run)
            } else {
                None
            }
        }
    }
}

/// All non-jokers share a rank. An all-joker group is always a set.
fn is_set(cards: &[Card]) -> bool {
    let mut rank = None;
    for card in cards.iter().filter(|c| !c.is_joker()) {
        match rank {
            None => rank = Some(card.rank_index()),
            Some(r) if r != card.rank_index() => return false,
            _ => {}
        }
    }
    true
}

/// Assemble the ordered run, or `None` if the cards cannot form one.
fn build_run(cards: &[Card]) -> Option<Vec<Card>> {
    let mut jokers: Vec<Card> = cards.iter().filter(|c| c.is_joker()).copied().collect();
    let mut naturals: Vec<Card> = cards.iter().filter(|c| !c.is_joker()).copied().collect();
    if naturals.is_empty() {
        return None;
    }

    let suit = naturals[0].suit()?;
    if naturals.iter().any(|c| c.suit() != Some(suit)) {
        return None;
    }

    naturals.sort_by_key(Card::rank_index);
    // Strictly increasing: duplicates cannot appear in a run.
    if naturals.windows(2).any(|w| w[0].rank_index() == w[1].rank_index()) {
        return None;
    }

    let gaps: u8 = naturals
        .windows(2)
        .map(|w| w[1].rank_index() - w[0].rank_index() - 1)
        .sum();
    if gaps as usize > jokers.len() {
        return None;
    }
    let mut leftover = jokers.len() - gaps as usize;

    let low = naturals[0].rank_index();
    let high = naturals[naturals.len() - 1].rank_index();
    let low_slots = (low - 1) as usize;
    let mut high_slots = (13 - high) as usize;
    if leftover > low_slots + high_slots {
        return None;
    }

    // Interleave gap jokers in play order.
    let mut ordered = Vec::with_capacity(cards.len());
    jokers.reverse(); // pop() yields play order
    for (i, natural) in naturals.iter().enumerate() {
        if i > 0 {
            let gap = natural.rank_index() - naturals[i - 1].rank_index() - 1;
            for _ in 0..gap {
                ordered.push(jokers.pop().expect("gap count bounded by joker count"));
            }
        }
        ordered.push(*natural);
    }

    // Leftover jokers extend whichever end is still legal, high end first.
    // The capacity check above guarantees the low end absorbs the rest.
    while leftover > 0 {
        let joker = jokers.pop().expect("leftover bounded by joker count");
        if high_slots > 0 {
            ordered.push(joker);
            high_slots -= 1;
        } else {
            ordered.insert(0, joker);
        }
        leftover -= 1;
    }

    Some(ordered)
}

/// The suit and inclusive rank bounds an ordered run occupies, joker
/// positions included. Used for slamdown adjacency and pile pickups.
pub fn run_bounds(ordered: &[Card]) -> Option<(Suit, u8, u8)> {
    let (pos, first_natural) = ordered
        .iter()
        .enumerate()
        .find(|(_, c)| !c.is_joker())?;
    let suit = first_natural.suit()?;
    let low = first_natural.rank_index() - pos as u8;
    let high = low + ordered.len() as u8 - 1;
    Some((suit, low, high))
}

/// Pickup options from the just-played discard: a run offers only its two
/// ends, anything else offers every card.
pub fn draw_options(last_discard: &[Card]) -> Vec<Card> {
    if last_discard.len() >= 3 {
        if let Some(Discard::Run(ordered)) = validate(last_discard) {
            return vec![ordered[0], ordered[ordered.len() - 1]];
        }
    }
    last_discard.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::card::Suit::*;

    fn c(rank: u8, suit: Suit) -> Card {
        Card::from_rank_suit(rank, suit)
    }

    #[test]
    fn test_single_always_legal() {
        assert!(matches!(
            validate(&[c(7, Hearts)]),
            Some(Discard::Single(_))
        ));
        assert!(matches!(validate(&[Card::joker(0)]), Some(Discard::Single(_))));
    }

    #[test]
    fn test_pair_of_unequal_cards_invalid() {
        assert_eq!(validate(&[c(4, Hearts), c(5, Hearts)]), None);
    }

    #[test]
    fn test_set_with_jokers() {
        let discard = validate(&[c(7, Hearts), c(7, Spades), Card::joker(0)]).unwrap();
        assert!(matches!(discard, Discard::Set(_)));
        assert_eq!(discard.set_rank(), Some(7));
    }

    #[test]
    fn test_all_joker_set() {
        let discard = validate(&[Card::joker(0), Card::joker(1)]).unwrap();
        assert!(matches!(discard, Discard::Set(_)));
        assert_eq!(discard.set_rank(), None);
    }

    #[test]
    fn test_joker_fills_run_gap() {
        let discard = validate(&[c(4, Hearts), Card::joker(0), c(6, Hearts)]).unwrap();
        match discard {
            Discard::Run(ordered) => {
                assert_eq!(ordered[0], c(4, Hearts));
                assert!(ordered[1].is_joker());
                assert_eq!(ordered[2], c(6, Hearts));
            }
            other => panic!("expected run, got {:?}", other),
        }
    }

    #[test]
    fn test_plain_run() {
        let discard = validate(&[c(9, Clubs), c(7, Clubs), c(8, Clubs)]).unwrap();
        match discard {
            Discard::Run(ordered) => {
                let ranks: Vec<u8> = ordered.iter().map(Card::rank_index).collect();
                assert_eq!(ranks, vec![7, 8, 9]);
            }
            other => panic!("expected run, got {:?}", other),
        }
    }

    #[test]
    fn test_run_rejects_mixed_suits_and_duplicates() {
        assert_eq!(validate(&[c(7, Clubs), c(8, Hearts), c(9, Clubs)]), None);
        assert_eq!(validate(&[c(7, Clubs), c(7, Clubs), c(8, Clubs)]), None);
    }

    #[test]
    fn test_leftover_joker_extends_high_end() {
        let discard = validate(&[c(7, Spades), c(8, Spades), Card::joker(0)]).unwrap();
        match discard {
            Discard::Run(ordered) => {
                assert!(ordered[2].is_joker());
                let (suit, low, high) = run_bounds(&ordered).unwrap();
                assert_eq!((suit, low, high), (Spades, 7, 9));
            }
            other => panic!("expected run, got {:?}", other),
        }
    }

    #[test]
    fn test_leftover_joker_cannot_pass_king() {
        // Q-K plus a joker: the only open end is below the queen.
        let discard = validate(&[c(12, Diamonds), c(13, Diamonds), Card::joker(1)]).unwrap();
        match discard {
            Discard::Run(ordered) => {
                assert!(ordered[0].is_joker());
                let (_, low, high) = run_bounds(&ordered).unwrap();
                assert_eq!((low, high), (11, 13));
            }
            other => panic!("expected run, got {:?}", other),
        }
    }

    #[test]
    fn test_both_jokers_fall_below_a_king_high_run() {
        let discard = validate(&[
            c(12, Hearts),
            c(13, Hearts),
            Card::joker(0),
            Card::joker(1),
        ])
        .unwrap();
        match discard {
            Discard::Run(ordered) => {
                assert!(ordered[0].is_joker() && ordered[1].is_joker());
                let (_, low, high) = run_bounds(&ordered).unwrap();
                assert_eq!((low, high), (10, 13));
            }
            other => panic!("expected run, got {:?}", other),
        }
    }

    #[test]
    fn test_ace_low_run_extends_high_only() {
        let discard = validate(&[c(1, Clubs), c(2, Clubs), Card::joker(0)]).unwrap();
        match discard {
            Discard::Run(ordered) => {
                assert!(ordered[2].is_joker());
                let (_, low, high) = run_bounds(&ordered).unwrap();
                assert_eq!((low, high), (1, 3));
            }
            other => panic!("expected run, got {:?}", other),
        }
    }

    #[test]
    fn test_draw_options_for_run_are_the_ends() {
        let last = vec![c(4, Hearts), c(5, Hearts), c(6, Hearts)];
        let options = draw_options(&last);
        assert_eq!(options, vec![c(4, Hearts), c(6, Hearts)]);
    }

    #[test]
    fn test_draw_options_for_set_are_all_cards() {
        let last = vec![c(9, Hearts), c(9, Spades), c(9, Clubs)];
        assert_eq!(draw_options(&last).len(), 3);
    }

    #[test]
    fn test_run_bounds_with_interior_joker() {
        let ordered = vec![c(4, Hearts), Card::joker(0), c(6, Hearts)];
        assert_eq!(run_bounds(&ordered), Some((Hearts, 4, 6)));
    }
}
