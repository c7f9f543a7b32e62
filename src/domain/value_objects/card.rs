//! Card identity and the canonical 54-card deck.
//!
//! A card is a single integer in `0..54`. Ids 0 and 1 are the two jokers;
//! ids `2..54` encode the 52 standard cards as
//! `(rank_index - 1) * 4 + suit_index + 2` with ranks A..K and suits
//! clubs, diamonds, hearts, spades. The id is the persisted wire format
//! for hands and piles, so the encoding must never change.

use serde::{Deserialize, Serialize};

/// Number of cards in a full deck (52 + 2 jokers).
pub const DECK_SIZE: u8 = 54;

/// Card suit, in id-encoding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Suit {
    Clubs,
    Diamonds,
    Hearts,
    Spades,
}

impl Suit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Suit::Clubs => "clubs",
            Suit::Diamonds => "diamonds",
            Suit::Hearts => "hearts",
            Suit::Spades => "spades",
        }
    }

    fn from_index(index: u8) -> Suit {
        match index {
            0 => Suit::Clubs,
            1 => Suit::Diamonds,
            2 => Suit::Hearts,
            _ => Suit::Spades,
        }
    }

    fn index(&self) -> u8 {
        match self {
            Suit::Clubs => 0,
            Suit::Diamonds => 1,
            Suit::Hearts => 2,
            Suit::Spades => 3,
        }
    }
}

/// A single card, identified by its integer id.
///
/// Equality is id equality. Cards serialize as their bare id in persisted
/// game snapshots; the client-facing view (`CardView`) carries the derived
/// attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Card(pub u8);

impl Card {
    /// Construct from a raw id. Ids outside `0..54` are rejected.
    pub fn from_id(id: u8) -> Option<Card> {
        (id < DECK_SIZE).then_some(Card(id))
    }

    /// Construct from rank index (A=1..K=13) and suit.
    pub fn from_rank_suit(rank_index: u8, suit: Suit) -> Card {
        debug_assert!((1..=13).contains(&rank_index));
        Card((rank_index - 1) * 4 + suit.index() + 2)
    }

    /// One of the two jokers (`which` is 0 or 1).
    pub fn joker(which: u8) -> Card {
        Card(which & 1)
    }

    #[inline]
    pub fn id(&self) -> u8 {
        self.0
    }

    #[inline]
    pub fn is_joker(&self) -> bool {
        self.0 < 2
    }

    /// Rank index: A=1 .. K=13, joker 0.
    #[inline]
    pub fn rank_index(&self) -> u8 {
        if self.is_joker() {
            0
        } else {
            (self.0 - 2) / 4 + 1
        }
    }

    /// Suit, `None` for jokers.
    #[inline]
    pub fn suit(&self) -> Option<Suit> {
        if self.is_joker() {
            None
        } else {
            Some(Suit::from_index((self.0 - 2) % 4))
        }
    }

    /// Point value: jokers 0, A=1, numerics face value, 10/J/Q/K all 10.
    #[inline]
    pub fn value(&self) -> u8 {
        self.rank_index().min(10)
    }

    /// Display rank: "A", "2".."10", "J", "Q", "K", or "Joker".
    pub fn rank_str(&self) -> &'static str {
        const RANKS: [&str; 14] = [
            "Joker", "A", "2", "3", "4", "5", "6", "7", "8", "9", "10", "J", "Q", "K",
        ];
        RANKS[self.rank_index() as usize]
    }
}

/// The 54 cards in canonical id order.
pub fn full_deck() -> Vec<Card> {
    (0..DECK_SIZE).map(Card).collect()
}

/// Sum of card values in a hand.
pub fn hand_value(cards: &[Card]) -> u16 {
    cards.iter().map(|c| c.value() as u16).sum()
}

/// Client-facing card representation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardView {
    pub id: u8,
    pub rank: String,
    pub suit: Option<Suit>,
    pub value: u8,
}

impl From<Card> for CardView {
    fn from(card: Card) -> Self {
        CardView {
            id: card.id(),
            rank: card.rank_str().to_string(),
            suit: card.suit(),
            value: card.value(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joker_attributes() {
        for id in 0..2 {
            let card = Card(id);
            assert!(card.is_joker());
            assert_eq!(card.rank_index(), 0);
            assert_eq!(card.suit(), None);
            assert_eq!(card.value(), 0);
            assert_eq!(card.rank_str(), "Joker");
        }
    }

    #[test]
    fn test_id_encoding_round_trip() {
        for id in 2..DECK_SIZE {
            let card = Card(id);
            let rebuilt = Card::from_rank_suit(card.rank_index(), card.suit().unwrap());
            assert_eq!(rebuilt, card);
        }
    }

    #[test]
    fn test_known_encodings() {
        // Ace of clubs is the first standard card.
        assert_eq!(Card::from_rank_suit(1, Suit::Clubs), Card(2));
        // King of spades is the last.
        assert_eq!(Card::from_rank_suit(13, Suit::Spades), Card(53));
        // 4 of hearts: (4-1)*4 + 2 + 2 = 16.
        assert_eq!(Card::from_rank_suit(4, Suit::Hearts), Card(16));
    }

    #[test]
    fn test_values() {
        assert_eq!(Card::from_rank_suit(1, Suit::Clubs).value(), 1);
        assert_eq!(Card::from_rank_suit(9, Suit::Hearts).value(), 9);
        assert_eq!(Card::from_rank_suit(10, Suit::Hearts).value(), 10);
        assert_eq!(Card::from_rank_suit(11, Suit::Spades).value(), 10);
        assert_eq!(Card::from_rank_suit(13, Suit::Diamonds).value(), 10);
    }

    #[test]
    fn test_full_deck_is_canonical() {
        let deck = full_deck();
        assert_eq!(deck.len(), 54);
        for (i, card) in deck.iter().enumerate() {
            assert_eq!(card.id() as usize, i);
        }
        assert_eq!(deck.iter().filter(|c| c.is_joker()).count(), 2);
    }

    #[test]
    fn test_hand_value() {
        let hand = vec![
            Card::joker(0),
            Card::from_rank_suit(1, Suit::Clubs),
            Card::from_rank_suit(13, Suit::Spades),
        ];
        assert_eq!(hand_value(&hand), 11);
    }

    #[test]
    fn test_card_view_wire_shape() {
        let view: CardView = Card::from_rank_suit(12, Suit::Hearts).into();
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["rank"], "Q");
        assert_eq!(json["suit"], "hearts");
        assert_eq!(json["value"], 10);

        let joker_view: CardView = Card::joker(0).into();
        let json = serde_json::to_value(&joker_view).unwrap();
        assert_eq!(json["suit"], serde_json::Value::Null);
    }
}
