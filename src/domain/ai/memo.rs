//! Per-brain memo tables.
//!
//! All four caches are keyed by a hand signature (sorted card ids joined by
//! commas), LRU-evicted at a fixed cap, and cleared whenever a new round
//! starts. Hand contents are private, so caches are never shared across
//! brains or rooms.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;

use crate::domain::value_objects::card::Card;

/// Entry cap per cache.
pub const CACHE_CAPACITY: usize = 50_000;

/// Canonical key for a hand: sorted ids, comma-joined.
pub fn hand_signature(cards: &[Card]) -> String {
    let mut ids: Vec<u8> = cards.iter().map(Card::id).collect();
    ids.sort_unstable();
    let mut sig = String::with_capacity(ids.len() * 3);
    for (i, id) in ids.iter().enumerate() {
        if i > 0 {
            sig.push(',');
        }
        sig.push_str(&id.to_string());
    }
    sig
}

pub struct MemoCaches {
    /// Every legal discard for a hand.
    pub discard_options: LruCache<String, Arc<Vec<Vec<Card>>>>,
    /// The maximum-value discards for a hand.
    pub best_discard_options: LruCache<String, Arc<Vec<Vec<Card>>>>,
    /// Expected points left after the best next-turn discard.
    pub best_residual_points: LruCache<String, f64>,
    /// Deck-draw simulation results, keyed additionally by the prune flag.
    pub simulate_action: LruCache<(String, bool), f64>,
}

impl MemoCaches {
    pub fn new() -> Self {
        let cap = NonZeroUsize::new(CACHE_CAPACITY).expect("cap is non-zero");
        MemoCaches {
            discard_options: LruCache::new(cap),
            best_discard_options: LruCache::new(cap),
            best_residual_points: LruCache::new(cap),
            simulate_action: LruCache::new(cap),
        }
    }

    /// Dropped wholesale at round start; stale hands never carry over.
    pub fn clear(&mut self) {
        self.discard_options.clear();
        self.best_discard_options.clear();
        self.best_residual_points.clear();
        self.simulate_action.clear();
    }
}

impl Default for MemoCaches {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::card::Suit;

    #[test]
    fn test_signature_is_order_independent() {
        let a = vec![
            Card::from_rank_suit(13, Suit::Spades),
            Card::joker(0),
            Card::from_rank_suit(4, Suit::Hearts),
        ];
        let mut b = a.clone();
        b.reverse();
        assert_eq!(hand_signature(&a), hand_signature(&b));
    }

    #[test]
    fn test_clear_empties_all_tables() {
        let mut caches = MemoCaches::new();
        caches.best_residual_points.put("2,3".to_string(), 1.0);
        caches.simulate_action.put(("2,3".to_string(), true), 2.0);
        caches.clear();
        assert_eq!(caches.best_residual_points.len(), 0);
        assert_eq!(caches.simulate_action.len(), 0);
    }
}
