//! Exhaustive enumeration of legal discards for a hand.
//!
//! Every singleton, every same-rank combination of two or more non-jokers
//! with every joker subset, and every same-suit run the hand's jokers can
//! complete, including variants that spend leftover jokers on a legal end.

use std::collections::BTreeMap;

use crate::domain::value_objects::card::{Card, Suit};

/// All legal discards, in deterministic order for a given hand order.
pub fn discard_options(hand: &[Card]) -> Vec<Vec<Card>> {
    let mut options: Vec<Vec<Card>> = hand.iter().map(|&c| vec![c]).collect();

    let jokers: Vec<Card> = hand.iter().filter(|c| c.is_joker()).copied().collect();
    let naturals: Vec<Card> = hand.iter().filter(|c| !c.is_joker()).copied().collect();

    rank_sets(&naturals, &jokers, &mut options);
    suited_runs(&naturals, &jokers, &mut options);
    options
}

/// Same-rank combinations of 2+ naturals, each paired with every joker
/// subset (the empty one included).
fn rank_sets(naturals: &[Card], jokers: &[Card], options: &mut Vec<Vec<Card>>) {
    // BTreeMap keeps enumeration order deterministic, which keeps the
    // policy's tie-breaking deterministic.
    let mut by_rank: BTreeMap<u8, Vec<Card>> = BTreeMap::new();
    for &card in naturals {
        by_rank.entry(card.rank_index()).or_default().push(card);
    }

    for group in by_rank.values() {
        if group.len() < 2 {
            continue;
        }
        for combo in subsets_of_at_least(group, 2) {
            for joker_subset in subsets_of_at_least(jokers, 0) {
                let mut option = combo.clone();
                option.extend(joker_subset);
                options.push(option);
            }
        }
    }
}

/// Same-suit combinations whose interior gaps the jokers can fill, emitted
/// as ordered runs, plus end-extension variants for leftover jokers.
fn suited_runs(naturals: &[Card], jokers: &[Card], options: &mut Vec<Vec<Card>>) {
    let mut by_suit: BTreeMap<Suit, Vec<Card>> = BTreeMap::new();
    for &card in naturals {
        if let Some(suit) = card.suit() {
            by_suit.entry(suit).or_default().push(card);
        }
    }

    for group in by_suit.values() {
        if group.len() < 2 {
            continue;
        }
        for mut combo in subsets_of_at_least(group, 2) {
            combo.sort_unstable_by_key(Card::rank_index);
            let gaps: usize = combo
                .windows(2)
                .map(|w| (w[1].rank_index() - w[0].rank_index()) as usize - 1)
                .sum();
            if gaps > jokers.len() {
                continue;
            }

            let base = interleave(&combo, &jokers[..gaps]);
            let extension = &jokers[gaps..];
            let low = combo[0].rank_index() as usize;
            let high = combo[combo.len() - 1].rank_index() as usize;

            if base.len() >= 3 {
                options.push(base.clone());
            }
            for below in 0..=extension.len() {
                for above in 0..=(extension.len() - below) {
                    if below + above == 0 {
                        continue;
                    }
                    if low <= below || high + above > 13 || base.len() + below + above < 3 {
                        continue;
                    }
                    let mut run = Vec::with_capacity(base.len() + below + above);
                    run.extend_from_slice(&extension[..below]);
                    run.extend_from_slice(&base);
                    run.extend_from_slice(&extension[below..below + above]);
                    options.push(run);
                }
            }
        }
    }
}

/// Sorted naturals with gap jokers spliced between neighbors.
fn interleave(combo: &[Card], gap_jokers: &[Card]) -> Vec<Card> {
    let mut run = Vec::with_capacity(combo.len() + gap_jokers.len());
    let mut next_joker = gap_jokers.iter();
    for (i, card) in combo.iter().enumerate() {
        if i > 0 {
            let gap = combo[i].rank_index() - combo[i - 1].rank_index() - 1;
            for _ in 0..gap {
                run.push(*next_joker.next().expect("gap jokers sized to gaps"));
            }
        }
        run.push(*card);
    }
    run
}

/// All subsets with at least `min` elements. Input groups are tiny (at most
/// four of a rank, a handful of a suit), so bitmask enumeration is fine.
fn subsets_of_at_least(cards: &[Card], min: usize) -> Vec<Vec<Card>> {
    let mut subsets = Vec::new();
    for mask in 0u32..(1 << cards.len()) {
        if (mask.count_ones() as usize) < min {
            continue;
        }
        let subset: Vec<Card> = cards
            .iter()
            .enumerate()
            .filter(|(i, _)| mask & (1 << i) != 0)
            .map(|(_, &c)| c)
            .collect();
        subsets.push(subset);
    }
    subsets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::services::discard::validate;
    use crate::domain::value_objects::card::Suit::*;

    fn c(rank: u8, suit: Suit) -> Card {
        Card::from_rank_suit(rank, suit)
    }

    fn contains_set(options: &[Vec<Card>], expected: &[Card]) -> bool {
        options.iter().any(|opt| {
            let mut a: Vec<u8> = opt.iter().map(Card::id).collect();
            let mut b: Vec<u8> = expected.iter().map(Card::id).collect();
            a.sort_unstable();
            b.sort_unstable();
            a == b
        })
    }

    #[test]
    fn test_every_option_is_legal() {
        let hand = vec![
            c(4, Hearts),
            c(5, Hearts),
            c(7, Hearts),
            c(4, Spades),
            Card::joker(0),
            Card::joker(1),
        ];
        let options = discard_options(&hand);
        assert!(!options.is_empty());
        for option in &options {
            assert!(validate(option).is_some(), "illegal option {:?}", option);
        }
    }

    #[test]
    fn test_singletons_present() {
        let hand = vec![c(4, Hearts), c(9, Clubs)];
        let options = discard_options(&hand);
        assert!(contains_set(&options, &[c(4, Hearts)]));
        assert!(contains_set(&options, &[c(9, Clubs)]));
    }

    #[test]
    fn test_pair_with_and_without_joker() {
        let hand = vec![c(4, Hearts), c(4, Spades), Card::joker(0)];
        let options = discard_options(&hand);
        assert!(contains_set(&options, &[c(4, Hearts), c(4, Spades)]));
        assert!(contains_set(
            &options,
            &[c(4, Hearts), c(4, Spades), Card::joker(0)]
        ));
    }

    #[test]
    fn test_gap_fill_run_enumerated() {
        let hand = vec![c(4, Hearts), c(6, Hearts), Card::joker(0)];
        let options = discard_options(&hand);
        assert!(contains_set(
            &options,
            &[c(4, Hearts), c(6, Hearts), Card::joker(0)]
        ));
        // The ordered variant keeps the joker in the gap.
        let run = options
            .iter()
            .find(|opt| opt.len() == 3 && opt.iter().any(|card| card.is_joker()))
            .unwrap();
        assert!(run[1].is_joker());
    }

    #[test]
    fn test_end_extension_variants() {
        let hand = vec![c(7, Clubs), c(8, Clubs), Card::joker(0)];
        let options = discard_options(&hand);
        let runs: Vec<&Vec<Card>> = options.iter().filter(|o| o.len() == 3).collect();
        // Joker below the 7 and joker above the 8 are both emitted.
        assert!(runs.iter().any(|r| r[0].is_joker()));
        assert!(runs.iter().any(|r| r[2].is_joker()));
    }

    #[test]
    fn test_no_extension_past_ace() {
        let hand = vec![c(1, Clubs), c(2, Clubs), Card::joker(0)];
        let options = discard_options(&hand);
        for option in options.iter().filter(|o| o.len() == 3) {
            // The only legal three-card run is A-2-Joker upward.
            assert!(!option[0].is_joker());
        }
    }
}
