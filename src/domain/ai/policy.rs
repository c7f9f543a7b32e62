//! Turn policy: candidate evaluation and the Yaniv declaration decision.
//!
//! Candidates are every (discard option, draw choice) pair. Each is scored
//! as the expected points left after the following turn plus heuristic
//! costs for feeding opponents, spending jokers, and deck uncertainty,
//! minus bonuses for landing on a score reset and for keeping workable
//! hand shapes. Lower is better; ties break toward the larger discard.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::domain::value_objects::card::{hand_value, Card};

use super::enumerate;
use super::memo::{hand_signature, MemoCaches};
use super::observer::{self, OpponentModel};
use super::{BrainState, DrawChoice, TurnDecision, TurnView};

// Behavioral tunables. The shape of the rule is fixed; these magnitudes
// only steer move preference.
const PRUNED_SAMPLES: usize = 8;
const PRUNE_PAIR_LIMIT: usize = 48;
const THREAT_WEIGHT: f64 = 0.06;
const FEED_WEIGHT: f64 = 0.22;
const JOKER_WEIGHT: f64 = 0.08;
const COMPOSITION_WEIGHT: f64 = 0.10;
const UNCERTAINTY_WEIGHT: f64 = 0.04;
const JOKER_SPEND_PENALTY: f64 = 22.0;
const RESET_BONUS_POINTS: f64 = 50.0;
const YANIV_THRESHOLDS: [f64; 6] = [0.60, 0.55, 0.45, 0.32, 0.20, 0.12];
const YANIV_THRESHOLD_FLOOR: f64 = 0.03;
const YANIV_SCORE_SCALE: f64 = 0.35;
const RESET_IMPACT_WEIGHT: f64 = 0.04;
const RESET_IMPACT_CAP: f64 = 4.0;

/// Per-turn derived context, identical for every candidate pair.
struct TurnContext {
    samples: Vec<Card>,
    mean_unseen: f64,
    var_unseen: f64,
    threat: f64,
    opp_yaniv_prob: f64,
}

pub(super) fn decide(state: &mut BrainState, view: &TurnView, rollout_samples: usize) -> TurnDecision {
    let ctx = build_context(state, view, rollout_samples);
    let BrainState { observers, caches } = state;
    let models: Vec<&OpponentModel> = observers.values().collect();

    let options = cached_options(caches, &view.hand);

    // Reset chase: with an opponent about to call, landing exactly on a
    // multiple of 50 turns the coming hit into a wipe to zero.
    if models.iter().any(|m| m.estimated_score <= 5.0) {
        for option in options.iter() {
            let post = remove_cards(&view.hand, option);
            let post_sum = hand_value(&post);
            for (i, card) in view.draw_options.iter().enumerate() {
                let landed = view.own_score + post_sum + card.value() as u16;
                if landed > 0 && landed <= 100 && landed % 50 == 0 {
                    return TurnDecision {
                        discard: option.clone(),
                        draw: DrawChoice::Pile(i),
                    };
                }
            }
        }
    }

    let pair_count = options.len() * (view.draw_options.len() + 1);
    let prune = pair_count > PRUNE_PAIR_LIMIT;
    let sample_count = if prune {
        PRUNED_SAMPLES.min(ctx.samples.len())
    } else {
        ctx.samples.len()
    };
    let samples = &ctx.samples[..sample_count];
    let deck_draw_mean = if samples.is_empty() {
        ctx.mean_unseen
    } else {
        samples.iter().map(|c| c.value() as f64).sum::<f64>() / samples.len() as f64
    };

    let mut best: Option<(f64, f64, TurnDecision)> = None;
    for option in options.iter() {
        let post = remove_cards(&view.hand, option);
        let post_sum = hand_value(&post) as f64;
        let discard_value: f64 = option.iter().map(|c| c.value() as f64).sum();
        let feed = feed_penalty(&models, option);
        let joker_pen =
            option.iter().filter(|c| c.is_joker()).count() as f64 * JOKER_SPEND_PENALTY;

        let mut consider = |score: f64, draw: DrawChoice, best: &mut Option<(f64, f64, TurnDecision)>| {
            let replace = match best {
                None => true,
                Some((s, dv, _)) => {
                    score < *s - 1e-9 || ((score - *s).abs() <= 1e-9 && discard_value > *dv)
                }
            };
            if replace {
                *best = Some((
                    score,
                    discard_value,
                    TurnDecision {
                        discard: option.clone(),
                        draw,
                    },
                ));
            }
        };

        // Pile pickups: the drawn card is known exactly.
        for (i, &card) in view.draw_options.iter().enumerate() {
            let mut next_hand = post.clone();
            next_hand.push(card);
            let (future, kept) = best_next(caches, &next_hand);
            let immediate = post_sum + card.value() as f64;
            let heuristic = THREAT_WEIGHT * ctx.threat * immediate
                + FEED_WEIGHT * feed
                + JOKER_WEIGHT * joker_pen;
            let landed = view.own_score as f64 + immediate;
            let reset_bonus = if landed > 0.0 && (landed == 50.0 || landed == 100.0) {
                RESET_BONUS_POINTS * ctx.opp_yaniv_prob * success_factor(next_hand.len())
            } else {
                0.0
            };
            let comp = composition_bonus(&kept);
            let score = future + heuristic - reset_bonus - COMPOSITION_WEIGHT * comp;
            consider(score, DrawChoice::Pile(i), &mut best);
        }

        // Deck draw: everything averages over the rollout sample.
        let immediate = post_sum + deck_draw_mean;
        let future = simulate_deck_draw(caches, &post, samples, prune);
        let mut comp_total = 0.0;
        let mut reset_hits = 0usize;
        for &sample in samples {
            let mut next_hand = post.clone();
            next_hand.push(sample);
            let (_, kept) = best_next(caches, &next_hand);
            comp_total += composition_bonus(&kept);
            let landed = view.own_score + post_sum as u16 + sample.value() as u16;
            if landed > 0 && landed <= 100 && landed % 50 == 0 {
                reset_hits += 1;
            }
        }
        let comp = if samples.is_empty() {
            0.0
        } else {
            comp_total / samples.len() as f64
        };
        let reset_bonus = if samples.is_empty() {
            0.0
        } else {
            (reset_hits as f64 / samples.len() as f64)
                * RESET_BONUS_POINTS
                * ctx.opp_yaniv_prob
                * success_factor(post.len() + 1)
        };
        let heuristic = THREAT_WEIGHT * ctx.threat * immediate
            + FEED_WEIGHT * feed
            + JOKER_WEIGHT * joker_pen;
        let uncertainty = UNCERTAINTY_WEIGHT * ctx.var_unseen.sqrt() * (1.0 + ctx.threat);
        let score = future + heuristic + uncertainty - reset_bonus - COMPOSITION_WEIGHT * comp;
        consider(score, DrawChoice::Deck, &mut best);
    }

    best.map(|(_, _, decision)| decision).unwrap_or_else(|| {
        // A non-empty hand always has at least its singletons.
        TurnDecision {
            discard: vec![view.hand[0]],
            draw: DrawChoice::Deck,
        }
    })
}

pub(super) fn should_declare(state: &BrainState, view: &TurnView) -> bool {
    let own_sum = hand_value(&view.hand);
    if own_sum > 5 {
        return false;
    }
    if state.observers.is_empty() {
        return own_sum <= 2;
    }

    let known_all: Vec<Card> = state
        .observers
        .values()
        .flat_map(|m| m.known_cards.iter().copied())
        .collect();
    let unseen = observer::unseen_cards(
        &view.hand,
        &view.discard_pile,
        &known_all,
        &view.draw_options,
    );
    let (mean_unseen, var_unseen) = observer::value_stats(&unseen);

    // Probability that no opponent is at or below us, assuming independent
    // Normal hand-sum models with a continuity correction.
    let mut none_at_or_below = 1.0;
    for opp in &view.opponents {
        let (known_sum, unknown) = match state.observers.get(&opp.pid) {
            Some(model) => (model.known_value() as f64, model.unknown_count() as f64),
            None => (0.0, opp.hand_count as f64),
        };
        let mean = known_sum + unknown * mean_unseen;
        let var = unknown * var_unseen;
        let p = if var <= f64::EPSILON {
            if mean <= own_sum as f64 {
                1.0
            } else {
                0.0
            }
        } else {
            normal_cdf((own_sum as f64 + 0.5 - mean) / var.sqrt())
        };
        none_at_or_below *= 1.0 - p;
    }
    let assaf_risk = 1.0 - none_at_or_below;

    let mut threshold = YANIV_THRESHOLDS[own_sum as usize]
        * (1.0 - YANIV_SCORE_SCALE * (view.own_score as f64 / 100.0).min(1.0));
    threshold = threshold.max(YANIV_THRESHOLD_FLOOR);
    threshold -= RESET_IMPACT_WEIGHT * reset_impact(state);
    assaf_risk <= threshold.max(0.0)
}

/// How much a call now would gift an opponent a 50/100 reset.
fn reset_impact(state: &BrainState) -> f64 {
    let mut impact: f64 = 0.0;
    for model in state.observers.values() {
        let projected = model.score as f64 + model.estimated_score.round();
        for target in [50.0, 100.0] {
            if (projected - target).abs() < f64::EPSILON {
                impact += 2.0;
            } else if (projected - target).abs() <= 2.0 {
                impact += 1.0;
            }
        }
    }
    impact.min(RESET_IMPACT_CAP)
}

fn build_context(state: &BrainState, view: &TurnView, rollout_samples: usize) -> TurnContext {
    let known_all: Vec<Card> = state
        .observers
        .values()
        .flat_map(|m| m.known_cards.iter().copied())
        .collect();
    let unseen = observer::unseen_cards(
        &view.hand,
        &view.discard_pile,
        &known_all,
        &view.draw_options,
    );
    let (mean_unseen, var_unseen) = observer::value_stats(&unseen);

    let mut samples = unseen;
    let mut rng = ChaCha8Rng::seed_from_u64(rollout_seed(view));
    samples.shuffle(&mut rng);
    samples.truncate(rollout_samples);

    let mut threat: f64 = 0.0;
    let mut none_yaniv = 1.0;
    for opp in &view.opponents {
        let est = state
            .observers
            .get(&opp.pid)
            .map(|m| m.estimated_score)
            .unwrap_or(opp.hand_count as f64 * mean_unseen);
        let score_term = ((12.0 - est) / 12.0).clamp(0.0, 1.0);
        let count_term = ((5.0 - opp.hand_count as f64) / 4.0).clamp(0.0, 1.0);
        threat = threat.max((1.5 * (0.6 * score_term + 0.4 * count_term)).clamp(0.0, 1.5));
        none_yaniv *= 1.0 - yaniv_next_turn_probability(est, opp.hand_count);
    }

    TurnContext {
        samples,
        mean_unseen,
        var_unseen,
        threat,
        opp_yaniv_prob: 1.0 - none_yaniv,
    }
}

/// Piecewise chance an opponent calls Yaniv on their next turn.
fn yaniv_next_turn_probability(estimated: f64, hand_count: usize) -> f64 {
    if estimated <= 2.0 {
        0.85
    } else if estimated <= 5.0 {
        0.55
    } else if estimated <= 7.0 && hand_count <= 2 {
        0.30
    } else if estimated <= 10.0 {
        0.12
    } else {
        0.02
    }
}

/// Deterministic rollout seed folded from observable state only, in a fixed
/// field order, so equal observable states draw equal samples.
fn rollout_seed(view: &TurnView) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    let mut fold = |byte: u8| {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    };
    let mut hand_ids: Vec<u8> = view.hand.iter().map(Card::id).collect();
    hand_ids.sort_unstable();
    hand_ids.iter().for_each(|&b| fold(b));
    view.discard_pile.iter().for_each(|c| fold(c.id()));
    view.draw_options.iter().for_each(|c| fold(c.id()));
    fold(view.deck_size as u8);
    fold((view.own_score >> 8) as u8);
    fold(view.own_score as u8);
    for opp in &view.opponents {
        fold(opp.hand_count as u8);
        fold((opp.score >> 8) as u8);
        fold(opp.score as u8);
    }
    hash
}

/// Memoized discard enumeration.
fn cached_options(caches: &mut MemoCaches, hand: &[Card]) -> std::sync::Arc<Vec<Vec<Card>>> {
    let sig = hand_signature(hand);
    if let Some(options) = caches.discard_options.get(&sig) {
        return options.clone();
    }
    let options = std::sync::Arc::new(enumerate::discard_options(hand));
    caches.discard_options.put(sig, options.clone());
    options
}

/// The maximum-value discards for a hand, memoized.
fn cached_best_options(caches: &mut MemoCaches, hand: &[Card]) -> std::sync::Arc<Vec<Vec<Card>>> {
    let sig = hand_signature(hand);
    if let Some(options) = caches.best_discard_options.get(&sig) {
        return options.clone();
    }
    let options = cached_options(caches, hand);
    let best_value = options
        .iter()
        .map(|o| o.iter().map(|c| c.value() as u16).sum::<u16>())
        .max()
        .unwrap_or(0);
    let best: Vec<Vec<Card>> = options
        .iter()
        .filter(|o| o.iter().map(|c| c.value() as u16).sum::<u16>() == best_value)
        .cloned()
        .collect();
    let best = std::sync::Arc::new(best);
    caches.best_discard_options.put(sig, best.clone());
    best
}

/// Points left after the best next-turn discard, plus the cards kept.
fn best_next(caches: &mut MemoCaches, hand: &[Card]) -> (f64, Vec<Card>) {
    let sig = hand_signature(hand);
    let best = cached_best_options(caches, hand);
    let kept = best
        .first()
        .map(|option| remove_cards(hand, option))
        .unwrap_or_else(|| hand.to_vec());
    if let Some(&residual) = caches.best_residual_points.get(&sig) {
        return (residual, kept);
    }
    let residual = hand_value(&kept) as f64;
    caches.best_residual_points.put(sig, residual);
    (residual, kept)
}

/// Expected residual after drawing blind from the deck, memoized per
/// post-discard hand and prune flag.
fn simulate_deck_draw(caches: &mut MemoCaches, post: &[Card], samples: &[Card], prune: bool) -> f64 {
    let key = (hand_signature(post), prune);
    if let Some(&value) = caches.simulate_action.get(&key) {
        return value;
    }
    let value = if samples.is_empty() {
        hand_value(post) as f64
    } else {
        let mut total = 0.0;
        for &sample in samples {
            let mut next_hand = post.to_vec();
            next_hand.push(sample);
            total += best_next(caches, &next_hand).0;
        }
        total / samples.len() as f64
    };
    caches.simulate_action.put(key, value);
    value
}

/// Penalty for discards that help opponents, accumulated per card.
fn feed_penalty(observers: &[&OpponentModel], option: &[Card]) -> f64 {
    let mut penalty = 0.0;
    for card in option {
        if card.is_joker() {
            penalty += 4.0;
            continue;
        }
        let value = card.value();
        penalty += if value <= 3 {
            1.5
        } else if value <= 5 {
            1.0
        } else {
            0.2
        };

        let rank = card.rank_index();
        let suit = card.suit().expect("non-joker has a suit");

        if observers.iter().any(|m| {
            m.known_cards
                .iter()
                .any(|k| !k.is_joker() && k.rank_index() == rank)
        }) {
            penalty += 1.3;
        }
        if observers.iter().any(|m| {
            m.known_cards
                .iter()
                .any(|k| k.suit() == Some(suit) && k.rank_index().abs_diff(rank) <= 1)
        }) {
            penalty += 0.8;
        }

        for model in observers {
            if let Some(&count) = model.collected_ranks.get(&rank) {
                penalty += 2.0 * count as f64;
            }
            if let Some(ranks) = model.collected_suit_ranks.get(&suit) {
                if ranks.contains(&(rank.saturating_sub(1))) || ranks.contains(&(rank + 1)) {
                    penalty += 1.5;
                }
                if rank >= 2 && ranks.contains(&(rank - 1)) && ranks.contains(&(rank + 1)) {
                    penalty += 2.5;
                }
            }
        }

        if observers.iter().any(|m| m.recently_discarded_rank(rank)) {
            penalty -= 0.6;
        }
    }
    penalty
}

/// Reward for hand shapes that discard well later: rank pairs, suited
/// near-neighbors, and held jokers.
fn composition_bonus(kept: &[Card]) -> f64 {
    let mut bonus = 0.0;
    for (i, a) in kept.iter().enumerate() {
        if a.is_joker() {
            bonus += 2.5;
            continue;
        }
        for b in kept.iter().skip(i + 1) {
            if b.is_joker() {
                continue;
            }
            if a.rank_index() == b.rank_index() {
                bonus += 2.0;
            } else if a.suit() == b.suit() {
                match a.rank_index().abs_diff(b.rank_index()) {
                    1 => bonus += 1.5,
                    2 => bonus += 0.75,
                    _ => {}
                }
            }
        }
    }
    bonus
}

/// Chance of still being at the reset score when the round ends, shrinking
/// as the hand grows.
fn success_factor(hand_len: usize) -> f64 {
    match hand_len {
        0 | 1 => 0.9,
        2 => 0.7,
        3 => 0.5,
        _ => 0.3,
    }
}

fn remove_cards(hand: &[Card], option: &[Card]) -> Vec<Card> {
    let mut remaining = hand.to_vec();
    for card in option {
        if let Some(pos) = remaining.iter().position(|c| c.id() == card.id()) {
            remaining.remove(pos);
        }
    }
    remaining
}

/// Standard normal CDF, Abramowitz & Stegun 7.1.26.
fn normal_cdf(z: f64) -> f64 {
    let t = 1.0 / (1.0 + 0.2316419 * z.abs());
    let d = 0.3989422804014327 * (-z * z / 2.0).exp();
    let p = d * t
        * (0.319381530
            + t * (-0.356563782 + t * (1.781477937 + t * (-1.821255978 + t * 1.330274429))));
    if z >= 0.0 {
        1.0 - p
    } else {
        p
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::card::Suit::{self, *};

    fn c(rank: u8, suit: Suit) -> Card {
        Card::from_rank_suit(rank, suit)
    }

    fn bare_view(hand: Vec<Card>) -> TurnView {
        TurnView {
            hand,
            draw_options: vec![c(13, Spades)],
            last_discard: vec![c(13, Spades)],
            discard_pile: vec![c(13, Spades)],
            deck_size: 40,
            own_score: 0,
            opponents: vec![super::super::OpponentPublic {
                pid: "p2".to_string(),
                score: 0,
                hand_count: 5,
            }],
        }
    }

    #[test]
    fn test_normal_cdf_symmetry() {
        assert!((normal_cdf(0.0) - 0.5).abs() < 1e-6);
        assert!((normal_cdf(1.96) - 0.975).abs() < 1e-3);
        assert!((normal_cdf(-1.96) - 0.025).abs() < 1e-3);
    }

    #[test]
    fn test_rollout_seed_is_stable_and_state_sensitive() {
        let view = bare_view(vec![c(4, Hearts), c(9, Clubs)]);
        assert_eq!(rollout_seed(&view), rollout_seed(&view));
        let mut other = bare_view(vec![c(4, Hearts), c(9, Clubs)]);
        other.deck_size = 39;
        assert_ne!(rollout_seed(&view), rollout_seed(&other));
    }

    #[test]
    fn test_decide_prefers_dumping_heavy_cards() {
        let mut state = BrainState::new();
        let view = bare_view(vec![
            c(13, Hearts),
            c(12, Clubs),
            c(2, Spades),
            c(1, Diamonds),
        ]);
        let decision = decide(&mut state, &view, 24);
        // The high card goes, not the ace.
        assert!(decision
            .discard
            .iter()
            .all(|card| card.rank_index() >= 12 || card.value() >= 10));
    }

    #[test]
    fn test_decide_repeats_identically_on_same_state() {
        let view = bare_view(vec![c(13, Hearts), c(7, Clubs), c(2, Spades)]);
        let mut a = BrainState::new();
        let mut b = BrainState::new();
        let first = decide(&mut a, &view, 24);
        let second = decide(&mut b, &view, 24);
        assert_eq!(first.discard, second.discard);
        assert_eq!(first.draw, second.draw);
    }

    #[test]
    fn test_should_declare_without_opponent_models() {
        let state = BrainState::new();
        assert!(should_declare(&state, &bare_view(vec![c(1, Clubs)])));
        assert!(!should_declare(
            &state,
            &bare_view(vec![c(2, Clubs), c(2, Hearts)])
        ));
    }

    #[test]
    fn test_never_declares_over_five() {
        let mut state = BrainState::new();
        state
            .observers
            .insert("p2".to_string(), OpponentModel::new("p2", 0, 5));
        assert!(!should_declare(
            &state,
            &bare_view(vec![c(3, Clubs), c(3, Hearts)])
        ));
    }

    #[test]
    fn test_declares_zero_hand_against_full_opponents() {
        let mut state = BrainState::new();
        state
            .observers
            .insert("p2".to_string(), OpponentModel::new("p2", 0, 5));
        let view = bare_view(vec![Card::joker(0)]);
        assert!(should_declare(&state, &view));
    }

    #[test]
    fn test_feed_penalty_ramps_with_collection_signals() {
        let mut model = OpponentModel::new("p2", 0, 5);
        let baseline = feed_penalty(&[&model], &[c(7, Hearts)]);
        model.record_turn(&[], Some(c(7, Spades)), 5);
        let fed = feed_penalty(&[&model], &[c(7, Hearts)]);
        assert!(fed > baseline);
    }

    #[test]
    fn test_composition_rewards_pairs_and_neighbors() {
        let pair = composition_bonus(&[c(7, Hearts), c(7, Spades)]);
        let neighbors = composition_bonus(&[c(7, Hearts), c(8, Hearts)]);
        let scattered = composition_bonus(&[c(7, Hearts), c(2, Clubs)]);
        assert!(pair > scattered);
        assert!(neighbors > scattered);
    }
}
