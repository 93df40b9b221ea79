//! Hand Scoring and Winner Resolution
//!
//! Deterministic integer scoring of verified hands. Every 5-card sub-hand
//! of a player's pool (hole plus community) gets a single integer score;
//! the winner set is whoever holds the maximum, with a hole-card
//! tiebreak and split pots preserved. The arithmetic is fixed so scores
//! compare bit-identically across implementations.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::events::{PlayerId, PlayerProfile};
use crate::cards::Card;

/// Hand categories in ascending strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandCategory {
    /// No made hand; scored on the single highest card.
    HighCard,
    /// One pair.
    OnePair,
    /// Two pairs.
    TwoPair,
    /// Three of a kind.
    ThreeOfAKind,
    /// Five consecutive ranks.
    Straight,
    /// Five cards of one suit.
    Flush,
    /// Three of a kind plus a pair.
    FullHouse,
    /// Four of a kind.
    FourOfAKind,
    /// Straight in one suit.
    StraightFlush,
    /// Ace-high straight in one suit.
    RoyalFlush,
}

impl HandCategory {
    /// Score multiplier. The gaps between multipliers guarantee strict
    /// ordering across categories for any card weights.
    pub const fn multiplier(self) -> i64 {
        match self {
            Self::RoyalFlush => 1_000_000_000,
            Self::StraightFlush => 100_000_000,
            Self::FourOfAKind => 10_000_000,
            Self::FullHouse => 1_000_000,
            Self::Flush => 100_000,
            Self::Straight => 10_000,
            Self::ThreeOfAKind => 1_000,
            Self::TwoPair => 100,
            Self::OnePair => 15,
            Self::HighCard => 1,
        }
    }
}

/// A scored sub-hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredHand {
    /// The cards of this sub-hand.
    pub cards: Vec<Card>,
    /// Detected category.
    pub category: HandCategory,
    /// Deterministic integer score.
    pub score: i64,
}

/// The ten concrete rank windows a straight can occupy. The listed value
/// is the window's low rank; the ace-high window is low 10.
const STRAIGHT_WINDOWS: [(u8, [u8; 5]); 10] = [
    (1, [1, 2, 3, 4, 5]),
    (2, [2, 3, 4, 5, 6]),
    (3, [3, 4, 5, 6, 7]),
    (4, [4, 5, 6, 7, 8]),
    (5, [5, 6, 7, 8, 9]),
    (6, [6, 7, 8, 9, 10]),
    (7, [7, 8, 9, 10, 11]),
    (8, [8, 9, 10, 11, 12]),
    (9, [9, 10, 11, 12, 13]),
    (10, [10, 11, 12, 13, 1]),
];

/// Sort-free straight detection: the hand's rank multiset is tested
/// against each concrete window. Returns the window's low rank.
fn straight_low(cards: &[Card]) -> Option<u8> {
    if cards.len() != 5 {
        return None;
    }

    let mut counts = [0u8; 15];
    for card in cards {
        counts[card.rank() as usize] += 1;
    }

    STRAIGHT_WINDOWS
        .iter()
        .find(|(_, window)| window.iter().all(|&rank| counts[rank as usize] == 1))
        .map(|&(low, _)| low)
}

fn is_flush(cards: &[Card]) -> bool {
    cards.len() == 5 && cards.iter().all(|c| c.suit() == cards[0].suit())
}

/// Multiplicity of each rank present, largest first.
fn rank_shape(cards: &[Card]) -> Vec<u8> {
    let mut counts: BTreeMap<u8, u8> = BTreeMap::new();
    for card in cards {
        *counts.entry(card.rank()).or_default() += 1;
    }
    let mut shape: Vec<u8> = counts.into_values().collect();
    shape.sort_unstable_by(|a, b| b.cmp(a));
    shape
}

/// Score one sub-hand of up to five cards.
///
/// `hand_value` is the sum of high weights (low weights for the low-ace
/// straight); kicker categories subtract the kickers' over-count with
/// `adjust = sum·multiplier·(−1) + sum`, leaving kickers to contribute
/// linearly below the multiplier.
pub fn score_hand(cards: &[Card]) -> ScoredHand {
    let straight = straight_low(cards);
    let flush = is_flush(cards);
    let shape = rank_shape(cards);

    let category = match (straight, flush, shape.as_slice()) {
        (Some(10), true, _) => HandCategory::RoyalFlush,
        (Some(_), true, _) => HandCategory::StraightFlush,
        (_, _, [4, ..]) => HandCategory::FourOfAKind,
        (_, _, [3, 2, ..]) => HandCategory::FullHouse,
        (_, true, _) => HandCategory::Flush,
        (Some(_), _, _) => HandCategory::Straight,
        (_, _, [3, ..]) => HandCategory::ThreeOfAKind,
        (_, _, [2, 2, ..]) => HandCategory::TwoPair,
        (_, _, [2, ..]) => HandCategory::OnePair,
        _ => HandCategory::HighCard,
    };

    // the wheel counts its ace low
    let low_ace = straight == Some(1);
    let weight = |card: &Card| {
        if low_ace {
            i64::from(card.value())
        } else {
            i64::from(card.high_value())
        }
    };

    let multiplier = category.multiplier();
    let score = match category {
        HandCategory::HighCard => cards
            .iter()
            .map(|c| i64::from(c.high_value()))
            .max()
            .unwrap_or(0),
        _ => {
            let hand_value: i64 = cards.iter().map(weight).sum();
            let kicker_sum = kicker_sum(cards, category);
            hand_value * multiplier + kicker_sum * multiplier * -1 + kicker_sum
        }
    };

    ScoredHand {
        cards: cards.to_vec(),
        category,
        score,
    }
}

/// Sum of high weights over the cards that are kickers for the category.
fn kicker_sum(cards: &[Card], category: HandCategory) -> i64 {
    let singles_only = matches!(
        category,
        HandCategory::FourOfAKind
            | HandCategory::ThreeOfAKind
            | HandCategory::TwoPair
            | HandCategory::OnePair
    );
    if !singles_only {
        return 0;
    }

    let mut counts: BTreeMap<u8, u8> = BTreeMap::new();
    for card in cards {
        *counts.entry(card.rank()).or_default() += 1;
    }

    cards
        .iter()
        .filter(|card| counts[&card.rank()] == 1)
        .map(|card| i64::from(card.high_value()))
        .sum()
}

/// All 5-card sub-hands of a player's pool. Seven cards yield 21
/// sub-hands, six yield 6; five or fewer yield the single available hand.
pub fn enumerate_hands(private: &[Card], community: &[Card]) -> Vec<Vec<Card>> {
    let pool: Vec<Card> = private.iter().chain(community).cloned().collect();
    if pool.len() <= 5 {
        return vec![pool];
    }
    k_subsets(&pool, 5)
}

fn k_subsets(pool: &[Card], k: usize) -> Vec<Vec<Card>> {
    let n = pool.len();
    let mut out = Vec::new();
    if k > n {
        return out;
    }

    let mut idx: Vec<usize> = (0..k).collect();
    loop {
        out.push(idx.iter().map(|&i| pool[i].clone()).collect());

        let mut i = k;
        while i > 0 && idx[i - 1] == n - k + (i - 1) {
            i -= 1;
        }
        if i == 0 {
            break;
        }
        idx[i - 1] += 1;
        for j in i..k {
            idx[j] = idx[j - 1] + 1;
        }
    }
    out
}

/// Score every sub-hand of one player's pool.
pub fn score_pools(private: &[Card], community: &[Card]) -> Vec<ScoredHand> {
    enumerate_hands(private, community)
        .iter()
        .map(|hand| score_hand(hand))
        .collect()
}

/// A winning (player, hand) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Winner {
    /// The winning player's roster copy.
    pub player: PlayerProfile,
    /// The sub-hand that won.
    pub hand: ScoredHand,
}

/// Hole-card tiebreak: ten times the higher hole weight plus the lower.
fn hole_tiebreak(private: &[Card]) -> i64 {
    let hi = private
        .iter()
        .map(|c| i64::from(c.high_value()))
        .max()
        .unwrap_or(0);
    let lo = private
        .iter()
        .map(|c| i64::from(c.high_value()))
        .min()
        .unwrap_or(0);
    hi * 10 + lo
}

/// Resolve the winner set across all non-folded players.
///
/// The maximum score across every scored sub-hand wins. When more than
/// one player holds it, their scores are replaced by the hole-card
/// tiebreak and re-maxed; ties that persist split the pot. The final list
/// carries each winning player exactly once.
pub fn resolve_winners(
    players: &[PlayerProfile],
    hands: &BTreeMap<PlayerId, Vec<ScoredHand>>,
    private_cards: &BTreeMap<PlayerId, Vec<Card>>,
) -> Vec<Winner> {
    let mut candidates: Vec<(&PlayerProfile, &ScoredHand)> = Vec::new();
    let mut best = i64::MIN;

    for player in players.iter().filter(|p| !p.has_folded) {
        let Some(scored) = hands.get(&player.player_id) else {
            continue;
        };
        for hand in scored {
            if hand.score > best {
                best = hand.score;
                candidates.clear();
            }
            if hand.score == best {
                candidates.push((player, hand));
            }
        }
    }

    let distinct: BTreeSet<&PlayerId> = candidates.iter().map(|(p, _)| &p.player_id).collect();
    if distinct.len() > 1 {
        let empty = Vec::new();
        let tiebreak =
            |id: &PlayerId| hole_tiebreak(private_cards.get(id).unwrap_or(&empty));
        let best_tiebreak = candidates
            .iter()
            .map(|(player, _)| tiebreak(&player.player_id))
            .max()
            .unwrap_or(0);
        candidates.retain(|(player, _)| tiebreak(&player.player_id) == best_tiebreak);
    }

    // a player with several sub-hands at the top collapses to one row
    let mut seen: BTreeSet<&PlayerId> = BTreeSet::new();
    candidates
        .into_iter()
        .filter(|(player, _)| seen.insert(&player.player_id))
        .map(|(player, hand)| Winner {
            player: player.clone(),
            hand: hand.clone(),
        })
        .collect()
}
