//! Card Faces and the Active-Game Registry
//!
//! A face is bound to the plaintext residue the dealer published for it.
//! The registry is the injective residue → face table for one hand: every
//! mapping resolves to exactly one card and every card owns exactly one
//! mapping. It is built once from the dealer's face-up deck and immutable
//! afterwards.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::residue::Residue;

/// Number of cards in a full deck.
pub const DECK_SIZE: usize = 52;

/// Rank of the ace when played low.
pub const ACE_LOW: u8 = 1;

/// Weight of the ace when played high.
pub const ACE_HIGH: u8 = 14;

/// Card suit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Suit {
    /// ♣
    Clubs,
    /// ♦
    Diamonds,
    /// ♥
    Hearts,
    /// ♠
    Spades,
}

impl Suit {
    /// All suits in canonical order.
    pub fn suits() -> impl Iterator<Item = Self> {
        [Self::Clubs, Self::Diamonds, Self::Hearts, Self::Spades].into_iter()
    }
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suit = match self {
            Self::Clubs => 'C',
            Self::Diamonds => 'D',
            Self::Hearts => 'H',
            Self::Spades => 'S',
        };
        write!(f, "{suit}")
    }
}

/// A plaintext card face bound to its committed residue.
///
/// `value` is the low weight (ace = 1), `high_value` the high weight
/// (ace = 14); every other rank carries its own number in both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    mapping: Residue,
    suit: Suit,
    rank: u8,
    value: u8,
    high_value: u8,
}

impl Card {
    /// Bind a face to its published mapping. Rank runs 1..=13, ace = 1.
    pub fn new(mapping: Residue, suit: Suit, rank: u8) -> Self {
        debug_assert!((1..=13).contains(&rank), "rank {rank} out of range");
        let high_value = if rank == ACE_LOW { ACE_HIGH } else { rank };
        Self {
            mapping,
            suit,
            rank,
            value: rank,
            high_value,
        }
    }

    /// The committed plaintext residue.
    pub fn mapping(&self) -> &Residue {
        &self.mapping
    }

    /// The card's suit.
    pub fn suit(&self) -> Suit {
        self.suit
    }

    /// Rank 1..=13 with ace = 1.
    pub fn rank(&self) -> u8 {
        self.rank
    }

    /// Low scoring weight (ace = 1).
    pub fn value(&self) -> u8 {
        self.value
    }

    /// High scoring weight (ace = 14).
    pub fn high_value(&self) -> u8 {
        self.high_value
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rank = match self.rank {
            1 => "A".to_string(),
            11 => "J".to_string(),
            12 => "Q".to_string(),
            13 => "K".to_string(),
            n => n.to_string(),
        };
        write!(f, "{rank}{}", self.suit)
    }
}

/// Canonical face order the dealer publishes mappings in: suits in
/// canonical order, ranks ace-first within each suit.
pub fn canonical_faces() -> impl Iterator<Item = (Suit, u8)> {
    Suit::suits().flat_map(|suit| (1..=13).map(move |rank| (suit, rank)))
}

/// Errors raised while building the registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// The dealer published no mappings.
    #[error("published deck is empty")]
    Empty,

    /// More mappings than the face table holds.
    #[error("published deck of {0} exceeds the {DECK_SIZE}-card face table")]
    TooManyMappings(usize),

    /// The same residue was published for two faces.
    #[error("duplicate mapping {0} in published deck")]
    DuplicateMapping(Residue),
}

/// Injective residue → face table for the active game.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardRegistry {
    by_mapping: BTreeMap<Residue, Card>,
}

impl CardRegistry {
    /// Build the registry by zipping the dealer's published mappings with
    /// the canonical face order. Shorter decks are accepted (reduced
    /// games); duplicates are not.
    pub fn from_mappings(mappings: &[Residue]) -> Result<Self, RegistryError> {
        if mappings.is_empty() {
            return Err(RegistryError::Empty);
        }
        if mappings.len() > DECK_SIZE {
            return Err(RegistryError::TooManyMappings(mappings.len()));
        }

        let mut by_mapping = BTreeMap::new();
        for (mapping, (suit, rank)) in mappings.iter().zip(canonical_faces()) {
            let card = Card::new(mapping.clone(), suit, rank);
            if by_mapping.insert(mapping.clone(), card).is_some() {
                return Err(RegistryError::DuplicateMapping(mapping.clone()));
            }
        }

        Ok(Self { by_mapping })
    }

    /// Resolve a plaintext residue to its face, if it is one.
    pub fn resolve(&self, mapping: &Residue) -> Option<&Card> {
        self.by_mapping.get(mapping)
    }

    /// Number of registered faces.
    pub fn len(&self) -> usize {
        self.by_mapping.len()
    }

    /// True when no deck has been registered.
    pub fn is_empty(&self) -> bool {
        self.by_mapping.is_empty()
    }
}
