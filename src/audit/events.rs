//! Audit Events
//!
//! The inbound surface the game layer drives the auditor through, and the
//! outbound lifecycle signals the auditor emits. Every payload is an
//! owned copy — the transcript must never alias game-layer state that
//! could mutate after capture.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::analyzer::AnalysisReport;
use crate::core::residue::Residue;
use crate::crypto::Keychain;

/// Opaque player identifier assigned by the game layer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(String);

impl PlayerId {
    /// Wrap a game-layer identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Copy of a game-layer player row, taken when the analyze phase starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerProfile {
    /// Opaque identifier.
    pub player_id: PlayerId,
    /// Whether this player dealt the hand (and so published the deck).
    pub is_dealer: bool,
    /// Whether the player folded before showdown.
    pub has_folded: bool,
}

impl PlayerProfile {
    /// Build a roster row.
    pub fn new(player_id: impl Into<PlayerId>, is_dealer: bool, has_folded: bool) -> Self {
        Self {
            player_id: player_id.into(),
            is_dealer,
            has_folded,
        }
    }
}

/// Inbound events from the game layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    /// The dealer published the face-up plaintext deck.
    DeckGenerated {
        /// Dealer who generated the deck.
        dealer: PlayerId,
        /// Plaintext mappings in canonical face order.
        mappings: Vec<Residue>,
    },

    /// A player re-encrypted and shuffled the deck.
    DeckEncrypted {
        /// Player whose keypair produced this snapshot.
        player: PlayerId,
        /// The committed deck after encryption and shuffle.
        deck: Vec<Residue>,
    },

    /// A selecting player drew ciphertexts from the deck.
    DealSelected {
        /// Selecting player the deal belongs to.
        dealer: PlayerId,
        /// Sender of the selection (the selecting player themselves).
        from: PlayerId,
        /// Drawn ciphertexts.
        cards: Vec<Residue>,
        /// Hole cards when true, community cards when false.
        private: bool,
    },

    /// A player partially decrypted another player's selection.
    DealDecrypted {
        /// Selecting player the deal belongs to.
        dealer: PlayerId,
        /// Player whose keypair was peeled off.
        from: PlayerId,
        /// The cards after this partial decryption.
        cards: Vec<Residue>,
        /// Hole cards when true, community cards when false.
        private: bool,
    },

    /// The game layer's claimed resolved cards. Captured for the frozen
    /// transcript only; the verdict never trusts them.
    CardsDealt {
        /// Claimed plaintext mappings.
        cards: Vec<Residue>,
        /// Hole cards when true, community cards when false.
        private: bool,
    },

    /// The hand moved to the analyze phase: arm the keychain-commit gate.
    /// Carries the roster copy taken at this moment.
    Analyze {
        /// Copies of every player row, fold state final.
        players: Vec<PlayerProfile>,
    },

    /// A player committed their keychain.
    KeychainCommitted {
        /// Committing player.
        player: PlayerId,
        /// Their ordered keypair sequence for the hand.
        keychain: Keychain,
    },
}

/// Outbound lifecycle signals, each carrying a report snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditSignal {
    /// The gate is armed; the transcript is closed to per-move events.
    Analyzing(AnalysisReport),
    /// Verification finished; the report carries the verdict, including
    /// any failure.
    Analyzed(AnalysisReport),
    /// Scoring finished; winners are resolved. Only emitted on success.
    Scored(AnalysisReport),
}
