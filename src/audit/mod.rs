//! Post-Hand Audit Pipeline
//!
//! Everything between the game layer's broadcast events and the final
//! verdict:
//!
//! ```text
//! game events ──▶ transcript ──(keychain gate)──▶ deck ──▶ deal ──▶ score
//!                                                verify    verify
//! ```
//!
//! Capture is append-only and passive; verification is a deterministic
//! replay of the whole hand against the committed keychains; scoring runs
//! only on a fully verified hand.

use serde::{Deserialize, Serialize};

use crate::core::residue::Residue;

pub mod analyzer;
pub mod deal;
pub mod deck;
pub mod events;
pub mod score;
pub mod transcript;

use events::PlayerId;

/// Audit failure taxonomy.
///
/// The first error encountered aborts verification: the replay is pure
/// and deterministic, so nothing is retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum AuditError {
    /// Not all players committed their keychains before the deadline.
    #[error("keychain commit deadline expired before all players committed")]
    KeychainTimeout,

    /// Re-encryption replay disagrees with a committed deck snapshot.
    #[error("deck re-encryption by {offender} does not match committed snapshot {stage}")]
    DeckEncryptionMismatch {
        /// Index of the snapshot that failed to replay.
        stage: usize,
        /// Player whose encryption stage it was.
        offender: PlayerId,
    },

    /// A selected ciphertext is not present in the remaining encrypted
    /// deck, or would be drawn twice.
    #[error("selection by {offender} in {dealer}'s deal drew outside the remaining deck")]
    SelectDuplicate {
        /// Player who submitted the selection.
        offender: PlayerId,
        /// Selecting player whose deal it was.
        dealer: PlayerId,
    },

    /// Disallowed transition in a deal sequence.
    #[error("malformed deal sequence for dealer {dealer}")]
    ProtocolSequence {
        /// Selecting player whose deal sequence is malformed.
        dealer: PlayerId,
    },

    /// A partial decryption is inconsistent with the prior stage.
    #[error("partial decryption by {offender} at round {round} disagrees with the prior stage")]
    IntermediateDecryptMismatch {
        /// Player whose decryption round failed to replay.
        offender: PlayerId,
        /// Decryption round within the deal (selection is round zero).
        round: usize,
    },

    /// A final decryption result does not resolve via the card registry.
    #[error("final decryption after {offender}'s round produced non-card value {value}")]
    NonMappingResult {
        /// Sender of the last broadcast round in the chain.
        offender: PlayerId,
        /// The unresolvable value.
        value: Residue,
    },
}

impl AuditError {
    /// Numeric code reported alongside the message.
    pub const fn code(&self) -> u8 {
        match self {
            Self::KeychainTimeout => 0,
            Self::DeckEncryptionMismatch { .. } => 1,
            Self::SelectDuplicate { .. }
            | Self::ProtocolSequence { .. }
            | Self::IntermediateDecryptMismatch { .. }
            | Self::NonMappingResult { .. } => 2,
        }
    }
}
