//! Hand Transcript Capture
//!
//! Append-only record of everything the game layer broadcast during one
//! hand: the dealer's plaintext deck, every re-encryption snapshot, every
//! selection and partial decryption, the claimed dealt cards, and the
//! keychains committed after play. All data needed to deterministically
//! replay and verify the hand lives here.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::events::PlayerId;
use crate::cards::{CardRegistry, RegistryError};
use crate::core::residue::Residue;
use crate::crypto::Keychain;

/// Domain separator for transcript digests.
const TRANSCRIPT_DOMAIN: &[u8] = b"POKER_AUDIT_TRANSCRIPT_V1";

/// One committed deck state.
///
/// Snapshot zero carries the dealer's plaintext mappings; each later
/// snapshot is the previous deck re-encrypted under `from`'s final
/// keypair and shuffled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckSnapshot {
    /// Player whose broadcast produced this snapshot.
    pub from: PlayerId,
    /// Committed residues, in broadcast order.
    pub cards: Vec<Residue>,
}

/// Kind of deal entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealKind {
    /// A selecting player drew ciphertexts from the deck.
    Select,
    /// A player peeled their keypair off a prior selection.
    Decrypt,
}

/// One step of a deal exchange, kept per selecting player in broadcast
/// order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealEntry {
    /// Sender of this step.
    pub from: PlayerId,
    /// Selection or partial decryption.
    pub kind: DealKind,
    /// Hole cards when true, community cards when false.
    pub private: bool,
    /// The cards as broadcast at this step.
    pub cards: Vec<Residue>,
}

/// Claimed dealt cards as asserted by the game layer. Capture-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealtClaim {
    /// Claimed plaintext mappings.
    pub cards: Vec<Residue>,
    /// Hole cards when true, community cards when false.
    pub private: bool,
}

/// Errors raised on transcript insertion.
///
/// These are game-layer protocol bugs, not player cheats — the cheat
/// taxonomy lives in [`super::AuditError`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TranscriptError {
    /// The transcript is sealed; the gate already fired.
    #[error("transcript is sealed")]
    Sealed,

    /// A second deck generation was broadcast.
    #[error("deck already generated for this hand")]
    DeckAlreadyGenerated,

    /// A record arrived before the dealer published the deck.
    #[error("deck not generated yet")]
    DeckNotGenerated,

    /// A player broadcast a second encryption snapshot.
    #[error("player {0} already contributed a deck snapshot")]
    DuplicateEncryption(PlayerId),

    /// A snapshot's length disagrees with the deck's.
    #[error("snapshot of {got} cards does not match deck of {expected}")]
    SnapshotLength {
        /// Cards in the deck.
        expected: usize,
        /// Cards in the rejected snapshot.
        got: usize,
    },

    /// A decryption was broadcast for a dealer with no open selection.
    #[error("deal sequence for dealer {0} must begin with a selection")]
    DealWithoutSelection(PlayerId),

    /// The published deck could not populate the registry.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Append-only transcript store.
///
/// Mutated only by event callbacks before the keychain gate resolves;
/// read without locks by the verifiers afterwards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranscriptStore {
    snapshots: Vec<DeckSnapshot>,
    deals: BTreeMap<PlayerId, Vec<DealEntry>>,
    keychains: BTreeMap<PlayerId, Keychain>,
    claimed: Vec<DealtClaim>,
    registry: Option<CardRegistry>,
    sealed: bool,
}

impl TranscriptStore {
    /// Fresh, empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the dealer's face-up plaintext deck. Called once; also
    /// populates the card registry's active-game subset.
    pub fn record_deck_generation(
        &mut self,
        dealer: PlayerId,
        mappings: Vec<Residue>,
    ) -> Result<(), TranscriptError> {
        self.check_open()?;
        if !self.snapshots.is_empty() {
            return Err(TranscriptError::DeckAlreadyGenerated);
        }

        self.registry = Some(CardRegistry::from_mappings(&mappings)?);
        self.snapshots.push(DeckSnapshot {
            from: dealer,
            cards: mappings,
        });
        Ok(())
    }

    /// Record one re-encryption snapshot. Each player contributes at most
    /// one, and every snapshot has the deck's length.
    pub fn record_encryption(
        &mut self,
        player: PlayerId,
        deck: Vec<Residue>,
    ) -> Result<(), TranscriptError> {
        self.check_open()?;
        let expected = match self.snapshots.first() {
            None => return Err(TranscriptError::DeckNotGenerated),
            Some(plaintext) => plaintext.cards.len(),
        };
        if deck.len() != expected {
            return Err(TranscriptError::SnapshotLength {
                expected,
                got: deck.len(),
            });
        }
        // snapshot zero is the dealer's plaintext; the dealer still owes
        // an encryption snapshot of their own
        if self.snapshots.iter().skip(1).any(|s| s.from == player) {
            return Err(TranscriptError::DuplicateEncryption(player));
        }

        self.snapshots.push(DeckSnapshot {
            from: player,
            cards: deck,
        });
        Ok(())
    }

    /// Record a selection step for `dealer`'s deal list.
    pub fn record_selection(
        &mut self,
        dealer: PlayerId,
        from: PlayerId,
        cards: Vec<Residue>,
        private: bool,
    ) -> Result<(), TranscriptError> {
        self.check_open()?;
        if self.registry.is_none() {
            return Err(TranscriptError::DeckNotGenerated);
        }

        self.deals.entry(dealer).or_default().push(DealEntry {
            from,
            kind: DealKind::Select,
            private,
            cards,
        });
        Ok(())
    }

    /// Record a partial-decryption step for `dealer`'s deal list. The
    /// list must already be open with a selection.
    pub fn record_decryption(
        &mut self,
        dealer: PlayerId,
        from: PlayerId,
        cards: Vec<Residue>,
        private: bool,
    ) -> Result<(), TranscriptError> {
        self.check_open()?;
        match self.deals.get_mut(&dealer) {
            None => Err(TranscriptError::DealWithoutSelection(dealer)),
            Some(entries) => {
                entries.push(DealEntry {
                    from,
                    kind: DealKind::Decrypt,
                    private,
                    cards,
                });
                Ok(())
            }
        }
    }

    /// Record a committed keychain. Idempotent: the first submission per
    /// player wins and later ones are ignored. Returns true when stored.
    pub fn record_keychain(&mut self, player: PlayerId, keychain: Keychain) -> bool {
        if self.sealed || self.keychains.contains_key(&player) {
            return false;
        }
        self.keychains.insert(player, keychain);
        true
    }

    /// Record the game layer's claimed dealt cards (capture-only).
    pub fn record_dealt(&mut self, cards: Vec<Residue>, private: bool) -> Result<(), TranscriptError> {
        self.check_open()?;
        self.claimed.push(DealtClaim { cards, private });
        Ok(())
    }

    /// Close the transcript. Nothing is accepted afterwards.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    /// Whether the gate already fired.
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Committed deck snapshots in broadcast order.
    pub fn snapshots(&self) -> &[DeckSnapshot] {
        &self.snapshots
    }

    /// Deal lists grouped per selecting player, each in broadcast order.
    pub fn deals(&self) -> &BTreeMap<PlayerId, Vec<DealEntry>> {
        &self.deals
    }

    /// All committed keychains.
    pub fn keychains(&self) -> &BTreeMap<PlayerId, Keychain> {
        &self.keychains
    }

    /// One player's committed keychain.
    pub fn keychain(&self, player: &PlayerId) -> Option<&Keychain> {
        self.keychains.get(player)
    }

    /// The claimed dealt cards, in broadcast order.
    pub fn claimed(&self) -> &[DealtClaim] {
        &self.claimed
    }

    /// The active-game card registry, once the deck was generated.
    pub fn registry(&self) -> Option<&CardRegistry> {
        self.registry.as_ref()
    }

    /// Canonical byte encoding of the whole transcript.
    pub fn to_bytes(&self) -> Vec<u8> {
        bincode::serialize(self).expect("transcript serialization should not fail")
    }

    /// Domain-separated SHA-256 digest of the canonical encoding.
    pub fn digest(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(TRANSCRIPT_DOMAIN);
        hasher.update(self.to_bytes());
        hasher.finalize().into()
    }

    fn check_open(&self) -> Result<(), TranscriptError> {
        if self.sealed {
            Err(TranscriptError::Sealed)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(id: &str) -> PlayerId {
        PlayerId::new(id)
    }

    fn mappings(n: u64) -> Vec<Residue> {
        (0..n).map(|i| Residue::from_u64(1000 + i)).collect()
    }

    fn generated_store() -> TranscriptStore {
        let mut store = TranscriptStore::new();
        store.record_deck_generation(pid("p1"), mappings(52)).unwrap();
        store
    }

    #[test]
    fn test_generation_populates_registry() {
        let store = generated_store();
        assert_eq!(store.snapshots().len(), 1);
        assert_eq!(store.registry().unwrap().len(), 52);
    }

    #[test]
    fn test_generation_happens_once() {
        let mut store = generated_store();
        assert_eq!(
            store.record_deck_generation(pid("p1"), mappings(52)),
            Err(TranscriptError::DeckAlreadyGenerated)
        );
    }

    #[test]
    fn test_snapshots_grow_one_per_player() {
        let mut store = generated_store();
        store.record_encryption(pid("p1"), mappings(52)).unwrap();
        store.record_encryption(pid("p2"), mappings(52)).unwrap();
        assert_eq!(store.snapshots().len(), 3);

        assert_eq!(
            store.record_encryption(pid("p2"), mappings(52)),
            Err(TranscriptError::DuplicateEncryption(pid("p2")))
        );
    }

    #[test]
    fn test_dealer_may_encrypt_after_generating() {
        // snapshot zero is plaintext, not the dealer's encryption turn
        let mut store = generated_store();
        assert!(store.record_encryption(pid("p1"), mappings(52)).is_ok());
    }

    #[test]
    fn test_snapshot_length_must_match() {
        let mut store = generated_store();
        assert_eq!(
            store.record_encryption(pid("p2"), mappings(51)),
            Err(TranscriptError::SnapshotLength {
                expected: 52,
                got: 51
            })
        );
    }

    #[test]
    fn test_encryption_requires_generation() {
        let mut store = TranscriptStore::new();
        assert_eq!(
            store.record_encryption(pid("p2"), mappings(52)),
            Err(TranscriptError::DeckNotGenerated)
        );
    }

    #[test]
    fn test_deal_must_begin_with_selection() {
        let mut store = generated_store();
        assert_eq!(
            store.record_decryption(pid("p1"), pid("p2"), mappings(2), true),
            Err(TranscriptError::DealWithoutSelection(pid("p1")))
        );

        store
            .record_selection(pid("p1"), pid("p1"), mappings(2), true)
            .unwrap();
        assert!(store
            .record_decryption(pid("p1"), pid("p2"), mappings(2), true)
            .is_ok());
        assert_eq!(store.deals()[&pid("p1")].len(), 2);
    }

    #[test]
    fn test_keychain_upsert_is_idempotent() {
        let mut store = TranscriptStore::new();
        assert!(store.record_keychain(pid("p1"), Keychain::default()));
        assert!(!store.record_keychain(pid("p1"), Keychain::default()));
        assert_eq!(store.keychains().len(), 1);
    }

    #[test]
    fn test_sealed_store_rejects_everything() {
        let mut store = generated_store();
        store.seal();
        assert!(store.is_sealed());

        assert_eq!(
            store.record_encryption(pid("p2"), mappings(52)),
            Err(TranscriptError::Sealed)
        );
        assert_eq!(
            store.record_selection(pid("p1"), pid("p1"), mappings(2), true),
            Err(TranscriptError::Sealed)
        );
        assert_eq!(
            store.record_dealt(mappings(2), false),
            Err(TranscriptError::Sealed)
        );
        assert!(!store.record_keychain(pid("p1"), Keychain::default()));
    }

    #[test]
    fn test_digest_tracks_content() {
        let mut a = generated_store();
        let b = a.clone();
        assert_eq!(a.digest(), b.digest());

        a.record_encryption(pid("p2"), mappings(52)).unwrap();
        assert_ne!(a.digest(), b.digest());
    }
}
