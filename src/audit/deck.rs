//! Deck Chain Verification
//!
//! Replays the re-encryption chain over the plaintext deck: each
//! committed snapshot must be the previous deck encrypted under its
//! contributor's final keypair, compared as a multiset because the
//! shuffle permutation is hidden. The chain ending in the final committed
//! deck is what makes every later draw provable.

use std::collections::BTreeMap;

use tracing::debug;

use super::events::PlayerId;
use super::transcript::DeckSnapshot;
use super::AuditError;
use crate::core::{multiset, residue::Residue};
use crate::crypto::{encrypt_batch, CardCipher, Keychain};

/// Replay each committed re-encryption stage and prove the chain.
///
/// All encryptions of a stage are issued concurrently and awaited as one
/// batch. On the first stage that fails to replay, verification aborts
/// with [`AuditError::DeckEncryptionMismatch`] naming the stage and its
/// contributor. Returns the canonical encrypted deck — the final
/// committed snapshot — for the deal verifier to draw from.
pub async fn verify_deck_chain<C>(
    snapshots: &[DeckSnapshot],
    keychains: &BTreeMap<PlayerId, Keychain>,
    cipher: &C,
) -> Result<Vec<Residue>, AuditError>
where
    C: CardCipher + ?Sized,
{
    let mut current: Vec<Residue> = match snapshots.first() {
        None => return Ok(Vec::new()),
        Some(plaintext) => plaintext.cards.clone(),
    };

    for (stage, snapshot) in snapshots.iter().enumerate().skip(1) {
        // a contributor without a committed keychain cannot be replayed
        let keypair = keychains
            .get(&snapshot.from)
            .and_then(Keychain::final_keypair)
            .ok_or_else(|| AuditError::DeckEncryptionMismatch {
                stage,
                offender: snapshot.from.clone(),
            })?;

        let encrypted = encrypt_batch(cipher, &current, keypair).await;
        if !multiset::multiset_eq(&encrypted, &snapshot.cards) {
            return Err(AuditError::DeckEncryptionMismatch {
                stage,
                offender: snapshot.from.clone(),
            });
        }

        debug!(stage, from = %snapshot.from, "deck stage replayed");
        current = snapshot.cards.clone();
    }

    Ok(current)
}
