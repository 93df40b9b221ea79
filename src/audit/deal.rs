//! Deal Replay Verification
//!
//! Walks each selecting player's deal list and replays it against the
//! committed keychains: selections must draw real, undrawn ciphertexts
//! from the canonical encrypted deck; every broadcast partial decryption
//! must be consistent with the stage before it; and the terminal
//! decryption — never broadcast, always the selecting player's own — must
//! land on registered card faces.
//!
//! Protocol invariant: the selecting player is the ultimate decryptor of
//! their own deal. The walk always finalizes under the selecting player's
//! final keypair, so a transcript in which someone else contributed the
//! terminal round cannot resolve and is rejected.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use super::events::PlayerId;
use super::transcript::{DealEntry, DealKind};
use super::AuditError;
use crate::cards::{Card, CardRegistry};
use crate::core::{multiset, residue::Residue};
use crate::crypto::{decrypt_batch, CardCipher, Keychain, Keypair};

/// Verified cards recovered from the deal replay.
#[derive(Debug, Clone, Default)]
pub struct DealOutcome {
    /// Hole cards per selecting player.
    pub private_cards: BTreeMap<PlayerId, Vec<Card>>,
    /// Community cards, in resolution order.
    pub community: Vec<Card>,
}

/// Replay every deal list against the canonical encrypted deck.
///
/// Deal lists are walked in insertion order; selecting players are
/// independent of each other because each ciphertext leaves the shared
/// pool at most once.
pub async fn verify_deals<C>(
    deals: &BTreeMap<PlayerId, Vec<DealEntry>>,
    mut pool: Vec<Residue>,
    keychains: &BTreeMap<PlayerId, Keychain>,
    registry: &CardRegistry,
    cipher: &C,
) -> Result<DealOutcome, AuditError>
where
    C: CardCipher + ?Sized,
{
    let mut outcome = DealOutcome::default();
    for (dealer, entries) in deals {
        verify_dealer_sequence(
            dealer,
            entries,
            &mut pool,
            keychains,
            registry,
            cipher,
            &mut outcome,
        )
        .await?;
        debug!(dealer = %dealer, remaining = pool.len(), "deal list replayed");
    }
    Ok(outcome)
}

/// Walk one selecting player's deal list with the
/// `(previous, current)` entry state machine.
#[allow(clippy::too_many_arguments)]
async fn verify_dealer_sequence<C>(
    dealer: &PlayerId,
    entries: &[DealEntry],
    pool: &mut Vec<Residue>,
    keychains: &BTreeMap<PlayerId, Keychain>,
    registry: &CardRegistry,
    cipher: &C,
    outcome: &mut DealOutcome,
) -> Result<(), AuditError>
where
    C: CardCipher + ?Sized,
{
    let first = match entries.first() {
        None => return Ok(()),
        Some(first) => first,
    };

    // a selecting player without a committed keychain cannot finalize
    let own_keypair = keychains
        .get(dealer)
        .and_then(Keychain::final_keypair)
        .ok_or_else(|| AuditError::ProtocolSequence {
            dealer: dealer.clone(),
        })?;

    if first.kind != DealKind::Select {
        return Err(AuditError::ProtocolSequence {
            dealer: dealer.clone(),
        });
    }
    draw(pool, first, dealer)?;

    let mut previous = first;
    let mut round = 0usize;
    for (index, entry) in entries.iter().enumerate().skip(1) {
        let is_last = index + 1 == entries.len();

        match (previous.kind, entry.kind) {
            // two selections in a row cannot happen in a well-formed deal
            (DealKind::Select, DealKind::Select) => {
                return Err(AuditError::ProtocolSequence {
                    dealer: dealer.clone(),
                });
            }

            // the previous round was the penultimate partial decryption:
            // the dealer finalizes it under their own keypair before the
            // new selection draws from the pool
            (DealKind::Decrypt, DealKind::Select) => {
                finalize(dealer, own_keypair, previous, registry, cipher, outcome).await?;
                draw(pool, entry, dealer)?;
                round = 0;
            }

            // terminal broadcast round of the final deal: the dealer's
            // own decryption is implicit, computed from their keychain
            (_, DealKind::Decrypt) if is_last => {
                finalize(dealer, own_keypair, entry, registry, cipher, outcome).await?;
            }

            // the decryption chain begins; nothing to check against yet
            (DealKind::Select, DealKind::Decrypt) => {
                round = 1;
            }

            // interior round: the sender's decryption of the prior stage
            // must reproduce exactly what they broadcast
            (DealKind::Decrypt, DealKind::Decrypt) => {
                round += 1;
                let keypair = keychains
                    .get(&entry.from)
                    .and_then(Keychain::final_keypair)
                    .ok_or_else(|| AuditError::IntermediateDecryptMismatch {
                        offender: entry.from.clone(),
                        round,
                    })?;

                let stepped = decrypt_batch(cipher, &previous.cards, keypair).await;
                if !multiset::multiset_eq(&stepped, &entry.cards) {
                    return Err(AuditError::IntermediateDecryptMismatch {
                        offender: entry.from.clone(),
                        round,
                    });
                }
            }
        }

        previous = entry;
    }

    if previous.kind == DealKind::Select {
        // drawn but never decrypted; nothing to resolve
        warn!(dealer = %dealer, "deal list ends in an unfinished selection");
    }

    Ok(())
}

/// Remove a selection's ciphertexts from the shared pool, exactly once
/// each.
fn draw(pool: &mut Vec<Residue>, entry: &DealEntry, dealer: &PlayerId) -> Result<(), AuditError> {
    if multiset::remove_exact(pool, &entry.cards) {
        Ok(())
    } else {
        Err(AuditError::SelectDuplicate {
            offender: entry.from.clone(),
            dealer: dealer.clone(),
        })
    }
}

/// Apply the selecting player's own final keypair to a broadcast round
/// and resolve the results against the registry.
async fn finalize<C>(
    dealer: &PlayerId,
    own_keypair: &Keypair,
    entry: &DealEntry,
    registry: &CardRegistry,
    cipher: &C,
    outcome: &mut DealOutcome,
) -> Result<(), AuditError>
where
    C: CardCipher + ?Sized,
{
    let plain = decrypt_batch(cipher, &entry.cards, own_keypair).await;
    for value in plain {
        match registry.resolve(&value) {
            None => {
                return Err(AuditError::NonMappingResult {
                    offender: entry.from.clone(),
                    value,
                });
            }
            Some(card) => {
                if entry.private {
                    outcome
                        .private_cards
                        .entry(dealer.clone())
                        .or_default()
                        .push(card.clone());
                } else {
                    outcome.community.push(card.clone());
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::sra::{demo_modulus, derive_keypair};
    use crate::crypto::SraCipher;

    fn pid(id: &str) -> PlayerId {
        PlayerId::new(id)
    }

    fn enc(value: &Residue, keypair: &Keypair) -> Residue {
        value
            .magnitude()
            .modpow(keypair.enc_key.magnitude(), keypair.modulus.magnitude())
            .into()
    }

    fn dec(value: &Residue, keypair: &Keypair) -> Residue {
        value
            .magnitude()
            .modpow(keypair.dec_key.magnitude(), keypair.modulus.magnitude())
            .into()
    }

    fn dec_all(values: &[Residue], keypair: &Keypair) -> Vec<Residue> {
        values.iter().map(|v| dec(v, keypair)).collect()
    }

    /// Three players, a ten-card deck, and the fully-encrypted pool.
    struct Table {
        mappings: Vec<Residue>,
        pool: Vec<Residue>,
        keychains: BTreeMap<PlayerId, Keychain>,
        registry: CardRegistry,
    }

    impl Table {
        fn new() -> Self {
            let modulus = demo_modulus();
            let mappings: Vec<Residue> = (2..12).map(Residue::from_u64).collect();
            let registry = CardRegistry::from_mappings(&mappings).unwrap();

            let mut keychains = BTreeMap::new();
            for (name, seed) in [("p1", 41), ("p2", 42), ("p3", 43)] {
                keychains.insert(pid(name), Keychain::from(derive_keypair(&modulus, seed)));
            }

            let pool = mappings
                .iter()
                .map(|m| {
                    let mut value = m.clone();
                    for chain in keychains.values() {
                        value = enc(&value, chain.final_keypair().unwrap());
                    }
                    value
                })
                .collect();

            Self {
                mappings,
                pool,
                keychains,
                registry,
            }
        }

        fn keypair(&self, name: &str) -> &Keypair {
            self.keychains[&pid(name)].final_keypair().unwrap()
        }

        /// Ciphertexts of the given deck positions in the encrypted pool.
        fn selected(&self, positions: &[usize]) -> Vec<Residue> {
            positions.iter().map(|&i| self.pool[i].clone()).collect()
        }

        /// A full deal for `dealer`: selection plus honest partial
        /// decryptions by the two `others`, in order.
        fn deal(
            &self,
            dealer: &str,
            others: [&str; 2],
            positions: &[usize],
            private: bool,
        ) -> Vec<DealEntry> {
            let selected = self.selected(positions);
            let step1 = dec_all(&selected, self.keypair(others[0]));
            let step2 = dec_all(&step1, self.keypair(others[1]));
            vec![
                entry(dealer, DealKind::Select, private, selected),
                entry(others[0], DealKind::Decrypt, private, step1),
                entry(others[1], DealKind::Decrypt, private, step2),
            ]
        }

        async fn verify(
            &self,
            deals: &BTreeMap<PlayerId, Vec<DealEntry>>,
        ) -> Result<DealOutcome, AuditError> {
            verify_deals(
                deals,
                self.pool.clone(),
                &self.keychains,
                &self.registry,
                &SraCipher,
            )
            .await
        }
    }

    fn entry(from: &str, kind: DealKind, private: bool, cards: Vec<Residue>) -> DealEntry {
        DealEntry {
            from: pid(from),
            kind,
            private,
            cards,
        }
    }

    #[tokio::test]
    async fn test_honest_deals_resolve() {
        let table = Table::new();
        let mut deals = BTreeMap::new();
        // p1 draws two hole cards, then the community deal follows in the
        // same list; p2 draws two hole cards of their own
        let mut p1 = table.deal("p1", ["p2", "p3"], &[0, 3], true);
        p1.extend(table.deal("p1", ["p2", "p3"], &[5, 6, 7], false));
        deals.insert(pid("p1"), p1);
        deals.insert(pid("p2"), table.deal("p2", ["p1", "p3"], &[1, 2], true));

        let outcome = table.verify(&deals).await.unwrap();

        let holes: Vec<&Residue> = outcome.private_cards[&pid("p1")]
            .iter()
            .map(Card::mapping)
            .collect();
        assert_eq!(holes, vec![&table.mappings[0], &table.mappings[3]]);

        let community: Vec<&Residue> = outcome.community.iter().map(Card::mapping).collect();
        assert_eq!(
            community,
            vec![&table.mappings[5], &table.mappings[6], &table.mappings[7]]
        );

        let p2_holes: Vec<&Residue> = outcome.private_cards[&pid("p2")]
            .iter()
            .map(Card::mapping)
            .collect();
        assert_eq!(p2_holes, vec![&table.mappings[1], &table.mappings[2]]);
    }

    #[tokio::test]
    async fn test_double_draw_across_dealers() {
        let table = Table::new();
        let mut deals = BTreeMap::new();
        deals.insert(pid("p1"), table.deal("p1", ["p2", "p3"], &[0, 3], true));
        // p2 re-selects a ciphertext p1 already drew
        deals.insert(pid("p2"), table.deal("p2", ["p1", "p3"], &[3, 4], true));

        let err = table.verify(&deals).await.unwrap_err();
        assert_eq!(
            err,
            AuditError::SelectDuplicate {
                offender: pid("p2"),
                dealer: pid("p2"),
            }
        );
    }

    #[tokio::test]
    async fn test_select_outside_pool() {
        let table = Table::new();
        let mut deals = BTreeMap::new();
        let mut deal = table.deal("p1", ["p2", "p3"], &[0, 1], true);
        deal[0].cards[1] = Residue::from_u64(777_777);
        deals.insert(pid("p1"), deal);

        let err = table.verify(&deals).await.unwrap_err();
        assert_eq!(
            err,
            AuditError::SelectDuplicate {
                offender: pid("p1"),
                dealer: pid("p1"),
            }
        );
    }

    #[tokio::test]
    async fn test_consecutive_selects_rejected() {
        let table = Table::new();
        let mut deals = BTreeMap::new();
        deals.insert(
            pid("p1"),
            vec![
                entry("p1", DealKind::Select, true, table.selected(&[0])),
                entry("p1", DealKind::Select, true, table.selected(&[1])),
            ],
        );

        let err = table.verify(&deals).await.unwrap_err();
        assert_eq!(err, AuditError::ProtocolSequence { dealer: pid("p1") });
    }

    #[tokio::test]
    async fn test_deal_opening_with_decrypt_rejected() {
        let table = Table::new();
        let mut deals = BTreeMap::new();
        deals.insert(
            pid("p1"),
            vec![entry("p2", DealKind::Decrypt, true, table.selected(&[0]))],
        );

        let err = table.verify(&deals).await.unwrap_err();
        assert_eq!(err, AuditError::ProtocolSequence { dealer: pid("p1") });
    }

    #[tokio::test]
    async fn test_tampered_interior_round() {
        let table = Table::new();
        let mut deals = BTreeMap::new();
        // p3's round is interior because the community deal follows
        let mut p1 = table.deal("p1", ["p2", "p3"], &[0, 3], true);
        p1[2].cards[0] = Residue::from_u64(555_555);
        p1.extend(table.deal("p1", ["p2", "p3"], &[5], false));
        deals.insert(pid("p1"), p1);

        let err = table.verify(&deals).await.unwrap_err();
        assert_eq!(
            err,
            AuditError::IntermediateDecryptMismatch {
                offender: pid("p3"),
                round: 2,
            }
        );
    }

    #[tokio::test]
    async fn test_tampered_terminal_round() {
        let table = Table::new();
        let mut deals = BTreeMap::new();
        let mut deal = table.deal("p1", ["p2", "p3"], &[0, 3], true);
        // the last broadcast round is only checked by the dealer's own
        // final decryption, which must land outside the registry
        deal[2].cards[1] = Residue::from_u64(555_555);
        deals.insert(pid("p1"), deal);

        let err = table.verify(&deals).await.unwrap_err();
        match err {
            AuditError::NonMappingResult { offender, .. } => assert_eq!(offender, pid("p3")),
            other => panic!("expected NonMappingResult, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_two_player_deal_finalizes_after_single_decrypt() {
        // reduced table: only p1 and p2 encrypt the deck
        let modulus = demo_modulus();
        let mappings: Vec<Residue> = (2..8).map(Residue::from_u64).collect();
        let registry = CardRegistry::from_mappings(&mappings).unwrap();

        let mut keychains = BTreeMap::new();
        for (name, seed) in [("p1", 51), ("p2", 52)] {
            keychains.insert(pid(name), Keychain::from(derive_keypair(&modulus, seed)));
        }
        let pool: Vec<Residue> = mappings
            .iter()
            .map(|m| {
                let mut value = m.clone();
                for chain in keychains.values() {
                    value = enc(&value, chain.final_keypair().unwrap());
                }
                value
            })
            .collect();

        let selected = vec![pool[4].clone()];
        let step1 = dec_all(&selected, keychains[&pid("p2")].final_keypair().unwrap());
        let mut deals = BTreeMap::new();
        deals.insert(
            pid("p1"),
            vec![
                entry("p1", DealKind::Select, true, selected),
                entry("p2", DealKind::Decrypt, true, step1),
            ],
        );

        let outcome = verify_deals(&deals, pool, &keychains, &registry, &SraCipher)
            .await
            .unwrap();
        assert_eq!(
            outcome.private_cards[&pid("p1")][0].mapping(),
            &mappings[4]
        );
    }
}
