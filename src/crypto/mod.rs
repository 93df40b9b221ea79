//! Commutative Cipher Capability
//!
//! The verifier only needs two operations — encrypt and decrypt a single
//! value under one keypair — with the commutative property
//! `E_a(E_b(x)) = E_b(E_a(x))` and `D_a(E_a(x)) = x`. The concrete
//! primitive is an external collaborator behind the [`CardCipher`] trait;
//! [`sra::SraCipher`] is the bundled reference implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::residue::Residue;

pub mod sra;
pub use sra::SraCipher;

/// One commutative keypair: encryption exponent, decryption exponent, and
/// the shared modulus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keypair {
    /// Encryption key.
    pub enc_key: Residue,
    /// Decryption key.
    pub dec_key: Residue,
    /// Shared modulus.
    pub modulus: Residue,
}

/// A player's ordered keypair sequence for one hand.
///
/// Players may rotate keys while a hand is being set up; the last keypair
/// is the one the committed deck was encrypted under, and the only one
/// the replay uses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keychain(Vec<Keypair>);

impl Keychain {
    /// Wrap an ordered keypair sequence.
    pub fn new(keypairs: Vec<Keypair>) -> Self {
        Self(keypairs)
    }

    /// The keypair used during the hand.
    pub fn final_keypair(&self) -> Option<&Keypair> {
        self.0.last()
    }

    /// Number of committed keypairs.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the player committed no keypairs.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Keypair> for Keychain {
    fn from(keypair: Keypair) -> Self {
        Self(vec![keypair])
    }
}

/// Commutative encrypt/decrypt capability.
///
/// Implementations must be deterministic and stateless: the same value
/// under the same keypair always produces the same result, from any task.
#[async_trait]
pub trait CardCipher: Send + Sync {
    /// Encrypt a single value under one keypair.
    async fn encrypt(&self, value: &Residue, keypair: &Keypair) -> Residue;

    /// Decrypt a single value under one keypair.
    async fn decrypt(&self, value: &Residue, keypair: &Keypair) -> Residue;
}

/// Encrypt a whole deck stage concurrently and await the batch.
pub async fn encrypt_batch<C>(cipher: &C, values: &[Residue], keypair: &Keypair) -> Vec<Residue>
where
    C: CardCipher + ?Sized,
{
    futures::future::join_all(values.iter().map(|value| cipher.encrypt(value, keypair))).await
}

/// Decrypt a whole deal step concurrently and await the batch.
pub async fn decrypt_batch<C>(cipher: &C, values: &[Residue], keypair: &Keypair) -> Vec<Residue>
where
    C: CardCipher + ?Sized,
{
    futures::future::join_all(values.iter().map(|value| cipher.decrypt(value, keypair))).await
}
