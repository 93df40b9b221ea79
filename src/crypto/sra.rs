//! SRA Commutative Cipher
//!
//! The classic SRA (Shamir–Rivest–Adleman) mental-poker construction:
//! encryption raises a value to a secret exponent modulo a shared prime,
//! decryption raises it to the inverse exponent. Exponentiation under a
//! fixed modulus commutes, which is exactly the property the deck replay
//! relies on. The modular arithmetic itself is `num-bigint`'s — this
//! module only wires it to the [`CardCipher`] capability.

use async_trait::async_trait;
use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::One;

use super::{CardCipher, Keypair};
use crate::core::residue::Residue;

/// 2^89 − 1, a Mersenne prime comfortably larger than any card residue.
/// Shared demo modulus for fixtures and reduced games.
pub const DEMO_MODULUS_DEC: &str = "618970019642690137449562111";

/// The demo modulus as a residue.
pub fn demo_modulus() -> Residue {
    DEMO_MODULUS_DEC.parse().expect("constant modulus parses")
}

/// SRA cipher: `E(x) = x^e mod p`, `D(x) = x^d mod p` with
/// `e·d ≡ 1 (mod p−1)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SraCipher;

#[async_trait]
impl CardCipher for SraCipher {
    async fn encrypt(&self, value: &Residue, keypair: &Keypair) -> Residue {
        value
            .magnitude()
            .modpow(keypair.enc_key.magnitude(), keypair.modulus.magnitude())
            .into()
    }

    async fn decrypt(&self, value: &Residue, keypair: &Keypair) -> Residue {
        value
            .magnitude()
            .modpow(keypair.dec_key.magnitude(), keypair.modulus.magnitude())
            .into()
    }
}

/// Derive a deterministic keypair for a prime `modulus` from a seed.
///
/// The encryption exponent is the first odd candidate at or above the
/// seed-derived start that is invertible modulo `p − 1`; the decryption
/// exponent is its modular inverse. Deterministic so fixtures and
/// replays reproduce bit-identically.
pub fn derive_keypair(modulus: &Residue, seed: u64) -> Keypair {
    let group_order = modulus.magnitude() - BigUint::one();

    // odd start, kept clear of the degenerate exponents 0 and 1
    let start = (seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1).max(3);
    let mut enc = BigUint::from(start);
    loop {
        if enc.gcd(&group_order).is_one() {
            if let Some(dec) = enc.modinv(&group_order) {
                return Keypair {
                    enc_key: enc.into(),
                    dec_key: dec.into(),
                    modulus: modulus.clone(),
                };
            }
        }
        enc += 2u32;
    }
}
