//! Order-Insensitive Deck Comparison
//!
//! A shuffle hides the permutation between two committed decks, so decks
//! can only ever be compared as multisets: same residues, any order. The
//! removal routine is deliberately conservative — every match of a drawn
//! card is taken out of the pool, so a ciphertext submitted twice makes
//! the removal count come up wrong and the draw is rejected.

use crate::core::residue::Residue;

/// Order-insensitive multiset equality.
///
/// True iff the slices have the same length and every element of `a` can
/// be matched against a distinct element of `b`.
pub fn multiset_eq(a: &[Residue], b: &[Residue]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut rest: Vec<&Residue> = b.iter().collect();
    for item in a {
        match rest.iter().position(|r| *r == item) {
            Some(pos) => {
                rest.swap_remove(pos);
            }
            None => return false,
        }
    }

    rest.is_empty()
}

/// Remove every occurrence of each element of `items` from `pool`.
///
/// Returns true iff the total number of removed elements equals
/// `items.len()`: each drawn card was present exactly once. A card
/// missing from the pool, or drawn twice, fails the count.
pub fn remove_exact(pool: &mut Vec<Residue>, items: &[Residue]) -> bool {
    let before = pool.len();
    for item in items {
        pool.retain(|card| card != item);
    }

    before - pool.len() == items.len()
}
