//! Opaque Large-Integer Card Values
//!
//! A card travels the wire as a large decimal integer: the plaintext form
//! is a residue that identifies a face through the registry, and every
//! encrypted form is another residue of the same modulus. The auditor
//! never interprets these numbers itself — it only compares them and
//! hands them to the cipher.

use std::fmt;
use std::str::FromStr;

use num_bigint::{BigUint, ParseBigIntError};
use serde::{Deserialize, Serialize};

/// An opaque large-integer value: a plaintext card mapping or any of its
/// encrypted forms.
///
/// Ordered and hashable so it can key the registry and be removed from
/// deck pools; rendered as its decimal string at the boundary.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Residue(BigUint);

impl Residue {
    /// Parse a decimal string.
    pub fn from_dec(s: &str) -> Result<Self, ParseBigIntError> {
        s.parse()
    }

    /// Build from a machine integer (small fixtures and tests).
    pub fn from_u64(value: u64) -> Self {
        Self(BigUint::from(value))
    }

    /// Decimal rendering, the wire format.
    pub fn to_dec(&self) -> String {
        self.0.to_str_radix(10)
    }

    /// The underlying magnitude, for handing to arithmetic primitives.
    pub(crate) fn magnitude(&self) -> &BigUint {
        &self.0
    }
}

impl From<BigUint> for Residue {
    fn from(value: BigUint) -> Self {
        Self(value)
    }
}

impl FromStr for Residue {
    type Err = ParseBigIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl fmt::Display for Residue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Residue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Residue({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_round_trip() {
        let r = Residue::from_dec("618970019642690137449562111").unwrap();
        assert_eq!(r.to_dec(), "618970019642690137449562111");
        assert_eq!(r, r.to_dec().parse().unwrap());
    }

    #[test]
    fn test_rejects_non_decimal() {
        assert!(Residue::from_dec("0x2a").is_err());
        assert!(Residue::from_dec("").is_err());
        assert!(Residue::from_dec("-5").is_err());
    }

    #[test]
    fn test_ordering_is_numeric() {
        let small = Residue::from_u64(99);
        let big = Residue::from_dec("100").unwrap();
        assert!(small < big);
    }
}
