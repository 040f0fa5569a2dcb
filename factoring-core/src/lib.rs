//! Shared arithmetic, challenge fixtures, and certification for factorization experiments.
//!
//! Everything here is small and exact: integer square roots and gcds over
//! `BigUint`, correctly rounded ratio-to-float conversion, and the canonical
//! 127-bit challenge record. Experiment crates take these values explicitly;
//! nothing in this crate holds global state.

pub mod certify;

use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{ToPrimitive, Zero};
use sha2::{Digest, Sha256};

pub use certify::{certify_top_m, Certification};

/// The canonical 127-bit semiprime under study. No factor information is
/// recorded anywhere in the workspace.
pub const CHALLENGE_127: &str = "137524771864208156028430259349934309717";

/// A modulus together with the values every experiment derives from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub n: BigUint,
    pub bit_length: u64,
    /// ⌊√N⌋
    pub sqrt_n: BigUint,
    /// Hex SHA-256 of N's decimal representation; the default RNG seed.
    pub seed_hex: String,
}

impl Challenge {
    /// The canonical challenge modulus (`CHALLENGE_127`).
    pub fn canonical() -> Self {
        let n: BigUint = CHALLENGE_127
            .parse()
            .unwrap_or_else(|_| unreachable!("CHALLENGE_127 is a decimal literal"));
        Self::from_modulus(n)
    }

    /// Derive the challenge record for an arbitrary modulus.
    pub fn from_modulus(n: BigUint) -> Self {
        let bit_length = n.bits();
        let sqrt_n = isqrt(&n);
        let seed_hex = derive_seed_hex(&n);
        Challenge {
            n,
            bit_length,
            sqrt_n,
            seed_hex,
        }
    }

    /// Whether `n` is this challenge's modulus.
    pub fn is_modulus(&self, n: &BigUint) -> bool {
        &self.n == n
    }
}

/// Deterministically derive a 256-bit seed (as lowercase hex) from N.
pub fn derive_seed_hex(n: &BigUint) -> String {
    let digest = Sha256::digest(n.to_str_radix(10).as_bytes());
    format!("{:x}", digest)
}

/// Integer square root: the largest r with r*r <= n.
pub fn isqrt(n: &BigUint) -> BigUint {
    n.sqrt()
}

/// Greatest common divisor.
pub fn gcd(a: &BigUint, b: &BigUint) -> BigUint {
    a.gcd(b)
}

/// `num / den` rounded once to the nearest `f64`.
///
/// Plain `as f64` casts round both operands before dividing, which loses the
/// low bits of 64-bit residues; this goes through an exact rational instead.
/// Returns 0.0 when `den` is zero.
pub fn ratio_to_f64(num: &BigInt, den: &BigInt) -> f64 {
    if den.is_zero() {
        return 0.0;
    }
    BigRational::new(num.clone(), den.clone())
        .to_f64()
        .unwrap_or(0.0)
}

/// `N mod d` for a machine-word divisor. `d` must be non-zero.
pub fn mod_u64(n: &BigUint, d: u64) -> u64 {
    (n % d).to_u64().unwrap_or_default()
}

/// Convert a BigUint to u64 if it fits.
pub fn to_u64(n: &BigUint) -> Option<u64> {
    n.to_u64()
}

/// Serialize `BigUint` values as decimal strings.
///
/// JSON numbers cannot carry 128-bit integers portably, so fixtures and run
/// logs store moduli as text.
pub mod biguint_string {
    use num_bigint::BigUint;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_str_radix(10))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigUint, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.trim().parse().map_err(de::Error::custom)
    }

    /// The same encoding for `Option<BigUint>`; `None` is `null`.
    pub mod option {
        use num_bigint::BigUint;
        use serde::{de, Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<BigUint>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(v) => serializer.serialize_some(&v.to_str_radix(10)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<BigUint>, D::Error> {
            let text: Option<String> = Option::deserialize(deserializer)?;
            text.map(|t| t.trim().parse().map_err(de::Error::custom))
                .transpose()
        }
    }
}
