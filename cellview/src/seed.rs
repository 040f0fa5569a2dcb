//! Deterministic RNG construction from hex seeds.
//!
//! Seeds default to SHA-256(N) from the challenge record unless the caller
//! supplies an override. The same hex string always yields the same stream.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};

use crate::error::{CellviewError, Result};

/// The generator used for sampling and random sweep order.
pub type CellRng = ChaCha8Rng;

/// Build a generator from a hex seed string.
///
/// Accepts an optional `0x` prefix and either letter case. The 32-byte key is
/// the SHA-256 digest of the normalized (lowercase, unprefixed) hex text, so
/// short seeds such as `"123"` are as valid as full 256-bit digests.
pub fn rng_from_hex(seed_hex: &str) -> Result<CellRng> {
    let normalized = normalize_hex(seed_hex)?;
    let key: [u8; 32] = Sha256::digest(normalized.as_bytes()).into();
    Ok(ChaCha8Rng::from_seed(key))
}

fn normalize_hex(seed_hex: &str) -> Result<String> {
    let trimmed = seed_hex.trim();
    let body = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    if body.is_empty() || !body.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(CellviewError::InvalidSeed(seed_hex.to_string()));
    }
    Ok(body.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_same_hex_same_stream() {
        let mut a = rng_from_hex("abcdef123456").unwrap();
        let mut b = rng_from_hex("ABCDEF123456").unwrap();
        let xs: Vec<u64> = (0..8).map(|_| a.gen()).collect();
        let ys: Vec<u64> = (0..8).map(|_| b.gen()).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn test_prefix_is_ignored() {
        let mut a = rng_from_hex("0x123").unwrap();
        let mut b = rng_from_hex("123").unwrap();
        assert_eq!(a.gen::<u64>(), b.gen::<u64>());
    }

    #[test]
    fn test_different_hex_different_stream() {
        let mut a = rng_from_hex("123").unwrap();
        let mut b = rng_from_hex("124").unwrap();
        assert_ne!(a.gen::<u64>(), b.gen::<u64>());
    }

    #[test]
    fn test_rejects_non_hex() {
        assert!(matches!(rng_from_hex("xyz"), Err(CellviewError::InvalidSeed(_))));
        assert!(matches!(rng_from_hex("  "), Err(CellviewError::InvalidSeed(_))));
    }
}
