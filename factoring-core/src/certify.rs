//! Arithmetic certification of ranked candidates: `N mod d` and `gcd(N, d)` only.

use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};
use serde::Serialize;

use crate::gcd;

/// Divisibility check for one ranked candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Certification {
    /// 1-based position in the ranked list.
    pub rank: usize,
    pub n: u64,
    /// The candidate's energy, carried through as text.
    pub energy: String,
    #[serde(rename = "mod")]
    pub modulo: u64,
    pub gcd: u64,
    pub is_factor: bool,
}

/// Evaluate the first `m` ranked `(candidate, energy)` pairs for divisibility of `n`.
///
/// Zero candidates are skipped rather than dividing by zero; they keep their rank
/// slot so ranks still line up with the input order.
pub fn certify_top_m<'a, I>(ranked: I, n: &BigUint, m: usize) -> Vec<Certification>
where
    I: IntoIterator<Item = (u64, &'a str)>,
{
    ranked
        .into_iter()
        .take(m)
        .enumerate()
        .filter(|(_, (d, _))| *d != 0)
        .map(|(idx, (d, energy))| {
            let divisor = BigUint::from(d);
            let modulo = n % &divisor;
            let g = gcd(n, &divisor);
            Certification {
                rank: idx + 1,
                n: d,
                energy: energy.to_string(),
                modulo: modulo.to_u64().unwrap_or_default(),
                gcd: g.to_u64().unwrap_or_default(),
                is_factor: modulo.is_zero(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_certify_flags_factors() {
        let n = BigUint::from(8051u32);
        let ranked = vec![(83u64, "0.1"), (84, "0.2"), (97, "0.3")];
        let certs = certify_top_m(ranked, &n, 10);
        assert_eq!(certs.len(), 3);
        assert_eq!(certs[0].rank, 1);
        assert!(certs[0].is_factor);
        assert_eq!(certs[0].gcd, 83);
        assert_eq!(certs[0].modulo, 0);
        assert!(!certs[1].is_factor);
        assert_eq!(certs[1].modulo, 8051 % 84);
        assert_eq!(certs[1].gcd, 1);
        assert!(certs[2].is_factor);
        assert_eq!(certs[2].energy, "0.3");
    }

    #[test]
    fn test_certify_truncates_to_m() {
        let n = BigUint::from(221u32);
        let ranked: Vec<(u64, &str)> = (2u64..20).map(|d| (d, "0")).collect();
        let certs = certify_top_m(ranked, &n, 5);
        assert_eq!(certs.len(), 5);
        assert_eq!(certs.last().map(|c| c.rank), Some(5));
    }
}
