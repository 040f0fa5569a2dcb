//! Energy / resonance heuristics.
//!
//! Purely geometric scores computable from (N, n) without access to factors.
//! Lower is better. Each family is a variant of [`EnergyFn`] carrying its own
//! typed parameters; names resolve through a fixed table, so an unknown name
//! is caught once at resolution rather than on every evaluation.
//!
//! Trigonometry runs in `f64`. Every result is stored as an exact rational
//! ([`Energy`]), and composites combine their parts exactly.

use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{Signed, ToPrimitive, Zero};
use serde::{Deserialize, Serialize};

use factoring_core::{biguint_string, isqrt, mod_u64, ratio_to_f64, Challenge};

use crate::error::{CellviewError, Result};

// ---------------------------------------------------------------------------
// Energy values
// ---------------------------------------------------------------------------

/// An exact, arbitrary-precision energy score.
///
/// Ordering is exact, so ties in the ranked output are real ties.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Energy(BigRational);

impl Energy {
    /// Significant digits kept when a decimal expansion does not terminate.
    pub const DISPLAY_DIGITS: usize = 80;

    /// Longest fractional expansion rendered before rounding kicks in,
    /// whatever the significant-digit count (covers subnormal `f64` values).
    const MAX_FRACTION_DIGITS: usize = 1_200;

    /// Largest power of ten a parsed literal may scale by.
    const MAX_PARSE_SCALE: u32 = 10_000;

    pub fn zero() -> Self {
        Energy(BigRational::zero())
    }

    /// Exact conversion of a finite `f64`. Non-finite inputs map to zero.
    pub fn from_f64(value: f64) -> Self {
        Energy(BigRational::from_float(value).unwrap_or_else(BigRational::zero))
    }

    pub fn from_ratio(ratio: BigRational) -> Self {
        Energy(ratio)
    }

    /// Nearest `f64`, for reports and plotting only.
    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or(f64::NAN)
    }

    /// Canonical decimal text: exact when the expansion terminates within
    /// [`Energy::DISPLAY_DIGITS`] significant digits, otherwise rounded
    /// half-up to that many. No exponent notation, no trailing zeros.
    pub fn to_decimal_string(&self) -> String {
        let negative = self.0.is_negative();
        let den = self.0.denom().magnitude();
        let (mut int_part, mut rem) = self.0.numer().magnitude().div_rem(den);

        let mut significant = if int_part.is_zero() {
            0
        } else {
            int_part.to_str_radix(10).len()
        };
        let mut frac: Vec<u8> = Vec::new();
        while !rem.is_zero()
            && significant < Self::DISPLAY_DIGITS
            && frac.len() < Self::MAX_FRACTION_DIGITS
        {
            rem *= 10u32;
            let (digit, next) = rem.div_rem(den);
            let digit = digit.to_u8().unwrap_or(0);
            if significant > 0 || digit != 0 {
                significant += 1;
            }
            frac.push(digit);
            rem = next;
        }

        if !rem.is_zero() && (&rem * 10u32) / den >= BigUint::from(5u32) {
            let mut carry = true;
            for d in frac.iter_mut().rev() {
                if *d == 9 {
                    *d = 0;
                } else {
                    *d += 1;
                    carry = false;
                    break;
                }
            }
            if carry {
                int_part += 1u32;
            }
        }
        while frac.last() == Some(&0) {
            frac.pop();
        }

        let mut out = String::new();
        if negative && !(int_part.is_zero() && frac.is_empty()) {
            out.push('-');
        }
        out.push_str(&int_part.to_str_radix(10));
        if !frac.is_empty() {
            out.push('.');
            out.extend(frac.iter().map(|d| char::from(b'0' + d)));
        }
        out
    }
}

impl fmt::Display for Energy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_decimal_string())
    }
}

impl FromStr for Energy {
    type Err = CellviewError;

    /// Parse plain or exponent decimal notation (`"999.99"`, `"-1.5e-3"`).
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || CellviewError::InvalidDomain(format!("invalid energy literal '{s}'"));
        let text = s.trim();
        let (mantissa, exponent) = match text.find(['e', 'E']) {
            Some(pos) => {
                let exp: i32 = text[pos + 1..].parse().map_err(|_| invalid())?;
                (&text[..pos], exp)
            }
            None => (text, 0),
        };
        let (negative, digits) = match mantissa.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, mantissa.strip_prefix('+').unwrap_or(mantissa)),
        };
        let (whole, frac) = digits.split_once('.').unwrap_or((digits, ""));
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid());
        }
        if !whole.chars().chain(frac.chars()).all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let joined = format!("{whole}{frac}");
        let mut numer: BigInt = if joined.is_empty() {
            BigInt::zero()
        } else {
            joined.parse().map_err(|_| invalid())?
        };
        if negative {
            numer = -numer;
        }
        let scale = i32::try_from(frac.len())
            .ok()
            .and_then(|digits| exponent.checked_sub(digits))
            .filter(|scale| scale.unsigned_abs() <= Self::MAX_PARSE_SCALE)
            .ok_or_else(invalid)?;
        let ten = BigInt::from(10u32);
        let ratio = if scale >= 0 {
            BigRational::from_integer(numer * num_traits::pow(ten, scale as usize))
        } else {
            BigRational::new(numer, num_traits::pow(ten, scale.unsigned_abs() as usize))
        };
        Ok(Energy(ratio))
    }
}

// ---------------------------------------------------------------------------
// Families and parameters
// ---------------------------------------------------------------------------

/// Dirichlet kernel parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirichletParams {
    /// Kernel order j.
    pub j: u32,
    /// Divide by (2j + 1) so a zero residue scores exactly 1 before inversion.
    pub normalize: bool,
    /// Report `1 - |D_j|`, putting residues near zero at the bottom.
    pub invert: bool,
}

impl Default for DirichletParams {
    fn default() -> Self {
        DirichletParams {
            j: 5,
            normalize: true,
            invert: true,
        }
    }
}

/// Arctan geodesic parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArctanParams {
    /// Precomputed ⌊√N⌋; computed from N when absent or zero.
    #[serde(with = "biguint_string::option")]
    pub sqrt_n: Option<BigUint>,
    pub scale: f64,
}

impl Default for ArctanParams {
    fn default() -> Self {
        ArctanParams {
            sqrt_n: None,
            scale: 1.0,
        }
    }
}

/// Z-metric parameters: `alpha * distance + beta * residue`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZMetricParams {
    #[serde(with = "biguint_string::option")]
    pub sqrt_n: Option<BigUint>,
    pub alpha: f64,
    pub beta: f64,
}

impl Default for ZMetricParams {
    fn default() -> Self {
        ZMetricParams {
            sqrt_n: None,
            alpha: 1.0,
            beta: 1.0,
        }
    }
}

/// One weighted term of a composite energy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositePart {
    pub weight: f64,
    pub energy: EnergyFn,
}

impl CompositePart {
    pub fn new(weight: f64, energy: EnergyFn) -> Self {
        CompositePart { weight, energy }
    }
}

/// A scoring function with its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "lowercase")]
pub enum EnergyFn {
    /// `1 + 2·Σ cos(k·x)`, `x = 2π·(N mod n)/n`.
    Dirichlet(DirichletParams),
    /// `|atan(scale · |n − √N| / √N)|`.
    Arctan(ArctanParams),
    /// `alpha·|n − √N|/√N + beta·(N mod n)/n`.
    #[serde(rename = "zmetric")]
    ZMetric(ZMetricParams),
    /// `(N mod n)/n`.
    Residue,
    /// Weighted average of sub-energies; zero when the weights sum to zero.
    Composite { parts: Vec<CompositePart> },
}

/// The registered families, keyed by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnergyFamily {
    Dirichlet,
    Arctan,
    ZMetric,
    Residue,
    Composite,
}

/// Name → family lookup table.
pub const REGISTRY: &[(&str, EnergyFamily)] = &[
    ("dirichlet", EnergyFamily::Dirichlet),
    ("arctan", EnergyFamily::Arctan),
    ("zmetric", EnergyFamily::ZMetric),
    ("residue", EnergyFamily::Residue),
    ("composite", EnergyFamily::Composite),
];

impl EnergyFamily {
    pub fn name(self) -> &'static str {
        match self {
            EnergyFamily::Dirichlet => "dirichlet",
            EnergyFamily::Arctan => "arctan",
            EnergyFamily::ZMetric => "zmetric",
            EnergyFamily::Residue => "residue",
            EnergyFamily::Composite => "composite",
        }
    }

    /// The family with the parameters it uses when none are supplied.
    pub fn with_defaults(self) -> EnergyFn {
        match self {
            EnergyFamily::Dirichlet => EnergyFn::Dirichlet(DirichletParams::default()),
            EnergyFamily::Arctan => EnergyFn::Arctan(ArctanParams::default()),
            EnergyFamily::ZMetric => EnergyFn::ZMetric(ZMetricParams::default()),
            EnergyFamily::Residue => EnergyFn::Residue,
            EnergyFamily::Composite => EnergyFn::Composite { parts: Vec::new() },
        }
    }
}

impl fmt::Display for EnergyFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Look up a family by registry name.
pub fn resolve_energy(name: &str) -> Result<EnergyFamily> {
    REGISTRY
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, family)| *family)
        .ok_or_else(|| CellviewError::UnknownEnergy(name.to_string()))
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Per-modulus values shared by every evaluation: N and ⌊√N⌋.
#[derive(Debug, Clone)]
pub struct EnergyContext {
    modulus: BigUint,
    sqrt_n: BigUint,
}

impl EnergyContext {
    pub fn new(modulus: BigUint) -> Self {
        let sqrt_n = isqrt(&modulus);
        EnergyContext { modulus, sqrt_n }
    }

    /// `(N mod n) / n` as an `f64`.
    fn residue_fraction(&self, n: u64) -> f64 {
        let residue = mod_u64(&self.modulus, n);
        fraction(residue, n)
    }

    /// `|n − √N| / √N` using the override when given and non-zero.
    fn sqrt_distance(&self, n: u64, sqrt_override: Option<&BigUint>) -> f64 {
        let sqrt_n = match sqrt_override {
            Some(s) if !s.is_zero() => s,
            _ => &self.sqrt_n,
        };
        let diff = (BigInt::from(n) - BigInt::from(sqrt_n.clone())).abs();
        ratio_to_f64(&diff, &BigInt::from(sqrt_n.clone()))
    }
}

/// `num / den` rounded once; direct division when both are exact in `f64`.
fn fraction(num: u64, den: u64) -> f64 {
    const EXACT: u64 = 1 << f64::MANTISSA_DIGITS;
    if num <= EXACT && den <= EXACT {
        num as f64 / den as f64
    } else {
        ratio_to_f64(&BigInt::from(num), &BigInt::from(den))
    }
}

impl EnergyFn {
    pub fn family(&self) -> EnergyFamily {
        match self {
            EnergyFn::Dirichlet(_) => EnergyFamily::Dirichlet,
            EnergyFn::Arctan(_) => EnergyFamily::Arctan,
            EnergyFn::ZMetric(_) => EnergyFamily::ZMetric,
            EnergyFn::Residue => EnergyFamily::Residue,
            EnergyFn::Composite { .. } => EnergyFamily::Composite,
        }
    }

    /// Reject parameters no evaluation could use: a zero kernel order or
    /// non-finite weights and scales, checked through nested composites.
    pub fn validate(&self) -> Result<()> {
        match self {
            EnergyFn::Dirichlet(p) if p.j == 0 => Err(CellviewError::InvalidDomain(
                "dirichlet kernel order j must be positive".to_string(),
            )),
            EnergyFn::Arctan(p) if !p.scale.is_finite() => Err(CellviewError::InvalidDomain(
                "arctan scale must be finite".to_string(),
            )),
            EnergyFn::ZMetric(p) if !(p.alpha.is_finite() && p.beta.is_finite()) => Err(
                CellviewError::InvalidDomain("zmetric weights must be finite".to_string()),
            ),
            EnergyFn::Composite { parts } => {
                for part in parts {
                    if !part.weight.is_finite() {
                        return Err(CellviewError::InvalidDomain(
                            "composite weights must be finite".to_string(),
                        ));
                    }
                    part.energy.validate()?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Score candidate `n` against the context's modulus. `n` must be non-zero.
    pub fn evaluate(&self, n: u64, ctx: &EnergyContext) -> Energy {
        if n == 0 {
            return Energy::zero();
        }
        match self {
            EnergyFn::Dirichlet(p) => Energy::from_f64(dirichlet_value(p, ctx.residue_fraction(n))),
            EnergyFn::Arctan(p) => {
                let diff = ctx.sqrt_distance(n, p.sqrt_n.as_ref());
                Energy::from_f64((p.scale * diff).atan().abs())
            }
            EnergyFn::ZMetric(p) => {
                let dist = ctx.sqrt_distance(n, p.sqrt_n.as_ref());
                let residue = ctx.residue_fraction(n);
                Energy::from_f64(p.alpha * dist + p.beta * residue)
            }
            EnergyFn::Residue => Energy::from_f64(ctx.residue_fraction(n)),
            EnergyFn::Composite { parts } => composite_value(parts, n, ctx),
        }
    }
}

fn dirichlet_value(p: &DirichletParams, residue_fraction: f64) -> f64 {
    let x = 2.0 * PI * residue_fraction;
    let mut s = 1.0;
    for k in 1..=p.j {
        s += 2.0 * (f64::from(k) * x).cos();
    }
    if p.normalize {
        s /= f64::from(2 * p.j + 1);
    }
    let value = s.abs();
    if p.invert {
        1.0 - value
    } else {
        value
    }
}

fn composite_value(parts: &[CompositePart], n: u64, ctx: &EnergyContext) -> Energy {
    let mut total = BigRational::zero();
    let mut weight_sum = 0.0f64;
    for part in parts {
        let weight = Energy::from_f64(part.weight).0;
        total += weight * part.energy.evaluate(n, ctx).0;
        weight_sum += part.weight;
    }
    if weight_sum == 0.0 {
        return Energy::zero();
    }
    let divisor = Energy::from_f64(weight_sum).0;
    Energy(total / divisor)
}

// ---------------------------------------------------------------------------
// Named specs
// ---------------------------------------------------------------------------

/// A named, parameterized scoring function. Cells refer to specs by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergySpec {
    pub name: String,
    pub energy: EnergyFn,
}

impl EnergySpec {
    pub fn new(name: impl Into<String>, energy: EnergyFn) -> Self {
        EnergySpec {
            name: name.into(),
            energy,
        }
    }

    /// Fallback spec for a bare family name with default parameters.
    pub fn from_registry(name: &str) -> Result<Self> {
        Ok(EnergySpec::new(name, resolve_energy(name)?.with_defaults()))
    }
}

/// Specs keyed by name, iterated in name order.
pub type SpecSet = BTreeMap<String, EnergySpec>;

/// The ready-to-use preset catalogue, parameterized by the challenge's ⌊√N⌋.
pub fn default_specs(challenge: &Challenge) -> SpecSet {
    let sqrt_n = Some(challenge.sqrt_n.clone());
    let dirichlet11 = DirichletParams {
        j: 11,
        ..DirichletParams::default()
    };

    let specs = vec![
        EnergySpec::new("dirichlet5", EnergyFn::Dirichlet(DirichletParams::default())),
        EnergySpec::new("dirichlet11", EnergyFn::Dirichlet(dirichlet11)),
        EnergySpec::new(
            "arctan",
            EnergyFn::Arctan(ArctanParams {
                sqrt_n: sqrt_n.clone(),
                scale: 2.0,
            }),
        ),
        EnergySpec::new(
            "zmetric",
            EnergyFn::ZMetric(ZMetricParams {
                sqrt_n: sqrt_n.clone(),
                alpha: 0.2,
                beta: 1.0,
            }),
        ),
        EnergySpec::new(
            "combo_dir11_arctan",
            EnergyFn::Composite {
                parts: vec![
                    CompositePart::new(0.6, EnergyFn::Dirichlet(dirichlet11)),
                    CompositePart::new(
                        0.4,
                        EnergyFn::Arctan(ArctanParams {
                            sqrt_n,
                            scale: 2.5,
                        }),
                    ),
                ],
            },
        ),
        EnergySpec::new(
            "combo_dir11_res",
            EnergyFn::Composite {
                parts: vec![
                    CompositePart::new(0.6, EnergyFn::Dirichlet(dirichlet11)),
                    CompositePart::new(0.4, EnergyFn::Residue),
                ],
            },
        ),
    ];

    specs.into_iter().map(|s| (s.name.clone(), s)).collect()
}
