//! Candidate generation and domain modes.
//!
//! - Validation mode (small N): the full contiguous domain [2, ⌊√N⌋].
//! - Challenge mode (127-bit): a sparse corridor sampled around ⌊√N⌋, several
//!   corridors merged, or dense bands with full coverage.
//!
//! Every generator is deterministic with respect to the RNG it is handed.

use std::collections::HashSet;

use log::debug;
use num_bigint::BigUint;
use rand::Rng;
use serde::Serialize;

use crate::error::{CellviewError, Result};

/// Default half-width of a challenge-mode corridor.
pub const DEFAULT_WINDOW: u64 = 10_000_000;

/// Default number of corridor samples.
pub const DEFAULT_SAMPLES: usize = 50_000;

/// Upper bound on materialized candidates (~1.4 GB of cells at this size).
pub const SAFE_COUNT_LIMIT: usize = 50_000_000;

/// Largest modulus whose full [2, ⌊√N⌋] domain may be materialized.
pub const VALIDATION_MAX_N: u64 = 1_000_000_000_000;

/// Contiguous inclusive band `[max(2, center - half_width), center + half_width]`.
///
/// Fails with [`CellviewError::UnsafeMaterialization`] before allocating when
/// the band holds more than [`SAFE_COUNT_LIMIT`] values.
pub fn dense_band(center: u64, half_width: u64) -> Result<Vec<u64>> {
    let (low, high) = band_bounds(center, half_width);
    check_count(segment_len(low, high))?;
    Ok((low..=high).collect())
}

/// Union of several dense bands `(center, half_width)` as one ascending list.
///
/// Bands are sorted by lower bound and merged when they overlap or touch
/// (gap of at most one), so every value appears once. The merged size is
/// checked against [`SAFE_COUNT_LIMIT`] before anything is allocated.
pub fn dense_bands(bands: &[(u64, u64)]) -> Result<Vec<u64>> {
    let merged = merged_segments(bands);
    let total = merged
        .iter()
        .fold(0u64, |acc, &(low, high)| acc.saturating_add(segment_len(low, high)));
    check_count(total)?;
    Ok(merged
        .into_iter()
        .flat_map(|(low, high)| low..=high)
        .collect())
}

fn merged_segments(bands: &[(u64, u64)]) -> Vec<(u64, u64)> {
    let mut segments: Vec<(u64, u64)> = bands
        .iter()
        .map(|&(center, half_width)| band_bounds(center, half_width))
        .filter(|(low, high)| low <= high)
        .collect();
    segments.sort_unstable();

    let mut merged: Vec<(u64, u64)> = Vec::with_capacity(segments.len());
    for (low, high) in segments {
        if let Some(last) = merged.last_mut() {
            if low <= last.1.saturating_add(1) {
                last.1 = last.1.max(high);
                continue;
            }
        }
        merged.push((low, high));
    }
    merged
}

fn segment_len(low: u64, high: u64) -> u64 {
    if low > high {
        0
    } else {
        (high - low).saturating_add(1)
    }
}

fn check_count(count: u64) -> Result<()> {
    if count > SAFE_COUNT_LIMIT as u64 {
        return Err(CellviewError::UnsafeMaterialization {
            count: usize::try_from(count).unwrap_or(usize::MAX),
            limit: SAFE_COUNT_LIMIT,
        });
    }
    Ok(())
}

/// Full [2, ⌊√N⌋] domain for small validation moduli.
pub fn validation_full_domain(n: &BigUint) -> Result<Vec<u64>> {
    if *n > BigUint::from(VALIDATION_MAX_N) {
        return Err(CellviewError::InvalidDomain(format!(
            "validation mode expects N <= {VALIDATION_MAX_N}, got {n}"
        )));
    }
    let upper = factoring_core::to_u64(&factoring_core::isqrt(n)).unwrap_or_default();
    Ok((2..=upper).collect())
}

/// Parameters for one sampled corridor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorridorParams {
    /// Number of distinct integers to draw.
    pub samples: usize,
    /// Half-width of the window around the center.
    pub window: u64,
    /// Window center; ⌊√N⌋ when absent.
    pub center: Option<u64>,
    /// Return the whole window instead of sampling.
    pub full: bool,
}

impl Default for CorridorParams {
    fn default() -> Self {
        CorridorParams {
            samples: DEFAULT_SAMPLES,
            window: DEFAULT_WINDOW,
            center: None,
            full: false,
        }
    }
}

impl CorridorParams {
    pub fn new(samples: usize, window: u64) -> Self {
        CorridorParams {
            samples,
            window,
            ..Self::default()
        }
    }

    pub fn centered(mut self, center: u64) -> Self {
        self.center = Some(center);
        self
    }

    pub fn full(mut self, full: bool) -> Self {
        self.full = full;
        self
    }
}

/// One `(center, window, samples)` entry for [`multiband_corridors`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Band {
    pub center: u64,
    pub window: u64,
    pub samples: usize,
}

/// Sample distinct integers from `[center - window, center + window]`.
///
/// When `full` is set or `samples` covers the whole span, the contiguous
/// corridor is returned in ascending order. Otherwise values are drawn
/// uniformly and duplicates rejected; the order of first draw is kept.
pub fn corridor_around_sqrt<R: Rng + ?Sized>(
    n: &BigUint,
    rng: &mut R,
    params: CorridorParams,
) -> Result<Vec<u64>> {
    if params.window == 0 {
        return Err(CellviewError::InvalidDomain(
            "corridor window must be positive".to_string(),
        ));
    }
    if params.samples == 0 && !params.full {
        return Err(CellviewError::InvalidDomain(
            "corridor samples must be positive".to_string(),
        ));
    }

    let center = match params.center {
        Some(center) => center,
        None => factoring_core::to_u64(&factoring_core::isqrt(n)).ok_or_else(|| {
            CellviewError::InvalidDomain(format!("sqrt({n}) does not fit a 64-bit candidate"))
        })?,
    };
    let (low, high) = band_bounds(center, params.window);
    if low > high {
        return Ok(Vec::new());
    }
    let span = high - low + 1;

    if params.full || params.samples as u64 >= span {
        return Ok((low..=high).collect());
    }

    // Rejection sampling stalls as the request approaches the span; past half
    // the span switch to rand's index sampler, which always terminates.
    if (params.samples as u64).saturating_mul(2) > span {
        let picks = rand::seq::index::sample(rng, span as usize, params.samples);
        return Ok(picks.into_iter().map(|i| low + i as u64).collect());
    }

    let mut seen = HashSet::with_capacity(params.samples);
    let mut candidates = Vec::with_capacity(params.samples);
    while candidates.len() < params.samples {
        let value = rng.gen_range(low..=high);
        if seen.insert(value) {
            candidates.push(value);
        }
    }
    Ok(candidates)
}

/// Concatenate corridor samples from several bands, keeping the first
/// occurrence of each value.
pub fn multiband_corridors<R: Rng + ?Sized>(
    n: &BigUint,
    rng: &mut R,
    bands: &[Band],
) -> Result<Vec<u64>> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for band in bands {
        let params = CorridorParams::new(band.samples, band.window).centered(band.center);
        for value in corridor_around_sqrt(n, rng, params)? {
            if seen.insert(value) {
                out.push(value);
            }
        }
    }
    Ok(out)
}

/// Refuse candidate lists that would blow past [`SAFE_COUNT_LIMIT`].
///
/// Generates nothing; it only checks a count before cells are built.
pub fn guard_dense_domain_for_challenge(candidate_count: usize, n: &BigUint) -> Result<()> {
    debug!(
        "materialization guard: {} candidates for a {}-bit modulus",
        candidate_count,
        n.bits()
    );
    if candidate_count > SAFE_COUNT_LIMIT {
        return Err(CellviewError::UnsafeMaterialization {
            count: candidate_count,
            limit: SAFE_COUNT_LIMIT,
        });
    }
    Ok(())
}

/// Inclusive bounds of a band, with the low end clamped to 2.
fn band_bounds(center: u64, half_width: u64) -> (u64, u64) {
    let low = center.saturating_sub(half_width).max(2);
    let high = center.saturating_add(half_width);
    (low, high)
}
