//! Batch experiments: toy semiprimes with known factors, a corridor grid on
//! the challenge, and a small-to-mid scaling ladder.
//!
//! Every case builds its own engine and RNG, so cases run in parallel with
//! Rayon and reports come back in input order. Energy presets always come
//! from the canonical challenge, so √N-based families measure distance from
//! the challenge's √N even on small moduli.

use num_bigint::BigUint;
use rayon::prelude::*;
use serde::Serialize;

use factoring_core::{derive_seed_hex, Challenge};

use crate::candidates::{self, CorridorParams};
use crate::engine::{CellViewEngine, EngineConfig, RunResult, SweepOrder};
use crate::energy::{default_specs, SpecSet};
use crate::error::Result;
use crate::seed::{rng_from_hex, CellRng};

/// 1-based rank of `target` in `result`, `None` when it was never a candidate.
pub fn factor_rank(result: &RunResult, target: u64) -> Option<usize> {
    result.rank_of(target)
}

fn run_engine(
    n: &BigUint,
    candidates: &[u64],
    algotype: &str,
    specs: &SpecSet,
    rng: CellRng,
    config: EngineConfig,
) -> Result<RunResult> {
    let mut engine = CellViewEngine::new(
        n.clone(),
        candidates,
        &[algotype.to_string()],
        specs.clone(),
        rng,
        config,
    )?;
    Ok(engine.run())
}

// ---------------------------------------------------------------------------
// Toy evaluation
// ---------------------------------------------------------------------------

/// Small balanced semiprimes and their factors.
pub const TOY_CASES: &[(u64, (u64, u64))] = &[
    (221, (13, 17)),
    (899, (29, 31)),
    (1763, (41, 43)),
    (8051, (83, 97)),
    (10403, (101, 103)),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToyReport {
    pub n: u64,
    pub factors: (u64, u64),
    pub candidate_count: usize,
    pub factor_ranks: (Option<usize>, Option<usize>),
    pub dg_index: f64,
    pub sortedness_final: Option<f64>,
    pub aggregation_final: Option<f64>,
}

/// Full validation domain per case, seeded from N, ascending sweeps.
pub fn toy_eval(cases: &[(u64, (u64, u64))], algotype: &str) -> Result<Vec<ToyReport>> {
    let specs = default_specs(&Challenge::canonical());
    cases
        .par_iter()
        .map(|&(n, factors)| {
            let modulus = BigUint::from(n);
            let rng = rng_from_hex(&derive_seed_hex(&modulus))?;
            let domain = candidates::validation_full_domain(&modulus)?;
            let result = run_engine(
                &modulus,
                &domain,
                algotype,
                &specs,
                rng,
                EngineConfig::default(),
            )?;
            Ok(ToyReport {
                n,
                factors,
                candidate_count: domain.len(),
                factor_ranks: (
                    factor_rank(&result, factors.0),
                    factor_rank(&result, factors.1),
                ),
                dg_index: result.dg_index,
                sortedness_final: result.final_sortedness(),
                aggregation_final: result.final_aggregation(),
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Challenge grid
// ---------------------------------------------------------------------------

pub const GRID_WINDOWS: &[u64] = &[500_000, 1_000_000, 5_000_000];
pub const GRID_ALGOTYPES: &[&str] = &["dirichlet11", "combo_dir11_arctan", "combo_dir11_res"];

#[derive(Debug, Clone, PartialEq)]
pub struct GridParams {
    pub windows: Vec<u64>,
    pub algotypes: Vec<String>,
    pub samples: usize,
    pub max_steps: usize,
}

impl Default for GridParams {
    fn default() -> Self {
        GridParams {
            windows: GRID_WINDOWS.to_vec(),
            algotypes: GRID_ALGOTYPES.iter().map(|a| a.to_string()).collect(),
            samples: 20_000,
            max_steps: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridReport {
    pub window: u64,
    pub algotype: String,
    pub candidates: usize,
    pub dg_index: f64,
    pub sortedness_final: Option<f64>,
    pub aggregation_final: Option<f64>,
    pub top_n: Option<u64>,
    pub top_energy: Option<String>,
}

/// Window × algotype probe around √N of `challenge`, each run reseeded from
/// the challenge seed.
pub fn challenge_grid(challenge: &Challenge, params: &GridParams) -> Result<Vec<GridReport>> {
    let work: Vec<(u64, &str)> = params
        .windows
        .iter()
        .flat_map(|&w| params.algotypes.iter().map(move |a| (w, a.as_str())))
        .collect();

    let specs = default_specs(challenge);
    work.into_par_iter()
        .map(|(window, algotype)| {
            let mut rng = rng_from_hex(&challenge.seed_hex)?;
            let cands = candidates::corridor_around_sqrt(
                &challenge.n,
                &mut rng,
                CorridorParams::new(params.samples, window),
            )?;
            let config = EngineConfig {
                max_steps: params.max_steps,
                ..EngineConfig::default()
            };
            let result = run_engine(&challenge.n, &cands, algotype, &specs, rng, config)?;
            let top = result.top();
            Ok(GridReport {
                window,
                algotype: algotype.to_string(),
                candidates: cands.len(),
                dg_index: result.dg_index,
                sortedness_final: result.final_sortedness(),
                aggregation_final: result.final_aggregation(),
                top_n: top.map(|c| c.n),
                top_energy: top.map(|c| c.energy.clone()),
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Scaling ladder
// ---------------------------------------------------------------------------

/// How a ladder case picks its candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LadderMode {
    /// The whole validation domain.
    Full,
    /// Sampled corridor around √N.
    Corridor,
    /// The whole corridor around √N.
    CorridorFull,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LadderCase {
    pub p: u64,
    pub q: u64,
    pub mode: LadderMode,
    pub window: Option<u64>,
    pub samples: Option<usize>,
}

impl LadderCase {
    pub const fn full(p: u64, q: u64) -> Self {
        LadderCase {
            p,
            q,
            mode: LadderMode::Full,
            window: None,
            samples: None,
        }
    }

    pub const fn corridor(p: u64, q: u64, window: u64, samples: usize, full: bool) -> Self {
        LadderCase {
            p,
            q,
            mode: if full {
                LadderMode::CorridorFull
            } else {
                LadderMode::Corridor
            },
            window: Some(window),
            samples: Some(samples),
        }
    }

    pub fn modulus(&self) -> BigUint {
        BigUint::from(self.p) * BigUint::from(self.q)
    }
}

/// 16-bit through ~48-bit cases. The 46-bit pair appears twice: once sampled
/// sparsely enough to miss the factors, once with full coverage.
pub const LADDER_CASES: &[LadderCase] = &[
    LadderCase::full(239, 251),
    LadderCase::full(4093, 4099),
    LadderCase::full(65437, 65521),
    LadderCase::full(104729, 104759),
    LadderCase::corridor(10_000_019, 10_000_079, 5_000, 20_000, true),
    LadderCase::corridor(8_388_617, 8_388_593, 50_000, 20_000, false),
    LadderCase::corridor(8_388_617, 8_388_593, 50_000, 200_000, true),
];

const LADDER_DEFAULT_WINDOW: u64 = 50_000;
const LADDER_DEFAULT_SAMPLES: usize = 50_000;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LadderReport {
    /// Decimal modulus.
    pub n: String,
    pub bits: u64,
    pub mode: LadderMode,
    pub window: Option<u64>,
    pub samples: usize,
    pub algotype: String,
    pub p_rank: Option<usize>,
    pub q_rank: Option<usize>,
    pub dg_index: f64,
    pub sortedness_final: Option<f64>,
    pub aggregation_final: Option<f64>,
    pub top_n: Option<u64>,
    pub top_energy: Option<String>,
}

/// Every case × algotype with random sweeps (40 steps), seeded from N.
pub fn scaling_ladder(cases: &[LadderCase], algotypes: &[String]) -> Result<Vec<LadderReport>> {
    let work: Vec<(LadderCase, &str)> = cases
        .iter()
        .flat_map(|&case| algotypes.iter().map(move |a| (case, a.as_str())))
        .collect();

    let specs = default_specs(&Challenge::canonical());
    work.into_par_iter()
        .map(|(case, algotype)| {
            let n = case.modulus();
            let record = Challenge::from_modulus(n.clone());
            let mut rng = rng_from_hex(&record.seed_hex)?;
            let cands = match case.mode {
                LadderMode::Full => candidates::validation_full_domain(&n)?,
                LadderMode::Corridor | LadderMode::CorridorFull => {
                    let params = CorridorParams::new(
                        case.samples.unwrap_or(LADDER_DEFAULT_SAMPLES),
                        case.window.unwrap_or(LADDER_DEFAULT_WINDOW),
                    )
                    .full(case.mode == LadderMode::CorridorFull);
                    candidates::corridor_around_sqrt(&n, &mut rng, params)?
                }
            };
            let config = EngineConfig {
                sweep_order: SweepOrder::Random,
                max_steps: 40,
                ..EngineConfig::default()
            };
            let result = run_engine(&n, &cands, algotype, &specs, rng, config)?;
            let top = result.top();
            Ok(LadderReport {
                n: n.to_string(),
                bits: record.bit_length,
                mode: case.mode,
                window: case.window,
                samples: cands.len(),
                algotype: algotype.to_string(),
                p_rank: factor_rank(&result, case.p),
                q_rank: factor_rank(&result, case.q),
                dg_index: result.dg_index,
                sortedness_final: result.final_sortedness(),
                aggregation_final: result.final_aggregation(),
                top_n: top.map(|c| c.n),
                top_energy: top.map(|c| c.energy.clone()),
            })
        })
        .collect()
}
