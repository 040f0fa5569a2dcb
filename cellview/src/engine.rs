//! Cell-view sorting engine.
//!
//! Cells wrap candidates with a scoring-family tag (algotype) and a frozen
//! flag. Each step sweeps adjacent pairs once and swaps a pair when the left
//! cell has the higher energy and the right cell is not frozen. Energies are
//! position-independent, so each distinct (algotype, n) is scored once and
//! kept in an engine-owned arena; cells hold only a slot index.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use log::{debug, info, warn};
use num_bigint::BigUint;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use factoring_core::Challenge;

use crate::energy::{default_specs, Energy, EnergyContext, EnergyFn, EnergySpec, SpecSet};
use crate::error::{CellviewError, Result};
use crate::metrics::{self, DgEpisode, DEFAULT_DG_EPSILON};

/// Algotype assigned when the caller supplies none.
pub const DEFAULT_ALGOTYPE: &str = "dirichlet5";

/// Order in which adjacent pairs are visited during a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SweepOrder {
    Ascending,
    /// A fresh shuffle of the pair indices every step.
    Random,
}

impl FromStr for SweepOrder {
    type Err = CellviewError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ascending" => Ok(SweepOrder::Ascending),
            "random" => Ok(SweepOrder::Random),
            other => Err(CellviewError::InvalidDomain(format!(
                "unknown sweep order '{other}' (expected ascending|random)"
            ))),
        }
    }
}

impl fmt::Display for SweepOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SweepOrder::Ascending => write!(f, "ascending"),
            SweepOrder::Random => write!(f, "random"),
        }
    }
}

/// Engine knobs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EngineConfig {
    pub sweep_order: SweepOrder,
    /// Upper bound on sweeps; a sweep with no swaps ends the run earlier.
    pub max_steps: usize,
    /// Skip any pair with a frozen member instead of only blocking moves into
    /// a frozen right cell.
    pub type2_immovable: bool,
    /// Hysteresis for DG detection over the sortedness series.
    pub dg_epsilon: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            sweep_order: SweepOrder::Ascending,
            max_steps: 50,
            type2_immovable: false,
            dg_epsilon: DEFAULT_DG_EPSILON,
        }
    }
}

/// Index of an interned algotype name within one engine.
pub type AlgotypeId = usize;

/// One candidate under simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub n: u64,
    pub algotype: AlgotypeId,
    /// Fixed at construction.
    pub frozen: bool,
    /// Memoized arena slot of this cell's energy.
    energy: Option<usize>,
}

/// One row of the final state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellSnapshot {
    pub index: usize,
    pub n: u64,
    pub algotype: String,
    pub energy: String,
}

/// Everything one `run()` produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunResult {
    pub swaps_per_step: Vec<usize>,
    pub sortedness: Vec<f64>,
    pub aggregation: Vec<f64>,
    pub dg_episodes: Vec<DgEpisode>,
    pub dg_index: f64,
    pub final_state: Vec<CellSnapshot>,
    /// `final_state` stably sorted by ascending energy.
    pub ranked_candidates: Vec<CellSnapshot>,
}

impl RunResult {
    pub fn steps(&self) -> usize {
        self.swaps_per_step.len()
    }

    pub fn final_sortedness(&self) -> Option<f64> {
        self.sortedness.last().copied()
    }

    pub fn final_aggregation(&self) -> Option<f64> {
        self.aggregation.last().copied()
    }

    /// The lowest-energy candidate.
    pub fn top(&self) -> Option<&CellSnapshot> {
        self.ranked_candidates.first()
    }

    /// `(n, energy)` pairs in rank order, as the certification pass consumes them.
    pub fn ranked_pairs(&self) -> impl Iterator<Item = (u64, &str)> + '_ {
        self.ranked_candidates
            .iter()
            .map(|c| (c.n, c.energy.as_str()))
    }

    /// 1-based rank of `target` among the ranked candidates.
    pub fn rank_of(&self, target: u64) -> Option<usize> {
        self.ranked_candidates
            .iter()
            .position(|c| c.n == target)
            .map(|p| p + 1)
    }
}

/// The engine. Owns its cells, energy cache, and RNG for its whole lifetime.
pub struct CellViewEngine<R: Rng> {
    ctx: EnergyContext,
    rng: R,
    config: EngineConfig,
    specs: SpecSet,
    /// Interned algotype names; `AlgotypeId` indexes both vectors.
    algotypes: Vec<String>,
    scorers: Vec<EnergyFn>,
    energies: Vec<Energy>,
    cache: HashMap<(AlgotypeId, u64), usize>,
    cells: Vec<Cell>,
}

impl<R: Rng> CellViewEngine<R> {
    /// Build cells from `candidates`, cycling `algotypes` to tag them.
    ///
    /// Every algotype is resolved up front: first against `specs`, then by
    /// bare registry name with default parameters (the spec set grows by that
    /// entry). An empty algotype list means [`DEFAULT_ALGOTYPE`]; an empty
    /// spec set means the presets for the canonical challenge.
    pub fn new(
        modulus: BigUint,
        candidates: &[u64],
        algotypes: &[String],
        specs: SpecSet,
        rng: R,
        config: EngineConfig,
    ) -> Result<Self> {
        if candidates.contains(&0) {
            return Err(CellviewError::InvalidDomain(
                "candidates must be non-zero".to_string(),
            ));
        }
        let specs = if specs.is_empty() {
            default_specs(&Challenge::canonical())
        } else {
            specs
        };
        let names: Vec<String> = if algotypes.is_empty() {
            vec![DEFAULT_ALGOTYPE.to_string()]
        } else {
            algotypes.to_vec()
        };

        let mut engine = CellViewEngine {
            ctx: EnergyContext::new(modulus),
            rng,
            config,
            specs,
            algotypes: Vec::new(),
            scorers: Vec::new(),
            energies: Vec::new(),
            cache: HashMap::new(),
            cells: Vec::with_capacity(candidates.len()),
        };

        let mut ids = Vec::with_capacity(names.len());
        for name in &names {
            ids.push(engine.intern(name)?);
        }
        engine.cells = candidates
            .iter()
            .enumerate()
            .map(|(idx, &n)| Cell {
                n,
                algotype: ids[idx % ids.len()],
                frozen: false,
                energy: None,
            })
            .collect();
        Ok(engine)
    }

    /// Mark the cells at `positions` frozen. Part of construction; the flags
    /// do not change once the engine starts stepping.
    pub fn with_frozen(mut self, positions: &[usize]) -> Result<Self> {
        for &pos in positions {
            let cell = self.cells.get_mut(pos).ok_or_else(|| {
                CellviewError::InvalidDomain(format!("frozen position {pos} out of range"))
            })?;
            cell.frozen = true;
        }
        Ok(self)
    }

    fn intern(&mut self, name: &str) -> Result<AlgotypeId> {
        if let Some(id) = self.algotypes.iter().position(|a| a == name) {
            return Ok(id);
        }
        let spec = match self.specs.get(name) {
            Some(spec) => spec.clone(),
            None => {
                let spec = EnergySpec::from_registry(name)?;
                warn!(
                    "algotype '{}' has no preset; using registry family with default parameters",
                    name
                );
                self.specs.insert(name.to_string(), spec.clone());
                spec
            }
        };
        spec.energy.validate()?;
        self.algotypes.push(name.to_string());
        self.scorers.push(spec.energy);
        Ok(self.algotypes.len() - 1)
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn specs(&self) -> &SpecSet {
        &self.specs
    }

    pub fn algotype_name(&self, id: AlgotypeId) -> &str {
        &self.algotypes[id]
    }

    /// Number of distinct (algotype, n) energies currently cached.
    pub fn cached_energies(&self) -> usize {
        self.cache.len()
    }

    /// Energy of the cell at `index`: the cell's memo, else the cache, else a
    /// fresh evaluation that fills both.
    pub fn energy_of(&mut self, index: usize) -> &Energy {
        let slot = self.energy_slot(index);
        &self.energies[slot]
    }

    /// Drop the cell's memoized energy so the next lookup goes to the cache.
    pub fn clear_memo(&mut self, index: usize) {
        self.cells[index].energy = None;
    }

    /// Overwrite the cached energy for `(algotype, n)`.
    ///
    /// Cells that already memoized a value keep it until [`clear_memo`](Self::clear_memo).
    pub fn cache_insert(&mut self, algotype: &str, n: u64, energy: Energy) -> Result<()> {
        let id = self
            .algotypes
            .iter()
            .position(|a| a == algotype)
            .ok_or_else(|| CellviewError::UnknownEnergy(algotype.to_string()))?;
        self.energies.push(energy);
        self.cache.insert((id, n), self.energies.len() - 1);
        Ok(())
    }

    fn energy_slot(&mut self, index: usize) -> usize {
        let cell = self.cells[index];
        if let Some(slot) = cell.energy {
            return slot;
        }
        let key = (cell.algotype, cell.n);
        let slot = match self.cache.get(&key) {
            Some(&slot) => slot,
            None => {
                let value = self.scorers[cell.algotype].evaluate(cell.n, &self.ctx);
                self.energies.push(value);
                let slot = self.energies.len() - 1;
                self.cache.insert(key, slot);
                slot
            }
        };
        self.cells[index].energy = Some(slot);
        slot
    }

    fn sweep_indices(&mut self) -> Vec<usize> {
        let mut idxs: Vec<usize> = (0..self.cells.len().saturating_sub(1)).collect();
        if self.config.sweep_order == SweepOrder::Random {
            idxs.shuffle(&mut self.rng);
        }
        idxs
    }

    /// One sweep over adjacent pairs. Returns the number of swaps.
    ///
    /// A frozen left cell can still be pushed right; only a frozen right cell
    /// blocks the exchange. Under the type-2 policy any frozen member skips
    /// the pair entirely.
    pub fn step(&mut self) -> usize {
        let mut swaps = 0;
        for i in self.sweep_indices() {
            let (left, right) = (self.cells[i], self.cells[i + 1]);
            if self.config.type2_immovable && (left.frozen || right.frozen) {
                continue;
            }
            if left.frozen && right.frozen {
                continue;
            }
            let a = self.energy_slot(i);
            let b = self.energy_slot(i + 1);
            if self.energies[a] > self.energies[b] && !right.frozen {
                self.cells.swap(i, i + 1);
                swaps += 1;
            }
        }
        swaps
    }

    /// Step until a sweep makes no swaps or `max_steps` is reached, then
    /// summarize.
    pub fn run(&mut self) -> RunResult {
        info!(
            "cellview run: {} cells, {} algotypes, sweep={}, max_steps={}",
            self.cells.len(),
            self.algotypes.len(),
            self.config.sweep_order,
            self.config.max_steps
        );

        let mut swaps_per_step = Vec::new();
        let mut sortedness_series = Vec::new();
        let mut aggregation_series = Vec::new();

        for step in 0..self.config.max_steps {
            let swaps = self.step();
            let values: Vec<u64> = self.cells.iter().map(|c| c.n).collect();
            let labels: Vec<AlgotypeId> = self.cells.iter().map(|c| c.algotype).collect();
            let s = metrics::sortedness(&values);
            let a = metrics::aggregation(&labels);
            debug!(
                "step {}: swaps={} sortedness={:.6} aggregation={:.6}",
                step, swaps, s, a
            );
            swaps_per_step.push(swaps);
            sortedness_series.push(s);
            aggregation_series.push(a);
            if swaps == 0 {
                break;
            }
        }

        let dg = metrics::detect_dg(&sortedness_series, self.config.dg_epsilon);

        let slots: Vec<usize> = (0..self.cells.len()).map(|i| self.energy_slot(i)).collect();
        let final_state: Vec<CellSnapshot> = self
            .cells
            .iter()
            .zip(&slots)
            .enumerate()
            .map(|(index, (cell, &slot))| CellSnapshot {
                index,
                n: cell.n,
                algotype: self.algotypes[cell.algotype].clone(),
                energy: self.energies[slot].to_decimal_string(),
            })
            .collect();

        let mut order: Vec<usize> = (0..final_state.len()).collect();
        order.sort_by(|&x, &y| self.energies[slots[x]].cmp(&self.energies[slots[y]]));
        let ranked_candidates = order.iter().map(|&i| final_state[i].clone()).collect();

        info!(
            "cellview run finished: {} steps, dg_index={:.6}, {} episodes, {} energies cached",
            swaps_per_step.len(),
            dg.index,
            dg.episodes.len(),
            self.cache.len()
        );

        RunResult {
            swaps_per_step,
            sortedness: sortedness_series,
            aggregation: aggregation_series,
            dg_episodes: dg.episodes,
            dg_index: dg.index,
            final_state,
            ranked_candidates,
        }
    }
}
