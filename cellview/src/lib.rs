//! # cellview
//!
//! Cell-view sorting over factor candidates near √N.
//!
//! Candidates become cells tagged with a scoring family (algotype). The engine
//! repeatedly sweeps adjacent pairs, swapping when the left cell has the
//! higher energy, until a sweep makes no swaps. Along the way it records
//! emergent signals (sortedness, algotype aggregation, delayed gratification)
//! and finally ranks every candidate by energy for certification.
//!
//! ## Modules
//!
//! - **candidates**: dense bands, sampled corridors around √N, the small-N
//!   validation domain, and the materialization guard
//! - **energy**: exact rational energies and the scoring-function registry
//! - **engine**: the sorting engine and its run summary
//! - **metrics**: sortedness, aggregation, DG episode detection
//! - **experiments**: toy, grid, and ladder batches (parallel)
//! - **config** / **pipeline** / **runlog**: the `cellview` binary's plumbing

pub mod candidates;
pub mod config;
pub mod energy;
pub mod engine;
pub mod error;
pub mod experiments;
pub mod metrics;
pub mod pipeline;
pub mod runlog;
pub mod seed;

pub use energy::{default_specs, Energy, EnergyFn, EnergySpec, SpecSet};
pub use engine::{CellViewEngine, EngineConfig, RunResult, SweepOrder};
pub use error::{CellviewError, Result};
pub use seed::{rng_from_hex, CellRng};
