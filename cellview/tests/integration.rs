//! Integration tests for the cellview crate.
//!
//! Tests cover:
//! - Run determinism under a fixed seed (ascending and random sweeps)
//! - Energy cache overrides
//! - The challenge materialization guard
//! - Metric reference cases
//! - End-to-end validation runs with certification and run logs

use num_bigint::BigUint;

use cellview::candidates::{
    corridor_around_sqrt, guard_dense_domain_for_challenge, CorridorParams,
};
use cellview::config::{Mode, RunConfig};
use cellview::metrics::{aggregation, detect_dg, sortedness};
use cellview::pipeline::run_pipeline;
use cellview::runlog::write_run_log;
use cellview::{
    default_specs, rng_from_hex, CellViewEngine, CellviewError, Energy, EngineConfig, RunResult,
    SweepOrder,
};
use factoring_core::Challenge;

fn small_run(sweep_order: SweepOrder) -> RunResult {
    let candidates: Vec<u64> = (2..100).collect();
    let config = EngineConfig {
        sweep_order,
        max_steps: 10,
        ..EngineConfig::default()
    };
    let mut engine = CellViewEngine::new(
        BigUint::from(10_933_133u64),
        &candidates,
        &["dirichlet5".to_string()],
        default_specs(&Challenge::canonical()),
        rng_from_hex("abcdef123456").unwrap(),
        config,
    )
    .unwrap();
    engine.run()
}

// ---------------------------------------------------------------------------
// Determinism
// ---------------------------------------------------------------------------

#[test]
fn test_same_seed_same_run() {
    let a = small_run(SweepOrder::Ascending);
    let b = small_run(SweepOrder::Ascending);
    assert_eq!(a.swaps_per_step, b.swaps_per_step);
    assert_eq!(a.dg_index, b.dg_index);
    let pairs_a: Vec<(u64, &str)> = a.final_state.iter().map(|c| (c.n, c.energy.as_str())).collect();
    let pairs_b: Vec<(u64, &str)> = b.final_state.iter().map(|c| (c.n, c.energy.as_str())).collect();
    assert_eq!(pairs_a, pairs_b);
    assert!(a.steps() <= 10);
}

#[test]
fn test_random_sweep_is_reproducible() {
    let a = small_run(SweepOrder::Random);
    let b = small_run(SweepOrder::Random);
    assert_eq!(a, b);
}

#[test]
fn test_corridor_sampling_is_reproducible() {
    let n = Challenge::canonical().n;
    let params = CorridorParams::new(500, 100_000);
    let first = corridor_around_sqrt(&n, &mut rng_from_hex("abc").unwrap(), params).unwrap();
    let second = corridor_around_sqrt(&n, &mut rng_from_hex("ABC").unwrap(), params).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 500);
}

// ---------------------------------------------------------------------------
// Cache override
// ---------------------------------------------------------------------------

#[test]
fn test_cache_override_visible_after_clearing_memo() {
    let candidates: Vec<u64> = vec![10, 20, 30];
    let mut engine = CellViewEngine::new(
        BigUint::from(10_933_133u64),
        &candidates,
        &["dirichlet5".to_string()],
        default_specs(&Challenge::canonical()),
        rng_from_hex("abcdef123456").unwrap(),
        EngineConfig::default(),
    )
    .unwrap();

    let computed = engine.energy_of(0).clone();
    let forced: Energy = "999.99".parse().unwrap();
    engine.cache_insert("dirichlet5", 10, forced.clone()).unwrap();
    assert_eq!(engine.energy_of(0), &computed);

    engine.clear_memo(0);
    assert_eq!(engine.energy_of(0), &forced);
    assert_eq!(forced.to_decimal_string(), "999.99");

    // The override now ranks 10 last.
    let result = engine.run();
    assert_eq!(result.ranked_candidates.last().map(|c| c.n), Some(10));
}

// ---------------------------------------------------------------------------
// Guard
// ---------------------------------------------------------------------------

#[test]
fn test_guard_limits() {
    let n = Challenge::canonical().n;
    assert!(guard_dense_domain_for_challenge(100, &n).is_ok());
    match guard_dense_domain_for_challenge(60_000_000, &n) {
        Err(CellviewError::UnsafeMaterialization { count, limit }) => {
            assert_eq!(count, 60_000_000);
            assert_eq!(limit, 50_000_000);
        }
        other => panic!("expected UnsafeMaterialization, got {:?}", other),
    }
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

#[test]
fn test_metric_reference_cases() {
    assert_eq!(sortedness(&[1u64, 2, 3, 4, 5]), 1.0);
    assert_eq!(sortedness(&[5u64, 4, 3, 2, 1]), 0.0);
    assert_eq!(aggregation(&["A", "A", "A", "A"]), 1.0);
    assert_eq!(aggregation(&["A", "B", "A", "B"]), 0.0);

    let report = detect_dg(&[0.0, 1.0, 0.2, 1.5, 0.0], 0.1);
    assert_eq!(report.episodes.len(), 1);
    assert!((report.index - 1.625).abs() < 1e-9);
}

// ---------------------------------------------------------------------------
// End to end
// ---------------------------------------------------------------------------

#[test]
fn test_validation_pipeline_writes_run_log() {
    let dir = tempfile::tempdir().unwrap();
    let config = RunConfig {
        mode: Mode::Validation,
        override_n: Some(BigUint::from(8051u32)),
        algotypes: vec!["dirichlet5".to_string(), "residue".to_string()],
        top_m: 10,
        log_dir: dir.path().join("logs"),
        ..RunConfig::default()
    };
    let log = run_pipeline(&config, &Challenge::canonical()).unwrap();
    // ⌊√8051⌋ = 89
    assert_eq!(log.candidate_count, 88);
    assert_eq!(log.certification.len(), 10);
    for (i, row) in log.certification.iter().enumerate() {
        assert_eq!(row.rank, i + 1);
        assert_eq!(row.is_factor, 8051 % row.n == 0);
    }

    let path = write_run_log(&config.log_dir, &log).unwrap();
    let file_name = path.file_name().unwrap().to_string_lossy().to_string();
    assert!(file_name.starts_with("run_") && file_name.ends_with(".json"));

    let text = std::fs::read_to_string(&path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["n"], "8051");
    assert_eq!(value["candidate_count"], 88);
    assert_eq!(value["config"]["mode"], "validation");
    assert_eq!(value["config"]["override_n"], "8051");
    assert!(value["results"]["ranked_candidates"].is_array());
    assert!(value["certification"][0].get("mod").is_some());
}

#[test]
fn test_challenge_pipeline_with_dense_band() {
    let config = RunConfig::from_args(&[
        "--dense-window=20".to_string(),
        "--max-steps=3".to_string(),
        "--top-m=5".to_string(),
    ])
    .unwrap();
    let challenge = Challenge::canonical();
    let log = run_pipeline(&config, &challenge).unwrap();
    assert_eq!(log.candidate_count, 41);
    assert_eq!(log.seed_hex, challenge.seed_hex);
    assert_eq!(log.certification.len(), 5);
}

#[test]
fn test_oversized_dense_window_is_refused_before_allocation() {
    let config = RunConfig::from_args(&["--dense-window=4611686018427387904".to_string()]).unwrap();
    let result = run_pipeline(&config, &Challenge::canonical());
    assert!(matches!(
        result,
        Err(CellviewError::UnsafeMaterialization { limit: 50_000_000, .. })
    ));

    let config = RunConfig::from_args(&["--dense-bands=100:4611686018427387904".to_string()]).unwrap();
    assert!(matches!(
        run_pipeline(&config, &Challenge::canonical()),
        Err(CellviewError::UnsafeMaterialization { .. })
    ));
}
