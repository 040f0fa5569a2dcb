//! A single configured run: modulus, candidates, engine, certification.

use log::info;

use factoring_core::{certify_top_m, Challenge};

use crate::candidates::guard_dense_domain_for_challenge;
use crate::config::{Mode, RunConfig};
use crate::engine::{CellViewEngine, EngineConfig};
use crate::error::Result;
use crate::runlog::RunLog;
use crate::seed::rng_from_hex;

/// Run one engine as described by `config` against `challenge`.
///
/// The seed defaults to the challenge's derived seed. In challenge mode the
/// modulus must be canonical and the candidate count must pass the
/// materialization guard.
pub fn run_pipeline(config: &RunConfig, challenge: &Challenge) -> Result<RunLog> {
    let n = config.modulus(challenge)?;
    let seed_hex = config
        .seed_hex
        .clone()
        .unwrap_or_else(|| challenge.seed_hex.clone());
    let mut rng = rng_from_hex(&seed_hex)?;
    let specs = config.energy_specs(challenge)?;

    let candidates = config.load_candidates(&n, &mut rng)?;
    if config.mode == Mode::Challenge {
        guard_dense_domain_for_challenge(candidates.len(), &n)?;
    }
    info!("N={} mode={:?} candidates={}", n, config.mode, candidates.len());

    let engine_config = EngineConfig {
        sweep_order: config.sweep_order,
        max_steps: config.max_steps,
        type2_immovable: config.type2_immovable,
        ..EngineConfig::default()
    };
    let mut engine = CellViewEngine::new(
        n.clone(),
        &candidates,
        &config.algotypes,
        specs,
        rng,
        engine_config,
    )?;
    let results = engine.run();
    let certification = certify_top_m(results.ranked_pairs(), &n, config.top_m);

    Ok(RunLog {
        config: config.clone(),
        n: n.to_string(),
        seed_hex,
        candidate_count: candidates.len(),
        results,
        certification,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CellviewError;
    use num_bigint::BigUint;

    #[test]
    fn test_validation_run_certifies_factor() {
        let config = RunConfig {
            mode: Mode::Validation,
            override_n: Some(BigUint::from(221u32)),
            algotypes: vec!["residue".to_string()],
            top_m: 20,
            ..RunConfig::default()
        };
        let log = run_pipeline(&config, &Challenge::canonical()).unwrap();
        assert_eq!(log.n, "221");
        assert_eq!(log.candidate_count, 13);
        // 13 divides 221 and has zero residue energy, so it ranks among the first.
        assert!(log.certification.iter().any(|c| c.n == 13 && c.is_factor));
        assert_eq!(log.seed_hex, Challenge::canonical().seed_hex);
    }

    #[test]
    fn test_challenge_mode_rejects_override() {
        let config = RunConfig {
            override_n: Some(BigUint::from(221u32)),
            ..RunConfig::default()
        };
        let result = run_pipeline(&config, &Challenge::canonical());
        assert!(matches!(result, Err(CellviewError::InvalidDomain(_))));
    }

    #[test]
    fn test_bad_seed_is_reported() {
        let config = RunConfig {
            mode: Mode::Validation,
            override_n: Some(BigUint::from(221u32)),
            seed_hex: Some("not-hex".to_string()),
            ..RunConfig::default()
        };
        let result = run_pipeline(&config, &Challenge::canonical());
        assert!(matches!(result, Err(CellviewError::InvalidSeed(_))));
    }
}
