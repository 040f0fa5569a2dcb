//! Cell-view sorting engine CLI.
//!
//! Usage:
//!   cellview --mode=challenge  [--samples=N] [--window=N] [--bands=c:w:s,...]
//!                              [--dense-window=N] [--dense-bands=c:h,...]
//!   cellview --mode=validation --override-n=N
//!   cellview --mode=toy | --mode=grid | --mode=ladder
//!
//! Common flags: --algotypes=a,b  --sweep-order=ascending|random
//!   --max-steps=N  --top-m=N  --seed-hex=HEX  --candidates-file=PATH
//!   --specs-file=PATH  --type2-immovable  --log-dir=PATH
//!
//! Set RUST_LOG=info (or debug for per-step output) to see engine logs.

use std::path::Path;
use std::time::Instant;

use cellview::config::{Mode, RunConfig};
use cellview::experiments::{self, GridParams, LADDER_CASES, TOY_CASES};
use cellview::pipeline::run_pipeline;
use cellview::runlog::write_run_log;
use factoring_core::Challenge;
use serde::Serialize;

fn main() {
    env_logger::init();
    let args: Vec<String> = std::env::args().skip(1).collect();

    if let Err(e) = run(&args) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(args: &[String]) -> cellview::Result<()> {
    let config = RunConfig::from_args(args)?;
    let challenge = Challenge::canonical();
    let start = Instant::now();

    match config.mode {
        Mode::Challenge | Mode::Validation => run_single(&config, &challenge)?,
        Mode::Toy => run_toy(&config)?,
        Mode::Grid => run_grid(&config, &challenge)?,
        Mode::Ladder => run_ladder(&config)?,
    }

    println!("\nElapsed: {:.2?}", start.elapsed());
    Ok(())
}

fn run_single(config: &RunConfig, challenge: &Challenge) -> cellview::Result<()> {
    println!("=== cellview: {:?} run ===", config.mode);
    let log = run_pipeline(config, challenge)?;
    let path = write_run_log(&config.log_dir, &log)?;

    println!(
        "Run complete. Candidates: {}. Steps: {}. DG index: {:.6}",
        log.candidate_count,
        log.results.steps(),
        log.results.dg_index
    );
    println!("Log: {}", path.display());
    println!("Top-{} certified (showing first 5):", config.top_m);
    for row in log.certification.iter().take(5) {
        println!("{}", serde_json::to_string(row)?);
    }
    Ok(())
}

fn run_toy(config: &RunConfig) -> cellview::Result<()> {
    let algotype = config
        .algotypes
        .first()
        .map(String::as_str)
        .unwrap_or(cellview::engine::DEFAULT_ALGOTYPE);
    println!("Toy evaluation ({algotype}, full domain, deterministic seeds):");
    let reports = experiments::toy_eval(TOY_CASES, algotype)?;
    for r in &reports {
        println!(
            "  N={} factors={:?} count={} ranks={:?} DG={:.6} agg_final={} sorted_final={}",
            r.n,
            r.factors,
            r.candidate_count,
            r.factor_ranks,
            r.dg_index,
            fmt_opt(r.aggregation_final),
            fmt_opt(r.sortedness_final)
        );
    }
    write_report(&config.log_dir, "toy", &reports)
}

fn run_grid(config: &RunConfig, challenge: &Challenge) -> cellview::Result<()> {
    let params = GridParams::default();
    println!(
        "Challenge grid probe ({} samples per run, deterministic seed):",
        params.samples
    );
    let reports = experiments::challenge_grid(challenge, &params)?;
    for r in &reports {
        println!(
            "  win={} algo={:<18} DG={:.5} S_final={} A_final={} top_n={:?} energy={}",
            r.window,
            r.algotype,
            r.dg_index,
            fmt_opt(r.sortedness_final),
            fmt_opt(r.aggregation_final),
            r.top_n,
            r.top_energy.as_deref().unwrap_or("-")
        );
    }
    write_report(&config.log_dir, "grid", &reports)
}

fn run_ladder(config: &RunConfig) -> cellview::Result<()> {
    let algotypes: Vec<String> = experiments::GRID_ALGOTYPES
        .iter()
        .map(|a| a.to_string())
        .collect();
    println!("Small-to-mid scaling ladder (random sweeps, deterministic seeds):");
    let reports = experiments::scaling_ladder(LADDER_CASES, &algotypes)?;
    for r in &reports {
        println!(
            "  bits={:>3} mode={:<13} algo={:<18} p_rank={:<6} q_rank={:<6} DG={:.5} S_final={} A_final={} top_n={:?}",
            r.bits,
            format!("{:?}", r.mode),
            r.algotype,
            fmt_rank(r.p_rank),
            fmt_rank(r.q_rank),
            r.dg_index,
            fmt_opt(r.sortedness_final),
            fmt_opt(r.aggregation_final),
            r.top_n
        );
    }
    write_report(&config.log_dir, "ladder", &reports)
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.4}"))
}

fn fmt_rank(rank: Option<usize>) -> String {
    rank.map_or_else(|| "-".to_string(), |r| r.to_string())
}

fn write_report<T: Serialize>(dir: &Path, prefix: &str, reports: &T) -> cellview::Result<()> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.json", cellview::runlog::timestamp_id(prefix)));
    std::fs::write(&path, serde_json::to_string_pretty(reports)?)?;
    println!("\nResults written to {}", path.display());
    Ok(())
}
