//! Run configuration: command-line parsing and candidate loading.
//!
//! Flags use the `--key=value` form (bare `--type2-immovable` is a switch):
//!   --mode=challenge|validation|toy|grid|ladder
//!   --override-n=<N>            Modulus override (validation mode)
//!   --samples=<N>               Corridor samples (default 50,000)
//!   --window=<N>                Corridor half-width (default 10,000,000)
//!   --bands=c:w:s,...           Sparse multiband corridors
//!   --dense-window=<N>          Dense band of +/- N around sqrt(N)
//!   --dense-bands=c:h,...       Dense bands, full coverage per band
//!   --algotypes=a,b             Comma-separated algotypes (default dirichlet5)
//!   --sweep-order=ascending|random
//!   --max-steps=<N>             (default 50)
//!   --top-m=<N>                 Candidates to certify (default 50)
//!   --seed-hex=<hex>            Seed override (default SHA-256 of N)
//!   --candidates-file=<path>    Newline-separated candidates
//!   --specs-file=<path>         JSON map of extra energy specs
//!   --log-dir=<path>            Run log directory (default logs)

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use num_bigint::BigUint;
use rand::Rng;
use serde::Serialize;

use factoring_core::{biguint_string, isqrt, to_u64, Challenge};

use crate::candidates::{self, Band, CorridorParams, DEFAULT_SAMPLES, DEFAULT_WINDOW};
use crate::energy::{default_specs, SpecSet};
use crate::engine::{SweepOrder, DEFAULT_ALGOTYPE};
use crate::error::{CellviewError, Result};

/// What the binary does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Sparse or banded search on the canonical challenge.
    Challenge,
    /// Full-domain run on a small override modulus.
    Validation,
    /// Known-factor batch over small semiprimes.
    Toy,
    /// Window × algotype probe on the challenge.
    Grid,
    /// Small-to-mid semiprime scaling ladder.
    Ladder,
}

impl FromStr for Mode {
    type Err = CellviewError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "challenge" => Ok(Mode::Challenge),
            "validation" => Ok(Mode::Validation),
            "toy" => Ok(Mode::Toy),
            "grid" => Ok(Mode::Grid),
            "ladder" => Ok(Mode::Ladder),
            other => Err(CellviewError::InvalidDomain(format!(
                "unknown mode '{other}' (expected challenge|validation|toy|grid|ladder)"
            ))),
        }
    }
}

/// Parsed command line. Serialized verbatim into the run log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunConfig {
    pub mode: Mode,
    #[serde(with = "biguint_string::option")]
    pub override_n: Option<BigUint>,
    pub samples: usize,
    pub window: u64,
    pub bands: Vec<Band>,
    pub dense_window: Option<u64>,
    pub dense_bands: Vec<(u64, u64)>,
    pub algotypes: Vec<String>,
    pub sweep_order: SweepOrder,
    pub max_steps: usize,
    pub top_m: usize,
    pub seed_hex: Option<String>,
    pub candidates_file: Option<PathBuf>,
    pub specs_file: Option<PathBuf>,
    pub type2_immovable: bool,
    pub log_dir: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            mode: Mode::Challenge,
            override_n: None,
            samples: DEFAULT_SAMPLES,
            window: DEFAULT_WINDOW,
            bands: Vec::new(),
            dense_window: None,
            dense_bands: Vec::new(),
            algotypes: vec![DEFAULT_ALGOTYPE.to_string()],
            sweep_order: SweepOrder::Ascending,
            max_steps: 50,
            top_m: 50,
            seed_hex: None,
            candidates_file: None,
            specs_file: None,
            type2_immovable: false,
            log_dir: PathBuf::from("logs"),
        }
    }
}

fn flag<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    let prefix = format!("--{name}=");
    args.iter().find_map(|a| a.strip_prefix(prefix.as_str()))
}

fn parse_flag<T: FromStr>(args: &[String], name: &str) -> Result<Option<T>> {
    match flag(args, name) {
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            CellviewError::InvalidDomain(format!("--{name}: cannot parse '{raw}'"))
        }),
        None => Ok(None),
    }
}

fn parse_triples(raw: &str) -> Result<Vec<Band>> {
    raw.split(',')
        .filter(|t| !t.trim().is_empty())
        .map(|token| {
            let parts: Vec<&str> = token.trim().split(':').collect();
            let bad = || CellviewError::InvalidDomain(format!("bad band '{token}' (want c:w:s)"));
            if parts.len() != 3 {
                return Err(bad());
            }
            Ok(Band {
                center: parts[0].parse().map_err(|_| bad())?,
                window: parts[1].parse().map_err(|_| bad())?,
                samples: parts[2].parse().map_err(|_| bad())?,
            })
        })
        .collect()
}

fn parse_pairs(raw: &str) -> Result<Vec<(u64, u64)>> {
    raw.split(',')
        .filter(|t| !t.trim().is_empty())
        .map(|token| {
            let bad = || CellviewError::InvalidDomain(format!("bad dense band '{token}' (want c:h)"));
            let (center, half) = token.trim().split_once(':').ok_or_else(bad)?;
            Ok((
                center.parse().map_err(|_| bad())?,
                half.parse().map_err(|_| bad())?,
            ))
        })
        .collect()
}

impl RunConfig {
    /// Parse command-line arguments (program name already stripped).
    pub fn from_args(args: &[String]) -> Result<Self> {
        let defaults = RunConfig::default();

        let mode = parse_flag::<Mode>(args, "mode")?.unwrap_or(defaults.mode);
        let algotypes: Vec<String> = flag(args, "algotypes")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|a| !a.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or(defaults.algotypes);

        let config = RunConfig {
            mode,
            override_n: parse_flag(args, "override-n")?,
            samples: parse_flag(args, "samples")?.unwrap_or(defaults.samples),
            window: parse_flag(args, "window")?.unwrap_or(defaults.window),
            bands: flag(args, "bands").map(parse_triples).transpose()?.unwrap_or_default(),
            dense_window: parse_flag(args, "dense-window")?,
            dense_bands: flag(args, "dense-bands")
                .map(parse_pairs)
                .transpose()?
                .unwrap_or_default(),
            algotypes,
            sweep_order: parse_flag(args, "sweep-order")?.unwrap_or(defaults.sweep_order),
            max_steps: parse_flag(args, "max-steps")?.unwrap_or(defaults.max_steps),
            top_m: parse_flag(args, "top-m")?.unwrap_or(defaults.top_m),
            seed_hex: flag(args, "seed-hex").map(str::to_string),
            candidates_file: flag(args, "candidates-file").map(PathBuf::from),
            specs_file: flag(args, "specs-file").map(PathBuf::from),
            type2_immovable: args.iter().any(|a| a == "--type2-immovable"),
            log_dir: flag(args, "log-dir").map(PathBuf::from).unwrap_or(defaults.log_dir),
        };
        Ok(config)
    }

    /// The modulus this run studies, checked against the mode.
    pub fn modulus(&self, challenge: &Challenge) -> Result<BigUint> {
        let n = self.override_n.clone().unwrap_or_else(|| challenge.n.clone());
        if self.mode == Mode::Challenge && !challenge.is_modulus(&n) {
            return Err(CellviewError::InvalidDomain(
                "challenge mode must use the canonical N; use validation mode to override"
                    .to_string(),
            ));
        }
        Ok(n)
    }

    /// Presets for `challenge`, overlaid with any specs from `--specs-file`.
    pub fn energy_specs(&self, challenge: &Challenge) -> Result<SpecSet> {
        let mut specs = default_specs(challenge);
        if let Some(path) = &self.specs_file {
            specs.extend(load_specs_file(path)?);
        }
        Ok(specs)
    }

    /// Candidate list for a single run.
    ///
    /// Precedence: candidates file, dense window, dense bands, validation
    /// domain, sparse multiband corridors, single corridor.
    pub fn load_candidates<R: Rng + ?Sized>(&self, n: &BigUint, rng: &mut R) -> Result<Vec<u64>> {
        if let Some(path) = &self.candidates_file {
            return load_candidates_file(path);
        }
        if let Some(half) = self.dense_window {
            let center = to_u64(&isqrt(n)).ok_or_else(|| {
                CellviewError::InvalidDomain(format!("sqrt({n}) does not fit a 64-bit candidate"))
            })?;
            return candidates::dense_band(center, half);
        }
        if !self.dense_bands.is_empty() {
            return candidates::dense_bands(&self.dense_bands);
        }
        if self.mode == Mode::Validation {
            return candidates::validation_full_domain(n);
        }
        if !self.bands.is_empty() {
            return candidates::multiband_corridors(n, rng, &self.bands);
        }
        candidates::corridor_around_sqrt(n, rng, CorridorParams::new(self.samples, self.window))
    }
}

/// Read newline-separated integers, skipping blank lines.
pub fn load_candidates_file(path: &Path) -> Result<Vec<u64>> {
    let text = fs::read_to_string(path)?;
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            line.parse::<u64>().map_err(|_| {
                CellviewError::InvalidDomain(format!(
                    "{}: '{line}' is not a candidate integer",
                    path.display()
                ))
            })
        })
        .collect()
}

/// Read a JSON object of `name -> EnergySpec`.
pub fn load_specs_file(path: &Path) -> Result<SpecSet> {
    let text = fs::read_to_string(path)?;
    let specs: SpecSet = serde_json::from_str(&text)?;
    Ok(specs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::rng_from_hex;
    use std::io::Write;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_defaults() {
        let config = RunConfig::from_args(&[]).unwrap();
        assert_eq!(config, RunConfig::default());
        assert_eq!(config.algotypes, vec!["dirichlet5".to_string()]);
    }

    #[test]
    fn test_parse_flags() {
        let config = RunConfig::from_args(&args(&[
            "--mode=validation",
            "--override-n=8051",
            "--algotypes=dirichlet5, arctan,,",
            "--sweep-order=random",
            "--max-steps=7",
            "--bands=100:10:5,200:20:8",
            "--dense-bands=50:2,60:3",
            "--type2-immovable",
            "--seed-hex=abc",
        ]))
        .unwrap();
        assert_eq!(config.mode, Mode::Validation);
        assert_eq!(config.override_n, Some(BigUint::from(8051u32)));
        assert_eq!(config.algotypes, vec!["dirichlet5", "arctan"]);
        assert_eq!(config.sweep_order, SweepOrder::Random);
        assert_eq!(config.max_steps, 7);
        assert_eq!(
            config.bands,
            vec![
                Band { center: 100, window: 10, samples: 5 },
                Band { center: 200, window: 20, samples: 8 },
            ]
        );
        assert_eq!(config.dense_bands, vec![(50, 2), (60, 3)]);
        assert!(config.type2_immovable);
        assert_eq!(config.seed_hex.as_deref(), Some("abc"));
    }

    #[test]
    fn test_parse_errors() {
        assert!(RunConfig::from_args(&args(&["--mode=party"])).is_err());
        assert!(RunConfig::from_args(&args(&["--max-steps=lots"])).is_err());
        assert!(RunConfig::from_args(&args(&["--bands=1:2"])).is_err());
        assert!(RunConfig::from_args(&args(&["--dense-bands=1"])).is_err());
    }

    #[test]
    fn test_challenge_mode_requires_canonical_n() {
        let challenge = Challenge::canonical();
        let config = RunConfig::from_args(&args(&["--override-n=8051"])).unwrap();
        assert!(config.modulus(&challenge).is_err());
        let config = RunConfig::from_args(&args(&["--mode=validation", "--override-n=8051"])).unwrap();
        assert_eq!(config.modulus(&challenge).unwrap(), BigUint::from(8051u32));
        let config = RunConfig::default();
        assert_eq!(config.modulus(&challenge).unwrap(), challenge.n);
    }

    #[test]
    fn test_candidate_precedence() {
        let n = BigUint::from(10_000u32);
        let mut rng = rng_from_hex("1").unwrap();

        let mut config = RunConfig {
            mode: Mode::Validation,
            dense_window: Some(2),
            ..RunConfig::default()
        };
        assert_eq!(config.load_candidates(&n, &mut rng).unwrap(), vec![98, 99, 100, 101, 102]);

        config.dense_window = None;
        let domain = config.load_candidates(&n, &mut rng).unwrap();
        assert_eq!(domain.len(), 99);

        config.dense_bands = vec![(10, 1)];
        assert_eq!(config.load_candidates(&n, &mut rng).unwrap(), vec![9, 10, 11]);
    }

    #[test]
    fn test_candidates_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "11\n\n  13 \n17").unwrap();
        let config = RunConfig {
            candidates_file: Some(file.path().to_path_buf()),
            ..RunConfig::default()
        };
        let n = BigUint::from(221u32);
        let mut rng = rng_from_hex("1").unwrap();
        assert_eq!(config.load_candidates(&n, &mut rng).unwrap(), vec![11, 13, 17]);

        let mut bad = tempfile::NamedTempFile::new().unwrap();
        writeln!(bad, "11\nabc").unwrap();
        assert!(load_candidates_file(bad.path()).is_err());
    }

    #[test]
    fn test_specs_file_overlays_presets() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"res_only": {{"name": "res_only", "energy": {{"family": "residue"}}}}}}"#
        )
        .unwrap();
        let config = RunConfig {
            specs_file: Some(file.path().to_path_buf()),
            ..RunConfig::default()
        };
        let specs = config.energy_specs(&Challenge::canonical()).unwrap();
        assert!(specs.contains_key("res_only"));
        assert!(specs.contains_key("dirichlet5"));
    }
}
