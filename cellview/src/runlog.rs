//! JSON run logs.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use factoring_core::Certification;

use crate::config::RunConfig;
use crate::engine::RunResult;
use crate::error::Result;

/// Everything recorded about one CLI run.
#[derive(Debug, Clone, Serialize)]
pub struct RunLog {
    pub config: RunConfig,
    /// Modulus as a decimal string.
    pub n: String,
    pub seed_hex: String,
    pub candidate_count: usize,
    pub results: RunResult,
    pub certification: Vec<Certification>,
}

/// `<prefix>_<unix millis>`.
pub fn timestamp_id(prefix: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    format!("{prefix}_{millis}")
}

/// Write `log` pretty-printed to `<dir>/run_<millis>.json`, creating `dir`.
pub fn write_run_log(dir: &Path, log: &RunLog) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.json", timestamp_id("run")));
    let json = serde_json::to_string_pretty(log)?;
    fs::write(&path, json)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_id_shape() {
        let id = timestamp_id("run");
        let millis = id.strip_prefix("run_").unwrap();
        assert!(millis.parse::<u128>().unwrap() > 0);
    }
}
