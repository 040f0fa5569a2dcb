//! Error type shared by every cellview module.

/// Configuration errors raised while building candidates, specs, or engines.
///
/// None of these are transient; callers report them and stop.
#[derive(Debug, thiserror::Error)]
pub enum CellviewError {
    #[error("Unknown energy function: {0}")]
    UnknownEnergy(String),

    #[error("Candidate count {count} exceeds safe limit {limit} for challenge mode")]
    UnsafeMaterialization { count: usize, limit: usize },

    #[error("Invalid domain request: {0}")]
    InvalidDomain(String),

    #[error("Invalid seed hex '{0}'")]
    InvalidSeed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CellviewError>;
