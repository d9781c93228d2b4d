use std::path::PathBuf;

use cadence_core::BlackboardError;
use thiserror::Error;

/// Tree-construction defects. Surfaced immediately, never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BehaviorError {
    #[error("weighted entry must have a positive weight, got {weight}")]
    InvalidWeight { weight: u32 },

    #[error("run duration min {min} exceeds max {max}")]
    InvalidDuration { min: u64, max: u64 },

    #[error("behavior `{behavior}` references an undeclared blackboard key: {source}")]
    UndeclaredKey {
        behavior: String,
        #[source]
        source: BlackboardError,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
