use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::brain::BrainConfig;
use crate::retry::{RetryPolicy, ScanThrottleConfig};
use crate::ConfigError;

/// Start cooldowns keyed by behavior name, in ticks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CooldownTable {
    entries: BTreeMap<String, u64>,
}

impl CooldownTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, behavior: impl Into<String>, ticks: u64) -> Self {
        self.insert(behavior, ticks);
        self
    }

    pub fn insert(&mut self, behavior: impl Into<String>, ticks: u64) -> Option<u64> {
        self.entries.insert(behavior.into(), ticks)
    }

    pub fn get(&self, behavior: &str) -> Option<u64> {
        self.entries.get(behavior).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Tunables for a population of brains.
///
/// ```yaml
/// brain:
///   think_every_ticks: 4
/// cooldowns:
///   eat: 200
/// retry:
///   max_delay: 600
/// ```
///
/// Every field is optional; missing ones take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub brain: BrainConfig,
    pub cooldowns: CooldownTable,
    pub retry: RetryPolicy,
    pub scan: ScanThrottleConfig,
}

impl SchedulerConfig {
    pub fn from_yaml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml_str(&raw)?;
        tracing::debug!(path = %path.display(), cooldowns = config.cooldowns.len(), "loaded scheduler config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry.min_increase > self.retry.max_increase {
            return Err(ConfigError::Invalid(format!(
                "retry.min_increase ({}) exceeds retry.max_increase ({})",
                self.retry.min_increase, self.retry.max_increase
            )));
        }
        if self.brain.think_every_ticks == 0 {
            return Err(ConfigError::Invalid(
                "brain.think_every_ticks must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
