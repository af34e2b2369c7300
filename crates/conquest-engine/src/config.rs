//! Engine configuration

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use conquest_core::RulesConfig;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Undo depth; `None` keeps every command.
    pub history_depth: Option<usize>,
    /// Events buffered per subscriber before the oldest are dropped.
    pub event_capacity: usize,
    /// Milliseconds a bot may spend on one decision before its turn is forfeited.
    pub bot_timeout_ms: u64,
    /// Rules for newly generated matches.
    pub rules: RulesConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_depth: Some(256),
            event_capacity: 256,
            bot_timeout_ms: 5_000,
            rules: RulesConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn bot_timeout(&self) -> Duration {
        Duration::from_millis(self.bot_timeout_ms)
    }

    /// Load from a YAML file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        Ok(config)
    }
}
