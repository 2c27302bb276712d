use std::fs;
use std::path::Path;

use anyhow::{ensure, Context, Result};
use pixel_formats::DEFAULT_START_NODE;
use serde::{Deserialize, Serialize};

use crate::dialogue::DialogueTiming;

pub const DEFAULT_REVEAL_PERIOD_MS: u64 = 30;
pub const DEFAULT_INPUT_LOCK_MS: u64 = 200;
pub const DEFAULT_CHAIN_DELAY_MS: u64 = 100;
pub const DEFAULT_INTERACTION_RADIUS: f32 = 24.0;
pub const DEFAULT_FRAME_MS: u64 = 16;

/// Tuning knobs for the interaction core. Every field is optional in JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Milliseconds between two revealed characters.
    pub reveal_period_ms: u64,
    /// Input lock applied when a session opens.
    pub settle_lock_ms: u64,
    /// Input lock applied after skipping the typewriter.
    pub skip_lock_ms: u64,
    /// Delay before an NPC re-opens the next node of a conversation.
    pub chain_delay_ms: u64,
    pub interaction_radius: f32,
    pub start_node: String,
    /// Length of one host frame when replaying scripts.
    pub frame_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reveal_period_ms: DEFAULT_REVEAL_PERIOD_MS,
            settle_lock_ms: DEFAULT_INPUT_LOCK_MS,
            skip_lock_ms: DEFAULT_INPUT_LOCK_MS,
            chain_delay_ms: DEFAULT_CHAIN_DELAY_MS,
            interaction_radius: DEFAULT_INTERACTION_RADIUS,
            start_node: DEFAULT_START_NODE.to_string(),
            frame_ms: DEFAULT_FRAME_MS,
        }
    }
}

impl EngineConfig {
    /// Loads overrides from `path` when given; a missing argument yields defaults.
    pub fn from_json_file(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let raw = fs::read_to_string(path)
                    .with_context(|| format!("reading engine config {}", path.display()))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("parsing engine config json {}", path.display()))?
            }
            None => EngineConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.interaction_radius.is_finite() && self.interaction_radius > 0.0,
            "interaction_radius must be a positive number (got {})",
            self.interaction_radius
        );
        ensure!(self.frame_ms > 0, "frame_ms must be greater than zero");
        ensure!(
            !self.start_node.trim().is_empty(),
            "start_node must not be empty"
        );
        Ok(())
    }

    pub fn dialogue_timing(&self) -> DialogueTiming {
        DialogueTiming {
            reveal_period_ms: self.reveal_period_ms,
            settle_lock_ms: self.settle_lock_ms,
            skip_lock_ms: self.skip_lock_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn partial_json_keeps_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("engine.json");
        fs::write(&path, r#"{ "reveal_period_ms": 10, "start_node": "intro" }"#)?;

        let config = EngineConfig::from_json_file(Some(&path))?;
        assert_eq!(config.reveal_period_ms, 10);
        assert_eq!(config.start_node, "intro");
        assert_eq!(config.settle_lock_ms, DEFAULT_INPUT_LOCK_MS);
        assert_eq!(config.interaction_radius, DEFAULT_INTERACTION_RADIUS);
        Ok(())
    }

    #[test]
    fn rejects_non_positive_radius() {
        let config = EngineConfig {
            interaction_radius: 0.0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn no_path_means_defaults() {
        let config = EngineConfig::from_json_file(None).expect("defaults are valid");
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.dialogue_timing(), DialogueTiming::default());
    }
}
