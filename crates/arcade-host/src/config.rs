use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use arcade_core::game_trait::GameConfig;

use crate::error::HostError;

const ENV_VAR: &str = "ARCADE_CONFIG";
const DEFAULT_PATH: &str = "arcade.toml";

/// Top-level host configuration, loaded from `arcade.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Registry name of the game to run, e.g. `"rockets"`.
    pub game: String,
    /// Bot-controlled players in the local match.
    pub bots: u64,
    pub seed: u64,
    /// Overrides the game's own time limit when non-zero.
    pub round_duration_secs: u64,
    /// Clock multiplier; 1.0 runs at the game's own tick rate.
    pub speedup: f32,
    pub broadcast_capacity: usize,
    /// Emit logs as JSON lines instead of the human-readable format.
    pub json_logs: bool,
    /// Game-specific toggles passed through to `GameConfig::custom`.
    pub custom: HashMap<String, serde_json::Value>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            game: "rockets".to_string(),
            bots: 4,
            seed: 1,
            round_duration_secs: 0,
            speedup: 1.0,
            broadcast_capacity: 256,
            json_logs: false,
            custom: HashMap::new(),
        }
    }
}

impl HostConfig {
    /// The file named by `ARCADE_CONFIG`, else `arcade.toml` if present, else
    /// defaults. A named file that is missing or malformed is an error.
    pub fn load() -> Result<Self, HostError> {
        if let Ok(path) = std::env::var(ENV_VAR)
            && !path.is_empty()
        {
            return Self::from_path(&path);
        }
        if Path::new(DEFAULT_PATH).exists() {
            return Self::from_path(DEFAULT_PATH);
        }
        tracing::info!("No {DEFAULT_PATH} found, using defaults");
        Ok(Self::default())
    }

    pub fn from_path(path: &str) -> Result<Self, HostError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| HostError::Config(format!("{path}: {e}")))?;
        let config = Self::parse(&contents).map_err(|e| match e {
            HostError::Config(m) => HostError::Config(format!("{path}: {m}")),
            other => other,
        })?;
        tracing::info!(path, "Loaded host configuration");
        Ok(config)
    }

    pub fn parse(contents: &str) -> Result<Self, HostError> {
        let config: Self = toml::from_str(contents).map_err(|e| HostError::Config(e.to_string()))?;
        if !(config.speedup.is_finite() && config.speedup > 0.0) {
            return Err(HostError::Config(format!(
                "speedup must be positive, got {}",
                config.speedup
            )));
        }
        if config.broadcast_capacity == 0 {
            return Err(HostError::Config("broadcast_capacity must be non-zero".into()));
        }
        Ok(config)
    }

    /// Per-match configuration handed to the game.
    pub fn game_config(&self) -> GameConfig {
        GameConfig {
            round_duration: Duration::from_secs(self.round_duration_secs),
            seed: self.seed,
            custom: self.custom.clone(),
        }
    }
}
