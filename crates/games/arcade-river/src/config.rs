use serde::{Deserialize, Serialize};

use arcade_core::config::{Metric, Objective, SimConfig, WinConfig, load_toml};

/// Data-driven configuration for the river crossing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiverConfig {
    /// Lanes of drifting logs between the banks.
    pub rows: u32,
    pub row_height: f32,
    /// Depth of the starting bank below the river.
    pub bank_depth: f32,
    /// Depth of the finish region along the far bank.
    pub finish_depth: f32,
    pub logs_per_row: u32,
    pub log_width: f32,
    /// Drift speed of the slowest row, in units per tick.
    pub log_speed: f32,
    /// Extra drift added per row, cycling every three rows.
    pub log_speed_step: f32,
    /// How far ahead of its center a bot checks for footing.
    pub bot_lookahead: f32,
    /// Bots only step onto a log with this much of it on either side.
    pub bot_footing_margin: f32,
    pub sim: SimConfig,
}

impl Default for RiverConfig {
    fn default() -> Self {
        let mut sim = SimConfig {
            arena_width: 600.0,
            arena_height: 700.0,
            knockback: 0.0,
            ..SimConfig::default()
        };
        sim.movement.base_speed = 3.5;
        sim.movement.player_radius = 14.0;
        sim.movement.max_health = 1;

        sim.scoring.checkpoint_points = 1;
        sim.win = WinConfig {
            last_survivor: false,
            time_limit_ms: 90_000,
            objective: Objective::ReachRegion,
            metric: Metric::Progress,
        };

        Self {
            rows: 8,
            row_height: 65.0,
            bank_depth: 80.0,
            finish_depth: 80.0,
            logs_per_row: 2,
            log_width: 150.0,
            log_speed: 1.2,
            log_speed_step: 0.3,
            bot_lookahead: 20.0,
            bot_footing_margin: 25.0,
            sim,
        }
    }
}

impl RiverConfig {
    /// Load config from environment or TOML file, falling back to defaults.
    pub fn load() -> Self {
        load_toml("ARCADE_RIVER_CONFIG", "config/river.toml")
    }
}
