use serde::{Deserialize, Serialize};

use arcade_core::config::{
    Metric, MovementModel, Objective, SimConfig, Special, WinConfig, load_toml,
};
use arcade_core::powerup::PowerUpKind;

/// Data-driven configuration for the racing game.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RacingConfig {
    pub laps: u32,
    /// Width of the lane between the arena edge and the infield barrier.
    pub lane_width: f32,
    /// Half-thickness of each checkpoint gate.
    pub gate_half_width: f32,
    /// Nitro charges every racer starts with.
    pub starting_nitro: u32,
    /// Bots switch to the next corner inside this distance.
    pub bot_waypoint_radius: f32,
    pub sim: SimConfig,
}

impl Default for RacingConfig {
    fn default() -> Self {
        let mut sim = SimConfig {
            arena_width: 1000.0,
            arena_height: 700.0,
            knockback: 0.0,
            ..SimConfig::default()
        };
        sim.movement.model = MovementModel::Vehicle;
        sim.movement.base_speed = 7.0;
        sim.movement.acceleration = 0.5;
        sim.movement.friction = 0.97;
        sim.movement.turn_rate = 0.09;
        sim.movement.player_radius = 14.0;
        sim.movement.max_health = 1;

        sim.actions.special = Special::Nitro;
        sim.actions.nitro_multiplier = 1.8;
        sim.actions.nitro_ms = 1500;

        sim.obstacles.crash_ms = 1200;

        sim.spawns.powerup_interval_ms = 5000;
        sim.spawns.powerup_kinds = vec![
            PowerUpKind::Nitro,
            PowerUpKind::SpeedBoost,
            PowerUpKind::Shield,
        ];
        sim.powerups.speed_ms = 3000;
        sim.powerups.shield_ms = 4000;

        sim.scoring.checkpoint_points = 1;
        sim.scoring.lap_points = 5;
        sim.win = WinConfig {
            last_survivor: false,
            time_limit_ms: 180_000,
            objective: Objective::FinishLaps,
            metric: Metric::Progress,
        };

        Self {
            laps: 3,
            lane_width: 200.0,
            gate_half_width: 20.0,
            starting_nitro: 1,
            bot_waypoint_radius: 70.0,
            sim,
        }
    }
}

impl RacingConfig {
    /// Load config from environment or TOML file, falling back to defaults.
    pub fn load() -> Self {
        load_toml("ARCADE_RACING_CONFIG", "config/racing.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_a_timed_lap_race() {
        let cfg = RacingConfig::default();
        assert_eq!(cfg.sim.movement.model, MovementModel::Vehicle);
        assert_eq!(cfg.sim.win.objective, Objective::FinishLaps);
        assert!(!cfg.sim.win.last_survivor);
        assert!(cfg.lane_width * 2.0 < cfg.sim.arena_height);
    }

    #[test]
    fn toml_overrides_laps_only() {
        let cfg: RacingConfig = toml::from_str("laps = 5").unwrap();
        assert_eq!(cfg.laps, 5);
        assert_eq!(cfg.starting_nitro, 1);
        assert_eq!(cfg.sim.arena_width, 1000.0);
    }
}
