use serde::{Deserialize, Serialize};

use arcade_core::config::{HazardSpawn, Metric, SimConfig, WinConfig, load_toml};
use arcade_core::powerup::PowerUpKind;

/// Data-driven configuration for rocket dodge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RocketsConfig {
    /// Spawn ring radius as a fraction of the shorter arena side.
    pub spawn_ring: f32,
    /// Bots start dodging a rocket inside this distance.
    pub bot_danger_radius: f32,
    /// Bots steer back toward the middle inside this distance of a wall.
    pub bot_wall_margin: f32,
    pub sim: SimConfig,
}

impl Default for RocketsConfig {
    fn default() -> Self {
        let mut sim = SimConfig {
            arena_width: 800.0,
            arena_height: 600.0,
            knockback: 0.0,
            ..SimConfig::default()
        };
        sim.movement.base_speed = 5.5;
        sim.movement.max_health = 3;

        sim.hazards.homing.speed = 3.0;
        sim.hazards.homing.acceleration = 0.15;
        sim.hazards.homing.max_speed = 8.0;
        sim.hazards.homing.turn_rate = 0.07;
        sim.hazards.homing.fuse_ms = 10_000;
        sim.hazards.homing.effect_radius = 40.0;

        sim.spawns.hazard_mode = HazardSpawn::EdgeHoming;
        sim.spawns.hazard_interval_ms = 1500;
        sim.spawns.max_hazards = 6;
        sim.spawns.powerup_interval_ms = 7000;
        sim.spawns.powerup_kinds = vec![
            PowerUpKind::Shield,
            PowerUpKind::SpeedBoost,
            PowerUpKind::Invulnerability,
            PowerUpKind::ExtraLife,
        ];

        sim.scoring.kill_points = 0;
        sim.scoring.survival_interval_ms = 1000;
        sim.scoring.survival_points = 1;
        sim.scoring.pickup_points = 2;
        sim.win = WinConfig {
            last_survivor: true,
            time_limit_ms: 90_000,
            metric: Metric::Score,
            ..WinConfig::default()
        };

        Self {
            spawn_ring: 0.3,
            bot_danger_radius: 170.0,
            bot_wall_margin: 60.0,
            sim,
        }
    }
}

impl RocketsConfig {
    /// Load config from environment or TOML file, falling back to defaults.
    pub fn load() -> Self {
        load_toml("ARCADE_ROCKETS_CONFIG", "config/rockets.toml")
    }
}
