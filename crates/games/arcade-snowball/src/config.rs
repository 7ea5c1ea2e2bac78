use serde::{Deserialize, Serialize};

use arcade_core::config::{Metric, Objective, SimConfig, Special, ThrowStyle, WinConfig, load_toml};
use arcade_core::powerup::PowerUpKind;

/// Data-driven configuration for the snowball fight.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnowballConfig {
    /// Play king-of-the-hill unless the match config says otherwise.
    pub king_of_the_hill: bool,
    /// Spawn ring radius as a fraction of the shorter arena side.
    pub spawn_ring: f32,
    pub hill_radius: f32,
    /// Time alone on the hill needed to win.
    pub hold_ms: u64,
    /// Bots start charging inside this distance.
    pub bot_range: f32,
    /// Ticks a bot holds the throw before releasing.
    pub bot_charge_ticks: u32,
    pub sim: SimConfig,
}

impl Default for SnowballConfig {
    fn default() -> Self {
        let mut sim = SimConfig {
            arena_width: 800.0,
            arena_height: 600.0,
            knockback: 8.0,
            ..SimConfig::default()
        };
        sim.movement.base_speed = 4.5;
        sim.movement.max_health = 5;

        sim.actions.throw = ThrowStyle::Charged;
        sim.actions.max_charge_ms = 1200;
        sim.actions.min_power = 0.5;
        sim.actions.max_power = 2.0;
        sim.actions.cooldown_ms = 400;
        sim.actions.special = Special::IceBall;
        sim.actions.freeze_ms = 1500;
        sim.actions.build = true;
        sim.actions.shelter_half_size = 30.0;
        sim.actions.shelter_health = 4;
        sim.actions.build_cooldown_ms = 8000;

        sim.hazards.simple.speed = 11.0;
        sim.hazards.simple.max_speed = 11.0;
        sim.hazards.simple.radius = 6.0;

        sim.spawns.powerup_interval_ms = 6000;
        sim.spawns.powerup_kinds = vec![
            PowerUpKind::IceBalls,
            PowerUpKind::Anchor,
            PowerUpKind::Shield,
            PowerUpKind::ExtraLife,
        ];

        sim.scoring.kill_points = 1;
        sim.win = WinConfig {
            last_survivor: true,
            time_limit_ms: 120_000,
            objective: Objective::None,
            metric: Metric::Health,
        };

        Self {
            king_of_the_hill: false,
            spawn_ring: 0.3,
            hill_radius: 80.0,
            hold_ms: 15_000,
            bot_range: 220.0,
            bot_charge_ticks: 12,
            sim,
        }
    }
}

impl SnowballConfig {
    /// Load config from environment or TOML file, falling back to defaults.
    pub fn load() -> Self {
        load_toml("ARCADE_SNOWBALL_CONFIG", "config/snowball.toml")
    }

    /// Effective simulation config for the chosen mode.
    pub fn sim_for(&self, king_of_the_hill: bool) -> SimConfig {
        let mut sim = self.sim.clone();
        if king_of_the_hill {
            sim.win.objective = Objective::HoldZone {
                hold_ms: self.hold_ms,
            };
            sim.win.metric = Metric::HoldTime;
        }
        sim
    }
}
