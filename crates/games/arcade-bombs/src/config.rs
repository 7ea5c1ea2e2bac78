use serde::{Deserialize, Serialize};

use arcade_core::config::{HazardSpawn, Metric, SimConfig, ThrowStyle, WinConfig, load_toml};
use arcade_core::entity::Payload;
use arcade_core::powerup::PowerUpKind;

/// Data-driven configuration for the bomb games.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BombsConfig {
    /// Start in hot-potato mode unless the match config says otherwise.
    pub hot_potato: bool,
    /// Spawn ring radius as a fraction of the shorter arena side.
    pub spawn_ring: f32,
    /// Bot keeps at least this far outside a blast radius.
    pub bot_evade_margin: f32,
    /// Simulation tuning for the bomb-toss mode.
    pub sim: SimConfig,
    pub hot_potato_rules: HotPotatoConfig,
}

/// Overrides applied on top of `sim` in hot-potato mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HotPotatoConfig {
    pub fuse_ms: u64,
    /// Delay before a fresh bomb lands on a random survivor.
    pub rearm_ms: u64,
    pub pass_cooldown_ms: u64,
    pub blast_radius: f32,
    /// Carriers move faster to chase a hand-off.
    pub carrier_speed: f32,
}

impl Default for HotPotatoConfig {
    fn default() -> Self {
        Self {
            fuse_ms: 8000,
            rearm_ms: 1000,
            pass_cooldown_ms: 500,
            blast_radius: 30.0,
            carrier_speed: 5.5,
        }
    }
}

impl Default for BombsConfig {
    fn default() -> Self {
        let mut sim = SimConfig {
            arena_width: 800.0,
            arena_height: 600.0,
            knockback: 0.0,
            ..SimConfig::default()
        };
        sim.movement.base_speed = 4.5;
        sim.movement.max_health = 3;

        sim.actions.throw = ThrowStyle::Instant;
        sim.actions.throw_payload = Payload::AreaOfEffect;
        sim.actions.throw_distance = 150.0;
        sim.actions.cooldown_ms = 900;

        sim.hazards.area_of_effect.effect_radius = 70.0;
        sim.hazards.area_of_effect.fuse_ms = 1800;
        sim.hazards.cluster.child_distance = 55.0;
        sim.hazards.cluster.child_fuse_ms = 500;
        sim.hazards.cluster.effect_radius = 50.0;

        sim.spawns.powerup_interval_ms = 6000;
        sim.spawns.powerup_kinds = vec![
            PowerUpKind::SpeedBoost,
            PowerUpKind::Shield,
            PowerUpKind::ClusterBombs,
            PowerUpKind::ExtraLife,
        ];
        sim.spawns.hazard_interval_ms = 4000;
        sim.spawns.hazard_mode = HazardSpawn::RandomDrop;
        sim.spawns.max_hazards = 12;

        sim.scoring.kill_points = 3;
        sim.win = WinConfig {
            last_survivor: true,
            time_limit_ms: 120_000,
            metric: Metric::Score,
            ..WinConfig::default()
        };

        Self {
            hot_potato: false,
            spawn_ring: 0.3,
            bot_evade_margin: 24.0,
            sim,
            hot_potato_rules: HotPotatoConfig::default(),
        }
    }
}

impl BombsConfig {
    /// Load config from environment or TOML file, falling back to defaults.
    pub fn load() -> Self {
        load_toml("ARCADE_BOMBS_CONFIG", "config/bombs.toml")
    }

    /// Effective simulation config for the chosen mode.
    pub fn sim_for(&self, hot_potato: bool) -> SimConfig {
        let mut sim = self.sim.clone();
        if !hot_potato {
            return sim;
        }
        let rules = &self.hot_potato_rules;
        sim.movement.max_health = 1;
        sim.movement.base_speed = rules.carrier_speed;
        sim.actions.throw = ThrowStyle::None;
        sim.actions.max_carried = 1;
        sim.actions.pass_cooldown_ms = rules.pass_cooldown_ms;
        sim.hazards.sticky.fuse_ms = rules.fuse_ms;
        sim.hazards.sticky.effect_radius = rules.blast_radius;
        sim.spawns.powerup_interval_ms = 0;
        sim.spawns.powerup_kinds.clear();
        sim.spawns.hazard_mode = HazardSpawn::AttachRandom;
        sim.spawns.hazard_interval_ms = rules.rearm_ms;
        sim.scoring.kill_points = 0;
        sim.scoring.survival_interval_ms = 1000;
        sim.scoring.survival_points = 1;
        sim
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hot_potato_overrides_throws_and_spawns() {
        let cfg = BombsConfig::default();
        let sim = cfg.sim_for(true);
        assert_eq!(sim.actions.throw, ThrowStyle::None);
        assert_eq!(sim.spawns.hazard_mode, HazardSpawn::AttachRandom);
        assert_eq!(sim.movement.max_health, 1);
        assert_eq!(cfg.sim_for(false), cfg.sim);
    }

    #[test]
    fn toml_overrides_nested_tables() {
        let cfg: BombsConfig = toml::from_str(
            r#"
hot_potato = true

[hot_potato_rules]
fuse_ms = 3000
"#,
        )
        .unwrap();
        assert!(cfg.hot_potato);
        assert_eq!(cfg.hot_potato_rules.fuse_ms, 3000);
        assert_eq!(cfg.hot_potato_rules.rearm_ms, 1000);
        assert_eq!(cfg.sim.actions.throw, ThrowStyle::Instant);
    }
}
