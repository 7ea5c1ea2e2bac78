//! Data-driven tuning tables passed into the integrator and resolver.
//!
//! Every table is `#[serde(default)]`, so a TOML file only needs the keys it
//! changes. Durations are written in milliseconds and converted to ticks
//! against the configured tick period.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::clock::ticks_for;
use crate::entity::Payload;
use crate::game_trait::GameConfig;
use crate::geom::Arena;
use crate::powerup::{PowerUpGrants, PowerUpKind};

/// Top-level simulation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Nominal tick period in milliseconds.
    pub tick_ms: u64,
    pub arena_width: f32,
    pub arena_height: f32,
    /// Lobby → Active delay after `start()`.
    pub countdown_ms: u64,
    /// Seed for every random decision (spawn points, oil spin).
    pub seed: u64,
    /// Keep moving hazards and platforms during the countdown. Nothing
    /// triggers, collides or takes input until the match is active.
    pub simulate_during_countdown: bool,
    /// Maximum trail samples kept per entity.
    pub trail_length: usize,
    /// Trail life lost per tick.
    pub trail_decay: f32,
    /// Knockback impulse per unit of projectile power.
    pub knockback: f32,
    pub movement: MovementConfig,
    pub hazards: HazardTable,
    pub powerups: PowerUpConfig,
    pub obstacles: ObstacleConfig,
    pub actions: ActionConfig,
    pub spawns: SpawnConfig,
    pub scoring: ScoringConfig,
    pub win: WinConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_ms: 50,
            arena_width: 800.0,
            arena_height: 600.0,
            countdown_ms: 3000,
            seed: 0,
            simulate_during_countdown: false,
            trail_length: 12,
            trail_decay: 0.08,
            knockback: 10.0,
            movement: MovementConfig::default(),
            hazards: HazardTable::default(),
            powerups: PowerUpConfig::default(),
            obstacles: ObstacleConfig::default(),
            actions: ActionConfig::default(),
            spawns: SpawnConfig::default(),
            scoring: ScoringConfig::default(),
            win: WinConfig::default(),
        }
    }
}

impl SimConfig {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }

    /// Convert a configured millisecond duration into ticks (rounded up).
    pub fn ticks(&self, ms: u64) -> u32 {
        ticks_for(self.period(), Duration::from_millis(ms))
    }

    pub fn arena(&self) -> Arena {
        Arena::new(self.arena_width, self.arena_height)
    }

    /// Power-up grant table with durations resolved to ticks.
    pub fn powerup_grants(&self) -> PowerUpGrants {
        let p = &self.powerups;
        PowerUpGrants {
            speed_multiplier: p.speed_multiplier,
            speed_ticks: self.ticks(p.speed_ms),
            shield_ticks: self.ticks(p.shield_ms),
            invulnerability_ticks: self.ticks(p.invulnerability_ms),
            anchor_ticks: self.ticks(p.anchor_ms),
            resource_amount: p.resource_amount,
            resource_cap: p.resource_cap,
            extra_life: p.extra_life,
        }
    }

    /// Copy of this config with the host's per-match settings applied: the
    /// seed always, the round duration when non-zero.
    pub fn for_match(&self, game: &GameConfig) -> Self {
        let mut config = self.clone();
        config.seed = game.seed;
        if !game.round_duration.is_zero() {
            config.win.time_limit_ms =
                u64::try_from(game.round_duration.as_millis()).unwrap_or(u64::MAX);
        }
        config
    }

    /// Clamp values that would break the integrator (zero periods, damping
    /// factors that add energy, non-positive arenas).
    pub fn sanitized(mut self) -> Self {
        self.tick_ms = self.tick_ms.max(1);
        if !(self.arena_width.is_finite() && self.arena_width > 0.0) {
            self.arena_width = Self::default().arena_width;
        }
        if !(self.arena_height.is_finite() && self.arena_height > 0.0) {
            self.arena_height = Self::default().arena_height;
        }
        self.movement.friction = self.movement.friction.clamp(0.0, 1.0);
        self.movement.knockback_decay = self.movement.knockback_decay.clamp(0.0, 1.0);
        for spec in self.hazards.iter_mut() {
            spec.friction = spec.friction.clamp(0.0, 1.0);
            if let Boundary::Reflect { damping } = &mut spec.boundary {
                *damping = damping.clamp(0.0, 0.99);
            }
        }
        self.trail_decay = self.trail_decay.max(0.0);
        self
    }
}

/// How players translate intents into motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovementModel {
    /// Position moves along the intent direction at effective speed.
    Direct,
    /// Up accelerates along the heading, down brakes/reverses, left/right
    /// steer. Velocity decays by friction.
    Vehicle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    pub model: MovementModel,
    /// Units per tick at multiplier 1.
    pub base_speed: f32,
    /// Vehicle thrust per tick.
    pub acceleration: f32,
    /// Vehicle velocity retention per tick, in `[0, 1]`.
    pub friction: f32,
    /// Vehicle steering in radians per tick.
    pub turn_rate: f32,
    /// Reverse speed cap as a fraction of `base_speed`.
    pub reverse_fraction: f32,
    pub player_radius: f32,
    /// Health (or lives) at match start.
    pub max_health: u32,
    /// Knockback retention per tick, in `[0, 1]`.
    pub knockback_decay: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            model: MovementModel::Direct,
            base_speed: 6.0,
            acceleration: 0.6,
            friction: 0.96,
            turn_rate: 0.12,
            reverse_fraction: 0.4,
            player_radius: 16.0,
            max_health: 1,
            knockback_decay: 0.7,
        }
    }
}

/// What a hazard does when it reaches the arena edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy")]
pub enum Boundary {
    /// Hard stop at the edge.
    Clamp,
    /// Mirror the velocity component and scale it by `damping` (< 1).
    Reflect { damping: f32 },
    /// Remove the hazard on contact.
    Remove,
}

/// Per-payload physics and damage tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HazardSpec {
    /// Launch speed in units per tick.
    pub speed: f32,
    /// Speed gained per tick when moving toward a target or tracking.
    pub acceleration: f32,
    pub max_speed: f32,
    /// Contact radius.
    pub radius: f32,
    /// Area damage radius on trigger (0 for non-explosive).
    pub effect_radius: f32,
    pub damage: u32,
    pub fuse_ms: u64,
    /// How long a triggered hazard stays in the snapshot.
    pub window_ms: u64,
    pub boundary: Boundary,
    /// Velocity retention per tick for free-moving hazards.
    pub friction: f32,
    /// Downward acceleration per tick for free-moving hazards.
    pub gravity: f32,
    /// Homing steering limit in radians per tick.
    pub turn_rate: f32,
    /// Child hazards spawned by a cluster split.
    pub children: u32,
    pub child_distance: f32,
    pub child_fuse_ms: u64,
}

impl Default for HazardSpec {
    fn default() -> Self {
        Self {
            speed: 10.0,
            acceleration: 0.0,
            max_speed: 10.0,
            radius: 8.0,
            effect_radius: 80.0,
            damage: 1,
            fuse_ms: 2000,
            window_ms: 400,
            boundary: Boundary::Clamp,
            friction: 1.0,
            gravity: 0.0,
            turn_rate: 0.1,
            children: 0,
            child_distance: 60.0,
            child_fuse_ms: 500,
        }
    }
}

/// One [`HazardSpec`] per payload kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HazardTable {
    pub simple: HazardSpec,
    pub area_of_effect: HazardSpec,
    pub cluster: HazardSpec,
    pub sticky: HazardSpec,
    pub homing: HazardSpec,
}

impl Default for HazardTable {
    fn default() -> Self {
        Self {
            simple: HazardSpec {
                speed: 14.0,
                max_speed: 14.0,
                effect_radius: 0.0,
                fuse_ms: 1500,
                window_ms: 0,
                boundary: Boundary::Remove,
                friction: 0.99,
                ..HazardSpec::default()
            },
            area_of_effect: HazardSpec {
                speed: 12.0,
                max_speed: 12.0,
                ..HazardSpec::default()
            },
            cluster: HazardSpec {
                speed: 12.0,
                max_speed: 12.0,
                effect_radius: 60.0,
                children: 4,
                ..HazardSpec::default()
            },
            sticky: HazardSpec {
                speed: 0.0,
                max_speed: 0.0,
                radius: 10.0,
                effect_radius: 60.0,
                fuse_ms: 15_000,
                window_ms: 600,
                ..HazardSpec::default()
            },
            homing: HazardSpec {
                speed: 3.0,
                acceleration: 0.15,
                max_speed: 9.0,
                radius: 10.0,
                effect_radius: 40.0,
                fuse_ms: 8000,
                turn_rate: 0.08,
                ..HazardSpec::default()
            },
        }
    }
}

impl HazardTable {
    pub fn get(&self, payload: Payload) -> &HazardSpec {
        match payload {
            Payload::Simple => &self.simple,
            Payload::AreaOfEffect => &self.area_of_effect,
            Payload::Cluster => &self.cluster,
            Payload::Sticky => &self.sticky,
            Payload::Homing => &self.homing,
        }
    }

    fn iter_mut(&mut self) -> impl Iterator<Item = &mut HazardSpec> {
        [
            &mut self.simple,
            &mut self.area_of_effect,
            &mut self.cluster,
            &mut self.sticky,
            &mut self.homing,
        ]
        .into_iter()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerUpConfig {
    pub radius: f32,
    pub speed_multiplier: f32,
    pub speed_ms: u64,
    pub shield_ms: u64,
    pub invulnerability_ms: u64,
    pub anchor_ms: u64,
    /// Charges granted per countable pick-up.
    pub resource_amount: u32,
    /// Maximum charges of one resource a player may hold.
    pub resource_cap: u32,
    /// Health restored by an extra-life pick-up.
    pub extra_life: u32,
}

impl Default for PowerUpConfig {
    fn default() -> Self {
        Self {
            radius: 14.0,
            speed_multiplier: 1.6,
            speed_ms: 8000,
            shield_ms: 5000,
            invulnerability_ms: 3000,
            anchor_ms: 6000,
            resource_amount: 1,
            resource_cap: 3,
            extra_life: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObstacleConfig {
    pub oil_slow: f32,
    pub oil_ms: u64,
    /// Maximum heading perturbation on entering oil, in radians.
    pub oil_spin: f32,
    pub spike_slow: f32,
    pub spike_ms: u64,
    /// Length of the crashed state after hitting a barrier.
    pub crash_ms: u64,
}

impl Default for ObstacleConfig {
    fn default() -> Self {
        Self {
            oil_slow: 0.5,
            oil_ms: 1000,
            oil_spin: 0.8,
            spike_slow: 0.2,
            spike_ms: 1500,
            crash_ms: 1500,
        }
    }
}

/// How the attack trigger throws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThrowStyle {
    None,
    /// Lob `throw_payload` at a point ahead of the player on press.
    Instant,
    /// Charge while held, release a simple projectile whose power grows
    /// with the charge.
    Charged,
}

/// What the special trigger does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Special {
    None,
    /// Spend a nitro charge for a speed effect.
    Nitro,
    /// Spend an ice charge to throw a freezing projectile.
    IceBall,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionConfig {
    pub throw: ThrowStyle,
    pub throw_payload: Payload,
    pub throw_distance: f32,
    pub cooldown_ms: u64,
    pub max_charge_ms: u64,
    pub min_power: f32,
    pub max_power: f32,
    pub special: Special,
    pub nitro_multiplier: f32,
    pub nitro_ms: u64,
    pub freeze_ms: u64,
    pub build: bool,
    pub shelter_half_size: f32,
    pub shelter_health: u32,
    pub build_cooldown_ms: u64,
    /// Carried (sticky) hazards a single player may hold.
    pub max_carried: usize,
    /// Minimum time a carried hazard stays with one carrier.
    pub pass_cooldown_ms: u64,
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            throw: ThrowStyle::None,
            throw_payload: Payload::AreaOfEffect,
            throw_distance: 160.0,
            cooldown_ms: 600,
            max_charge_ms: 1500,
            min_power: 0.5,
            max_power: 2.0,
            special: Special::None,
            nitro_multiplier: 1.8,
            nitro_ms: 1500,
            freeze_ms: 1500,
            build: false,
            shelter_half_size: 28.0,
            shelter_health: 3,
            build_cooldown_ms: 5000,
            max_carried: 1,
            pass_cooldown_ms: 500,
        }
    }
}

/// Periodic hazard spawner behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HazardSpawn {
    None,
    /// Homing rocket from a random arena edge, tracking a random survivor.
    EdgeHoming,
    /// Area bomb dropped at a random point.
    RandomDrop,
    /// Sticky bomb attached to a random survivor when none is armed.
    AttachRandom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    /// 0 disables power-up spawning.
    pub powerup_interval_ms: u64,
    pub powerup_kinds: Vec<PowerUpKind>,
    pub powerup_lifetime_ms: u64,
    pub max_powerups: usize,
    /// 0 disables hazard spawning.
    pub hazard_interval_ms: u64,
    pub hazard_mode: HazardSpawn,
    pub max_hazards: usize,
    /// Distance from the arena edge kept clear when picking spawn points.
    pub margin: f32,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            powerup_interval_ms: 0,
            powerup_kinds: Vec::new(),
            powerup_lifetime_ms: 8000,
            max_powerups: 3,
            hazard_interval_ms: 0,
            hazard_mode: HazardSpawn::None,
            max_hazards: 8,
            margin: 24.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub kill_points: i32,
    /// 0 disables survival points.
    pub survival_interval_ms: u64,
    pub survival_points: i32,
    pub checkpoint_points: i32,
    pub lap_points: i32,
    pub pickup_points: i32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            kill_points: 1,
            survival_interval_ms: 0,
            survival_points: 1,
            checkpoint_points: 0,
            lap_points: 0,
            pickup_points: 0,
        }
    }
}

/// Objective predicate that ends the match as soon as one player meets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Objective {
    None,
    /// Complete every lap of the track.
    FinishLaps,
    /// Enter the finish region.
    ReachRegion,
    /// Hold the hill alone for `hold_ms` without a break.
    HoldZone { hold_ms: u64 },
    /// Complete `count` tasks.
    Tasks { count: u32 },
}

/// Ranking used when the shared timer runs out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Metric {
    Score,
    Progress,
    Health,
    HoldTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WinConfig {
    /// End when at most one player remains alive.
    pub last_survivor: bool,
    /// 0 disables the shared timer.
    pub time_limit_ms: u64,
    pub objective: Objective,
    pub metric: Metric,
}

impl Default for WinConfig {
    fn default() -> Self {
        Self {
            last_survivor: true,
            time_limit_ms: 90_000,
            objective: Objective::None,
            metric: Metric::Score,
        }
    }
}

/// Load a TOML config: the file named by `env_var`, then `fallback_path`,
/// then `T::default()`.
pub fn load_toml<T: DeserializeOwned + Default>(env_var: &str, fallback_path: &str) -> T {
    if let Ok(path) = std::env::var(env_var)
        && let Some(config) = read_toml(&path)
    {
        return config;
    }
    if let Some(config) = read_toml(fallback_path) {
        return config;
    }
    T::default()
}

fn read_toml<T: DeserializeOwned>(path: &str) -> Option<T> {
    let contents = std::fs::read_to_string(path).ok()?;
    match toml::from_str::<T>(&contents) {
        Ok(config) => {
            tracing::info!(path, "Loaded configuration");
            Some(config)
        },
        Err(e) => {
            tracing::warn!(path, error = %e, "Failed to parse config, ignoring");
            None
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ms_converts_to_ticks() {
        let cfg = SimConfig::default();
        assert_eq!(cfg.ticks(8000), 160);
        assert_eq!(cfg.ticks(0), 0);
        assert_eq!(cfg.powerup_grants().speed_ticks, 160);
    }

    #[test]
    fn match_settings_override_seed_and_timer() {
        let base = SimConfig::default();
        let game = GameConfig {
            round_duration: Duration::from_secs(30),
            seed: 99,
            ..GameConfig::default()
        };
        let cfg = base.for_match(&game);
        assert_eq!(cfg.seed, 99);
        assert_eq!(cfg.win.time_limit_ms, 30_000);

        let untimed = base.for_match(&GameConfig::default());
        assert_eq!(untimed.win.time_limit_ms, base.win.time_limit_ms);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let toml_str = r#"
tick_ms = 16
seed = 42

[movement]
model = "Vehicle"

[hazards.simple]
boundary = { policy = "Reflect", damping = 0.5 }

[win]
objective = { kind = "HoldZone", hold_ms = 10000 }
"#;
        let cfg: SimConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.tick_ms, 16);
        assert_eq!(cfg.seed, 42);
        assert_eq!(cfg.movement.model, MovementModel::Vehicle);
        assert_eq!(cfg.movement.max_health, 1);
        assert_eq!(
            cfg.hazards.simple.boundary,
            Boundary::Reflect { damping: 0.5 }
        );
        assert_eq!(cfg.hazards.simple.fuse_ms, 1500);
        assert_eq!(cfg.win.objective, Objective::HoldZone { hold_ms: 10_000 });
        assert_eq!(cfg.arena_width, 800.0);
    }

    #[test]
    fn sanitize_rejects_energy_gain() {
        let mut cfg = SimConfig::default();
        cfg.tick_ms = 0;
        cfg.movement.friction = 1.5;
        cfg.hazards.area_of_effect.boundary = Boundary::Reflect { damping: 1.2 };
        let cfg = cfg.sanitized();
        assert_eq!(cfg.tick_ms, 1);
        assert_eq!(cfg.movement.friction, 1.0);
        assert_eq!(
            cfg.hazards.area_of_effect.boundary,
            Boundary::Reflect { damping: 0.99 }
        );
    }

    #[test]
    fn hazard_table_lookup() {
        let table = HazardTable::default();
        assert_eq!(table.get(Payload::Cluster).children, 4);
        assert_eq!(table.get(Payload::Simple).boundary, Boundary::Remove);
    }

    #[test]
    fn load_missing_files_falls_back_to_default() {
        let cfg: SimConfig = load_toml("ARCADE_TEST_UNSET_CONFIG", "does/not/exist.toml");
        assert_eq!(cfg, SimConfig::default());
    }
}
