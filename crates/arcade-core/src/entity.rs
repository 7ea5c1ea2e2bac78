use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::clock::Tick;
use crate::effects::{EffectKind, EffectSet};
use crate::game_trait::PlayerId;
use crate::geom::{Aabb, Vec2};
use crate::intent::Intent;

/// Identifier for non-player entities (hazards, power-ups, obstacles, shelters).
pub type EntityId = u32;

/// One recent position with a presentation-only fade value in `(0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrailSample {
    pub position: Vec2,
    pub life: f32,
}

/// Bounded ring buffer of recent positions, newest last.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trail {
    samples: VecDeque<TrailSample>,
}

impl Trail {
    /// Fade existing samples by `decay`, drop dead ones, then record
    /// `position`, evicting the oldest beyond `capacity`.
    pub fn push(&mut self, position: Vec2, capacity: usize, decay: f32) {
        if capacity == 0 {
            self.samples.clear();
            return;
        }
        for s in &mut self.samples {
            s.life -= decay;
        }
        self.samples.retain(|s| s.life > 0.0);
        self.samples.push_back(TrailSample {
            position,
            life: 1.0,
        });
        while self.samples.len() > capacity {
            self.samples.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrailSample> {
        self.samples.iter()
    }
}

/// Ordered checkpoint progress for racing-style objectives.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    /// Completed laps.
    pub lap: u32,
    /// Index of the next checkpoint that counts.
    pub next_checkpoint: usize,
    /// Total checkpoints passed across all laps.
    pub checkpoints_passed: u32,
    pub finished_at: Option<Tick>,
}

/// A player's simulated state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub id: PlayerId,
    pub position: Vec2,
    pub velocity: Vec2,
    /// Residual push from projectile hits, decays every tick.
    pub knockback: Vec2,
    /// Facing angle in radians; throws and vehicle thrust follow it.
    pub heading: f32,
    pub radius: f32,
    pub alive: bool,
    pub health: u32,
    pub max_health: u32,
    pub score: i32,
    pub kills: u32,
    pub effects: EffectSet,
    /// Intent latched for this tick. Written only from the input side.
    pub intent: Intent,
    pub progress: Progress,
    /// Ticks spent as the sole occupant of the hill zone, over the match.
    pub hold_ticks: u32,
    /// Consecutive ticks of sole occupancy up to now; zero once the player
    /// leaves or the hill is contested.
    pub hold_streak: u32,
    pub tasks: u32,
    /// Ticks the attack trigger has been held (charged throws).
    pub charge: u32,
    /// First tick at which the next attack/special may fire.
    pub attack_ready_at: Tick,
    pub build_ready_at: Tick,
    /// Platform under the player, recomputed every tick.
    pub riding: Option<EntityId>,
    pub eliminated_at: Option<Tick>,
    pub trail: Trail,
}

impl PlayerState {
    pub fn new(id: PlayerId, position: Vec2, radius: f32, max_health: u32) -> Self {
        Self {
            id,
            position,
            velocity: Vec2::ZERO,
            knockback: Vec2::ZERO,
            heading: 0.0,
            radius,
            alive: true,
            health: max_health,
            max_health,
            score: 0,
            kills: 0,
            effects: EffectSet::default(),
            intent: Intent::default(),
            progress: Progress::default(),
            hold_ticks: 0,
            hold_streak: 0,
            tasks: 0,
            charge: 0,
            attack_ready_at: 0,
            build_ready_at: 0,
            riding: None,
            eliminated_at: None,
            trail: Trail::default(),
        }
    }

    pub fn has_effect(&self, kind: EffectKind, tick: Tick) -> bool {
        self.effects.is_active(kind, tick)
    }
}

/// What a hazard does when it triggers or touches something.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Payload {
    /// Thrown projectile: damages on direct impact only.
    Simple,
    /// Explodes once, damaging every player in its effect radius.
    AreaOfEffect,
    /// Explodes like `AreaOfEffect` and splits into child bombs.
    Cluster,
    /// Attaches to a player and is passed on contact; explodes on its carrier.
    Sticky,
    /// Steers toward a tracked player and explodes on contact.
    Homing,
}

impl Payload {
    /// Whether triggering applies area damage.
    pub fn is_explosive(self) -> bool {
        !matches!(self, Payload::Simple)
    }
}

/// Armed → Triggered happens exactly once; Spent hazards are removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerState {
    Armed,
    Triggered { at: Tick },
    Spent,
}

/// Effect applied to a player struck by a projectile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OnHit {
    pub kind: EffectKind,
    pub magnitude: f32,
    pub duration_ticks: u32,
}

/// Projectile, explosive, or moving threat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hazard {
    pub id: EntityId,
    pub payload: Payload,
    pub position: Vec2,
    pub velocity: Vec2,
    /// Who threw or placed it; `None` for environmental hazards.
    pub owner: Option<PlayerId>,
    /// Fixed destination for lobbed hazards.
    pub target: Option<Vec2>,
    /// Player tracked by homing hazards.
    pub tracking: Option<PlayerId>,
    /// Player carrying a sticky hazard.
    pub carrier: Option<PlayerId>,
    /// Ticks remaining before the hazard triggers on its own.
    pub fuse: u32,
    pub state: TriggerState,
    /// Ticks the triggered hazard stays visible before removal.
    pub window: u32,
    /// Accumulated throw power; scales projectile damage.
    pub power: f32,
    pub radius: f32,
    /// Children spawned by a cluster split never split again.
    pub is_fragment: bool,
    pub on_hit: Option<OnHit>,
    /// First tick at which a carried hazard may change hands.
    pub pass_ready_at: Tick,
    /// Set by the integrator when the hazard reached its target this tick.
    pub arrived: bool,
    /// Set by the integrator when the hazard touched the arena edge this tick.
    pub hit_wall: bool,
    pub trail: Trail,
}

impl Hazard {
    pub fn new(id: EntityId, payload: Payload, position: Vec2, radius: f32, fuse: u32) -> Self {
        Self {
            id,
            payload,
            position,
            velocity: Vec2::ZERO,
            owner: None,
            target: None,
            tracking: None,
            carrier: None,
            fuse,
            state: TriggerState::Armed,
            window: 0,
            power: 1.0,
            radius,
            is_fragment: false,
            on_hit: None,
            pass_ready_at: 0,
            arrived: false,
            hit_wall: false,
            trail: Trail::default(),
        }
    }

    pub fn is_armed(&self) -> bool {
        self.state == TriggerState::Armed
    }

    /// Thrown projectiles are simple payloads with an owner.
    pub fn is_projectile(&self) -> bool {
        self.payload == Payload::Simple && self.owner.is_some()
    }

    /// Transition Armed → Triggered. Returns false if already triggered or spent.
    pub fn trigger(&mut self, tick: Tick, window: u32) -> bool {
        if !self.is_armed() {
            return false;
        }
        self.state = TriggerState::Triggered { at: tick };
        self.window = window;
        self.velocity = Vec2::ZERO;
        true
    }
}

/// Static or slow-moving obstacle kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObstacleKind {
    /// Perturbs heading and reduces speed.
    Oil,
    /// Reduces speed sharply.
    Spike,
    /// Halts the player; crashes unshielded players.
    Barrier,
    /// Carries riders (logs, rafts).
    Platform,
    /// Eliminates players not riding a platform (water, chasm).
    Pit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub id: EntityId,
    pub kind: ObstacleKind,
    pub bounds: Aabb,
    pub velocity: Vec2,
    /// Players overlapping this platform at the end of the last tick.
    pub riders: Vec<PlayerId>,
}

impl Obstacle {
    pub fn new(id: EntityId, kind: ObstacleKind, bounds: Aabb) -> Self {
        Self {
            id,
            kind,
            bounds,
            velocity: Vec2::ZERO,
            riders: Vec::new(),
        }
    }
}

/// A fort built by a player; absorbs projectiles aimed at its occupant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shelter {
    pub id: EntityId,
    pub owner: PlayerId,
    pub bounds: Aabb,
    pub health: u32,
}

/// Ordered checkpoints; the last one is the finish line of each lap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub checkpoints: Vec<Aabb>,
    pub laps: u32,
}

/// Circular region for king-of-the-hill occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub center: Vec2,
    pub radius: f32,
}

impl Zone {
    pub fn contains(&self, p: Vec2) -> bool {
        (p - self.center).length_squared() <= self.radius * self.radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trail_is_bounded_and_fades() {
        let mut trail = Trail::default();
        for i in 0..10 {
            trail.push(Vec2::new(i as f32, 0.0), 4, 0.1);
        }
        assert_eq!(trail.len(), 4);
        let lives: Vec<f32> = trail.iter().map(|s| s.life).collect();
        assert!(lives.windows(2).all(|w| w[0] < w[1]), "Oldest fades most");
        assert_eq!(trail.iter().last().unwrap().position, Vec2::new(9.0, 0.0));
    }

    #[test]
    fn trail_drops_dead_samples() {
        let mut trail = Trail::default();
        for i in 0..5 {
            trail.push(Vec2::new(i as f32, 0.0), 100, 0.5);
        }
        // Samples die after two decays
        assert_eq!(trail.len(), 2);
    }

    #[test]
    fn hazard_triggers_once() {
        let mut h = Hazard::new(1, Payload::AreaOfEffect, Vec2::ZERO, 0.5, 10);
        assert!(h.trigger(5, 3));
        assert!(!h.trigger(6, 3));
        assert_eq!(h.state, TriggerState::Triggered { at: 5 });
    }
}
