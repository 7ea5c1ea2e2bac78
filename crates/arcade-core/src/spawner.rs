//! Periodic work driven by tick-counted timers on the snapshot: power-up
//! spawns and lifetimes, environmental hazards, survival points.

use rand::Rng;

use crate::clock::Tick;
use crate::config::{HazardSpawn, SimConfig};
use crate::entity::{Hazard, ObstacleKind, Payload};
use crate::events::SimEvent;
use crate::game_trait::PlayerId;
use crate::geom::{Arena, Vec2};
use crate::powerup::PowerUp;
use crate::snapshot::Snapshot;

/// Placement attempts before a spawn is skipped for this interval.
const PLACEMENT_ATTEMPTS: usize = 8;

pub struct Spawner;

impl Spawner {
    /// Load every timer with a full interval. Called on entering `Active`.
    pub fn arm(snapshot: &mut Snapshot, config: &SimConfig) {
        snapshot.timers.powerup = config.ticks(config.spawns.powerup_interval_ms);
        snapshot.timers.hazard = config.ticks(config.spawns.hazard_interval_ms);
        snapshot.timers.survival = config.ticks(config.scoring.survival_interval_ms);
    }

    pub fn run(
        snapshot: &mut Snapshot,
        config: &SimConfig,
        rng: &mut impl Rng,
        events: &mut Vec<SimEvent>,
    ) {
        age_powerups(snapshot);

        let powerup_interval = config.ticks(config.spawns.powerup_interval_ms);
        if due(&mut snapshot.timers.powerup, powerup_interval) {
            spawn_powerup(snapshot, config, rng, events);
        }

        let hazard_interval = config.ticks(config.spawns.hazard_interval_ms);
        if due(&mut snapshot.timers.hazard, hazard_interval) {
            spawn_hazard(snapshot, config, rng, events);
        }

        let survival_interval = config.ticks(config.scoring.survival_interval_ms);
        if due(&mut snapshot.timers.survival, survival_interval) {
            for p in snapshot.players.values_mut().filter(|p| p.alive) {
                p.score += config.scoring.survival_points;
                events.push(SimEvent::ScoreUpdate {
                    player_id: p.id,
                    score: p.score,
                });
            }
        }
    }
}

/// Count a timer down. Fires and reloads once it reaches one; an interval
/// of zero never fires.
fn due(timer: &mut u32, interval: u32) -> bool {
    if interval == 0 {
        return false;
    }
    if *timer > 1 {
        *timer -= 1;
        false
    } else {
        *timer = interval;
        true
    }
}

fn age_powerups(snapshot: &mut Snapshot) {
    for pu in &mut snapshot.powerups {
        pu.remaining = pu.remaining.saturating_sub(1);
    }
    snapshot.powerups.retain(|pu| pu.remaining > 0);
}

fn random_point(arena: Arena, margin: f32, rng: &mut impl Rng) -> Vec2 {
    let margin_x = margin.min(arena.width / 2.0);
    let margin_y = margin.min(arena.height / 2.0);
    let x = if arena.width - margin_x > margin_x {
        rng.random_range(margin_x..arena.width - margin_x)
    } else {
        arena.width / 2.0
    };
    let y = if arena.height - margin_y > margin_y {
        rng.random_range(margin_y..arena.height - margin_y)
    } else {
        arena.height / 2.0
    };
    Vec2::new(x, y)
}

/// A point not inside a barrier or pit, if one turns up quickly.
fn open_point(snapshot: &Snapshot, margin: f32, rng: &mut impl Rng) -> Option<Vec2> {
    (0..PLACEMENT_ATTEMPTS)
        .map(|_| random_point(snapshot.arena, margin, rng))
        .find(|&p| {
            !snapshot.obstacles.iter().any(|o| {
                matches!(o.kind, ObstacleKind::Barrier | ObstacleKind::Pit) && o.bounds.contains(p)
            })
        })
}

fn random_survivor(snapshot: &Snapshot, rng: &mut impl Rng) -> Option<PlayerId> {
    let alive: Vec<PlayerId> = snapshot
        .players
        .values()
        .filter(|p| p.alive)
        .map(|p| p.id)
        .collect();
    if alive.is_empty() {
        return None;
    }
    Some(alive[rng.random_range(0..alive.len())])
}

fn spawn_powerup(
    snapshot: &mut Snapshot,
    config: &SimConfig,
    rng: &mut impl Rng,
    events: &mut Vec<SimEvent>,
) {
    let spawns = &config.spawns;
    if spawns.powerup_kinds.is_empty() || snapshot.powerups.len() >= spawns.max_powerups {
        return;
    }
    let kind = spawns.powerup_kinds[rng.random_range(0..spawns.powerup_kinds.len())];
    let Some(position) = open_point(snapshot, spawns.margin, rng) else {
        tracing::trace!(tick = snapshot.tick, "No open spot for power-up");
        return;
    };
    let id = snapshot.allocate_id();
    snapshot.powerups.push(PowerUp {
        id,
        position,
        kind,
        radius: config.powerups.radius,
        remaining: config.ticks(spawns.powerup_lifetime_ms).max(1),
    });
    events.push(SimEvent::PowerUpSpawned {
        powerup_id: id,
        kind,
    });
}

fn spawn_hazard(
    snapshot: &mut Snapshot,
    config: &SimConfig,
    rng: &mut impl Rng,
    events: &mut Vec<SimEvent>,
) {
    if snapshot.hazards.len() >= config.spawns.max_hazards {
        return;
    }
    match config.spawns.hazard_mode {
        HazardSpawn::None => {},
        HazardSpawn::EdgeHoming => {
            let Some(target) = random_survivor(snapshot, rng) else {
                return;
            };
            let spec = &config.hazards.homing;
            let arena = snapshot.arena;
            let along_x = rng.random_range(0.0..arena.width.max(f32::EPSILON));
            let along_y = rng.random_range(0.0..arena.height.max(f32::EPSILON));
            let position = match rng.random_range(0..4u8) {
                0 => Vec2::new(along_x, spec.radius),
                1 => Vec2::new(along_x, arena.height - spec.radius),
                2 => Vec2::new(spec.radius, along_y),
                _ => Vec2::new(arena.width - spec.radius, along_y),
            };
            let aim = snapshot
                .players
                .get(&target)
                .map_or(arena.center(), |p| p.position);
            let id = snapshot.allocate_id();
            let mut h = Hazard::new(
                id,
                Payload::Homing,
                position,
                spec.radius,
                config.ticks(spec.fuse_ms).max(1),
            );
            h.tracking = Some(target);
            h.velocity = (aim - position).normalized() * spec.speed;
            push_hazard(snapshot, h, events);
        },
        HazardSpawn::RandomDrop => {
            let spec = &config.hazards.area_of_effect;
            let Some(position) = open_point(snapshot, config.spawns.margin, rng) else {
                return;
            };
            let id = snapshot.allocate_id();
            let h = Hazard::new(
                id,
                Payload::AreaOfEffect,
                position,
                spec.radius,
                config.ticks(spec.fuse_ms).max(1),
            );
            push_hazard(snapshot, h, events);
        },
        HazardSpawn::AttachRandom => {
            let armed_sticky = snapshot
                .hazards
                .iter()
                .any(|h| h.payload == Payload::Sticky && h.is_armed());
            if armed_sticky {
                return;
            }
            let Some(carrier) = random_survivor(snapshot, rng) else {
                return;
            };
            if snapshot.carried_by(carrier) >= config.actions.max_carried {
                return;
            }
            let spec = &config.hazards.sticky;
            let position = snapshot
                .players
                .get(&carrier)
                .map_or(snapshot.arena.center(), |p| p.position);
            let id = snapshot.allocate_id();
            let mut h = Hazard::new(
                id,
                Payload::Sticky,
                position,
                spec.radius,
                config.ticks(spec.fuse_ms).max(1),
            );
            h.carrier = Some(carrier);
            h.pass_ready_at =
                snapshot.tick + Tick::from(config.ticks(config.actions.pass_cooldown_ms));
            push_hazard(snapshot, h, events);
            events.push(SimEvent::HazardAttached {
                hazard_id: id,
                player_id: carrier,
            });
        },
    }
}

fn push_hazard(snapshot: &mut Snapshot, hazard: Hazard, events: &mut Vec<SimEvent>) {
    events.push(SimEvent::HazardSpawned {
        hazard_id: hazard.id,
        payload: hazard.payload,
        owner: None,
    });
    snapshot.hazards.push(hazard);
}
