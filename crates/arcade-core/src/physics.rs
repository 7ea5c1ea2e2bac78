//! Motion integration for players, hazards and moving obstacles.
//!
//! Boundary handling is always the final step for each entity, after the
//! finiteness check, so nothing leaves the arena or publishes a NaN.

use std::collections::BTreeMap;
use std::f32::consts::{PI, TAU};

use crate::clock::Tick;
use crate::config::{Boundary, HazardSpec, MovementConfig, MovementModel, SimConfig};
use crate::effects::effective_stats;
use crate::entity::{EntityId, Hazard, Obstacle, PlayerState};
use crate::game_trait::PlayerId;
use crate::geom::{Arena, Vec2};
use crate::intent::Intent;
use crate::snapshot::Snapshot;

/// Knockback below this length is dropped.
const KNOCKBACK_EPSILON: f32 = 0.01;

pub struct PhysicsIntegrator;

impl PhysicsIntegrator {
    /// Advance every mobile entity by one tick: platforms first (so riders
    /// can be carried), then players, then hazards (which may follow players).
    pub fn run(snapshot: &mut Snapshot, config: &SimConfig) {
        let tick = snapshot.tick;
        let arena = snapshot.arena;
        let carry = move_obstacles(&mut snapshot.obstacles, arena);

        for player in snapshot.players.values_mut() {
            let platform_delta = player
                .riding
                .and_then(|id| carry.get(&id).copied())
                .unwrap_or(Vec2::ZERO);
            integrate_player(player, &config.movement, arena, tick, platform_delta);
            if player.alive {
                player
                    .trail
                    .push(player.position, config.trail_length, config.trail_decay);
            }
        }

        for hazard in &mut snapshot.hazards {
            let spec = config.hazards.get(hazard.payload);
            integrate_hazard(hazard, spec, &snapshot.players, arena);
            if hazard.is_armed() {
                hazard
                    .trail
                    .push(hazard.position, config.trail_length, config.trail_decay);
            }
        }
    }

    /// Countdown motion: platforms carry their riders and hazards follow
    /// their paths. Fuses hold and no hazard is flagged for triggering.
    pub fn run_cosmetic(snapshot: &mut Snapshot, config: &SimConfig) {
        let arena = snapshot.arena;
        let carry = move_obstacles(&mut snapshot.obstacles, arena);

        for player in snapshot.players.values_mut().filter(|p| p.alive) {
            if let Some(delta) = player.riding.and_then(|id| carry.get(&id).copied()) {
                player.position = arena.clamp(player.position + delta, player.radius);
            }
        }

        for hazard in &mut snapshot.hazards {
            let fuse = hazard.fuse;
            let spec = config.hazards.get(hazard.payload);
            integrate_hazard(hazard, spec, &snapshot.players, arena);
            hazard.fuse = fuse;
            hazard.arrived = false;
            hazard.hit_wall = false;
        }
    }
}

/// Move platforms (and any other obstacle with a velocity), wrapping at the
/// arena edges. Returns each mover's displacement for carrying riders.
pub fn move_obstacles(obstacles: &mut [Obstacle], arena: Arena) -> BTreeMap<EntityId, Vec2> {
    let mut carry = BTreeMap::new();
    for o in obstacles.iter_mut() {
        if o.velocity == Vec2::ZERO {
            continue;
        }
        o.bounds = o.bounds.translated(o.velocity);
        let size = o.bounds.max - o.bounds.min;
        let mut wrap = Vec2::ZERO;
        if o.bounds.min.x >= arena.width {
            wrap.x = -(arena.width + size.x);
        } else if o.bounds.max.x <= 0.0 {
            wrap.x = arena.width + size.x;
        }
        if o.bounds.min.y >= arena.height {
            wrap.y = -(arena.height + size.y);
        } else if o.bounds.max.y <= 0.0 {
            wrap.y = arena.height + size.y;
        }
        o.bounds = o.bounds.translated(wrap);
        carry.insert(o.id, o.velocity);
    }
    carry
}

/// Advance one player from its latched intent and effect-modified speed.
pub fn integrate_player(
    player: &mut PlayerState,
    movement: &MovementConfig,
    arena: Arena,
    tick: Tick,
    platform_delta: Vec2,
) {
    if !player.alive {
        return;
    }
    let prev = player.position;
    let stats = effective_stats(&player.effects, tick);
    let intent = if stats.accepts_input {
        player.intent
    } else {
        Intent::default()
    };
    let top_speed = movement.base_speed * stats.speed_multiplier;

    match movement.model {
        MovementModel::Direct => {
            let dir = intent.direction();
            player.velocity = dir * top_speed;
            if dir != Vec2::ZERO {
                player.heading = dir.angle();
            }
        },
        MovementModel::Vehicle => {
            player.heading = wrap_angle(player.heading + intent.steer() * movement.turn_rate);
            let forward = Vec2::from_angle(player.heading);
            let mut speed = player.velocity.dot(forward);
            if intent.up {
                speed += movement.acceleration;
            }
            if intent.down {
                speed -= movement.acceleration;
            }
            speed *= movement.friction;
            speed = speed.clamp(-top_speed * movement.reverse_fraction, top_speed);
            player.velocity = forward * speed;
        },
    }

    player.position += player.velocity + player.knockback + platform_delta;
    player.knockback = player.knockback * movement.knockback_decay;
    if player.knockback.length() < KNOCKBACK_EPSILON {
        player.knockback = Vec2::ZERO;
    }

    if !player.position.is_finite() || !player.heading.is_finite() {
        tracing::debug!(player_id = player.id, "Restored non-finite player position");
        player.position = prev;
        player.velocity = Vec2::ZERO;
        player.knockback = Vec2::ZERO;
        player.heading = 0.0;
    }
    player.position = arena.clamp(player.position, player.radius);
}

/// Advance one armed hazard: carried, lobbed at a target, homing, or free.
pub fn integrate_hazard(
    hazard: &mut Hazard,
    spec: &HazardSpec,
    players: &BTreeMap<PlayerId, PlayerState>,
    arena: Arena,
) {
    hazard.arrived = false;
    hazard.hit_wall = false;
    if !hazard.is_armed() {
        return;
    }
    hazard.fuse = hazard.fuse.saturating_sub(1);
    let prev = hazard.position;

    if let Some(carrier) = hazard.carrier {
        match players.get(&carrier).filter(|p| p.alive) {
            Some(p) => {
                hazard.position = p.position;
                hazard.velocity = Vec2::ZERO;
            },
            // Dropped where the carrier fell
            None => hazard.carrier = None,
        }
    } else if let Some(target) = hazard.target {
        let speed =
            (hazard.velocity.length() + spec.acceleration).min(spec.max_speed.max(spec.speed));
        let to_target = target - hazard.position;
        if to_target.length() <= speed {
            hazard.position = target;
            hazard.velocity = Vec2::ZERO;
            hazard.arrived = true;
        } else {
            hazard.velocity = to_target.normalized() * speed;
            hazard.position += hazard.velocity;
        }
    } else if let Some(tracked) = hazard.tracking {
        let speed =
            (hazard.velocity.length() + spec.acceleration).min(spec.max_speed.max(spec.speed));
        let mut heading = hazard.velocity.angle();
        if let Some(p) = players.get(&tracked).filter(|p| p.alive) {
            let desired = (p.position - hazard.position).angle();
            let turn = wrap_angle(desired - heading).clamp(-spec.turn_rate, spec.turn_rate);
            heading += turn;
        }
        hazard.velocity = Vec2::from_angle(heading) * speed;
        hazard.position += hazard.velocity;
    } else {
        hazard.velocity.y += spec.gravity;
        hazard.velocity = hazard.velocity * spec.friction;
        hazard.position += hazard.velocity;
    }

    if !hazard.position.is_finite() || !hazard.velocity.is_finite() {
        tracing::debug!(hazard_id = hazard.id, "Restored non-finite hazard position");
        hazard.position = prev;
        hazard.velocity = Vec2::ZERO;
    }
    apply_boundary(hazard, spec.boundary, arena);
}

/// Keep the hazard inside the arena according to its boundary policy.
/// Flags `hit_wall` so the resolver can remove `Remove`-policy hazards.
pub fn apply_boundary(hazard: &mut Hazard, boundary: Boundary, arena: Arena) {
    let clamped = arena.clamp(hazard.position, hazard.radius);
    if clamped == hazard.position {
        return;
    }
    hazard.hit_wall = true;
    match boundary {
        Boundary::Clamp => hazard.velocity = Vec2::ZERO,
        Boundary::Reflect { damping } => {
            if clamped.x != hazard.position.x {
                hazard.velocity.x = -hazard.velocity.x * damping;
            }
            if clamped.y != hazard.position.y {
                hazard.velocity.y = -hazard.velocity.y * damping;
            }
        },
        Boundary::Remove => {},
    }
    hazard.position = clamped;
}

/// Normalize an angle into `[-PI, PI)`.
pub fn wrap_angle(angle: f32) -> f32 {
    (angle + PI).rem_euclid(TAU) - PI
}
