//! Narrow-phase collision detection and per-category resolution.
//!
//! Evaluation order inside a tick is fixed: timeout triggers, then
//! Player–Hazard, Player–PowerUp, Player–Obstacle, Projectile–Player and
//! Projectile–Wall, then removal of hazards whose post-trigger window ended.
//! References to entities removed earlier in the same tick resolve to no-ops.

use std::collections::BTreeMap;
use std::f32::consts::TAU;

use rand::Rng;
use smallvec::SmallVec;

use crate::clock::Tick;
use crate::config::{Boundary, SimConfig};
use crate::effects::{EffectKind, Grant, effective_stats};
use crate::entity::{Hazard, ObstacleKind, Payload, PlayerState, TriggerState};
use crate::events::{EliminationCause, SimEvent};
use crate::game_trait::PlayerId;
use crate::geom::{Vec2, circles_overlap};
use crate::snapshot::Snapshot;

type Ids = SmallVec<[PlayerId; 8]>;

/// Outcome of applying damage to one player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hit {
    /// Target missing or already eliminated.
    Ignored,
    /// Absorbed by a shield or invulnerability.
    Blocked,
    Damaged,
    Eliminated,
}

pub struct CollisionResolver<'a> {
    config: &'a SimConfig,
    tick: Tick,
    events: &'a mut Vec<SimEvent>,
    grants: &'a mut Vec<(PlayerId, Grant)>,
}

impl<'a> CollisionResolver<'a> {
    pub fn new(
        config: &'a SimConfig,
        tick: Tick,
        events: &'a mut Vec<SimEvent>,
        grants: &'a mut Vec<(PlayerId, Grant)>,
    ) -> Self {
        Self {
            config,
            tick,
            events,
            grants,
        }
    }

    /// Resolve every collision category in order. `prev_positions` holds
    /// player positions before this tick's integration (barrier halts).
    pub fn run(
        &mut self,
        snapshot: &mut Snapshot,
        prev_positions: &BTreeMap<PlayerId, Vec2>,
        rng: &mut impl Rng,
    ) {
        self.trigger_timeouts(snapshot);
        self.player_hazard(snapshot);
        self.player_powerup(snapshot);
        self.player_obstacle(snapshot, prev_positions, rng);
        self.projectile_player(snapshot);
        self.projectile_wall(snapshot);
        self.cleanup(snapshot);
    }

    // ------------------------------------------------------------------
    // Triggers
    // ------------------------------------------------------------------

    /// Armed hazards whose fuse ran out or that reached their target.
    pub fn trigger_timeouts(&mut self, snapshot: &mut Snapshot) {
        let mut children = Vec::new();
        for idx in 0..snapshot.hazards.len() {
            let h = &snapshot.hazards[idx];
            if !h.is_armed() || !(h.fuse == 0 || h.arrived) {
                continue;
            }
            if h.payload == Payload::Simple {
                self.fizzle(&mut snapshot.hazards[idx]);
            } else {
                self.detonate(snapshot, idx, &mut children);
            }
        }
        snapshot.hazards.extend(children);
    }

    /// Trigger hazard `idx`: one evaluation of area damage around it (or its
    /// carrier) and, for first-generation cluster bombs, child spawns.
    pub fn detonate(&mut self, snapshot: &mut Snapshot, idx: usize, children: &mut Vec<Hazard>) {
        let Some(h) = snapshot.hazards.get(idx) else {
            return;
        };
        let (hazard_id, payload, owner, is_fragment) = (h.id, h.payload, h.owner, h.is_fragment);
        let center = h
            .carrier
            .and_then(|c| snapshot.players.get(&c))
            .map_or(h.position, |p| p.position);
        let config = self.config;
        let spec = config.hazards.get(payload);
        let window = config.ticks(spec.window_ms);

        let h = &mut snapshot.hazards[idx];
        if !h.trigger(self.tick, window) {
            return;
        }
        h.position = center;
        tracing::trace!(hazard_id, tick = self.tick, ?payload, "Hazard triggered");
        self.events.push(SimEvent::HazardTriggered {
            hazard_id,
            position: center,
        });

        if payload.is_explosive() && spec.effect_radius > 0.0 {
            let victims: Ids = snapshot
                .players
                .values()
                .filter(|p| p.alive && p.position.distance(center) <= spec.effect_radius)
                .map(|p| p.id)
                .collect();
            for victim in victims {
                self.hurt(
                    &mut snapshot.players,
                    victim,
                    spec.damage,
                    owner,
                    EliminationCause::Blast,
                );
            }
        }

        if payload == Payload::Cluster && !is_fragment && spec.children > 0 {
            let fuse = config.ticks(spec.child_fuse_ms).max(1);
            for i in 0..spec.children {
                let angle = TAU * i as f32 / spec.children as f32;
                let position = snapshot.arena.clamp(
                    center + Vec2::from_angle(angle) * spec.child_distance,
                    spec.radius,
                );
                let id = snapshot.allocate_id();
                let mut child = Hazard::new(id, Payload::Cluster, position, spec.radius, fuse);
                child.owner = owner;
                child.is_fragment = true;
                self.events.push(SimEvent::HazardSpawned {
                    hazard_id: id,
                    payload: Payload::Cluster,
                    owner,
                });
                children.push(child);
            }
        }
    }

    /// Retire a hazard without any area effect.
    fn fizzle(&mut self, hazard: &mut Hazard) {
        if hazard.trigger(self.tick, 0) {
            self.events.push(SimEvent::HazardFizzled {
                hazard_id: hazard.id,
            });
        }
    }

    // ------------------------------------------------------------------
    // Damage
    // ------------------------------------------------------------------

    /// Apply area or projectile damage. Shielded players are unaffected.
    /// Eliminations are credited to `source` unless it is the victim.
    pub fn hurt(
        &mut self,
        players: &mut BTreeMap<PlayerId, PlayerState>,
        victim: PlayerId,
        amount: u32,
        source: Option<PlayerId>,
        cause: EliminationCause,
    ) -> Hit {
        let Some(p) = players.get_mut(&victim).filter(|p| p.alive) else {
            return Hit::Ignored;
        };
        if effective_stats(&p.effects, self.tick).damage_immune {
            self.events.push(SimEvent::DamageBlocked { player_id: victim });
            return Hit::Blocked;
        }
        p.health = p.health.saturating_sub(amount);
        self.events.push(SimEvent::Damaged {
            player_id: victim,
            amount,
            remaining: p.health,
            source,
        });
        if p.health > 0 {
            return Hit::Damaged;
        }
        p.alive = false;
        p.eliminated_at = Some(self.tick);
        p.velocity = Vec2::ZERO;
        self.events.push(SimEvent::Eliminated {
            player_id: victim,
            by: source,
            cause,
        });

        if let Some(killer_id) = source.filter(|&k| k != victim)
            && let Some(killer) = players.get_mut(&killer_id)
        {
            killer.kills += 1;
            killer.score += self.config.scoring.kill_points;
            self.events.push(SimEvent::ScoreUpdate {
                player_id: killer_id,
                score: killer.score,
            });
        }
        Hit::Eliminated
    }

    /// Falling elimination ignores shields.
    fn fall(&mut self, player: &mut PlayerState) {
        player.health = 0;
        player.alive = false;
        player.eliminated_at = Some(self.tick);
        player.velocity = Vec2::ZERO;
        self.events.push(SimEvent::Eliminated {
            player_id: player.id,
            by: None,
            cause: EliminationCause::Fell,
        });
    }

    // ------------------------------------------------------------------
    // Player–Hazard
    // ------------------------------------------------------------------

    /// Contact rules: sticky hazards attach or change hands, homing hazards
    /// detonate on the first player they touch.
    pub fn player_hazard(&mut self, snapshot: &mut Snapshot) {
        let mut children = Vec::new();
        for idx in 0..snapshot.hazards.len() {
            let h = &snapshot.hazards[idx];
            if !h.is_armed() {
                continue;
            }
            match h.payload {
                Payload::Sticky => self.sticky_contact(snapshot, idx),
                Payload::Homing => {
                    let touched = snapshot.players.values().any(|p| {
                        p.alive && circles_overlap(p.position, p.radius, h.position, h.radius)
                    });
                    if touched {
                        self.detonate(snapshot, idx, &mut children);
                    }
                },
                Payload::Simple | Payload::AreaOfEffect | Payload::Cluster => {},
            }
        }
        snapshot.hazards.extend(children);
    }

    fn sticky_contact(&mut self, snapshot: &mut Snapshot, idx: usize) {
        let max_carried = self.config.actions.max_carried;
        let pass_ready_at =
            self.tick + Tick::from(self.config.ticks(self.config.actions.pass_cooldown_ms));
        let h = &snapshot.hazards[idx];
        let hazard_id = h.id;

        match h.carrier {
            None => {
                let taker = snapshot
                    .players
                    .values()
                    .find(|p| {
                        p.alive
                            && circles_overlap(p.position, p.radius, h.position, h.radius)
                            && snapshot.carried_by(p.id) < max_carried
                    })
                    .map(|p| p.id);
                if let Some(player_id) = taker {
                    let h = &mut snapshot.hazards[idx];
                    h.carrier = Some(player_id);
                    h.pass_ready_at = pass_ready_at;
                    self.events.push(SimEvent::HazardAttached {
                        hazard_id,
                        player_id,
                    });
                }
            },
            Some(from) => {
                if self.tick < h.pass_ready_at {
                    return;
                }
                let Some(carrier) = snapshot.players.get(&from) else {
                    return;
                };
                let receiver = snapshot
                    .players
                    .values()
                    .find(|p| {
                        p.alive
                            && p.id != from
                            && circles_overlap(
                                p.position,
                                p.radius,
                                carrier.position,
                                carrier.radius,
                            )
                            && snapshot.carried_by(p.id) < max_carried
                    })
                    .map(|p| (p.id, p.position));
                if let Some((to, position)) = receiver {
                    let h = &mut snapshot.hazards[idx];
                    h.carrier = Some(to);
                    h.position = position;
                    h.pass_ready_at = pass_ready_at;
                    self.events.push(SimEvent::HazardPassed {
                        hazard_id,
                        from,
                        to,
                    });
                }
            },
        }
    }

    // ------------------------------------------------------------------
    // Player–PowerUp
    // ------------------------------------------------------------------

    /// Each power-up goes to the lowest-id overlapping player.
    pub fn player_powerup(&mut self, snapshot: &mut Snapshot) {
        if snapshot.powerups.is_empty() {
            return;
        }
        let table = self.config.powerup_grants();
        let points = self.config.scoring.pickup_points;
        let mut collected: SmallVec<[usize; 4]> = SmallVec::new();

        for p in snapshot.players.values_mut().filter(|p| p.alive) {
            for (i, pu) in snapshot.powerups.iter().enumerate() {
                if collected.contains(&i)
                    || !circles_overlap(p.position, p.radius, pu.position, pu.radius)
                {
                    continue;
                }
                collected.push(i);
                self.grants.push((p.id, table.grant(pu.kind)));
                self.events.push(SimEvent::PowerUpCollected {
                    player_id: p.id,
                    kind: pu.kind,
                });
                if points != 0 {
                    p.score += points;
                    self.events.push(SimEvent::ScoreUpdate {
                        player_id: p.id,
                        score: p.score,
                    });
                }
            }
        }

        let mut i = 0;
        snapshot.powerups.retain(|_| {
            let keep = !collected.contains(&i);
            i += 1;
            keep
        });
    }

    // ------------------------------------------------------------------
    // Player–Obstacle
    // ------------------------------------------------------------------

    /// Platforms, pits, oil, spikes, barriers, checkpoints, the finish
    /// region and the hill zone.
    pub fn player_obstacle(
        &mut self,
        snapshot: &mut Snapshot,
        prev_positions: &BTreeMap<PlayerId, Vec2>,
        rng: &mut impl Rng,
    ) {
        let tick = self.tick;
        let config = self.config;
        let obstacle_cfg = &config.obstacles;
        let scoring = &config.scoring;

        // Riders are derived from overlap every tick, never persisted
        for o in snapshot.obstacles.iter_mut() {
            if o.kind != ObstacleKind::Platform {
                continue;
            }
            o.riders = snapshot
                .players
                .values()
                .filter(|p| p.alive && o.bounds.contains(p.position))
                .map(|p| p.id)
                .collect();
        }

        for p in snapshot.players.values_mut() {
            p.riding = snapshot
                .obstacles
                .iter()
                .find(|o| o.kind == ObstacleKind::Platform && o.riders.contains(&p.id))
                .map(|o| o.id);
            if !p.alive {
                continue;
            }

            let stats = effective_stats(&p.effects, tick);
            let mut fell = false;
            for o in &snapshot.obstacles {
                match o.kind {
                    ObstacleKind::Platform => {},
                    ObstacleKind::Pit => {
                        fell |= p.riding.is_none() && o.bounds.contains(p.position);
                    },
                    ObstacleKind::Oil if o.bounds.overlaps_circle(p.position, p.radius) => {
                        if !p.effects.is_active(EffectKind::Slow, tick) {
                            let spin = obstacle_cfg.oil_spin.abs();
                            p.heading += rng.random_range(-spin..=spin);
                        }
                        self.grants.push((
                            p.id,
                            Grant::Effect {
                                kind: EffectKind::Slow,
                                magnitude: obstacle_cfg.oil_slow,
                                duration_ticks: config.ticks(obstacle_cfg.oil_ms),
                            },
                        ));
                    },
                    ObstacleKind::Spike if o.bounds.overlaps_circle(p.position, p.radius) => {
                        self.grants.push((
                            p.id,
                            Grant::Effect {
                                kind: EffectKind::Slow,
                                magnitude: obstacle_cfg.spike_slow,
                                duration_ticks: config.ticks(obstacle_cfg.spike_ms),
                            },
                        ));
                    },
                    ObstacleKind::Barrier if o.bounds.overlaps_circle(p.position, p.radius) => {
                        if let Some(&prev) = prev_positions.get(&p.id) {
                            p.position = prev;
                        }
                        p.velocity = Vec2::ZERO;
                        if !stats.crash_immune && !p.effects.is_active(EffectKind::Crashed, tick) {
                            self.grants.push((
                                p.id,
                                Grant::Effect {
                                    kind: EffectKind::Crashed,
                                    magnitude: 0.0,
                                    duration_ticks: config.ticks(obstacle_cfg.crash_ms),
                                },
                            ));
                            self.events.push(SimEvent::Crashed { player_id: p.id });
                        }
                    },
                    ObstacleKind::Oil | ObstacleKind::Spike | ObstacleKind::Barrier => {},
                }
            }
            if fell {
                self.fall(p);
                continue;
            }

            if let Some(track) = &snapshot.track
                && p.progress.finished_at.is_none()
                && !track.checkpoints.is_empty()
            {
                let count = track.checkpoints.len();
                let index = p.progress.next_checkpoint % count;
                // Only the next checkpoint in order counts; re-entering a
                // passed one is a no-op
                if track.checkpoints[index].contains(p.position) {
                    p.progress.checkpoints_passed += 1;
                    p.progress.next_checkpoint = index + 1;
                    p.score += scoring.checkpoint_points;
                    self.events.push(SimEvent::CheckpointPassed {
                        player_id: p.id,
                        index,
                    });
                    if p.progress.next_checkpoint == count {
                        p.progress.next_checkpoint = 0;
                        p.progress.lap += 1;
                        p.score += scoring.lap_points;
                        self.events.push(SimEvent::LapCompleted {
                            player_id: p.id,
                            lap: p.progress.lap,
                        });
                        if p.progress.lap >= track.laps {
                            p.progress.finished_at = Some(tick);
                        }
                    }
                    if scoring.checkpoint_points != 0 || scoring.lap_points != 0 {
                        self.events.push(SimEvent::ScoreUpdate {
                            player_id: p.id,
                            score: p.score,
                        });
                    }
                }
            }

            if let Some(finish) = snapshot.finish
                && p.progress.finished_at.is_none()
                && finish.contains(p.position)
            {
                p.progress.finished_at = Some(tick);
            }
        }

        if let Some(hill) = snapshot.hill {
            let occupants: Ids = snapshot
                .players
                .values()
                .filter(|p| p.alive && hill.contains(p.position))
                .map(|p| p.id)
                .collect();
            let sole = match occupants.as_slice() {
                [id] => Some(*id),
                _ => None,
            };
            for p in snapshot.players.values_mut() {
                if Some(p.id) == sole {
                    p.hold_ticks += 1;
                    p.hold_streak += 1;
                } else {
                    p.hold_streak = 0;
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Projectiles
    // ------------------------------------------------------------------

    /// Thrown projectiles hit the first overlapping player other than the
    /// thrower. A shelter the target stands in absorbs the hit if it also
    /// contains the impact point, whoever built it.
    pub fn projectile_player(&mut self, snapshot: &mut Snapshot) {
        let config = self.config;
        let spec = &config.hazards.simple;
        for idx in 0..snapshot.hazards.len() {
            let h = &snapshot.hazards[idx];
            if !h.is_armed() || !h.is_projectile() {
                continue;
            }
            let (owner, impact, power, direction, on_hit) =
                (h.owner, h.position, h.power, h.velocity.normalized(), h.on_hit);
            let Some((target, standing)) = snapshot
                .players
                .values()
                .find(|p| {
                    p.alive
                        && Some(p.id) != owner
                        && circles_overlap(p.position, p.radius, impact, h.radius)
                })
                .map(|p| (p.id, p.position))
            else {
                continue;
            };

            snapshot.hazards[idx].trigger(self.tick, 0);
            let damage = (spec.damage as f32 * power).round().max(1.0) as u32;

            if let Some(si) = snapshot
                .shelters
                .iter()
                .position(|s| s.bounds.contains(standing) && s.bounds.contains(impact))
            {
                let shelter = &mut snapshot.shelters[si];
                shelter.health = shelter.health.saturating_sub(damage);
                let shelter_id = shelter.id;
                self.events.push(SimEvent::ShelterDamaged {
                    shelter_id,
                    remaining: shelter.health,
                });
                if shelter.health == 0 {
                    snapshot.shelters.remove(si);
                    self.events.push(SimEvent::ShelterDestroyed { shelter_id });
                }
                continue;
            }

            let hit = self.hurt(
                &mut snapshot.players,
                target,
                damage,
                owner,
                EliminationCause::Projectile,
            );
            if hit != Hit::Damaged {
                continue;
            }
            if let Some(p) = snapshot.players.get_mut(&target) {
                if !effective_stats(&p.effects, self.tick).anchored {
                    p.knockback += direction * (config.knockback * power);
                }
                if let Some(on_hit) = on_hit {
                    self.grants.push((
                        target,
                        Grant::Effect {
                            kind: on_hit.kind,
                            magnitude: on_hit.magnitude,
                            duration_ticks: on_hit.duration_ticks,
                        },
                    ));
                }
            }
        }
    }

    /// Hazards with the `Remove` boundary policy that touched the edge.
    /// Bounce and clamp policies were already applied by the integrator.
    pub fn projectile_wall(&mut self, snapshot: &mut Snapshot) {
        for h in snapshot.hazards.iter_mut() {
            if h.is_armed()
                && h.hit_wall
                && self.config.hazards.get(h.payload).boundary == Boundary::Remove
            {
                self.fizzle(h);
            }
        }
    }

    /// Retire triggered hazards whose window elapsed and drop spent ones.
    pub fn cleanup(&mut self, snapshot: &mut Snapshot) {
        let tick = self.tick;
        for h in snapshot.hazards.iter_mut() {
            if let TriggerState::Triggered { at } = h.state
                && tick >= at + Tick::from(h.window)
            {
                h.state = TriggerState::Spent;
            }
        }
        snapshot.hazards.retain(|h| h.state != TriggerState::Spent);
    }
}
