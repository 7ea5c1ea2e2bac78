//! Action triggers: throws, specials and building.
//!
//! Runs right after intents are latched and before integration, so a
//! projectile spawned this tick moves on this tick.

use smallvec::SmallVec;

use crate::clock::Tick;
use crate::config::{SimConfig, Special, ThrowStyle};
use crate::effects::{EffectKind, Grant, ResourceKind, effective_stats};
use crate::entity::{Hazard, OnHit, Payload, Shelter};
use crate::events::SimEvent;
use crate::game_trait::PlayerId;
use crate::geom::{Aabb, Vec2};
use crate::snapshot::Snapshot;

/// Something a player launched this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Throw {
    /// Lobbed at a point `throw_distance` ahead.
    Lob { payload: Payload },
    /// Free-flying projectile.
    Projectile { power: f32, on_hit: Option<OnHit> },
}

pub struct ActionResolver;

impl ActionResolver {
    pub fn run(
        snapshot: &mut Snapshot,
        config: &SimConfig,
        events: &mut Vec<SimEvent>,
        grants: &mut Vec<(PlayerId, Grant)>,
    ) {
        let tick = snapshot.tick;
        let actions = &config.actions;
        let ids: SmallVec<[PlayerId; 8]> = snapshot.players.keys().copied().collect();

        for id in ids {
            let has_shelter = snapshot.shelter_of(id).is_some();
            let Some(p) = snapshot.players.get_mut(&id).filter(|p| p.alive) else {
                continue;
            };
            if !effective_stats(&p.effects, tick).accepts_input {
                continue;
            }
            let intent = p.intent;
            let ready = tick >= p.attack_ready_at;
            let mut throws: SmallVec<[Throw; 2]> = SmallVec::new();

            match actions.throw {
                ThrowStyle::Instant if intent.attack && ready => {
                    let payload = if p.effects.take_resource(ResourceKind::ClusterBomb) {
                        events.push(SimEvent::ResourceChanged {
                            player_id: id,
                            kind: ResourceKind::ClusterBomb,
                            count: p.effects.resource(ResourceKind::ClusterBomb),
                        });
                        Payload::Cluster
                    } else {
                        actions.throw_payload
                    };
                    throws.push(Throw::Lob { payload });
                },
                ThrowStyle::Charged => {
                    let max_charge = config.ticks(actions.max_charge_ms).max(1);
                    if intent.attack {
                        p.charge = (p.charge + 1).min(max_charge);
                    } else if p.charge > 0 {
                        let frac = p.charge as f32 / max_charge as f32;
                        p.charge = 0;
                        if ready {
                            let power =
                                actions.min_power + (actions.max_power - actions.min_power) * frac;
                            throws.push(Throw::Projectile {
                                power,
                                on_hit: None,
                            });
                        }
                    }
                },
                ThrowStyle::Instant | ThrowStyle::None => {},
            }

            if intent.special {
                match actions.special {
                    Special::Nitro if !p.effects.is_active(EffectKind::Speed, tick) => {
                        if p.effects.take_resource(ResourceKind::Nitro) {
                            events.push(SimEvent::ResourceChanged {
                                player_id: id,
                                kind: ResourceKind::Nitro,
                                count: p.effects.resource(ResourceKind::Nitro),
                            });
                            grants.push((
                                id,
                                Grant::Effect {
                                    kind: EffectKind::Speed,
                                    magnitude: actions.nitro_multiplier,
                                    duration_ticks: config.ticks(actions.nitro_ms),
                                },
                            ));
                        }
                    },
                    Special::IceBall if ready && throws.is_empty() => {
                        if p.effects.take_resource(ResourceKind::IceBall) {
                            events.push(SimEvent::ResourceChanged {
                                player_id: id,
                                kind: ResourceKind::IceBall,
                                count: p.effects.resource(ResourceKind::IceBall),
                            });
                            throws.push(Throw::Projectile {
                                power: 1.0,
                                on_hit: Some(OnHit {
                                    kind: EffectKind::Freeze,
                                    magnitude: 1.0,
                                    duration_ticks: config.ticks(actions.freeze_ms),
                                }),
                            });
                        }
                    },
                    Special::Nitro | Special::IceBall | Special::None => {},
                }
            }

            if !throws.is_empty() {
                p.attack_ready_at = tick + Tick::from(config.ticks(actions.cooldown_ms));
            }

            let wants_shelter =
                intent.build && actions.build && tick >= p.build_ready_at && !has_shelter;
            if wants_shelter {
                p.build_ready_at = tick + Tick::from(config.ticks(actions.build_cooldown_ms));
            }

            let (origin, heading, radius) = (p.position, p.heading, p.radius);
            for throw in throws {
                spawn_throw(snapshot, config, id, origin, heading, radius, throw, events);
            }

            if wants_shelter {
                let shelter_id = snapshot.allocate_id();
                let half = actions.shelter_half_size;
                snapshot.shelters.push(Shelter {
                    id: shelter_id,
                    owner: id,
                    bounds: Aabb::from_center(origin, Vec2::new(half, half)),
                    health: actions.shelter_health,
                });
                events.push(SimEvent::ShelterBuilt {
                    player_id: id,
                    shelter_id,
                });
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn spawn_throw(
    snapshot: &mut Snapshot,
    config: &SimConfig,
    owner: PlayerId,
    origin: Vec2,
    heading: f32,
    thrower_radius: f32,
    throw: Throw,
    events: &mut Vec<SimEvent>,
) {
    let dir = Vec2::from_angle(heading);
    let id = snapshot.allocate_id();
    let hazard = match throw {
        Throw::Lob { payload } => {
            let spec = config.hazards.get(payload);
            let target = snapshot
                .arena
                .clamp(origin + dir * config.actions.throw_distance, spec.radius);
            let mut h = Hazard::new(
                id,
                payload,
                origin,
                spec.radius,
                config.ticks(spec.fuse_ms).max(1),
            );
            h.target = Some(target);
            h.velocity = dir * spec.speed;
            h.owner = Some(owner);
            h
        },
        Throw::Projectile { power, on_hit } => {
            let spec = &config.hazards.simple;
            let radius = spec.radius * (0.5 + 0.5 * power);
            let start = snapshot
                .arena
                .clamp(origin + dir * (thrower_radius + radius + 1.0), radius);
            let mut h = Hazard::new(
                id,
                Payload::Simple,
                start,
                radius,
                config.ticks(spec.fuse_ms).max(1),
            );
            h.velocity = dir * spec.speed;
            h.power = power;
            h.on_hit = on_hit;
            h.owner = Some(owner);
            h
        },
    };
    events.push(SimEvent::HazardSpawned {
        hazard_id: id,
        payload: hazard.payload,
        owner: Some(owner),
    });
    snapshot.hazards.push(hazard);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::Effect;
    use crate::entity::PlayerState;
    use crate::geom::Arena;
    use crate::intent::Intent;
    use crate::phase::Phase;

    fn snap() -> Snapshot {
        let mut s = Snapshot::new(Arena::new(800.0, 600.0));
        s.phase = Phase::Active;
        s.tick = 5;
        s.add_player(PlayerState::new(1, Vec2::new(100.0, 100.0), 16.0, 3));
        s
    }

    fn press(s: &mut Snapshot, intent: Intent) {
        s.players.get_mut(&1).unwrap().intent = intent;
    }

    fn attack() -> Intent {
        Intent {
            attack: true,
            ..Default::default()
        }
    }

    fn run(s: &mut Snapshot, cfg: &SimConfig) -> (Vec<SimEvent>, Vec<(PlayerId, Grant)>) {
        let mut events = Vec::new();
        let mut grants = Vec::new();
        ActionResolver::run(s, cfg, &mut events, &mut grants);
        (events, grants)
    }

    #[test]
    fn instant_throw_lobs_at_target_and_cools_down() {
        let mut cfg = SimConfig::default();
        cfg.actions.throw = ThrowStyle::Instant;
        let mut s = snap();
        press(&mut s, attack());
        run(&mut s, &cfg);
        assert_eq!(s.hazards.len(), 1);
        let h = &s.hazards[0];
        assert_eq!(h.payload, Payload::AreaOfEffect);
        assert_eq!(h.target, Some(Vec2::new(260.0, 100.0)));
        assert_eq!(h.owner, Some(1));

        // Held trigger during cooldown throws nothing
        s.tick += 1;
        run(&mut s, &cfg);
        assert_eq!(s.hazards.len(), 1);
    }

    #[test]
    fn cluster_charge_upgrades_next_throw() {
        let mut cfg = SimConfig::default();
        cfg.actions.throw = ThrowStyle::Instant;
        let mut s = snap();
        s.players
            .get_mut(&1)
            .unwrap()
            .effects
            .add_resource(ResourceKind::ClusterBomb, 1, 3);
        press(&mut s, attack());
        run(&mut s, &cfg);
        assert_eq!(s.hazards[0].payload, Payload::Cluster);
        assert_eq!(s.players[&1].effects.resource(ResourceKind::ClusterBomb), 0);
    }

    #[test]
    fn charged_throw_fires_on_release_with_power() {
        let mut cfg = SimConfig::default();
        cfg.actions.throw = ThrowStyle::Charged;
        cfg.actions.max_charge_ms = 500;
        let mut s = snap();
        press(&mut s, attack());
        for _ in 0..20 {
            run(&mut s, &cfg);
            s.tick += 1;
        }
        assert!(s.hazards.is_empty(), "Nothing flies while held");
        assert_eq!(s.players[&1].charge, 10);

        press(&mut s, Intent::default());
        run(&mut s, &cfg);
        assert_eq!(s.hazards.len(), 1);
        assert!((s.hazards[0].power - cfg.actions.max_power).abs() < 1e-5);
        assert_eq!(s.players[&1].charge, 0);
    }

    #[test]
    fn nitro_spends_a_charge() {
        let mut cfg = SimConfig::default();
        cfg.actions.special = Special::Nitro;
        let mut s = snap();
        s.players
            .get_mut(&1)
            .unwrap()
            .effects
            .add_resource(ResourceKind::Nitro, 2, 3);
        press(
            &mut s,
            Intent {
                special: true,
                ..Default::default()
            },
        );
        let (_, grants) = run(&mut s, &cfg);
        assert_eq!(grants.len(), 1);
        assert_eq!(s.players[&1].effects.resource(ResourceKind::Nitro), 1);
    }

    #[test]
    fn ice_ball_carries_freeze() {
        let mut cfg = SimConfig::default();
        cfg.actions.special = Special::IceBall;
        let mut s = snap();
        s.players
            .get_mut(&1)
            .unwrap()
            .effects
            .add_resource(ResourceKind::IceBall, 1, 3);
        press(
            &mut s,
            Intent {
                special: true,
                ..Default::default()
            },
        );
        run(&mut s, &cfg);
        let on_hit = s.hazards[0].on_hit.unwrap();
        assert_eq!(on_hit.kind, EffectKind::Freeze);
    }

    #[test]
    fn one_shelter_per_player() {
        let mut cfg = SimConfig::default();
        cfg.actions.build = true;
        cfg.actions.build_cooldown_ms = 0;
        let mut s = snap();
        press(
            &mut s,
            Intent {
                build: true,
                ..Default::default()
            },
        );
        run(&mut s, &cfg);
        s.tick += 1;
        run(&mut s, &cfg);
        assert_eq!(s.shelters.len(), 1);
        assert!(s.shelters[0].bounds.contains(Vec2::new(100.0, 100.0)));
    }

    #[test]
    fn frozen_player_cannot_act() {
        let mut cfg = SimConfig::default();
        cfg.actions.throw = ThrowStyle::Instant;
        let mut s = snap();
        s.players
            .get_mut(&1)
            .unwrap()
            .effects
            .apply(Effect::new(EffectKind::Freeze, 1.0, 0, 100));
        press(&mut s, attack());
        run(&mut s, &cfg);
        assert!(s.hazards.is_empty());
    }
}
