//! The tick pipeline and the simulation that drives it.
//!
//! [`step`] is a pure function from the previous snapshot plus latched
//! intents to the next snapshot. [`Simulation`] owns the clock, the input
//! slots and the entity store, and publishes one snapshot per tick.

use std::collections::BTreeMap;
use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::actions::ActionResolver;
use crate::clock::{Clock, Tick};
use crate::collision::CollisionResolver;
use crate::config::SimConfig;
use crate::effects::EffectManager;
use crate::events::SimEvent;
use crate::game_trait::PlayerId;
use crate::geom::Vec2;
use crate::intent::{InputSlot, Intent};
use crate::phase::{MatchResult, Phase, WinEvaluator, countdown_ticks};
use crate::physics::PhysicsIntegrator;
use crate::snapshot::{EntityStore, RenderView, Snapshot};
use crate::spawner::Spawner;

/// Golden-ratio multiplier spreading consecutive ticks across the seed space.
const TICK_SEED_MIX: u64 = 0x9E37_79B9_7F4A_7C15;

/// Deterministic generator for one tick of one match.
pub fn tick_rng(seed: u64, tick: Tick) -> StdRng {
    StdRng::seed_from_u64(seed ^ tick.wrapping_mul(TICK_SEED_MIX))
}

/// Result of one pipeline run.
#[derive(Debug, Clone)]
pub struct StepOutput {
    pub snapshot: Snapshot,
    pub events: Vec<SimEvent>,
}

/// Advance `prev` by one tick.
///
/// Order: countdown, latch intents, actions, integrate, resolve collisions,
/// expire and apply effects, periodic spawns, evaluate the win condition.
pub fn step(
    prev: &Snapshot,
    intents: &BTreeMap<PlayerId, Intent>,
    config: &SimConfig,
) -> StepOutput {
    let mut snap = prev.clone();
    let mut events = Vec::new();

    match snap.phase {
        Phase::Lobby | Phase::Ended => {
            return StepOutput {
                snapshot: snap,
                events,
            };
        },
        Phase::Countdown { remaining } => {
            snap.phase = if remaining <= 1 {
                Spawner::arm(&mut snap, config);
                Phase::Active
            } else {
                Phase::Countdown {
                    remaining: remaining - 1,
                }
            };
            if snap.phase == Phase::Active {
                tracing::info!(tick = prev.tick + 1, "Match active");
                events.push(SimEvent::PhaseChanged {
                    phase: Phase::Active,
                });
            }
        },
        Phase::Active => {},
    }

    snap.tick = prev.tick + 1;
    let tick = snap.tick;
    if snap.phase != Phase::Active {
        if config.simulate_during_countdown {
            PhysicsIntegrator::run_cosmetic(&mut snap, config);
        }
        return StepOutput {
            snapshot: snap,
            events,
        };
    }

    let mut rng = tick_rng(config.seed, tick);
    let prev_positions: BTreeMap<PlayerId, Vec2> = prev
        .players
        .values()
        .map(|p| (p.id, p.position))
        .collect();

    for p in snap.players.values_mut() {
        p.intent = if p.alive {
            intents.get(&p.id).copied().unwrap_or_default()
        } else {
            Intent::default()
        };
    }

    let mut grants = Vec::new();
    ActionResolver::run(&mut snap, config, &mut events, &mut grants);

    PhysicsIntegrator::run(&mut snap, config);
    CollisionResolver::new(config, tick, &mut events, &mut grants).run(
        &mut snap,
        &prev_positions,
        &mut rng,
    );
    EffectManager::run(&mut snap.players, grants, tick, &mut events);

    Spawner::run(&mut snap, config, &mut rng, &mut events);
    snap.active_ticks += 1;
    if let Some(result) = WinEvaluator::evaluate(&snap, config) {
        tracing::info!(
            tick,
            winner = ?result.winner,
            reason = ?result.reason,
            "Match ended"
        );
        events.push(SimEvent::PhaseChanged {
            phase: Phase::Ended,
        });
        events.push(SimEvent::MatchEnded {
            winner: result.winner,
        });
        snap.phase = Phase::Ended;
        snap.result = Some(result);
    }

    debug_assert!(
        snap.check_invariants(config.actions.max_carried).is_ok(),
        "invariant violated at tick {tick}: {:?}",
        snap.check_invariants(config.actions.max_carried)
    );

    StepOutput {
        snapshot: snap,
        events,
    }
}

/// One match: clock, input slots and the published snapshot.
pub struct Simulation {
    config: SimConfig,
    clock: Clock,
    store: EntityStore,
    initial: Arc<Snapshot>,
    inputs: BTreeMap<PlayerId, InputSlot>,
}

impl Simulation {
    /// Build a simulation from an initial layout. The layout's players
    /// define the roster; intents for anyone else are dropped.
    pub fn new(config: SimConfig, initial: Snapshot) -> Self {
        let config = config.sanitized();
        let inputs = initial
            .players
            .keys()
            .map(|&id| (id, InputSlot::default()))
            .collect();
        let initial = Arc::new(initial);
        Self {
            clock: Clock::new(config.period()),
            store: EntityStore::new((*initial).clone()),
            initial,
            inputs,
            config,
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Leave the lobby: enter the countdown (or `Active` directly when the
    /// countdown is zero) and start the clock. No-op outside `Lobby`.
    pub fn start(&mut self) -> Vec<SimEvent> {
        let current = self.store.get();
        if current.phase != Phase::Lobby {
            return Vec::new();
        }
        let mut next = current.clone();
        let remaining = countdown_ticks(&self.config);
        next.phase = if remaining == 0 {
            Spawner::arm(&mut next, &self.config);
            Phase::Active
        } else {
            Phase::Countdown { remaining }
        };
        tracing::info!(phase = ?next.phase, players = next.players.len(), "Match starting");
        let events = vec![SimEvent::PhaseChanged { phase: next.phase }];
        self.store.publish(next);
        self.clock.start();
        events
    }

    /// Back to the initial layout in `Lobby`. Clears pending inputs and every
    /// hazard, effect and timer in one publish.
    pub fn reset(&mut self) {
        self.clock.reset();
        self.store.publish((*self.initial).clone());
        for slot in self.inputs.values_mut() {
            *slot = InputSlot::default();
        }
        tracing::debug!("Simulation reset");
    }

    /// Record the latest intent for a player. Read at the next tick.
    pub fn set_intent(&mut self, player_id: PlayerId, intent: Intent) {
        match self.inputs.get_mut(&player_id) {
            Some(slot) => slot.push(intent),
            None => tracing::debug!(player_id, "Intent for unknown player dropped"),
        }
    }

    /// Run one tick if the clock is running. Returns the tick's events.
    pub fn tick(&mut self) -> Vec<SimEvent> {
        if self.clock.advance().is_none() {
            return Vec::new();
        }
        let intents: BTreeMap<PlayerId, Intent> = self
            .inputs
            .iter_mut()
            .map(|(&id, slot)| (id, slot.sample()))
            .collect();
        let out = step(self.store.get(), &intents, &self.config);
        if out.snapshot.phase == Phase::Ended {
            self.clock.stop();
        }
        self.store.publish(out.snapshot);
        out.events
    }

    /// The latest published snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.store.current()
    }

    pub fn phase(&self) -> Phase {
        self.store.get().phase
    }

    pub fn result(&self) -> Option<&MatchResult> {
        self.store.get().result.as_ref()
    }

    pub fn view(&self) -> RenderView {
        self.store.get().view(self.config.period())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Boundary, Objective, ThrowStyle};
    use crate::effects::{Effect, EffectKind};
    use crate::entity::{Hazard, ObstacleKind, Payload, PlayerState, Zone};
    use crate::geom::Aabb;
    use crate::phase::EndReason;
    use crate::powerup::{PowerUp, PowerUpKind};

    fn layout(config: &SimConfig, players: &[(PlayerId, f32, f32)]) -> Snapshot {
        let mut snap = Snapshot::new(config.arena());
        for &(id, x, y) in players {
            snap.add_player(PlayerState::new(
                id,
                Vec2::new(x, y),
                config.movement.player_radius,
                config.movement.max_health,
            ));
        }
        snap
    }

    fn quick() -> SimConfig {
        SimConfig {
            countdown_ms: 100,
            ..SimConfig::default()
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    #[test]
    fn lobby_does_not_tick() {
        let cfg = quick();
        let mut sim = Simulation::new(cfg.clone(), layout(&cfg, &[(1, 100.0, 100.0)]));
        assert!(sim.tick().is_empty());
        assert_eq!(sim.snapshot().tick, 0);
        assert_eq!(sim.phase(), Phase::Lobby);
    }

    #[test]
    fn countdown_then_active() {
        let cfg = quick();
        let mut sim = Simulation::new(cfg.clone(), layout(&cfg, &[(1, 100.0, 100.0)]));
        sim.start();
        assert_eq!(sim.phase(), Phase::Countdown { remaining: 2 });
        sim.tick();
        assert_eq!(sim.phase(), Phase::Countdown { remaining: 1 });
        let events = sim.tick();
        assert_eq!(sim.phase(), Phase::Active);
        assert!(events.contains(&SimEvent::PhaseChanged {
            phase: Phase::Active
        }));
    }

    #[test]
    fn countdown_ignores_input() {
        let cfg = quick();
        let mut sim = Simulation::new(cfg.clone(), layout(&cfg, &[(1, 100.0, 100.0)]));
        sim.start();
        sim.set_intent(
            1,
            Intent {
                right: true,
                ..Default::default()
            },
        );
        sim.tick();
        assert_eq!(sim.snapshot().players[&1].position, Vec2::new(100.0, 100.0));
    }

    fn countdown_layout(cfg: &SimConfig) -> Snapshot {
        let mut snap = layout(cfg, &[(1, 100.0, 100.0), (2, 600.0, 400.0)]);
        let id = snap.allocate_id();
        snap.hazards.push(Hazard::new(
            id,
            Payload::AreaOfEffect,
            Vec2::new(100.0, 100.0),
            10.0,
            2,
        ));
        snap.add_obstacle(
            ObstacleKind::Platform,
            Aabb::new(Vec2::new(300.0, 300.0), Vec2::new(360.0, 320.0)),
            Vec2::new(2.0, 0.0),
        );
        snap
    }

    #[test]
    fn countdown_motion_is_cosmetic() {
        let cfg = SimConfig {
            countdown_ms: 1000,
            simulate_during_countdown: true,
            ..SimConfig::default()
        };
        let mut sim = Simulation::new(cfg.clone(), countdown_layout(&cfg));
        sim.start();
        let mut events = Vec::new();
        for _ in 0..10 {
            events.extend(sim.tick());
        }
        assert_eq!(sim.phase(), Phase::Countdown { remaining: 10 });

        let snap = sim.snapshot();
        assert_eq!(snap.obstacles[0].bounds.min.x, 320.0, "Platforms keep moving");
        assert!(snap.players[&1].alive);
        assert_eq!(snap.players[&1].health, snap.players[&1].max_health);
        assert_eq!(snap.hazards.len(), 1);
        assert!(snap.hazards[0].is_armed());
        assert_eq!(snap.hazards[0].fuse, 2, "Fuses hold until the match starts");
        assert!(events.is_empty());
    }

    #[test]
    fn countdown_is_frozen_by_default() {
        let cfg = SimConfig {
            countdown_ms: 1000,
            ..SimConfig::default()
        };
        let mut sim = Simulation::new(cfg.clone(), countdown_layout(&cfg));
        sim.start();
        for _ in 0..10 {
            sim.tick();
        }
        let snap = sim.snapshot();
        assert_eq!(snap.obstacles[0].bounds.min.x, 300.0);
        assert_eq!(snap.hazards[0].fuse, 2);
    }

    #[test]
    fn hazards_resume_once_active() {
        let cfg = SimConfig {
            countdown_ms: 100,
            simulate_during_countdown: true,
            ..SimConfig::default()
        };
        let mut sim = Simulation::new(cfg.clone(), countdown_layout(&cfg));
        sim.start();
        sim.tick();
        assert!(sim.snapshot().players[&1].alive);
        // Countdown ends on the next tick, then the fuse runs out
        sim.tick();
        sim.tick();
        assert!(!sim.snapshot().players[&1].alive);
        assert_eq!(sim.result().unwrap().winner, Some(2));
    }

    #[test]
    fn zero_countdown_starts_active() {
        let cfg = SimConfig {
            countdown_ms: 0,
            ..SimConfig::default()
        };
        let mut sim = Simulation::new(cfg.clone(), layout(&cfg, &[(1, 100.0, 100.0)]));
        sim.start();
        assert_eq!(sim.phase(), Phase::Active);
    }

    #[test]
    fn reset_restores_initial_layout() {
        let cfg = quick();
        let mut sim = Simulation::new(cfg.clone(), layout(&cfg, &[(1, 100.0, 100.0)]));
        sim.start();
        sim.set_intent(
            1,
            Intent {
                right: true,
                ..Default::default()
            },
        );
        for _ in 0..10 {
            sim.tick();
        }
        assert_ne!(sim.snapshot().players[&1].position, Vec2::new(100.0, 100.0));
        sim.reset();
        assert_eq!(sim.phase(), Phase::Lobby);
        assert_eq!(sim.snapshot().tick, 0);
        assert_eq!(sim.snapshot().players[&1].position, Vec2::new(100.0, 100.0));
        assert!(!sim.clock().is_running());
    }

    #[test]
    fn unknown_player_intent_is_dropped() {
        let cfg = quick();
        let mut sim = Simulation::new(cfg.clone(), layout(&cfg, &[(1, 100.0, 100.0)]));
        sim.set_intent(99, Intent::default());
        assert_eq!(sim.snapshot().players.len(), 1);
    }

    // ========================================================================
    // Pipeline
    // ========================================================================

    #[test]
    fn active_player_moves_with_intent() {
        let cfg = SimConfig {
            countdown_ms: 0,
            ..SimConfig::default()
        };
        let mut sim = Simulation::new(cfg.clone(), layout(&cfg, &[(1, 100.0, 100.0)]));
        sim.start();
        sim.set_intent(
            1,
            Intent {
                right: true,
                ..Default::default()
            },
        );
        sim.tick();
        let p = &sim.snapshot().players[&1];
        assert!(p.position.x > 100.0);
        assert_eq!(p.position.y, 100.0);
    }

    #[test]
    fn blast_ends_match_with_last_survivor() {
        let cfg = SimConfig {
            countdown_ms: 0,
            ..SimConfig::default()
        };
        let mut snap = layout(&cfg, &[(1, 100.0, 100.0), (2, 600.0, 400.0)]);
        let id = snap.allocate_id();
        snap.hazards.push(Hazard::new(
            id,
            Payload::AreaOfEffect,
            Vec2::new(100.0, 100.0),
            10.0,
            1,
        ));
        let mut sim = Simulation::new(cfg, snap);
        sim.start();
        let events = sim.tick();
        assert_eq!(sim.phase(), Phase::Ended);
        let result = sim.result().unwrap();
        assert_eq!(result.winner, Some(2));
        assert_eq!(result.reason, EndReason::LastSurvivor);
        assert!(events.contains(&SimEvent::MatchEnded { winner: Some(2) }));

        // Ended is terminal: further ticks change nothing
        let before = sim.snapshot();
        assert!(sim.tick().is_empty());
        assert_eq!(sim.snapshot().tick, before.tick);
    }

    fn hold_at(snap: &mut Snapshot, cfg: &SimConfig, at: Vec2, ticks: usize) {
        for _ in 0..ticks {
            if let Some(p) = snap.players.get_mut(&1) {
                p.position = at;
            }
            *snap = step(snap, &BTreeMap::new(), cfg).snapshot;
        }
    }

    #[test]
    fn hill_must_be_held_without_a_break() {
        let mut cfg = SimConfig {
            countdown_ms: 0,
            ..SimConfig::default()
        };
        cfg.win.objective = Objective::HoldZone { hold_ms: 500 };
        let on = Vec2::new(400.0, 300.0);
        let off = Vec2::new(400.0, 400.0);
        let mut snap = layout(&cfg, &[(1, 400.0, 300.0)]);
        snap.hill = Some(Zone {
            center: on,
            radius: 20.0,
        });
        snap.phase = Phase::Active;

        hold_at(&mut snap, &cfg, on, 9);
        hold_at(&mut snap, &cfg, off, 1);
        hold_at(&mut snap, &cfg, on, 1);
        // Ten ticks on the hill in total, but only one since returning
        assert_eq!(snap.players[&1].hold_ticks, 10);
        assert_eq!(snap.players[&1].hold_streak, 1);
        assert_eq!(snap.phase, Phase::Active);

        hold_at(&mut snap, &cfg, on, 9);
        assert_eq!(snap.phase, Phase::Ended);
        let result = snap.result.as_ref().unwrap();
        assert_eq!(result.winner, Some(1));
        assert_eq!(result.reason, EndReason::Objective);
    }

    fn active_layout(cfg: &SimConfig) -> Snapshot {
        let mut snap = layout(cfg, &[(1, 100.0, 100.0), (2, 600.0, 400.0)]);
        snap.phase = Phase::Active;
        snap
    }

    fn blast_on(snap: &mut Snapshot, player_id: PlayerId) {
        let at = snap.players[&player_id].position;
        let id = snap.allocate_id();
        snap.hazards
            .push(Hazard::new(id, Payload::AreaOfEffect, at, 10.0, 1));
    }

    #[test]
    fn shield_lapses_on_its_expiry_tick() {
        let mut cfg = SimConfig::default();
        cfg.spawns.powerup_interval_ms = 0;
        let mut snap = active_layout(&cfg);
        snap.players
            .get_mut(&1)
            .unwrap()
            .effects
            .apply(Effect::new(EffectKind::Shield, 1.0, 0, 5));

        for tick in 1..5 {
            blast_on(&mut snap, 1);
            let out = step(&snap, &BTreeMap::new(), &cfg);
            assert!(
                out.events
                    .contains(&SimEvent::DamageBlocked { player_id: 1 }),
                "tick {tick}"
            );
            snap = out.snapshot;
            assert!(snap.players[&1].alive);
        }

        blast_on(&mut snap, 1);
        let out = step(&snap, &BTreeMap::new(), &cfg);
        assert_eq!(out.snapshot.tick, 5);
        assert!(!out.snapshot.players[&1].alive);
        assert!(out.events.contains(&SimEvent::EffectExpired {
            player_id: 1,
            kind: EffectKind::Shield,
        }));
    }

    fn drop_powerup(snap: &mut Snapshot, kind: PowerUpKind) {
        let id = snap.allocate_id();
        let position = snap.players[&1].position;
        snap.powerups.push(PowerUp {
            id,
            position,
            kind,
            radius: 10.0,
            remaining: 100,
        });
    }

    #[test]
    fn second_pickup_refreshes_the_expiry() {
        let mut cfg = SimConfig::default();
        cfg.spawns.powerup_interval_ms = 0;
        let duration = u64::from(cfg.powerup_grants().speed_ticks);
        let mut snap = active_layout(&cfg);

        drop_powerup(&mut snap, PowerUpKind::SpeedBoost);
        snap = step(&snap, &BTreeMap::new(), &cfg).snapshot;
        let first = snap.players[&1].effects.get(EffectKind::Speed).unwrap().expires_at;
        assert_eq!(first, 1 + duration);

        for _ in 0..4 {
            snap = step(&snap, &BTreeMap::new(), &cfg).snapshot;
        }
        drop_powerup(&mut snap, PowerUpKind::SpeedBoost);
        snap = step(&snap, &BTreeMap::new(), &cfg).snapshot;

        let effects = &snap.players[&1].effects;
        assert_eq!(effects.iter().count(), 1);
        assert_eq!(effects.get(EffectKind::Speed).unwrap().expires_at, 6 + duration);
        assert!(snap.powerups.is_empty());
    }

    #[test]
    fn time_limit_ends_in_draw() {
        let mut cfg = SimConfig {
            countdown_ms: 0,
            ..SimConfig::default()
        };
        cfg.win.time_limit_ms = 500;
        let mut sim = Simulation::new(
            cfg.clone(),
            layout(&cfg, &[(1, 100.0, 100.0), (2, 600.0, 400.0)]),
        );
        sim.start();
        for _ in 0..9 {
            sim.tick();
        }
        assert_eq!(sim.phase(), Phase::Active);
        sim.tick();
        let result = sim.result().unwrap();
        assert_eq!(result.reason, EndReason::TimeUp);
        assert!(result.is_draw());
        assert_eq!(result.duration_ticks, 10);
    }

    #[test]
    fn same_intents_same_snapshots() {
        let mut cfg = SimConfig {
            countdown_ms: 0,
            seed: 42,
            ..SimConfig::default()
        };
        cfg.actions.throw = ThrowStyle::Instant;
        cfg.hazards.area_of_effect.boundary = Boundary::Clamp;
        let run = || {
            let mut sim = Simulation::new(
                cfg.clone(),
                layout(&cfg, &[(1, 100.0, 100.0), (2, 500.0, 300.0)]),
            );
            sim.start();
            for t in 0..40u32 {
                sim.set_intent(
                    1,
                    Intent {
                        right: t % 3 == 0,
                        down: t % 5 == 0,
                        attack: t % 7 == 0,
                        ..Default::default()
                    },
                );
                sim.tick();
            }
            sim.snapshot()
        };
        assert_eq!(*run(), *run());
    }

    #[test]
    fn rng_differs_per_tick() {
        use rand::Rng;
        let a: u64 = tick_rng(1, 1).random();
        let b: u64 = tick_rng(1, 2).random();
        assert_ne!(a, b);
    }
}
