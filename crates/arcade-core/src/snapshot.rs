//! Immutable per-tick state, the store that publishes it, and the read-only
//! view handed to renderers.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::clock::{Tick, ticks_to_duration};
use crate::config::SimConfig;
use crate::effects::EffectKind;
use crate::entity::{
    EntityId, Hazard, Obstacle, ObstacleKind, Payload, PlayerState, Shelter, Track, TrailSample,
    TriggerState, Zone,
};
use crate::game_trait::PlayerId;
use crate::geom::{Aabb, Arena, Vec2};
use crate::phase::{MatchResult, Phase};
use crate::player::Player;
use crate::powerup::{PowerUp, PowerUpKind};

/// Tick-counted countdowns for periodic work. Zero means "due this tick".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnTimers {
    pub powerup: u32,
    pub hazard: u32,
    pub survival: u32,
}

/// Complete state of every entity at one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub tick: Tick,
    pub phase: Phase,
    /// Ticks spent in `Active` so far.
    pub active_ticks: u64,
    pub arena: Arena,
    pub players: BTreeMap<PlayerId, PlayerState>,
    /// Kept in ascending id order.
    pub hazards: Vec<Hazard>,
    pub powerups: Vec<PowerUp>,
    pub obstacles: Vec<Obstacle>,
    pub shelters: Vec<Shelter>,
    pub track: Option<Track>,
    pub hill: Option<Zone>,
    pub finish: Option<Aabb>,
    pub timers: SpawnTimers,
    pub next_entity_id: EntityId,
    pub result: Option<MatchResult>,
}

impl Snapshot {
    pub fn new(arena: Arena) -> Self {
        Self {
            tick: 0,
            phase: Phase::Lobby,
            active_ticks: 0,
            arena,
            players: BTreeMap::new(),
            hazards: Vec::new(),
            powerups: Vec::new(),
            obstacles: Vec::new(),
            shelters: Vec::new(),
            track: None,
            hill: None,
            finish: None,
            timers: SpawnTimers::default(),
            next_entity_id: 1,
            result: None,
        }
    }

    /// Open arena with the non-spectators spread on a ring around the center,
    /// each facing inward. `fraction` scales the ring to the shorter side.
    pub fn ring_layout(config: &SimConfig, players: &[Player], fraction: f32) -> Self {
        let arena = config.arena();
        let mut snap = Self::new(arena);
        let active: Vec<&Player> = players.iter().filter(|p| !p.is_spectator).collect();
        let spots = arena.ring(active.len(), fraction);
        for (player, spot) in active.iter().zip(spots) {
            let mut state = PlayerState::new(
                player.id,
                spot,
                config.movement.player_radius,
                config.movement.max_health,
            );
            state.heading = (arena.center() - spot).angle();
            snap.add_player(state);
        }
        snap
    }

    /// Reserve a fresh id for a non-player entity.
    pub fn allocate_id(&mut self) -> EntityId {
        let id = self.next_entity_id;
        self.next_entity_id = self.next_entity_id.wrapping_add(1);
        id
    }

    pub fn add_player(&mut self, player: PlayerState) {
        self.players.insert(player.id, player);
    }

    /// Add an obstacle, assigning it an id.
    pub fn add_obstacle(&mut self, kind: ObstacleKind, bounds: Aabb, velocity: Vec2) -> EntityId {
        let id = self.allocate_id();
        let mut obstacle = Obstacle::new(id, kind, bounds);
        obstacle.velocity = velocity;
        self.obstacles.push(obstacle);
        id
    }

    pub fn alive_count(&self) -> usize {
        self.players.values().filter(|p| p.alive).count()
    }

    /// Armed hazards currently carried by `player_id`.
    pub fn carried_by(&self, player_id: PlayerId) -> usize {
        self.hazards
            .iter()
            .filter(|h| h.is_armed() && h.carrier == Some(player_id))
            .count()
    }

    pub fn shelter_of(&self, player_id: PlayerId) -> Option<&Shelter> {
        self.shelters.iter().find(|s| s.owner == player_id)
    }

    /// Simulated time since tick zero.
    pub fn clock(&self, period: Duration) -> Duration {
        ticks_to_duration(period, self.tick)
    }

    /// Read-only view for the render collaborator.
    pub fn view(&self, period: Duration) -> RenderView {
        RenderView {
            tick: self.tick,
            clock_ms: u64::try_from(self.clock(period).as_millis()).unwrap_or(u64::MAX),
            phase: self.phase,
            players: self
                .players
                .values()
                .map(|p| PlayerView {
                    id: p.id,
                    position: p.position,
                    heading: p.heading,
                    alive: p.alive,
                    health: p.health,
                    score: p.score,
                    effects: p.effects.active_kinds(self.tick),
                    trail: p.trail.iter().copied().collect(),
                })
                .collect(),
            hazards: self
                .hazards
                .iter()
                .map(|h| HazardView {
                    id: h.id,
                    position: h.position,
                    payload: h.payload,
                    state: h.state,
                    carrier: h.carrier,
                    trail: h.trail.iter().copied().collect(),
                })
                .collect(),
            powerups: self
                .powerups
                .iter()
                .map(|p| PowerUpView {
                    id: p.id,
                    position: p.position,
                    kind: p.kind,
                })
                .collect(),
            obstacles: self
                .obstacles
                .iter()
                .map(|o| ObstacleView {
                    id: o.id,
                    kind: o.kind,
                    bounds: o.bounds,
                })
                .collect(),
            shelters: self
                .shelters
                .iter()
                .map(|s| ShelterView {
                    id: s.id,
                    owner: s.owner,
                    bounds: s.bounds,
                    health: s.health,
                })
                .collect(),
        }
    }

    /// Verify the global invariants. A violation is a programming defect.
    pub fn check_invariants(&self, max_carried: usize) -> Result<(), InvariantViolation> {
        for p in self.players.values() {
            if p.alive != (p.health > 0) {
                return Err(InvariantViolation::HealthMismatch {
                    player_id: p.id,
                    health: p.health,
                    alive: p.alive,
                });
            }
            if p.health > p.max_health {
                return Err(InvariantViolation::HealthAboveMax { player_id: p.id });
            }
            if !p.position.is_finite() {
                return Err(InvariantViolation::NonFinitePlayer { player_id: p.id });
            }
            let carried = self.carried_by(p.id);
            if carried > max_carried {
                return Err(InvariantViolation::CarryLimit {
                    player_id: p.id,
                    carried,
                    limit: max_carried,
                });
            }
        }
        for h in &self.hazards {
            if !h.position.is_finite() {
                return Err(InvariantViolation::NonFiniteHazard { hazard_id: h.id });
            }
            if h.state == TriggerState::Spent {
                return Err(InvariantViolation::SpentHazardPublished { hazard_id: h.id });
            }
        }
        if !self.hazards.windows(2).all(|w| w[0].id < w[1].id) {
            return Err(InvariantViolation::UnorderedHazards);
        }
        Ok(())
    }
}

/// A broken global invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    HealthMismatch {
        player_id: PlayerId,
        health: u32,
        alive: bool,
    },
    HealthAboveMax {
        player_id: PlayerId,
    },
    NonFinitePlayer {
        player_id: PlayerId,
    },
    NonFiniteHazard {
        hazard_id: EntityId,
    },
    CarryLimit {
        player_id: PlayerId,
        carried: usize,
        limit: usize,
    },
    SpentHazardPublished {
        hazard_id: EntityId,
    },
    UnorderedHazards,
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HealthMismatch {
                player_id,
                health,
                alive,
            } => write!(
                f,
                "player {player_id} has health {health} but alive={alive}"
            ),
            Self::HealthAboveMax { player_id } => {
                write!(f, "player {player_id} exceeds max health")
            },
            Self::NonFinitePlayer { player_id } => {
                write!(f, "player {player_id} has a non-finite position")
            },
            Self::NonFiniteHazard { hazard_id } => {
                write!(f, "hazard {hazard_id} has a non-finite position")
            },
            Self::CarryLimit {
                player_id,
                carried,
                limit,
            } => write!(
                f,
                "player {player_id} carries {carried} hazards (limit {limit})"
            ),
            Self::SpentHazardPublished { hazard_id } => {
                write!(f, "spent hazard {hazard_id} left in snapshot")
            },
            Self::UnorderedHazards => write!(f, "hazards are not in id order"),
        }
    }
}

impl std::error::Error for InvariantViolation {}

/// Holds the latest published snapshot. Each tick replaces it wholesale.
#[derive(Debug, Clone)]
pub struct EntityStore {
    current: Arc<Snapshot>,
}

impl EntityStore {
    pub fn new(initial: Snapshot) -> Self {
        Self {
            current: Arc::new(initial),
        }
    }

    pub fn current(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current)
    }

    pub fn get(&self) -> &Snapshot {
        &self.current
    }

    pub fn publish(&mut self, snapshot: Snapshot) {
        self.current = Arc::new(snapshot);
    }
}

// ============================================================================
// Render view
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderView {
    pub tick: Tick,
    pub clock_ms: u64,
    pub phase: Phase,
    pub players: Vec<PlayerView>,
    pub hazards: Vec<HazardView>,
    pub powerups: Vec<PowerUpView>,
    pub obstacles: Vec<ObstacleView>,
    pub shelters: Vec<ShelterView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerView {
    pub id: PlayerId,
    pub position: Vec2,
    pub heading: f32,
    pub alive: bool,
    pub health: u32,
    pub score: i32,
    pub effects: Vec<EffectKind>,
    pub trail: Vec<TrailSample>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardView {
    pub id: EntityId,
    pub position: Vec2,
    pub payload: Payload,
    pub state: TriggerState,
    pub carrier: Option<PlayerId>,
    pub trail: Vec<TrailSample>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerUpView {
    pub id: EntityId,
    pub position: Vec2,
    pub kind: PowerUpKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObstacleView {
    pub id: EntityId,
    pub kind: ObstacleKind,
    pub bounds: Aabb,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShelterView {
    pub id: EntityId,
    pub owner: PlayerId,
    pub bounds: Aabb,
    pub health: u32,
}
