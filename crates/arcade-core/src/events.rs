use serde::{Deserialize, Serialize};

use crate::clock::Tick;
use crate::effects::{EffectKind, ResourceKind};
use crate::entity::{EntityId, Payload};
use crate::game_trait::PlayerId;
use crate::geom::Vec2;
use crate::phase::Phase;
use crate::powerup::PowerUpKind;

/// How a player left the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EliminationCause {
    /// Area damage from a triggered hazard.
    Blast,
    /// Direct projectile impact.
    Projectile,
    /// Fell into a pit with no platform underneath.
    Fell,
}

/// Events emitted by a tick (scoring, elimination, pickups, phase changes).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimEvent {
    PhaseChanged {
        phase: Phase,
    },
    HazardSpawned {
        hazard_id: EntityId,
        payload: Payload,
        owner: Option<PlayerId>,
    },
    HazardTriggered {
        hazard_id: EntityId,
        position: Vec2,
    },
    /// A simple projectile ran out of fuse without hitting anything.
    HazardFizzled {
        hazard_id: EntityId,
    },
    HazardAttached {
        hazard_id: EntityId,
        player_id: PlayerId,
    },
    HazardPassed {
        hazard_id: EntityId,
        from: PlayerId,
        to: PlayerId,
    },
    Damaged {
        player_id: PlayerId,
        amount: u32,
        remaining: u32,
        source: Option<PlayerId>,
    },
    /// Damage absorbed by a shield or invulnerability.
    DamageBlocked {
        player_id: PlayerId,
    },
    Eliminated {
        player_id: PlayerId,
        by: Option<PlayerId>,
        cause: EliminationCause,
    },
    PowerUpSpawned {
        powerup_id: EntityId,
        kind: PowerUpKind,
    },
    PowerUpCollected {
        player_id: PlayerId,
        kind: PowerUpKind,
    },
    EffectApplied {
        player_id: PlayerId,
        kind: EffectKind,
        expires_at: Tick,
    },
    EffectExpired {
        player_id: PlayerId,
        kind: EffectKind,
    },
    ResourceChanged {
        player_id: PlayerId,
        kind: ResourceKind,
        count: u32,
    },
    CheckpointPassed {
        player_id: PlayerId,
        index: usize,
    },
    LapCompleted {
        player_id: PlayerId,
        lap: u32,
    },
    Crashed {
        player_id: PlayerId,
    },
    ShelterBuilt {
        player_id: PlayerId,
        shelter_id: EntityId,
    },
    ShelterDamaged {
        shelter_id: EntityId,
        remaining: u32,
    },
    ShelterDestroyed {
        shelter_id: EntityId,
    },
    ScoreUpdate {
        player_id: PlayerId,
        score: i32,
    },
    MatchEnded {
        winner: Option<PlayerId>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_msgpack_roundtrip() {
        let events = vec![
            SimEvent::Damaged {
                player_id: 2,
                amount: 1,
                remaining: 2,
                source: Some(1),
            },
            SimEvent::Eliminated {
                player_id: 2,
                by: None,
                cause: EliminationCause::Fell,
            },
            SimEvent::PhaseChanged {
                phase: Phase::Active,
            },
        ];
        let bytes = rmp_serde::to_vec(&events).unwrap();
        let back: Vec<SimEvent> = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(events, back);
    }
}
