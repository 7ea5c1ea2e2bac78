use serde::{Deserialize, Serialize};

use crate::effects::{EffectKind, Grant, ResourceKind};
use crate::entity::EntityId;
use crate::geom::Vec2;

/// Collectible kinds shared by the physically simulated games.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PowerUpKind {
    SpeedBoost,
    Shield,
    Invulnerability,
    Anchor,
    /// One nitro charge (racing).
    Nitro,
    ExtraLife,
    /// Upgrades upcoming throws to cluster bombs.
    ClusterBombs,
    /// Freezing snowballs.
    IceBalls,
    /// One step of an ordered-task objective.
    Task,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 9] = [
        PowerUpKind::SpeedBoost,
        PowerUpKind::Shield,
        PowerUpKind::Invulnerability,
        PowerUpKind::Anchor,
        PowerUpKind::Nitro,
        PowerUpKind::ExtraLife,
        PowerUpKind::ClusterBombs,
        PowerUpKind::IceBalls,
        PowerUpKind::Task,
    ];
}

/// A collectible lying in the arena.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerUp {
    pub id: EntityId,
    pub position: Vec2,
    pub kind: PowerUpKind,
    pub radius: f32,
    /// Ticks until the power-up disappears uncollected.
    pub remaining: u32,
}

/// Tunables for what each power-up hands out. Durations are in ticks
/// (converted from milliseconds by [`crate::config::SimConfig`]).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerUpGrants {
    pub speed_multiplier: f32,
    pub speed_ticks: u32,
    pub shield_ticks: u32,
    pub invulnerability_ticks: u32,
    pub anchor_ticks: u32,
    pub resource_amount: u32,
    pub resource_cap: u32,
    pub extra_life: u32,
}

impl PowerUpGrants {
    /// What collecting `kind` installs on the collector.
    pub fn grant(&self, kind: PowerUpKind) -> Grant {
        match kind {
            PowerUpKind::SpeedBoost => Grant::Effect {
                kind: EffectKind::Speed,
                magnitude: self.speed_multiplier,
                duration_ticks: self.speed_ticks,
            },
            PowerUpKind::Shield => Grant::Effect {
                kind: EffectKind::Shield,
                magnitude: 1.0,
                duration_ticks: self.shield_ticks,
            },
            PowerUpKind::Invulnerability => Grant::Effect {
                kind: EffectKind::Invulnerability,
                magnitude: 1.0,
                duration_ticks: self.invulnerability_ticks,
            },
            PowerUpKind::Anchor => Grant::Effect {
                kind: EffectKind::Anchor,
                magnitude: 1.0,
                duration_ticks: self.anchor_ticks,
            },
            PowerUpKind::Nitro => self.resource(ResourceKind::Nitro),
            PowerUpKind::ClusterBombs => self.resource(ResourceKind::ClusterBomb),
            PowerUpKind::IceBalls => self.resource(ResourceKind::IceBall),
            PowerUpKind::ExtraLife => Grant::Heal(self.extra_life),
            PowerUpKind::Task => Grant::Task,
        }
    }

    fn resource(&self, kind: ResourceKind) -> Grant {
        Grant::Resource {
            kind,
            amount: self.resource_amount,
            cap: self.resource_cap,
        }
    }
}
