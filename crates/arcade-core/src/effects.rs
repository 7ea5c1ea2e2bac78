//! Per-player timed modifiers and countable resources.
//!
//! Expiry is an absolute tick number, never a wall-clock timestamp, so a
//! paused or jittery host cannot desynchronize effects from simulated time.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::clock::Tick;
use crate::entity::PlayerState;
use crate::events::SimEvent;
use crate::game_trait::PlayerId;

/// Kinds of timed modifier. At most one of each is active per player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EffectKind {
    /// Multiplies movement speed by `magnitude`.
    Speed,
    /// Immunity to area and projectile damage and to barrier crashes.
    Shield,
    /// Zero speed, intents ignored.
    Freeze,
    /// Like `Shield`, and also ignores knockback.
    Invulnerability,
    /// Immunity to knockback.
    Anchor,
    /// Multiplies movement speed by `magnitude` (< 1).
    Slow,
    /// Barrier crash: behaves like a freeze until it expires.
    Crashed,
}

/// A timed modifier attached to exactly one player.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    pub kind: EffectKind,
    pub magnitude: f32,
    /// First tick at which the effect no longer applies.
    pub expires_at: Tick,
}

impl Effect {
    pub fn new(kind: EffectKind, magnitude: f32, now: Tick, duration_ticks: u32) -> Self {
        Self {
            kind,
            magnitude,
            expires_at: now + Tick::from(duration_ticks),
        }
    }

    pub fn is_active(&self, tick: Tick) -> bool {
        self.expires_at > tick
    }
}

/// Countable resources that stack up to a cap instead of refreshing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Nitro,
    ClusterBomb,
    IceBall,
}

/// Active effects (one per kind) and resource counters of a player.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EffectSet {
    effects: Vec<Effect>,
    resources: BTreeMap<ResourceKind, u32>,
}

impl EffectSet {
    /// Install an effect, replacing any effect of the same kind.
    pub fn apply(&mut self, effect: Effect) {
        match self.effects.iter_mut().find(|e| e.kind == effect.kind) {
            Some(existing) => *existing = effect,
            None => {
                self.effects.push(effect);
                self.effects.sort_by_key(|e| e.kind);
            },
        }
    }

    pub fn get(&self, kind: EffectKind) -> Option<&Effect> {
        self.effects.iter().find(|e| e.kind == kind)
    }

    pub fn is_active(&self, kind: EffectKind, tick: Tick) -> bool {
        self.get(kind).is_some_and(|e| e.is_active(tick))
    }

    pub fn remove(&mut self, kind: EffectKind) -> Option<Effect> {
        let idx = self.effects.iter().position(|e| e.kind == kind)?;
        Some(self.effects.remove(idx))
    }

    /// Drop every effect whose expiry is at or before `tick`.
    pub fn expire(&mut self, tick: Tick) -> Vec<EffectKind> {
        let mut expired = Vec::new();
        self.effects.retain(|e| {
            if e.is_active(tick) {
                true
            } else {
                expired.push(e.kind);
                false
            }
        });
        expired
    }

    pub fn iter(&self) -> impl Iterator<Item = &Effect> {
        self.effects.iter()
    }

    /// Kinds active at `tick`, in kind order.
    pub fn active_kinds(&self, tick: Tick) -> Vec<EffectKind> {
        self.effects
            .iter()
            .filter(|e| e.is_active(tick))
            .map(|e| e.kind)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn resource(&self, kind: ResourceKind) -> u32 {
        self.resources.get(&kind).copied().unwrap_or(0)
    }

    /// Add `amount` of a resource, saturating at `cap`. Returns the new count.
    pub fn add_resource(&mut self, kind: ResourceKind, amount: u32, cap: u32) -> u32 {
        let count = self.resources.entry(kind).or_insert(0);
        *count = count.saturating_add(amount).min(cap);
        *count
    }

    /// Consume one unit of a resource. Returns false if none was held.
    pub fn take_resource(&mut self, kind: ResourceKind) -> bool {
        match self.resources.get_mut(&kind) {
            Some(count) if *count > 0 => {
                *count -= 1;
                true
            },
            _ => false,
        }
    }
}

/// Effective movement/combat parameters derived from the active set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectiveStats {
    pub speed_multiplier: f32,
    /// Shielded or invulnerable: area and projectile damage is a no-op.
    pub damage_immune: bool,
    /// Barrier crashes are ignored.
    pub crash_immune: bool,
    /// False while frozen or crashed: intents are ignored entirely.
    pub accepts_input: bool,
    pub anchored: bool,
}

impl Default for EffectiveStats {
    fn default() -> Self {
        Self {
            speed_multiplier: 1.0,
            damage_immune: false,
            crash_immune: false,
            accepts_input: true,
            anchored: false,
        }
    }
}

/// Compute effective parameters for a player's effect set at `tick`.
pub fn effective_stats(set: &EffectSet, tick: Tick) -> EffectiveStats {
    let mut stats = EffectiveStats::default();
    for effect in set.iter().filter(|e| e.is_active(tick)) {
        match effect.kind {
            EffectKind::Speed | EffectKind::Slow => {
                stats.speed_multiplier *= effect.magnitude.max(0.0);
            },
            EffectKind::Shield => {
                stats.damage_immune = true;
                stats.crash_immune = true;
            },
            EffectKind::Invulnerability => {
                stats.damage_immune = true;
                stats.crash_immune = true;
                stats.anchored = true;
            },
            EffectKind::Anchor => stats.anchored = true,
            EffectKind::Freeze | EffectKind::Crashed => stats.accepts_input = false,
        }
    }
    if !stats.accepts_input {
        stats.speed_multiplier = 0.0;
    }
    stats
}

/// Something a pick-up or action hands to a player, applied by the
/// [`EffectManager`] after stale effects have been swept.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Grant {
    Effect {
        kind: EffectKind,
        magnitude: f32,
        duration_ticks: u32,
    },
    Resource {
        kind: ResourceKind,
        amount: u32,
        cap: u32,
    },
    /// Restore health (extra life), capped at the player's maximum.
    Heal(u32),
    /// Completed task for ordered-task objectives.
    Task,
}

/// The per-tick effect pass: expire, then apply newly collected grants.
pub struct EffectManager;

impl EffectManager {
    pub fn run(
        players: &mut BTreeMap<PlayerId, PlayerState>,
        grants: Vec<(PlayerId, Grant)>,
        tick: Tick,
        events: &mut Vec<SimEvent>,
    ) {
        for player in players.values_mut() {
            for kind in player.effects.expire(tick) {
                events.push(SimEvent::EffectExpired {
                    player_id: player.id,
                    kind,
                });
            }
        }

        for (player_id, grant) in grants {
            let Some(player) = players.get_mut(&player_id) else {
                tracing::debug!(player_id, "Dropped grant for unknown player");
                continue;
            };
            if !player.alive {
                continue;
            }
            Self::apply_grant(player, grant, tick, events);
        }
    }

    fn apply_grant(player: &mut PlayerState, grant: Grant, tick: Tick, events: &mut Vec<SimEvent>) {
        match grant {
            Grant::Effect {
                kind,
                magnitude,
                duration_ticks,
            } => {
                let effect = Effect::new(kind, magnitude, tick, duration_ticks);
                player.effects.apply(effect);
                events.push(SimEvent::EffectApplied {
                    player_id: player.id,
                    kind,
                    expires_at: effect.expires_at,
                });
            },
            Grant::Resource { kind, amount, cap } => {
                let count = player.effects.add_resource(kind, amount, cap);
                events.push(SimEvent::ResourceChanged {
                    player_id: player.id,
                    kind,
                    count,
                });
            },
            Grant::Heal(amount) => {
                player.health = player.health.saturating_add(amount).min(player.max_health);
            },
            Grant::Task => player.tasks += 1,
        }
    }
}
