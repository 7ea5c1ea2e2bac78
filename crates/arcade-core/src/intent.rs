use serde::{Deserialize, Serialize};

use crate::game_trait::PlayerId;
use crate::geom::Vec2;
use crate::snapshot::Snapshot;

/// Latest movement/action request for one player, as delivered by the input
/// collaborator (keyboard, touch, or a bot).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    /// Attack / throw trigger. Held for charged throws.
    pub attack: bool,
    /// Special ability trigger (nitro, ice ball).
    pub special: bool,
    /// Build trigger (forts).
    pub build: bool,
}

impl Intent {
    /// Normalized direction vector from the directional flags.
    pub fn direction(&self) -> Vec2 {
        let x = f32::from(u8::from(self.right)) - f32::from(u8::from(self.left));
        let y = f32::from(u8::from(self.down)) - f32::from(u8::from(self.up));
        Vec2::new(x, y).normalized()
    }

    /// Steering input for vehicle movement: -1 left, +1 right.
    pub fn steer(&self) -> f32 {
        f32::from(u8::from(self.right)) - f32::from(u8::from(self.left))
    }

    /// Directional flags pointing along `delta`. Axes whose component is
    /// within `deadzone` stay released.
    pub fn toward(delta: Vec2, deadzone: f32) -> Self {
        Self {
            up: delta.y < -deadzone,
            down: delta.y > deadzone,
            left: delta.x < -deadzone,
            right: delta.x > deadzone,
            ..Self::default()
        }
    }

    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }

    /// Fold a newer sample into this one. Directions take the newest value;
    /// action triggers stay latched so a press between two ticks is not lost.
    pub fn merge(&mut self, newer: Intent) {
        self.up = newer.up;
        self.down = newer.down;
        self.left = newer.left;
        self.right = newer.right;
        self.attack |= newer.attack;
        self.special |= newer.special;
        self.build |= newer.build;
    }
}

/// Per-player input slot: the raw latest sample plus the latched view the
/// next tick will read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputSlot {
    latest: Intent,
    latched: Intent,
}

impl InputSlot {
    pub fn push(&mut self, intent: Intent) {
        self.latest = intent;
        self.latched.merge(intent);
    }

    /// Read the intent for this tick. Held triggers carry over; released
    /// triggers clear once they have been observed.
    pub fn sample(&mut self) -> Intent {
        let sampled = self.latched;
        self.latched = self.latest;
        sampled
    }
}

/// Anything that can produce an intent for a player each tick: the human
/// input collaborator, a replay script, or a bot.
pub trait IntentProvider: Send {
    fn next_intent(&mut self, snapshot: &Snapshot, player_id: PlayerId) -> Intent;
}

/// Provider that always returns the same intent.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstantIntent(pub Intent);

impl IntentProvider for ConstantIntent {
    fn next_intent(&mut self, _snapshot: &Snapshot, _player_id: PlayerId) -> Intent {
        self.0
    }
}
