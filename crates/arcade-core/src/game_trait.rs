use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::events::SimEvent;
use crate::intent::{Intent, IntentProvider};
use crate::phase::{MatchResult, Phase};
use crate::snapshot::Snapshot;

/// Unique identifier for a player in a match.
pub type PlayerId = u64;

/// Core trait every arcade minigame implements.
///
/// The host owns the clock loop, bots and broadcast; the game owns its
/// layout, tuning and a [`crate::sim::Simulation`].
pub trait ArcadeGame: Send {
    /// Game metadata for the selection screen.
    fn metadata(&self) -> GameMetadata;

    /// Build the initial layout for `players`. Leaves the match in `Lobby`.
    fn init(&mut self, players: &[super::player::Player], config: &GameConfig);

    /// Leave the lobby and start the countdown.
    fn start(&mut self) -> Vec<SimEvent>;

    /// Back to the initial layout in `Lobby`.
    fn reset(&mut self);

    /// Apply a MessagePack-encoded [`Intent`]. Malformed input is dropped.
    fn apply_input(&mut self, player_id: PlayerId, input: &[u8]);

    /// Apply an already decoded intent.
    fn set_intent(&mut self, player_id: PlayerId, intent: Intent);

    /// Run one tick. Returns the tick's events.
    fn update(&mut self) -> Vec<SimEvent>;

    /// The latest published snapshot.
    fn snapshot(&self) -> Arc<Snapshot>;

    /// MessagePack render view of the latest snapshot.
    fn serialize_state(&self) -> Vec<u8>;

    fn phase(&self) -> Phase;

    /// Result record, once the match has ended.
    fn result(&self) -> Option<MatchResult>;

    /// Simulation tick rate in Hz.
    fn tick_rate(&self) -> f32 {
        20.0
    }

    /// Intent source for a bot-controlled player.
    fn bot(&self, player_id: PlayerId) -> Box<dyn IntentProvider>;
}

/// Game metadata for the selection screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameMetadata {
    pub name: String,
    pub description: String,
    pub min_players: u8,
    pub max_players: u8,
    pub estimated_round_duration: Duration,
}

/// Per-match configuration from the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Overrides the game's own time limit when non-zero.
    pub round_duration: Duration,
    /// Match seed for every random decision.
    pub seed: u64,
    pub custom: HashMap<String, serde_json::Value>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            round_duration: Duration::ZERO,
            seed: 0,
            custom: HashMap::new(),
        }
    }
}

impl GameConfig {
    /// Boolean toggle from `custom`, or `default` when absent or mistyped.
    pub fn flag(&self, key: &str, default: bool) -> bool {
        self.custom
            .get(key)
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(default)
    }
}

/// Generates the `ArcadeGame` methods that are identical across games:
/// `start`, `reset`, `apply_input`, `set_intent`, `update`, `snapshot`,
/// `serialize_state`, `phase`, `result`.
///
/// Requires the implementing struct to have a `sim: Simulation` field.
#[macro_export]
macro_rules! arcade_game_boilerplate {
    () => {
        fn start(&mut self) -> Vec<$crate::events::SimEvent> {
            self.sim.start()
        }

        fn reset(&mut self) {
            self.sim.reset();
        }

        fn apply_input(&mut self, player_id: $crate::game_trait::PlayerId, input: &[u8]) {
            match rmp_serde::from_slice::<$crate::intent::Intent>(input) {
                Ok(intent) => self.sim.set_intent(player_id, intent),
                Err(e) => tracing::debug!(player_id, error = %e, "Dropped malformed input"),
            }
        }

        fn set_intent(
            &mut self,
            player_id: $crate::game_trait::PlayerId,
            intent: $crate::intent::Intent,
        ) {
            self.sim.set_intent(player_id, intent);
        }

        fn update(&mut self) -> Vec<$crate::events::SimEvent> {
            self.sim.tick()
        }

        fn snapshot(&self) -> std::sync::Arc<$crate::snapshot::Snapshot> {
            self.sim.snapshot()
        }

        fn serialize_state(&self) -> Vec<u8> {
            rmp_serde::to_vec(&self.sim.view()).unwrap_or_else(|e| {
                tracing::error!(error = %e, "Render view serialization failed");
                Vec::new()
            })
        }

        fn phase(&self) -> $crate::phase::Phase {
            self.sim.phase()
        }

        fn result(&self) -> Option<$crate::phase::MatchResult> {
            self.sim.result().cloned()
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_flag_falls_back() {
        let mut config = GameConfig::default();
        config
            .custom
            .insert("hot_potato".to_string(), serde_json::Value::Bool(true));
        config
            .custom
            .insert("bad".to_string(), serde_json::Value::from(3));
        assert!(config.flag("hot_potato", false));
        assert!(!config.flag("bad", false));
        assert!(config.flag("missing", true));
    }
}
