use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use arcade_core::game_trait::ArcadeGame;

use crate::error::HostError;

/// The arcade's games, by registry name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameId {
    Bombs,
    Racing,
    Rockets,
    Snowball,
    River,
}

impl GameId {
    pub const ALL: [GameId; 5] = [
        GameId::Bombs,
        GameId::Racing,
        GameId::Rockets,
        GameId::Snowball,
        GameId::River,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bombs => "bombs",
            Self::Racing => "racing",
            Self::Rockets => "rockets",
            Self::Snowball => "snowball",
            Self::River => "river",
        }
    }
}

impl std::fmt::Display for GameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameId {
    type Err = HostError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| HostError::UnknownGame(s.to_string()))
    }
}

/// Factory function type for creating game instances.
type GameFactory = fn() -> Box<dyn ArcadeGame>;

/// Maps game IDs to factories for the games compiled into this build.
pub struct GameRegistry {
    factories: HashMap<GameId, GameFactory>,
}

impl Default for GameRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl GameRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };
        registry.register_defaults();
        registry
    }

    /// An empty registry, for hosts that register their own factories.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    fn register_defaults(&mut self) {
        #[cfg(feature = "bombs")]
        self.register(GameId::Bombs, || Box::new(arcade_bombs::BombToss::new()));
        #[cfg(feature = "racing")]
        self.register(GameId::Racing, || Box::new(arcade_racing::Racing::new()));
        #[cfg(feature = "rockets")]
        self.register(GameId::Rockets, || {
            Box::new(arcade_rockets::RocketDodge::new())
        });
        #[cfg(feature = "snowball")]
        self.register(GameId::Snowball, || {
            Box::new(arcade_snowball::SnowballFight::new())
        });
        #[cfg(feature = "river")]
        self.register(GameId::River, || {
            Box::new(arcade_river::RiverCrossing::new())
        });
    }

    /// Add or replace the factory for `game_id`.
    pub fn register(&mut self, game_id: GameId, factory: GameFactory) {
        self.factories.insert(game_id, factory);
    }

    pub fn create(&self, game_id: GameId) -> Result<Box<dyn ArcadeGame>, HostError> {
        self.factories
            .get(&game_id)
            .map(|f| f())
            .ok_or_else(|| HostError::UnknownGame(game_id.to_string()))
    }

    /// Registered games in a stable order.
    pub fn available(&self) -> Vec<GameId> {
        let mut ids: Vec<GameId> = self.factories.keys().copied().collect();
        ids.sort();
        ids
    }
}
