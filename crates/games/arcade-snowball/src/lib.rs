pub mod bot;
pub mod config;

use std::time::Duration;

use arcade_core::arcade_game_boilerplate;
use arcade_core::config::SimConfig;
use arcade_core::entity::Zone;
use arcade_core::game_trait::{ArcadeGame, GameConfig, GameMetadata, PlayerId};
use arcade_core::intent::IntentProvider;
use arcade_core::player::Player;
use arcade_core::sim::Simulation;
use arcade_core::snapshot::Snapshot;

use bot::SnowBot;
use config::SnowballConfig;

/// Snowball fight: hold to charge a throw, build a fort to hide behind,
/// freeze opponents with ice balls. King-of-the-hill mode adds a hill in
/// the middle that wins the match for whoever holds it alone long enough.
pub struct SnowballFight {
    sim: Simulation,
    game_config: SnowballConfig,
    king_of_the_hill: bool,
}

impl SnowballFight {
    pub fn new() -> Self {
        Self::with_config(SnowballConfig::load())
    }

    pub fn with_config(config: SnowballConfig) -> Self {
        let king_of_the_hill = config.king_of_the_hill;
        let sim_config = config.sim_for(king_of_the_hill);
        let layout = Snapshot::new(sim_config.arena());
        Self {
            sim: Simulation::new(sim_config, layout),
            game_config: config,
            king_of_the_hill,
        }
    }

    pub fn config(&self) -> &SnowballConfig {
        &self.game_config
    }

    pub fn is_king_of_the_hill(&self) -> bool {
        self.king_of_the_hill
    }

    fn layout(&self, sim: &SimConfig, players: &[Player]) -> Snapshot {
        let mut snap = Snapshot::ring_layout(sim, players, self.game_config.spawn_ring);
        if self.king_of_the_hill {
            snap.hill = Some(Zone {
                center: snap.arena.center(),
                radius: self.game_config.hill_radius,
            });
        }
        snap
    }
}

impl Default for SnowballFight {
    fn default() -> Self {
        Self::new()
    }
}

impl ArcadeGame for SnowballFight {
    fn metadata(&self) -> GameMetadata {
        GameMetadata {
            name: "Snowball Fight".to_string(),
            description: "Charge throws, build forts, freeze your friends".to_string(),
            min_players: 2,
            max_players: 8,
            estimated_round_duration: Duration::from_secs(120),
        }
    }

    fn init(&mut self, players: &[Player], config: &GameConfig) {
        self.king_of_the_hill = config.flag("king_of_the_hill", self.game_config.king_of_the_hill);
        let sim_config = self
            .game_config
            .sim_for(self.king_of_the_hill)
            .for_match(config);
        let layout = self.layout(&sim_config, players);
        tracing::debug!(
            players = layout.players.len(),
            king_of_the_hill = self.king_of_the_hill,
            "Snowball field built"
        );
        self.sim = Simulation::new(sim_config, layout);
    }

    fn tick_rate(&self) -> f32 {
        1000.0 / self.sim.config().tick_ms as f32
    }

    fn bot(&self, _player_id: PlayerId) -> Box<dyn IntentProvider> {
        Box::new(SnowBot::new(
            self.game_config.bot_range,
            self.game_config.bot_charge_ticks,
        ))
    }

    arcade_game_boilerplate!();
}
