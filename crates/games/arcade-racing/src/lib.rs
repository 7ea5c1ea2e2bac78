pub mod bot;
pub mod config;
pub mod track;

use std::time::Duration;

use arcade_core::arcade_game_boilerplate;
use arcade_core::game_trait::{ArcadeGame, GameConfig, GameMetadata, PlayerId};
use arcade_core::intent::IntentProvider;
use arcade_core::player::Player;
use arcade_core::sim::Simulation;
use arcade_core::snapshot::Snapshot;

use bot::RaceBot;
use config::RacingConfig;

/// Lap racing around a walled infield. Oil spins you out, spikes slow
/// you down, the infield wall crashes you. First to finish every lap wins;
/// otherwise the furthest racer when time runs out.
pub struct Racing {
    sim: Simulation,
    game_config: RacingConfig,
}

impl Racing {
    pub fn new() -> Self {
        Self::with_config(RacingConfig::load())
    }

    pub fn with_config(config: RacingConfig) -> Self {
        let layout = Snapshot::new(config.sim.arena());
        Self {
            sim: Simulation::new(config.sim.clone(), layout),
            game_config: config,
        }
    }

    pub fn config(&self) -> &RacingConfig {
        &self.game_config
    }
}

impl Default for Racing {
    fn default() -> Self {
        Self::new()
    }
}

impl ArcadeGame for Racing {
    fn metadata(&self) -> GameMetadata {
        GameMetadata {
            name: "Racing".to_string(),
            description: "Top-down laps with oil slicks, spikes and nitro".to_string(),
            min_players: 1,
            max_players: 8,
            estimated_round_duration: Duration::from_secs(120),
        }
    }

    fn init(&mut self, players: &[Player], config: &GameConfig) {
        let sim_config = self.game_config.sim.for_match(config);
        let layout = track::build(&self.game_config, &sim_config, players);
        tracing::debug!(
            players = layout.players.len(),
            laps = self.game_config.laps,
            "Race track built"
        );
        self.sim = Simulation::new(sim_config, layout);
    }

    fn tick_rate(&self) -> f32 {
        1000.0 / self.sim.config().tick_ms as f32
    }

    fn bot(&self, _player_id: PlayerId) -> Box<dyn IntentProvider> {
        let waypoints = track::corners(self.sim.config().arena(), self.game_config.lane_width);
        Box::new(RaceBot::new(
            waypoints.to_vec(),
            self.game_config.bot_waypoint_radius,
        ))
    }

    arcade_game_boilerplate!();
}
