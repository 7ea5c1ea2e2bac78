pub mod config;
pub mod error;
pub mod registry;
pub mod session;

use arcade_core::player::Player;

use config::HostConfig;
use error::HostError;
use registry::GameId;
use session::SessionConfig;

/// Session settings for a local all-bot match described by `config`.
pub fn bot_match(config: &HostConfig) -> Result<SessionConfig, HostError> {
    let game_id: GameId = config.game.parse()?;
    let players: Vec<Player> = (1..=config.bots.max(1)).map(Player::bot).collect();
    Ok(SessionConfig {
        game_id,
        players,
        game: config.game_config(),
        speedup: config.speedup,
        broadcast_capacity: config.broadcast_capacity,
    })
}
