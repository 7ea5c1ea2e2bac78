use serde::{Deserialize, Serialize};

use crate::game_trait::PlayerId;

/// A roster entry handed to [`crate::game_trait::ArcadeGame::init`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub display_name: String,
    pub color: PlayerColor,
    /// Driven by the game's bot instead of the input collaborator.
    pub is_bot: bool,
    pub is_spectator: bool,
}

impl Player {
    /// Human participant with a palette color picked by id.
    pub fn new(id: PlayerId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            color: PlayerColor::for_index(id as usize),
            is_bot: false,
            is_spectator: false,
        }
    }

    pub fn bot(id: PlayerId) -> Self {
        Self {
            is_bot: true,
            ..Self::new(id, format!("Bot {id}"))
        }
    }
}

/// Avatar color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Default for PlayerColor {
    fn default() -> Self {
        Self::PALETTE[0]
    }
}

impl PlayerColor {
    pub const PALETTE: &[PlayerColor] = &[
        PlayerColor {
            r: 231,
            g: 76,
            b: 60,
        }, // Red
        PlayerColor {
            r: 52,
            g: 152,
            b: 219,
        }, // Blue
        PlayerColor {
            r: 46,
            g: 204,
            b: 113,
        }, // Green
        PlayerColor {
            r: 241,
            g: 196,
            b: 15,
        }, // Yellow
        PlayerColor {
            r: 155,
            g: 89,
            b: 182,
        }, // Purple
        PlayerColor {
            r: 230,
            g: 126,
            b: 34,
        }, // Orange
        PlayerColor {
            r: 26,
            g: 188,
            b: 156,
        }, // Turquoise
        PlayerColor {
            r: 236,
            g: 112,
            b: 160,
        }, // Pink
    ];

    /// Palette entry for the `index`-th player, wrapping around.
    pub fn for_index(index: usize) -> Self {
        Self::PALETTE[index % Self::PALETTE.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_wraps() {
        assert_eq!(PlayerColor::for_index(0), PlayerColor::for_index(8));
        assert_ne!(PlayerColor::for_index(1), PlayerColor::for_index(2));
    }

    #[test]
    fn bot_constructor_flags_bot() {
        let p = Player::bot(4);
        assert!(p.is_bot);
        assert_eq!(p.display_name, "Bot 4");
    }
}
