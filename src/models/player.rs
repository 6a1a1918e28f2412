use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn default_rating() -> u32 {
    1200
}

/// A registered participant of a game. Identity is fixed once the game
/// starts; only connection status changes afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub username: String,
    #[serde(default = "default_rating")]
    pub rating: u32,
}

/// Side of the board a player is assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerColor {
    White,
    Black,
}

impl PlayerColor {
    pub fn opponent(self) -> Self {
        match self {
            PlayerColor::White => PlayerColor::Black,
            PlayerColor::Black => PlayerColor::White,
        }
    }
}

impl fmt::Display for PlayerColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerColor::White => write!(f, "white"),
            PlayerColor::Black => write!(f, "black"),
        }
    }
}

impl From<chess::Color> for PlayerColor {
    fn from(color: chess::Color) -> Self {
        match color {
            chess::Color::White => PlayerColor::White,
            chess::Color::Black => PlayerColor::Black,
        }
    }
}

impl From<PlayerColor> for chess::Color {
    fn from(color: PlayerColor) -> Self {
        match color {
            PlayerColor::White => chess::Color::White,
            PlayerColor::Black => chess::Color::Black,
        }
    }
}
