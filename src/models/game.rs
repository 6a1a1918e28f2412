use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::GameError;
use crate::models::player::{Player, PlayerColor};

/// Longest initial time accepted at game creation (two hours).
pub const MAX_INITIAL_TIME_SECS: u64 = 7200;
/// Largest per-move increment accepted at game creation (one minute).
pub const MAX_INCREMENT_SECS: u64 = 60;

/// Time budget for a game: starting time plus the per-move increment, both
/// in seconds. Immutable for a game's lifetime.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimeControl {
    pub initial_time: u64,
    #[serde(default)]
    pub increment: u64,
}

impl TimeControl {
    pub fn validate(&self) -> Result<(), GameError> {
        if self.initial_time == 0 {
            return Err(GameError::InvalidTimeControl(
                "initial time must be positive".to_string(),
            ));
        }
        if self.initial_time > MAX_INITIAL_TIME_SECS {
            return Err(GameError::InvalidTimeControl(format!(
                "initial time cannot exceed {} seconds",
                MAX_INITIAL_TIME_SECS
            )));
        }
        if self.increment > MAX_INCREMENT_SECS {
            return Err(GameError::InvalidTimeControl(format!(
                "increment cannot exceed {} seconds",
                MAX_INCREMENT_SECS
            )));
        }
        Ok(())
    }
}

/// Lifecycle of a game session. `Waiting` and `InProgress` are the only
/// states that accept moves; everything else is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Waiting,
    InProgress,
    Checkmate,
    Stalemate,
    Timeout,
    Resigned,
    Drawn,
}

impl GameStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, GameStatus::Waiting | GameStatus::InProgress)
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GameStatus::Waiting => "waiting",
            GameStatus::InProgress => "in_progress",
            GameStatus::Checkmate => "checkmate",
            GameStatus::Stalemate => "stalemate",
            GameStatus::Timeout => "timeout",
            GameStatus::Resigned => "resigned",
            GameStatus::Drawn => "drawn",
        };
        write!(f, "{}", name)
    }
}

/// One applied move, as appended to the game's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveRecord {
    pub move_number: u32,
    pub color: PlayerColor,
    pub from: String,
    pub to: String,
    pub promotion: Option<String>,
    /// Position after the move, FEN-encoded.
    pub fen_after: String,
    pub timestamp: DateTime<Utc>,
}

impl MoveRecord {
    /// The move in UCI notation, e.g. "e2e4" or "e7e8q".
    pub fn uci(&self) -> String {
        match &self.promotion {
            Some(p) => format!("{}{}{}", self.from, self.to, p),
            None => format!("{}{}", self.from, self.to),
        }
    }
}

/// Point-in-time view of both clocks, in milliseconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ClockSnapshot {
    pub white_ms: u64,
    pub black_ms: u64,
    pub active: Option<PlayerColor>,
}

/// Immutable read-only view of a session, served to REST pollers and used
/// as the final record handed to persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub game_id: Uuid,
    pub white: Player,
    pub black: Player,
    pub time_control: TimeControl,
    pub fen: String,
    pub move_history: Vec<MoveRecord>,
    pub status: GameStatus,
    pub winner: Option<PlayerColor>,
    pub clock: ClockSnapshot,
    /// Legal moves in the current position (empty once the game is over).
    pub legal_moves: Vec<String>,
}

impl GameSnapshot {
    pub fn summary(&self) -> GameSummary {
        GameSummary {
            game_id: self.game_id,
            white: self.white.username.clone(),
            black: self.black.username.clone(),
            status: self.status,
            moves_played: self.move_history.len() as u32,
        }
    }
}

/// Lightweight listing entry for a known game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSummary {
    pub game_id: Uuid,
    pub white: String,
    pub black: String,
    pub status: GameStatus,
    pub moves_played: u32,
}
