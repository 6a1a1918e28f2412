//! Error types for the game session engine.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;
use uuid::Uuid;

use crate::models::GameStatus;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Error taxonomy for everything the session engine can reject.
///
/// All of these are per-request or per-game failures; none is fatal to the
/// process.
#[derive(Debug, Clone, Error)]
pub enum GameError {
    /// No live or archived game with this id.
    #[error("game {0} not found")]
    GameNotFound(Uuid),

    /// A move or resignation arrived while the game was not in progress.
    #[error("game is not active (status: {0})")]
    GameNotActive(GameStatus),

    /// The submitting player is not the active color (or not a player at all).
    #[error("not your turn")]
    NotPlayersTurn,

    /// Rejected by the move validator, including malformed squares.
    #[error("illegal move: {0}")]
    IllegalMove(String),

    /// Non-positive or out-of-range time control at game creation.
    #[error("invalid time control: {0}")]
    InvalidTimeControl(String),

    /// A subscriber channel closed mid-delivery. Only used inside the hub;
    /// never surfaced to callers.
    #[error("subscription closed")]
    SubscriptionClosed,
}

impl GameError {
    /// Stable machine-readable code for wire messages.
    pub fn kind(&self) -> &'static str {
        match self {
            GameError::GameNotFound(_) => "game_not_found",
            GameError::GameNotActive(_) => "game_not_active",
            GameError::NotPlayersTurn => "not_players_turn",
            GameError::IllegalMove(_) => "illegal_move",
            GameError::InvalidTimeControl(_) => "invalid_time_control",
            GameError::SubscriptionClosed => "subscription_closed",
        }
    }
}

impl ResponseError for GameError {
    fn status_code(&self) -> StatusCode {
        match self {
            GameError::GameNotFound(_) => StatusCode::NOT_FOUND,
            GameError::IllegalMove(_) | GameError::InvalidTimeControl(_) => {
                StatusCode::BAD_REQUEST
            }
            GameError::GameNotActive(_) | GameError::NotPlayersTurn => StatusCode::CONFLICT,
            GameError::SubscriptionClosed => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.kind(),
            "message": self.to_string(),
        }))
    }
}
