use actix::Message;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::game::{ClockSnapshot, GameStatus, MoveRecord};
use crate::models::player::PlayerColor;

/// Something that happened inside a game session. Events are immutable once
/// emitted and carry the minimal payload a client needs to update its view.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    MoveMade {
        record: MoveRecord,
        active_color: PlayerColor,
        check: bool,
        clock: ClockSnapshot,
    },
    ClockUpdate {
        clock: ClockSnapshot,
    },
    GameEnded {
        status: GameStatus,
        winner: Option<PlayerColor>,
    },
    PlayerConnected {
        username: String,
        color: PlayerColor,
    },
    PlayerDisconnected {
        username: String,
        color: PlayerColor,
    },
}

/// A [`GameEvent`] stamped by the broadcast hub. Sequence numbers are
/// per-game, strictly increasing and gapless; delivery order follows the
/// emission order, not wall-clock time.
#[derive(Debug, Clone, Serialize, Deserialize, Message)]
#[rtype(result = "()")]
pub struct EventEnvelope {
    pub game_id: Uuid,
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: GameEvent,
}
