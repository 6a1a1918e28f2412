pub mod events;
pub mod game;
pub mod messages;
pub mod player;

// Re-export important types
pub use events::{EventEnvelope, GameEvent};
pub use game::{ClockSnapshot, GameSnapshot, GameStatus, GameSummary, MoveRecord, TimeControl};
pub use messages::{ClientMessage, ServerReply};
pub use player::{Player, PlayerColor};
