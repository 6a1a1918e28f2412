//! Timed chess game server.
//!
//! Each game runs inside its own actor, which serializes every mutation
//! (moves, resignations, clock ticks) through a single mailbox:
//! - game/: clock arithmetic and the move validator over the `chess` crate
//! - session/: the per-game state machine and its owning actor
//! - hub: fan-out of sequenced game events to subscribers
//! - manager: the registry actor mapping game ids to live sessions
//! - routes/ and websocket/: the REST and real-time boundaries

pub mod error;
pub mod game;
pub mod hub;
pub mod manager;
pub mod models;
pub mod routes;
pub mod session;
pub mod websocket;

pub use error::{GameError, Result};
