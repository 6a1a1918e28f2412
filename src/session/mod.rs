pub mod actor;
pub mod state;

pub use actor::{GameSession, GetSnapshot, Resign, SubmitMove, Subscribe, Unsubscribe};
pub use state::SessionState;
