use serde::{Deserialize, Serialize};

use crate::error::GameError;
use crate::models::game::GameSnapshot;

/// Message sent from a WebSocket client to the server.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientMessage {
    pub action: String,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub promotion: Option<String>,
}

/// Direct reply to a WebSocket client command. Game events are not replies;
/// they arrive separately as broadcast envelopes.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerReply {
    Snapshot { snapshot: GameSnapshot },
    Error { code: &'static str, message: String },
}

impl ServerReply {
    pub fn error(err: &GameError) -> Self {
        ServerReply::Error {
            code: err.kind(),
            message: err.to_string(),
        }
    }
}
