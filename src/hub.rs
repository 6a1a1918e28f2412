//! Fan-out of game events to live subscribers.
//!
//! The broadcaster is owned by a session actor, so publishing happens inside
//! the game's serialized step and the per-game sequence numbers it assigns
//! are strictly increasing and gapless. Delivery uses each subscriber's
//! bounded mailbox: a subscriber that cannot keep up, or whose connection
//! has closed, is dropped from the roster instead of ever blocking delivery
//! to the others.

use std::collections::HashMap;

use actix::dev::SendError;
use actix::Recipient;
use chrono::Utc;
use log::{debug, warn};
use uuid::Uuid;

use crate::models::{EventEnvelope, GameEvent};

pub struct Broadcaster {
    game_id: Uuid,
    next_seq: u64,
    subscribers: HashMap<Uuid, Recipient<EventEnvelope>>,
}

impl Broadcaster {
    pub fn new(game_id: Uuid) -> Self {
        Broadcaster {
            game_id,
            next_seq: 0,
            subscribers: HashMap::new(),
        }
    }

    pub fn subscribe(&mut self, subscription_id: Uuid, recipient: Recipient<EventEnvelope>) {
        debug!(
            "game {}: subscription {} opened",
            self.game_id, subscription_id
        );
        self.subscribers.insert(subscription_id, recipient);
    }

    pub fn unsubscribe(&mut self, subscription_id: Uuid) -> bool {
        debug!(
            "game {}: subscription {} closed",
            self.game_id, subscription_id
        );
        self.subscribers.remove(&subscription_id).is_some()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Stamp `event` with the next sequence number and deliver it to every
    /// live subscription. Returns the assigned sequence number.
    pub fn publish(&mut self, event: GameEvent) -> u64 {
        self.next_seq += 1;
        let envelope = EventEnvelope {
            game_id: self.game_id,
            seq: self.next_seq,
            timestamp: Utc::now(),
            event,
        };

        let game_id = self.game_id;
        self.subscribers.retain(|id, recipient| {
            match recipient.try_send(envelope.clone()) {
                Ok(()) => true,
                Err(SendError::Full(_)) => {
                    warn!(
                        "game {}: subscription {} cannot keep up, dropping it",
                        game_id, id
                    );
                    false
                }
                Err(SendError::Closed(_)) => {
                    debug!("game {}: subscription {} already closed", game_id, id);
                    false
                }
            }
        });

        self.next_seq
    }
}
