//! Registry of live game sessions.
//!
//! One `SessionManager` actor owns the `game_id -> session` map, so every
//! operation on a given game funnels through the single owning
//! [`GameSession`] instance — there is no second path to a game's state.
//! Finished games are handed to the persistence collaborator once, kept in
//! an in-memory archive, and evicted from the live table after a grace
//! period.

use std::collections::HashMap;

use actix::prelude::*;
use chrono::{DateTime, Utc};
use log::info;
use uuid::Uuid;

use crate::error::GameError;
use crate::models::{GameSnapshot, Player, TimeControl};
use crate::session::actor::{GameSession, FINISHED_GRACE};
use crate::session::state::SessionState;

/// Persistence collaborator: receives each finished game's final snapshot,
/// exactly once per terminal transition.
pub trait GameStore: Send {
    fn store_finished(&self, snapshot: &GameSnapshot);
}

/// Default store: log the result and keep nothing.
pub struct LoggingStore;

impl GameStore for LoggingStore {
    fn store_finished(&self, snapshot: &GameSnapshot) {
        info!(
            "game {} over after {} moves: {} (winner: {:?})",
            snapshot.game_id,
            snapshot.move_history.len(),
            snapshot.status,
            snapshot.winner
        );
    }
}

/// Create a new game with both players registered. Responds with the
/// initial snapshot (status `waiting`).
#[derive(Message)]
#[rtype(result = "Result<GameSnapshot, GameError>")]
pub struct CreateGame {
    pub white: Player,
    pub black: Player,
    pub time_control: TimeControl,
}

/// Look up the live session for a mutating operation.
#[derive(Message)]
#[rtype(result = "Result<Addr<GameSession>, GameError>")]
pub struct GetSession {
    pub game_id: Uuid,
}

/// Look up a game for reading, live or archived.
#[derive(Message)]
#[rtype(result = "Result<GameRef, GameError>")]
pub struct GetGame {
    pub game_id: Uuid,
}

pub enum GameRef {
    Live(Addr<GameSession>),
    Finished(GameSnapshot),
}

/// Handles to every live session, for building listing summaries.
#[derive(Message)]
#[rtype(result = "Result<Vec<SessionHandle>, GameError>")]
pub struct ListGames;

#[derive(Clone)]
pub struct SessionHandle {
    pub game_id: Uuid,
    pub addr: Addr<GameSession>,
}

/// Sent by a session actor on its terminal transition.
#[derive(Message)]
#[rtype(result = "()")]
pub struct GameFinished {
    pub game_id: Uuid,
    pub snapshot: GameSnapshot,
}

struct SessionEntry {
    addr: Addr<GameSession>,
    created_at: DateTime<Utc>,
}

pub struct SessionManager {
    sessions: HashMap<Uuid, SessionEntry>,
    archive: HashMap<Uuid, GameSnapshot>,
    store: Box<dyn GameStore>,
    grace: std::time::Duration,
}

impl SessionManager {
    pub fn new(store: Box<dyn GameStore>) -> Self {
        SessionManager {
            sessions: HashMap::new(),
            archive: HashMap::new(),
            store,
            grace: FINISHED_GRACE,
        }
    }

    /// Shorten the eviction grace period. Test hook.
    pub fn with_grace(mut self, grace: std::time::Duration) -> Self {
        self.grace = grace;
        self
    }
}

impl Actor for SessionManager {
    type Context = Context<Self>;
}

impl Handler<CreateGame> for SessionManager {
    type Result = Result<GameSnapshot, GameError>;

    fn handle(&mut self, msg: CreateGame, ctx: &mut Context<Self>) -> Self::Result {
        let game_id = Uuid::new_v4();
        let state = SessionState::new(game_id, msg.white, msg.black, msg.time_control)?;
        let snapshot = state.snapshot(std::time::Instant::now());

        let session = GameSession::new(state, ctx.address().recipient());
        let addr = session.start();
        self.sessions.insert(
            game_id,
            SessionEntry {
                addr,
                created_at: Utc::now(),
            },
        );
        info!(
            "created game {} ({} vs {})",
            game_id, snapshot.white.username, snapshot.black.username
        );
        Ok(snapshot)
    }
}

impl Handler<GetSession> for SessionManager {
    type Result = Result<Addr<GameSession>, GameError>;

    fn handle(&mut self, msg: GetSession, _ctx: &mut Context<Self>) -> Self::Result {
        if let Some(entry) = self.sessions.get(&msg.game_id) {
            return Ok(entry.addr.clone());
        }
        // evicted but archived games are known, just no longer mutable
        if let Some(snapshot) = self.archive.get(&msg.game_id) {
            return Err(GameError::GameNotActive(snapshot.status));
        }
        Err(GameError::GameNotFound(msg.game_id))
    }
}

impl Handler<GetGame> for SessionManager {
    type Result = Result<GameRef, GameError>;

    fn handle(&mut self, msg: GetGame, _ctx: &mut Context<Self>) -> Self::Result {
        if let Some(entry) = self.sessions.get(&msg.game_id) {
            return Ok(GameRef::Live(entry.addr.clone()));
        }
        if let Some(snapshot) = self.archive.get(&msg.game_id) {
            return Ok(GameRef::Finished(snapshot.clone()));
        }
        Err(GameError::GameNotFound(msg.game_id))
    }
}

impl Handler<ListGames> for SessionManager {
    type Result = Result<Vec<SessionHandle>, GameError>;

    fn handle(&mut self, _msg: ListGames, _ctx: &mut Context<Self>) -> Self::Result {
        let mut entries: Vec<_> = self.sessions.iter().collect();
        entries.sort_by_key(|(_, entry)| entry.created_at);
        Ok(entries
            .into_iter()
            .map(|(game_id, entry)| SessionHandle {
                game_id: *game_id,
                addr: entry.addr.clone(),
            })
            .collect())
    }
}

impl Handler<GameFinished> for SessionManager {
    type Result = ();

    fn handle(&mut self, msg: GameFinished, ctx: &mut Context<Self>) {
        self.store.store_finished(&msg.snapshot);
        self.archive.insert(msg.game_id, msg.snapshot);

        let game_id = msg.game_id;
        ctx.run_later(self.grace, move |act, _ctx| {
            if act.sessions.remove(&game_id).is_some() {
                info!("evicted finished game {} from the registry", game_id);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GameStatus, PlayerColor};
    use crate::session::actor::{GetSnapshot, Resign, SubmitMove};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    fn player(name: &str) -> Player {
        Player {
            id: Uuid::new_v4(),
            username: name.to_string(),
            rating: 1200,
        }
    }

    fn time_control() -> TimeControl {
        TimeControl {
            initial_time: 600,
            increment: 5,
        }
    }

    struct RecordingStore {
        stored: Arc<Mutex<Vec<Uuid>>>,
    }

    impl GameStore for RecordingStore {
        fn store_finished(&self, snapshot: &GameSnapshot) {
            self.stored.lock().unwrap().push(snapshot.game_id);
        }
    }

    #[actix_rt::test]
    async fn create_get_and_list() {
        let manager = SessionManager::new(Box::new(LoggingStore)).start();
        let snapshot = manager
            .send(CreateGame {
                white: player("alice"),
                black: player("bob"),
                time_control: time_control(),
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(snapshot.status, GameStatus::Waiting);

        let addr = manager
            .send(GetSession {
                game_id: snapshot.game_id,
            })
            .await
            .unwrap()
            .unwrap();
        let live = addr.send(GetSnapshot).await.unwrap().unwrap();
        assert_eq!(live.game_id, snapshot.game_id);

        let handles = manager.send(ListGames).await.unwrap().unwrap();
        assert_eq!(handles.len(), 1);
        assert_eq!(handles[0].game_id, snapshot.game_id);
    }

    #[actix_rt::test]
    async fn unknown_game_is_not_found() {
        let manager = SessionManager::new(Box::new(LoggingStore)).start();
        let err = manager
            .send(GetSession {
                game_id: Uuid::new_v4(),
            })
            .await
            .unwrap()
            .unwrap_err();
        assert!(matches!(err, GameError::GameNotFound(_)));
    }

    #[actix_rt::test]
    async fn invalid_time_control_is_rejected_at_creation() {
        let manager = SessionManager::new(Box::new(LoggingStore)).start();
        let err = manager
            .send(CreateGame {
                white: player("alice"),
                black: player("bob"),
                time_control: TimeControl {
                    initial_time: 0,
                    increment: 0,
                },
            })
            .await
            .unwrap()
            .unwrap_err();
        assert!(matches!(err, GameError::InvalidTimeControl(_)));
    }

    #[actix_rt::test]
    async fn finished_game_is_stored_once_archived_and_evicted() {
        let stored = Arc::new(Mutex::new(Vec::new()));
        let manager = SessionManager::new(Box::new(RecordingStore {
            stored: stored.clone(),
        }))
        .with_grace(Duration::from_millis(50))
        .start();

        let snapshot = manager
            .send(CreateGame {
                white: player("alice"),
                black: player("bob"),
                time_control: time_control(),
            })
            .await
            .unwrap()
            .unwrap();
        let game_id = snapshot.game_id;
        let white_id = snapshot.white.id;

        let addr = manager.send(GetSession { game_id }).await.unwrap().unwrap();
        addr.send(SubmitMove {
            player_id: white_id,
            from: "e2".to_string(),
            to: "e4".to_string(),
            promotion: None,
        })
        .await
        .unwrap()
        .unwrap();
        addr.send(Resign {
            player_id: white_id,
        })
        .await
        .unwrap()
        .unwrap();

        actix_rt::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(stored.lock().unwrap().as_slice(), &[game_id]);

        // after the grace period the game is archived, not forgotten
        let err = manager.send(GetSession { game_id }).await.unwrap().unwrap_err();
        assert!(matches!(
            err,
            GameError::GameNotActive(GameStatus::Resigned)
        ));
        match manager.send(GetGame { game_id }).await.unwrap().unwrap() {
            GameRef::Finished(archived) => {
                assert_eq!(archived.status, GameStatus::Resigned);
                assert_eq!(archived.winner, Some(PlayerColor::Black));
            }
            GameRef::Live(_) => panic!("game should be archived after the grace period"),
        }
    }
}
