use std::time::{Duration, Instant};

use actix::prelude::*;
use log::{info, warn};
use uuid::Uuid;

use crate::error::GameError;
use crate::hub::Broadcaster;
use crate::manager::GameFinished;
use crate::models::{EventEnvelope, GameEvent, GameSnapshot, GameStatus};
use crate::session::state::SessionState;

/// How often a running game observes its clock. Flag-fall detection is
/// bounded by this interval.
pub const TICK_INTERVAL: Duration = Duration::from_millis(250);

/// How long a finished session stays alive for late snapshot reads before
/// its live resources are torn down.
pub const FINISHED_GRACE: Duration = Duration::from_secs(30);

/// Submit a move on behalf of a player.
#[derive(Message)]
#[rtype(result = "Result<GameSnapshot, GameError>")]
pub struct SubmitMove {
    pub player_id: Uuid,
    pub from: String,
    pub to: String,
    pub promotion: Option<String>,
}

/// Resign on behalf of a player.
#[derive(Message)]
#[rtype(result = "Result<GameSnapshot, GameError>")]
pub struct Resign {
    pub player_id: Uuid,
}

/// Read-only view of the session.
#[derive(Message)]
#[rtype(result = "Result<GameSnapshot, GameError>")]
pub struct GetSnapshot;

/// Attach a real-time subscription to this game's event stream.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Subscribe {
    pub subscription_id: Uuid,
    pub recipient: Recipient<EventEnvelope>,
    /// Set when the connection authenticated as one of the players.
    pub player_id: Option<Uuid>,
}

/// Detach a subscription. Disconnecting never cancels the game itself.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Unsubscribe {
    pub subscription_id: Uuid,
    pub player_id: Option<Uuid>,
}

/// Actor owning one game.
///
/// The actor mailbox is the game's single serialization point: moves,
/// resignations, clock ticks, snapshots and subscription changes are all
/// messages handled one at a time, so no two mutations of the same game can
/// ever interleave. Different games live in different actors and proceed in
/// parallel.
pub struct GameSession {
    state: SessionState,
    hub: Broadcaster,
    manager: Recipient<GameFinished>,
    tick_handle: Option<SpawnHandle>,
    finished: bool,
}

impl GameSession {
    pub fn new(state: SessionState, manager: Recipient<GameFinished>) -> Self {
        let hub = Broadcaster::new(state.game_id());
        GameSession {
            state,
            hub,
            manager,
            tick_handle: None,
            finished: false,
        }
    }

    /// Drain events emitted by the state machine into the hub, then react
    /// to a terminal transition if one happened.
    fn publish_pending(&mut self, ctx: &mut Context<Self>) {
        for event in self.state.take_events() {
            self.hub.publish(event);
        }
        if self.state.status().is_terminal() {
            self.on_terminal(ctx);
        }
    }

    /// Start the recurring clock observer once the game is in progress.
    fn ensure_ticking(&mut self, ctx: &mut Context<Self>) {
        if self.tick_handle.is_some() || self.state.status() != GameStatus::InProgress {
            return;
        }
        self.tick_handle = Some(ctx.run_interval(TICK_INTERVAL, |act, ctx| {
            // a terminal state just means there is nothing left to observe
            let _ = act.state.tick(Instant::now());
            act.publish_pending(ctx);
        }));
    }

    fn on_terminal(&mut self, ctx: &mut Context<Self>) {
        if self.finished {
            return;
        }
        self.finished = true;
        if let Some(handle) = self.tick_handle.take() {
            ctx.cancel_future(handle);
        }
        let snapshot = self.state.snapshot(Instant::now());
        info!(
            "game {}: terminal ({}), notifying manager",
            snapshot.game_id, snapshot.status
        );
        self.manager.do_send(GameFinished {
            game_id: snapshot.game_id,
            snapshot,
        });
        ctx.run_later(FINISHED_GRACE, |_act, ctx| ctx.stop());
    }
}

impl Actor for GameSession {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Context<Self>) {
        info!("game {}: session actor started", self.state.game_id());
    }

    fn stopped(&mut self, _ctx: &mut Context<Self>) {
        info!("game {}: session actor stopped", self.state.game_id());
    }
}

impl Handler<SubmitMove> for GameSession {
    type Result = Result<GameSnapshot, GameError>;

    fn handle(&mut self, msg: SubmitMove, ctx: &mut Context<Self>) -> Self::Result {
        let now = Instant::now();
        // observe the clock before the move so a pending flag-fall wins
        let _ = self.state.tick(now);
        let result = self.state.submit_move(
            msg.player_id,
            &msg.from,
            &msg.to,
            msg.promotion.as_deref(),
            now,
        );
        self.publish_pending(ctx);
        match result {
            Ok(_record) => {
                self.ensure_ticking(ctx);
                Ok(self.state.snapshot(now))
            }
            Err(err) => {
                warn!(
                    "game {}: rejected move {}{} from {}: {}",
                    self.state.game_id(),
                    msg.from,
                    msg.to,
                    msg.player_id,
                    err
                );
                Err(err)
            }
        }
    }
}

impl Handler<Resign> for GameSession {
    type Result = Result<GameSnapshot, GameError>;

    fn handle(&mut self, msg: Resign, ctx: &mut Context<Self>) -> Self::Result {
        let now = Instant::now();
        let _ = self.state.tick(now);
        let result = self.state.resign(msg.player_id, now);
        self.publish_pending(ctx);
        result.map(|()| self.state.snapshot(now))
    }
}

impl Handler<GetSnapshot> for GameSession {
    type Result = Result<GameSnapshot, GameError>;

    fn handle(&mut self, _msg: GetSnapshot, _ctx: &mut Context<Self>) -> Self::Result {
        Ok(self.state.snapshot(Instant::now()))
    }
}

impl Handler<Subscribe> for GameSession {
    type Result = ();

    fn handle(&mut self, msg: Subscribe, _ctx: &mut Context<Self>) {
        self.hub.subscribe(msg.subscription_id, msg.recipient);
        if let Some(color) = msg.player_id.and_then(|id| self.state.color_of(id)) {
            self.hub.publish(GameEvent::PlayerConnected {
                username: self.state.player(color).username.clone(),
                color,
            });
        }
    }
}

impl Handler<Unsubscribe> for GameSession {
    type Result = ();

    fn handle(&mut self, msg: Unsubscribe, _ctx: &mut Context<Self>) {
        if !self.hub.unsubscribe(msg.subscription_id) {
            return;
        }
        if let Some(color) = msg.player_id.and_then(|id| self.state.color_of(id)) {
            self.hub.publish(GameEvent::PlayerDisconnected {
                username: self.state.player(color).username.clone(),
                color,
            });
        }
    }
}
