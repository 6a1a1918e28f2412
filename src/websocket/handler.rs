use std::time::{Duration, Instant};

use actix::prelude::*;
use actix_web::{error::ErrorInternalServerError, web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use log::{info, warn};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::GameError;
use crate::manager::{GetSession, SessionManager};
use crate::models::{ClientMessage, EventEnvelope, ServerReply};
use crate::session::{GameSession, GetSnapshot, Resign, SubmitMove, Subscribe, Unsubscribe};

/// How often the server pings the client to keep the connection alive.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);

/// How long to wait for a pong before dropping a stale connection.
const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

/// One WebSocket connection bound to one game.
///
/// The socket is a subscription transport and nothing more: it forwards
/// client commands to the game's session actor and relays the broadcast
/// event stream back. Closing it cancels only this subscription, never the
/// game.
pub struct GameSocket {
    subscription_id: Uuid,
    game_id: Uuid,
    /// Present when the connection identified as one of the players;
    /// spectators observe but cannot act.
    player_id: Option<Uuid>,
    session: Addr<GameSession>,
    last_heartbeat: Instant,
}

impl GameSocket {
    pub fn new(game_id: Uuid, player_id: Option<Uuid>, session: Addr<GameSession>) -> Self {
        GameSocket {
            subscription_id: Uuid::new_v4(),
            game_id,
            player_id,
            session,
            last_heartbeat: Instant::now(),
        }
    }

    fn heartbeat(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.last_heartbeat) > CLIENT_TIMEOUT {
                info!(
                    "game {}: subscription {} timed out, disconnecting",
                    act.game_id, act.subscription_id
                );
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    fn reply_error(&self, err: &GameError, ctx: &mut ws::WebsocketContext<Self>) {
        self.reply(&ServerReply::error(err), ctx);
    }

    fn reply(&self, reply: &ServerReply, ctx: &mut ws::WebsocketContext<Self>) {
        match serde_json::to_string(reply) {
            Ok(text) => ctx.text(text),
            Err(err) => warn!(
                "game {}: failed to serialize reply: {}",
                self.game_id, err
            ),
        }
    }

    fn handle_message(&mut self, msg: ClientMessage, ctx: &mut ws::WebsocketContext<Self>) {
        match msg.action.as_str() {
            "move" => self.handle_move(msg, ctx),
            "resign" => self.handle_resign(ctx),
            "snapshot" => self.handle_snapshot(ctx),
            other => {
                warn!("game {}: unknown action '{}'", self.game_id, other);
                self.reply_error(
                    &GameError::IllegalMove(format!("unknown action '{}'", other)),
                    ctx,
                );
            }
        }
    }

    fn handle_move(&mut self, msg: ClientMessage, ctx: &mut ws::WebsocketContext<Self>) {
        let Some(player_id) = self.player_id else {
            self.reply_error(&GameError::NotPlayersTurn, ctx);
            return;
        };
        let (Some(from), Some(to)) = (msg.from, msg.to) else {
            self.reply_error(
                &GameError::IllegalMove("move requires from and to squares".to_string()),
                ctx,
            );
            return;
        };

        let request = self.session.send(SubmitMove {
            player_id,
            from,
            to,
            promotion: msg.promotion,
        });
        let request = actix::fut::wrap_future::<_, Self>(request).map(|sent, act, ctx| {
            match sent {
                // the applied move arrives through the broadcast stream
                Ok(Ok(_snapshot)) => {}
                Ok(Err(err)) => act.reply_error(&err, ctx),
                Err(_) => act.reply_error(&GameError::GameNotFound(act.game_id), ctx),
            }
        });
        ctx.spawn(request);
    }

    fn handle_resign(&mut self, ctx: &mut ws::WebsocketContext<Self>) {
        let Some(player_id) = self.player_id else {
            self.reply_error(&GameError::NotPlayersTurn, ctx);
            return;
        };

        let request = self.session.send(Resign { player_id });
        let request = actix::fut::wrap_future::<_, Self>(request).map(|sent, act, ctx| {
            match sent {
                Ok(Ok(_snapshot)) => {}
                Ok(Err(err)) => act.reply_error(&err, ctx),
                Err(_) => act.reply_error(&GameError::GameNotFound(act.game_id), ctx),
            }
        });
        ctx.spawn(request);
    }

    fn handle_snapshot(&mut self, ctx: &mut ws::WebsocketContext<Self>) {
        let request = self.session.send(GetSnapshot);
        let request = actix::fut::wrap_future::<_, Self>(request).map(|sent, act, ctx| {
            match sent {
                Ok(Ok(snapshot)) => act.reply(&ServerReply::Snapshot { snapshot }, ctx),
                Ok(Err(err)) => act.reply_error(&err, ctx),
                Err(_) => act.reply_error(&GameError::GameNotFound(act.game_id), ctx),
            }
        });
        ctx.spawn(request);
    }
}

impl Actor for GameSocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!(
            "game {}: subscription {} connected (player: {:?})",
            self.game_id, self.subscription_id, self.player_id
        );
        self.heartbeat(ctx);
        self.session.do_send(Subscribe {
            subscription_id: self.subscription_id,
            recipient: ctx.address().recipient(),
            player_id: self.player_id,
        });
    }

    fn stopping(&mut self, _ctx: &mut Self::Context) -> Running {
        info!(
            "game {}: subscription {} disconnected",
            self.game_id, self.subscription_id
        );
        self.session.do_send(Unsubscribe {
            subscription_id: self.subscription_id,
            player_id: self.player_id,
        });
        Running::Stop
    }
}

/// Broadcast events are relayed to the client verbatim.
impl Handler<EventEnvelope> for GameSocket {
    type Result = ();

    fn handle(&mut self, msg: EventEnvelope, ctx: &mut Self::Context) {
        match serde_json::to_string(&msg) {
            Ok(text) => ctx.text(text),
            Err(err) => warn!("game {}: failed to serialize event: {}", self.game_id, err),
        }
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for GameSocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.last_heartbeat = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.last_heartbeat = Instant::now();
            }
            Ok(ws::Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => self.handle_message(client_msg, ctx),
                Err(err) => {
                    warn!("game {}: unparseable message: {}", self.game_id, err);
                    self.reply_error(
                        &GameError::IllegalMove(format!("invalid message format: {}", err)),
                        ctx,
                    );
                }
            },
            Ok(ws::Message::Binary(_)) => {
                warn!("game {}: binary messages are not supported", self.game_id);
            }
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            _ => ctx.stop(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    #[serde(default)]
    pub player_id: Option<Uuid>,
}

/// WebSocket connection handler
pub async fn ws_index(
    req: HttpRequest,
    stream: web::Payload,
    path: web::Path<Uuid>,
    query: web::Query<WsQuery>,
    manager: web::Data<Addr<SessionManager>>,
) -> Result<HttpResponse, Error> {
    let game_id = path.into_inner();
    let session = manager
        .send(GetSession { game_id })
        .await
        .map_err(ErrorInternalServerError)??;

    let socket = GameSocket::new(game_id, query.player_id, session);
    ws::start(socket, &req, stream)
}
