//! REST control surface. Each handler maps 1:1 onto a session or manager
//! operation; error kinds map onto status codes via `ResponseError`.

use actix::{Addr, MailboxError};
use actix_web::{error::ErrorInternalServerError, web, Error, HttpResponse};
use futures::future::join_all;
use log::warn;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::GameError;
use crate::manager::{
    CreateGame, GameRef, GetGame, GetSession, ListGames, SessionManager,
};
use crate::models::{GameSummary, Player, TimeControl};
use crate::session::{GetSnapshot, Resign, SubmitMove};

#[derive(Debug, Deserialize)]
pub struct CreateGameRequest {
    pub white: Player,
    pub black: Player,
    pub time_control: TimeControl,
}

#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    pub player_id: Uuid,
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub promotion: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResignRequest {
    pub player_id: Uuid,
}

/// Configure the HTTP routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/games", web::post().to(create_game))
            .route("/games", web::get().to(list_games))
            .route("/games/{game_id}", web::get().to(get_game))
            .route("/games/{game_id}/move", web::post().to(submit_move))
            .route("/games/{game_id}/resign", web::post().to(resign)),
    )
    .service(
        web::resource("/ws/games/{game_id}").route(web::get().to(crate::websocket::ws_index)),
    );
}

/// A stopped session means the game left the registry between lookup and
/// delivery; report it the way a registry miss would be reported.
fn session_gone(game_id: Uuid) -> impl FnOnce(MailboxError) -> GameError {
    move |_| GameError::GameNotFound(game_id)
}

async fn create_game(
    manager: web::Data<Addr<SessionManager>>,
    request: web::Json<CreateGameRequest>,
) -> Result<HttpResponse, Error> {
    let request = request.into_inner();
    let snapshot = manager
        .send(CreateGame {
            white: request.white,
            black: request.black,
            time_control: request.time_control,
        })
        .await
        .map_err(ErrorInternalServerError)??;
    Ok(HttpResponse::Ok().json(snapshot))
}

async fn list_games(manager: web::Data<Addr<SessionManager>>) -> Result<HttpResponse, Error> {
    let handles = manager
        .send(ListGames)
        .await
        .map_err(ErrorInternalServerError)??;

    let snapshots = join_all(
        handles
            .into_iter()
            .map(|handle| async move { handle.addr.send(GetSnapshot).await }),
    )
    .await;

    let games: Vec<GameSummary> = snapshots
        .into_iter()
        .filter_map(|sent| match sent {
            Ok(Ok(snapshot)) => Some(snapshot.summary()),
            // a session that stopped mid-listing just drops out
            _ => None,
        })
        .collect();

    Ok(HttpResponse::Ok().json(serde_json::json!({ "games": games })))
}

async fn get_game(
    manager: web::Data<Addr<SessionManager>>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, Error> {
    let game_id = path.into_inner();
    let game = manager
        .send(GetGame { game_id })
        .await
        .map_err(ErrorInternalServerError)??;

    let snapshot = match game {
        GameRef::Live(addr) => addr
            .send(GetSnapshot)
            .await
            .map_err(session_gone(game_id))??,
        GameRef::Finished(snapshot) => snapshot,
    };
    Ok(HttpResponse::Ok().json(snapshot))
}

async fn submit_move(
    manager: web::Data<Addr<SessionManager>>,
    path: web::Path<Uuid>,
    request: web::Json<MoveRequest>,
) -> Result<HttpResponse, Error> {
    let game_id = path.into_inner();
    let request = request.into_inner();
    let addr = manager
        .send(GetSession { game_id })
        .await
        .map_err(ErrorInternalServerError)??;

    let snapshot = addr
        .send(SubmitMove {
            player_id: request.player_id,
            from: request.from,
            to: request.to,
            promotion: request.promotion,
        })
        .await
        .map_err(session_gone(game_id))?
        .map_err(|err| {
            warn!("game {}: move rejected: {}", game_id, err);
            err
        })?;
    Ok(HttpResponse::Ok().json(snapshot))
}

async fn resign(
    manager: web::Data<Addr<SessionManager>>,
    path: web::Path<Uuid>,
    request: web::Json<ResignRequest>,
) -> Result<HttpResponse, Error> {
    let game_id = path.into_inner();
    let addr = manager
        .send(GetSession { game_id })
        .await
        .map_err(ErrorInternalServerError)??;

    let snapshot = addr
        .send(Resign {
            player_id: request.player_id,
        })
        .await
        .map_err(session_gone(game_id))??;
    Ok(HttpResponse::Ok().json(snapshot))
}
