//! Tests of the REST control surface and its error-to-status mapping.

use actix::Actor;
use actix_web::{test, web, App};
use serde_json::json;
use uuid::Uuid;

use chess_server::manager::{LoggingStore, SessionManager};
use chess_server::models::{GameSnapshot, GameStatus, PlayerColor};
use chess_server::routes::configure_routes;

macro_rules! test_app {
    () => {{
        let manager = SessionManager::new(Box::new(LoggingStore)).start();
        test::init_service(
            App::new()
                .app_data(web::Data::new(manager))
                .configure(configure_routes),
        )
        .await
    }};
}

fn create_body() -> serde_json::Value {
    json!({
        "white": { "username": "alice", "rating": 1500 },
        "black": { "username": "bob", "rating": 1400 },
        "time_control": { "initial_time": 600, "increment": 5 }
    })
}

macro_rules! create_game {
    ($app:expr) => {{
        let req = test::TestRequest::post()
            .uri("/api/games")
            .set_json(create_body())
            .to_request();
        let snapshot: GameSnapshot = test::call_and_read_body_json($app, req).await;
        snapshot
    }};
}

#[actix_web::test]
async fn create_then_poll_snapshot() {
    let app = test_app!();
    let created = create_game!(&app);
    assert_eq!(created.status, GameStatus::Waiting);
    assert_eq!(created.white.username, "alice");
    assert_eq!(created.clock.white_ms, 600_000);
    assert_eq!(created.legal_moves.len(), 20);

    let req = test::TestRequest::get()
        .uri(&format!("/api/games/{}", created.game_id))
        .to_request();
    let polled: GameSnapshot = test::call_and_read_body_json(&app, req).await;
    assert_eq!(polled.game_id, created.game_id);
    assert_eq!(polled.fen, created.fen);
}

#[actix_web::test]
async fn moves_update_the_game_and_turn() {
    let app = test_app!();
    let created = create_game!(&app);

    let req = test::TestRequest::post()
        .uri(&format!("/api/games/{}/move", created.game_id))
        .set_json(json!({ "player_id": created.white.id, "from": "e2", "to": "e4" }))
        .to_request();
    let after_white: GameSnapshot = test::call_and_read_body_json(&app, req).await;
    assert_eq!(after_white.status, GameStatus::InProgress);
    assert_eq!(after_white.move_history.len(), 1);
    assert_eq!(after_white.clock.active, Some(PlayerColor::Black));

    let req = test::TestRequest::post()
        .uri(&format!("/api/games/{}/move", created.game_id))
        .set_json(json!({ "player_id": created.black.id, "from": "e7", "to": "e5" }))
        .to_request();
    let after_black: GameSnapshot = test::call_and_read_body_json(&app, req).await;
    assert_eq!(after_black.move_history.len(), 2);
    assert_eq!(after_black.clock.active, Some(PlayerColor::White));
}

#[actix_web::test]
async fn error_kinds_map_to_status_codes() {
    let app = test_app!();
    let created = create_game!(&app);

    // unknown game: 404
    let req = test::TestRequest::get()
        .uri(&format!("/api/games/{}", Uuid::new_v4()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);

    // wrong turn: 409
    let req = test::TestRequest::post()
        .uri(&format!("/api/games/{}/move", created.game_id))
        .set_json(json!({ "player_id": created.black.id, "from": "e7", "to": "e5" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 409);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "not_players_turn");

    // illegal move: 400
    let req = test::TestRequest::post()
        .uri(&format!("/api/games/{}/move", created.game_id))
        .set_json(json!({ "player_id": created.white.id, "from": "e2", "to": "e5" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "illegal_move");

    // bad time control: 400
    let req = test::TestRequest::post()
        .uri("/api/games")
        .set_json(json!({
            "white": { "username": "alice" },
            "black": { "username": "bob" },
            "time_control": { "initial_time": 0 }
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "invalid_time_control");
}

#[actix_web::test]
async fn resign_then_further_moves_conflict() {
    let app = test_app!();
    let created = create_game!(&app);

    let req = test::TestRequest::post()
        .uri(&format!("/api/games/{}/move", created.game_id))
        .set_json(json!({ "player_id": created.white.id, "from": "d2", "to": "d4" }))
        .to_request();
    let _: GameSnapshot = test::call_and_read_body_json(&app, req).await;

    let req = test::TestRequest::post()
        .uri(&format!("/api/games/{}/resign", created.game_id))
        .set_json(json!({ "player_id": created.black.id }))
        .to_request();
    let resigned: GameSnapshot = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resigned.status, GameStatus::Resigned);
    assert_eq!(resigned.winner, Some(PlayerColor::White));
    assert!(resigned.legal_moves.is_empty());

    let req = test::TestRequest::post()
        .uri(&format!("/api/games/{}/move", created.game_id))
        .set_json(json!({ "player_id": created.white.id, "from": "e2", "to": "e4" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 409);
}

#[actix_web::test]
async fn listing_shows_live_games() {
    let app = test_app!();
    let first = create_game!(&app);
    let second = create_game!(&app);

    let req = test::TestRequest::get().uri("/api/games").to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let games = body["games"].as_array().unwrap();
    assert_eq!(games.len(), 2);
    let ids: Vec<_> = games
        .iter()
        .map(|game| game["game_id"].as_str().unwrap().to_string())
        .collect();
    assert!(ids.contains(&first.game_id.to_string()));
    assert!(ids.contains(&second.game_id.to_string()));
    assert_eq!(games[0]["status"], "waiting");
}
