use actix::Actor;
use actix_web::{web, App, HttpServer};
use log::info;

use chess_server::manager::{LoggingStore, SessionManager};
use chess_server::routes::configure_routes;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let bind_addr =
        std::env::var("CHESS_SERVER_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());

    // One registry actor owns all live game sessions
    let manager = SessionManager::new(Box::new(LoggingStore)).start();
    let manager = web::Data::new(manager);

    info!("starting chess server at http://{}", bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(manager.clone())
            .configure(configure_routes)
    })
    .bind(bind_addr)?
    .run()
    .await
}
