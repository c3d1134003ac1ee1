mod api;
mod constant;
mod evaluator;

use std::env;

use actix_web::{get, middleware, web, App, HttpResponse, HttpServer, Responder};
use api::{achievements, scores};
use dotenv::dotenv;
use sea_orm::{Database, DatabaseConnection};

#[get("/")]
pub async fn hello() -> impl Responder {
    HttpResponse::Ok().body("Arcade platform backend is running.")
}

fn config(cfg: &mut web::ServiceConfig) {
    // literal segments before `{game}` so `/scores/user/stats` wins
    cfg.service(hello)
        .service(scores::submit_score)
        .service(scores::global_leaderboard)
        .service(scores::game_leaderboard)
        .service(scores::recent_scores)
        .service(scores::user_stats)
        .service(scores::user_scores)
        .service(scores::user_best_score)
        .service(achievements::get_achievements)
        .service(achievements::get_user_achievements)
        .service(achievements::get_recent_achievements)
        .service(achievements::check_achievements);
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let db: DatabaseConnection = Database::connect(env::var(constant::ENV_DB_URL).unwrap())
        .await
        .unwrap();
    log::info!("starting arcade backend on 0.0.0.0:8080");
    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .configure(config)
            .app_data(web::Data::new(db.clone()))
    })
    .bind(("0.0.0.0", 8080))?
    .run()
    .await
}
