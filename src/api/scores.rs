use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};
use entity::achievement;
use entity::score::{self, LeaderboardEntry, NewScore, UserStats};
use sea_orm::{ActiveModelTrait, DatabaseConnection};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::auth::require_authentication;
use crate::api::error_handler;
use crate::constant;
use crate::evaluator::{self, SessionEvent};

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    limit: Option<u64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubmitScoreResponse {
    pub score_id: i32,
    pub new_achievements: Vec<achievement::Model>,
    pub count: usize,
}

/// Unlocks durably recorded before an evaluation failure are still reported,
/// not discarded.
#[derive(Debug, Serialize, ToSchema)]
pub struct EvaluationFailureResponse {
    pub message: String,
    pub new_achievements: Vec<achievement::Model>,
    pub count: usize,
}

fn validate_game(game: &str) -> Result<(), HttpResponse> {
    if game.is_empty() || !constant::VALID_GAMES.contains(&game) {
        return Err(error_handler::bad_request(format!("Unknown game `{}`.", game)));
    }
    Ok(())
}

/// Records the session, then evaluates achievements against aggregates that
/// include it.
#[post("/scores")]
pub async fn submit_score(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    payload: web::Json<NewScore>,
) -> impl Responder {
    let user = match require_authentication(&req).await {
        Ok(user) => user,
        Err(e) => return e,
    };
    let new_score = payload.into_inner();
    if let Err(e) = validate_game(&new_score.game) {
        return e;
    }

    let event = SessionEvent {
        game: new_score.game.clone(),
        score: new_score.score,
        level: new_score.level,
    };
    let recorded = match new_score.into_active_model(user.id).insert(db.get_ref()).await {
        Ok(model) => model,
        Err(e) => return error_handler::internal_server_error(e.to_string()),
    };

    match evaluator::evaluate(user.id, &event, db.get_ref()).await {
        Ok(new_achievements) => {
            let count = new_achievements.len();
            HttpResponse::Created().json(SubmitScoreResponse {
                score_id: recorded.id,
                new_achievements,
                count,
            })
        }
        Err(e) => {
            log::error!("evaluation failed for user {}: {}", user.id, e);
            let count = e.unlocked.len();
            HttpResponse::InternalServerError().json(EvaluationFailureResponse {
                message: e.to_string(),
                new_achievements: e.unlocked,
                count,
            })
        }
    }
}

#[utoipa::path(
responses(
(status = 200, description = "Per-user score totals over all games, best first."),
)
)]
#[get("/scores/leaderboard")]
pub async fn global_leaderboard(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    query: web::Query<LimitQuery>,
) -> impl Responder {
    if let Err(e) = require_authentication(&req).await {
        return e;
    }
    let limit = query.limit.unwrap_or(10) as usize;
    match LeaderboardEntry::global(limit, db.get_ref()).await {
        Ok(leaderboard) => HttpResponse::Ok().json(leaderboard),
        Err(e) => error_handler::internal_server_error(e.to_string()),
    }
}

#[get("/scores/leaderboard/{game}")]
pub async fn game_leaderboard(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    path: web::Path<String>,
    query: web::Query<LimitQuery>,
) -> impl Responder {
    if let Err(e) = require_authentication(&req).await {
        return e;
    }
    let game = path.into_inner();
    if let Err(e) = validate_game(&game) {
        return e;
    }
    match score::Entity::game_top(&game, query.limit.unwrap_or(10), db.get_ref()).await {
        Ok(leaderboard) => HttpResponse::Ok().json(leaderboard),
        Err(e) => error_handler::internal_server_error(e.to_string()),
    }
}

#[get("/scores/recent")]
pub async fn recent_scores(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    query: web::Query<LimitQuery>,
) -> impl Responder {
    if let Err(e) = require_authentication(&req).await {
        return e;
    }
    match score::Entity::recent(query.limit.unwrap_or(20), db.get_ref()).await {
        Ok(scores) => HttpResponse::Ok().json(scores),
        Err(e) => error_handler::internal_server_error(e.to_string()),
    }
}

#[derive(Debug, Serialize)]
struct UserStatsResponse {
    #[serde(flatten)]
    stats: UserStats,
    rank: i64,
}

#[get("/scores/user/stats")]
pub async fn user_stats(req: HttpRequest, db: web::Data<DatabaseConnection>) -> impl Responder {
    let user = match require_authentication(&req).await {
        Ok(user) => user,
        Err(e) => return e,
    };
    let stats = match UserStats::load(user.id, db.get_ref()).await {
        Ok(stats) => stats,
        Err(e) => return error_handler::internal_server_error(e.to_string()),
    };
    match score::Entity::user_rank(user.id, db.get_ref()).await {
        Ok(rank) => HttpResponse::Ok().json(UserStatsResponse { stats, rank }),
        Err(e) => error_handler::internal_server_error(e.to_string()),
    }
}

#[get("/scores/user")]
pub async fn user_scores(req: HttpRequest, db: web::Data<DatabaseConnection>) -> impl Responder {
    let user = match require_authentication(&req).await {
        Ok(user) => user,
        Err(e) => return e,
    };
    match score::Entity::user_recent(user.id, 50, db.get_ref()).await {
        Ok(scores) => HttpResponse::Ok().json(scores),
        Err(e) => error_handler::internal_server_error(e.to_string()),
    }
}

#[get("/scores/user/{game}")]
pub async fn user_best_score(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    path: web::Path<String>,
) -> impl Responder {
    let user = match require_authentication(&req).await {
        Ok(user) => user,
        Err(e) => return e,
    };
    let game = path.into_inner();
    if let Err(e) = validate_game(&game) {
        return e;
    }
    match score::Entity::user_best(user.id, &game, db.get_ref()).await {
        Ok(best) => HttpResponse::Ok().json(best),
        Err(e) => error_handler::internal_server_error(e.to_string()),
    }
}
