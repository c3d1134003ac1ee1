use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};
use entity::achievement;
use entity::user_achievement::{AchievementSummary, AchievementWithStatus, UnlockedAchievement};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::api::auth::require_authentication;
use crate::api::error_handler;
use crate::api::scores::EvaluationFailureResponse;
use crate::constant;
use crate::evaluator::{self, SessionEvent};

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    limit: Option<u64>,
}

#[get("/achievements")]
pub async fn get_achievements(req: HttpRequest, db: web::Data<DatabaseConnection>) -> impl Responder {
    if let Err(e) = require_authentication(&req).await {
        return e;
    }
    match achievement::Entity::find_ordered(db.get_ref()).await {
        Ok(achievements) => HttpResponse::Ok().json(achievements),
        Err(e) => error_handler::internal_server_error(e.to_string()),
    }
}

#[derive(Debug, Serialize)]
struct UserAchievementsResponse {
    achievements: Vec<AchievementWithStatus>,
    stats: AchievementSummary,
}

#[get("/achievements/user")]
pub async fn get_user_achievements(req: HttpRequest, db: web::Data<DatabaseConnection>) -> impl Responder {
    let user = match require_authentication(&req).await {
        Ok(user) => user,
        Err(e) => return e,
    };
    let achievements = match AchievementWithStatus::load(user.id, db.get_ref()).await {
        Ok(achievements) => achievements,
        Err(e) => return error_handler::internal_server_error(e.to_string()),
    };
    match AchievementSummary::load(user.id, db.get_ref()).await {
        Ok(stats) => HttpResponse::Ok().json(UserAchievementsResponse { achievements, stats }),
        Err(e) => error_handler::internal_server_error(e.to_string()),
    }
}

#[get("/achievements/recent")]
pub async fn get_recent_achievements(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    query: web::Query<LimitQuery>,
) -> impl Responder {
    let user = match require_authentication(&req).await {
        Ok(user) => user,
        Err(e) => return e,
    };
    match UnlockedAchievement::load_recent(user.id, query.limit.unwrap_or(5), db.get_ref()).await {
        Ok(achievements) => HttpResponse::Ok().json(achievements),
        Err(e) => error_handler::internal_server_error(e.to_string()),
    }
}

/// Re-evaluates achievements for a session the client has already submitted
/// through `POST /scores`. Kept for clients that separate the two calls.
#[post("/achievements/check")]
pub async fn check_achievements(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    payload: web::Json<SessionEvent>,
) -> impl Responder {
    let user = match require_authentication(&req).await {
        Ok(user) => user,
        Err(e) => return e,
    };
    let event = payload.into_inner();
    if event.game.is_empty() || !constant::VALID_GAMES.contains(&event.game.as_str()) {
        return error_handler::bad_request(format!("Unknown game `{}`.", event.game));
    }
    match evaluator::evaluate(user.id, &event, db.get_ref()).await {
        Ok(new_achievements) => {
            let count = new_achievements.len();
            HttpResponse::Ok().json(json!({
                "new_achievements": new_achievements,
                "count": count,
            }))
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
