//! Achievement evaluation for a just-completed play session.
//!
//! The caller records the session first and evaluates second, so the
//! recomputed aggregates already include the triggering session. Rules that
//! compare against totals count the session being evaluated.

use entity::achievement::{self, RequirementType};
use entity::score::UserStats;
use entity::user_achievement;
use sea_orm::{DatabaseConnection, DbErr};
use serde::Deserialize;
use thiserror::Error;
use utoipa::ToSchema;

/// The just-completed session that triggers an evaluation.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SessionEvent {
    pub game: String,
    pub score: i32,
    pub level: Option<i32>,
}

/// Evaluation failed partway. `unlocked` holds the definitions whose unlock
/// records were durably written before the failing operation, so the caller
/// can still report them to the user.
#[derive(Debug, Error)]
#[error("achievement evaluation failed after {} unlock(s): {source}", .unlocked.len())]
pub struct EvaluationError {
    pub unlocked: Vec<achievement::Model>,
    #[source]
    pub source: DbErr,
}

/// Whether one definition is satisfied by the user's aggregates and the
/// triggering session. A definition scoped to a game can only be satisfied by
/// a session of that game, whatever its rule kind.
pub fn qualifies(definition: &achievement::Model, stats: &UserStats, event: &SessionEvent) -> bool {
    if let Some(scope) = &definition.game {
        if scope != &event.game {
            return false;
        }
    }
    match definition.requirement_type {
        RequirementType::TotalScore => stats.total_score >= definition.requirement_value,
        RequirementType::SingleScore => i64::from(event.score) >= definition.requirement_value,
        RequirementType::TotalGames => match &definition.game {
            // scoped: dedicated per-game count, not the all-games total
            Some(scope) => stats.game_count(scope) >= definition.requirement_value,
            None => stats.total_games >= definition.requirement_value,
        },
        RequirementType::UniqueGames => stats.unique_games >= definition.requirement_value,
    }
}

/// Unlocks every not-yet-unlocked definition the session now satisfies and
/// returns them, display fields included, for the caller to notify the user.
///
/// Precondition: `event` is already recorded in the score table; the
/// aggregates are recomputed from the full history and therefore include it.
/// A definition that loses the unlock race to a concurrent evaluation is
/// silently skipped rather than reported twice.
pub async fn evaluate(
    user_id: i32,
    event: &SessionEvent,
    db: &DatabaseConnection,
) -> Result<Vec<achievement::Model>, EvaluationError> {
    let stats = UserStats::load(user_id, db).await.map_err(|source| EvaluationError {
        unlocked: Vec::new(),
        source,
    })?;
    let candidates = achievement::Entity::find_locked(user_id, db)
        .await
        .map_err(|source| EvaluationError {
            unlocked: Vec::new(),
            source,
        })?;

    let mut newly_unlocked = Vec::new();
    for definition in candidates {
        if !qualifies(&definition, &stats, event) {
            continue;
        }
        match user_achievement::unlock(user_id, definition.id, db).await {
            Ok(true) => newly_unlocked.push(definition),
            Ok(false) => {}
            Err(source) => {
                return Err(EvaluationError {
                    unlocked: newly_unlocked,
                    source,
                })
            }
        }
    }
    Ok(newly_unlocked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use entity::score;

    fn definition(
        requirement_type: RequirementType,
        requirement_value: i64,
        game: Option<&str>,
    ) -> achievement::Model {
        achievement::Model {
            id: 1,
            name: "test".to_owned(),
            description: String::new(),
            icon: String::new(),
            category: "score".to_owned(),
            rarity: "common".to_owned(),
            points: 10,
            requirement_type,
            requirement_value,
            game: game.map(str::to_owned),
        }
    }

    fn event(game: &str, score: i32) -> SessionEvent {
        SessionEvent {
            game: game.to_owned(),
            score,
            level: None,
        }
    }

    fn stats_for(sessions: &[(&str, i32)]) -> UserStats {
        let models: Vec<score::Model> = sessions
            .iter()
            .enumerate()
            .map(|(i, (game, points))| score::Model {
                id: i as i32,
                user_id: 1,
                game: (*game).to_owned(),
                score: *points,
                level: 1,
                metadata: serde_json::json!({}),
                created_at: chrono::Utc::now().naive_utc(),
            })
            .collect();
        UserStats::from_sessions(&models)
    }

    #[test]
    fn scoped_rule_ignores_sessions_of_other_games() {
        let def = definition(RequirementType::TotalGames, 5, Some("snake"));
        let stats = stats_for(&[("snake", 1); 5]);
        // count satisfied, but the triggering session is a different game
        assert!(!qualifies(&def, &stats, &event("tetris", 1)));
        assert!(qualifies(&def, &stats, &event("snake", 1)));
    }

    #[test]
    fn scoped_total_games_uses_the_per_game_count() {
        let def = definition(RequirementType::TotalGames, 5, Some("snake"));
        let stats = stats_for(&[("snake", 1), ("snake", 1), ("tetris", 1), ("tetris", 1), ("tetris", 1)]);
        // five sessions overall, only two of snake
        assert!(!qualifies(&def, &stats, &event("snake", 1)));
    }

    #[test]
    fn single_score_compares_the_triggering_session() {
        let def = definition(RequirementType::SingleScore, 100, None);
        let stats = stats_for(&[("snake", 99), ("snake", 99)]);
        assert!(!qualifies(&def, &stats, &event("snake", 99)));
        assert!(qualifies(&def, &stats, &event("snake", 100)));
    }

    #[test]
    fn total_score_compares_the_aggregate() {
        let def = definition(RequirementType::TotalScore, 150, None);
        assert!(!qualifies(&def, &stats_for(&[("snake", 149)]), &event("snake", 149)));
        assert!(qualifies(&def, &stats_for(&[("snake", 100), ("tetris", 50)]), &event("tetris", 50)));
    }

    #[test]
    fn unique_games_counts_distinct_games() {
        let def = definition(RequirementType::UniqueGames, 3, None);
        let two = stats_for(&[("snake", 1), ("snake", 1), ("tetris", 1)]);
        assert!(!qualifies(&def, &two, &event("snake", 1)));
        let three = stats_for(&[("snake", 1), ("tetris", 1), ("pacman", 1)]);
        assert!(qualifies(&def, &three, &event("pacman", 1)));
    }

    #[test]
    fn zero_threshold_qualifies_immediately() {
        let def = definition(RequirementType::TotalScore, 0, None);
        assert!(qualifies(&def, &stats_for(&[]), &event("snake", 0)));
    }
}
