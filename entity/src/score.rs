use std::collections::HashMap;

use chrono::Utc;
use sea_orm::entity::prelude::*;
use sea_orm::{NotSet, QueryOrder, QuerySelect, Set};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One recorded play session.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, DeriveEntityModel, ToSchema)]
#[sea_orm(table_name = "score")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub game: String,
    pub score: i32,
    pub level: i32,
    pub metadata: Json,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Session payload as submitted by the client.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewScore {
    pub game: String,
    pub score: i32,
    pub level: Option<i32>,
    pub metadata: Option<Json>,
}

impl NewScore {
    pub fn into_active_model(self, user_id: i32) -> ActiveModel {
        ActiveModel {
            id: NotSet,
            user_id: Set(user_id),
            game: Set(self.game),
            score: Set(self.score),
            level: Set(self.level.unwrap_or(1)),
            metadata: Set(self.metadata.unwrap_or_else(|| serde_json::json!({}))),
            created_at: Set(Utc::now().naive_utc()),
        }
    }
}

/// Aggregate statistics over a user's full session history.
///
/// Recomputed from scratch on every call rather than maintained incrementally;
/// the achievement rules only stay correct if these totals are consistent with
/// the whole history at evaluation time.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UserStats {
    pub total_games: i64,
    pub total_score: i64,
    pub best_score: i64,
    pub unique_games: i64,
    #[serde(skip)]
    games: HashMap<String, i64>,
}

impl UserStats {
    pub async fn load(user_id: i32, db: &DatabaseConnection) -> Result<Self, DbErr> {
        let sessions = Entity::find()
            .filter(Column::UserId.eq(user_id))
            .all(db)
            .await?;
        Ok(Self::from_sessions(&sessions))
    }

    pub fn from_sessions(sessions: &[Model]) -> Self {
        let mut stats = UserStats::default();
        for session in sessions {
            stats.total_games += 1;
            stats.total_score += i64::from(session.score);
            *stats.games.entry(session.game.clone()).or_insert(0) += 1;
        }
        stats.best_score = sessions
            .iter()
            .map(|session| i64::from(session.score))
            .max()
            .unwrap_or(0);
        stats.unique_games = stats.games.len() as i64;
        stats
    }

    /// Number of recorded sessions of one specific game.
    pub fn game_count(&self, game: &str) -> i64 {
        self.games.get(game).copied().unwrap_or(0)
    }
}

/// One row of the global leaderboard.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LeaderboardEntry {
    pub user_id: i32,
    pub total_score: i64,
    pub best_score: i64,
    pub games_played: i64,
}

impl LeaderboardEntry {
    /// Per-user totals over all games, best first.
    pub async fn global(limit: usize, db: &DatabaseConnection) -> Result<Vec<Self>, DbErr> {
        let mut by_user: HashMap<i32, Vec<Model>> = HashMap::new();
        for session in Entity::find().all(db).await? {
            by_user.entry(session.user_id).or_default().push(session);
        }
        let mut entries: Vec<_> = by_user
            .into_iter()
            .map(|(user_id, sessions)| {
                let stats = UserStats::from_sessions(&sessions);
                LeaderboardEntry {
                    user_id,
                    total_score: stats.total_score,
                    best_score: stats.best_score,
                    games_played: stats.unique_games,
                }
            })
            .collect();
        entries.sort_by(|a, b| b.total_score.cmp(&a.total_score).then(a.user_id.cmp(&b.user_id)));
        entries.truncate(limit);
        Ok(entries)
    }
}

impl Entity {
    /// Top sessions of one game, highest score first.
    pub async fn game_top(game: &str, limit: u64, db: &DatabaseConnection) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::Game.eq(game))
            .order_by_desc(Column::Score)
            .limit(limit)
            .all(db)
            .await
    }

    /// Most recent sessions across all users.
    pub async fn recent(limit: u64, db: &DatabaseConnection) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .order_by_desc(Column::CreatedAt)
            .limit(limit)
            .all(db)
            .await
    }

    /// The user's most recent sessions.
    pub async fn user_recent(user_id: i32, limit: u64, db: &DatabaseConnection) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::UserId.eq(user_id))
            .order_by_desc(Column::CreatedAt)
            .limit(limit)
            .all(db)
            .await
    }

    /// The user's best session of one game, if any.
    pub async fn user_best(user_id: i32, game: &str, db: &DatabaseConnection) -> Result<Option<Model>, DbErr> {
        Entity::find()
            .filter(Column::UserId.eq(user_id))
            .filter(Column::Game.eq(game))
            .order_by_desc(Column::Score)
            .one(db)
            .await
    }

    /// 1-based rank of the user by total score, 0 when they have no sessions.
    pub async fn user_rank(user_id: i32, db: &DatabaseConnection) -> Result<i64, DbErr> {
        let mut totals: HashMap<i32, i64> = HashMap::new();
        for session in Entity::find().all(db).await? {
            *totals.entry(session.user_id).or_insert(0) += i64::from(session.score);
        }
        let Some(own_total) = totals.get(&user_id).copied() else {
            return Ok(0);
        };
        let higher = totals.values().filter(|total| **total > own_total).count();
        Ok(higher as i64 + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(user_id: i32, game: &str, score: i32) -> Model {
        Model {
            id: 0,
            user_id,
            game: game.to_owned(),
            score,
            level: 1,
            metadata: serde_json::json!({}),
            created_at: Utc::now().naive_utc(),
        }
    }

    #[test]
    fn stats_of_empty_history_are_zero() {
        let stats = UserStats::from_sessions(&[]);
        assert_eq!(stats.total_games, 0);
        assert_eq!(stats.total_score, 0);
        assert_eq!(stats.best_score, 0);
        assert_eq!(stats.unique_games, 0);
        assert_eq!(stats.game_count("snake"), 0);
    }

    #[test]
    fn stats_fold_full_history() {
        let sessions = vec![
            session(1, "snake", 100),
            session(1, "snake", 250),
            session(1, "tetris", 40),
        ];
        let stats = UserStats::from_sessions(&sessions);
        assert_eq!(stats.total_games, 3);
        assert_eq!(stats.total_score, 390);
        assert_eq!(stats.best_score, 250);
        assert_eq!(stats.unique_games, 2);
        assert_eq!(stats.game_count("snake"), 2);
        assert_eq!(stats.game_count("tetris"), 1);
        assert_eq!(stats.game_count("pacman"), 0);
    }

    #[test]
    fn negative_scores_count_into_totals() {
        let stats = UserStats::from_sessions(&[session(1, "snake", -10)]);
        assert_eq!(stats.total_games, 1);
        assert_eq!(stats.total_score, -10);
        assert_eq!(stats.best_score, -10);
    }
}
