use std::collections::HashMap;

use chrono::Utc;
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::OnConflict;
use sea_orm::{LoaderTrait, QueryOrder, QuerySelect, Set};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::achievement;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, DeriveEntityModel, ToSchema)]
#[sea_orm(table_name = "user_achievement")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub achievement_id: i32,
    /// 0-100; always 100 once the record exists, partial progress is not tracked.
    pub progress: i32,
    pub unlocked_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
    belongs_to = "super::achievement::Entity",
    from = "Column::AchievementId",
    to = "super::achievement::Column::Id"
    )]
    Achievement,
}

impl Related<achievement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Achievement.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Records that the user satisfied the achievement, once.
///
/// The composite primary key makes a second attempt a no-op at the database,
/// so two evaluations racing on the same user cannot produce duplicates or
/// move `unlocked_at`. Returns whether this call created the record.
pub async fn unlock(user_id: i32, achievement_id: i32, db: &DatabaseConnection) -> Result<bool, DbErr> {
    let record = ActiveModel {
        user_id: Set(user_id),
        achievement_id: Set(achievement_id),
        progress: Set(100),
        unlocked_at: Set(Utc::now().naive_utc()),
    };
    let result = Entity::insert(record)
        .on_conflict(
            OnConflict::columns([Column::UserId, Column::AchievementId])
                .do_nothing()
                .to_owned(),
        )
        .exec(db)
        .await;
    match result {
        Ok(_) => Ok(true),
        // already unlocked, keep the original unlocked_at
        Err(DbErr::RecordNotInserted) => Ok(false),
        Err(e) => Err(e),
    }
}

impl Model {
    pub async fn find_for_user(user_id: i32, db: &DatabaseConnection) -> Result<Vec<Self>, DbErr> {
        Entity::find()
            .filter(Column::UserId.eq(user_id))
            .all(db)
            .await
    }
}

/// A definition joined with its unlock record, for the "recent unlocks" view.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UnlockedAchievement {
    pub achievement: achievement::Model,
    pub progress: i32,
    pub unlocked_at: DateTime,
}

impl UnlockedAchievement {
    pub async fn load_recent(user_id: i32, limit: u64, db: &DatabaseConnection) -> Result<Vec<Self>, DbErr> {
        let records = Entity::find()
            .filter(Column::UserId.eq(user_id))
            .order_by_desc(Column::UnlockedAt)
            .limit(limit)
            .all(db)
            .await?;
        let definitions = records.load_one(achievement::Entity, db).await?;

        Ok(records
            .into_iter()
            .zip(definitions)
            .filter_map(|(record, definition)| {
                definition.map(|definition| UnlockedAchievement {
                    achievement: definition,
                    progress: record.progress,
                    unlocked_at: record.unlocked_at,
                })
            })
            .collect::<Vec<_>>())
    }
}

/// A definition with the user's unlock state merged in, for the full listing.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AchievementWithStatus {
    pub achievement: achievement::Model,
    pub unlocked: bool,
    pub progress: i32,
    pub unlocked_at: Option<DateTime>,
}

impl AchievementWithStatus {
    pub async fn load(user_id: i32, db: &DatabaseConnection) -> Result<Vec<Self>, DbErr> {
        let definitions = achievement::Entity::find_ordered(db).await?;
        let records: HashMap<i32, Model> = Model::find_for_user(user_id, db)
            .await?
            .into_iter()
            .map(|record| (record.achievement_id, record))
            .collect();

        let mut listing: Vec<_> = definitions
            .into_iter()
            .map(|definition| {
                let record = records.get(&definition.id);
                AchievementWithStatus {
                    unlocked: record.is_some(),
                    progress: record.map(|r| r.progress).unwrap_or(0),
                    unlocked_at: record.map(|r| r.unlocked_at),
                    achievement: definition,
                }
            })
            .collect();
        // unlocked first, then the display order of find_ordered
        listing.sort_by_key(|status| !status.unlocked);
        Ok(listing)
    }
}

/// Unlock counts and reward points, for the profile header.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AchievementSummary {
    pub unlocked: i64,
    pub total: i64,
    pub total_points: i64,
}

impl AchievementSummary {
    pub async fn load(user_id: i32, db: &DatabaseConnection) -> Result<Self, DbErr> {
        let total = achievement::Entity::find().all(db).await?.len() as i64;
        let records = Model::find_for_user(user_id, db).await?;
        let unlocked = records.len() as i64;
        let definitions = records.load_one(achievement::Entity, db).await?;
        let total_points = definitions
            .into_iter()
            .flatten()
            .map(|definition| i64::from(definition.points))
            .sum();
        Ok(AchievementSummary {
            unlocked,
            total,
            total_points,
        })
    }
}
