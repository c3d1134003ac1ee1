use sea_orm::entity::prelude::*;
use sea_orm::QueryOrder;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::user_achievement;

/// Closed set of rule kinds an achievement may be defined with. Stored as the
/// original string tags so existing rows keep their meaning.
#[derive(Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Deserialize, Serialize, ToSchema)]
#[sea_orm(rs_type = "String", db_type = "String(Some(32))")]
#[serde(rename_all = "snake_case")]
pub enum RequirementType {
    /// Sum of scores over the user's whole history.
    #[sea_orm(string_value = "total_score")]
    TotalScore,
    /// Score of the session that triggered the evaluation.
    #[sea_orm(string_value = "single_score")]
    SingleScore,
    /// Number of recorded sessions, either overall or of the scoped game.
    #[sea_orm(string_value = "total_games")]
    TotalGames,
    /// Number of distinct games the user has played.
    #[sea_orm(string_value = "unique_games")]
    UniqueGames,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, DeriveEntityModel, ToSchema)]
#[sea_orm(table_name = "achievement")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub category: String,
    pub rarity: String,
    pub points: i32,
    pub requirement_type: RequirementType,
    pub requirement_value: i64,
    /// When set, the rule only applies to sessions of this game.
    pub game: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user_achievement::Entity")]
    UserAchievement,
}

impl Related<user_achievement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserAchievement.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Entity {
    /// All definitions, in the display order the original listing used.
    pub async fn find_ordered(db: &DatabaseConnection) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .order_by_asc(Column::Category)
            .order_by_asc(Column::RequirementValue)
            .all(db)
            .await
    }

    /// Definitions the user has no unlock record for yet.
    pub async fn find_locked(user_id: i32, db: &DatabaseConnection) -> Result<Vec<Model>, DbErr> {
        let unlocked: Vec<i32> = user_achievement::Entity::find()
            .filter(user_achievement::Column::UserId.eq(user_id))
            .all(db)
            .await?
            .into_iter()
            .map(|record| record.achievement_id)
            .collect();

        let mut candidates = Entity::find().order_by_asc(Column::Id);
        if !unlocked.is_empty() {
            candidates = candidates.filter(Column::Id.is_not_in(unlocked));
        }
        candidates.all(db).await
    }
}
