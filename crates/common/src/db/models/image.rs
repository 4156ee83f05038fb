//! Stored image and its renditions

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "images")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    /// File path relative to the media root
    #[sea_orm(column_type = "Text")]
    pub file: String,

    pub width: i32,

    pub height: i32,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::rendition::Entity")]
    Renditions,
}

impl Related<super::rendition::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Renditions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
