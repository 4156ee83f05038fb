//! Rendition entity: a derivative of an image for one filter spec

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "image_renditions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub image_id: i64,

    /// e.g. `width-1200|format-webp`
    #[sea_orm(column_type = "Text")]
    pub filter_spec: String,

    #[sea_orm(column_type = "Text")]
    pub file: String,

    pub width: i32,

    pub height: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::image::Entity",
        from = "Column::ImageId",
        to = "super::image::Column::Id",
        on_delete = "Cascade"
    )]
    Image,
}

impl Related<super::image::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Image.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
