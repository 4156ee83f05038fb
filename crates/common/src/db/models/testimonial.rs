//! Testimonial entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "testimonials")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    #[sea_orm(column_type = "Text")]
    pub name: String,

    /// 1..=5, enforced by a check constraint
    pub rating: i16,

    #[sea_orm(column_type = "Text")]
    pub source: String,

    #[sea_orm(column_type = "Text")]
    pub quote: String,

    pub date: Option<Date>,

    /// Optional local SEO anchor; cleared when the area is deleted
    pub geoarea_id: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::geo_area::Entity",
        from = "Column::GeoareaId",
        to = "super::geo_area::Column::Id",
        on_delete = "SetNull"
    )]
    GeoArea,
}

impl Related<super::geo_area::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GeoArea.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
