//! Site entity and its per-site settings
//!
//! Settings rows are optional; a missing row means "use defaults".

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sites")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    #[sea_orm(column_type = "Text")]
    pub hostname: String,

    pub port: i32,

    #[sea_orm(column_type = "Text")]
    pub site_name: String,

    pub root_page_id: i64,

    pub is_default_site: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::page::Entity",
        from = "Column::RootPageId",
        to = "super::page::Column::Id"
    )]
    RootPage,
}

impl Related<super::page::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RootPage.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
