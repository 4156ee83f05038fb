//! Page tree node entity
//!
//! Every page of the site is one row. Position in the tree is stored as a
//! materialized path of fixed-width base-36 steps; typed page data lives in
//! side tables keyed by `id` (see `service_page` and `project_page`).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pages")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Content-type key, e.g. `servicesindexpage`
    #[sea_orm(column_type = "Text")]
    pub content_type: String,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    #[sea_orm(column_type = "Text")]
    pub slug: String,

    #[sea_orm(column_type = "Text", unique)]
    pub path: String,

    pub depth: i32,

    pub numchild: i32,

    pub live: bool,

    pub locked: bool,

    pub alias_of_id: Option<i64>,

    pub latest_revision_id: Option<i64>,

    pub live_revision_id: Option<i64>,

    pub first_published_at: Option<DateTimeWithTimeZone>,

    pub last_published_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::page_revision::Entity")]
    Revisions,

    #[sea_orm(has_one = "super::service_page::Entity")]
    ServicePage,

    #[sea_orm(has_one = "super::project_page::Entity")]
    ProjectPage,
}

impl Related<super::page_revision::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Revisions.def()
    }
}

impl Related<super::service_page::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ServicePage.def()
    }
}

impl Related<super::project_page::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProjectPage.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
