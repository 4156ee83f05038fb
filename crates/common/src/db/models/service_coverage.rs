//! Service coverage entity: one service offered in one geo area

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Editorial status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageStatus {
    Draft,
    Ready,
}

impl CoverageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoverageStatus::Draft => "draft",
            CoverageStatus::Ready => "ready",
        }
    }
}

impl From<&str> for CoverageStatus {
    fn from(s: &str) -> Self {
        match s {
            "ready" => CoverageStatus::Ready,
            _ => CoverageStatus::Draft,
        }
    }
}

/// Unique per (service_id, geoarea_id)
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "service_coverages")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Service page id
    pub service_id: i64,

    pub geoarea_id: i64,

    #[sea_orm(column_type = "Text")]
    pub status: String,

    #[sea_orm(column_type = "Text")]
    pub unique_intro: String,

    #[sea_orm(column_type = "JsonBinary")]
    pub pain_points_local: Json,

    #[sea_orm(column_type = "JsonBinary")]
    pub process_steps_local: Json,

    #[sea_orm(column_type = "JsonBinary")]
    pub permits_local: Json,

    #[sea_orm(column_type = "Text")]
    pub starting_price_local: String,

    #[sea_orm(column_type = "Text")]
    pub cta_local: String,

    pub hero_image_id: Option<i64>,

    #[sea_orm(column_type = "JsonBinary")]
    pub schema_overrides: Json,
}

impl Model {
    pub fn coverage_status(&self) -> CoverageStatus {
        CoverageStatus::from(self.status.as_str())
    }

    /// The three local module streams, in display order
    pub fn module_streams(&self) -> [&Json; 3] {
        [
            &self.pain_points_local,
            &self.process_steps_local,
            &self.permits_local,
        ]
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::page::Entity",
        from = "Column::ServiceId",
        to = "super::page::Column::Id",
        on_delete = "Cascade"
    )]
    Service,

    #[sea_orm(
        belongs_to = "super::geo_area::Entity",
        from = "Column::GeoareaId",
        to = "super::geo_area::Column::Id",
        on_delete = "Cascade"
    )]
    GeoArea,
}

impl Related<super::geo_area::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GeoArea.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
