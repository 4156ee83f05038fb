//! Geographic area entity (city or neighborhood)

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of area
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeoAreaType {
    City,
    Neighborhood,
}

impl GeoAreaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeoAreaType::City => "city",
            GeoAreaType::Neighborhood => "neighborhood",
        }
    }
}

impl From<&str> for GeoAreaType {
    fn from(s: &str) -> Self {
        match s {
            "neighborhood" => GeoAreaType::Neighborhood,
            _ => GeoAreaType::City,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "geo_areas")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    #[sea_orm(column_name = "type", column_type = "Text")]
    pub area_type: String,

    #[sea_orm(column_type = "Text")]
    pub name: String,

    #[sea_orm(column_type = "Text", unique)]
    pub slug: String,

    pub parent_city_id: Option<i64>,

    #[sea_orm(column_type = "Text", nullable)]
    pub geojson: Option<String>,

    pub center_lat: Option<f64>,

    pub center_lng: Option<f64>,

    #[sea_orm(column_type = "Text")]
    pub population_note: String,

    /// List of `{"type": "link", "value": {"label", "url"}}` blocks
    #[sea_orm(column_type = "JsonBinary")]
    pub permits_links: Json,
}

impl Model {
    pub fn kind(&self) -> GeoAreaType {
        GeoAreaType::from(self.area_type.as_str())
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::ParentCityId",
        to = "Column::Id",
        on_delete = "SetNull"
    )]
    ParentCity,

    #[sea_orm(has_many = "super::service_coverage::Entity")]
    Coverages,

    #[sea_orm(has_many = "super::testimonial::Entity")]
    Testimonials,
}

impl Related<super::service_coverage::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Coverages.def()
    }
}

impl Related<super::testimonial::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Testimonials.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
