//! Local SEO toggles for a site

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "local_seo_settings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub site_id: i64,

    pub local_seo_enabled: bool,

    #[sea_orm(column_type = "Text")]
    pub primary_city_slug: String,

    #[sea_orm(column_type = "Text")]
    pub gbp_url: String,

    pub service_radius_km: i32,

    #[sea_orm(column_type = "Text")]
    pub default_utm_source: String,

    #[sea_orm(column_type = "Text")]
    pub default_utm_campaign: String,
}

impl Model {
    pub fn defaults_for(site_id: i64) -> Self {
        Self {
            site_id,
            local_seo_enabled: false,
            primary_city_slug: String::new(),
            gbp_url: String::new(),
            service_radius_km: 0,
            default_utm_source: String::new(),
            default_utm_campaign: String::new(),
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
