//! Theme and contact settings for a site

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "site_settings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub site_id: i64,

    // Theme tokens
    #[sea_orm(column_type = "Text")]
    pub primary: String,
    #[sea_orm(column_type = "Text")]
    pub accent: String,
    #[sea_orm(column_type = "Text")]
    pub neutral: String,
    #[sea_orm(column_type = "Text")]
    pub radius: String,
    #[sea_orm(column_type = "Text")]
    pub font_body: String,
    #[sea_orm(column_type = "Text")]
    pub font_heading: String,
    #[sea_orm(column_type = "Text")]
    pub layout_variant: String,

    // Contact
    #[sea_orm(column_type = "Text")]
    pub phone: String,
    #[sea_orm(column_type = "Text")]
    pub whatsapp: String,
    #[sea_orm(column_type = "Text")]
    pub email: String,
    #[sea_orm(column_type = "Text")]
    pub address: String,
}

impl Model {
    /// Settings a site gets before anyone edits them
    pub fn defaults_for(site_id: i64) -> Self {
        Self {
            site_id,
            primary: "#1a73e8".to_string(),
            accent: "#ef4444".to_string(),
            neutral: "#111827".to_string(),
            radius: "14px".to_string(),
            font_body: "Inter, ui-sans-serif, system-ui".to_string(),
            font_heading: "Poppins, ui-sans-serif, system-ui".to_string(),
            layout_variant: "modern-pro".to_string(),
            phone: String::new(),
            whatsapp: String::new(),
            email: String::new(),
            address: String::new(),
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
