//! Portfolio project page data

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "project_pages")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub page_id: i64,

    #[sea_orm(column_type = "Text")]
    pub city: String,

    /// Service tags as a JSON array of strings
    #[sea_orm(column_type = "JsonBinary")]
    pub tags: Json,

    pub before_image_id: Option<i64>,

    pub after_image_id: Option<i64>,

    /// Stream of `{"type": "image", "value": <image id>}` blocks
    #[sea_orm(column_type = "JsonBinary")]
    pub gallery: Json,
}

impl Model {
    /// Image ids of the gallery stream, in order. Non-image blocks are skipped.
    pub fn gallery_image_ids(&self) -> Vec<i64> {
        self.gallery
            .as_array()
            .map(|blocks| {
                blocks
                    .iter()
                    .filter(|b| b.get("type").and_then(|t| t.as_str()) == Some("image"))
                    .filter_map(|b| b.get("value").and_then(|v| v.as_i64()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Tag names; anything that is not a string is ignored
    pub fn tag_names(&self) -> Vec<String> {
        self.tags
            .as_array()
            .map(|tags| {
                tags.iter()
                    .filter_map(|t| t.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::page::Entity",
        from = "Column::PageId",
        to = "super::page::Column::Id",
        on_delete = "Cascade"
    )]
    Page,
}

impl Related<super::page::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Page.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_gallery_image_ids_skips_other_blocks() {
        let project = Model {
            page_id: 1,
            city: "Springfield".into(),
            tags: json!(["roofing", 3, "gutters"]),
            before_image_id: None,
            after_image_id: None,
            gallery: json!([
                {"type": "image", "value": 7},
                {"type": "video", "value": 8},
                {"type": "image", "value": null},
                {"type": "image", "value": 9},
            ]),
        };

        assert_eq!(project.gallery_image_ids(), vec![7, 9]);
        assert_eq!(project.tag_names(), vec!["roofing", "gutters"]);
    }
}
