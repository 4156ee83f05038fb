//! Records that point at a page and block its deletion
//!
//! View restrictions, group permission grants and redirects. The page
//! tree maintenance clears these before deleting a duplicate page.

pub mod view_restriction {
    use sea_orm::entity::prelude::*;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "page_view_restrictions")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,

        pub page_id: i64,

        #[sea_orm(column_type = "Text")]
        pub restriction_type: String,

        #[sea_orm(column_type = "Text")]
        pub password: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod group_permission {
    use sea_orm::entity::prelude::*;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "group_page_permissions")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,

        pub group_id: i64,

        pub page_id: i64,

        #[sea_orm(column_type = "Text")]
        pub permission_type: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod redirect {
    use sea_orm::entity::prelude::*;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "redirects")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,

        #[sea_orm(column_type = "Text")]
        pub old_path: String,

        pub site_id: Option<i64>,

        pub is_permanent: bool,

        pub redirect_page_id: Option<i64>,

        #[sea_orm(column_type = "Text")]
        pub redirect_link: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}
