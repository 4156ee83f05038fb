//! Page-tree maintenance error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TreeError {
    #[error("Page not found: {0}")]
    PageNotFound(i64),

    #[error("Page tree has no root")]
    NoRoot,

    #[error("Page {id} still has {count} children")]
    HasChildren { id: i64, count: i32 },

    #[error("Page {id} is still referenced by {relation}")]
    Referenced { id: i64, relation: String },

    #[error("Cannot move page {id} under its own descendant {target}")]
    MoveIntoDescendant { id: i64, target: i64 },

    #[error("Invalid tree path '{0}'")]
    InvalidPath(String),

    #[error("No free child slot under '{0}'")]
    PathOverflow(String),

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type TreeResult<T> = std::result::Result<T, TreeError>;
