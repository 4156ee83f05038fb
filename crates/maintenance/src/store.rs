//! Page tree storage abstraction
//!
//! The deduplicator only talks to a [`PageStore`]. Every relation that can
//! reference a page has a clearing operation here; anything else that
//! blocks a delete is handled by archiving the page in place.

use async_trait::async_trait;
use serde::Serialize;
use trades_common::db::models::Page;

use crate::errors::TreeResult;

/// Slug prefix of pages archived after a failed delete
pub const ARCHIVED_SLUG_PREFIX: &str = "archived-";

/// Store-independent view of one page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageNode {
    pub id: i64,
    pub content_type: String,
    pub title: String,
    pub slug: String,
    pub path: String,
    pub depth: i32,
    pub numchild: i32,
    pub live: bool,
    pub locked: bool,
    pub alias_of: Option<i64>,
}

impl PageNode {
    pub fn is_alias(&self) -> bool {
        self.alias_of.is_some()
    }

    pub fn is_archived(&self) -> bool {
        self.slug.starts_with(ARCHIVED_SLUG_PREFIX)
    }
}

impl From<Page> for PageNode {
    fn from(page: Page) -> Self {
        Self {
            id: page.id,
            content_type: page.content_type,
            title: page.title,
            slug: page.slug,
            path: page.path,
            depth: page.depth,
            numchild: page.numchild,
            live: page.live,
            locked: page.locked,
            alias_of: page.alias_of_id,
        }
    }
}

/// Fields of a page to create
#[derive(Debug, Clone)]
pub struct NewPage {
    pub content_type: String,
    pub title: String,
    pub slug: String,
}

/// In-place rename applied when a page cannot be deleted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Archive {
    pub title: String,
    pub slug: String,
    pub alias_of: i64,
}

impl Archive {
    /// `Archived {title} (dup {id})` / `archived-{slug}-{id}`, aliased to the canonical page
    pub fn for_duplicate(page: &PageNode, canonical_id: i64) -> Self {
        Self {
            title: format!("Archived {} (dup {})", page.title, page.id),
            slug: format!("{}{}-{}", ARCHIVED_SLUG_PREFIX, page.slug, page.id),
            alias_of: canonical_id,
        }
    }
}

#[async_trait]
pub trait PageStore: Send + Sync {
    /// First root node of the tree
    async fn root(&self) -> TreeResult<PageNode>;

    async fn get(&self, id: i64) -> TreeResult<PageNode>;

    async fn find_by_content_type(&self, content_type: &str) -> TreeResult<Vec<PageNode>>;

    /// Pages whose title matches case-insensitively
    async fn find_by_title(&self, title: &str) -> TreeResult<Vec<PageNode>>;

    /// Direct children in path order
    async fn children(&self, id: i64) -> TreeResult<Vec<PageNode>>;

    async fn parent(&self, id: i64) -> TreeResult<Option<PageNode>>;

    /// Append a page as the last child of `parent_id`
    async fn create_child(&self, parent_id: i64, page: NewPage) -> TreeResult<PageNode>;

    /// Record a revision and mark the page live
    async fn publish(&self, id: i64) -> TreeResult<()>;

    async fn unpublish(&self, id: i64) -> TreeResult<()>;

    async fn unlock(&self, id: i64) -> TreeResult<()>;

    /// Move a page with its whole subtree to the end of `new_parent_id`'s children
    async fn move_to_last_child(&self, id: i64, new_parent_id: i64) -> TreeResult<()>;

    /// Delete alias pages pointing at `id`; returns how many
    async fn delete_aliases_of(&self, id: i64) -> TreeResult<u64>;

    async fn delete_view_restrictions(&self, id: i64) -> TreeResult<u64>;

    async fn delete_permission_grants(&self, id: i64) -> TreeResult<u64>;

    /// Delete redirects whose target is `id`
    async fn delete_redirects_to(&self, id: i64) -> TreeResult<u64>;

    /// IDs of sites whose root page is `id`
    async fn sites_rooted_at(&self, id: i64) -> TreeResult<Vec<i64>>;

    async fn set_site_root(&self, site_id: i64, page_id: i64) -> TreeResult<()>;

    /// Delete a childless page atomically; fails while anything still references it
    async fn delete_page(&self, id: i64) -> TreeResult<()>;

    /// Rename, unpublish and alias a page that could not be deleted
    async fn archive(&self, id: i64, archive: Archive) -> TreeResult<()>;
}
