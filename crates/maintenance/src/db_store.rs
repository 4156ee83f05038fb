//! PostgreSQL page tree
//!
//! [`PageStore`] over the `pages` table and the relations that reference it.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    sea_query::{Expr, Func},
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, DbErr,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, Statement,
    TransactionTrait,
};
use tracing::debug;
use trades_common::db::models::{
    GroupPermissionColumn, GroupPermissionEntity, Page, PageActiveModel, PageColumn, PageEntity,
    PageRevisionActiveModel, RedirectColumn, RedirectEntity, SiteColumn, SiteEntity,
    ViewRestrictionColumn, ViewRestrictionEntity,
};

use crate::errors::{TreeError, TreeResult};
use crate::memory::TreeSnapshot;
use crate::store::{Archive, NewPage, PageNode, PageStore};
use crate::tree;

/// Rewrites the path prefix and depth of a whole subtree in one statement
const MOVE_SUBTREE_SQL: &str = r#"
UPDATE pages
SET path = $1 || SUBSTRING(path FROM $2),
    depth = depth + $3
WHERE path LIKE $4
"#;

pub struct DbPageStore {
    db: DatabaseConnection,
}

impl DbPageStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Copy the tree and its blocking relations for an in-memory dry run
    pub async fn snapshot(&self) -> TreeResult<TreeSnapshot> {
        let pages = PageEntity::find()
            .order_by_asc(PageColumn::Path)
            .all(&self.db)
            .await?
            .into_iter()
            .map(PageNode::from)
            .collect();

        let view_restrictions = ViewRestrictionEntity::find()
            .all(&self.db)
            .await?
            .into_iter()
            .map(|r| r.page_id)
            .collect();

        let permission_grants = GroupPermissionEntity::find()
            .all(&self.db)
            .await?
            .into_iter()
            .map(|g| g.page_id)
            .collect();

        let redirects = RedirectEntity::find()
            .filter(RedirectColumn::RedirectPageId.is_not_null())
            .all(&self.db)
            .await?
            .into_iter()
            .filter_map(|r| r.redirect_page_id)
            .collect();

        let sites = SiteEntity::find()
            .all(&self.db)
            .await?
            .into_iter()
            .map(|s| (s.id, s.root_page_id))
            .collect();

        Ok(TreeSnapshot {
            pages,
            view_restrictions,
            permission_grants,
            redirects,
            sites,
        })
    }
}

async fn find_page<C: ConnectionTrait>(conn: &C, id: i64) -> TreeResult<Page> {
    PageEntity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or(TreeError::PageNotFound(id))
}

async fn last_child_path<C: ConnectionTrait>(conn: &C, parent: &Page) -> TreeResult<Option<String>> {
    Ok(PageEntity::find()
        .filter(PageColumn::Path.starts_with(parent.path.as_str()))
        .filter(PageColumn::Depth.eq(parent.depth + 1))
        .order_by_desc(PageColumn::Path)
        .one(conn)
        .await?
        .map(|p| p.path))
}

async fn adjust_numchild<C: ConnectionTrait>(conn: &C, path: &str, delta: i32) -> TreeResult<()> {
    PageEntity::update_many()
        .col_expr(PageColumn::Numchild, Expr::col(PageColumn::Numchild).add(delta))
        .filter(PageColumn::Path.eq(path))
        .exec(conn)
        .await?;
    Ok(())
}

/// Map a foreign key violation to [`TreeError::Referenced`]
fn delete_error(id: i64, err: DbErr) -> TreeError {
    match err.sql_err() {
        Some(SqlErr::ForeignKeyConstraintViolation(relation)) => {
            TreeError::Referenced { id, relation }
        }
        _ => TreeError::Database(err),
    }
}

#[async_trait]
impl PageStore for DbPageStore {
    async fn root(&self) -> TreeResult<PageNode> {
        PageEntity::find()
            .filter(PageColumn::Depth.eq(1))
            .order_by_asc(PageColumn::Path)
            .one(&self.db)
            .await?
            .map(PageNode::from)
            .ok_or(TreeError::NoRoot)
    }

    async fn get(&self, id: i64) -> TreeResult<PageNode> {
        find_page(&self.db, id).await.map(PageNode::from)
    }

    async fn find_by_content_type(&self, content_type: &str) -> TreeResult<Vec<PageNode>> {
        Ok(PageEntity::find()
            .filter(PageColumn::ContentType.eq(content_type))
            .order_by_asc(PageColumn::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(PageNode::from)
            .collect())
    }

    async fn find_by_title(&self, title: &str) -> TreeResult<Vec<PageNode>> {
        Ok(PageEntity::find()
            .filter(Expr::expr(Func::lower(Expr::col(PageColumn::Title))).eq(title.to_lowercase()))
            .order_by_asc(PageColumn::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(PageNode::from)
            .collect())
    }

    async fn children(&self, id: i64) -> TreeResult<Vec<PageNode>> {
        let parent = find_page(&self.db, id).await?;

        Ok(PageEntity::find()
            .filter(PageColumn::Path.starts_with(parent.path.as_str()))
            .filter(PageColumn::Depth.eq(parent.depth + 1))
            .order_by_asc(PageColumn::Path)
            .all(&self.db)
            .await?
            .into_iter()
            .map(PageNode::from)
            .collect())
    }

    async fn parent(&self, id: i64) -> TreeResult<Option<PageNode>> {
        let page = find_page(&self.db, id).await?;
        let Some(path) = tree::parent_path(&page.path) else {
            return Ok(None);
        };

        Ok(PageEntity::find()
            .filter(PageColumn::Path.eq(path))
            .one(&self.db)
            .await?
            .map(PageNode::from))
    }

    async fn create_child(&self, parent_id: i64, page: NewPage) -> TreeResult<PageNode> {
        let txn = self.db.begin().await?;

        let parent = find_page(&txn, parent_id).await?;
        let last = last_child_path(&txn, &parent).await?;
        let path = tree::next_child_path(&parent.path, last.as_deref())?;

        let created = PageActiveModel {
            content_type: Set(page.content_type),
            title: Set(page.title),
            slug: Set(page.slug),
            depth: Set(tree::depth_of(&path)),
            path: Set(path),
            numchild: Set(0),
            live: Set(false),
            locked: Set(false),
            alias_of_id: Set(None),
            latest_revision_id: Set(None),
            live_revision_id: Set(None),
            first_published_at: Set(None),
            last_published_at: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        adjust_numchild(&txn, &parent.path, 1).await?;
        txn.commit().await?;

        debug!(page_id = created.id, parent_id, path = %created.path, "Created page");
        Ok(created.into())
    }

    async fn publish(&self, id: i64) -> TreeResult<()> {
        let txn = self.db.begin().await?;
        let page = find_page(&txn, id).await?;
        let now = Utc::now();

        let content = serde_json::to_value(&page)?;

        let revision = PageRevisionActiveModel {
            page_id: Set(id),
            content: Set(content),
            created_at: Set(now.into()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let first_published_at = page.first_published_at.unwrap_or_else(|| now.into());
        let mut active: PageActiveModel = page.into();
        active.live = Set(true);
        active.latest_revision_id = Set(Some(revision.id));
        active.live_revision_id = Set(Some(revision.id));
        active.first_published_at = Set(Some(first_published_at));
        active.last_published_at = Set(Some(now.into()));
        active.update(&txn).await?;

        txn.commit().await?;
        Ok(())
    }

    async fn unpublish(&self, id: i64) -> TreeResult<()> {
        let mut active: PageActiveModel = find_page(&self.db, id).await?.into();
        active.live = Set(false);
        active.update(&self.db).await?;
        Ok(())
    }

    async fn unlock(&self, id: i64) -> TreeResult<()> {
        let mut active: PageActiveModel = find_page(&self.db, id).await?.into();
        active.locked = Set(false);
        active.update(&self.db).await?;
        Ok(())
    }

    async fn move_to_last_child(&self, id: i64, new_parent_id: i64) -> TreeResult<()> {
        let txn = self.db.begin().await?;

        let node = find_page(&txn, id).await?;
        let target = find_page(&txn, new_parent_id).await?;
        if target.id == node.id || tree::is_descendant(&target.path, &node.path) {
            return Err(TreeError::MoveIntoDescendant {
                id,
                target: new_parent_id,
            });
        }

        let last = last_child_path(&txn, &target).await?;
        let new_path = tree::next_child_path(&target.path, last.as_deref())?;
        let depth_delta = tree::depth_of(&new_path) - node.depth;

        txn.execute(Statement::from_sql_and_values(
            DbBackend::Postgres,
            MOVE_SUBTREE_SQL,
            [
                new_path.clone().into(),
                (node.path.len() as i32 + 1).into(),
                depth_delta.into(),
                format!("{}%", node.path).into(),
            ],
        ))
        .await?;

        if let Some(old_parent) = tree::parent_path(&node.path) {
            adjust_numchild(&txn, old_parent, -1).await?;
        }
        adjust_numchild(&txn, &target.path, 1).await?;

        txn.commit().await?;
        debug!(page_id = id, from = %node.path, to = %new_path, "Moved subtree");
        Ok(())
    }

    async fn delete_aliases_of(&self, id: i64) -> TreeResult<u64> {
        let aliases = PageEntity::find()
            .filter(PageColumn::AliasOfId.eq(id))
            .all(&self.db)
            .await?;

        for alias in &aliases {
            let txn = self.db.begin().await?;
            PageEntity::delete_many()
                .filter(PageColumn::Path.starts_with(alias.path.as_str()))
                .exec(&txn)
                .await
                .map_err(|e| delete_error(alias.id, e))?;
            if let Some(parent) = tree::parent_path(&alias.path) {
                adjust_numchild(&txn, parent, -1).await?;
            }
            txn.commit().await?;
        }

        Ok(aliases.len() as u64)
    }

    async fn delete_view_restrictions(&self, id: i64) -> TreeResult<u64> {
        let result = ViewRestrictionEntity::delete_many()
            .filter(ViewRestrictionColumn::PageId.eq(id))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }

    async fn delete_permission_grants(&self, id: i64) -> TreeResult<u64> {
        let result = GroupPermissionEntity::delete_many()
            .filter(GroupPermissionColumn::PageId.eq(id))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }

    async fn delete_redirects_to(&self, id: i64) -> TreeResult<u64> {
        let result = RedirectEntity::delete_many()
            .filter(RedirectColumn::RedirectPageId.eq(id))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }

    async fn sites_rooted_at(&self, id: i64) -> TreeResult<Vec<i64>> {
        Ok(SiteEntity::find()
            .select_only()
            .column(SiteColumn::Id)
            .filter(SiteColumn::RootPageId.eq(id))
            .into_tuple::<i64>()
            .all(&self.db)
            .await?)
    }

    async fn set_site_root(&self, site_id: i64, page_id: i64) -> TreeResult<()> {
        SiteEntity::update_many()
            .col_expr(SiteColumn::RootPageId, Expr::value(page_id))
            .filter(SiteColumn::Id.eq(site_id))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn delete_page(&self, id: i64) -> TreeResult<()> {
        let txn = self.db.begin().await?;
        let page = find_page(&txn, id).await?;

        if page.numchild > 0 {
            return Err(TreeError::HasChildren {
                id,
                count: page.numchild,
            });
        }

        PageEntity::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(|e| delete_error(id, e))?;
        if let Some(parent) = tree::parent_path(&page.path) {
            adjust_numchild(&txn, parent, -1).await?;
        }

        txn.commit().await?;
        Ok(())
    }

    async fn archive(&self, id: i64, archive: Archive) -> TreeResult<()> {
        let mut active: PageActiveModel = find_page(&self.db, id).await?.into();
        active.title = Set(archive.title);
        active.slug = Set(archive.slug);
        active.live = Set(false);
        active.alias_of_id = Set(Some(archive.alias_of));
        active.update(&self.db).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_other_delete_errors_stay_database_errors() {
        let err = delete_error(7, DbErr::RecordNotFound("pages".into()));
        assert!(matches!(err, TreeError::Database(_)));
    }

    #[test]
    fn test_move_statement_binds_prefix_pattern() {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            MOVE_SUBTREE_SQL,
            [
                "00010003".into(),
                9i32.into(),
                0i32.into(),
                "00010002%".into(),
            ],
        );
        assert_eq!(stmt.values.map(|v| v.0.len()), Some(4));
        assert!(stmt.sql.contains("SUBSTRING(path FROM $2)"));
    }
}
