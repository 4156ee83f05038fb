//! Page-tree deduplication
//!
//! Collapses every page that duplicates a singleton content type (same
//! content type, or same title ignoring case) into one canonical live page.
//!
//! For each duplicate, in canonical-sort order:
//! 1. Move its direct children under the canonical page
//! 2. Unlock and unpublish it
//! 3. Clear aliases, view restrictions, permission grants and redirects,
//!    and re-point site roots away from it
//! 4. Delete it, or archive it in place if the delete is refused
//!
//! Running it again on a reconciled tree changes nothing.

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, error, info, warn};
use trades_common::{config::DedupeTarget, metrics};

use crate::errors::{TreeError, TreeResult};
use crate::store::{Archive, NewPage, PageNode, PageStore};
use crate::tree;

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub content_type: String,
    pub title: String,
    pub canonical_id: i64,
    /// The canonical page did not exist and was created
    pub created: bool,
    /// Child pages moved under the canonical page
    pub moved: u64,
    /// Duplicates hard-deleted
    pub deleted: u64,
    /// Duplicates archived in place after a refused delete
    pub archived: u64,
}

/// Sort key; the smallest candidate becomes canonical. A real page beats an
/// alias at the same depth.
fn canonical_key(page: &PageNode, content_type: &str) -> (bool, bool, i32, bool, i64) {
    (
        page.content_type != content_type,
        !page.live,
        page.depth,
        page.is_alias(),
        page.id,
    )
}

/// Pages matching by type or title, minus archives and the tree root
async fn candidates<S>(store: &S, target: &DedupeTarget) -> TreeResult<Vec<PageNode>>
where
    S: PageStore + ?Sized,
{
    let mut by_id = BTreeMap::new();
    for page in store.find_by_content_type(&target.content_type).await? {
        by_id.insert(page.id, page);
    }
    for page in store.find_by_title(&target.title).await? {
        by_id.entry(page.id).or_insert(page);
    }

    let mut pages: Vec<PageNode> = by_id
        .into_values()
        .filter(|p| p.depth > 1 && !p.is_archived())
        .collect();
    pages.sort_by_key(|p| canonical_key(p, &target.content_type));
    Ok(pages)
}

/// Reconcile one content type into a single canonical page
pub async fn reconcile<S>(store: &S, target: &DedupeTarget) -> TreeResult<ReconcileReport>
where
    S: PageStore + ?Sized,
{
    let mut pages = candidates(store, target).await?.into_iter();

    let (canonical, created) = match pages.next() {
        Some(page) => (page, false),
        None => {
            let root = store.root().await?;
            let page = store
                .create_child(
                    root.id,
                    NewPage {
                        content_type: target.content_type.clone(),
                        title: target.title.clone(),
                        slug: tree::slugify(&target.title),
                    },
                )
                .await?;
            info!(page_id = page.id, content_type = %target.content_type, "Created canonical page");
            (page, true)
        }
    };

    if !canonical.live {
        store.publish(canonical.id).await?;
        info!(page_id = canonical.id, "Published canonical page");
    }

    let mut report = ReconcileReport {
        content_type: target.content_type.clone(),
        title: target.title.clone(),
        canonical_id: canonical.id,
        created,
        moved: 0,
        deleted: 0,
        archived: 0,
    };

    for duplicate in pages {
        // Earlier steps may have moved or removed it
        let duplicate = match store.get(duplicate.id).await {
            Ok(page) => page,
            Err(TreeError::PageNotFound(id)) => {
                debug!(page_id = id, "Duplicate already removed");
                continue;
            }
            Err(e) => return Err(e),
        };

        report.moved += adopt_children(store, &duplicate, &canonical).await?;
        retire(store, &duplicate, &canonical).await;

        match store.delete_page(duplicate.id).await {
            Ok(()) => {
                report.deleted += 1;
                info!(page_id = duplicate.id, title = %duplicate.title, "Deleted duplicate page");
            }
            Err(e) => {
                error!(page_id = duplicate.id, error = %e, "Failed to delete duplicate page, archiving");
                let archive = Archive::for_duplicate(&duplicate, canonical.id);
                match store.archive(duplicate.id, archive).await {
                    Ok(()) => report.archived += 1,
                    Err(e) => error!(page_id = duplicate.id, error = %e, "Failed to archive duplicate page"),
                }
            }
        }
    }

    metrics::record_reconcile(&report.content_type, report.moved, report.deleted, report.archived);
    info!(
        content_type = %report.content_type,
        canonical_id = report.canonical_id,
        moved = report.moved,
        deleted = report.deleted,
        archived = report.archived,
        "Page tree reconciled"
    );

    Ok(report)
}

/// Move the duplicate's direct children to the end of the canonical page
async fn adopt_children<S>(store: &S, duplicate: &PageNode, canonical: &PageNode) -> TreeResult<u64>
where
    S: PageStore + ?Sized,
{
    // Paths change with every move; compare against the current one
    let canonical_path = store.get(canonical.id).await?.path;
    let mut moved = 0;

    for child in store.children(duplicate.id).await? {
        if child.path == canonical_path || tree::is_descendant(&canonical_path, &child.path) {
            warn!(
                page_id = child.id,
                canonical_id = canonical.id,
                "Child contains the canonical page, leaving it in place"
            );
            continue;
        }

        store.move_to_last_child(child.id, canonical.id).await?;
        moved += 1;
    }

    Ok(moved)
}

/// Strip everything that would keep the duplicate alive or visible
async fn retire<S>(store: &S, duplicate: &PageNode, canonical: &PageNode)
where
    S: PageStore + ?Sized,
{
    let id = duplicate.id;

    if duplicate.locked {
        if let Err(e) = store.unlock(id).await {
            warn!(page_id = id, error = %e, "Failed to unlock duplicate");
        }
    }
    if duplicate.live {
        if let Err(e) = store.unpublish(id).await {
            warn!(page_id = id, error = %e, "Failed to unpublish duplicate");
        }
    }

    // The canonical page may itself be an alias of this duplicate
    let aliases = if canonical.alias_of == Some(id) {
        warn!(
            page_id = id,
            canonical_id = canonical.id,
            "Canonical page aliases the duplicate, keeping aliases"
        );
        Ok(0)
    } else {
        store.delete_aliases_of(id).await
    };

    let cleared = [
        ("aliases", aliases),
        ("view restrictions", store.delete_view_restrictions(id).await),
        ("permission grants", store.delete_permission_grants(id).await),
        ("redirects", store.delete_redirects_to(id).await),
    ];
    for (relation, result) in cleared {
        match result {
            Ok(0) => {}
            Ok(count) => debug!(page_id = id, relation, count, "Cleared references"),
            Err(e) => warn!(page_id = id, relation, error = %e, "Failed to clear references"),
        }
    }

    if let Err(e) = repoint_sites(store, id, canonical.id).await {
        warn!(page_id = id, error = %e, "Failed to re-point site roots");
    }
}

/// Move site roots off the duplicate: its parent, else the canonical's parent, else the tree root
async fn repoint_sites<S>(store: &S, id: i64, canonical_id: i64) -> TreeResult<()>
where
    S: PageStore + ?Sized,
{
    let sites = store.sites_rooted_at(id).await?;
    if sites.is_empty() {
        return Ok(());
    }

    let new_root = match store.parent(id).await? {
        Some(parent) => parent.id,
        None => match store.parent(canonical_id).await? {
            Some(parent) => parent.id,
            None => store.root().await?.id,
        },
    };

    for site_id in sites {
        store.set_site_root(site_id, new_root).await?;
        info!(site_id, root_page_id = new_root, "Re-pointed site root");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryPageStore;
    use tokio_test::assert_ok;

    fn services() -> DedupeTarget {
        DedupeTarget {
            content_type: "servicesindexpage".into(),
            title: "Services".into(),
        }
    }

    async fn live_candidates(store: &MemoryPageStore) -> Vec<PageNode> {
        candidates(store, &services())
            .await
            .unwrap()
            .into_iter()
            .filter(|p| p.live)
            .collect()
    }

    #[tokio::test]
    async fn test_three_duplicates_collapse_once() {
        let store = MemoryPageStore::new();
        let home = store.add_page(1, "homepage", "Home", true);
        let canonical = store.add_page(1, "servicesindexpage", "Services", true);
        let by_title = store.add_page(1, "page", "services", true);
        store.add_page(by_title, "servicepage", "Roofing", true);
        store.add_page(by_title, "servicepage", "Gutters", true);
        let nested = store.add_page(home, "servicesindexpage", "Services", false);
        store.add_page(nested, "servicepage", "Siding", true);
        store.lock(by_title);

        let first = assert_ok!(reconcile(&store, &services()).await);
        assert_eq!(first.canonical_id, canonical);
        assert!(!first.created);
        assert_eq!(first.moved, 3);
        assert_eq!(first.deleted, 2);
        assert_eq!(first.archived, 0);
        assert!(store.node(by_title).is_none());
        assert!(store.node(nested).is_none());
        assert_eq!(store.node(canonical).unwrap().numchild, 3);

        let second = assert_ok!(reconcile(&store, &services()).await);
        assert_eq!(second.canonical_id, canonical);
        assert_eq!((second.moved, second.deleted, second.archived), (0, 0, 0));

        let live = live_candidates(&store).await;
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].id, canonical);
    }

    #[tokio::test]
    async fn test_moved_children_keep_their_subtrees() {
        let store = MemoryPageStore::new();
        let canonical = store.add_page(1, "servicesindexpage", "Services", true);
        let existing = store.add_page(canonical, "servicepage", "Painting", true);
        let duplicate = store.add_page(1, "page", "SERVICES", false);
        let child = store.add_page(duplicate, "servicepage", "Roofing", true);
        let grandchild = store.add_page(child, "page", "Flat roofs", true);

        let report = assert_ok!(reconcile(&store, &services()).await);
        assert_eq!(report.moved, 1);

        let canonical_path = store.node(canonical).unwrap().path;
        let child_node = store.node(child).unwrap();
        assert_eq!(tree::parent_path(&child_node.path), Some(canonical_path.as_str()));
        assert!(child_node.path > store.node(existing).unwrap().path);

        let grandchild_node = store.node(grandchild).unwrap();
        assert_eq!(tree::parent_path(&grandchild_node.path), Some(child_node.path.as_str()));
        assert_eq!(grandchild_node.depth, 4);
    }

    #[tokio::test]
    async fn test_blocked_delete_archives_duplicate() {
        let store = MemoryPageStore::new();
        let canonical = store.add_page(1, "servicesindexpage", "Services", true);
        let duplicate = store.add_page(1, "page", "Services", true);
        store.lock(duplicate);
        store.block_deletion(duplicate, "form submissions");

        let report = assert_ok!(reconcile(&store, &services()).await);
        assert_eq!((report.deleted, report.archived), (0, 1));

        let archived = store.node(duplicate).unwrap();
        assert_eq!(archived.title, format!("Archived Services (dup {})", duplicate));
        assert_eq!(archived.slug, format!("archived-services-{}", duplicate));
        assert_eq!(archived.alias_of, Some(canonical));
        assert!(!archived.live);
        assert!(!archived.locked);

        let again = assert_ok!(reconcile(&store, &services()).await);
        assert_eq!((again.deleted, again.archived), (0, 0));
    }

    #[tokio::test]
    async fn test_references_are_cleared_before_delete() {
        let store = MemoryPageStore::new();
        let canonical = store.add_page(1, "servicesindexpage", "Services", true);
        let section = store.add_page(1, "page", "Company", true);
        let duplicate = store.add_page(section, "servicesindexpage", "Our services", true);
        let alias = store.add_alias(1, duplicate);
        store.add_view_restriction(duplicate);
        store.add_permission_grant(duplicate);
        store.add_redirect_to(duplicate);
        let site = store.add_site(duplicate);

        // The typed alias is a duplicate in its own right
        let report = assert_ok!(reconcile(&store, &services()).await);
        assert_eq!(report.canonical_id, canonical);
        assert_eq!((report.deleted, report.archived), (2, 0));
        assert!(store.node(duplicate).is_none());
        assert!(store.node(alias).is_none());
        assert_eq!(store.view_restriction_count(), 0);
        assert_eq!(store.site_root(site), Some(section));
    }

    #[tokio::test]
    async fn test_creates_canonical_when_missing() {
        let store = MemoryPageStore::new();
        store.add_page(1, "homepage", "Home", true);

        let report = assert_ok!(reconcile(&store, &services()).await);
        assert!(report.created);
        assert_eq!((report.moved, report.deleted), (0, 0));

        let page = store.node(report.canonical_id).unwrap();
        assert_eq!(page.content_type, "servicesindexpage");
        assert_eq!(page.title, "Services");
        assert_eq!(page.slug, "services");
        assert_eq!(page.depth, 2);
        assert!(page.live);
        assert_eq!(store.revision_count(page.id), 1);

        let again = assert_ok!(reconcile(&store, &services()).await);
        assert!(!again.created);
        assert_eq!(again.canonical_id, report.canonical_id);
    }

    #[tokio::test]
    async fn test_unpublished_canonical_is_published() {
        let store = MemoryPageStore::new();
        let draft = store.add_page(1, "servicesindexpage", "Services", false);

        let report = assert_ok!(reconcile(&store, &services()).await);
        assert_eq!(report.canonical_id, draft);
        assert!(store.node(draft).unwrap().live);
        assert_eq!(store.revision_count(draft), 1);
    }

    #[tokio::test]
    async fn test_type_match_beats_live_title_match() {
        let store = MemoryPageStore::new();
        let by_title = store.add_page(1, "page", "Services", true);
        let typed = store.add_page(1, "servicesindexpage", "What we do", false);

        let report = assert_ok!(reconcile(&store, &services()).await);
        assert_eq!(report.canonical_id, typed);
        assert!(store.node(by_title).is_none());
    }

    #[tokio::test]
    async fn test_canonical_nested_in_duplicate_is_not_moved() {
        let store = MemoryPageStore::new();
        let outer = store.add_page(1, "page", "Services", true);
        let canonical = store.add_page(outer, "servicesindexpage", "Services", true);
        let sibling = store.add_page(outer, "servicepage", "Roofing", true);

        let report = assert_ok!(reconcile(&store, &services()).await);
        assert_eq!(report.canonical_id, canonical);
        assert_eq!(report.moved, 1);
        assert_eq!((report.deleted, report.archived), (0, 1));

        let sibling_node = store.node(sibling).unwrap();
        assert_eq!(
            tree::parent_path(&sibling_node.path),
            Some(store.node(canonical).unwrap().path.as_str())
        );
    }

    #[tokio::test]
    async fn test_live_alias_is_collapsed_into_canonical() {
        let store = MemoryPageStore::new();
        let canonical = store.add_page(1, "servicesindexpage", "Services", true);
        let section = store.add_page(1, "page", "Company", true);
        let alias = store.add_alias(section, canonical);
        let child = store.add_page(alias, "servicepage", "Roofing", true);

        let report = assert_ok!(reconcile(&store, &services()).await);
        assert_eq!(report.canonical_id, canonical);
        assert_eq!((report.moved, report.deleted, report.archived), (1, 1, 0));
        assert!(store.node(alias).is_none());
        assert_eq!(
            tree::parent_path(&store.node(child).unwrap().path),
            Some(store.node(canonical).unwrap().path.as_str())
        );

        let live = live_candidates(&store).await;
        assert_eq!(live.iter().map(|p| p.id).collect::<Vec<_>>(), vec![canonical]);
    }

    #[tokio::test]
    async fn test_canonical_alias_survives_retiring_its_source() {
        let store = MemoryPageStore::new();
        let draft = store.add_page(1, "servicesindexpage", "Services", false);
        let alias = store.add_alias(1, draft);

        let report = assert_ok!(reconcile(&store, &services()).await);
        assert_eq!(report.canonical_id, alias);
        assert_eq!((report.deleted, report.archived), (0, 1));
        assert!(store.node(alias).unwrap().live);
        assert!(!store.node(draft).unwrap().live);

        let again = assert_ok!(reconcile(&store, &services()).await);
        assert_eq!(again.canonical_id, alias);
        assert_eq!((again.moved, again.deleted, again.archived), (0, 0, 0));
    }

    #[test]
    fn test_canonical_key_order() {
        let page = |id, content_type: &str, live, depth| PageNode {
            id,
            content_type: content_type.into(),
            title: "Services".into(),
            slug: "services".into(),
            path: String::new(),
            depth,
            numchild: 0,
            live,
            locked: false,
            alias_of: None,
        };

        let mut alias = page(2, "servicesindexpage", true, 2);
        alias.alias_of = Some(3);

        let mut pages = vec![
            page(1, "page", true, 2),
            alias,
            page(6, "servicesindexpage", true, 2),
            page(5, "servicesindexpage", false, 2),
            page(4, "servicesindexpage", true, 3),
            page(3, "servicesindexpage", true, 3),
        ];
        pages.sort_by_key(|p| canonical_key(p, "servicesindexpage"));

        let order: Vec<i64> = pages.iter().map(|p| p.id).collect();
        assert_eq!(order, vec![6, 2, 3, 4, 5, 1]);
    }
}
