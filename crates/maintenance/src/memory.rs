//! In-memory page tree
//!
//! An arena of [`PageNode`]s addressed by id, with the same materialized
//! paths and relation rules as the database. Used for dry runs (loaded from
//! a database snapshot) and in tests.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::errors::{TreeError, TreeResult};
use crate::store::{Archive, NewPage, PageNode, PageStore};
use crate::tree;

/// Everything the deduplicator can touch, copied out of a real store
#[derive(Debug, Clone, Default)]
pub struct TreeSnapshot {
    pub pages: Vec<PageNode>,
    /// Page id of each view restriction
    pub view_restrictions: Vec<i64>,
    /// Page id of each group permission grant
    pub permission_grants: Vec<i64>,
    /// Target page id of each redirect
    pub redirects: Vec<i64>,
    /// `(site id, root page id)`
    pub sites: Vec<(i64, i64)>,
}

#[derive(Debug, Default)]
struct Arena {
    pages: BTreeMap<i64, PageNode>,
    next_id: i64,
    /// Page id per stored revision
    revisions: Vec<i64>,
    view_restrictions: Vec<i64>,
    permission_grants: Vec<i64>,
    redirects: Vec<i64>,
    sites: BTreeMap<i64, i64>,
    /// References from outside the enumerated relations
    blocked: HashMap<i64, String>,
}

impl Arena {
    fn get(&self, id: i64) -> TreeResult<&PageNode> {
        self.pages.get(&id).ok_or(TreeError::PageNotFound(id))
    }

    fn get_mut(&mut self, id: i64) -> TreeResult<&mut PageNode> {
        self.pages.get_mut(&id).ok_or(TreeError::PageNotFound(id))
    }

    fn by_path(&self, path: &str) -> Option<i64> {
        self.pages.values().find(|p| p.path == path).map(|p| p.id)
    }

    fn children_of(&self, parent: &PageNode) -> Vec<PageNode> {
        let mut children: Vec<PageNode> = self
            .pages
            .values()
            .filter(|p| p.depth == parent.depth + 1 && tree::is_descendant(&p.path, &parent.path))
            .cloned()
            .collect();
        children.sort_by(|a, b| a.path.cmp(&b.path));
        children
    }

    fn next_child_path(&self, parent: &PageNode) -> TreeResult<String> {
        let last = self.children_of(parent).pop().map(|c| c.path);
        tree::next_child_path(&parent.path, last.as_deref())
    }

    fn adjust_numchild(&mut self, path: Option<&str>, delta: i32) {
        if let Some(id) = path.and_then(|p| self.by_path(p)) {
            if let Some(page) = self.pages.get_mut(&id) {
                page.numchild += delta;
            }
        }
    }

    fn insert_child(&mut self, parent_id: i64, page: NewPage) -> TreeResult<PageNode> {
        let parent = self.get(parent_id)?.clone();
        let path = self.next_child_path(&parent)?;

        self.next_id += 1;
        let node = PageNode {
            id: self.next_id,
            content_type: page.content_type,
            title: page.title,
            slug: page.slug,
            depth: tree::depth_of(&path),
            path,
            numchild: 0,
            live: false,
            locked: false,
            alias_of: None,
        };

        self.pages.insert(node.id, node.clone());
        self.get_mut(parent_id)?.numchild += 1;
        Ok(node)
    }

    /// Remove a page and its descendants
    fn remove_subtree(&mut self, id: i64) -> TreeResult<()> {
        let path = self.get(id)?.path.clone();
        let removed: Vec<i64> = self
            .pages
            .values()
            .filter(|p| p.path == path || tree::is_descendant(&p.path, &path))
            .map(|p| p.id)
            .collect();

        for page_id in &removed {
            self.pages.remove(page_id);
        }
        self.revisions.retain(|page_id| !removed.contains(page_id));
        self.adjust_numchild(tree::parent_path(&path), -1);
        Ok(())
    }

    /// Name of the first relation still pointing at `id`
    fn blocking_relation(&self, id: i64) -> Option<String> {
        if let Some(relation) = self.blocked.get(&id) {
            return Some(relation.clone());
        }
        if self.view_restrictions.contains(&id) {
            return Some("view restriction".into());
        }
        if self.permission_grants.contains(&id) {
            return Some("group permission".into());
        }
        if self.redirects.contains(&id) {
            return Some("redirect".into());
        }
        if self.sites.values().any(|root| *root == id) {
            return Some("site root".into());
        }
        if self.pages.values().any(|p| p.alias_of == Some(id)) {
            return Some("alias page".into());
        }
        None
    }
}

/// Page tree held in process memory
#[derive(Debug)]
pub struct MemoryPageStore {
    arena: Mutex<Arena>,
}

impl Default for MemoryPageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPageStore {
    /// Tree holding only a live root page
    pub fn new() -> Self {
        let root = PageNode {
            id: 1,
            content_type: "page".into(),
            title: "Root".into(),
            slug: "root".into(),
            path: "0001".into(),
            depth: 1,
            numchild: 0,
            live: true,
            locked: false,
            alias_of: None,
        };

        let mut arena = Arena {
            next_id: 1,
            ..Arena::default()
        };
        arena.pages.insert(root.id, root);

        Self {
            arena: Mutex::new(arena),
        }
    }

    /// Copy of a persisted tree; changes never reach the source
    pub fn from_snapshot(snapshot: TreeSnapshot) -> Self {
        let next_id = snapshot.pages.iter().map(|p| p.id).max().unwrap_or(0);
        let arena = Arena {
            pages: snapshot.pages.into_iter().map(|p| (p.id, p)).collect(),
            next_id,
            revisions: Vec::new(),
            view_restrictions: snapshot.view_restrictions,
            permission_grants: snapshot.permission_grants,
            redirects: snapshot.redirects,
            sites: snapshot.sites.into_iter().collect(),
            blocked: HashMap::new(),
        };

        Self {
            arena: Mutex::new(arena),
        }
    }

    fn arena(&self) -> MutexGuard<'_, Arena> {
        self.arena.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl PageStore for MemoryPageStore {
    async fn root(&self) -> TreeResult<PageNode> {
        self.arena()
            .pages
            .values()
            .filter(|p| p.depth == 1)
            .min_by(|a, b| a.path.cmp(&b.path))
            .cloned()
            .ok_or(TreeError::NoRoot)
    }

    async fn get(&self, id: i64) -> TreeResult<PageNode> {
        self.arena().get(id).cloned()
    }

    async fn find_by_content_type(&self, content_type: &str) -> TreeResult<Vec<PageNode>> {
        Ok(self
            .arena()
            .pages
            .values()
            .filter(|p| p.content_type == content_type)
            .cloned()
            .collect())
    }

    async fn find_by_title(&self, title: &str) -> TreeResult<Vec<PageNode>> {
        let wanted = title.to_lowercase();
        Ok(self
            .arena()
            .pages
            .values()
            .filter(|p| p.title.to_lowercase() == wanted)
            .cloned()
            .collect())
    }

    async fn children(&self, id: i64) -> TreeResult<Vec<PageNode>> {
        let arena = self.arena();
        let parent = arena.get(id)?;
        Ok(arena.children_of(parent))
    }

    async fn parent(&self, id: i64) -> TreeResult<Option<PageNode>> {
        let arena = self.arena();
        let page = arena.get(id)?;
        Ok(tree::parent_path(&page.path)
            .and_then(|path| arena.by_path(path))
            .and_then(|parent_id| arena.pages.get(&parent_id).cloned()))
    }

    async fn create_child(&self, parent_id: i64, page: NewPage) -> TreeResult<PageNode> {
        self.arena().insert_child(parent_id, page)
    }

    async fn publish(&self, id: i64) -> TreeResult<()> {
        let mut arena = self.arena();
        arena.get_mut(id)?.live = true;
        arena.revisions.push(id);
        Ok(())
    }

    async fn unpublish(&self, id: i64) -> TreeResult<()> {
        self.arena().get_mut(id)?.live = false;
        Ok(())
    }

    async fn unlock(&self, id: i64) -> TreeResult<()> {
        self.arena().get_mut(id)?.locked = false;
        Ok(())
    }

    async fn move_to_last_child(&self, id: i64, new_parent_id: i64) -> TreeResult<()> {
        let mut arena = self.arena();
        let node = arena.get(id)?.clone();
        let target = arena.get(new_parent_id)?.clone();

        if target.id == node.id || tree::is_descendant(&target.path, &node.path) {
            return Err(TreeError::MoveIntoDescendant {
                id,
                target: new_parent_id,
            });
        }

        let new_path = arena.next_child_path(&target)?;

        for page in arena.pages.values_mut() {
            if page.path == node.path || tree::is_descendant(&page.path, &node.path) {
                page.path = tree::rebase(&page.path, &node.path, &new_path);
                page.depth = tree::depth_of(&page.path);
            }
        }

        arena.adjust_numchild(tree::parent_path(&node.path), -1);
        arena.get_mut(new_parent_id)?.numchild += 1;
        Ok(())
    }

    async fn delete_aliases_of(&self, id: i64) -> TreeResult<u64> {
        let mut arena = self.arena();
        let aliases: Vec<i64> = arena
            .pages
            .values()
            .filter(|p| p.alias_of == Some(id))
            .map(|p| p.id)
            .collect();

        for alias in &aliases {
            // An alias may already be gone with an earlier alias's subtree
            if arena.pages.contains_key(alias) {
                arena.remove_subtree(*alias)?;
            }
        }
        Ok(aliases.len() as u64)
    }

    async fn delete_view_restrictions(&self, id: i64) -> TreeResult<u64> {
        let mut arena = self.arena();
        let before = arena.view_restrictions.len();
        arena.view_restrictions.retain(|page| *page != id);
        Ok((before - arena.view_restrictions.len()) as u64)
    }

    async fn delete_permission_grants(&self, id: i64) -> TreeResult<u64> {
        let mut arena = self.arena();
        let before = arena.permission_grants.len();
        arena.permission_grants.retain(|page| *page != id);
        Ok((before - arena.permission_grants.len()) as u64)
    }

    async fn delete_redirects_to(&self, id: i64) -> TreeResult<u64> {
        let mut arena = self.arena();
        let before = arena.redirects.len();
        arena.redirects.retain(|page| *page != id);
        Ok((before - arena.redirects.len()) as u64)
    }

    async fn sites_rooted_at(&self, id: i64) -> TreeResult<Vec<i64>> {
        Ok(self
            .arena()
            .sites
            .iter()
            .filter(|(_, root)| **root == id)
            .map(|(site, _)| *site)
            .collect())
    }

    async fn set_site_root(&self, site_id: i64, page_id: i64) -> TreeResult<()> {
        let mut arena = self.arena();
        arena.get(page_id)?;
        arena.sites.insert(site_id, page_id);
        Ok(())
    }

    async fn delete_page(&self, id: i64) -> TreeResult<()> {
        let mut arena = self.arena();
        let page = arena.get(id)?.clone();

        if page.numchild > 0 {
            return Err(TreeError::HasChildren {
                id,
                count: page.numchild,
            });
        }
        if let Some(relation) = arena.blocking_relation(id) {
            return Err(TreeError::Referenced { id, relation });
        }

        arena.remove_subtree(id)
    }

    async fn archive(&self, id: i64, archive: Archive) -> TreeResult<()> {
        let mut arena = self.arena();
        let page = arena.get_mut(id)?;
        page.title = archive.title;
        page.slug = archive.slug;
        page.live = false;
        page.alias_of = Some(archive.alias_of);
        Ok(())
    }
}

/// Seeding and inspection helpers for tests
#[cfg(test)]
impl MemoryPageStore {
    pub fn add_page(&self, parent: i64, content_type: &str, title: &str, live: bool) -> i64 {
        let mut arena = self.arena();
        let page = NewPage {
            content_type: content_type.into(),
            title: title.into(),
            slug: tree::slugify(title),
        };
        let node = arena.insert_child(parent, page).unwrap();
        arena.get_mut(node.id).unwrap().live = live;
        node.id
    }

    /// Live alias of `of`, carrying its content type and title
    pub fn add_alias(&self, parent: i64, of: i64) -> i64 {
        let source = self.node(of).unwrap();
        let id = self.add_page(parent, &source.content_type, &source.title, true);
        self.arena().get_mut(id).unwrap().alias_of = Some(of);
        id
    }

    pub fn lock(&self, id: i64) {
        self.arena().get_mut(id).unwrap().locked = true;
    }

    pub fn add_view_restriction(&self, page: i64) {
        self.arena().view_restrictions.push(page);
    }

    pub fn add_permission_grant(&self, page: i64) {
        self.arena().permission_grants.push(page);
    }

    pub fn add_redirect_to(&self, page: i64) {
        self.arena().redirects.push(page);
    }

    pub fn add_site(&self, root_page: i64) -> i64 {
        let mut arena = self.arena();
        let site_id = arena.sites.keys().max().copied().unwrap_or(0) + 1;
        arena.sites.insert(site_id, root_page);
        site_id
    }

    /// Simulate a foreign key the store does not know how to clear
    pub fn block_deletion(&self, page: i64, relation: &str) {
        self.arena().blocked.insert(page, relation.into());
    }

    pub fn node(&self, id: i64) -> Option<PageNode> {
        self.arena().pages.get(&id).cloned()
    }

    pub fn site_root(&self, site_id: i64) -> Option<i64> {
        self.arena().sites.get(&site_id).copied()
    }

    pub fn revision_count(&self, page: i64) -> usize {
        self.arena().revisions.iter().filter(|p| **p == page).count()
    }

    pub fn len(&self) -> usize {
        self.arena().pages.len()
    }

    pub fn view_restriction_count(&self) -> usize {
        self.arena().view_restrictions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_create_child_appends_paths() {
        let store = MemoryPageStore::new();
        let a = store.add_page(1, "page", "A", true);
        let b = store.add_page(1, "page", "B", true);
        let a1 = store.add_page(a, "page", "A1", true);

        assert_eq!(store.node(a).unwrap().path, "00010001");
        assert_eq!(store.node(b).unwrap().path, "00010002");
        assert_eq!(store.node(a1).unwrap().path, "000100010001");
        assert_eq!(store.node(a1).unwrap().depth, 3);
        assert_eq!(store.node(1).unwrap().numchild, 2);

        let children = store.children(1).await.unwrap();
        assert_eq!(children.iter().map(|c| c.id).collect::<Vec<_>>(), vec![a, b]);
        assert_eq!(store.parent(a1).await.unwrap().map(|p| p.id), Some(a));
        assert_eq!(store.parent(1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_move_rewrites_subtree() {
        let store = MemoryPageStore::new();
        let a = store.add_page(1, "page", "A", true);
        let b = store.add_page(1, "page", "B", true);
        let b_existing = store.add_page(b, "page", "B1", true);
        let a1 = store.add_page(a, "page", "A1", true);
        let a1x = store.add_page(a1, "page", "A1x", true);

        assert_ok!(store.move_to_last_child(a1, b).await);

        assert_eq!(store.node(b_existing).unwrap().path, "000100020001");
        assert_eq!(store.node(a1).unwrap().path, "000100020002");
        assert_eq!(store.node(a1x).unwrap().path, "0001000200020001");
        assert_eq!(store.node(a1x).unwrap().depth, 4);
        assert_eq!(store.node(a).unwrap().numchild, 0);
        assert_eq!(store.node(b).unwrap().numchild, 2);
    }

    #[tokio::test]
    async fn test_move_into_own_subtree_is_rejected() {
        let store = MemoryPageStore::new();
        let a = store.add_page(1, "page", "A", true);
        let a1 = store.add_page(a, "page", "A1", true);

        let err = assert_err!(store.move_to_last_child(a, a1).await);
        assert!(matches!(err, TreeError::MoveIntoDescendant { .. }));
    }

    #[tokio::test]
    async fn test_delete_respects_references() {
        let store = MemoryPageStore::new();
        let a = store.add_page(1, "page", "A", true);
        let a1 = store.add_page(a, "page", "A1", true);

        assert!(matches!(
            store.delete_page(a).await,
            Err(TreeError::HasChildren { count: 1, .. })
        ));

        store.add_redirect_to(a1);
        assert!(matches!(store.delete_page(a1).await, Err(TreeError::Referenced { .. })));

        assert_eq!(assert_ok!(store.delete_redirects_to(a1).await), 1);
        assert_ok!(store.delete_page(a1).await);
        assert_eq!(store.node(a).unwrap().numchild, 0);
        assert_ok!(store.delete_page(a).await);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_aliases_removes_alias_subtrees() {
        let store = MemoryPageStore::new();
        let a = store.add_page(1, "page", "A", true);
        let other = store.add_page(1, "page", "Other", true);
        let alias = store.add_alias(other, a);
        store.add_page(alias, "page", "Under alias", true);

        assert_eq!(assert_ok!(store.delete_aliases_of(a).await), 1);
        assert!(store.node(alias).is_none());
        assert_eq!(store.node(other).unwrap().numchild, 0);
        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn test_snapshot_round_trip_keeps_relations() {
        let pages = vec![
            PageNode {
                id: 1,
                content_type: "page".into(),
                title: "Root".into(),
                slug: "root".into(),
                path: "0001".into(),
                depth: 1,
                numchild: 1,
                live: true,
                locked: false,
                alias_of: None,
            },
            PageNode {
                id: 9,
                content_type: "servicesindexpage".into(),
                title: "Services".into(),
                slug: "services".into(),
                path: "00010001".into(),
                depth: 2,
                numchild: 0,
                live: true,
                locked: false,
                alias_of: None,
            },
        ];
        let store = MemoryPageStore::from_snapshot(TreeSnapshot {
            pages,
            sites: vec![(3, 9)],
            ..TreeSnapshot::default()
        });

        assert_eq!(store.sites_rooted_at(9).await.unwrap(), vec![3]);
        let created = store
            .create_child(
                1,
                NewPage {
                    content_type: "page".into(),
                    title: "New".into(),
                    slug: "new".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(created.id, 10);
        assert_eq!(created.path, "00010002");
    }
}
