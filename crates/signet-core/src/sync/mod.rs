//! Remote bookmarks stores
//!
//! The core performs no network I/O. Remote stores (a shared drive, a
//! team server) implement `RemoteBookmarksStore` outside the core; the
//! refresh workflow in this module only consumes loaded trees and feeds
//! them to the merger under an optimistic transaction.

mod refresh;
mod retry;

pub use refresh::RefreshRemoteFolderOperation;
pub use retry::{retry_on_conflict, CancellationToken, RetryPolicy};

use std::collections::BTreeMap;
use std::io;
use std::sync::Arc;

use crate::models::BookmarkId;
use crate::tree::BookmarksTree;

/// Remote folder property marking it read-only for local editors
pub const PROP_READONLY: &str = "readonly";

/// Connection lifecycle of a remote store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// A local folder that is backed by a remote store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteBookmarkFolder {
    store_id: String,
    folder_id: BookmarkId,
    properties: BTreeMap<String, String>,
}

impl RemoteBookmarkFolder {
    pub fn new(
        store_id: impl Into<String>,
        folder_id: BookmarkId,
        properties: BTreeMap<String, String>,
    ) -> Self {
        Self {
            store_id: store_id.into(),
            folder_id,
            properties,
        }
    }

    pub fn store_id(&self) -> &str {
        &self.store_id
    }

    pub fn folder_id(&self) -> &BookmarkId {
        &self.folder_id
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    pub fn is_readonly(&self) -> bool {
        self.properties
            .get(PROP_READONLY)
            .is_some_and(|value| value.eq_ignore_ascii_case("true"))
    }
}

/// The authoritative state of one remote folder, as last loaded
#[derive(Debug, Clone)]
pub struct RemoteBookmarksTree {
    tree: BookmarksTree,
    etag: String,
}

impl RemoteBookmarksTree {
    pub fn new(tree: BookmarksTree, etag: impl Into<String>) -> Self {
        Self {
            tree,
            etag: etag.into(),
        }
    }

    pub fn tree(&self) -> &BookmarksTree {
        &self.tree
    }

    pub fn etag(&self) -> &str {
        &self.etag
    }

    pub fn into_tree(self) -> BookmarksTree {
        self.tree
    }
}

/// A store holding remotely shared bookmark folders
///
/// Implemented by connectors outside the core; everything here is
/// synchronous from the caller's point of view, whatever I/O happens
/// underneath.
pub trait RemoteBookmarksStore: Send + Sync {
    /// Stable identifier of this store
    fn id(&self) -> &str;

    /// Human-readable store name
    fn label(&self) -> &str;

    fn state(&self) -> ConnectionState;

    /// Every folder this store backs
    fn remote_bookmark_folders(&self) -> Vec<RemoteBookmarkFolder>;

    /// This store's descriptor for one folder, if it backs it
    fn remote_bookmark_folder(&self, folder_id: &BookmarkId) -> Option<RemoteBookmarkFolder>;

    /// Load the authoritative subtree for a folder
    fn load(&self, folder_id: &BookmarkId) -> io::Result<RemoteBookmarksTree>;
}

/// Explicit collection of the remote stores available to one database
///
/// Constructed once and passed by reference to collaborators; there is no
/// process-wide registry.
pub struct RemoteBookmarksStoreManager {
    stores: Vec<Arc<dyn RemoteBookmarksStore>>,
}

impl RemoteBookmarksStoreManager {
    pub fn new(stores: Vec<Arc<dyn RemoteBookmarksStore>>) -> Self {
        Self { stores }
    }

    pub fn stores(&self) -> &[Arc<dyn RemoteBookmarksStore>] {
        &self.stores
    }

    pub fn store(&self, id: &str) -> Option<&Arc<dyn RemoteBookmarksStore>> {
        self.stores.iter().find(|store| store.id() == id)
    }

    /// The store-backed descriptor of a folder, from whichever store backs it
    pub fn remote_bookmark_folder(&self, folder_id: &BookmarkId) -> Option<RemoteBookmarkFolder> {
        self.stores
            .iter()
            .find_map(|store| store.remote_bookmark_folder(folder_id))
    }

    /// Walk up from a bookmark to the nearest remote-backed ancestor folder
    ///
    /// A bookmark inside a remote folder is governed by that folder's
    /// store; a remote folder is governed by itself.
    pub fn remote_folder_containing(
        &self,
        tree: &BookmarksTree,
        bookmark_id: &BookmarkId,
    ) -> Option<RemoteBookmarkFolder> {
        let node = tree.bookmark(bookmark_id)?;
        let mut current = if node.is_folder() {
            Some(node)
        } else {
            tree.parent(bookmark_id)
        };
        while let Some(folder) = current {
            if let Some(remote_folder) = self.remote_bookmark_folder(folder.id()) {
                return Some(remote_folder);
            }
            current = tree.parent(folder.id());
        }
        None
    }
}


#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::testing::InMemoryRemoteBookmarksStore;
    use super::*;
    use crate::models::Bookmark;

    fn id(value: &str) -> BookmarkId {
        BookmarkId::from(value)
    }

    fn tree() -> BookmarksTree {
        let tree =
            BookmarksTree::new(Bookmark::folder(id("root"), BTreeMap::new())).unwrap();
        let tree = tree
            .add_bookmarks(&id("root"), vec![Bookmark::folder(id("shared"), BTreeMap::new())])
            .unwrap();
        tree.add_bookmarks(
            &id("shared"),
            vec![Bookmark::new(id("b1"), BTreeMap::new())],
        )
        .unwrap()
    }

    fn manager_with_shared_folder() -> (Arc<InMemoryRemoteBookmarksStore>, RemoteBookmarksStoreManager)
    {
        let store = Arc::new(InMemoryRemoteBookmarksStore::new("memory"));
        store.add(&tree(), &id("shared")).unwrap();
        let manager = RemoteBookmarksStoreManager::new(vec![store.clone()]);
        (store, manager)
    }

    #[test]
    fn test_readonly_folder_property() {
        let mut properties = BTreeMap::new();
        properties.insert(PROP_READONLY.to_string(), "TRUE".to_string());
        let folder = RemoteBookmarkFolder::new("store", id("f"), properties);
        assert!(folder.is_readonly());

        let folder = RemoteBookmarkFolder::new("store", id("f"), BTreeMap::new());
        assert!(!folder.is_readonly());
    }

    #[test]
    fn test_remote_folder_containing_walks_ancestors() {
        let (_, manager) = manager_with_shared_folder();
        let tree = tree();

        // a bookmark inside the shared folder is governed by it
        let containing = manager.remote_folder_containing(&tree, &id("b1")).unwrap();
        assert_eq!(containing.folder_id(), &id("shared"));

        // the shared folder is governed by itself
        let containing = manager.remote_folder_containing(&tree, &id("shared")).unwrap();
        assert_eq!(containing.folder_id(), &id("shared"));

        // nodes outside any shared folder are not governed
        assert!(manager.remote_folder_containing(&tree, &id("root")).is_none());
    }

    #[test]
    fn test_store_lookup_by_id() {
        let (_, manager) = manager_with_shared_folder();
        assert!(manager.store("memory").is_some());
        assert!(manager.store("other").is_none());
    }
}
