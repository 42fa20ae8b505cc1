//! Remote folder refresh
//!
//! Loads remote bookmark folders from their stores and replaces the
//! corresponding local subtrees. Each folder is refreshed in its own
//! optimistic transaction: the database must not be dirty with unsaved
//! local edits, and a concurrent commit surfaces as a lock conflict.
//! Both cases are transient, so the whole attempt (load + merge) is
//! retried with backoff until it succeeds or the caller cancels.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::database::{BookmarkDatabase, LockMode};
use crate::error::{BookmarksError, Result};
use crate::merge::BookmarksTreeMerger;
use crate::models::BookmarkId;
use crate::storage::BookmarksDirtyStateTracker;
use crate::sync::{
    retry_on_conflict, CancellationToken, ConnectionState, RemoteBookmarksStore,
    RemoteBookmarksStoreManager, RetryPolicy,
};

pub struct RefreshRemoteFolderOperation {
    database: Arc<BookmarkDatabase>,
    store_manager: Arc<RemoteBookmarksStoreManager>,
    dirty_state: Arc<dyn BookmarksDirtyStateTracker>,
    retry_policy: RetryPolicy,
}

impl RefreshRemoteFolderOperation {
    pub fn new(
        database: Arc<BookmarkDatabase>,
        store_manager: Arc<RemoteBookmarksStoreManager>,
        dirty_state: Arc<dyn BookmarksDirtyStateTracker>,
    ) -> Self {
        Self {
            database,
            store_manager,
            dirty_state,
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Refresh every folder of every connected store
    ///
    /// A failing folder does not stop the sweep; the first error is
    /// reported once all folders have been attempted.
    pub fn refresh_all(&self, token: &CancellationToken) -> Result<()> {
        let mut first_error = None;
        for store in self.store_manager.stores() {
            if store.state() != ConnectionState::Connected {
                continue;
            }
            if let Err(error) = self.refresh_store(store.id(), token) {
                if matches!(error, BookmarksError::Cancelled) {
                    return Err(error);
                }
                first_error.get_or_insert(error);
            }
        }
        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Refresh every folder backed by one store
    pub fn refresh_store(&self, store_id: &str, token: &CancellationToken) -> Result<()> {
        let store = self
            .store_manager
            .store(store_id)
            .ok_or_else(|| BookmarksError::UnknownStore(store_id.to_string()))?;
        let mut first_error = None;
        for remote_folder in store.remote_bookmark_folders() {
            if let Err(error) = self.refresh(remote_folder.folder_id(), token) {
                if matches!(error, BookmarksError::Cancelled) {
                    return Err(error);
                }
                warn!(
                    store = store_id,
                    folder = %remote_folder.folder_id(),
                    %error,
                    "could not refresh remote bookmark folder"
                );
                first_error.get_or_insert(error);
            }
        }
        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Replace one local folder with its remote state
    ///
    /// Retries on conflicts (a concurrent commit, a dirty database) until
    /// it succeeds or `token` is cancelled.
    pub fn refresh(&self, folder_id: &BookmarkId, token: &CancellationToken) -> Result<()> {
        let store = self
            .store_manager
            .remote_bookmark_folder(folder_id)
            .and_then(|remote_folder| self.store_manager.store(remote_folder.store_id()))
            .ok_or_else(|| BookmarksError::NotRemoteFolder(folder_id.clone()))?;
        retry_on_conflict(&self.retry_policy, token, || {
            self.refresh_once(store.as_ref(), folder_id)
        })?;
        debug!(folder = %folder_id, "refreshed remote bookmark folder");
        Ok(())
    }

    fn refresh_once(&self, store: &dyn RemoteBookmarksStore, folder_id: &BookmarkId) -> Result<()> {
        self.database
            .modify_with(LockMode::Optimistic, false, |modifier| {
                if self.dirty_state.is_dirty() {
                    return Err(BookmarksError::Dirty);
                }
                let remote = store.load(folder_id).map_err(|error| {
                    BookmarksError::remote("could not load remote bookmark folder", error)
                })?;
                BookmarksTreeMerger::new(remote.into_tree()).merge(modifier)
            })
    }
}
