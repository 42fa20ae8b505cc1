//! Modification validation
//!
//! A validator inspects each modification of a transaction after diffing
//! and before commit. Rejection aborts the whole transaction with zero
//! effect. External collaborators use this to forbid edits to e.g.
//! read-only remote-backed folders.

use std::sync::Arc;

use crate::error::{BookmarksError, Result};
use crate::models::{BookmarkId, BookmarkKind};
use crate::modification::BookmarksModification;
use crate::sync::{ConnectionState, RemoteBookmarksStoreManager};
use crate::tree::BookmarksTree;

/// Decides whether a modification may be committed
pub trait BookmarksModificationValidator: Send + Sync {
    /// Validate one modification against the snapshot it was applied to
    fn validate_modification(&self, modification: &BookmarksModification) -> Result<()>;

    /// Whether the given bookmark may be modified at all
    ///
    /// Used by callers (menus, editors) to grey out actions before any
    /// transaction is attempted.
    fn validate_bookmark(&self, _tree: &BookmarksTree, _bookmark_id: &BookmarkId) -> Result<()> {
        Ok(())
    }
}

/// Validator that lets every modification through
#[derive(Debug, Default)]
pub struct AcceptAllModificationsValidator;

impl BookmarksModificationValidator for AcceptAllModificationsValidator {
    fn validate_modification(&self, _modification: &BookmarksModification) -> Result<()> {
        Ok(())
    }
}

/// Validator protecting remote-backed folders
///
/// An edit under a remote folder is only allowed while that folder's store
/// is connected and the folder is not marked read-only. Moving a remote
/// folder under another remote folder is always rejected.
pub struct RemoteFolderValidator {
    store_manager: Arc<RemoteBookmarksStoreManager>,
}

impl RemoteFolderValidator {
    pub fn new(store_manager: Arc<RemoteBookmarksStoreManager>) -> Self {
        Self { store_manager }
    }

    fn check_modifiable(&self, tree: &BookmarksTree, bookmark_id: &BookmarkId) -> Result<()> {
        if !tree.contains(bookmark_id) {
            return Err(BookmarksError::Validation(format!(
                "cannot find bookmark '{bookmark_id}'"
            )));
        }
        let Some(remote_folder) = self.store_manager.remote_folder_containing(tree, bookmark_id)
        else {
            return Ok(());
        };
        let connected = self
            .store_manager
            .store(remote_folder.store_id())
            .map(|store| store.state() == ConnectionState::Connected)
            .unwrap_or(false);
        if connected && !remote_folder.is_readonly() {
            Ok(())
        } else {
            Err(BookmarksError::Validation(
                "cannot modify a bookmark under a shared folder that is not connected or is read-only"
                    .to_string(),
            ))
        }
    }

    fn contains_remote_folder(&self, tree: &BookmarksTree, bookmark_id: &BookmarkId) -> bool {
        let Some(node) = tree.bookmark(bookmark_id) else {
            return false;
        };
        if node.kind() == BookmarkKind::Bookmark {
            return self
                .store_manager
                .remote_bookmark_folder(bookmark_id)
                .is_some();
        }
        tree.subtree_ids(bookmark_id)
            .iter()
            .any(|id| self.store_manager.remote_bookmark_folder(id).is_some())
    }
}

impl BookmarksModificationValidator for RemoteFolderValidator {
    fn validate_modification(&self, modification: &BookmarksModification) -> Result<()> {
        match modification {
            BookmarksModification::Added(m) => {
                self.check_modifiable(&m.source_tree, &m.parent_id)
            }
            BookmarksModification::Deleted(m) => {
                self.check_modifiable(&m.source_tree, &m.parent_id)
            }
            BookmarksModification::PropertiesChanged(m) => {
                self.check_modifiable(&m.source_tree, &m.bookmark_id)
            }
            BookmarksModification::Moved(m) => {
                self.check_modifiable(&m.source_tree, &m.new_parent_id)?;
                if self
                    .store_manager
                    .remote_folder_containing(&m.source_tree, &m.new_parent_id)
                    .is_none()
                {
                    return Ok(());
                }
                for bookmark_id in &m.bookmark_ids {
                    if self.contains_remote_folder(&m.source_tree, bookmark_id) {
                        return Err(BookmarksError::Validation(
                            "cannot move a remote bookmark folder under another remote folder"
                                .to_string(),
                        ));
                    }
                }
                Ok(())
            }
        }
    }

    fn validate_bookmark(&self, tree: &BookmarksTree, bookmark_id: &BookmarkId) -> Result<()> {
        self.check_modifiable(tree, bookmark_id)
    }
}
