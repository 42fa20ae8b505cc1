//! Error handling for bookmark database operations
//!
//! Provides typed errors for every failure class the database can surface:
//! structural misuse of the tree, validation rejections, transient commit
//! conflicts, cancellation, and wrapped remote I/O failures.

use std::io;

use thiserror::Error;

use crate::models::BookmarkId;

/// Errors that can occur while querying or modifying the bookmark database
#[derive(Error, Debug)]
pub enum BookmarksError {
    /// The target of an add/move operation is missing or not a folder
    #[error("bookmark '{0}' is not a folder")]
    NotAFolder(BookmarkId),

    /// The anchor of a positional insert/move is not a child of the folder
    #[error("bookmark '{anchor}' is not a child of folder '{parent}'")]
    UnknownAnchor {
        parent: BookmarkId,
        anchor: BookmarkId,
    },

    /// The bookmark does not exist in the tree
    #[error("unknown bookmark '{0}'")]
    UnknownBookmark(BookmarkId),

    /// A bookmark with this id already exists somewhere in the tree
    #[error("bookmark '{0}' already exists")]
    DuplicateBookmark(BookmarkId),

    /// Non-recursive delete of a folder that still has children
    #[error("folder '{0}' is not empty")]
    FolderNotEmpty(BookmarkId),

    /// Moving a folder into itself or one of its descendants
    #[error("cannot move folder '{0}' into its own subtree")]
    RecursiveMove(BookmarkId),

    /// The root folder cannot be deleted
    #[error("cannot delete the root folder '{0}'")]
    RootFolderDeletion(BookmarkId),

    /// A modification validator rejected the transaction
    #[error("modification rejected: {0}")]
    Validation(String),

    /// Another transaction committed between snapshot and commit attempt
    #[error("bookmarks have changed")]
    OptimisticLock,

    /// The database has unsaved local modifications
    #[error("bookmark database has unsaved modifications")]
    Dirty,

    /// The caller's cancellation token was triggered
    #[error("operation cancelled")]
    Cancelled,

    /// The folder is not backed by any remote bookmarks store
    #[error("bookmark '{0}' is not a remote folder")]
    NotRemoteFolder(BookmarkId),

    /// No remote bookmarks store registered under this id
    #[error("remote bookmarks store '{0}' not found")]
    UnknownStore(String),

    /// A remote store operation failed; the original cause is attached
    #[error("{context}")]
    Remote {
        context: String,
        #[source]
        source: io::Error,
    },

    /// A serialized tree does not follow the expected structure
    #[error("invalid bookmarks format: {0}")]
    InvalidFormat(String),

    /// The byte stream is not well-formed JSON
    #[error("malformed bookmarks document: {0}")]
    Json(#[from] serde_json::Error),
}

impl BookmarksError {
    /// Wrap a remote store failure with context
    pub fn remote(context: impl Into<String>, source: io::Error) -> Self {
        BookmarksError::Remote {
            context: context.into(),
            source,
        }
    }

    /// Whether this error is a transient commit conflict
    ///
    /// Conflicts are the only class callers are expected to retry; every
    /// other variant aborts the calling workflow.
    pub fn is_conflict(&self) -> bool {
        matches!(self, BookmarksError::OptimisticLock | BookmarksError::Dirty)
    }
}

/// Result type for bookmark database operations
pub type Result<T> = std::result::Result<T, BookmarksError>;
