//! Signet Core Library
//!
//! This crate provides the core functionality for Signet, an embedded
//! document database for hierarchical bookmark collections.
//!
//! # Architecture
//!
//! - **BookmarksTree**: immutable persistent tree value; every edit
//!   returns a new snapshot, so readers never see a torn tree
//! - **BookmarkDatabase**: transactional engine with pessimistic and
//!   optimistic locking and synchronous change notifications
//! - **BookmarksTreeMerger**: reconciles remotely loaded subtrees into
//!   the local tree while preserving node identity
//!
//! # Quick Start
//!
//! ```text
//! let tree = BookmarksTree::new(Bookmark::folder(BookmarkId::new(), Default::default()))?;
//! let database = BookmarkDatabase::new("workspace", tree);
//!
//! // Add a bookmark
//! let folder_id = database.tree().root_id().clone();
//! database.modify(|modifier| {
//!     modifier.add_bookmarks(&folder_id, vec![bookmark])
//! })?;
//!
//! // Query the latest snapshot
//! let tree = database.tree();
//! ```
//!
//! # Modules
//!
//! - `database`: transactional engine (main entry point)
//! - `tree`: immutable tree value and its operations
//! - `models`: bookmark ids, nodes, and well-known properties
//! - `modifier`: transaction-scoped edit accumulator
//! - `modification`: change events delivered to listeners
//! - `merge`: remote subtree reconciliation
//! - `storage`: JSON serialization boundary and dirty tracking
//! - `sync`: remote store traits and the refresh/retry workflow
//! - `validation`: modification validators
//! - `config`: tunables

pub mod config;
pub mod database;
pub mod error;
pub mod merge;
pub mod modification;
pub mod models;
pub mod modifier;
pub mod storage;
pub mod sync;
pub mod tree;
pub mod validation;

pub use config::Config;
pub use database::{BookmarkDatabase, BookmarksListener, LockMode};
pub use error::{BookmarksError, Result};
pub use merge::BookmarksTreeMerger;
pub use modification::{
    BookmarkDeletedModification, BookmarkPropertiesModification, BookmarksAddedModification,
    BookmarksModification, BookmarksMovedModification,
};
pub use models::{Bookmark, BookmarkId, BookmarkKind};
pub use modifier::BookmarksTreeModifier;
pub use storage::{
    BookmarksDirtyStateTracker, BookmarksTreeJsonDeserializer, BookmarksTreeJsonSerializer,
};
pub use sync::{
    retry_on_conflict, CancellationToken, ConnectionState, RefreshRemoteFolderOperation,
    RemoteBookmarkFolder, RemoteBookmarksStore, RemoteBookmarksStoreManager, RemoteBookmarksTree,
    RetryPolicy,
};
pub use tree::BookmarksTree;
pub use validation::{
    AcceptAllModificationsValidator, BookmarksModificationValidator, RemoteFolderValidator,
};
