//! Transactional bookmark database
//!
//! `BookmarkDatabase` owns the committed tree snapshot and a version
//! stamp. A `modify` call snapshots the tree, drives the caller's edits
//! through a `BookmarksTreeModifier`, validates the recorded
//! modifications, commits with compare-and-swap, and notifies listeners
//! synchronously while still holding the commit section, so listeners
//! never interleave two transactions' events.
//!
//! Trees are immutable values, so reads never block on writers: a reader
//! gets whatever snapshot was last committed.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::error::{BookmarksError, Result};
use crate::modification::BookmarksModification;
use crate::modifier::BookmarksTreeModifier;
use crate::tree::BookmarksTree;
use crate::validation::{AcceptAllModificationsValidator, BookmarksModificationValidator};

/// Conflict-handling strategy for concurrent transactions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Serialize the whole snapshot-edit-validate-commit pipeline.
    /// The right default for short, UI-triggered edits.
    Pessimistic,
    /// Run the edit phase without exclusion; only the final
    /// compare-and-swap is exclusive. A concurrent commit surfaces as
    /// `BookmarksError::OptimisticLock`, which callers retry.
    Optimistic,
}

/// Receives the ordered modification list of every committed transaction
pub trait BookmarksListener: Send + Sync {
    fn bookmarks_modified(&self, modifications: &[BookmarksModification]);
}

impl<F> BookmarksListener for F
where
    F: Fn(&[BookmarksModification]) + Send + Sync,
{
    fn bookmarks_modified(&self, modifications: &[BookmarksModification]) {
        self(modifications)
    }
}

struct Committed {
    tree: BookmarksTree,
    version: u64,
}

/// The shared mutable resource: one committed tree and its change protocol
pub struct BookmarkDatabase {
    id: String,
    committed: RwLock<Committed>,
    /// Held for the whole pipeline by pessimistic transactions and for
    /// commit+notification by optimistic ones. `modify` is therefore not
    /// reentrant.
    commit_lock: Mutex<()>,
    listeners: RwLock<Vec<Arc<dyn BookmarksListener>>>,
    validator: Box<dyn BookmarksModificationValidator>,
}

impl BookmarkDatabase {
    /// Create a database accepting every modification
    pub fn new(id: impl Into<String>, tree: BookmarksTree) -> Self {
        Self::with_validator(id, tree, Box::new(AcceptAllModificationsValidator))
    }

    /// Create a database with a modification validator
    pub fn with_validator(
        id: impl Into<String>,
        tree: BookmarksTree,
        validator: Box<dyn BookmarksModificationValidator>,
    ) -> Self {
        Self {
            id: id.into(),
            committed: RwLock::new(Committed { tree, version: 0 }),
            commit_lock: Mutex::new(()),
            listeners: RwLock::new(Vec::new()),
            validator,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Latest committed snapshot
    ///
    /// Always consistent; never reflects a transaction in progress.
    pub fn tree(&self) -> BookmarksTree {
        self.committed.read().tree.clone()
    }

    pub fn add_listener(&self, listener: Arc<dyn BookmarksListener>) {
        self.listeners.write().push(listener);
    }

    pub fn remove_listener(&self, listener: &Arc<dyn BookmarksListener>) {
        self.listeners
            .write()
            .retain(|registered| !Arc::ptr_eq(registered, listener));
    }

    /// Run a unit of work pessimistically with validation
    pub fn modify(
        &self,
        edit: impl FnOnce(&mut BookmarksTreeModifier) -> Result<()>,
    ) -> Result<()> {
        self.modify_with(LockMode::Pessimistic, true, edit)
    }

    /// Run a unit of work under an explicit lock mode
    ///
    /// The edit closure may read and write repeatedly through the
    /// modifier; any error it returns aborts the transaction with no
    /// visible effect. `validate` is switched off by remote-refresh
    /// workflows applying remote-authored data.
    pub fn modify_with(
        &self,
        lock_mode: LockMode,
        validate: bool,
        edit: impl FnOnce(&mut BookmarksTreeModifier) -> Result<()>,
    ) -> Result<()> {
        match lock_mode {
            LockMode::Pessimistic => self.modify_pessimistic(validate, edit),
            LockMode::Optimistic => self.modify_optimistic(validate, edit),
        }
    }

    fn modify_pessimistic(
        &self,
        validate: bool,
        edit: impl FnOnce(&mut BookmarksTreeModifier) -> Result<()>,
    ) -> Result<()> {
        let guard = self.commit_lock.lock();
        let snapshot = self.tree();
        let mut modifier = BookmarksTreeModifier::new(snapshot);
        edit(&mut modifier)?;
        if validate {
            self.validate(modifier.modifications())?;
        }
        self.commit_and_notify(modifier, guard)
    }

    fn modify_optimistic(
        &self,
        validate: bool,
        edit: impl FnOnce(&mut BookmarksTreeModifier) -> Result<()>,
    ) -> Result<()> {
        let (snapshot, version) = {
            let committed = self.committed.read();
            (committed.tree.clone(), committed.version)
        };
        let mut modifier = BookmarksTreeModifier::new(snapshot);
        edit(&mut modifier)?;
        if validate {
            self.validate(modifier.modifications())?;
        }
        let guard = self.commit_lock.lock();
        if self.committed.read().version != version {
            return Err(BookmarksError::OptimisticLock);
        }
        modifier.optimize();
        self.commit_and_notify(modifier, guard)
    }

    fn commit_and_notify(
        &self,
        mut modifier: BookmarksTreeModifier,
        guard: parking_lot::MutexGuard<'_, ()>,
    ) -> Result<()> {
        let changed = !modifier
            .current_tree()
            .ptr_eq(modifier.original_tree());
        if changed {
            let mut committed = self.committed.write();
            committed.tree = modifier.current_tree().clone();
            committed.version += 1;
            debug!(
                database = %self.id,
                version = committed.version,
                modifications = modifier.modifications().len(),
                "committed bookmarks transaction"
            );
        }
        let modifications = modifier.take_modifications();
        if !modifications.is_empty() {
            // still inside the commit section: the next transaction cannot
            // commit until every listener has seen this one's events
            self.notify(&modifications);
        }
        drop(guard);
        Ok(())
    }

    fn validate(&self, modifications: &[BookmarksModification]) -> Result<()> {
        for modification in modifications {
            self.validator.validate_modification(modification)?;
        }
        Ok(())
    }

    fn notify(&self, modifications: &[BookmarksModification]) {
        let listeners: Vec<Arc<dyn BookmarksListener>> = self.listeners.read().clone();
        for listener in listeners {
            listener.bookmarks_modified(modifications);
        }
    }
}
