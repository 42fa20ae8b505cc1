//! Modification events
//!
//! Tagged diff records describing what changed between two tree snapshots.
//! Each event carries the before/after snapshots plus the ids involved, so
//! a listener can update a derived index (a UI model, a marker map)
//! incrementally instead of rescanning the whole tree.

use crate::models::{Bookmark, BookmarkId};
use crate::tree::BookmarksTree;

/// Bookmarks inserted into a folder
#[derive(Debug, Clone)]
pub struct BookmarksAddedModification {
    pub source_tree: BookmarksTree,
    pub target_tree: BookmarksTree,
    pub parent_id: BookmarkId,
    pub bookmarks: Vec<Bookmark>,
}

/// A bookmark (and, recursively, its descendants) removed from the tree
#[derive(Debug, Clone)]
pub struct BookmarkDeletedModification {
    pub source_tree: BookmarksTree,
    pub target_tree: BookmarksTree,
    pub parent_id: BookmarkId,
    pub bookmark: Bookmark,
    pub recursive: bool,
}

/// A bookmark's property map replaced
#[derive(Debug, Clone)]
pub struct BookmarkPropertiesModification {
    pub source_tree: BookmarksTree,
    pub target_tree: BookmarksTree,
    pub bookmark_id: BookmarkId,
}

/// Bookmarks re-parented and/or reordered
#[derive(Debug, Clone)]
pub struct BookmarksMovedModification {
    pub source_tree: BookmarksTree,
    pub target_tree: BookmarksTree,
    pub bookmark_ids: Vec<BookmarkId>,
    pub new_parent_id: BookmarkId,
}

/// One entry in the ordered change list of a transaction
#[derive(Debug, Clone)]
pub enum BookmarksModification {
    Added(BookmarksAddedModification),
    Deleted(BookmarkDeletedModification),
    PropertiesChanged(BookmarkPropertiesModification),
    Moved(BookmarksMovedModification),
}

impl BookmarksModification {
    /// Snapshot this modification was applied to
    pub fn source_tree(&self) -> &BookmarksTree {
        match self {
            BookmarksModification::Added(m) => &m.source_tree,
            BookmarksModification::Deleted(m) => &m.source_tree,
            BookmarksModification::PropertiesChanged(m) => &m.source_tree,
            BookmarksModification::Moved(m) => &m.source_tree,
        }
    }

    /// Snapshot produced by this modification
    pub fn target_tree(&self) -> &BookmarksTree {
        match self {
            BookmarksModification::Added(m) => &m.target_tree,
            BookmarksModification::Deleted(m) => &m.target_tree,
            BookmarksModification::PropertiesChanged(m) => &m.target_tree,
            BookmarksModification::Moved(m) => &m.target_tree,
        }
    }
}

/// Merge adjacent property changes to the same bookmark into one event
///
/// A unit of work that rewrites the same node several times (rename, then
/// comment, then timestamp) collapses to a single event spanning the first
/// source snapshot and the last target snapshot. Order of surviving events
/// is unchanged.
pub(crate) fn coalesce(modifications: Vec<BookmarksModification>) -> Vec<BookmarksModification> {
    let mut result: Vec<BookmarksModification> = Vec::with_capacity(modifications.len());
    for modification in modifications {
        if let (
            Some(BookmarksModification::PropertiesChanged(last)),
            BookmarksModification::PropertiesChanged(next),
        ) = (result.last_mut(), &modification)
        {
            if last.bookmark_id == next.bookmark_id {
                last.target_tree = next.target_tree.clone();
                continue;
            }
        }
        result.push(modification);
    }
    result
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::models::PROPERTY_NAME;

    fn tree_with_bookmark() -> BookmarksTree {
        let tree =
            BookmarksTree::new(Bookmark::folder(BookmarkId::from("root"), BTreeMap::new())).unwrap();
        tree.add_bookmarks(
            &BookmarkId::from("root"),
            vec![Bookmark::new(BookmarkId::from("b1"), BTreeMap::new())],
        )
        .unwrap()
    }

    fn properties_changed(
        source: &BookmarksTree,
        target: &BookmarksTree,
        id: &str,
    ) -> BookmarksModification {
        BookmarksModification::PropertiesChanged(BookmarkPropertiesModification {
            source_tree: source.clone(),
            target_tree: target.clone(),
            bookmark_id: BookmarkId::from(id),
        })
    }

    #[test]
    fn test_coalesce_merges_adjacent_property_changes() {
        let t0 = tree_with_bookmark();
        let t1 = t0
            .set_property_value(&BookmarkId::from("b1"), PROPERTY_NAME, "first")
            .unwrap();
        let t2 = t1
            .set_property_value(&BookmarkId::from("b1"), PROPERTY_NAME, "second")
            .unwrap();

        let coalesced = coalesce(vec![
            properties_changed(&t0, &t1, "b1"),
            properties_changed(&t1, &t2, "b1"),
        ]);
        assert_eq!(coalesced.len(), 1);
        assert!(coalesced[0].source_tree().ptr_eq(&t0));
        assert!(coalesced[0].target_tree().ptr_eq(&t2));
    }

    #[test]
    fn test_coalesce_keeps_changes_to_different_bookmarks() {
        let t0 = tree_with_bookmark();
        let t1 = t0
            .set_property_value(&BookmarkId::from("b1"), PROPERTY_NAME, "x")
            .unwrap();
        let coalesced = coalesce(vec![
            properties_changed(&t0, &t1, "b1"),
            properties_changed(&t0, &t1, "root"),
            properties_changed(&t0, &t1, "b1"),
        ]);
        assert_eq!(coalesced.len(), 3);
    }
}
