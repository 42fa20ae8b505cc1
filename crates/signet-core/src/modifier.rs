//! Transaction-scoped tree modifier
//!
//! A `BookmarksTreeModifier` is bound to one in-progress transaction. It
//! forwards every tree operation, always against the latest intermediate
//! snapshot, and records one modification event per effective operation.
//! It exposes no way to commit; only `BookmarkDatabase` can do that.

use std::collections::BTreeMap;

use crate::error::Result;
use crate::models::{Bookmark, BookmarkId, PROPERTY_NAME};
use crate::modification::{
    coalesce, BookmarkDeletedModification, BookmarkPropertiesModification,
    BookmarksAddedModification, BookmarksModification, BookmarksMovedModification,
};
use crate::tree::BookmarksTree;

/// Accumulates the edits of one unit of work
pub struct BookmarksTreeModifier {
    original_tree: BookmarksTree,
    current_tree: BookmarksTree,
    modifications: Vec<BookmarksModification>,
}

impl BookmarksTreeModifier {
    pub fn new(tree: BookmarksTree) -> Self {
        Self {
            original_tree: tree.clone(),
            current_tree: tree,
            modifications: Vec::new(),
        }
    }

    /// Snapshot this transaction started from
    pub fn original_tree(&self) -> &BookmarksTree {
        &self.original_tree
    }

    /// Latest tree reflecting all edits issued so far in this transaction
    pub fn current_tree(&self) -> &BookmarksTree {
        &self.current_tree
    }

    /// Ordered modification events recorded so far
    pub fn modifications(&self) -> &[BookmarksModification] {
        &self.modifications
    }

    pub fn add_bookmarks(&mut self, parent_id: &BookmarkId, bookmarks: Vec<Bookmark>) -> Result<()> {
        let target = self.current_tree.add_bookmarks(parent_id, bookmarks.clone())?;
        self.record_added(parent_id, bookmarks, target);
        Ok(())
    }

    pub fn add_bookmarks_before(
        &mut self,
        parent_id: &BookmarkId,
        anchor_id: &BookmarkId,
        bookmarks: Vec<Bookmark>,
    ) -> Result<()> {
        let target =
            self.current_tree
                .add_bookmarks_before(parent_id, anchor_id, bookmarks.clone())?;
        self.record_added(parent_id, bookmarks, target);
        Ok(())
    }

    pub fn add_bookmarks_after(
        &mut self,
        parent_id: &BookmarkId,
        anchor_id: &BookmarkId,
        bookmarks: Vec<Bookmark>,
    ) -> Result<()> {
        let target =
            self.current_tree
                .add_bookmarks_after(parent_id, anchor_id, bookmarks.clone())?;
        self.record_added(parent_id, bookmarks, target);
        Ok(())
    }

    pub fn delete_bookmark(&mut self, id: &BookmarkId, recurse: bool) -> Result<()> {
        // capture before the node disappears
        let bookmark = self.current_tree.bookmark(id).cloned();
        let parent = self.current_tree.parent(id).map(|p| p.id().clone());
        let target = self.current_tree.delete_bookmark(id, recurse)?;
        if let (Some(bookmark), Some(parent_id)) = (bookmark, parent) {
            self.modifications
                .push(BookmarksModification::Deleted(BookmarkDeletedModification {
                    source_tree: self.current_tree.clone(),
                    target_tree: target.clone(),
                    parent_id,
                    bookmark,
                    recursive: recurse,
                }));
        }
        self.current_tree = target;
        Ok(())
    }

    pub fn move_bookmarks(&mut self, ids: &[BookmarkId], dest_id: &BookmarkId) -> Result<()> {
        let target = self.current_tree.move_bookmarks(ids, dest_id)?;
        self.record_moved(ids, dest_id, target);
        Ok(())
    }

    pub fn move_bookmarks_before(
        &mut self,
        ids: &[BookmarkId],
        dest_id: &BookmarkId,
        anchor_id: &BookmarkId,
    ) -> Result<()> {
        let target = self
            .current_tree
            .move_bookmarks_before(ids, dest_id, anchor_id)?;
        self.record_moved(ids, dest_id, target);
        Ok(())
    }

    pub fn move_bookmarks_after(
        &mut self,
        ids: &[BookmarkId],
        dest_id: &BookmarkId,
        anchor_id: &BookmarkId,
    ) -> Result<()> {
        let target = self
            .current_tree
            .move_bookmarks_after(ids, dest_id, anchor_id)?;
        self.record_moved(ids, dest_id, target);
        Ok(())
    }

    pub fn set_property_value(
        &mut self,
        id: &BookmarkId,
        key: &str,
        value: impl Into<String>,
    ) -> Result<()> {
        let target = self.current_tree.set_property_value(id, key, value)?;
        self.record_properties_changed(id, target);
        Ok(())
    }

    pub fn set_properties(
        &mut self,
        id: &BookmarkId,
        properties: BTreeMap<String, String>,
    ) -> Result<()> {
        let target = self.current_tree.set_properties(id, properties)?;
        self.record_properties_changed(id, target);
        Ok(())
    }

    /// Reorder a folder's children alphabetically by display name
    ///
    /// Sorting is layered on top of the tree: it reissues the children in
    /// the new order through one move. Children without a name sort after
    /// named ones; the tree itself never sorts implicitly.
    pub fn sort_by_name(&mut self, folder_id: &BookmarkId) -> Result<()> {
        let mut ids: Vec<BookmarkId> = self.current_tree.child_ids(folder_id).to_vec();
        ids.sort_by(|a, b| {
            let name = |id: &BookmarkId| {
                self.current_tree
                    .bookmark(id)
                    .and_then(|bookmark| bookmark.property(PROPERTY_NAME))
                    .map(str::to_lowercase)
            };
            match (name(a), name(b)) {
                (Some(left), Some(right)) => left.cmp(&right),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            }
        });
        self.move_bookmarks(&ids, folder_id)
    }

    /// Merge adjacent property events before commit
    pub(crate) fn optimize(&mut self) {
        let modifications = std::mem::take(&mut self.modifications);
        self.modifications = coalesce(modifications);
    }

    pub(crate) fn take_modifications(&mut self) -> Vec<BookmarksModification> {
        std::mem::take(&mut self.modifications)
    }

    fn record_added(
        &mut self,
        parent_id: &BookmarkId,
        bookmarks: Vec<Bookmark>,
        target: BookmarksTree,
    ) {
        if !target.ptr_eq(&self.current_tree) {
            self.modifications
                .push(BookmarksModification::Added(BookmarksAddedModification {
                    source_tree: self.current_tree.clone(),
                    target_tree: target.clone(),
                    parent_id: parent_id.clone(),
                    bookmarks,
                }));
        }
        self.current_tree = target;
    }

    fn record_moved(&mut self, ids: &[BookmarkId], dest_id: &BookmarkId, target: BookmarksTree) {
        if !target.ptr_eq(&self.current_tree) {
            self.modifications
                .push(BookmarksModification::Moved(BookmarksMovedModification {
                    source_tree: self.current_tree.clone(),
                    target_tree: target.clone(),
                    bookmark_ids: ids.to_vec(),
                    new_parent_id: dest_id.clone(),
                }));
        }
        self.current_tree = target;
    }

    fn record_properties_changed(&mut self, id: &BookmarkId, target: BookmarksTree) {
        if !target.ptr_eq(&self.current_tree) {
            self.modifications.push(BookmarksModification::PropertiesChanged(
                BookmarkPropertiesModification {
                    source_tree: self.current_tree.clone(),
                    target_tree: target.clone(),
                    bookmark_id: id.clone(),
                },
            ));
        }
        self.current_tree = target;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::error::BookmarksError;

    fn bookmark(id: &str) -> Bookmark {
        Bookmark::new(BookmarkId::from(id), BTreeMap::new())
    }

    fn named_bookmark(id: &str, name: &str) -> Bookmark {
        bookmark(id).with_property(PROPERTY_NAME, name)
    }

    fn folder(id: &str) -> Bookmark {
        Bookmark::folder(BookmarkId::from(id), BTreeMap::new())
    }

    fn id(value: &str) -> BookmarkId {
        BookmarkId::from(value)
    }

    fn modifier() -> BookmarksTreeModifier {
        let tree = BookmarksTree::new(folder("root")).unwrap();
        let tree = tree
            .add_bookmarks(&id("root"), vec![folder("folder1")])
            .unwrap();
        BookmarksTreeModifier::new(tree)
    }

    #[test]
    fn test_edits_see_the_current_tree() {
        let mut modifier = modifier();
        modifier
            .add_bookmarks(&id("folder1"), vec![bookmark("a")])
            .unwrap();
        // the second edit depends on the first one being visible
        modifier
            .add_bookmarks_after(&id("folder1"), &id("a"), vec![bookmark("b")])
            .unwrap();
        let order: Vec<&BookmarkId> = modifier.current_tree().child_ids(&id("folder1")).iter().collect();
        assert_eq!(order, [&id("a"), &id("b")]);
        assert!(modifier.original_tree().bookmark(&id("a")).is_none());
    }

    #[test]
    fn test_records_one_event_per_effective_operation() {
        let mut modifier = modifier();
        modifier
            .add_bookmarks(&id("folder1"), vec![bookmark("a")])
            .unwrap();
        modifier
            .set_property_value(&id("a"), PROPERTY_NAME, "first")
            .unwrap();
        modifier.delete_bookmark(&id("a"), false).unwrap();
        assert_eq!(modifier.modifications().len(), 3);
        assert!(matches!(
            modifier.modifications()[0],
            BookmarksModification::Added(_)
        ));
        assert!(matches!(
            modifier.modifications()[2],
            BookmarksModification::Deleted(_)
        ));
    }

    #[test]
    fn test_no_event_for_no_op_edits() {
        let mut modifier = modifier();
        modifier
            .set_property_value(&id("folder1"), PROPERTY_NAME, "work")
            .unwrap();
        modifier
            .set_property_value(&id("folder1"), PROPERTY_NAME, "work")
            .unwrap();
        assert_eq!(modifier.modifications().len(), 1);
    }

    #[test]
    fn test_failed_edit_leaves_current_tree_unchanged() {
        let mut modifier = modifier();
        let err = modifier
            .add_bookmarks(&id("missing"), vec![bookmark("a")])
            .unwrap_err();
        assert!(matches!(err, BookmarksError::NotAFolder(_)));
        assert!(modifier.current_tree().ptr_eq(modifier.original_tree()));
        assert!(modifier.modifications().is_empty());
    }

    #[test]
    fn test_optimize_coalesces_property_edits() {
        let mut modifier = modifier();
        modifier
            .set_property_value(&id("folder1"), PROPERTY_NAME, "first")
            .unwrap();
        modifier
            .set_property_value(&id("folder1"), PROPERTY_NAME, "second")
            .unwrap();
        modifier.optimize();
        assert_eq!(modifier.modifications().len(), 1);
        assert!(modifier.modifications()[0]
            .target_tree()
            .ptr_eq(modifier.current_tree()));
    }

    #[test]
    fn test_sort_by_name() {
        let mut modifier = modifier();
        modifier
            .add_bookmarks(
                &id("folder1"),
                vec![
                    named_bookmark("c", "cherry"),
                    named_bookmark("a", "Apple"),
                    bookmark("n"),
                    named_bookmark("b", "banana"),
                ],
            )
            .unwrap();
        modifier.sort_by_name(&id("folder1")).unwrap();
        let order: Vec<String> = modifier
            .current_tree()
            .child_ids(&id("folder1"))
            .iter()
            .map(|child| child.to_string())
            .collect();
        assert_eq!(order, ["a", "b", "c", "n"]);
    }

    #[test]
    fn test_sort_already_sorted_records_nothing() {
        let mut modifier = modifier();
        modifier
            .add_bookmarks(
                &id("folder1"),
                vec![named_bookmark("a", "apple"), named_bookmark("b", "banana")],
            )
            .unwrap();
        let before = modifier.modifications().len();
        modifier.sort_by_name(&id("folder1")).unwrap();
        assert_eq!(modifier.modifications().len(), before);
    }
}
