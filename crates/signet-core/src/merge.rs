//! Remote subtree reconciliation
//!
//! `BookmarksTreeMerger` makes the local subtree under the remote tree's
//! root id equal to the remote tree, issuing the smallest set of modifier
//! calls it can: local-only nodes are deleted, remote-only nodes are
//! inserted at the position remote gives them, nodes present on both
//! sides keep their id and only have their properties replaced, and a
//! final move reorders children when the observed order differs from the
//! remote one. Merging the same remote tree twice records nothing the
//! second time.

use crate::error::{BookmarksError, Result};
use crate::models::{Bookmark, BookmarkId};
use crate::modifier::BookmarksTreeModifier;
use crate::tree::BookmarksTree;

pub struct BookmarksTreeMerger {
    remote_tree: BookmarksTree,
}

impl BookmarksTreeMerger {
    /// The remote tree's root id names the local folder to reconcile
    pub fn new(remote_tree: BookmarksTree) -> Self {
        Self { remote_tree }
    }

    pub fn merge(&self, modifier: &mut BookmarksTreeModifier) -> Result<()> {
        let target_id = self.remote_tree.root_id().clone();
        match modifier.current_tree().bookmark(&target_id) {
            None => return Err(BookmarksError::UnknownBookmark(target_id)),
            Some(node) if !node.is_folder() => {
                return Err(BookmarksError::NotAFolder(target_id))
            }
            Some(_) => {}
        }
        self.delete_local_only(modifier, &target_id)?;
        self.merge_folder(modifier, &target_id)
    }

    /// Remove every node of the local subtree that remote no longer has.
    /// A node whose folder/leaf kind changed remotely cannot keep its
    /// identity and is removed here too, to be re-added from remote.
    fn delete_local_only(
        &self,
        modifier: &mut BookmarksTreeModifier,
        target_id: &BookmarkId,
    ) -> Result<()> {
        let local_ids = modifier.current_tree().subtree_ids(target_id);
        for id in local_ids.iter().skip(1) {
            // an ancestor may have been deleted already
            let Some(kind) = modifier.current_tree().bookmark(id).map(Bookmark::kind) else {
                continue;
            };
            let keep = self
                .remote_tree
                .bookmark(id)
                .is_some_and(|remote_node| remote_node.kind() == kind);
            if !keep {
                modifier.delete_bookmark(id, true)?;
            }
        }
        Ok(())
    }

    fn merge_folder(
        &self,
        modifier: &mut BookmarksTreeModifier,
        folder_id: &BookmarkId,
    ) -> Result<()> {
        let Some(remote_folder) = self.remote_tree.bookmark(folder_id) else {
            return Ok(());
        };
        modifier.set_properties(folder_id, remote_folder.properties().clone())?;

        let remote_children: Vec<Bookmark> = self
            .remote_tree
            .children(folder_id)
            .into_iter()
            .cloned()
            .collect();
        let mut previous: Option<BookmarkId> = None;
        for remote_child in &remote_children {
            let child_id = remote_child.id().clone();
            if modifier.current_tree().contains(&child_id) {
                // same id on both sides: identity is preserved, only the
                // properties follow remote (folders follow on recursion)
                if !remote_child.is_folder() {
                    modifier.set_properties(&child_id, remote_child.properties().clone())?;
                }
            } else {
                self.insert_child(modifier, folder_id, previous.as_ref(), remote_child.clone())?;
            }
            previous = Some(child_id);
        }

        let remote_order: Vec<BookmarkId> = remote_children
            .iter()
            .map(|child| child.id().clone())
            .collect();
        if modifier.current_tree().child_ids(folder_id) != remote_order.as_slice() {
            modifier.move_bookmarks(&remote_order, folder_id)?;
        }

        for remote_child in &remote_children {
            if remote_child.is_folder() {
                self.merge_folder(modifier, remote_child.id())?;
            }
        }
        Ok(())
    }

    /// Insert a remote-only child at the position remote gives it: right
    /// after the previous remote sibling when that sibling is already in
    /// place, otherwise at the front (the final reorder settles the rest).
    fn insert_child(
        &self,
        modifier: &mut BookmarksTreeModifier,
        folder_id: &BookmarkId,
        previous: Option<&BookmarkId>,
        bookmark: Bookmark,
    ) -> Result<()> {
        let anchor = previous.filter(|sibling| {
            modifier
                .current_tree()
                .parent(sibling)
                .is_some_and(|parent| parent.id() == folder_id)
        });
        if let Some(anchor) = anchor {
            return modifier.add_bookmarks_after(folder_id, anchor, vec![bookmark]);
        }
        match modifier.current_tree().child_ids(folder_id).first().cloned() {
            Some(first) => modifier.add_bookmarks_before(folder_id, &first, vec![bookmark]),
            None => modifier.add_bookmarks(folder_id, vec![bookmark]),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::modification::BookmarksModification;
    use crate::models::PROPERTY_NAME;

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

    /// root -> [shared -> [a, b, inner -> [c]], other -> [d]]
    fn local_tree() -> BookmarksTree {
        let tree = BookmarksTree::new(folder("root")).unwrap();
        let tree = tree
            .add_bookmarks(&id("root"), vec![folder("shared"), folder("other")])
            .unwrap();
        let tree = tree
            .add_bookmarks(
                &id("shared"),
                vec![named_bookmark("a", "a"), named_bookmark("b", "b"), folder("inner")],
            )
            .unwrap();
        let tree = tree.add_bookmarks(&id("inner"), vec![bookmark("c")]).unwrap();
        tree.add_bookmarks(&id("other"), vec![bookmark("d")]).unwrap()
    }

    fn merge_into(local: BookmarksTree, remote: &BookmarksTree) -> BookmarksTreeModifier {
        let mut modifier = BookmarksTreeModifier::new(local);
        BookmarksTreeMerger::new(remote.clone())
            .merge(&mut modifier)
            .unwrap();
        modifier
    }

    #[test]
    fn test_merge_makes_local_subtree_equal_remote() {
        let remote = BookmarksTree::new(folder("shared")).unwrap();
        let remote = remote
            .add_bookmarks(
                &id("shared"),
                vec![named_bookmark("b", "b renamed"), bookmark("x"), folder("inner")],
            )
            .unwrap();
        let remote = remote.add_bookmarks(&id("inner"), vec![bookmark("y")]).unwrap();

        let modifier = merge_into(local_tree(), &remote);
        let merged = modifier.current_tree();
        assert_eq!(merged.sub_tree(&id("shared")).unwrap(), remote);
        // the rest of the local tree is untouched
        assert!(merged.bookmark(&id("d")).is_some());
    }

    #[test]
    fn test_merge_is_idempotent() {
        let remote = BookmarksTree::new(folder("shared")).unwrap();
        let remote = remote
            .add_bookmarks(&id("shared"), vec![bookmark("x"), folder("inner")])
            .unwrap();

        let modifier = merge_into(local_tree(), &remote);
        let mut second = BookmarksTreeModifier::new(modifier.current_tree().clone());
        BookmarksTreeMerger::new(remote)
            .merge(&mut second)
            .unwrap();
        assert!(second.modifications().is_empty());
        assert!(second.current_tree().ptr_eq(second.original_tree()));
    }

    #[test]
    fn test_merge_preserves_identity_of_property_changes() {
        // every node still exists remotely; only 'a' changed a property
        let remote = BookmarksTree::new(folder("shared")).unwrap();
        let remote = remote
            .add_bookmarks(
                &id("shared"),
                vec![
                    named_bookmark("a", "a renamed"),
                    named_bookmark("b", "b"),
                    folder("inner"),
                ],
            )
            .unwrap();
        let remote = remote.add_bookmarks(&id("inner"), vec![bookmark("c")]).unwrap();

        let modifier = merge_into(local_tree(), &remote);
        assert_eq!(
            modifier.current_tree().bookmark(&id("a")).unwrap().name(),
            Some("a renamed")
        );
        // no delete+re-add: the only events are property changes
        for modification in modifier.modifications() {
            assert!(matches!(
                modification,
                BookmarksModification::PropertiesChanged(_)
            ));
        }
    }

    #[test]
    fn test_merge_deletes_local_only_nodes_recursively() {
        // remote dropped the 'inner' folder and 'a'
        let remote = BookmarksTree::new(folder("shared")).unwrap();
        let remote = remote
            .add_bookmarks(&id("shared"), vec![named_bookmark("b", "b")])
            .unwrap();

        let modifier = merge_into(local_tree(), &remote);
        let merged = modifier.current_tree();
        assert!(merged.bookmark(&id("a")).is_none());
        assert!(merged.bookmark(&id("inner")).is_none());
        assert!(merged.bookmark(&id("c")).is_none());
        assert_eq!(merged.sub_tree(&id("shared")).unwrap(), remote);
    }

    #[test]
    fn test_merge_inserts_at_remote_position() {
        // remote added 'x' between a and b
        let remote = BookmarksTree::new(folder("shared")).unwrap();
        let remote = remote
            .add_bookmarks(
                &id("shared"),
                vec![
                    named_bookmark("a", "a"),
                    bookmark("x"),
                    named_bookmark("b", "b"),
                    folder("inner"),
                ],
            )
            .unwrap();
        let remote = remote.add_bookmarks(&id("inner"), vec![bookmark("c")]).unwrap();

        let modifier = merge_into(local_tree(), &remote);
        let order: Vec<String> = modifier
            .current_tree()
            .child_ids(&id("shared"))
            .iter()
            .map(|child| child.to_string())
            .collect();
        assert_eq!(order, ["a", "x", "b", "inner"]);
        // position matched on insert, so no reordering move was needed
        assert!(!modifier
            .modifications()
            .iter()
            .any(|m| matches!(m, BookmarksModification::Moved(_))));
    }

    #[test]
    fn test_merge_reorders_to_remote_order() {
        let remote = BookmarksTree::new(folder("shared")).unwrap();
        let remote = remote
            .add_bookmarks(
                &id("shared"),
                vec![folder("inner"), named_bookmark("b", "b"), named_bookmark("a", "a")],
            )
            .unwrap();
        let remote = remote.add_bookmarks(&id("inner"), vec![bookmark("c")]).unwrap();

        let modifier = merge_into(local_tree(), &remote);
        let order: Vec<String> = modifier
            .current_tree()
            .child_ids(&id("shared"))
            .iter()
            .map(|child| child.to_string())
            .collect();
        assert_eq!(order, ["inner", "b", "a"]);
    }

    #[test]
    fn test_merge_follows_remote_reparenting() {
        // remote moved 'a' under 'inner'
        let remote = BookmarksTree::new(folder("shared")).unwrap();
        let remote = remote
            .add_bookmarks(&id("shared"), vec![named_bookmark("b", "b"), folder("inner")])
            .unwrap();
        let remote = remote
            .add_bookmarks(&id("inner"), vec![bookmark("c"), named_bookmark("a", "a")])
            .unwrap();

        let modifier = merge_into(local_tree(), &remote);
        let merged = modifier.current_tree();
        assert_eq!(merged.parent(&id("a")).unwrap().id(), &id("inner"));
        assert_eq!(merged.sub_tree(&id("shared")).unwrap(), remote);
    }

    #[test]
    fn test_merge_replaces_node_whose_kind_changed() {
        // remote turned leaf 'a' into a folder
        let remote = BookmarksTree::new(folder("shared")).unwrap();
        let remote = remote
            .add_bookmarks(
                &id("shared"),
                vec![folder("a"), named_bookmark("b", "b"), folder("inner")],
            )
            .unwrap();
        let remote = remote.add_bookmarks(&id("inner"), vec![bookmark("c")]).unwrap();

        let modifier = merge_into(local_tree(), &remote);
        let merged = modifier.current_tree();
        assert!(merged.bookmark(&id("a")).unwrap().is_folder());
        assert_eq!(merged.sub_tree(&id("shared")).unwrap(), remote);
    }

    #[test]
    fn test_merge_updates_target_folder_properties() {
        let mut props = BTreeMap::new();
        props.insert(PROPERTY_NAME.to_string(), "team bookmarks".to_string());
        let remote = BookmarksTree::new(Bookmark::folder(id("shared"), props)).unwrap();
        let remote = remote
            .add_bookmarks(
                &id("shared"),
                vec![named_bookmark("a", "a"), named_bookmark("b", "b"), folder("inner")],
            )
            .unwrap();
        let remote = remote.add_bookmarks(&id("inner"), vec![bookmark("c")]).unwrap();

        let modifier = merge_into(local_tree(), &remote);
        assert_eq!(
            modifier.current_tree().bookmark(&id("shared")).unwrap().name(),
            Some("team bookmarks")
        );
    }

    #[test]
    fn test_merge_unknown_target_fails() {
        let remote = BookmarksTree::new(folder("nowhere")).unwrap();
        let mut modifier = BookmarksTreeModifier::new(local_tree());
        let err = BookmarksTreeMerger::new(remote).merge(&mut modifier).unwrap_err();
        assert!(matches!(err, BookmarksError::UnknownBookmark(_)));
        assert!(modifier.modifications().is_empty());
    }
}
