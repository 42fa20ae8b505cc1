//! JSON tree codec
//!
//! A tree is serialized as an ordered, nested structure:
//!
//! ```json
//! {
//!   "version": "1.0",
//!   "bookmarks": {
//!     "id": "root",
//!     "properties": { "name": "my bookmarks" },
//!     "children": [
//!       { "id": "b1", "properties": { "url": "..." } }
//!     ]
//!   }
//! }
//! ```
//!
//! A node is a folder exactly when it has a `children` array. Child order
//! is significant and round-trips byte-for-byte: deserializing a
//! serialized tree reproduces the same ids, properties, and child order.
//! Unknown fields are skipped for forward compatibility.

use std::collections::BTreeMap;
use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::error::{BookmarksError, Result};
use crate::models::{Bookmark, BookmarkId};
use crate::tree::BookmarksTree;

const VERSION_1_0: &str = "1.0";

#[derive(Serialize, Deserialize)]
struct TreeDocument {
    version: String,
    bookmarks: NodeDocument,
}

#[derive(Serialize, Deserialize)]
struct NodeDocument {
    id: String,
    #[serde(default)]
    properties: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    children: Option<Vec<NodeDocument>>,
}

/// Serializes a folder subtree to a JSON byte stream
pub struct BookmarksTreeJsonSerializer {
    indent: bool,
}

impl BookmarksTreeJsonSerializer {
    pub fn new(indent: bool) -> Self {
        Self { indent }
    }

    /// Write the subtree rooted at `folder_id`
    pub fn serialize<W: Write>(
        &self,
        tree: &BookmarksTree,
        folder_id: &BookmarkId,
        writer: W,
    ) -> Result<()> {
        let folder = tree
            .bookmark(folder_id)
            .ok_or_else(|| BookmarksError::UnknownBookmark(folder_id.clone()))?;
        if !folder.is_folder() {
            return Err(BookmarksError::NotAFolder(folder_id.clone()));
        }
        let document = TreeDocument {
            version: VERSION_1_0.to_string(),
            bookmarks: node_document(tree, folder),
        };
        if self.indent {
            serde_json::to_writer_pretty(writer, &document)?;
        } else {
            serde_json::to_writer(writer, &document)?;
        }
        Ok(())
    }
}

fn node_document(tree: &BookmarksTree, node: &Bookmark) -> NodeDocument {
    let children = node.is_folder().then(|| {
        tree.children(node.id())
            .into_iter()
            .map(|child| node_document(tree, child))
            .collect()
    });
    NodeDocument {
        id: node.id().to_string(),
        properties: node.properties().clone(),
        children,
    }
}

/// Reads a tree back from a JSON byte stream
#[derive(Debug, Default)]
pub struct BookmarksTreeJsonDeserializer;

impl BookmarksTreeJsonDeserializer {
    pub fn new() -> Self {
        Self
    }

    pub fn deserialize<R: Read>(&self, reader: R) -> Result<BookmarksTree> {
        let document: TreeDocument = serde_json::from_reader(reader)?;
        if document.version != VERSION_1_0 {
            return Err(BookmarksError::InvalidFormat(format!(
                "unknown version '{}'",
                document.version
            )));
        }
        let root = document.bookmarks;
        let Some(children) = root.children else {
            return Err(BookmarksError::InvalidFormat(
                "the top-level bookmark must be a folder".to_string(),
            ));
        };
        let root_id = BookmarkId::from(root.id);
        let mut tree = BookmarksTree::new(Bookmark::folder(root_id.clone(), root.properties))?;
        for child in children {
            tree = add_node(tree, &root_id, child)?;
        }
        Ok(tree)
    }
}

fn add_node(
    tree: BookmarksTree,
    parent_id: &BookmarkId,
    node: NodeDocument,
) -> Result<BookmarksTree> {
    let id = BookmarkId::from(node.id);
    match node.children {
        Some(children) => {
            let mut tree =
                tree.add_bookmarks(parent_id, vec![Bookmark::folder(id.clone(), node.properties)])?;
            for child in children {
                tree = add_node(tree, &id, child)?;
            }
            Ok(tree)
        }
        None => tree.add_bookmarks(parent_id, vec![Bookmark::new(id, node.properties)]),
    }
}
