//! Data models for Signet
//!
//! Defines the core value types: `BookmarkId` and `Bookmark`. Bookmarks are
//! immutable; every edit goes through `BookmarksTree`, which returns a new
//! snapshot instead of mutating in place.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Property key for the display name
pub const PROPERTY_NAME: &str = "name";
/// Property key for the user comment
pub const PROPERTY_COMMENT: &str = "comment";
/// Property key for the creation instant (RFC 3339)
pub const PROPERTY_CREATED: &str = "created";

/// Opaque identifier naming a bookmark or folder
///
/// Stable for the lifetime of the node, compared by value, never reused.
/// Freshly minted ids are random UUIDs; deserialized trees keep whatever
/// ids they were saved with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookmarkId(String);

impl BookmarkId {
    /// Mint a new globally unique id
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for BookmarkId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BookmarkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for BookmarkId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for BookmarkId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Whether a node is a leaf bookmark or a folder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookmarkKind {
    Bookmark,
    Folder,
}

/// An immutable bookmark node
///
/// Properties are an ordered map of opaque key/value pairs; the database
/// does not privilege any of them structurally. A folder additionally owns
/// an ordered child list, which lives in the tree, not on the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bookmark {
    id: BookmarkId,
    kind: BookmarkKind,
    properties: BTreeMap<String, String>,
}

impl Bookmark {
    /// Create a leaf bookmark
    pub fn new(id: BookmarkId, properties: BTreeMap<String, String>) -> Self {
        Self {
            id,
            kind: BookmarkKind::Bookmark,
            properties,
        }
    }

    /// Create a folder
    pub fn folder(id: BookmarkId, properties: BTreeMap<String, String>) -> Self {
        Self {
            id,
            kind: BookmarkKind::Folder,
            properties,
        }
    }

    pub fn id(&self) -> &BookmarkId {
        &self.id
    }

    pub fn kind(&self) -> BookmarkKind {
        self.kind
    }

    pub fn is_folder(&self) -> bool {
        self.kind == BookmarkKind::Folder
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    /// Get one property value
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// The display name, if set
    pub fn name(&self) -> Option<&str> {
        self.property(PROPERTY_NAME)
    }

    /// The creation instant, if the `created` property holds a valid
    /// RFC 3339 timestamp
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.property(PROPERTY_CREATED)
            .and_then(|value| DateTime::parse_from_rfc3339(value).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Copy of this bookmark with the whole property map replaced
    pub fn with_properties(&self, properties: BTreeMap<String, String>) -> Self {
        Self {
            id: self.id.clone(),
            kind: self.kind,
            properties,
        }
    }

    /// Copy of this bookmark with one property set
    pub fn with_property(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut properties = self.properties.clone();
        properties.insert(key.into(), value.into());
        Self {
            id: self.id.clone(),
            kind: self.kind,
            properties,
        }
    }

    /// Copy of this bookmark stamped with the current creation instant
    pub fn with_created_now(&self) -> Self {
        self.with_property(PROPERTY_CREATED, Utc::now().to_rfc3339())
    }
}
