//! Content categories and the per-category event indexes

use crate::event::{Event, EventIndex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Visibility / content class of an event directory
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum MediaCategory {
    /// Events of the copyright owner
    OwnerEvents,
    /// Private events
    PrivateEvents,
    /// Business events
    BusinessEvents,
    /// Events of other people
    OtherEvents,
    /// Things rather than events
    Things,
}

impl MediaCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaCategory::OwnerEvents => "owner-events",
            MediaCategory::PrivateEvents => "private-events",
            MediaCategory::BusinessEvents => "business-events",
            MediaCategory::OtherEvents => "other-events",
            MediaCategory::Things => "things",
        }
    }
}

impl fmt::Display for MediaCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Media kind stored in a storage
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Photo => "photo",
            MediaKind::Video => "video",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Partition key: each distinct key owns exactly one [`EventIndex`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CategoryKey {
    pub category: MediaCategory,
    pub kind: MediaKind,
}

impl CategoryKey {
    pub fn new(category: MediaCategory, kind: MediaKind) -> Self {
        Self { category, kind }
    }
}

impl fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.category, self.kind)
    }
}

/// One event index per category key, owned by a single run
#[derive(Debug, Default)]
pub struct IndexSet {
    indexes: BTreeMap<CategoryKey, EventIndex>,
}

impl IndexSet {
    /// Create empty indexes for the given keys
    pub fn new(keys: impl IntoIterator<Item = CategoryKey>) -> Self {
        Self {
            indexes: keys.into_iter().map(|key| (key, EventIndex::new())).collect(),
        }
    }

    pub fn get(&self, key: &CategoryKey) -> Option<&EventIndex> {
        self.indexes.get(key)
    }

    /// Index for `key`, created on first use
    pub fn index_mut(&mut self, key: CategoryKey) -> &mut EventIndex {
        self.indexes.entry(key).or_default()
    }

    /// Register the same events independently into every listed key's index
    pub fn register_into(&mut self, keys: &[CategoryKey], events: &[Event]) -> usize {
        keys.iter()
            .map(|key| self.index_mut(*key).register_all(events))
            .sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CategoryKey, &EventIndex)> {
        self.indexes.iter()
    }

    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }
}
