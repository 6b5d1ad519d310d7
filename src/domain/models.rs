//! Domain models for queue progress.
//!
//! These models describe work items and the durable record of which of
//! them have already been processed.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque, stable identifier for one unit of work.
///
/// A short content code, a URL, or a numeric position. Equality is exact
/// string match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Create an identifier from any string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for ItemId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Set of identifiers already processed.
///
/// Keeps insertion order for display and for the on-disk encoding, with a
/// hash index for membership checks.
#[derive(Debug, Clone, Default)]
pub struct CommitLog {
    order: Vec<ItemId>,
    members: HashSet<ItemId>,
    updated_at: Option<DateTime<Utc>>,
}

impl CommitLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `id` has been committed.
    #[must_use]
    pub fn contains(&self, id: &ItemId) -> bool {
        self.members.contains(id)
    }

    /// Add `id`. Returns `false` if it was already present.
    pub fn insert(&mut self, id: ItemId) -> bool {
        if self.members.contains(&id) {
            return false;
        }
        self.members.insert(id.clone());
        self.order.push(id);
        true
    }

    /// Committed identifiers in commit order.
    pub fn iter(&self) -> impl Iterator<Item = &ItemId> {
        self.order.iter()
    }

    /// Number of committed identifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether nothing has been committed yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// When the log was last written, if known.
    #[must_use]
    pub const fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Stamp the log with a write time.
    #[must_use]
    pub const fn with_updated_at(mut self, at: Option<DateTime<Utc>>) -> Self {
        self.updated_at = at;
        self
    }

    /// Stamp the log with the current time.
    #[must_use]
    pub fn touched(self) -> Self {
        self.with_updated_at(Some(Utc::now()))
    }
}

impl FromIterator<ItemId> for CommitLog {
    fn from_iter<T: IntoIterator<Item = ItemId>>(iter: T) -> Self {
        let mut log = Self::new();
        for id in iter {
            log.insert(id);
        }
        log
    }
}

/// Count of items already processed from an append-only listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct IndexCursor(pub u64);

impl IndexCursor {
    /// Position of the next item to process.
    #[must_use]
    pub const fn position(self) -> u64 {
        self.0
    }

    /// Cursor after one more processed item, `None` at the end of the range.
    #[must_use]
    pub const fn advanced(self) -> Option<Self> {
        match self.0.checked_add(1) {
            Some(next) => Some(Self(next)),
            None => None,
        }
    }
}

impl fmt::Display for IndexCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Processing state of one listed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemState {
    /// Already committed.
    Done,
    /// The item `next` would hand out.
    Next,
    /// Not yet committed.
    Pending,
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Done => write!(f, "done"),
            Self::Next => write!(f, "next"),
            Self::Pending => write!(f, "pending"),
        }
    }
}

/// A listed item with its processing state.
#[derive(Debug, Clone, Serialize)]
pub struct ItemStatus {
    /// Position in the listing (0-based).
    pub position: usize,
    /// Item identifier.
    pub id: ItemId,
    /// Processing state.
    pub state: ItemState,
}

/// Summary of a listing against the current progress state.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueueStats {
    /// Items in the current listing.
    pub listed: usize,
    /// Listed items already committed.
    pub done: usize,
    /// Listed items still to process.
    pub pending: usize,
    /// Next item to process, if any.
    pub next: Option<ItemId>,
}

/// Remove duplicate identifiers, keeping each at its first position.
#[must_use]
pub fn dedup_listing(listing: Vec<ItemId>) -> Vec<ItemId> {
    let mut seen = HashSet::with_capacity(listing.len());
    listing
        .into_iter()
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_log_insert_is_idempotent() {
        let mut log = CommitLog::new();
        assert!(log.insert(ItemId::from("a")));
        assert!(!log.insert(ItemId::from("a")));
        assert_eq!(log.len(), 1);
        assert!(log.contains(&ItemId::from("a")));
    }

    #[test]
    fn test_commit_log_keeps_order() {
        let log: CommitLog = ["c", "a", "b", "a"].into_iter().map(ItemId::from).collect();
        let ids: Vec<&str> = log.iter().map(ItemId::as_str).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_item_id_exact_match() {
        assert_ne!(ItemId::from("abc"), ItemId::from("abc "));
        assert_ne!(ItemId::from("ABC"), ItemId::from("abc"));
    }

    #[test]
    fn test_dedup_listing_keeps_first() {
        let listing = ["a", "b", "a", "c", "b"].into_iter().map(ItemId::from).collect();
        let ids: Vec<String> = dedup_listing(listing)
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_index_cursor_advances() {
        let cursor = IndexCursor(2);
        assert_eq!(cursor.advanced(), Some(IndexCursor(3)));
        assert_eq!(IndexCursor(u64::MAX).advanced(), None);
        assert_eq!(cursor.to_string(), "2");
    }
}
