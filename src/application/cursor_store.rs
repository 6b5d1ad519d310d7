//! Progress tracking for the single-item work queue.
//!
//! Two representations share the `CursorStore` contract:
//! an identifier-keyed commit log, valid for any source, and a positional
//! index cursor, valid only for append-only sources.

use crate::domain::{
    AppConfig, CommitLog, CursorStore, IndexCursor, ItemId, StateStorage, StoreError, StoreFormat,
};
use crate::infrastructure::{CommitLogFile, IndexFile};

/// Open the configured store over its state file.
///
/// # Errors
/// Returns error if the state file is unreadable or corrupt.
pub fn open_cursor_store(config: &AppConfig) -> Result<Box<dyn CursorStore>, StoreError> {
    let path = config.store_path();
    tracing::debug!(path = %path.display(), format = %config.store.format, "Opening cursor store");
    Ok(match config.store.format {
        StoreFormat::Json => Box::new(CommitLogStore::open(CommitLogFile::json(path))?),
        StoreFormat::Lines => Box::new(CommitLogStore::open(CommitLogFile::lines(path))?),
        StoreFormat::Index => Box::new(IndexCursorStore::open(IndexFile::new(path))?),
    })
}

/// Cursor store keyed by item identifier.
pub struct CommitLogStore<S> {
    storage: S,
    log: CommitLog,
}

impl<S: StateStorage<CommitLog>> CommitLogStore<S> {
    /// Load the last persisted log from `storage`.
    ///
    /// # Errors
    /// Returns error if the log is unreadable or corrupt.
    pub fn open(storage: S) -> Result<Self, StoreError> {
        let log = storage.load()?;
        tracing::debug!(
            path = %storage.location().display(),
            committed = log.len(),
            "Loaded commit log"
        );
        Ok(Self { storage, log })
    }

    /// The in-memory view of the log.
    #[must_use]
    pub const fn log(&self) -> &CommitLog {
        &self.log
    }
}

impl<S: StateStorage<CommitLog>> CursorStore for CommitLogStore<S> {
    fn next(&self, listing: &[ItemId]) -> Option<ItemId> {
        listing.iter().find(|id| !self.log.contains(id)).cloned()
    }

    fn commit(&mut self, _listing: &[ItemId], id: &ItemId) -> Result<(), StoreError> {
        if self.log.contains(id) {
            tracing::debug!(id = %id, "Already committed");
            return Ok(());
        }

        let mut staged = self.log.clone().touched();
        staged.insert(id.clone());

        // Staged log is dropped on failure; the in-memory view keeps matching disk.
        self.storage.persist(&staged)?;
        self.log = staged;

        tracing::info!(id = %id, committed = self.log.len(), "Committed item");
        Ok(())
    }

    fn is_done(&self, listing: &[ItemId], position: usize) -> bool {
        listing
            .get(position)
            .is_some_and(|id| self.log.contains(id))
    }

    fn committed_count(&self) -> usize {
        self.log().len()
    }
}

/// Positional cursor over an append-only listing.
pub struct IndexCursorStore<S> {
    storage: S,
    cursor: IndexCursor,
}

impl<S: StateStorage<IndexCursor>> IndexCursorStore<S> {
    /// Load the last persisted cursor from `storage`.
    ///
    /// # Errors
    /// Returns error if the cursor file is unreadable or corrupt.
    pub fn open(storage: S) -> Result<Self, StoreError> {
        let cursor = storage.load()?;
        tracing::debug!(
            path = %storage.location().display(),
            cursor = %cursor,
            "Loaded index cursor"
        );
        Ok(Self { storage, cursor })
    }

    /// Current cursor value.
    #[must_use]
    pub const fn cursor(&self) -> IndexCursor {
        self.cursor
    }

    /// Items of `listing` behind the cursor.
    fn committed<'l>(&self, listing: &'l [ItemId]) -> &'l [ItemId] {
        let end = usize::try_from(self.cursor.position()).unwrap_or(usize::MAX);
        &listing[..end.min(listing.len())]
    }
}

impl<S: StateStorage<IndexCursor>> CursorStore for IndexCursorStore<S> {
    fn next(&self, listing: &[ItemId]) -> Option<ItemId> {
        let position = usize::try_from(self.cursor.position()).ok()?;
        listing.get(position).cloned()
    }

    fn commit(&mut self, listing: &[ItemId], id: &ItemId) -> Result<(), StoreError> {
        // The cursor only ever moves past the item it points at.
        if self.committed(listing).contains(id) {
            tracing::debug!(id = %id, "Already committed");
            return Ok(());
        }

        let expected = self.next(listing);
        if expected.as_ref() != Some(id) {
            return Err(StoreError::OutOfOrder {
                id: id.to_string(),
                expected: expected.map_or_else(|| "no item".to_string(), |e| e.to_string()),
            });
        }

        let advanced = self.cursor.advanced().ok_or_else(|| {
            StoreError::corrupt(
                self.storage.location(),
                format!("cursor {} cannot advance further", self.cursor),
            )
        })?;
        self.storage.persist(&advanced)?;
        self.cursor = advanced;

        tracing::info!(id = %id, cursor = %self.cursor, "Committed item");
        Ok(())
    }

    fn is_done(&self, _listing: &[ItemId], position: usize) -> bool {
        u64::try_from(position).is_ok_and(|p| p < self.cursor.position())
    }

    fn committed_count(&self) -> usize {
        usize::try_from(self.cursor().position()).unwrap_or(usize::MAX)
    }

    fn is_positional(&self) -> bool {
        true
    }
}

impl<T: CursorStore + ?Sized> CursorStore for Box<T> {
    fn next(&self, listing: &[ItemId]) -> Option<ItemId> {
        (**self).next(listing)
    }

    fn commit(&mut self, listing: &[ItemId], id: &ItemId) -> Result<(), StoreError> {
        (**self).commit(listing, id)
    }

    fn is_done(&self, listing: &[ItemId], position: usize) -> bool {
        (**self).is_done(listing, position)
    }

    fn committed_count(&self) -> usize {
        (**self).committed_count()
    }

    fn is_positional(&self) -> bool {
        (**self).is_positional()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::cell::{Cell, RefCell};
    use std::path::{Path, PathBuf};
    use std::rc::Rc;

    use super::*;

    /// In-memory storage shared between "runs", with switchable write failure.
    #[derive(Clone)]
    pub struct MemoryStorage<S> {
        state: Rc<RefCell<Option<S>>>,
        fail_writes: Rc<Cell<bool>>,
        writes: Rc<Cell<usize>>,
        path: PathBuf,
    }

    impl<S> MemoryStorage<S> {
        pub fn new() -> Self {
            Self {
                state: Rc::new(RefCell::new(None)),
                fail_writes: Rc::new(Cell::new(false)),
                writes: Rc::new(Cell::new(0)),
                path: PathBuf::from("memory"),
            }
        }

        pub fn fail_writes(&self, fail: bool) {
            self.fail_writes.set(fail);
        }

        pub fn writes(&self) -> usize {
            self.writes.get()
        }
    }

    impl<S: Clone + Default> StateStorage<S> for MemoryStorage<S> {
        fn load(&self) -> Result<S, StoreError> {
            Ok(self.state.borrow().clone().unwrap_or_default())
        }

        fn persist(&self, state: &S) -> Result<(), StoreError> {
            if self.fail_writes.get() {
                return Err(StoreError::io(
                    &self.path,
                    std::io::Error::other("disk full"),
                ));
            }
            self.writes.set(self.writes.get() + 1);
            *self.state.borrow_mut() = Some(state.clone());
            Ok(())
        }

        fn location(&self) -> &Path {
            &self.path
        }
    }

    fn ids(raw: &[&str]) -> Vec<ItemId> {
        raw.iter().copied().map(ItemId::from).collect()
    }

    #[test]
    fn test_next_walks_listing_in_order() {
        let storage = MemoryStorage::<CommitLog>::new();
        let mut store = CommitLogStore::open(storage).unwrap();
        let listing = ids(&["a", "b", "c"]);

        assert_eq!(store.next(&listing), Some(ItemId::from("a")));
        store.commit(&listing, &ItemId::from("a")).unwrap();
        assert_eq!(store.next(&listing), Some(ItemId::from("b")));
        store.commit(&listing, &ItemId::from("b")).unwrap();
        store.commit(&listing, &ItemId::from("c")).unwrap();
        assert_eq!(store.next(&listing), None);
    }

    #[test]
    fn test_next_on_empty_listing() {
        let store = CommitLogStore::open(MemoryStorage::<CommitLog>::new()).unwrap();
        assert_eq!(store.next(&[]), None);
    }

    #[test]
    fn test_next_is_membership_based() {
        let storage = MemoryStorage::<CommitLog>::new();
        let mut store = CommitLogStore::open(storage).unwrap();
        store.commit(&ids(&["old", "older"]), &ItemId::from("old")).unwrap();

        // A new post appeared ahead of the committed one.
        let listing = ids(&["new", "old", "older"]);
        assert_eq!(store.next(&listing), Some(ItemId::from("new")));
        assert!(!store.is_done(&listing, 0));
        assert!(store.is_done(&listing, 1));
    }

    #[test]
    fn test_commit_survives_reload() {
        let storage = MemoryStorage::<CommitLog>::new();
        let mut store = CommitLogStore::open(storage.clone()).unwrap();
        store.commit(&ids(&["a"]), &ItemId::from("a")).unwrap();
        drop(store);

        let reopened = CommitLogStore::open(storage).unwrap();
        assert!(reopened.log().contains(&ItemId::from("a")));
        assert!(reopened.log().updated_at().is_some());
    }

    #[test]
    fn test_commit_is_idempotent() {
        let storage = MemoryStorage::<CommitLog>::new();
        let mut store = CommitLogStore::open(storage.clone()).unwrap();
        let listing = ids(&["a", "b"]);
        store.commit(&listing, &ItemId::from("a")).unwrap();
        store.commit(&listing, &ItemId::from("a")).unwrap();

        assert_eq!(store.committed_count(), 1);
        assert_eq!(storage.writes(), 1);
    }

    #[test]
    fn test_failed_persist_leaves_item_pending() {
        let storage = MemoryStorage::<CommitLog>::new();
        let mut store = CommitLogStore::open(storage.clone()).unwrap();
        let listing = ids(&["a", "b"]);
        store.commit(&listing, &ItemId::from("a")).unwrap();

        storage.fail_writes(true);
        let err = store.commit(&listing, &ItemId::from("b")).unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
        assert_eq!(store.next(&listing), Some(ItemId::from("b")));

        // Next run re-derives state from the last successful write.
        storage.fail_writes(false);
        let next_run = CommitLogStore::open(storage).unwrap();
        assert_eq!(next_run.committed_count(), 1);
        assert_eq!(next_run.next(&listing), Some(ItemId::from("b")));
    }

    #[test]
    fn test_index_cursor_resumes_at_position() {
        let storage = MemoryStorage::<IndexCursor>::new();
        storage.persist(&IndexCursor(2)).unwrap();

        let mut store = IndexCursorStore::open(storage.clone()).unwrap();
        let listing = ids(&["a", "b", "c", "d"]);

        assert_eq!(store.next(&listing), Some(ItemId::from("c")));
        store.commit(&listing, &ItemId::from("c")).unwrap();
        assert_eq!(store.cursor(), IndexCursor(3));
        assert_eq!(store.next(&listing), Some(ItemId::from("d")));
        assert_eq!(storage.load().unwrap(), IndexCursor(3));
    }

    #[test]
    fn test_index_cursor_not_advanced_twice() {
        let storage = MemoryStorage::<IndexCursor>::new();
        let mut store = IndexCursorStore::open(storage).unwrap();
        let listing = ids(&["a", "b"]);

        store.commit(&listing, &ItemId::from("a")).unwrap();
        store.commit(&listing, &ItemId::from("a")).unwrap();
        assert_eq!(store.cursor(), IndexCursor(1));
    }

    #[test]
    fn test_index_cursor_commit_repeated_across_runs() {
        let storage = MemoryStorage::<IndexCursor>::new();
        storage.persist(&IndexCursor(2)).unwrap();
        let listing = ids(&["a", "b", "c", "d"]);

        for _ in 0..2 {
            let mut store = IndexCursorStore::open(storage.clone()).unwrap();
            store.commit(&listing, &ItemId::from("c")).unwrap();
        }

        let store = IndexCursorStore::open(storage.clone()).unwrap();
        assert_eq!(store.cursor(), IndexCursor(3));
        assert_eq!(store.next(&listing), Some(ItemId::from("d")));
        assert_eq!(storage.writes(), 2);
    }

    #[test]
    fn test_index_cursor_rejects_item_not_at_cursor() {
        let storage = MemoryStorage::<IndexCursor>::new();
        storage.persist(&IndexCursor(2)).unwrap();
        let mut store = IndexCursorStore::open(storage.clone()).unwrap();
        let listing = ids(&["a", "b", "c", "d"]);

        for id in ["zzz", "d"] {
            let err = store.commit(&listing, &ItemId::from(id)).unwrap_err();
            assert!(matches!(err, StoreError::OutOfOrder { ref expected, .. } if expected == "c"));
        }
        assert_eq!(store.next(&listing), Some(ItemId::from("c")));
        assert_eq!(storage.load().unwrap(), IndexCursor(2));
    }

    #[test]
    fn test_index_cursor_past_end_rejects_commit() {
        let storage = MemoryStorage::<IndexCursor>::new();
        storage.persist(&IndexCursor(u64::MAX)).unwrap();
        let mut store = IndexCursorStore::open(storage.clone()).unwrap();

        let err = store.commit(&ids(&["a"]), &ItemId::from("x")).unwrap_err();
        assert!(matches!(err, StoreError::OutOfOrder { .. }));
        assert_eq!(store.cursor(), IndexCursor(u64::MAX));
        assert_eq!(storage.load().unwrap(), IndexCursor(u64::MAX));
    }

    #[test]
    fn test_index_cursor_past_end_has_no_work() {
        let storage = MemoryStorage::<IndexCursor>::new();
        storage.persist(&IndexCursor(5)).unwrap();
        let store = IndexCursorStore::open(storage).unwrap();

        let listing = ids(&["a", "b"]);
        assert_eq!(store.next(&listing), None);
        assert!(store.is_done(&listing, 1));
    }

    #[test]
    fn test_index_cursor_failed_persist_keeps_position() {
        let storage = MemoryStorage::<IndexCursor>::new();
        let mut store = IndexCursorStore::open(storage.clone()).unwrap();
        let listing = ids(&["a", "b"]);

        storage.fail_writes(true);
        assert!(store.commit(&listing, &ItemId::from("a")).is_err());
        assert_eq!(store.cursor(), IndexCursor(0));

        // Retrying the same item after the failure still advances.
        storage.fail_writes(false);
        store.commit(&listing, &ItemId::from("a")).unwrap();
        assert_eq!(store.cursor(), IndexCursor(1));
    }
}
