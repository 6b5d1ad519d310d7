//! Collaborator seams.
//!
//! The cursor store only ever sees identifiers; listing, processing and
//! durable storage sit behind these traits.

use std::path::Path;

use super::error::{Result, StoreError};
use super::models::ItemId;

/// Enumerates candidate items in processing order.
pub trait WorkSource {
    /// Produce a fresh, ordered listing.
    ///
    /// # Errors
    /// Returns error if the listing cannot be produced.
    fn list(&self) -> Result<Vec<ItemId>>;

    /// Whether existing items never move (new items only appear at the end).
    fn is_append_only(&self) -> bool;
}

/// Performs the external work for one item.
pub trait Processor {
    /// Process `id`. `Ok` means every externally visible effect was sent.
    ///
    /// # Errors
    /// Returns error if processing did not complete.
    fn process(&self, id: &ItemId) -> Result<()>;
}

/// Durable home for one piece of progress state.
pub trait StateStorage<S> {
    /// Read the state. A missing file is the empty state.
    ///
    /// # Errors
    /// `StoreError::Io` if unreadable, `StoreError::CorruptState` if unparseable.
    fn load(&self) -> std::result::Result<S, StoreError>;

    /// Replace the durable state with `state`.
    ///
    /// # Errors
    /// `StoreError::Io` if the write cannot complete.
    fn persist(&self, state: &S) -> std::result::Result<(), StoreError>;

    /// Where the state lives, for diagnostics.
    fn location(&self) -> &Path;
}

/// Decides the next item and records completion.
pub trait CursorStore {
    /// First item of `listing` not yet committed. Never fails.
    fn next(&self, listing: &[ItemId]) -> Option<ItemId>;

    /// Record `id` as processed and persist. Committing an item already
    /// recorded is a no-op. `listing` is the listing `id` was taken from;
    /// positional stores check `id` against it.
    ///
    /// # Errors
    /// Returns error if the durable write fails; the item then stays pending.
    fn commit(
        &mut self,
        listing: &[ItemId],
        id: &ItemId,
    ) -> std::result::Result<(), StoreError>;

    /// Whether the item at `position` in `listing` counts as processed.
    fn is_done(&self, listing: &[ItemId], position: usize) -> bool;

    /// Number of processed items recorded.
    fn committed_count(&self) -> usize;

    /// Whether progress is tracked by position rather than identifier.
    fn is_positional(&self) -> bool {
        false
    }
}
