//! One invocation of the repost job.
//!
//! Lists the work source, hands the next uncommitted item to the processor
//! and commits it only after the processor reports success.

use crate::domain::{
    AppConfig, AppError, CursorStore, ItemId, ItemState, ItemStatus, Processor, QueueStats,
    Result, WorkSource,
};
use crate::infrastructure::RunLock;

/// What a run did.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Items processed and committed, in order.
    pub processed: Vec<ItemId>,
    /// Item whose processing failed, with the reason. Left uncommitted.
    pub failed: Option<(ItemId, String)>,
    /// Whether the run stopped because no work was left.
    pub exhausted: bool,
}

impl RunSummary {
    /// Whether the run ended without a processor failure.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.failed.is_none()
    }
}

/// Service driving the cursor store against its collaborators.
pub struct RunService<'a, C> {
    source: &'a dyn WorkSource,
    store: C,
}

impl<'a, C: CursorStore> RunService<'a, C> {
    /// Create a service over `source` and `store`.
    #[must_use]
    pub const fn new(source: &'a dyn WorkSource, store: C) -> Self {
        Self { source, store }
    }

    /// Fresh listing, refusing a positional store over a shifting source.
    fn listing(&self) -> Result<Vec<ItemId>> {
        if self.store.is_positional() && !self.source.is_append_only() {
            return Err(AppError::config(
                "index cursor cannot track a work source that is not append-only",
            ));
        }
        self.source.list()
    }

    /// Process up to `max_items` items.
    ///
    /// Stops at the first processor failure or when no work is left.
    ///
    /// # Errors
    /// Returns error if listing fails or a commit cannot be persisted; in
    /// the latter case the item stays eligible for the next run.
    pub fn run(&mut self, processor: &dyn Processor, max_items: usize) -> Result<RunSummary> {
        let listing = self.listing()?;
        tracing::debug!(listed = listing.len(), "Listing fetched");

        let mut summary = RunSummary::default();

        while summary.processed.len() < max_items {
            let Some(id) = self.store.next(&listing) else {
                tracing::info!("No new items");
                summary.exhausted = true;
                break;
            };

            if let Err(e) = processor.process(&id) {
                tracing::warn!(id = %id, error = %e, "Processing failed, item left for next run");
                summary.failed = Some((id, e.to_string()));
                break;
            }

            self.store.commit(&listing, &id)?;
            summary.processed.push(id);
        }

        Ok(summary)
    }

    /// Next item without processing or committing anything.
    ///
    /// # Errors
    /// Returns error if listing fails.
    pub fn peek(&self) -> Result<Option<ItemId>> {
        let listing = self.listing()?;
        Ok(self.store.next(&listing))
    }

    /// Mark `id` processed without running the processor.
    ///
    /// Positional stores only accept the item at their cursor, so the
    /// source is listed for them.
    ///
    /// # Errors
    /// Returns error if listing fails, a positional store rejects `id`, or
    /// the commit cannot be persisted.
    pub fn commit(&mut self, id: &ItemId) -> Result<()> {
        let listing = if self.store.is_positional() {
            self.listing()?
        } else {
            Vec::new()
        };
        self.store.commit(&listing, id)?;
        Ok(())
    }

    /// Every listed item with its state, plus totals.
    ///
    /// # Errors
    /// Returns error if listing fails.
    pub fn status(&self) -> Result<(Vec<ItemStatus>, QueueStats)> {
        let listing = self.listing()?;
        let next = self.store.next(&listing);

        let items: Vec<ItemStatus> = listing
            .iter()
            .enumerate()
            .map(|(position, id)| {
                let state = if self.store.is_done(&listing, position) {
                    ItemState::Done
                } else if next.as_ref() == Some(id) {
                    ItemState::Next
                } else {
                    ItemState::Pending
                };
                ItemStatus {
                    position,
                    id: id.clone(),
                    state,
                }
            })
            .collect();

        let done = items.iter().filter(|i| i.state == ItemState::Done).count();
        let stats = QueueStats {
            listed: items.len(),
            done,
            pending: items.len() - done,
            next,
        };

        Ok((items, stats))
    }

    /// Number of processed items the store has recorded.
    #[must_use]
    pub fn committed_count(&self) -> usize {
        self.store.committed_count()
    }
}

/// Take the advisory lock if the configuration asks for it.
///
/// # Errors
/// Returns error if another run holds the lock.
pub fn acquire_run_lock(config: &AppConfig) -> Result<Option<RunLock>> {
    if !config.store.lock {
        return Ok(None);
    }
    let lock = RunLock::acquire(&config.lock_file_path())?;
    tracing::debug!(path = %lock.path().display(), "Holding run lock");
    Ok(Some(lock))
}
