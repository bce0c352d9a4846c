use std::ops::{Deref, DerefMut};

use tracing::warn;

use super::{Adapter, Connection};
use crate::types::{Consistency, Result};

/// Scoped batch: statements written through the guard are collected and
/// sent as one `BEGIN BATCH .. APPLY BATCH` by [`BatchGuard::apply`].
///
/// Dropping the guard without applying discards the collected statements
/// and restores the previous batching state. A guard opened while another
/// batch is active leaves its statements to the outer batch.
pub struct BatchGuard<'a, C: Connection> {
    adapter: &'a mut Adapter<C>,
    was_batching: bool,
    start: usize,
    finished: bool,
}

impl<'a, C: Connection> BatchGuard<'a, C> {
    pub(super) fn new(adapter: &'a mut Adapter<C>) -> Self {
        let was_batching = adapter.batching;
        let start = adapter.pending.len();
        adapter.batching = true;
        Self {
            adapter,
            was_batching,
            start,
            finished: false,
        }
    }

    /// Number of statements collected by this guard so far.
    pub fn len(&self) -> usize {
        self.adapter.pending.len() - self.start
    }

    /// True when nothing has been collected.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Restores batching state and executes the collected statements as one
    /// batch. Applying an empty guard runs nothing.
    pub fn apply(mut self) -> Result<()> {
        self.finished = true;
        self.adapter.batching = self.was_batching;
        if self.was_batching {
            return Ok(());
        }
        let statements = self.adapter.pending.split_off(self.start);
        if statements.is_empty() {
            return Ok(());
        }
        self.adapter.execute_batch(&statements)
    }
}

impl<C: Connection> Deref for BatchGuard<'_, C> {
    type Target = Adapter<C>;

    fn deref(&self) -> &Adapter<C> {
        self.adapter
    }
}

impl<C: Connection> DerefMut for BatchGuard<'_, C> {
    fn deref_mut(&mut self) -> &mut Adapter<C> {
        self.adapter
    }
}

impl<C: Connection> Drop for BatchGuard<'_, C> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let discarded = self.adapter.pending.len().saturating_sub(self.start);
        self.adapter.pending.truncate(self.start);
        self.adapter.batching = self.was_batching;
        if discarded > 0 {
            warn!(discarded, "adapter.batch.discarded");
        }
    }
}

/// Overrides the consistency level until dropped.
pub struct ConsistencyGuard<'a, C: Connection> {
    adapter: &'a mut Adapter<C>,
    previous: Option<Consistency>,
}

impl<'a, C: Connection> ConsistencyGuard<'a, C> {
    pub(super) fn new(adapter: &'a mut Adapter<C>, level: Option<Consistency>) -> Self {
        let previous = std::mem::replace(&mut adapter.consistency, level);
        Self { adapter, previous }
    }
}

impl<C: Connection> Deref for ConsistencyGuard<'_, C> {
    type Target = Adapter<C>;

    fn deref(&self) -> &Adapter<C> {
        self.adapter
    }
}

impl<C: Connection> DerefMut for ConsistencyGuard<'_, C> {
    fn deref_mut(&mut self) -> &mut Adapter<C> {
        self.adapter
    }
}

impl<C: Connection> Drop for ConsistencyGuard<'_, C> {
    fn drop(&mut self) {
        self.adapter.consistency = self.previous;
    }
}
