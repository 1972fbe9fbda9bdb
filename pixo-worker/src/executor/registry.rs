//! Cancellation registry.
//!
//! Holds the ids of tasks whose results must be discarded. The executor
//! consults it when a task acquires its concurrency permit and again after the
//! codec call returns; the first observation removes the entry.
//!
//! A cancel may arrive for an id the executor never sees (the request was
//! lost, or the id was never sent). Those entries would otherwise live
//! forever, so each insertion prunes entries older than the configured TTL.
//! Marks for ids with a live task are never pruned: the task removes them
//! itself at finalization.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;

use crate::protocol::TaskId;

/// Set of task ids marked cancelled, owned by one executor.
#[derive(Debug, Default)]
pub struct CancellationRegistry {
    entries: Mutex<Entries>,
    ttl: Option<Duration>,
}

#[derive(Debug, Default)]
struct Entries {
    /// Cancel marks and when they were recorded.
    cancelled: HashMap<TaskId, Instant>,
    /// Live task count per id, queued or running.
    in_flight: HashMap<TaskId, usize>,
}

impl CancellationRegistry {
    /// Creates a registry that never prunes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry that drops entries older than `ttl` on insert.
    pub fn with_ttl(ttl: Option<Duration>) -> Self {
        Self {
            entries: Mutex::new(Entries::default()),
            ttl,
        }
    }

    /// Marks `id` as cancelled.
    ///
    /// Idempotent: re-cancelling refreshes the entry's age.
    pub fn cancel(&self, id: TaskId) {
        let now = Instant::now();
        let mut entries = self.entries.lock();

        if let Some(ttl) = self.ttl {
            let Entries {
                cancelled,
                in_flight,
            } = &mut *entries;
            let before = cancelled.len();
            cancelled.retain(|id, inserted| {
                in_flight.contains_key(id) || now.duration_since(*inserted) < ttl
            });
            let pruned = before - cancelled.len();
            if pruned > 0 {
                debug!(pruned, "Pruned stale cancellations");
            }
        }

        entries.cancelled.insert(id, now);
    }

    /// Removes `id` if present, returning whether it was cancelled.
    pub fn take(&self, id: &TaskId) -> bool {
        self.entries.lock().cancelled.remove(id).is_some()
    }

    /// Whether `id` is currently marked, without consuming the mark.
    pub fn is_cancelled(&self, id: &TaskId) -> bool {
        self.entries.lock().cancelled.contains_key(id)
    }

    /// Number of cancel marks held.
    pub fn len(&self) -> usize {
        self.entries.lock().cancelled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().cancelled.is_empty()
    }

    /// Number of distinct ids with a live task.
    pub fn in_flight(&self) -> usize {
        self.entries.lock().in_flight.len()
    }

    /// Records a live task for `id` until the returned guard drops.
    ///
    /// Must be called before the task is spawned, so a cancel handled right
    /// after it can never be pruned out from under the task.
    pub(crate) fn track(self: &Arc<Self>, id: TaskId) -> InFlight {
        *self.entries.lock().in_flight.entry(id.clone()).or_insert(0) += 1;
        InFlight {
            registry: Arc::clone(self),
            id,
        }
    }

    fn untrack(&self, id: &TaskId) {
        let mut entries = self.entries.lock();
        if let Some(count) = entries.in_flight.get_mut(id) {
            *count -= 1;
            if *count == 0 {
                entries.in_flight.remove(id);
            }
        }
    }
}

/// Marks one task as live; dropping it (normally, or by abort) releases the id.
#[derive(Debug)]
pub(crate) struct InFlight {
    registry: Arc<CancellationRegistry>,
    id: TaskId,
}

impl InFlight {
    pub(crate) fn id(&self) -> &TaskId {
        &self.id
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.registry.untrack(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_consumes_mark() {
        let registry = CancellationRegistry::new();
        let id = TaskId::new("b");

        registry.cancel(id.clone());
        assert!(registry.is_cancelled(&id));
        assert!(registry.take(&id));
        assert!(!registry.take(&id));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let registry = CancellationRegistry::new();
        registry.cancel(TaskId::new("x"));
        registry.cancel(TaskId::new("x"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_take_unknown_id() {
        let registry = CancellationRegistry::new();
        assert!(!registry.take(&TaskId::new("never-sent")));
    }

    #[test]
    fn test_stale_entries_pruned_on_insert() {
        let registry = CancellationRegistry::with_ttl(Some(Duration::from_millis(10)));
        registry.cancel(TaskId::new("old"));

        std::thread::sleep(Duration::from_millis(30));
        registry.cancel(TaskId::new("new"));

        assert!(!registry.is_cancelled(&TaskId::new("old")));
        assert!(registry.is_cancelled(&TaskId::new("new")));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_live_task_mark_survives_pruning() {
        let registry = Arc::new(CancellationRegistry::with_ttl(Some(Duration::from_millis(10))));
        let task = registry.track(TaskId::new("running"));
        registry.cancel(TaskId::new("running"));

        std::thread::sleep(Duration::from_millis(30));
        registry.cancel(TaskId::new("other"));

        assert!(registry.is_cancelled(task.id()));
        assert!(registry.take(task.id()));
    }

    #[test]
    fn test_mark_prunable_once_task_ends() {
        let registry = Arc::new(CancellationRegistry::with_ttl(Some(Duration::from_millis(10))));
        let task = registry.track(TaskId::new("late"));
        registry.cancel(TaskId::new("late"));
        drop(task);
        assert_eq!(registry.in_flight(), 0);

        std::thread::sleep(Duration::from_millis(30));
        registry.cancel(TaskId::new("other"));

        assert!(!registry.is_cancelled(&TaskId::new("late")));
    }

    #[test]
    fn test_track_counts_duplicate_ids() {
        let registry = Arc::new(CancellationRegistry::new());
        let first = registry.track(TaskId::new("dup"));
        let second = registry.track(TaskId::new("dup"));
        assert_eq!(registry.in_flight(), 1);

        drop(first);
        assert_eq!(registry.in_flight(), 1);
        drop(second);
        assert_eq!(registry.in_flight(), 0);
    }

    #[test]
    fn test_no_ttl_keeps_entries() {
        let registry = CancellationRegistry::with_ttl(None);
        registry.cancel(TaskId::new("a"));
        std::thread::sleep(Duration::from_millis(5));
        registry.cancel(TaskId::new("b"));
        assert_eq!(registry.len(), 2);
    }
}
