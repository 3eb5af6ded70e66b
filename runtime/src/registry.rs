//! Pending call registry.
//!
//! Maps dedup keys to the calls currently in flight under them. Each request
//! execution registers its calls under a fresh generation, so an execution
//! that settles removes its own calls and never a newer execution's.

use crate::driver::CancelFn;
use crate::metrics::RequestMetrics;
use composable_requests_core::action::{RequestKey, keys_select};
use futures::future::AbortHandle;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Cancel capabilities of one in-flight call
pub struct CallHandle {
    abort: AbortHandle,
    cancel: Option<CancelFn>,
}

impl CallHandle {
    /// Handle stopping the orchestrator's wait and, if present, the driver call
    #[must_use]
    pub fn new(abort: AbortHandle, cancel: Option<CancelFn>) -> Self {
        Self { abort, cancel }
    }

    fn cancel(self) {
        self.abort.abort();
        if let Some(cancel) = self.cancel {
            cancel();
        }
    }
}

impl std::fmt::Debug for CallHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallHandle")
            .field("aborted", &self.abort.is_aborted())
            .field("driver_cancel", &self.cancel.is_some())
            .finish()
    }
}

struct Execution {
    generation: u64,
    calls: Vec<CallHandle>,
}

#[derive(Default)]
struct Entries {
    next_generation: u64,
    by_key: HashMap<String, Vec<Execution>>,
}

/// In-flight calls by dedup key
///
/// Owned by one orchestrator. All mutation happens synchronously under a
/// short lock; cancel callbacks run after the lock is released.
#[derive(Default)]
pub struct PendingCallRegistry {
    entries: Mutex<Entries>,
}

impl PendingCallRegistry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the calls of one execution under `key` and return its generation
    pub fn register(&self, key: &str, calls: Vec<CallHandle>) -> u64 {
        let mut entries = self.lock();
        entries.next_generation += 1;
        let generation = entries.next_generation;
        entries
            .by_key
            .entry(key.to_string())
            .or_default()
            .push(Execution { generation, calls });

        RequestMetrics::record_pending_keys(entries.by_key.len());
        generation
    }

    /// Forget the execution `generation` under `key` once it has settled
    ///
    /// No-op if that execution was already cancelled.
    pub fn complete(&self, key: &str, generation: u64) {
        let mut entries = self.lock();
        if let Some(executions) = entries.by_key.get_mut(key) {
            executions.retain(|execution| execution.generation != generation);
            if executions.is_empty() {
                entries.by_key.remove(key);
            }
        }
        RequestMetrics::record_pending_keys(entries.by_key.len());
    }

    /// Cancel every call under `key`; returns how many were cancelled
    pub fn cancel_key(&self, key: &str) -> usize {
        let removed = {
            let mut entries = self.lock();
            let removed = entries.by_key.remove(key);
            RequestMetrics::record_pending_keys(entries.by_key.len());
            removed
        };

        removed.map_or(0, |executions| {
            tracing::debug!(key, "Cancelling pending calls");
            fire(executions)
        })
    }

    /// Cancel calls under the listed keys, or under every key for `None`
    pub fn cancel_keys(&self, keys: Option<&[RequestKey]>) -> usize {
        let removed: Vec<(String, Vec<Execution>)> = {
            let mut entries = self.lock();
            let selected: Vec<String> = entries
                .by_key
                .keys()
                .filter(|key| keys_select(keys, key))
                .cloned()
                .collect();
            let removed = selected
                .into_iter()
                .filter_map(|key| entries.by_key.remove(&key).map(|executions| (key, executions)))
                .collect();
            RequestMetrics::record_pending_keys(entries.by_key.len());
            removed
        };

        removed
            .into_iter()
            .map(|(key, executions)| {
                tracing::debug!(key = %key, "Cancelling pending calls");
                fire(executions)
            })
            .sum()
    }

    /// Whether calls are in flight under `key`
    #[must_use]
    pub fn is_pending(&self, key: &str) -> bool {
        self.lock().by_key.contains_key(key)
    }

    /// Number of dedup keys with calls in flight
    #[must_use]
    pub fn pending_keys(&self) -> usize {
        self.lock().by_key.len()
    }
}

impl std::fmt::Debug for PendingCallRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingCallRegistry")
            .field("pending_keys", &self.pending_keys())
            .finish()
    }
}

fn fire(executions: Vec<Execution>) -> usize {
    let calls: Vec<CallHandle> = executions.into_iter().flat_map(|execution| execution.calls).collect();
    let count = calls.len();
    for call in calls {
        call.cancel();
    }
    RequestMetrics::record_cancelled(count);
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn handle(counter: &Arc<AtomicUsize>) -> (CallHandle, AbortHandle) {
        let (abort, _registration) = AbortHandle::new_pair();
        let counter = Arc::clone(counter);
        let cancel: CancelFn = Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (CallHandle::new(abort.clone(), Some(cancel)), abort)
    }

    #[test]
    fn test_settled_execution_removes_only_itself() {
        let registry = PendingCallRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let first = registry.register("FETCH", vec![handle(&counter).0]);
        let _second = registry.register("FETCH", vec![handle(&counter).0]);

        registry.complete("FETCH", first);
        assert!(registry.is_pending("FETCH"));

        assert_eq!(registry.cancel_key("FETCH"), 1);
        assert!(!registry.is_pending("FETCH"));
    }

    #[test]
    fn test_cancel_fires_abort_and_driver_cancel() {
        let registry = PendingCallRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let (call, abort) = handle(&counter);

        registry.register("FETCH", vec![call]);
        registry.cancel_key("FETCH");

        assert!(abort.is_aborted());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cancel_without_driver_capability() {
        let registry = PendingCallRegistry::new();
        let (abort, _registration) = AbortHandle::new_pair();

        registry.register("FETCH", vec![CallHandle::new(abort.clone(), None)]);

        assert_eq!(registry.cancel_keys(None), 1);
        assert!(abort.is_aborted());
    }

    #[test]
    fn test_keyed_cancel_leaves_others() {
        let registry = PendingCallRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));

        registry.register("FETCH_BOOK1", vec![handle(&counter).0]);
        registry.register("FETCH_BOOK2", vec![handle(&counter).0, handle(&counter).0]);
        registry.register("FETCH_AUTHORS", vec![handle(&counter).0]);

        let keys = [RequestKey::new("FETCH_BOOK").with_key("2"), RequestKey::new("FETCH_AUTHORS")];
        assert_eq!(registry.cancel_keys(Some(&keys)), 3);

        assert!(registry.is_pending("FETCH_BOOK1"));
        assert_eq!(registry.pending_keys(), 1);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_completing_a_cancelled_execution_is_a_no_op() {
        let registry = PendingCallRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let generation = registry.register("FETCH", vec![handle(&counter).0]);
        registry.cancel_key("FETCH");
        registry.complete("FETCH", generation);

        assert_eq!(registry.pending_keys(), 0);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    proptest::proptest! {
        #[test]
        fn test_cancel_all_cancels_every_registered_call(
            executions in proptest::collection::vec(("[A-C]", 1_usize..4), 0..12)
        ) {
            let registry = PendingCallRegistry::new();
            let counter = Arc::new(AtomicUsize::new(0));

            let total: usize = executions.iter().map(|(_, calls)| calls).sum();
            for (key, calls) in &executions {
                registry.register(key, (0..*calls).map(|_| handle(&counter).0).collect());
            }

            proptest::prop_assert_eq!(registry.cancel_keys(None), total);
            proptest::prop_assert_eq!(registry.pending_keys(), 0);
            proptest::prop_assert_eq!(counter.load(Ordering::SeqCst), total);
        }
    }
}
