//! Explicit registry tying instrumented mutexes together.

use std::collections::BTreeMap;
use std::sync::Arc;

use compact_str::CompactString;
use lockwise_types::{DetectorSnapshot, MutexSnapshot};
use parking_lot::Mutex;

use crate::errors::TeardownError;
use crate::mutex::{GuardedMutex, MutexId};
use crate::sink::{DiagnosticSink, TracingSink};
use crate::thread_state::ThreadLockState;

/// Owns every instrumented mutex and the diagnostic sink.
///
/// Constructed once at process start and passed to call sites; there
/// are no module-level singletons. The registry lock serializes
/// registration, deregistration, and snapshots only; acquire and
/// release never touch it.
pub struct DetectorContext {
    sink: Arc<dyn DiagnosticSink>,
    registry: Mutex<Registry>,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    mutexes: BTreeMap<MutexId, Arc<GuardedMutex>>,
}

impl DetectorContext {
    /// Context with the default tracing-backed sink.
    pub fn new() -> Self {
        Self::with_sink(Arc::new(TracingSink))
    }

    pub fn with_sink(sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            sink,
            registry: Mutex::new(Registry::default()),
        }
    }

    /// Registers a new instrumented mutex under `name`.
    pub fn create_mutex(&self, name: impl Into<CompactString>) -> Arc<GuardedMutex> {
        let mut registry = self.registry.lock();
        let id = MutexId(registry.next_id);
        registry.next_id += 1;
        let mutex = Arc::new(GuardedMutex::new(id, name.into(), Arc::clone(&self.sink)));
        registry.mutexes.insert(id, Arc::clone(&mutex));
        mutex
    }

    /// Creates the held-lock record for one thread.
    pub fn create_thread_state(&self, ident: impl Into<CompactString>) -> ThreadLockState {
        ThreadLockState::new(ident)
    }

    /// Removes a mutex from the registry, for long-running systems with
    /// lock churn. Fails while the mutex is held. The retired id is
    /// purged from every remaining successor set; ids are never reused,
    /// so a purged edge cannot come back under an alias.
    ///
    /// The in-use check and the removal are not one atomic step: an
    /// acquire racing with deregistration can slip between them. The
    /// check is diagnostic, not a safety gate.
    pub fn deregister(&self, mutex: &GuardedMutex) -> Result<(), TeardownError> {
        if let Some(holder) = mutex.current_holder() {
            return Err(TeardownError::InUse {
                mutex: mutex.name().to_string(),
                holder: holder.to_string(),
            });
        }
        let removed = self.registry.lock().mutexes.remove(&mutex.id());
        if removed.is_none() {
            return Err(TeardownError::NotRegistered {
                mutex: mutex.name().to_string(),
            });
        }

        let remaining: Vec<Arc<GuardedMutex>> =
            self.registry.lock().mutexes.values().cloned().collect();
        // One metadata lock at a time, outside the registry lock.
        for other in remaining {
            other.forget_successor(mutex.id());
        }
        Ok(())
    }

    /// Read-only dump of every registered mutex, successor sets
    /// rendered as display names.
    pub fn snapshot(&self) -> DetectorSnapshot {
        let mutexes: Vec<Arc<GuardedMutex>> =
            self.registry.lock().mutexes.values().cloned().collect();
        let names: BTreeMap<MutexId, String> = mutexes
            .iter()
            .map(|m| (m.id(), m.name().to_string()))
            .collect();

        let mutexes = mutexes
            .iter()
            .map(|m| {
                let meta = m.meta_snapshot();
                MutexSnapshot {
                    id: m.id().as_u64(),
                    name: m.name().to_string(),
                    acquires: meta.acquires,
                    releases: meta.releases,
                    holder: meta.holder.map(|h| h.to_string()),
                    successors: meta
                        .successors
                        .iter()
                        .map(|id| {
                            names
                                .get(id)
                                .cloned()
                                .unwrap_or_else(|| format!("#{}", id.as_u64()))
                        })
                        .collect(),
                }
            })
            .collect();

        DetectorSnapshot { mutexes }
    }
}

impl Default for DetectorContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;

    fn harness() -> (Arc<MemorySink>, DetectorContext) {
        let sink = Arc::new(MemorySink::default());
        let cx = DetectorContext::with_sink(sink.clone());
        (sink, cx)
    }

    #[test]
    fn deregister_while_held_fails_in_use() {
        let (_sink, cx) = harness();
        let a = cx.create_mutex("a");
        let mut ts = cx.create_thread_state("t1");

        a.acquire(&mut ts).unwrap();
        let err = cx.deregister(&a).unwrap_err();
        assert_eq!(
            err,
            TeardownError::InUse {
                mutex: "a".to_string(),
                holder: "t1".to_string(),
            }
        );
        assert_eq!(cx.snapshot().mutexes.len(), 1);

        a.release(&mut ts).unwrap();
        cx.deregister(&a).unwrap();
        assert!(cx.snapshot().mutexes.is_empty());
    }

    #[test]
    fn deregister_twice_fails_not_registered() {
        let (_sink, cx) = harness();
        let a = cx.create_mutex("a");

        cx.deregister(&a).unwrap();
        let err = cx.deregister(&a).unwrap_err();
        assert_eq!(
            err,
            TeardownError::NotRegistered {
                mutex: "a".to_string(),
            }
        );
    }

    #[test]
    fn deregister_purges_retired_id_from_successor_sets() {
        let (_sink, cx) = harness();
        let a = cx.create_mutex("a");
        let b = cx.create_mutex("b");

        let mut ts = cx.create_thread_state("t1");
        a.acquire(&mut ts).unwrap();
        b.acquire(&mut ts).unwrap();
        b.release(&mut ts).unwrap();
        a.release(&mut ts).unwrap();

        let before = cx.snapshot();
        assert_eq!(before.mutexes[0].successors, ["b".to_string()]);

        cx.deregister(&b).unwrap();
        let after = cx.snapshot();
        assert_eq!(after.mutexes.len(), 1);
        assert!(after.mutexes[0].successors.is_empty());
    }

    #[test]
    fn snapshot_reports_counters_and_holder() {
        let (_sink, cx) = harness();
        let a = cx.create_mutex("a");
        let mut ts = cx.create_thread_state("worker.7");

        a.acquire(&mut ts).unwrap();
        let held = cx.snapshot();
        assert_eq!(held.mutexes[0].holder.as_deref(), Some("worker.7"));
        assert_eq!(held.mutexes[0].acquires, 1);
        assert_eq!(held.mutexes[0].releases, 0);

        a.release(&mut ts).unwrap();
        let released = cx.snapshot();
        assert_eq!(released.mutexes[0].holder, None);
        assert_eq!(released.mutexes[0].releases, 1);
    }

    #[test]
    fn ids_are_not_reused_after_deregistration() {
        let (_sink, cx) = harness();
        let a = cx.create_mutex("a");
        let a_id = a.id().as_u64();
        cx.deregister(&a).unwrap();

        let b = cx.create_mutex("b");
        assert!(b.id().as_u64() > a_id);
    }
}
