//! Instrumented mutex and the ordering check itself.

use std::collections::BTreeSet;
use std::sync::Arc;

use compact_str::CompactString;
use lockwise_types::{LockEvent, LockEventKind, MutexRef};
use parking_lot::lock_api::RawMutex as _;
use parking_lot::{Mutex, RawMutex};

use crate::errors::{AcquireError, ReleaseError};
use crate::sink::DiagnosticSink;
use crate::thread_state::ThreadLockState;

/// Stable identity of a registered mutex. Allocated by the context,
/// never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MutexId(pub(crate) u64);

impl MutexId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Bookkeeping guarded by the metadata lock.
#[derive(Default)]
struct MutexMeta {
    /// Identities of mutexes observed acquired, by any thread, while
    /// this one was held. Append-only while the mutex is registered;
    /// only deregistration removes entries.
    successors: BTreeSet<MutexId>,
    acquires: u64,
    releases: u64,
    holder: Option<CompactString>,
}

pub(crate) struct MetaSnapshot {
    pub successors: Vec<MutexId>,
    pub acquires: u64,
    pub releases: u64,
    pub holder: Option<CompactString>,
}

/// A named mutex that reports contradictory acquisition orders.
///
/// The metadata lock is a leaf lock: it is released before touching any
/// other mutex's metadata lock and is never held while blocking on the
/// raw primitive, so the detector cannot itself create the hazard it
/// watches for.
pub struct GuardedMutex {
    id: MutexId,
    name: CompactString,
    raw: RawMutex,
    meta: Mutex<MutexMeta>,
    sink: Arc<dyn DiagnosticSink>,
}

impl GuardedMutex {
    pub(crate) fn new(id: MutexId, name: CompactString, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            id,
            name,
            raw: RawMutex::INIT,
            meta: Mutex::new(MutexMeta::default()),
            sink,
        }
    }

    pub fn id(&self) -> MutexId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identity as carried in diagnostic records.
    pub fn to_ref(&self) -> MutexRef {
        MutexRef {
            id: self.id.0,
            name: self.name.to_string(),
        }
    }

    /// Blocks until the mutex is acquired by the calling thread.
    ///
    /// Ordering bookkeeping runs first, bounded and without blocking;
    /// any contradiction with a previously observed order produces an
    /// `OrderInversion` record but never stops the acquisition. Fails
    /// fast if the thread already holds this mutex; blocking there
    /// would be a silent self-deadlock.
    pub fn acquire(self: &Arc<Self>, ts: &mut ThreadLockState) -> Result<(), AcquireError> {
        if ts.holds(self.id) {
            return Err(AcquireError::Reentrant {
                mutex: self.name.to_string(),
                thread: ts.ident().to_string(),
            });
        }
        self.observe_held_order(ts);
        self.raw.lock();
        self.note_acquired(ts);
        Ok(())
    }

    /// Non-blocking variant. Returns `Ok(false)` on contention, with no
    /// bookkeeping change at all; ordering edges are only recorded for
    /// acquisitions that actually happen.
    pub fn try_acquire(self: &Arc<Self>, ts: &mut ThreadLockState) -> Result<bool, AcquireError> {
        if ts.holds(self.id) {
            return Err(AcquireError::Reentrant {
                mutex: self.name.to_string(),
                thread: ts.ident().to_string(),
            });
        }
        if !self.raw.try_lock() {
            return Ok(false);
        }
        self.observe_held_order(ts);
        self.note_acquired(ts);
        Ok(true)
    }

    /// Releases the mutex. Fails with `NotHeld` when the calling thread
    /// does not hold it, leaving the held list, every successor set,
    /// and the primitive untouched. A once-observed order is permanent:
    /// release changes no ordering bookkeeping.
    pub fn release(&self, ts: &mut ThreadLockState) -> Result<(), ReleaseError> {
        if !ts.remove(self.id) {
            return Err(ReleaseError::NotHeld {
                mutex: self.name.to_string(),
                thread: ts.ident().to_string(),
            });
        }
        {
            let mut meta = self.meta.lock();
            meta.releases += 1;
            meta.holder = None;
        }
        // SAFETY: the held-list check above proves this thread owns the
        // raw lock: it was pushed in `acquire`/`try_acquire` after
        // `raw.lock()` and has not been removed since.
        unsafe { self.raw.unlock() };
        self.sink.record(&LockEvent::new(
            ts.ident(),
            LockEventKind::Released {
                mutex: self.to_ref(),
            },
        ));
        Ok(())
    }

    /// Checks the held list against this mutex's successor set and
    /// records the new ordering edges.
    ///
    /// A held mutex M found in the snapshot means some thread acquired
    /// M while this mutex was held, so taking this mutex now, with M
    /// held, contradicts that order. Every other held mutex gains an
    /// edge M -> this.
    fn observe_held_order(&self, ts: &ThreadLockState) {
        // Snapshot under our own metadata lock, then let go before
        // evaluating any other mutex's state.
        let snapshot = self.meta.lock().successors.clone();

        for held in ts.entries() {
            if snapshot.contains(&held.id()) {
                self.sink.record(&LockEvent::new(
                    ts.ident(),
                    LockEventKind::OrderInversion {
                        first: self.to_ref(),
                        second: held.to_ref(),
                    },
                ));
            } else {
                // One metadata lock at a time: acquire, mutate, release.
                held.meta.lock().successors.insert(self.id);
            }
        }
    }

    /// Post-acquisition bookkeeping shared by both acquire paths. The
    /// raw primitive is already owned at this point.
    fn note_acquired(self: &Arc<Self>, ts: &mut ThreadLockState) {
        {
            let mut meta = self.meta.lock();
            meta.acquires += 1;
            meta.holder = Some(CompactString::from(ts.ident()));
        }
        ts.push(Arc::clone(self));
        self.sink.record(&LockEvent::new(
            ts.ident(),
            LockEventKind::Acquired {
                mutex: self.to_ref(),
                held: ts.held_names(),
            },
        ));
    }

    pub(crate) fn current_holder(&self) -> Option<CompactString> {
        self.meta.lock().holder.clone()
    }

    pub(crate) fn forget_successor(&self, id: MutexId) {
        self.meta.lock().successors.remove(&id);
    }

    pub(crate) fn meta_snapshot(&self) -> MetaSnapshot {
        let meta = self.meta.lock();
        MetaSnapshot {
            successors: meta.successors.iter().copied().collect(),
            acquires: meta.acquires,
            releases: meta.releases,
            holder: meta.holder.clone(),
        }
    }
}
