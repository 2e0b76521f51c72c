//! Per-thread record of currently held mutexes.

use std::sync::Arc;

use compact_str::CompactString;

use crate::mutex::{GuardedMutex, MutexId};

/// The ordered held list for one thread.
///
/// Created once per thread (eagerly or lazily on first acquire) and
/// touched exclusively by that thread, so it carries no synchronization
/// of its own. Mutation goes through [`GuardedMutex`] only; everything
/// else is a read-only dump.
pub struct ThreadLockState {
    ident: CompactString,
    /// Held mutexes in acquisition order.
    held: Vec<Arc<GuardedMutex>>,
}

impl ThreadLockState {
    pub fn new(ident: impl Into<CompactString>) -> Self {
        Self {
            ident: ident.into(),
            held: Vec::new(),
        }
    }

    /// The thread identity carried in every record this thread produces.
    pub fn ident(&self) -> &str {
        &self.ident
    }

    /// Whether this thread currently holds the given mutex.
    pub fn holds(&self, id: MutexId) -> bool {
        self.held.iter().any(|m| m.id() == id)
    }

    /// Display names of the held mutexes, in acquisition order.
    pub fn held_names(&self) -> Vec<String> {
        self.held.iter().map(|m| m.name().to_string()).collect()
    }

    pub(crate) fn entries(&self) -> &[Arc<GuardedMutex>] {
        &self.held
    }

    pub(crate) fn push(&mut self, mutex: Arc<GuardedMutex>) {
        self.held.push(mutex);
    }

    /// Removes exactly the named mutex, leaving every other entry in
    /// place. Returns false if it was not held.
    pub(crate) fn remove(&mut self, id: MutexId) -> bool {
        match self.held.iter().position(|m| m.id() == id) {
            Some(idx) => {
                self.held.remove(idx);
                true
            }
            None => false,
        }
    }
}
