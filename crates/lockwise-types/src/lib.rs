//! Diagnostic nomenclature shared across the lockwise runtime.
//!
//! - `LockEvent`: a point-in-time transition observed on an instrumented
//!   mutex (acquired, released, or an ordering contradiction).
//! - `MutexRef`: the stable identity of a mutex as it appears in records.
//! - `DetectorSnapshot`: a read-only dump of every registered mutex and
//!   its observed ordering edges.
//!
//! Exactly one `LockEvent` is produced per transition; the rendered text
//! of any record is not contractual, the record itself is.

use facet::Facet;
use std::sync::OnceLock;
use std::time::Instant;

// ── Timestamps ──────────────────────────────────────────────────

/// First-use monotonic anchor for process-relative timestamps.
/// "Process birth" is defined as the first call to `PTime::now()`.
fn ptime_anchor() -> &'static Instant {
    static PTIME_ANCHOR: OnceLock<Instant> = OnceLock::new();
    PTIME_ANCHOR.get_or_init(Instant::now)
}

/// Process start time + N milliseconds.
#[derive(Facet, Debug, Clone, Copy)]
pub struct PTime(u64);

impl PTime {
    pub fn now() -> Self {
        let elapsed_ms = ptime_anchor().elapsed().as_millis().min(u64::MAX as u128) as u64;
        Self(elapsed_ms)
    }
}

// ── Mutex identity ──────────────────────────────────────────────

/// Stable identity of an instrumented mutex as carried in records.
///
/// The numeric id is allocated once at registration and never reused;
/// the name is the display name given at construction.
#[derive(Facet, Debug, Clone, PartialEq, Eq)]
pub struct MutexRef {
    pub id: u64,
    pub name: String,
}

// ── Transition records ──────────────────────────────────────────

/// One record per observed transition on an instrumented mutex.
#[derive(Facet, Debug, Clone)]
pub struct LockEvent {
    /// When the transition was observed.
    pub at: PTime,
    /// Identity of the thread that performed the transition.
    pub thread: String,
    /// What happened.
    pub kind: LockEventKind,
}

#[derive(Facet, Debug, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum LockEventKind {
    /// The thread finished acquiring `mutex`. `held` is the thread's
    /// full held list after the acquisition, in acquisition order.
    Acquired {
        mutex: MutexRef,
        held: Vec<String>,
    },
    /// The thread released `mutex`.
    Released { mutex: MutexRef },
    /// The thread is acquiring `first` while holding `second`, but some
    /// earlier execution acquired `second` while `first` was held.
    /// Advisory: the acquisition still proceeds.
    OrderInversion {
        /// Originally observed as acquired first.
        first: MutexRef,
        /// Originally observed as acquired while `first` was held; now
        /// held by the recording thread ahead of `first`.
        second: MutexRef,
    },
}

impl LockEvent {
    pub fn new(thread: impl Into<String>, kind: LockEventKind) -> Self {
        Self {
            at: PTime::now(),
            thread: thread.into(),
            kind,
        }
    }
}

// ── Snapshots ───────────────────────────────────────────────────

/// Point-in-time state of one registered mutex.
#[derive(Facet, Debug, Clone)]
pub struct MutexSnapshot {
    pub id: u64,
    pub name: String,
    /// Number of completed acquisitions.
    pub acquires: u64,
    /// Number of completed releases.
    pub releases: u64,
    /// Identity of the current holder, if any.
    pub holder: Option<String>,
    /// Names of every mutex observed acquired while this one was held,
    /// in id order.
    pub successors: Vec<String>,
}

/// A dump of every mutex registered with a detector context.
#[derive(Facet, Debug, Clone, Default)]
pub struct DetectorSnapshot {
    pub mutexes: Vec<MutexSnapshot>,
}
