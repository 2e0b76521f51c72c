//! Runtime lock-order-inversion detection for OS-thread mutexes.
//!
//! lockwise wraps exclusive-acquisition primitives in named, instrumented
//! mutexes. Every acquisition is checked against the pairwise orders
//! observed so far across all threads; the moment two mutexes are seen
//! taken in contradictory orders by different threads, the classic AB-BA
//! deadlock precondition, a diagnostic record is emitted. Findings are
//! advisory: the acquisition itself always proceeds.
//!
//! ```rust
//! use lockwise::DetectorContext;
//!
//! let cx = DetectorContext::new();
//! let a = cx.create_mutex("a");
//! let b = cx.create_mutex("b");
//!
//! let mut ts = cx.create_thread_state("worker.1");
//! a.acquire(&mut ts)?;
//! b.acquire(&mut ts)?; // records the ordering edge a -> b
//! b.release(&mut ts)?;
//! a.release(&mut ts)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Any thread that later takes `b` before `a` triggers an
//! `OrderInversion` record naming both mutexes and the offending thread.
//!
//! Detection is synchronous and local to the acquiring call: no
//! background thread, no coordinator. Each mutex guards its own
//! bookkeeping with a leaf metadata lock that is released before any
//! other mutex's metadata is touched and is never held while blocking,
//! so the detector cannot introduce the hazard it reports.
//!
//! Structural misuse (re-entrant acquisition, releasing a mutex the
//! thread does not hold, deregistering a held mutex) is a hard error;
//! see [`errors`].

pub mod context;
pub mod errors;
pub mod mutex;
pub mod sink;
pub mod thread_state;

pub use context::DetectorContext;
pub use errors::{AcquireError, ReleaseError, TeardownError};
pub use mutex::{GuardedMutex, MutexId};
pub use sink::{DiagnosticSink, FmtSink, MemorySink, TracingSink};
pub use thread_state::ThreadLockState;

pub use lockwise_types as types;
