//! Hard-failure conditions for structural misuse of instrumented mutexes.
//!
//! Ordering findings are diagnostic records, never errors; see
//! `sink::DiagnosticSink`. Errors here mean the caller broke the
//! acquire/release protocol itself.

use std::error::Error;
use std::fmt;

/// Acquisition was refused before touching the underlying primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquireError {
    /// The calling thread already holds this mutex. Blocking here would
    /// self-deadlock, so the call fails fast instead.
    Reentrant { mutex: String, thread: String },
}

impl fmt::Display for AcquireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcquireError::Reentrant { mutex, thread } => write!(
                f,
                "thread {thread} attempted to re-acquire {mutex} which it already holds"
            ),
        }
    }
}

impl Error for AcquireError {}

/// Release was refused; the mutex and all bookkeeping are unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseError {
    /// The calling thread does not hold this mutex.
    NotHeld { mutex: String, thread: String },
}

impl fmt::Display for ReleaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReleaseError::NotHeld { mutex, thread } => {
                write!(f, "thread {thread} released {mutex} without holding it")
            }
        }
    }
}

impl Error for ReleaseError {}

/// Deregistration was refused; the registry is unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TeardownError {
    /// The mutex is currently held.
    InUse { mutex: String, holder: String },
    /// The mutex is not (or no longer) registered with this context.
    NotRegistered { mutex: String },
}

impl fmt::Display for TeardownError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TeardownError::InUse { mutex, holder } => {
                write!(f, "cannot deregister {mutex}: held by thread {holder}")
            }
            TeardownError::NotRegistered { mutex } => {
                write!(f, "cannot deregister {mutex}: not registered")
            }
        }
    }
}

impl Error for TeardownError {}
