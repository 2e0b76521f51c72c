//! Record delivery for observed transitions.
//!
//! Every acquire, release, and ordering finding produces exactly one
//! [`LockEvent`], handed to whichever sink the [`DetectorContext`] was
//! built with. Sinks must tolerate being called from any thread.
//!
//! [`DetectorContext`]: crate::context::DetectorContext

use std::io::Write;

use lockwise_types::{LockEvent, LockEventKind};
use parking_lot::Mutex;

/// Receives one record per observed transition.
pub trait DiagnosticSink: Send + Sync {
    fn record(&self, event: &LockEvent);
}

// ── Tracing sink ────────────────────────────────────────────────

/// Default sink: routes records through `tracing`.
///
/// Ordering findings are warnings; acquire/release chatter is debug.
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn record(&self, event: &LockEvent) {
        match &event.kind {
            LockEventKind::Acquired { mutex, held } => {
                tracing::debug!(
                    thread = %event.thread,
                    mutex = %mutex.name,
                    held = ?held,
                    "acquired"
                );
            }
            LockEventKind::Released { mutex } => {
                tracing::debug!(thread = %event.thread, mutex = %mutex.name, "released");
            }
            LockEventKind::OrderInversion { first, second } => {
                tracing::warn!(
                    thread = %event.thread,
                    first = %first.name,
                    second = %second.name,
                    "lock order inversion: {} is supposed to be taken before {}, \
                     but thread {} acquired {} first",
                    first.name,
                    second.name,
                    event.thread,
                    second.name,
                );
            }
        }
    }
}

// ── Writer sink ─────────────────────────────────────────────────

/// Writes one line per record to any writer. Used by the demo binary's
/// stdout mode; write failures are swallowed, diagnostics never abort
/// the instrumented program.
pub struct FmtSink<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> FmtSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

impl<W: Write + Send> DiagnosticSink for FmtSink<W> {
    fn record(&self, event: &LockEvent) {
        let mut out = self.out.lock();
        let _ = match &event.kind {
            LockEventKind::Acquired { mutex, held } => writeln!(
                out,
                "thread {} acquired {}; now holds [{}]",
                event.thread,
                mutex.name,
                held.join(", "),
            ),
            LockEventKind::Released { mutex } => {
                writeln!(out, "thread {} released {}", event.thread, mutex.name)
            }
            LockEventKind::OrderInversion { first, second } => writeln!(
                out,
                "lock order inversion! {} is supposed to be taken before {}; \
                 thread {} acquired {} first",
                first.name, second.name, event.thread, second.name,
            ),
        };
    }
}

// ── Capturing sink ──────────────────────────────────────────────

/// Retains every record in memory, in delivery order. Used by tests and
/// by callers that want to assert on findings programmatically.
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<LockEvent>>,
}

impl MemorySink {
    pub fn events(&self) -> Vec<LockEvent> {
        self.events.lock().clone()
    }

    /// Only the ordering findings, in delivery order.
    pub fn inversions(&self) -> Vec<LockEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| matches!(e.kind, LockEventKind::OrderInversion { .. }))
            .cloned()
            .collect()
    }
}

impl DiagnosticSink for MemorySink {
    fn record(&self, event: &LockEvent) {
        self.events.lock().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockwise_types::MutexRef;

    fn mutex_ref(id: u64, name: &str) -> MutexRef {
        MutexRef {
            id,
            name: name.to_string(),
        }
    }

    #[test]
    fn fmt_sink_writes_one_line_per_record() {
        let sink = FmtSink::new(Vec::new());
        sink.record(&LockEvent::new(
            "worker.1",
            LockEventKind::Acquired {
                mutex: mutex_ref(0, "a"),
                held: vec!["a".to_string()],
            },
        ));
        sink.record(&LockEvent::new(
            "worker.1",
            LockEventKind::OrderInversion {
                first: mutex_ref(0, "a"),
                second: mutex_ref(1, "b"),
            },
        ));
        sink.record(&LockEvent::new(
            "worker.1",
            LockEventKind::Released {
                mutex: mutex_ref(0, "a"),
            },
        ));

        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert!(text.contains("a is supposed to be taken before b"));
    }

    #[test]
    fn memory_sink_retains_delivery_order() {
        let sink = MemorySink::default();
        sink.record(&LockEvent::new(
            "t",
            LockEventKind::Acquired {
                mutex: mutex_ref(0, "a"),
                held: vec!["a".to_string()],
            },
        ));
        sink.record(&LockEvent::new(
            "t",
            LockEventKind::Released {
                mutex: mutex_ref(0, "a"),
            },
        ));

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0].kind, LockEventKind::Acquired { .. }));
        assert!(matches!(events[1].kind, LockEventKind::Released { .. }));
        assert!(sink.inversions().is_empty());
    }
}
