pub mod consistent_order;
pub mod order_inversion;

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use lockwise::{DetectorContext, GuardedMutex};

/// Pause between worker iterations, so the threads actually interleave.
const PACE: Duration = Duration::from_millis(10);

/// Spawns a named worker that loops `first -> second` acquire/release
/// pairs. The worker loops are a toy workload: all detection lives in
/// the instrumented mutexes they call into.
pub(crate) fn spawn_worker(
    cx: &Arc<DetectorContext>,
    ident: &'static str,
    first: &Arc<GuardedMutex>,
    second: &Arc<GuardedMutex>,
    iterations: u32,
) -> JoinHandle<Result<(), String>> {
    let cx = Arc::clone(cx);
    let first = Arc::clone(first);
    let second = Arc::clone(second);
    std::thread::Builder::new()
        .name(ident.to_string())
        .spawn(move || {
            let mut ts = cx.create_thread_state(ident);
            for _ in 0..iterations {
                first.acquire(&mut ts).map_err(|e| e.to_string())?;
                second.acquire(&mut ts).map_err(|e| e.to_string())?;
                second.release(&mut ts).map_err(|e| e.to_string())?;
                first.release(&mut ts).map_err(|e| e.to_string())?;
                std::thread::sleep(PACE);
            }
            Ok(())
        })
        .expect("failed to spawn worker thread")
}

pub(crate) fn join_workers(handles: Vec<JoinHandle<Result<(), String>>>) -> Result<(), String> {
    for handle in handles {
        handle
            .join()
            .map_err(|_| "worker thread panicked".to_string())??;
    }
    Ok(())
}

pub(crate) fn print_summary(cx: &DetectorContext) {
    for m in cx.snapshot().mutexes {
        println!(
            "{}: {} acquires, {} releases, observed successors [{}]",
            m.name,
            m.acquires,
            m.releases,
            m.successors.join(", "),
        );
    }
}
