use std::sync::Arc;

use lockwise::DetectorContext;

use super::{join_workers, print_summary, spawn_worker};

/// Control workload: every worker takes the mutexes in the same order,
/// so the run must finish with zero inversion findings.
pub fn run(cx: Arc<DetectorContext>, iterations: u32) -> Result<(), String> {
    let a = cx.create_mutex("a");
    let b = cx.create_mutex("b");

    println!("running {iterations} iterations: all workers take a then b");

    let handles = vec![
        spawn_worker(&cx, "worker.1", &a, &b, iterations),
        spawn_worker(&cx, "worker.2", &a, &b, iterations),
        spawn_worker(&cx, "worker.3", &a, &b, iterations),
    ];
    join_workers(handles)?;

    print_summary(&cx);
    Ok(())
}
