use std::sync::Arc;

use lockwise::DetectorContext;

use super::{join_workers, print_summary, spawn_worker};

pub fn run(cx: Arc<DetectorContext>, iterations: u32) -> Result<(), String> {
    let a = cx.create_mutex("a");
    let b = cx.create_mutex("b");

    println!(
        "running {iterations} iterations: worker.1 and worker.2 take a then b, worker.3 takes b then a"
    );
    println!(
        "expect an order-inversion finding the first time worker.3 requests a while holding b; \
         the contradictory orders can also deadlock the workload for real; Ctrl+C if it does"
    );

    let handles = vec![
        spawn_worker(&cx, "worker.1", &a, &b, iterations),
        spawn_worker(&cx, "worker.2", &a, &b, iterations),
        spawn_worker(&cx, "worker.3", &b, &a, iterations),
    ];
    join_workers(handles)?;

    print_summary(&cx);
    Ok(())
}
