use std::time::Instant;

use mycoroutine::{CoId, Scheduler, Status};

const NUM_COROUTINES: usize = 10_000;
const ROUNDS: u64 = 10;

/// A small state machine: sums its id over a few rounds, yielding in between.
fn worker(s: &Scheduler, id: u64) {
    let mut total = 0;
    for _ in 0..ROUNDS {
        total += id;
        s.yield_now().expect("saved stack allocation failed");
    }
    assert_eq!(total, id * ROUNDS);
}

fn main() -> anyhow::Result<()> {
    let sched = Scheduler::open()?;
    let start = Instant::now();

    let ids = (0..NUM_COROUTINES as u64)
        .map(|n| sched.spawn_with(worker, n))
        .collect::<Result<Vec<CoId>, _>>()?;
    println!(
        "Spawned {} coroutines ({} slots)",
        sched.live_count(),
        sched.capacity()
    );

    let mut switches = 0;
    let mut saved_bytes = 0;
    while sched.live_count() > 0 {
        for &id in &ids {
            if sched.resume(id) == Status::Suspended {
                switches += 1;
                saved_bytes = sched.saved_stack_capacity(id).unwrap_or(saved_bytes);
            }
        }
    }

    println!(
        "{} switches in {:?}; one shared stack of {} bytes, about {} saved bytes per coroutine",
        switches,
        start.elapsed(),
        sched.stack_size(),
        saved_bytes
    );
    Ok(())
}
