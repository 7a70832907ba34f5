//! Resume/yield round trips on the shared stack.
//!
//! Run with: cargo bench

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use mycoroutine::{Scheduler, Status};

fn spinner(s: &Scheduler, frame: usize) {
    let pad = vec![1u8; frame];
    loop {
        s.yield_now().unwrap();
        black_box(&pad);
    }
}

fn deep_spinner(s: &Scheduler, _: ()) {
    let mut pad = [1u8; 16 * 1024];
    black_box(&mut pad);
    loop {
        s.yield_now().unwrap();
        black_box(&pad);
    }
}

fn bench_round_trip(c: &mut Criterion) {
    let sched = Scheduler::open().unwrap();
    let shallow = sched.spawn_with(spinner, 64).unwrap();
    let deep = sched.spawn_with(deep_spinner, ()).unwrap();

    c.bench_function("resume_yield_shallow", |b| {
        b.iter(|| assert_eq!(sched.resume(black_box(shallow)), Status::Suspended))
    });
    c.bench_function("resume_yield_16k_frame", |b| {
        b.iter(|| assert_eq!(sched.resume(black_box(deep)), Status::Suspended))
    });
}

fn bench_spawn_run(c: &mut Criterion) {
    let sched = Scheduler::open().unwrap();
    c.bench_function("spawn_resume_finish", |b| {
        b.iter(|| {
            let id = sched.spawn(|s| s.yield_now().unwrap()).unwrap();
            sched.resume(id);
            sched.resume(id)
        })
    });
}

criterion_group!(benches, bench_round_trip, bench_spawn_run);
criterion_main!(benches);
