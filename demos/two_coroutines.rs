use mycoroutine::Scheduler;

fn foo(s: &Scheduler, start: i32) {
    for i in 0..5 {
        println!("coroutine {} : {}", s.running().unwrap_or_default(), start + i);
        s.yield_now().expect("saved stack allocation failed");
    }
}

fn main() -> anyhow::Result<()> {
    let sched = Scheduler::open()?;

    let co1 = sched.spawn_with(foo, 0)?;
    let co2 = sched.spawn_with(foo, 100)?;

    println!("main start");
    while sched.status(co1).is_alive() && sched.status(co2).is_alive() {
        sched.resume(co1);
        sched.resume(co2);
    }
    println!("main end");

    sched.close();
    Ok(())
}
