//! Shared-stack coroutine scheduler
//!
//! Every coroutine runs on the scheduler's one shared stack. Yielding copies
//! the live part of that stack (from the stack pointer up to the top) into
//! the coroutine's own buffer; resuming copies it back to the same addresses
//! before switching in. Only one coroutine is ever resident, so pointers into
//! a coroutine's own frames stay valid across suspensions.
//!
//! # Example
//!
//! ```no_run
//! use mycoroutine::Scheduler;
//!
//! let sched = Scheduler::open()?;
//! let id = sched.spawn(|s| {
//!     println!("step 1");
//!     s.yield_now().unwrap();
//!     println!("step 2");
//! })?;
//!
//! sched.resume(id); // step 1
//! sched.resume(id); // step 2, coroutine is now dead
//! # Ok::<(), mycoroutine::Error>(())
//! ```

use std::cell::{Cell, UnsafeCell};
use std::marker::{PhantomData, PhantomPinned};
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::process;

use crate::CoId;
use crate::config::Config;
use crate::context::{self, Context};
use crate::coroutine::{Coroutine, Status};
use crate::debug::co_debug;
use crate::error::Result;
use crate::slots::SlotTable;
use crate::stack::SharedStack;

/// Owns the shared stack and every coroutine spawned into it.
///
/// Always handed out pinned: suspended coroutines keep `&Scheduler` in their
/// saved frames, so it must not move while they exist. It is neither `Send`
/// nor `Sync`.
pub struct Scheduler {
    stack: SharedStack,
    /// Context of whoever called `resume`
    main: UnsafeCell<Context>,
    slots: UnsafeCell<SlotTable<Coroutine>>,
    running: Cell<Option<CoId>>,
    _pinned: PhantomPinned,
    _not_send: PhantomData<*mut ()>,
}

impl Scheduler {
    /// Open a scheduler with a 1MB shared stack and 16 slots.
    pub fn open() -> Result<Pin<Box<Self>>> {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Result<Pin<Box<Self>>> {
        config.validate()?;
        let stack = SharedStack::new(config.stack_size)?;
        let slots = SlotTable::with_capacity(config.initial_slots)?;
        co_debug!("open: stack={} bytes slots={}", stack.size(), slots.capacity());

        Ok(Box::pin(Scheduler {
            stack,
            main: UnsafeCell::new(Context::default()),
            slots: UnsafeCell::new(slots),
            running: Cell::new(None),
            _pinned: PhantomPinned,
            _not_send: PhantomData,
        }))
    }

    /// Destroy the scheduler and every coroutine still in it.
    ///
    /// Ready coroutines drop their closures. Suspended ones only release
    /// their saved stacks: values living in their frames are never dropped.
    pub fn close(self: Pin<Box<Self>>) {
        drop(self);
    }

    /// The slot table.
    ///
    /// # Safety
    /// No other reference into the table may be alive. Callers release the
    /// borrow before running coroutine code or switching contexts.
    #[allow(clippy::mut_from_ref)]
    unsafe fn slots(&self) -> &mut SlotTable<Coroutine> {
        unsafe { &mut *self.slots.get() }
    }

    /// Create a coroutine that will run `f` on its first resume.
    ///
    /// Never runs any part of `f`. Returns `Error::Alloc` when the slot table
    /// cannot grow; the coroutine record itself is boxed with the global
    /// allocator, which aborts the process if that allocation fails.
    pub fn spawn<F>(&self, f: F) -> Result<CoId>
    where
        F: FnOnce(&Scheduler) + 'static,
    {
        let co = Box::new(Coroutine::new(Box::new(f)));
        let slots = unsafe { self.slots() };
        let capacity = slots.capacity();
        let id = slots.insert(co)?;
        if slots.capacity() != capacity {
            co_debug!("grow: {} -> {} slots", capacity, slots.capacity());
        }
        co_debug!("spawn: id={} live={}", id, slots.live());
        Ok(id)
    }

    /// Create a coroutine running `entry(scheduler, arg)`.
    pub fn spawn_with<A>(&self, entry: fn(&Scheduler, A), arg: A) -> Result<CoId>
    where
        A: 'static,
    {
        self.spawn(move |s| entry(s, arg))
    }

    /// Run coroutine `id` until it yields or finishes.
    ///
    /// Returns its status afterwards: `Suspended` or `Dead`. An empty slot is
    /// a no-op that returns `Dead`.
    ///
    /// # Panics
    /// If a coroutine is already running, which includes calling this from
    /// inside a coroutine body (aborting the process, as any panic there
    /// does), or if `id` is outside the slot table.
    pub fn resume(&self, id: CoId) -> Status {
        if let Some(current) = self.running.get() {
            panic!("resume({id}) called while coroutine {current} is running");
        }
        let co: *mut Coroutine = match unsafe { self.slots() }.get_mut(id) {
            Some(co) => co,
            None => return Status::Dead,
        };
        let top = self.stack.top();

        unsafe {
            match (*co).status {
                Status::Ready => {
                    co_debug!("resume: id={id} start");
                    let arg = self as *const Scheduler as usize;
                    (*co).context = Context::new(top, trampoline, arg);
                }
                Status::Suspended => {
                    co_debug!("resume: id={id} restore {} bytes", (*co).saved.len());
                    (*co).saved.restore(top);
                }
                status => unreachable!("coroutine {id} is {status} while nothing runs"),
            }
            (*co).status = Status::Running;
            self.running.set(Some(id));
            context::switch(self.main.get(), &(*co).context);
        }

        // The coroutine may have finished and been freed; look it up again.
        let slots = unsafe { self.slots() };
        if let Some(co) = slots.get(id)
            && co.status == Status::Suspended
        {
            debug_assert!(
                co.context.stack_pointer() >= top - co.saved.len(),
                "coroutine {id} suspended below its captured extent"
            );
            return Status::Suspended;
        }
        Status::Dead
    }

    /// Suspend the running coroutine and return to whoever resumed it.
    ///
    /// Returns once the coroutine is resumed. If its saved-stack buffer
    /// cannot grow, returns `Error::Alloc` without suspending.
    ///
    /// # Panics
    /// If called outside a coroutine body.
    pub fn yield_now(&self) -> Result<()> {
        let id = self
            .running
            .get()
            .expect("yield_now called outside of a running coroutine");
        let co: *mut Coroutine = unsafe { self.slots() }
            .get_mut(id)
            .expect("running coroutine has a slot");
        co_debug!("yield: id={id} footprint={}", self.stack.top() - context::stack_pointer());

        unsafe { self.suspend(co) }
    }

    /// Save the live stack of `co` and switch to the main context.
    ///
    /// Nothing may be written to this frame between the capture and the
    /// switch: those bytes would be stale once the frame is restored.
    #[inline(never)]
    unsafe fn suspend(&self, co: *mut Coroutine) -> Result<()> {
        let top = self.stack.top();
        let sp = context::stack_pointer();
        assert!(
            self.stack.contains(sp),
            "stack pointer {sp:#x} outside the shared stack"
        );

        unsafe {
            (*co).saved.capture(sp, top)?;
            (*co).status = Status::Suspended;
            self.running.set(None);
            context::switch(&mut (*co).context, self.main.get());
        }
        Ok(())
    }

    /// Run the body of the coroutine that was just switched into.
    fn run_current(&self) {
        let id = self.running.get().expect("coroutine started with nothing running");
        let entry = unsafe { self.slots() }
            .get_mut(id)
            .and_then(|co| co.entry.take())
            .expect("fresh coroutine has an entry");

        if panic::catch_unwind(AssertUnwindSafe(|| entry(self))).is_err() {
            eprintln!("coroutine {id} panicked; aborting");
            process::abort();
        }
    }

    /// Reclaim the coroutine whose body just returned and leave its stack
    /// for good.
    unsafe fn finish_current(&self) -> ! {
        let id = self.running.take().expect("finished coroutine was running");
        let slots = unsafe { self.slots() };
        drop(slots.remove(id));
        co_debug!("finish: id={id} live={}", slots.live());

        // Nothing ever switches back into this context.
        let mut dead = Context::default();
        unsafe { context::switch(&mut dead, self.main.get()) };
        unreachable!("finished coroutine {id} was resumed");
    }

    /// Status of `id`; `Dead` for empty slots.
    ///
    /// # Panics
    /// If `id` is outside the slot table.
    pub fn status(&self, id: CoId) -> Status {
        unsafe { self.slots() }.get(id).map_or(Status::Dead, |co| co.status)
    }

    /// The coroutine currently executing, or `None` on the main flow.
    pub fn running(&self) -> Option<CoId> {
        self.running.get()
    }

    /// Number of coroutines that have not finished.
    pub fn live_count(&self) -> usize {
        unsafe { self.slots() }.live()
    }

    /// Number of slots; valid ids are below this.
    pub fn capacity(&self) -> usize {
        unsafe { self.slots() }.capacity()
    }

    /// Bytes of the shared stack.
    pub fn stack_size(&self) -> usize {
        self.stack.size()
    }

    /// Bytes captured at the last yield of `id`, if it is alive.
    pub fn saved_stack_len(&self, id: CoId) -> Option<usize> {
        unsafe { self.slots() }.get(id).map(|co| co.saved.len())
    }

    /// Allocated size of the saved-stack buffer of `id`, if it is alive.
    pub fn saved_stack_capacity(&self, id: CoId) -> Option<usize> {
        unsafe { self.slots() }.get(id).map(|co| co.saved.capacity())
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        let dropped = self.slots.get_mut().clear();
        co_debug!("close: dropped {dropped} live coroutines");
    }
}

/// Bottom frame of every coroutine on the shared stack.
extern "C" fn trampoline(sched: usize) -> ! {
    let sched = unsafe { &*(sched as *const Scheduler) };
    sched.run_current();
    unsafe { sched.finish_current() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::stack::FAIL_NEXT_CAPTURE;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_open_defaults() {
        let sched = Scheduler::open().unwrap();
        assert_eq!(sched.capacity(), 16);
        assert_eq!(sched.live_count(), 0);
        assert_eq!(sched.running(), None);
        assert_eq!(sched.stack_size(), 1024 * 1024);
    }

    #[test]
    fn test_spawn_does_not_run() {
        let sched = Scheduler::open().unwrap();
        let ran = Rc::new(Cell::new(false));
        let flag = ran.clone();
        let id = sched.spawn(move |_| flag.set(true)).unwrap();

        assert_eq!(sched.status(id), Status::Ready);
        assert_eq!(sched.live_count(), 1);
        assert!(!ran.get());
    }

    #[test]
    fn test_running_inside_body() {
        let sched = Scheduler::open().unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        let id = sched
            .spawn(move |s| {
                let me = s.running().unwrap();
                log.borrow_mut().push((me, s.status(me)));
            })
            .unwrap();

        assert_eq!(sched.resume(id), Status::Dead);
        assert_eq!(*seen.borrow(), vec![(id, Status::Running)]);
        assert_eq!(sched.running(), None);
        assert_eq!(sched.live_count(), 0);
    }

    #[inline(never)]
    fn yield_under_big_frame(s: &Scheduler) {
        let mut big = [0x5au8; 8192];
        std::hint::black_box(&mut big);
        s.yield_now().unwrap();
        assert!(std::hint::black_box(&big).iter().all(|&b| b == 0x5a));
    }

    #[test]
    fn test_yield_saves_exact_footprint() {
        let sched = Scheduler::open().unwrap();
        let id = sched
            .spawn(|s| {
                s.yield_now().unwrap();
                yield_under_big_frame(s);
            })
            .unwrap();

        assert_eq!(sched.resume(id), Status::Suspended);
        let shallow = sched.saved_stack_len(id).unwrap();
        assert!(shallow > 0);

        assert_eq!(sched.resume(id), Status::Suspended);
        let deep = sched.saved_stack_len(id).unwrap();
        assert!(deep >= shallow + 8192);
        assert!(deep <= sched.saved_stack_capacity(id).unwrap());

        assert_eq!(sched.resume(id), Status::Dead);
        assert_eq!(sched.saved_stack_len(id), None);
    }

    #[test]
    fn test_failed_yield_keeps_running() {
        let sched = Scheduler::open().unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        let id = sched
            .spawn(move |s| {
                let me = s.running().unwrap();
                FAIL_NEXT_CAPTURE.with(|f| f.set(true));
                let err = s.yield_now().unwrap_err();
                log.borrow_mut().push(matches!(err, Error::Alloc { .. }));
                log.borrow_mut().push(s.status(me) == Status::Running);
                log.borrow_mut().push(s.running() == Some(me));
                s.yield_now().unwrap();
            })
            .unwrap();

        assert_eq!(sched.resume(id), Status::Suspended);
        assert_eq!(*seen.borrow(), vec![true, true, true]);
        assert_eq!(sched.resume(id), Status::Dead);
    }

    #[test]
    fn test_drop_with_live_coroutines() {
        let sched = Scheduler::open().unwrap();
        let dropped = Rc::new(Cell::new(false));

        struct Guard(Rc<Cell<bool>>);
        impl Drop for Guard {
            fn drop(&mut self) {
                self.0.set(true);
            }
        }

        let guard = Guard(dropped.clone());
        sched
            .spawn(move |_| {
                let _guard = guard;
            })
            .unwrap();
        let suspended = sched.spawn(|s| s.yield_now().unwrap()).unwrap();
        sched.resume(suspended);

        assert_eq!(sched.live_count(), 2);
        sched.close();
        assert!(dropped.get());
    }

    #[test]
    #[should_panic(expected = "outside of a running coroutine")]
    fn test_yield_on_main_flow_panics() {
        let sched = Scheduler::open().unwrap();
        let _ = sched.yield_now();
    }
}
