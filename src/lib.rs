//! Cooperative coroutines that share a single stack.
//!
//! A [`Scheduler`] owns one stack (1MB by default) and any number of
//! coroutines. Whichever coroutine is running uses the whole stack; when it
//! yields, only the bytes it actually has in use are copied out, and they are
//! copied back before it resumes. Thousands of coroutines therefore cost one
//! stack plus their individual live footprints.
//!
//! Scheduling is entirely up to the caller: nothing runs unless
//! [`Scheduler::resume`] is called, and a coroutine gives control back only
//! by calling [`Scheduler::yield_now`] or returning.
//!
//! ```no_run
//! use mycoroutine::Scheduler;
//!
//! fn count(s: &Scheduler, start: i32) {
//!     for i in 0..5 {
//!         println!("coroutine {:?} : {}", s.running(), start + i);
//!         s.yield_now().unwrap();
//!     }
//! }
//!
//! let sched = Scheduler::open()?;
//! let a = sched.spawn_with(count, 0)?;
//! let b = sched.spawn_with(count, 100)?;
//!
//! while sched.status(a).is_alive() && sched.status(b).is_alive() {
//!     sched.resume(a);
//!     sched.resume(b);
//! }
//! sched.close();
//! # Ok::<(), mycoroutine::Error>(())
//! ```
//!
//! Set `MYCOROUTINE_DEBUG=1` to trace scheduler events on stderr.

mod arch;
pub mod config;
mod context;
mod coroutine;
mod debug;
pub mod error;
mod scheduler;
mod slots;
mod stack;

pub use config::Config;
pub use coroutine::Status;
pub use error::{Error, Result};
pub use scheduler::Scheduler;

/// Coroutine id: the index of its slot in the scheduler.
pub type CoId = usize;
