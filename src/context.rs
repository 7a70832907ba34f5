//! Execution contexts: capture "resume here" and jump between captures.
//!
//! This is the only surface the scheduler uses to move between flows of
//! control:
//! - `Context::new`: a context that will start an entry function on a stack
//! - `switch`: save the running flow into one context and resume another
//! - `stack_pointer`: where the caller's stack currently ends

use crate::arch;

pub(crate) use crate::arch::Context;

/// Save the current flow into `from` and continue the flow in `to`.
///
/// Returns once some other flow switches back into `from`.
///
/// # Safety
/// `from` must be writable and `to` must hold a context produced by
/// `Context::new` or by an earlier `switch`. The stack `to` resumes on must
/// contain exactly the bytes it held when `to` was captured.
#[inline(always)]
pub(crate) unsafe fn switch(from: *mut Context, to: *const Context) {
    unsafe { arch::context_switch(from, to) }
}

/// Lowest live address of the calling function's stack frame.
///
/// Everything from here up to the top of the stack is in use by the caller
/// and its callers.
#[inline(always)]
pub(crate) fn stack_pointer() -> usize {
    arch::stack_pointer()
}
