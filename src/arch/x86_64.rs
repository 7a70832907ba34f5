//! x86_64 implementation of context switching

use std::arch::naked_asm;

use super::EntryFn;

/// Saved CPU context for context switching
///
/// On x86_64 System V ABI, these are the callee-saved registers
/// that must be preserved across function calls, plus the address
/// to continue at.
#[repr(C)]
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Stack pointer
    rsp: u64,
    /// Frame pointer
    rbp: u64,
    /// General purpose (callee-saved)
    rbx: u64,
    r12: u64,
    r13: u64,
    /// Entry function of a fresh context
    r14: u64,
    /// Argument of a fresh context
    r15: u64,
    /// Resume address
    rip: u64,
}

impl Context {
    /// Create a context that starts running `entry(arg)` on the stack
    /// whose highest address is `stack_top` (16-byte aligned).
    pub fn new(stack_top: usize, entry: EntryFn, arg: usize) -> Self {
        // `entry` is reached through a jump, not a call, so the stack has to
        // look like a return address was just pushed: RSP = 16n+8.
        Context {
            rsp: (stack_top - 8) as u64,
            r14: entry as *const () as usize as u64,
            r15: arg as u64,
            rip: start as *const () as usize as u64,
            ..Default::default()
        }
    }

    /// Stack pointer the context resumes with.
    pub fn stack_pointer(&self) -> usize {
        self.rsp as usize
    }
}

/// First code a fresh context runs: hand the argument over in RDI.
#[unsafe(naked)]
extern "C" fn start() {
    naked_asm!("mov rdi, r15", "jmp r14");
}

/// Stack pointer of the caller at the point of the call.
#[unsafe(naked)]
pub extern "C" fn stack_pointer() -> usize {
    naked_asm!("lea rax, [rsp + 8]", "ret");
}

/// Switch from one context to another
///
/// Saves the current CPU state into `old` and restores state from `new`.
/// This function returns when another context switches back to `old`.
///
/// The return address is popped into `old.rip`, so the saved RSP is the
/// caller's RSP and nothing below it is needed to come back.
///
/// # Safety
/// Both pointers must be valid. The `new` context must have been properly
/// initialized (either by a previous `context_switch` or by `Context::new`).
#[unsafe(naked)]
pub unsafe extern "C" fn context_switch(_old: *mut Context, _new: *const Context) {
    naked_asm!(
        "pop rax",
        // Save callee-saved registers to old context (rdi)
        "mov [rdi + 0x00], rsp",
        "mov [rdi + 0x08], rbp",
        "mov [rdi + 0x10], rbx",
        "mov [rdi + 0x18], r12",
        "mov [rdi + 0x20], r13",
        "mov [rdi + 0x28], r14",
        "mov [rdi + 0x30], r15",
        "mov [rdi + 0x38], rax",
        // Load callee-saved registers from new context (rsi)
        "mov rsp, [rsi + 0x00]",
        "mov rbp, [rsi + 0x08]",
        "mov rbx, [rsi + 0x10]",
        "mov r12, [rsi + 0x18]",
        "mov r13, [rsi + 0x20]",
        "mov r14, [rsi + 0x28]",
        "mov r15, [rsi + 0x30]",
        // For a fresh context: lands in `start`
        // For a suspended one: returns to where it called context_switch
        "jmp qword ptr [rsi + 0x38]",
    );
}
