//! Platform-specific register files and switch routines.
//!
//! Each backend exposes the same surface: `Context`, `context_switch` and
//! `stack_pointer`.

/// Function a fresh context starts in. It receives the argument bound at
/// creation and must never return.
pub type EntryFn = extern "C" fn(usize) -> !;

#[cfg(target_arch = "x86_64")]
mod x86_64;
#[cfg(target_arch = "x86_64")]
pub use x86_64::*;

#[cfg(target_arch = "aarch64")]
mod aarch64;
#[cfg(target_arch = "aarch64")]
pub use aarch64::*;

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
compile_error!("mycoroutine supports only x86_64 and aarch64");
