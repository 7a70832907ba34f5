//! Recoverable failures of the scheduler.
//!
//! Misuse of the scheduler (resuming while a coroutine runs, yielding from
//! the main flow, ids past the table) panics instead; these are the
//! conditions a correct program can still run into.

use thiserror::Error;

/// An allocation or configuration failure.
#[derive(Debug, Error)]
pub enum Error {
    /// The allocator refused to provide memory.
    #[error("failed to allocate {size} bytes for the {what}")]
    Alloc { what: &'static str, size: usize },

    /// The configured shared stack cannot host a coroutine.
    #[error("shared stack of {size} bytes is below the {min} byte minimum")]
    StackTooSmall { size: usize, min: usize },

    /// The slot table needs at least one slot to double from.
    #[error("slot table needs at least one initial slot")]
    NoSlots,
}

impl Error {
    pub(crate) fn alloc(what: &'static str, size: usize) -> Self {
        Error::Alloc { what, size }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
