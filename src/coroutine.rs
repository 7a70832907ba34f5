//! A single coroutine: its body, lifecycle state and persisted stack.

use std::fmt;

use crate::context::Context;
use crate::scheduler::Scheduler;
use crate::stack::SavedStack;

/// Body of a coroutine. It receives the scheduler it runs on, which it uses
/// to yield and to query state.
pub(crate) type Entry = Box<dyn FnOnce(&Scheduler) + 'static>;

/// Coroutine lifecycle state
///
/// The discriminants are the numeric codes callers may already rely on.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Finished, or the slot was never used
    Dead = 0,
    /// Spawned, never resumed
    Ready = 1,
    /// Executing on the shared stack
    Running = 2,
    /// Yielded; its stack lives in its saved buffer
    Suspended = 3,
}

impl Status {
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Anything but `Dead`.
    pub fn is_alive(self) -> bool {
        self != Status::Dead
    }
}

impl TryFrom<u8> for Status {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, u8> {
        match code {
            0 => Ok(Status::Dead),
            1 => Ok(Status::Ready),
            2 => Ok(Status::Running),
            3 => Ok(Status::Suspended),
            other => Err(other),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Status::Dead => "dead",
            Status::Ready => "ready",
            Status::Running => "running",
            Status::Suspended => "suspended",
        })
    }
}

/// A coroutine owned by a scheduler slot.
///
/// Dead coroutines are never stored: finishing removes the slot.
pub(crate) struct Coroutine {
    /// Taken when the coroutine first runs
    pub entry: Option<Entry>,
    pub status: Status,
    /// Live stack extent captured at the last yield
    pub saved: SavedStack,
    /// Where to continue; meaningful once the coroutine has run
    pub context: Context,
}

impl Coroutine {
    pub fn new(entry: Entry) -> Self {
        Coroutine {
            entry: Some(entry),
            status: Status::Ready,
            saved: SavedStack::new(),
            context: Context::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        for status in [Status::Dead, Status::Ready, Status::Running, Status::Suspended] {
            assert_eq!(Status::try_from(status.code()), Ok(status));
        }
        assert_eq!(Status::try_from(4), Err(4));
        assert_eq!(Status::Dead.code(), 0);
        assert_eq!(Status::Suspended.code(), 3);
    }

    #[test]
    fn test_new_coroutine_is_ready() {
        let co = Coroutine::new(Box::new(|_: &Scheduler| {}));
        assert_eq!(co.status, Status::Ready);
        assert!(co.entry.is_some());
        assert_eq!(co.saved.len(), 0);
        assert!(co.status.is_alive());
        assert!(!Status::Dead.is_alive());
    }
}
