//! Scheduler configuration.

use crate::error::{Error, Result};

/// Size of the shared stack (1MB)
pub const STACK_SIZE: usize = 1024 * 1024;

/// Smallest shared stack a scheduler accepts (16KB)
pub const MIN_STACK_SIZE: usize = 16 * 1024;

/// Slots in a fresh table
pub const INITIAL_SLOTS: usize = 16;

/// Scheduler configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Bytes of the one stack every coroutine runs on
    pub stack_size: usize,
    /// Slots allocated up front; the table doubles from here
    pub initial_slots: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stack_size: STACK_SIZE,
            initial_slots: INITIAL_SLOTS,
        }
    }
}

impl Config {
    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = bytes;
        self
    }

    pub fn initial_slots(mut self, slots: usize) -> Self {
        self.initial_slots = slots;
        self
    }

    /// Reject settings the scheduler cannot run with.
    ///
    /// The stack size is rounded up to 16 bytes by the stack itself, so only
    /// the lower bounds are checked here.
    pub fn validate(&self) -> Result<()> {
        if self.stack_size < MIN_STACK_SIZE {
            return Err(Error::StackTooSmall {
                size: self.stack_size,
                min: MIN_STACK_SIZE,
            });
        }
        if self.initial_slots == 0 {
            return Err(Error::NoSlots);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.stack_size, 1024 * 1024);
        assert_eq!(config.initial_slots, 16);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_small_stack_rejected() {
        let err = Config::default().stack_size(4096).validate().unwrap_err();
        assert!(matches!(
            err,
            Error::StackTooSmall {
                size: 4096,
                min: MIN_STACK_SIZE
            }
        ));
    }

    #[test]
    fn test_zero_slots_rejected() {
        let err = Config::default().initial_slots(0).validate().unwrap_err();
        assert!(matches!(err, Error::NoSlots));
    }
}
