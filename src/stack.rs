//! Stack memory.
//!
//! - `SharedStack`: the one region every coroutine body executes on
//! - `SavedStack`: a coroutine's copy of its live extent while it is not running

use std::alloc::{self, Layout};
#[cfg(test)]
use std::cell::Cell;
use std::mem::MaybeUninit;
use std::ptr::{self, NonNull};

use crate::error::{Error, Result};

/// The physical stack shared by all coroutines of a scheduler.
///
/// Stacks grow downward: a coroutine starts at `top()` and its live bytes
/// are always `[sp, top())`.
pub(crate) struct SharedStack {
    /// Lowest address
    base: NonNull<u8>,
    /// Allocated bytes
    size: usize,
}

impl SharedStack {
    /// Alignment required by both supported ABIs
    const ALIGNMENT: usize = 16;

    /// Allocate a stack of `size` bytes, rounded up to the alignment.
    pub(crate) fn new(size: usize) -> Result<Self> {
        let size = size
            .checked_next_multiple_of(Self::ALIGNMENT)
            .ok_or(Error::alloc("shared stack", size))?;
        let layout = Layout::from_size_align(size, Self::ALIGNMENT)
            .map_err(|_| Error::alloc("shared stack", size))?;

        // Zeroed so the first capture never copies stale heap contents.
        let base = unsafe { alloc::alloc_zeroed(layout) };
        let base = NonNull::new(base).ok_or(Error::alloc("shared stack", size))?;

        Ok(Self { base, size })
    }

    #[inline]
    pub(crate) fn size(&self) -> usize {
        self.size
    }

    /// Lowest usable address.
    #[inline]
    pub(crate) fn bottom(&self) -> usize {
        self.base.as_ptr() as usize
    }

    /// One past the highest address; 16-byte aligned.
    #[inline]
    pub(crate) fn top(&self) -> usize {
        self.bottom() + self.size
    }

    /// Whether `sp` lies on this stack.
    #[inline]
    pub(crate) fn contains(&self, sp: usize) -> bool {
        sp > self.bottom() && sp <= self.top()
    }
}

impl Drop for SharedStack {
    fn drop(&mut self) {
        if let Ok(layout) = Layout::from_size_align(self.size, Self::ALIGNMENT) {
            unsafe {
                alloc::dealloc(self.base.as_ptr(), layout);
            }
        }
    }
}

#[cfg(test)]
thread_local! {
    /// Makes the next capture fail as if the allocator had refused.
    pub(crate) static FAIL_NEXT_CAPTURE: Cell<bool> = const { Cell::new(false) };
}

/// Bytes a suspended coroutine had live on the shared stack.
///
/// The length is the exact footprint of the last capture. Capacity grows
/// geometrically and is never given back, so a coroutine that yields at a
/// similar depth each time allocates only once.
#[derive(Default)]
pub(crate) struct SavedStack {
    // Stack frames contain padding, so the bytes are not guaranteed to be
    // initialized.
    bytes: Vec<MaybeUninit<u8>>,
}

impl SavedStack {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Bytes held by the last capture.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.bytes.capacity()
    }

    /// Copy `[low, top)` into the buffer.
    ///
    /// On allocation failure the previous capture is discarded and the
    /// buffer is left empty.
    ///
    /// # Safety
    /// The range must be readable.
    pub(crate) unsafe fn capture(&mut self, low: usize, top: usize) -> Result<()> {
        let len = top - low;
        self.bytes.clear();
        #[cfg(test)]
        if FAIL_NEXT_CAPTURE.with(|fail| fail.replace(false)) {
            return Err(Error::alloc("saved stack", len));
        }
        self.bytes
            .try_reserve(len)
            .map_err(|_| Error::alloc("saved stack", len))?;

        unsafe {
            ptr::copy_nonoverlapping(
                low as *const MaybeUninit<u8>,
                self.bytes.as_mut_ptr(),
                len,
            );
            self.bytes.set_len(len);
        }
        Ok(())
    }

    /// Write the captured bytes back so they end exactly at `top`.
    ///
    /// # Safety
    /// `[top - len, top)` must be writable and not in use by the caller.
    pub(crate) unsafe fn restore(&self, top: usize) {
        let len = self.bytes.len();
        unsafe {
            ptr::copy_nonoverlapping(
                self.bytes.as_ptr(),
                (top - len) as *mut MaybeUninit<u8>,
                len,
            );
        }
    }
}
