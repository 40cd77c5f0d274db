//! Nursery (young generation) with bump-pointer allocation.
//!
//! The nursery is one contiguous block holding two equal semi-spaces.
//! Allocation bumps a pointer through the active semi-space:
//!
//! ```text
//! ┌──────────────────────┬──────────────────────┐
//! │  active semi-space   │  inactive semi-space │
//! │  [base .. top .. end]│  (copy target)       │
//! └──────────────────────┴──────────────────────┘
//! ```
//!
//! A scavenge evacuates survivors into the inactive space and then flips
//! the two identities. `contains` covers the whole block on purpose: while
//! a scavenge is in flight, survivors staged in to-space are still "in the
//! nursery" for the remember-set bookkeeping.

use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::ptr::NonNull;

const WORD_BYTES: usize = std::mem::size_of::<u64>();

/// Two-semi-space nursery. All sizes are in 64-bit words.
pub struct Nursery {
    /// Start of the whole 2x block.
    base: *mut u64,
    /// One past the end of the whole block.
    block_end: *mut u64,
    /// Words per semi-space.
    semi_words: usize,
    /// Base of the active semi-space.
    active: *mut u64,
    /// Base of the inactive semi-space (scavenge copy target).
    inactive: *mut u64,
    /// Bump pointer into the active semi-space.
    top: *mut u64,
    /// Allocation limit of the active semi-space.
    end: *mut u64,
}

impl Nursery {
    /// Allocate a nursery of `2 * semi_words` zeroed words.
    pub fn new(semi_words: usize) -> Self {
        let layout = Layout::from_size_align(2 * semi_words * WORD_BYTES, WORD_BYTES)
            .expect("invalid nursery layout");
        let base = unsafe { alloc_zeroed(layout) } as *mut u64;
        assert!(!base.is_null(), "failed to allocate {semi_words}-word semi-spaces");
        unsafe {
            Self {
                base,
                block_end: base.add(2 * semi_words),
                semi_words,
                active: base,
                inactive: base.add(semi_words),
                top: base,
                end: base.add(semi_words),
            }
        }
    }

    /// Bump-allocate `words` zeroed words in the active semi-space.
    ///
    /// Returns `None` when the request does not fit; the caller runs the
    /// collection slow path and retries.
    #[inline]
    pub fn alloc(&mut self, words: usize) -> Option<NonNull<u64>> {
        if words > self.free_words() {
            return None;
        }
        let ptr = self.top;
        self.top = unsafe { self.top.add(words) };
        // The active space is reused after flips, so every allocation is
        // null-filled before it is published: boxed fields must never be
        // observed holding stale words.
        unsafe {
            std::ptr::write_bytes(ptr, 0, words);
        }
        NonNull::new(ptr)
    }

    /// True if `ptr` lies anywhere in the nursery block (either semi-space).
    #[inline]
    pub fn contains(&self, ptr: *const u64) -> bool {
        let addr = ptr as usize;
        addr >= self.base as usize && addr < self.block_end as usize
    }

    /// True if `ptr` lies in the live prefix of the active semi-space.
    #[inline]
    pub(crate) fn in_active(&self, ptr: *const u64) -> bool {
        let addr = ptr as usize;
        addr >= self.active as usize && addr < self.top as usize
    }

    /// Base of the inactive semi-space, where a scavenge stages survivors.
    #[inline]
    pub(crate) fn inactive_base(&self) -> *mut u64 {
        self.inactive
    }

    /// One past the end of the inactive semi-space.
    #[inline]
    pub(crate) fn inactive_end(&self) -> *mut u64 {
        unsafe { self.inactive.add(self.semi_words) }
    }

    /// Swap the semi-space identities after a scavenge.
    ///
    /// `new_top` is the scavenger's allocation pointer: survivors occupy the
    /// contiguous prefix of the new active space up to it.
    pub(crate) fn flip(&mut self, new_top: *mut u64) {
        std::mem::swap(&mut self.active, &mut self.inactive);
        self.top = new_top;
        self.end = unsafe { self.active.add(self.semi_words) };
        debug_assert!(new_top >= self.active && new_top <= self.end);
    }

    /// Words per semi-space.
    #[inline]
    pub fn semi_words(&self) -> usize {
        self.semi_words
    }

    /// Words currently allocated in the active semi-space.
    #[inline]
    pub fn used_words(&self) -> usize {
        (self.top as usize - self.active as usize) / WORD_BYTES
    }

    /// Words still free in the active semi-space.
    #[inline]
    pub fn free_words(&self) -> usize {
        (self.end as usize - self.top as usize) / WORD_BYTES
    }

    /// True when a request of `words` fits without collecting.
    #[inline]
    pub fn fits(&self, words: usize) -> bool {
        words <= self.free_words()
    }
}

impl Drop for Nursery {
    fn drop(&mut self) {
        if !self.base.is_null() {
            let layout = Layout::from_size_align(2 * self.semi_words * WORD_BYTES, WORD_BYTES)
                .expect("invalid nursery layout");
            unsafe {
                dealloc(self.base as *mut u8, layout);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nursery_creation() {
        let nursery = Nursery::new(1024);
        assert_eq!(nursery.semi_words(), 1024);
        assert_eq!(nursery.used_words(), 0);
        assert_eq!(nursery.free_words(), 1024);
    }

    #[test]
    fn test_bump_allocation_is_contiguous() {
        let mut nursery = Nursery::new(1024);
        let a = nursery.alloc(8).expect("alloc failed");
        let b = nursery.alloc(8).expect("alloc failed");
        assert_eq!(unsafe { a.as_ptr().add(8) }, b.as_ptr());
        assert_eq!(nursery.used_words(), 16);
    }

    #[test]
    fn test_allocation_is_zeroed() {
        let mut nursery = Nursery::new(64);
        let ptr = nursery.alloc(16).expect("alloc failed");
        for i in 0..16 {
            assert_eq!(unsafe { ptr.as_ptr().add(i).read() }, 0);
        }
    }

    #[test]
    fn test_exhaustion_returns_none() {
        let mut nursery = Nursery::new(16);
        assert!(nursery.alloc(16).is_some());
        assert!(nursery.alloc(1).is_none());
        assert!(!nursery.fits(1));
    }

    #[test]
    fn test_contains_covers_both_semi_spaces() {
        let mut nursery = Nursery::new(32);
        let ptr = nursery.alloc(4).expect("alloc failed");
        assert!(nursery.contains(ptr.as_ptr()));
        assert!(nursery.contains(nursery.inactive_base()));
        assert!(!nursery.contains(std::ptr::null()));
        let outside = 0x10usize as *const u64;
        assert!(!nursery.contains(outside));
    }

    #[test]
    fn test_flip_swaps_spaces() {
        let mut nursery = Nursery::new(32);
        let _ = nursery.alloc(8);
        let staged = nursery.inactive_base();
        let new_top = unsafe { staged.add(4) };
        nursery.flip(new_top);
        assert_eq!(nursery.used_words(), 4);
        assert_eq!(nursery.free_words(), 28);
        // the next allocation lands after the survivors
        let next = nursery.alloc(2).expect("alloc failed");
        assert_eq!(next.as_ptr(), new_top);
    }
}
