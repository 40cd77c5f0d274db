//! Tenure space (old generation): a singly linked list of promoted cells.
//!
//! Tenured objects live in individually allocated cells threaded through
//! the header link word. There is no compaction; the sweep phase of a major
//! collection unlinks and frees dead cells in place. The footprint is
//! tracked in 64-bit words and compared against a dynamic threshold to
//! decide when a major collection is due.

use crate::object::ObjectRef;
use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::ptr::NonNull;

const WORD_BYTES: usize = std::mem::size_of::<u64>();

/// The old generation: sweep list head, footprint, and major-GC threshold.
pub struct Tenure {
    head: Option<ObjectRef>,
    size_words: usize,
    limit_words: usize,
}

impl Tenure {
    pub(crate) fn new(limit_words: usize) -> Self {
        Self {
            head: None,
            size_words: 0,
            limit_words,
        }
    }

    /// Allocate a zeroed stand-alone cell of `words` words.
    ///
    /// The caller initializes the header and links the cell onto the list;
    /// zeroed storage means the boxed body already holds the null pattern.
    pub(crate) fn alloc_cell(words: usize) -> NonNull<u64> {
        let layout = Self::cell_layout(words);
        let ptr = unsafe { alloc_zeroed(layout) } as *mut u64;
        NonNull::new(ptr).expect("failed to allocate tenure cell")
    }

    /// Release a swept cell.
    pub(crate) fn free_cell(obj: ObjectRef) {
        let layout = Self::cell_layout(obj.size_words());
        unsafe {
            dealloc(obj.as_ptr() as *mut u8, layout);
        }
    }

    fn cell_layout(words: usize) -> Layout {
        Layout::from_size_align(words * WORD_BYTES, WORD_BYTES).expect("invalid cell layout")
    }

    /// Link an object at the head of the sweep list.
    pub(crate) fn push(&mut self, obj: ObjectRef) {
        obj.set_next_object(self.head);
        self.head = Some(obj);
    }

    /// Grow the tracked footprint (promotion or direct tenure allocation).
    pub(crate) fn grow(&mut self, words: usize) {
        self.size_words += words;
    }

    /// Shrink the tracked footprint (sweep).
    pub(crate) fn shrink(&mut self, words: usize) {
        debug_assert!(words <= self.size_words);
        self.size_words -= words;
    }

    /// Head of the sweep list.
    #[inline]
    pub fn head(&self) -> Option<ObjectRef> {
        self.head
    }

    pub(crate) fn set_head(&mut self, head: Option<ObjectRef>) {
        self.head = head;
    }

    /// Current footprint in words.
    #[inline]
    pub fn size_words(&self) -> usize {
        self.size_words
    }

    /// Major-collection threshold in words.
    #[inline]
    pub fn limit_words(&self) -> usize {
        self.limit_words
    }

    /// True when the footprint has crossed the threshold and the next
    /// allocation slow path should run a major collection first.
    #[inline]
    pub fn should_collect(&self) -> bool {
        self.size_words >= self.limit_words
    }

    /// Threshold hysteresis, applied right after a major collection: if the
    /// surviving footprint still exceeds 70% of the threshold, raise the
    /// threshold to 1.5x the footprint so back-to-back majors cannot thrash.
    pub(crate) fn rebalance_limit(&mut self) {
        if self.limit_words * 7 / 10 < self.size_words {
            self.limit_words = self.size_words * 3 / 2;
        }
    }

    /// Iterate the sweep list from the head.
    pub fn iter(&self) -> TenureIter {
        TenureIter { next: self.head }
    }

    /// Number of objects on the sweep list.
    pub fn object_count(&self) -> usize {
        self.iter().count()
    }
}

impl Drop for Tenure {
    fn drop(&mut self) {
        // Cells are normally released by the sweep; whatever survives until
        // teardown is released here, without running cleanup hooks.
        let mut cur = self.head.take();
        while let Some(obj) = cur {
            cur = obj.next_object();
            Self::free_cell(obj);
        }
    }
}

/// Iterator over the tenure sweep list.
pub struct TenureIter {
    next: Option<ObjectRef>,
}

impl Iterator for TenureIter {
    type Item = ObjectRef;

    fn next(&mut self) -> Option<ObjectRef> {
        let obj = self.next?;
        self.next = obj.next_object();
        Some(obj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{ObjectKind, HEADER_WORDS};

    fn tenured_cell(fields: u32) -> ObjectRef {
        let cell = Tenure::alloc_cell(HEADER_WORDS + fields as usize);
        let obj = ObjectRef::from_raw(cell.as_ptr()).unwrap();
        obj.init_header(ObjectKind::Normal, fields, 0, 0, true);
        obj
    }

    #[test]
    fn test_push_links_at_head() {
        let mut tenure = Tenure::new(1024);
        let a = tenured_cell(1);
        let b = tenured_cell(1);
        tenure.push(a);
        tenure.push(b);
        let order: Vec<ObjectRef> = tenure.iter().collect();
        assert_eq!(order, vec![b, a]);
        assert_eq!(tenure.object_count(), 2);
    }

    #[test]
    fn test_footprint_tracking() {
        let mut tenure = Tenure::new(10);
        assert!(!tenure.should_collect());
        tenure.grow(10);
        assert!(tenure.should_collect());
        tenure.shrink(4);
        assert_eq!(tenure.size_words(), 6);
        assert!(!tenure.should_collect());
    }

    #[test]
    fn test_rebalance_raises_limit_when_crowded() {
        let mut tenure = Tenure::new(100);
        tenure.grow(80); // above 70% of the limit
        tenure.rebalance_limit();
        assert_eq!(tenure.limit_words(), 120);
    }

    #[test]
    fn test_rebalance_keeps_limit_when_sparse() {
        let mut tenure = Tenure::new(100);
        tenure.grow(50); // below 70%
        tenure.rebalance_limit();
        assert_eq!(tenure.limit_words(), 100);
    }

    #[test]
    fn test_cells_are_zeroed() {
        let cell = Tenure::alloc_cell(8);
        for i in 0..8 {
            assert_eq!(unsafe { cell.as_ptr().add(i).read() }, 0);
        }
        let obj = ObjectRef::from_raw(cell.as_ptr()).unwrap();
        obj.init_header(ObjectKind::BoxArray, 6, 0, 0, true);
        Tenure::free_cell(obj);
    }
}
