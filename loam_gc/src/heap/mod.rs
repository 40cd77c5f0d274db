//! Heap memory management.
//!
//! The heap is divided into two generations plus the bookkeeping that links
//! them:
//!
//! - Nursery: two semi-spaces with bump-pointer allocation and copying
//!   collection.
//! - Tenure: a sweep list of individually allocated cells for promoted and
//!   directly tenured objects.
//! - Remember set: the log of tenured objects that may point back into the
//!   nursery, fed by the write barrier.
//! - Promoted work list: objects evacuated straight to tenure during the
//!   current scavenge, pending a field scan and list linkage.

mod nursery;
mod tenure;

pub use nursery::Nursery;
pub use tenure::{Tenure, TenureIter};

use crate::barrier::RememberSet;
use crate::object::{ObjectKind, ObjectRef, HEADER_WORDS};
use smallvec::SmallVec;
use std::ptr::NonNull;

/// All heap spaces and the cross-generation bookkeeping.
pub struct Heap {
    pub(crate) nursery: Nursery,
    pub(crate) tenure: Tenure,
    pub(crate) remember_set: RememberSet,
    /// Objects promoted by the in-flight scavenge, not yet scanned or
    /// linked onto the tenure list. Almost always a handful per cycle.
    pub(crate) promoted: SmallVec<[ObjectRef; 32]>,
}

impl Heap {
    /// Create a heap with the given per-semi-space size. The major-GC
    /// threshold starts at twice the semi-space size.
    pub(crate) fn new(semi_words: usize) -> Self {
        Self {
            nursery: Nursery::new(semi_words),
            tenure: Tenure::new(semi_words * 2),
            remember_set: RememberSet::new(semi_words / 64),
            promoted: SmallVec::new(),
        }
    }

    /// True if `ptr` lies in the nursery block.
    #[inline]
    pub fn in_nursery(&self, ptr: *const u64) -> bool {
        self.nursery.contains(ptr)
    }

    /// Bump-allocate a young object. `None` means the active semi-space is
    /// full and the caller must run the collection slow path.
    #[inline]
    pub(crate) fn alloc_young(
        &mut self,
        kind: ObjectKind,
        field_count: u32,
        unbox_size: u8,
        dispatch: u8,
    ) -> Option<ObjectRef> {
        let words = HEADER_WORDS + field_count as usize;
        let ptr = self.nursery.alloc(words)?;
        let obj = ObjectRef::from_raw(ptr.as_ptr()).expect("nursery returned null");
        obj.init_header(kind, field_count, unbox_size, dispatch, false);
        Some(obj)
    }

    /// Allocate directly in tenure: a stand-alone cell, generation 0,
    /// linked onto the sweep list.
    pub(crate) fn alloc_tenured(
        &mut self,
        kind: ObjectKind,
        field_count: u32,
        unbox_size: u8,
        dispatch: u8,
    ) -> ObjectRef {
        let words = HEADER_WORDS + field_count as usize;
        let cell: NonNull<u64> = Tenure::alloc_cell(words);
        let obj = ObjectRef::from_raw(cell.as_ptr()).expect("tenure cell is null");
        obj.init_header(kind, field_count, unbox_size, dispatch, true);
        self.tenure.push(obj);
        self.tenure.grow(words);
        obj
    }

    /// The nursery.
    pub fn nursery(&self) -> &Nursery {
        &self.nursery
    }

    /// The tenure space.
    pub fn tenure(&self) -> &Tenure {
        &self.tenure
    }

    /// The remember set.
    pub fn remember_set(&self) -> &RememberSet {
        &self.remember_set
    }
}
