//! Write barrier for generational correctness.
//!
//! Without a barrier, a minor collection would have to scan the whole old
//! generation to find references into the nursery. Instead, every pointer
//! store into a scanned field reports the holder here; tenured holders that
//! gain a young reference are enrolled in the remember set, which the
//! scavenger then treats as additional roots.
//!
//! The barrier is pointer-based rather than card-based: it records the
//! holder object itself, deduplicated lazily through the header remember
//! bit. The fast path for stores that need no tracking is a couple of bit
//! tests on the two headers involved.

mod remember_set;

pub use remember_set::RememberSet;

use crate::heap::Heap;
use crate::object::ObjectRef;
use loam_core::Value;

/// Record a pointer store of `value` into a scanned field of `holder`.
///
/// Enrolls `holder` in the remember set when all of the following hold:
/// the stored value is a non-null pointer, the holder is tenured with a
/// clear remember bit, and the target is young (generation > 0). Every
/// other store is silent.
///
/// Call this *before* the store itself; the mark phase of a major
/// collection reuses it on edges it visits so remember semantics survive
/// the phase transition.
#[inline]
pub(crate) fn record_store(heap: &mut Heap, holder: ObjectRef, value: Value) {
    if let Some(target) = ObjectRef::from_value(value) {
        if holder.can_remember() && target.generation() > 0 {
            holder.set_remembered();
            heap.remember_set.push(holder);
        }
    }
}
