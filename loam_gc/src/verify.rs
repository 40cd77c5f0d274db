//! Debug heap verifier.
//!
//! Walks the reachable graph from the shadow stack after a collection and
//! asserts the structural invariants the collectors rely on:
//!
//! - every reachable pointer names either a live nursery object (active
//!   semi-space, null forwarding pointer) or a member of the tenure list;
//! - no reachable boxed field points into the inactive semi-space;
//! - generations agree with location (0 exactly for tenured objects).
//!
//! Enabled through `GcConfig::verify_heap`; the walk is linear in live data
//! and meant for debug builds and tests.

use crate::object::ObjectRef;
use crate::Gc;
use rustc_hash::FxHashSet;

pub(crate) fn verify_heap(gc: &Gc) {
    let tenured: FxHashSet<usize> = gc.tenure().iter().map(|obj| obj.addr()).collect();
    let mut visited: FxHashSet<usize> = FxHashSet::default();
    let mut pending: Vec<ObjectRef> = gc.roots().slots().iter().flatten().copied().collect();

    while let Some(obj) = pending.pop() {
        if !visited.insert(obj.addr()) {
            continue;
        }

        if gc.nursery().contains(obj.as_ptr()) {
            assert!(
                gc.nursery().in_active(obj.as_ptr()),
                "reachable object {:#x} sits in the inactive semi-space",
                obj.addr()
            );
            assert!(
                obj.forwarding().is_none(),
                "reachable nursery object {:#x} carries a forwarding pointer",
                obj.addr()
            );
            assert!(
                obj.generation() > 0,
                "nursery object {:#x} has a tenured generation",
                obj.addr()
            );
        } else {
            assert!(
                tenured.contains(&obj.addr()),
                "reachable object {:#x} is outside the nursery but not on the tenure list",
                obj.addr()
            );
            assert_eq!(
                obj.generation(),
                0,
                "tenure-list object {:#x} has a young generation",
                obj.addr()
            );
        }

        if obj.has_boxed_fields() {
            for i in u32::from(obj.unbox_size())..obj.field_count() {
                if let Some(target) = ObjectRef::from_value(obj.boxed_field(i)) {
                    pending.push(target);
                }
            }
        }
    }
}
