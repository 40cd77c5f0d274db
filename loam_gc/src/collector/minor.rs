//! Minor (nursery) collection: a Cheney scavenge with promotion.
//!
//! Survivors are evacuated from the active semi-space into the inactive
//! one, breadth-first, with the to-space prefix doubling as the work queue:
//!
//! ```text
//! ┌────────────────────────────────┬────────────────────────────────┐
//! │  FROM-SPACE                    │  TO-SPACE                      │
//! │  ┌─────┬─────┬─────┬───────┐   │  ┌─────┬─────┬──────────────┐  │
//! │  │  A  │  B  │  C  │ free  │   │  │  A' │  C' │    free      │  │
//! │  │alive│dead │alive│       │──▶│  │     │     │              │  │
//! │  └─────┴─────┴─────┴───────┘   │  └─────┴─────┴──────────────┘  │
//! │                                │   ▲scan       ▲alloc           │
//! └────────────────────────────────┴────────────────────────────────┘
//! ```
//!
//! An object whose generation counter wraps is promoted instead: it gets a
//! stand-alone tenure cell and goes onto the promoted work list, which is
//! drained between to-space scan steps so promoted objects also have their
//! children evacuated. Roots are the shadow stack plus the remember set.

use crate::heap::{Heap, Tenure};
use crate::object::ObjectRef;
use crate::roots::ShadowStack;

/// How a field scan treats the remember-set question.
///
/// `Plain` is the hot path for to-space objects: it never inspects remember
/// state and always answers "no". `TrackYoung` is used for tenured objects
/// (remember-set entries and fresh promotions) and reports whether any
/// rewritten field still lands in the nursery.
#[derive(Clone, Copy, PartialEq, Eq)]
enum ScanMode {
    Plain,
    TrackYoung,
}

/// What a scavenge did.
#[derive(Debug, Default)]
pub struct MinorOutcome {
    /// Distinct nursery objects reached (copied or promoted).
    pub live_objects: u64,
    /// Objects whose generation wrapped and were moved to tenure.
    pub promoted_objects: u64,
    /// Words moved to tenure.
    pub promoted_words: u64,
}

/// Run one scavenge. Root pointers on the shadow stack are rewritten in
/// place; the semi-spaces are flipped before returning.
pub(crate) fn collect(heap: &mut Heap, shadow: &mut ShadowStack) -> MinorOutcome {
    let mut scavenge = Scavenge {
        alloc_ptr: heap.nursery.inactive_base(),
        heap,
        outcome: MinorOutcome::default(),
    };

    // Phase 1: shadow-stack roots, newest frame first.
    for slot in shadow.slots_mut().iter_mut().rev() {
        if let Some(obj) = *slot {
            if scavenge.heap.in_nursery(obj.as_ptr()) {
                *slot = Some(scavenge.copy_and_forward(obj));
            }
        }
    }

    // Phase 2: remember-set roots. An entry whose object no longer points
    // at young data retires: remember bit cleared, slot nulled.
    for i in (0..scavenge.heap.remember_set.len()).rev() {
        if let Some(obj) = scavenge.heap.remember_set.get(i) {
            if !scavenge.scan_fields(obj, ScanMode::TrackYoung) {
                obj.clear_remembered();
                scavenge.heap.remember_set.clear_slot(i);
            }
        }
    }

    // Phase 3: drain promotions and walk the to-space prefix until both
    // queues are dry. Promoted objects can evacuate further children, so
    // the two interleave.
    let mut scan_ptr = scavenge.heap.nursery.inactive_base();
    scavenge.drain_promoted();
    while scan_ptr < scavenge.alloc_ptr {
        let obj = ObjectRef::from_raw(scan_ptr).expect("scan pointer is null");
        scavenge.scan_fields(obj, ScanMode::Plain);
        scan_ptr = unsafe { scan_ptr.add(obj.size_words()) };
        scavenge.drain_promoted();
    }

    // Phase 4: flip.
    let Scavenge {
        heap,
        alloc_ptr,
        outcome,
    } = scavenge;
    heap.nursery.flip(alloc_ptr);
    outcome
}

struct Scavenge<'h> {
    heap: &'h mut Heap,
    /// Evacuation frontier in to-space.
    alloc_ptr: *mut u64,
    outcome: MinorOutcome,
}

impl Scavenge<'_> {
    /// Evacuate one nursery object, or return where it already went.
    ///
    /// The generation counter is bumped on the from-space header before the
    /// copy so the destination carries the new age; a wrap means the object
    /// is promoted to its own tenure cell instead of to-space.
    fn copy_and_forward(&mut self, obj: ObjectRef) -> ObjectRef {
        debug_assert!(self.heap.in_nursery(obj.as_ptr()));
        if let Some(dest) = obj.forwarding() {
            return dest;
        }
        self.outcome.live_objects += 1;
        let words = obj.size_words();

        let dest = if obj.bump_generation() {
            self.heap.tenure.grow(words);
            let cell = Tenure::alloc_cell(words);
            let dest = ObjectRef::from_raw(cell.as_ptr()).expect("tenure cell is null");
            unsafe {
                std::ptr::copy_nonoverlapping(obj.as_ptr(), dest.as_ptr(), words);
            }
            self.heap.promoted.push(dest);
            self.outcome.promoted_objects += 1;
            self.outcome.promoted_words += words as u64;
            dest
        } else {
            // To-space overflow means live data exceeded a semi-space,
            // which a correctly rooted mutator cannot cause.
            debug_assert!(
                self.alloc_ptr as usize + words * std::mem::size_of::<u64>()
                    <= self.heap.nursery.inactive_end() as usize,
                "to-space overflow during scavenge"
            );
            let dest = ObjectRef::from_raw(self.alloc_ptr).expect("evacuation target is null");
            unsafe {
                std::ptr::copy_nonoverlapping(obj.as_ptr(), dest.as_ptr(), words);
                self.alloc_ptr = self.alloc_ptr.add(words);
            }
            dest
        };

        obj.set_forwarding(dest);
        dest
    }

    /// Rewrite every boxed field that points into the nursery with the
    /// copied/forwarded address. In `TrackYoung` mode, report whether any
    /// rewritten field still targets the nursery (a promoted holder can
    /// point at survivors staged in to-space).
    fn scan_fields(&mut self, obj: ObjectRef, mode: ScanMode) -> bool {
        if !obj.has_boxed_fields() {
            return false;
        }
        let mut references_young = false;
        for i in u32::from(obj.unbox_size())..obj.field_count() {
            let value = obj.boxed_field(i);
            if !value.is_ptr() {
                continue;
            }
            let ptr = value.as_ptr();
            if !self.heap.in_nursery(ptr) {
                continue;
            }
            let target = ObjectRef::from_raw(ptr).expect("nursery field is null");
            let dest = self.copy_and_forward(target);
            obj.set_boxed_field(i, dest.to_value());
            if mode == ScanMode::TrackYoung {
                references_young |= self.heap.in_nursery(dest.as_ptr());
            }
        }
        references_young
    }

    /// Link pending promotions onto the tenure list, scanning each one and
    /// enrolling it in the remember set if it still points at young data.
    fn drain_promoted(&mut self) {
        while let Some(obj) = self.heap.promoted.pop() {
            if self.scan_fields(obj, ScanMode::TrackYoung) {
                obj.set_remembered();
                self.heap.remember_set.push(obj);
            }
            self.heap.tenure.push(obj);
        }
    }
}
