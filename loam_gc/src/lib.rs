//! Loam Garbage Collector
//!
//! A generational, moving garbage collector for a managed heap of
//! NaN-boxed 64-bit words.
//!
//! # Architecture
//!
//! The heap has two generations:
//!
//! - **Nursery (Young Generation)**: two equal semi-spaces with
//!   bump-pointer allocation and Cheney-style copying collection. Most
//!   objects die here, so a scavenge touches only live data.
//!
//! - **Tenure (Old Generation)**: a singly linked list of individually
//!   allocated cells, collected by mark-sweep when its footprint crosses a
//!   dynamic threshold. Objects move here after their 2-bit generation
//!   counter wraps, or by direct tenure allocation.
//!
//! Roots come exclusively from the mutator-maintained shadow stack. A
//! pointer-based write barrier logs tenured objects that receive young
//! references into the remember set, which scavenges treat as extra roots.
//!
//! # Object model
//!
//! Every object is two header words plus `field_count` body words. Body
//! words are either raw (the unbox prefix, or all of an unbox array) or
//! boxed [`Value`]s. Boxed pointer stores MUST go through
//! [`Gc::write_field`] so the barrier sees them; raw fields are invisible
//! to the collector.
//!
//! # Usage
//!
//! ```ignore
//! use loam_gc::{Gc, GcConfig};
//!
//! let mut gc = Gc::new(GcConfig::default())?;
//! let arr = gc.alloc_boxed_array(4)?;
//! gc.roots_mut().expand(1);
//! gc.roots_mut().set(0, Some(arr));   // root it across allocations
//! let payload = gc.alloc_unboxed_array(16)?;
//! let arr = gc.roots().get(0).unwrap();  // may have moved
//! gc.write_field(arr, 0, payload.to_value());
//! ```
//!
//! # Safety
//!
//! The collector is single-threaded and non-reentrant. Allocation is the
//! only implicit safepoint; any pointer held across one must be reachable
//! from the shadow stack or it dangles after the next scavenge.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod barrier;
pub mod collector;
pub mod config;
pub mod control;
pub mod descriptor;
pub mod heap;
pub mod object;
pub mod roots;
pub mod stats;

mod verify;

pub use config::{ConfigError, GcConfig};
pub use descriptor::{CleanupFn, TypeDescriptor};
pub use loam_core::Value;
pub use object::{ObjectKind, ObjectRef, HEADER_WORDS, MAX_DISPATCH, MAX_UNBOX_SIZE};
pub use roots::ShadowStack;
pub use stats::GcStats;

use descriptor::DescriptorTable;
use heap::{Heap, Nursery, Tenure};
use thiserror::Error;

/// Raised when three consecutive scavenges (plus any indicated major
/// collection) cannot satisfy an allocation.
///
/// Fatal to the request, not to the heap: the caller may drop roots and
/// retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("managed heap exhausted after repeated scavenges")]
pub struct MemoryExhausted;

/// Scavenge attempts before an allocation gives up. One scavenge can leave
/// the active space full of fresh promotions; a second drains the flipped
/// space; three bounds the retry without degrading into mark-sweep.
const MAX_SCAVENGE_ATTEMPTS: u32 = 3;

/// The collector: all spaces, the root stack, and the collection entry
/// points, owned as one unit with an explicit lifecycle.
///
/// Construct one per mutator (tests build and drop one per case); embedding
/// hosts that want a flat functional surface use [`control`] instead.
pub struct Gc {
    config: GcConfig,
    heap: Heap,
    shadow: ShadowStack,
    descriptors: DescriptorTable,
    stats: GcStats,
    /// Mark value the next major collection will use; alternates 1 and 3.
    current_mark: u8,
}

// Safety: Gc exclusively owns every pointer it contains (semi-spaces,
// tenure cells, root slots). Handing the whole collector to another thread
// is sound; concurrent use is not, and &Gc access stays on one thread.
unsafe impl Send for Gc {}

impl Gc {
    /// Create a collector with the given configuration.
    pub fn new(config: GcConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            heap: Heap::new(config.semi_space_words),
            shadow: ShadowStack::new(config.shadow_stack_capacity),
            descriptors: DescriptorTable::new(),
            stats: GcStats::default(),
            current_mark: 1,
            config,
        })
    }

    /// Create a collector with the default configuration.
    pub fn with_defaults() -> Self {
        Self::new(GcConfig::default()).expect("default configuration is valid")
    }

    // =========================================================================
    // Allocation
    // =========================================================================

    /// Allocate a normal object in the nursery: `unbox_size` raw words
    /// followed by boxed fields, all initialized to null.
    pub fn alloc_object(
        &mut self,
        field_count: u32,
        unbox_size: u8,
    ) -> Result<ObjectRef, MemoryExhausted> {
        self.alloc(ObjectKind::Normal, field_count, unbox_size, 0)
    }

    /// Allocate a normal object carrying a dispatch index that selects its
    /// registered [`TypeDescriptor`].
    pub fn alloc_object_with_descriptor(
        &mut self,
        field_count: u32,
        unbox_size: u8,
        dispatch: u8,
    ) -> Result<ObjectRef, MemoryExhausted> {
        self.alloc(ObjectKind::Normal, field_count, unbox_size, dispatch)
    }

    /// Allocate an array of boxed values in the nursery.
    pub fn alloc_boxed_array(&mut self, len: u32) -> Result<ObjectRef, MemoryExhausted> {
        self.alloc(ObjectKind::BoxArray, len, 0, 0)
    }

    /// Allocate an array of raw 64-bit payload in the nursery. Its body is
    /// never scanned.
    pub fn alloc_unboxed_array(&mut self, len: u32) -> Result<ObjectRef, MemoryExhausted> {
        self.alloc(ObjectKind::UnboxArray, len, 0, 0)
    }

    /// Allocate a normal object directly in tenure: generation 0, linked
    /// onto the sweep list. Objects that need a cleanup hook must live
    /// here, since hooks only run at sweep time.
    pub fn alloc_object_in_tenure(&mut self, field_count: u32, unbox_size: u8) -> ObjectRef {
        self.alloc_tenured(ObjectKind::Normal, field_count, unbox_size, 0)
    }

    /// Allocate a normal object in tenure with a dispatch index.
    pub fn alloc_object_in_tenure_with_descriptor(
        &mut self,
        field_count: u32,
        unbox_size: u8,
        dispatch: u8,
    ) -> ObjectRef {
        self.alloc_tenured(ObjectKind::Normal, field_count, unbox_size, dispatch)
    }

    /// Allocate a boxed array directly in tenure.
    pub fn alloc_boxed_array_in_tenure(&mut self, len: u32) -> ObjectRef {
        self.alloc_tenured(ObjectKind::BoxArray, len, 0, 0)
    }

    /// Allocate an unboxed array directly in tenure.
    pub fn alloc_unboxed_array_in_tenure(&mut self, len: u32) -> ObjectRef {
        self.alloc_tenured(ObjectKind::UnboxArray, len, 0, 0)
    }

    #[inline]
    fn alloc(
        &mut self,
        kind: ObjectKind,
        field_count: u32,
        unbox_size: u8,
        dispatch: u8,
    ) -> Result<ObjectRef, MemoryExhausted> {
        if let Some(obj) = self.heap.alloc_young(kind, field_count, unbox_size, dispatch) {
            self.stats.record_allocation(obj.size_words());
            return Ok(obj);
        }
        self.alloc_slow(kind, field_count, unbox_size, dispatch)
    }

    /// Collection slow path: a major collection if the tenure threshold is
    /// crossed, then up to three scavenges, taking the first that makes the
    /// request fit.
    #[cold]
    fn alloc_slow(
        &mut self,
        kind: ObjectKind,
        field_count: u32,
        unbox_size: u8,
        dispatch: u8,
    ) -> Result<ObjectRef, MemoryExhausted> {
        self.collect_major_if_needed();
        let words = HEADER_WORDS + field_count as usize;
        for _ in 0..MAX_SCAVENGE_ATTEMPTS {
            self.collect_minor();
            if self.heap.nursery.fits(words) {
                let obj = self
                    .heap
                    .alloc_young(kind, field_count, unbox_size, dispatch)
                    .expect("nursery must satisfy a fitting request");
                self.stats.record_allocation(words);
                return Ok(obj);
            }
        }
        if self.config.debug_level >= 1 {
            eprintln!("loam: memory exhausted");
        }
        Err(MemoryExhausted)
    }

    fn alloc_tenured(
        &mut self,
        kind: ObjectKind,
        field_count: u32,
        unbox_size: u8,
        dispatch: u8,
    ) -> ObjectRef {
        let obj = self.heap.alloc_tenured(kind, field_count, unbox_size, dispatch);
        self.stats.record_allocation(obj.size_words());
        obj
    }

    // =========================================================================
    // Field access
    // =========================================================================

    /// Store into a boxed field, running the write barrier first.
    ///
    /// Every pointer store into a scanned field must come through here;
    /// storing around the barrier breaks the remember-set sufficiency the
    /// scavenger depends on.
    #[inline]
    pub fn write_field(&mut self, obj: ObjectRef, index: u32, value: Value) {
        barrier::record_store(&mut self.heap, obj, value);
        obj.set_boxed_field(index, value);
    }

    /// Read a boxed field.
    #[inline]
    pub fn read_field(&self, obj: ObjectRef, index: u32) -> Value {
        obj.boxed_field(index)
    }

    // =========================================================================
    // Collection
    // =========================================================================

    /// Run a scavenge; returns the number of live nursery objects.
    pub fn collect_minor(&mut self) -> u64 {
        if self.config.debug_level >= 2 {
            eprintln!("loam: minor GC");
        }
        let outcome = collector::minor::collect(&mut self.heap, &mut self.shadow);
        self.stats.record_minor_gc(&outcome);
        if self.config.verify_heap {
            verify::verify_heap(self);
        }
        outcome.live_objects
    }

    /// Run a mark-sweep; returns the number of live objects in both
    /// generations.
    pub fn collect_major(&mut self) -> u64 {
        if self.config.debug_level >= 2 {
            eprintln!(
                "loam: major GC ({} bytes tenured)",
                self.heap.tenure.size_words() * config::WORD_BYTES
            );
        }
        let outcome =
            collector::major::collect(&mut self.heap, &self.shadow, &self.descriptors, self.current_mark);
        self.current_mark ^= 2;
        self.stats.record_major_gc(&outcome);
        if self.config.verify_heap {
            verify::verify_heap(self);
        }
        outcome.live_objects
    }

    /// Run a mark-sweep only if the tenure footprint has crossed its
    /// threshold, applying the threshold hysteresis afterwards. Returns the
    /// live count, or 0 when no collection ran.
    pub fn collect_major_if_needed(&mut self) -> u64 {
        if !self.heap.tenure.should_collect() {
            return 0;
        }
        let live = self.collect_major();
        self.heap.tenure.rebalance_limit();
        live
    }

    // =========================================================================
    // Roots and descriptors
    // =========================================================================

    /// The shadow stack.
    pub fn roots(&self) -> &ShadowStack {
        &self.shadow
    }

    /// Mutable shadow stack access for rooting and unrooting.
    pub fn roots_mut(&mut self) -> &mut ShadowStack {
        &mut self.shadow
    }

    /// Register the descriptor selected by `dispatch` on normal objects.
    pub fn register_descriptor(&mut self, dispatch: u8, descriptor: TypeDescriptor) {
        self.descriptors.register(dispatch, descriptor);
    }

    /// The descriptor an object would be cleaned up with.
    pub fn descriptor_for(&self, obj: ObjectRef) -> &TypeDescriptor {
        self.descriptors.descriptor_for(obj)
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Old-generation footprint in words.
    pub fn tenure_words(&self) -> usize {
        self.heap.tenure.size_words()
    }

    /// Current major-collection threshold in words.
    pub fn tenure_limit_words(&self) -> usize {
        self.heap.tenure.limit_words()
    }

    /// The mark value the next major collection will use.
    pub fn current_mark_value(&self) -> u8 {
        self.current_mark
    }

    /// Collection counters.
    pub fn stats(&self) -> &GcStats {
        &self.stats
    }

    /// The active configuration.
    pub fn config(&self) -> &GcConfig {
        &self.config
    }

    /// Adjust trace verbosity at runtime.
    pub fn set_debug_level(&mut self, level: u8) {
        self.config.debug_level = level;
    }

    /// The nursery.
    pub fn nursery(&self) -> &Nursery {
        self.heap.nursery()
    }

    /// The tenure space.
    pub fn tenure(&self) -> &Tenure {
        self.heap.tenure()
    }

    /// The remember set.
    pub fn remember_set(&self) -> &barrier::RememberSet {
        self.heap.remember_set()
    }
}

impl Drop for Gc {
    fn drop(&mut self) {
        if self.config.debug_level >= 1 {
            self.stats.print_summary();
        }
    }
}
