//! Process-wide collector instance for embedding hosts.
//!
//! Hosts that drive the collector through a flat functional surface (FFI
//! bindings, interpreter startup code) use this module instead of owning a
//! [`Gc`] value. The instance lives behind a mutex with an explicit
//! `initialize` → operate → `finalize` lifecycle; re-initialization after
//! finalize is permitted, and initializing twice simply replaces the
//! previous instance.
//!
//! The mutex guards lifecycle races, not mutator concurrency: the collector
//! itself remains single-threaded and non-reentrant.

use crate::config::{ConfigError, GcConfig, WORD_BYTES};
use crate::Gc;
use parking_lot::Mutex;

static COLLECTOR: Mutex<Option<Gc>> = Mutex::new(None);

/// Create the process-wide collector with a `young_mib`-MiB semi-space and
/// a `stack_mib`-MiB shadow-stack reservation.
pub fn initialize(young_mib: usize, stack_mib: usize) -> Result<(), ConfigError> {
    let gc = Gc::new(GcConfig::with_heap_mib(young_mib, stack_mib))?;
    *COLLECTOR.lock() = Some(gc);
    Ok(())
}

/// Tear the collector down, releasing the heap. Prints the collection
/// summary first when the debug level is at least 1.
pub fn finalize() {
    *COLLECTOR.lock() = None;
}

/// Run `f` against the process-wide collector.
///
/// # Panics
///
/// Panics if `initialize` has not been called (or `finalize` already was).
pub fn with<R>(f: impl FnOnce(&mut Gc) -> R) -> R {
    let mut guard = COLLECTOR.lock();
    let gc = guard.as_mut().expect("collector is not initialized");
    f(gc)
}

/// Current debug level.
pub fn get_debug() -> u8 {
    with(|gc| gc.config().debug_level)
}

/// Set the debug level: 0 silent, 1 summary at finalize, >= 2 per-GC trace.
pub fn set_debug(level: u8) {
    with(|gc| gc.set_debug_level(level));
}

/// Old-generation footprint in whole MiB.
pub fn tenure_size_mib() -> usize {
    with(|gc| gc.tenure_words() * WORD_BYTES / (1024 * 1024))
}

/// Force a scavenge; returns the number of live nursery objects.
pub fn force_minor() -> u64 {
    with(Gc::collect_minor)
}

/// Force a mark-sweep; returns the number of live objects.
pub fn force_major() -> u64 {
    with(Gc::collect_major)
}
