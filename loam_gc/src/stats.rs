//! Collection counters.
//!
//! The collector is single-threaded and non-reentrant, so these are plain
//! integers updated through `&mut` access. At debug level 1 the summary is
//! printed when the collector is torn down.

use crate::collector::{MajorOutcome, MinorOutcome};

/// Statistics about allocation and collection activity.
#[derive(Debug, Default, Clone)]
pub struct GcStats {
    /// Number of minor (copying) collections.
    pub minor_collections: u64,
    /// Number of major (mark-sweep) collections.
    pub major_collections: u64,
    /// Objects allocated since startup, both generations.
    pub objects_allocated: u64,
    /// Words allocated since startup, headers included.
    pub words_allocated: u64,
    /// Objects promoted out of the nursery.
    pub objects_promoted: u64,
    /// Words promoted out of the nursery.
    pub words_promoted: u64,
    /// Tenured objects reclaimed by sweeps.
    pub objects_swept: u64,
}

impl GcStats {
    /// Record one allocation of `words` words.
    #[inline]
    pub(crate) fn record_allocation(&mut self, words: usize) {
        self.objects_allocated += 1;
        self.words_allocated += words as u64;
    }

    /// Record a finished scavenge.
    pub(crate) fn record_minor_gc(&mut self, outcome: &MinorOutcome) {
        self.minor_collections += 1;
        self.objects_promoted += outcome.promoted_objects;
        self.words_promoted += outcome.promoted_words;
    }

    /// Record a finished mark-sweep.
    pub(crate) fn record_major_gc(&mut self, outcome: &MajorOutcome) {
        self.major_collections += 1;
        self.objects_swept += outcome.freed_objects;
    }

    /// Print the teardown summary to stderr.
    pub fn print_summary(&self) {
        eprintln!(
            "loam: minor GC {} times, major GC {} times",
            self.minor_collections, self.major_collections
        );
        eprintln!(
            "loam: {} objects allocated ({} words), {} promoted, {} swept",
            self.objects_allocated, self.words_allocated, self.objects_promoted, self.objects_swept
        );
    }
}
