//! Collector configuration.
//!
//! All sizes are in 64-bit words internally; the host-facing constructor
//! accepts MiB and converts. Defaults suit a small embedded interpreter.

use thiserror::Error;

/// Bytes per heap word.
pub const WORD_BYTES: usize = 8;

/// Smallest usable semi-space, in words.
pub const MIN_SEMI_SPACE_WORDS: usize = 64;

/// Configuration for the garbage collector.
///
/// # Example
///
/// ```ignore
/// use loam_gc::GcConfig;
///
/// // 8 MiB nursery (two 4 MiB semi-spaces), traced collections
/// let config = GcConfig {
///     debug_level: 2,
///     ..GcConfig::with_heap_mib(4, 1)
/// };
/// ```
#[derive(Debug, Clone)]
pub struct GcConfig {
    /// Size of each nursery semi-space in words. Total nursery memory is
    /// twice this. The initial major-GC threshold is also twice this.
    pub semi_space_words: usize,

    /// Initial capacity reserved for the shadow stack, in slots.
    pub shadow_stack_capacity: usize,

    /// Trace verbosity: 0 silent, 1 summary at teardown, >= 2 a line per
    /// collection.
    pub debug_level: u8,

    /// Verify heap invariants after every collection. Expensive; on by
    /// default only in debug builds.
    pub verify_heap: bool,
}

impl Default for GcConfig {
    fn default() -> Self {
        Self::with_heap_mib(4, 1)
    }
}

impl GcConfig {
    /// Build a configuration from MiB sizes, the way embedding hosts
    /// specify them.
    pub fn with_heap_mib(young_mib: usize, stack_mib: usize) -> Self {
        Self {
            semi_space_words: young_mib * 1024 * 1024 / WORD_BYTES,
            shadow_stack_capacity: stack_mib * 1024 * 1024 / WORD_BYTES,
            debug_level: 0,
            verify_heap: cfg!(debug_assertions),
        }
    }

    /// A deliberately tiny heap, used by tests that want to provoke
    /// collections and exhaustion cheaply.
    pub fn small_heap() -> Self {
        Self {
            semi_space_words: 1024,
            shadow_stack_capacity: 64,
            debug_level: 0,
            verify_heap: true,
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.semi_space_words < MIN_SEMI_SPACE_WORDS {
            return Err(ConfigError::SemiSpaceTooSmall);
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The semi-space cannot hold a useful number of objects.
    #[error("semi-space must be at least {MIN_SEMI_SPACE_WORDS} words")]
    SemiSpaceTooSmall,
}
