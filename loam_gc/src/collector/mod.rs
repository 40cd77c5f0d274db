//! The two collectors: a copying scavenger for the nursery and a
//! mark-sweep pass for the tenure list.

pub mod major;
pub mod minor;

pub use major::MajorOutcome;
pub use minor::MinorOutcome;
