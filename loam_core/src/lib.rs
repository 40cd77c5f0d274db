//! # Loam Core
//!
//! Core value representation shared between the loam garbage collector and
//! any host embedding it.
//!
//! This crate provides exactly one building block:
//!
//! - **Value System**: a NaN-boxed 64-bit word packing doubles, 48-bit
//!   integers, managed-object pointers, and a null sentinel into a single
//!   `u64` with branch-cheap type tests.
//!
//! Everything that interprets those words — object headers, spaces,
//! collectors — lives in `loam_gc`.

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod value;

pub use value::Value;

/// Loam runtime version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
