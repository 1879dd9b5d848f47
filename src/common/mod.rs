//! Small shared utilities used by more than one subsystem.
//!
//! Kept deliberately tiny: this is not a general-purpose toolkit, just the
//! handful of data structures the parse cache and dedup filter both need.

pub mod bounded_map;

pub use bounded_map::BoundedHashMap;
