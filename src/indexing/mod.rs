//! Indexing structures for candidate reduction
//!
//! - Prefix index: buckets records by their leading chars so deduplication
//!   only compares records that start alike

pub mod prefix;

pub use prefix::*;
