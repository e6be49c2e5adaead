//! Bounded signal feed for sigdash.
//!
//! Merges full polling snapshots (`replace_all`) and pushed deltas
//! (`append`) into one ordered, capacity-bounded, duplicate-free list.

pub mod feed;

pub use feed::{AppendOutcome, BoundedSignalFeed, FeedSnapshot, ReplaceSummary, DEFAULT_CAPACITY};
