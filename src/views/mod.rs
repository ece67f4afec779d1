//! View recording

mod dedup;

pub use dedup::ViewDeduplicator;
