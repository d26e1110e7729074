//! Store module: persisted alert history.

pub mod dedup;

pub use dedup::DedupStore;
