//! Files module: watch directory access.

pub mod locate;
pub mod scratch;

pub use locate::{most_recent_file, LatestFile};
pub use scratch::ScratchCopy;
