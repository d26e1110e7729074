//! Runtime module: boot, single pass and the watch loop.

pub mod boot;
pub mod pass;
pub mod watch;

pub use pass::{run_pass, PassReport};
pub use watch::watch;
