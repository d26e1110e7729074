// Module structure for the Galaxy error log agent.

// Core
pub mod parser;

// Collaborators
pub mod conf;
pub mod error;
pub mod files;
pub mod notify;
pub mod store;

// Lifecycle
pub mod runtime;
