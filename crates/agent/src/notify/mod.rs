//! Notify module: delivering alert messages.
//!
//! The pass runner talks to chat services only through [`Notifier`].
//! `slack.rs` provides the Slack Web API implementation.
//! `fake.rs` provides a test double.

pub mod fake;
pub mod slack;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use thiserror::Error;

pub use fake::FakeNotifier;
pub use slack::SlackNotifier;

/// Where a message goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// A channel, by name or ID
    Channel(String),
    /// A direct message to the user with this display name
    DirectMessage(String),
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Channel(name) => write!(f, "#{}", name),
            Destination::DirectMessage(user) => write!(f, "@{}", user),
        }
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] hyper_util::client::legacy::Error),

    #[error("failed to build request: {0}")]
    Request(#[from] hyper::http::Error),

    #[error("failed to read response body: {0}")]
    Body(#[from] hyper::Error),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("Slack API error: {0}")]
    Api(String),

    #[error("invalid response JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("TLS setup failed: {0}")]
    Tls(std::io::Error),

    #[error("bot token missing: environment variable {0} is not set")]
    MissingToken(String),
}

/// Async message delivery.
///
/// Object-safe thanks to `Pin<Box<…>>` returns.
/// Implementations must be `Send + Sync` so one instance can serve every pass.
pub trait Notifier: Send + Sync {
    fn notify<'a>(
        &'a self,
        destination: &'a Destination,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), NotifyError>> + Send + 'a>>;
}
