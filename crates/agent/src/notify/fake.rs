//! Fake: test double for message delivery.
//!
//! Records every message in memory. Individual messages (or all of them)
//! can be made to fail so the pass runner's bookkeeping can be tested.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;

use tokio::sync::Mutex;

use super::{Destination, Notifier, NotifyError};

#[derive(Default)]
struct Inner {
    sent: Vec<(Destination, String)>,
    reject: HashSet<String>,
    reject_all: bool,
}

pub struct FakeNotifier {
    inner: Mutex<Inner>,
}

impl FakeNotifier {
    pub fn new() -> Self {
        Self { inner: Mutex::new(Inner::default()) }
    }

    /// A notifier whose every delivery fails.
    pub fn failing() -> Self {
        Self {
            inner: Mutex::new(Inner { reject_all: true, ..Inner::default() }),
        }
    }

    /// Make deliveries of exactly `text` fail.
    pub async fn reject(&self, text: &str) {
        self.inner.lock().await.reject.insert(text.to_string());
    }

    /// Messages delivered so far, in order.
    pub async fn sent(&self) -> Vec<(Destination, String)> {
        self.inner.lock().await.sent.clone()
    }

    pub async fn sent_texts(&self) -> Vec<String> {
        self.inner.lock().await.sent.iter().map(|(_, text)| text.clone()).collect()
    }
}

impl Default for FakeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for FakeNotifier {
    fn notify<'a>(
        &'a self,
        destination: &'a Destination,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), NotifyError>> + Send + 'a>> {
        Box::pin(async move {
            let mut inner = self.inner.lock().await;
            if inner.reject_all || inner.reject.contains(text) {
                return Err(NotifyError::Api("channel_not_found".to_string()));
            }
            inner.sent.push((destination.clone(), text.to_string()));
            Ok(())
        })
    }
}
