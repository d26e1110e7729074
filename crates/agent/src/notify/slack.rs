//! Slack: Web API notifier over hyper + rustls.
//!
//! Channel messages go straight to `chat.postMessage`. Direct messages are
//! resolved first: `users.list` maps the display name to a user ID, then
//! `conversations.list?types=im` maps the user ID to the DM channel.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::{AUTHORIZATION, CONTENT_TYPE};
use hyper::{Method, Request};
use hyper_rustls::{ConfigBuilderExt, HttpsConnector};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use rustls::crypto::CryptoProvider;
use rustls::ClientConfig;
use serde_json::{json, Value};
use tokio::time;

use super::{Destination, Notifier, NotifyError};
use crate::conf::SlackConfig;

type HttpsClient = Client<HttpsConnector<HttpConnector>, Full<Bytes>>;

/// Page size for list methods.
const PAGE_LIMIT: u32 = 200;

pub struct SlackNotifier {
    client: HttpsClient,
    api_base: String,
    token: String,
    timeout: Duration,
}

impl SlackNotifier {
    /// Build a notifier trusting the platform's root certificates.
    pub fn new(config: &SlackConfig, token: impl Into<String>) -> Result<Self, NotifyError> {
        init_crypto_provider();
        let tls_config = ClientConfig::builder()
            .with_native_roots()
            .map_err(NotifyError::Tls)?
            .with_no_client_auth();
        Ok(Self::with_tls_config(config, token, tls_config))
    }

    /// Build a notifier reading the bot token from `config.token_env`.
    pub fn from_env(config: &SlackConfig) -> Result<Self, NotifyError> {
        let token = std::env::var(&config.token_env)
            .ok()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| NotifyError::MissingToken(config.token_env.clone()))?;
        Self::new(config, token)
    }

    fn with_tls_config(config: &SlackConfig, token: impl Into<String>, tls_config: ClientConfig) -> Self {
        let https = hyper_rustls::HttpsConnectorBuilder::new()
            .with_tls_config(tls_config)
            .https_or_http()
            .enable_http1()
            .build();

        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(2)
            .timer(TokioTimer::new())
            .build::<_, Full<Bytes>>(https);

        Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token: token.into(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    async fn get(&self, method: &str, query: &[(&str, String)]) -> Result<Value, NotifyError> {
        let mut uri = format!("{}/{}", self.api_base, method);
        for (i, (key, value)) in query.iter().enumerate() {
            uri.push(if i == 0 { '?' } else { '&' });
            uri.push_str(key);
            uri.push('=');
            uri.push_str(&encode_query_value(value));
        }
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .body(Full::new(Bytes::new()))?;
        self.send(request).await
    }

    async fn post_json(&self, method: &str, body: &Value) -> Result<Value, NotifyError> {
        let request = Request::builder()
            .method(Method::POST)
            .uri(format!("{}/{}", self.api_base, method))
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .header(CONTENT_TYPE, "application/json; charset=utf-8")
            .body(Full::new(Bytes::from(serde_json::to_vec(body)?)))?;
        self.send(request).await
    }

    async fn send(&self, request: Request<Full<Bytes>>) -> Result<Value, NotifyError> {
        let exchange = async {
            let response = self.client.request(request).await?;
            let status = response.status();
            let body = response.into_body().collect().await?.to_bytes();
            Ok::<_, NotifyError>((status, body))
        };
        let (status, body) = time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| NotifyError::Timeout(self.timeout))??;

        if !status.is_success() {
            return Err(NotifyError::Status(status.as_u16()));
        }
        let value: Value = serde_json::from_slice(&body)?;
        check_ok(&value)?;
        Ok(value)
    }

    /// Walk every page of a cursor-paginated list method looking for the
    /// item whose `search_field` equals `search_value`.
    async fn find_in_list(
        &self,
        method: &str,
        extra: &[(&str, String)],
        classifier: &str,
        search_field: &str,
        search_value: &str,
        return_field: &str,
    ) -> Result<Option<String>, NotifyError> {
        let mut cursor: Option<String> = None;
        loop {
            let mut query: Vec<(&str, String)> = extra.to_vec();
            query.push(("limit", PAGE_LIMIT.to_string()));
            if let Some(c) = &cursor {
                query.push(("cursor", c.clone()));
            }
            let page = self.get(method, &query).await?;
            if let Some(found) = find_field(&page, classifier, search_field, search_value, return_field) {
                return Ok(Some(found));
            }
            match next_cursor(&page) {
                Some(next) => cursor = Some(next),
                None => return Ok(None),
            }
        }
    }

    /// Turn a destination into a channel ID (or name) accepted by `chat.postMessage`.
    pub async fn resolve(&self, destination: &Destination) -> Result<String, NotifyError> {
        match destination {
            Destination::Channel(name) => Ok(name.clone()),
            Destination::DirectMessage(real_name) => {
                let user_id = self
                    .find_in_list("users.list", &[], "members", "real_name", real_name, "id")
                    .await?
                    .ok_or_else(|| NotifyError::NotFound { kind: "user", name: real_name.clone() })?;
                tracing::debug!("Resolved Slack user {} to {}", real_name, user_id);

                let types = [("types", "im".to_string())];
                self.find_in_list("conversations.list", &types, "channels", "user", &user_id, "id")
                    .await?
                    .ok_or_else(|| NotifyError::NotFound { kind: "direct message channel", name: real_name.clone() })
            }
        }
    }
}

impl Notifier for SlackNotifier {
    fn notify<'a>(
        &'a self,
        destination: &'a Destination,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), NotifyError>> + Send + 'a>> {
        Box::pin(async move {
            let channel = self.resolve(destination).await?;
            self.post_json("chat.postMessage", &post_message_body(&channel, text)).await?;
            tracing::debug!("Posted message to {}", destination);
            Ok(())
        })
    }
}

fn init_crypto_provider() {
    if CryptoProvider::get_default().is_none() {
        // Another thread may win the race; either way a provider is installed.
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
    }
}

/// Fail unless the response carries `"ok": true`.
pub fn check_ok(response: &Value) -> Result<(), NotifyError> {
    if response.get("ok").and_then(Value::as_bool) == Some(true) {
        return Ok(());
    }
    let reason = response
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("unknown_error");
    Err(NotifyError::Api(reason.to_string()))
}

/// Find the first item of `response[classifier]` whose `search_field`
/// equals `search_value` and return its `return_field`.
pub fn find_field(
    response: &Value,
    classifier: &str,
    search_field: &str,
    search_value: &str,
    return_field: &str,
) -> Option<String> {
    response
        .get(classifier)?
        .as_array()?
        .iter()
        .find(|item| item.get(search_field).and_then(Value::as_str) == Some(search_value))?
        .get(return_field)?
        .as_str()
        .map(str::to_string)
}

fn next_cursor(response: &Value) -> Option<String> {
    response
        .pointer("/response_metadata/next_cursor")
        .and_then(Value::as_str)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
}

pub fn post_message_body(channel: &str, text: &str) -> Value {
    json!({ "channel": channel, "text": text })
}

fn encode_query_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(byte as char),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
