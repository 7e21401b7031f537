//! Provider adapter interface and the HTTP plumbing the adapters share.
//!
//! Each adapter turns one provider's native response into a
//! `ListEnvelope<Value>` and owns that provider's cursor encoding.
//! Failures are reported, never retried.

use crate::config::Settings;
use crate::error::{Result, SearchError};
use crate::models::{ListEnvelope, Provider, SearchParams};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use tracing::{debug, warn};

/// A source that can answer a works search with the uniform envelope.
#[async_trait]
pub trait WorksSource: Send + Sync {
    /// Which provider this adapter talks to.
    fn provider(&self) -> Provider;

    /// Fetch one page of works.
    async fn search_works(&self, params: &SearchParams) -> Result<ListEnvelope<Value>>;
}

/// Build the HTTP client every adapter uses.
pub fn build_http_client(settings: &Settings) -> Result<Client> {
    Client::builder()
        .user_agent(settings.user_agent.as_str())
        .timeout(settings.timeout)
        .build()
        .map_err(|e| SearchError::Config(format!("Failed to build HTTP client: {}", e)))
}

/// Send a request and return the body of a successful response.
///
/// Non-success statuses become `SearchError::Transport` carrying the status
/// and a body excerpt; connection failures and timeouts carry no status.
async fn send(provider: Provider, request: RequestBuilder) -> Result<String> {
    let response = request
        .send()
        .await
        .map_err(|e| SearchError::network(provider, &e))?;
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        warn!(provider = provider.id(), status = status.as_u16(), "Provider returned an error");
        return Err(SearchError::status(provider, status.as_u16(), &body));
    }

    response
        .text()
        .await
        .map_err(|e| SearchError::network(provider, &e))
}

/// GET `url` and decode the body as JSON.
pub async fn get_json(client: &Client, provider: Provider, url: &url::Url) -> Result<Value> {
    debug!(provider = provider.id(), url = %url, "GET");
    let body = send(
        provider,
        client.get(url.as_str()).header("Accept", "application/json"),
    )
    .await?;
    parse_json(provider, &body)
}

/// GET `url` and return the raw body text.
pub async fn get_text(client: &Client, provider: Provider, url: &url::Url, accept: &str) -> Result<String> {
    debug!(provider = provider.id(), url = %url, "GET");
    send(provider, client.get(url.as_str()).header("Accept", accept)).await
}

/// Send a prepared request (e.g. a POST with a JSON body) and decode the JSON reply.
pub async fn send_json(provider: Provider, request: RequestBuilder) -> Result<Value> {
    let body = send(provider, request.header("Accept", "application/json")).await?;
    parse_json(provider, &body)
}

fn parse_json(provider: Provider, body: &str) -> Result<Value> {
    serde_json::from_str(body)
        .map_err(|e| SearchError::Parse(format!("Failed to parse {} response: {}", provider, e)))
}

/// Parse `base` + `path` into a URL, reporting a bad base as configuration error.
pub fn endpoint(base: &str, path: &str) -> Result<url::Url> {
    let joined = if path.is_empty() {
        base.trim_end_matches('/').to_string()
    } else {
        format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
    };
    url::Url::parse(&joined).map_err(|e| SearchError::Config(format!("Invalid base URL '{}': {}", base, e)))
}
