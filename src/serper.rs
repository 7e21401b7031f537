//! Serper Google Scholar client.
//!
//! The web-scale engine is key-gated: the key lives in [`Settings`] on the
//! server and is only ever sent as the `X-API-KEY` header. Paging is by
//! 1-based page number, and the engine reports no real total.

use crate::config::{Settings, ENV_SERPER_API_KEY};
use crate::cursor::{approximate_engine_total, next_page_cursor, page_from_cursor};
use crate::error::{Result, SearchError};
use crate::models::{ListEnvelope, Provider, SearchParams};
use crate::provider::{build_http_client, endpoint, send_json, WorksSource};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

/// Item arrays the engine has been seen to use, in lookup order.
const ITEM_FIELDS: [&str; 2] = ["organic", "organic_results"];

#[derive(Debug, Serialize)]
struct ScholarRequest<'a> {
    q: &'a str,
    page: u32,
    num: u32,
}

/// Serper client. Construction succeeds without a key; searches do not.
pub struct SerperClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl SerperClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        Ok(Self {
            client: build_http_client(settings)?,
            endpoint: settings.serper_endpoint.clone(),
            api_key: settings.serper_api_key.clone(),
        })
    }

    pub fn has_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Fetch one result page. Fails before any network call when no key is set.
    pub async fn search_page(&self, q: &str, page: u32, num: u32) -> Result<ListEnvelope<Value>> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| SearchError::Config(format!("Missing {} env var", ENV_SERPER_API_KEY)))?;

        info!(provider = "scholar", query = %q, page = page, num = num, "Starting Google Scholar search");

        let url = endpoint(&self.endpoint, "")?;
        debug!(url = %url, "Sending search request");
        let request = self
            .client
            .post(url.as_str())
            .header("X-API-KEY", key)
            .json(&ScholarRequest { q, page, num });

        let data = send_json(Provider::Serper, request).await?;
        let envelope = envelope_from_response(&data, page);

        info!(
            count = envelope.meta.count,
            returned = envelope.results.len(),
            next_cursor = ?envelope.meta.next_cursor,
            "Google Scholar page received"
        );
        Ok(envelope)
    }
}

#[async_trait]
impl WorksSource for SerperClient {
    fn provider(&self) -> Provider {
        Provider::Serper
    }

    async fn search_works(&self, params: &SearchParams) -> Result<ListEnvelope<Value>> {
        let page = page_from_cursor(params.cursor());
        self.search_page(&params.search, page, params.per_page).await
    }
}

/// Normalize the engine's reply into the envelope.
fn envelope_from_response(data: &Value, page: u32) -> ListEnvelope<Value> {
    let items: Vec<Value> = ITEM_FIELDS
        .iter()
        .find_map(|field| data.get(*field).and_then(Value::as_array))
        .cloned()
        .unwrap_or_default();
    let reported_num = data
        .get("searchParameters")
        .and_then(|p| p.get("num"))
        .and_then(Value::as_u64);

    let count = approximate_engine_total(reported_num, page, items.len());
    let next_cursor = next_page_cursor(page, items.len());
    ListEnvelope::new(items, count, next_cursor)
}
