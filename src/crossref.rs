//! Crossref API client.
//!
//! The citation-metadata registry pages with `rows` + `offset`. The adapter
//! encodes the offset as the cursor string and derives `next_cursor` from
//! `message.total-results`.

use crate::config::Settings;
use crate::cursor::{next_offset_cursor, offset_from_cursor};
use crate::error::Result;
use crate::models::{ListEnvelope, Provider, SearchParams};
use crate::provider::{build_http_client, endpoint, get_json, WorksSource};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

/// A Crossref work item (only the fields the mappers read).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryWork {
    #[serde(rename = "DOI")]
    pub doi: Option<String>,
    #[serde(rename = "URL")]
    pub url: Option<String>,
    pub title: Option<Vec<String>>,
    #[serde(rename = "container-title")]
    pub container_title: Option<Vec<String>>,
    pub issued: Option<RegistryDate>,
    pub link: Option<Vec<RegistryLink>>,
    pub license: Option<Vec<Value>>,
    pub author: Option<Vec<RegistryAuthor>>,
    pub publisher: Option<String>,
    pub subject: Option<Vec<String>>,
}

/// `{"date-parts": [[2023, 6, 15]]}`; parts may be null in the wild.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryDate {
    #[serde(rename = "date-parts")]
    pub date_parts: Option<Vec<Vec<Option<i64>>>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryLink {
    #[serde(rename = "URL")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryAuthor {
    pub given: Option<String>,
    pub family: Option<String>,
    /// Organisational authors carry `name` instead of given/family
    pub name: Option<String>,
}

/// Crossref client bound to one base URL and polite-pool contact.
pub struct CrossrefClient {
    client: Client,
    base_url: String,
    mailto: Option<String>,
}

impl CrossrefClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        Ok(Self {
            client: build_http_client(settings)?,
            base_url: settings.crossref_base.clone(),
            mailto: settings.contact_email.clone(),
        })
    }

    fn search_url(&self, params: &SearchParams, offset: u64) -> Result<url::Url> {
        let mut url = endpoint(&self.base_url, "works")?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("query", &params.search)
                .append_pair("rows", &params.per_page.to_string())
                .append_pair("offset", &offset.to_string())
                .append_pair("sort", "relevance")
                .append_pair("order", "desc");
            if let Some(mail) = &self.mailto {
                pairs.append_pair("mailto", mail);
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl WorksSource for CrossrefClient {
    fn provider(&self) -> Provider {
        Provider::Crossref
    }

    async fn search_works(&self, params: &SearchParams) -> Result<ListEnvelope<Value>> {
        let offset = offset_from_cursor(params.cursor());
        info!(
            provider = "crossref",
            query = %params.search,
            rows = params.per_page,
            offset = offset,
            "Starting Crossref search"
        );

        let url = self.search_url(params, offset)?;
        let data = get_json(&self.client, Provider::Crossref, &url).await?;
        let envelope = envelope_from_message(&data, offset);

        info!(
            count = envelope.meta.count,
            returned = envelope.results.len(),
            next_cursor = ?envelope.meta.next_cursor,
            "Crossref page received"
        );
        Ok(envelope)
    }
}

/// Translate `{"message": {"items": [...], "total-results": N}}` into the envelope.
///
/// A missing message, items list or total reads as empty / zero.
fn envelope_from_message(data: &Value, offset: u64) -> ListEnvelope<Value> {
    let message = data.get("message");
    if message.is_none() {
        warn!("Crossref response has no message block");
    }
    let items: Vec<Value> = message
        .and_then(|m| m.get("items"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let total = message
        .and_then(|m| m.get("total-results"))
        .and_then(Value::as_u64)
        .unwrap_or(0);

    let next_cursor = next_offset_cursor(offset, items.len(), total);
    ListEnvelope::new(items, total, next_cursor)
}
