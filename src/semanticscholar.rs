//! Semantic Scholar API Client
//!
//! Paper search over the graph API. Pagination is `limit` + `offset`, with the
//! offset carried in the cursor string like the citation registry.
//!
//! API Details:
//! - Search endpoint: GET /graph/v1/paper/search
//! - Rate limit: 1 req/s unauthenticated, higher with an `x-api-key`

use crate::config::Settings;
use crate::cursor::{next_offset_cursor, offset_from_cursor};
use crate::error::Result;
use crate::models::{ListEnvelope, Provider, SearchParams};
use crate::provider::{build_http_client, endpoint, send_json, WorksSource};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

/// Fields requested for every search hit
const SEARCH_FIELDS: &str = "title,year,externalIds,url,venue,publicationTypes,publicationVenue,isOpenAccess,openAccessPdf,authors.name,abstract,fieldsOfStudy,tldr";

/// A paper as returned by `/paper/search`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SemanticPaper {
    #[serde(rename = "paperId")]
    pub paper_id: Option<String>,
    pub title: Option<String>,
    pub year: Option<i64>,
    pub venue: Option<String>,
    pub url: Option<String>,
    #[serde(rename = "isOpenAccess")]
    pub is_open_access: Option<bool>,
    #[serde(rename = "openAccessPdf")]
    pub open_access_pdf: Option<SemanticPdf>,
    #[serde(rename = "externalIds")]
    pub external_ids: Option<SemanticExternalIds>,
    pub authors: Option<Vec<SemanticAuthor>>,
    #[serde(rename = "fieldsOfStudy")]
    pub fields_of_study: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SemanticPdf {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SemanticExternalIds {
    #[serde(rename = "DOI")]
    pub doi: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SemanticAuthor {
    pub name: Option<String>,
}

/// Semantic Scholar client.
pub struct SemanticScholarClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl SemanticScholarClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        Ok(Self {
            client: build_http_client(settings)?,
            base_url: settings.semantic_base.clone(),
            api_key: settings.semantic_api_key.clone(),
        })
    }

    /// Search papers; one page per call.
    pub async fn search_papers(&self, params: &SearchParams) -> Result<ListEnvelope<Value>> {
        let offset = offset_from_cursor(params.cursor());
        info!(
            provider = "semanticscholar",
            query = %params.search,
            limit = params.per_page,
            offset = offset,
            "Starting Semantic Scholar search"
        );

        let mut url = endpoint(&self.base_url, "paper/search")?;
        url.query_pairs_mut()
            .append_pair("query", &params.search)
            .append_pair("limit", &params.per_page.to_string())
            .append_pair("offset", &offset.to_string())
            .append_pair("fields", SEARCH_FIELDS);

        debug!(url = %url, "Sending search request");
        let mut request = self.client.get(url.as_str());
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        let data = send_json(Provider::SemanticScholar, request).await?;
        let items: Vec<Value> = data
            .get("data")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let total = data.get("total").and_then(Value::as_u64).unwrap_or(0);
        let next_cursor = next_offset_cursor(offset, items.len(), total);

        info!(
            count = total,
            returned = items.len(),
            next_cursor = ?next_cursor,
            "Semantic Scholar page received"
        );
        Ok(ListEnvelope::new(items, total, next_cursor))
    }
}

#[async_trait]
impl WorksSource for SemanticScholarClient {
    fn provider(&self) -> Provider {
        Provider::SemanticScholar
    }

    async fn search_works(&self, params: &SearchParams) -> Result<ListEnvelope<Value>> {
        self.search_papers(params).await
    }
}
