//! OpenAlex API Client
//!
//! The bibliographic graph provider. Its list endpoints already answer with a
//! `{results, meta}` envelope and use server-issued cursor tokens, so the
//! adapter passes the caller's cursor through untouched and hands back the
//! token from `meta.next_cursor` verbatim.
//!
//! API notes (per OpenAlex docs):
//! - `mailto` puts requests in the polite pool
//! - `cursor=*` starts cursor pagination; `per_page` caps at 200

use crate::config::Settings;
use crate::cursor::FIRST_PAGE;
use crate::error::{OptionExt, Result, SearchError};
use crate::models::{Entity, ListEnvelope, Provider, SearchParams};
use crate::provider::{build_http_client, endpoint, get_json, WorksSource};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

/// A work as returned by `/works` (only the fields the mappers read).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphWork {
    pub id: Option<String>,
    pub display_name: Option<String>,
    pub publication_year: Option<i64>,
    pub doi: Option<String>,
    pub primary_location: Option<GraphLocation>,
    /// Legacy venue block, still present on older snapshots
    pub host_venue: Option<GraphHostVenue>,
    pub best_oa_location: Option<GraphLocation>,
    pub open_access: Option<GraphOpenAccess>,
    pub concepts: Option<Vec<Concept>>,
    pub authorships: Option<Vec<GraphAuthorship>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphLocation {
    pub display_name: Option<String>,
    pub landing_page_url: Option<String>,
    pub url: Option<String>,
    pub pdf_url: Option<String>,
    pub is_oa: Option<bool>,
    pub source: Option<GraphSource>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphSource {
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphHostVenue {
    pub display_name: Option<String>,
    pub publisher: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphOpenAccess {
    pub is_oa: Option<bool>,
}

/// Topical concept with a relevance score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Concept {
    pub id: Option<String>,
    pub display_name: Option<String>,
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphAuthorship {
    pub author: Option<GraphAuthorRef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphAuthorRef {
    pub id: Option<String>,
    pub display_name: Option<String>,
}

/// An author as returned by `/authors`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphAuthor {
    pub id: Option<String>,
    pub display_name: Option<String>,
    pub works_count: Option<u64>,
    pub cited_by_count: Option<u64>,
}

/// OpenAlex client bound to one base URL and polite-pool contact.
pub struct OpenAlexClient {
    client: Client,
    base_url: String,
    mailto: Option<String>,
}

impl OpenAlexClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        Ok(Self {
            client: build_http_client(settings)?,
            base_url: settings.openalex_base.clone(),
            mailto: settings.contact_email.clone(),
        })
    }

    /// Build `<base>/<path>?<params>&mailto=...`, skipping absent params.
    fn build_url(&self, path: &str, params: &[(&str, Option<String>)]) -> Result<url::Url> {
        let mut url = endpoint(&self.base_url, path)?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params {
                if let Some(value) = value {
                    pairs.append_pair(key, value);
                }
            }
            if let Some(mail) = &self.mailto {
                pairs.append_pair("mailto", mail);
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }
        Ok(url)
    }

    fn list_url(&self, entity: Entity, params: &SearchParams) -> Result<url::Url> {
        let search = Some(params.search.trim().to_string()).filter(|s| !s.is_empty());
        let cursor = params.cursor().unwrap_or(FIRST_PAGE).to_string();
        self.build_url(
            entity.as_str(),
            &[
                ("search", search),
                ("filter", params.filter.clone()),
                ("sort", params.sort.clone()),
                ("per_page", Some(params.per_page.to_string())),
                ("cursor", Some(cursor)),
            ],
        )
    }

    async fn list(&self, entity: Entity, params: &SearchParams) -> Result<ListEnvelope<Value>> {
        info!(
            provider = "openalex",
            entity = entity.as_str(),
            query = %params.search,
            per_page = params.per_page,
            "Starting OpenAlex search"
        );

        let url = self.list_url(entity, params)?;
        let body = get_json(&self.client, Provider::OpenAlex, &url).await?;
        let envelope: ListEnvelope<Value> = serde_json::from_value(body).map_err(|e| {
            SearchError::Parse(format!("Unexpected OpenAlex list response: {}", e))
        })?;

        info!(
            count = envelope.meta.count,
            returned = envelope.results.len(),
            next_cursor = ?envelope.meta.next_cursor,
            "OpenAlex page received"
        );
        Ok(envelope)
    }

    /// Search authors. Same envelope and cursor rules as works.
    pub async fn search_authors(&self, params: &SearchParams) -> Result<ListEnvelope<Value>> {
        self.list(Entity::Authors, params).await
    }

    /// Fetch one work by OpenAlex id (`W2741809807`) or DOI (`10.1038/nature14539`).
    pub async fn get_work(&self, id_or_doi: &str) -> Result<Value> {
        let identifier = normalize_identifier(id_or_doi, Entity::Works)?;
        let url = self.build_url(&identifier, &[])?;
        get_json(&self.client, Provider::OpenAlex, &url).await
    }

    /// Fetch one author by OpenAlex id (`A1969205036`).
    pub async fn get_author(&self, id: &str) -> Result<Value> {
        let identifier = normalize_identifier(id, Entity::Authors)?;
        let url = self.build_url(&identifier, &[])?;
        get_json(&self.client, Provider::OpenAlex, &url).await
    }
}

#[async_trait]
impl WorksSource for OpenAlexClient {
    fn provider(&self) -> Provider {
        Provider::OpenAlex
    }

    async fn search_works(&self, params: &SearchParams) -> Result<ListEnvelope<Value>> {
        self.list(Entity::Works, params).await
    }
}

/// Turn a short id or DOI into an entity path (`works/W...`, `works/doi:...`).
pub fn normalize_identifier(value: &str, entity: Entity) -> Result<String> {
    let trimmed = Some(value.trim())
        .filter(|v| !v.is_empty())
        .ok_or_malformed("Missing identifier")?;

    let prefix = format!("{}/", entity.as_str());
    if trimmed.starts_with(&prefix) {
        return Ok(trimmed.to_string());
    }
    if entity == Entity::Works && (trimmed.starts_with("10.") || trimmed.contains('/')) {
        return Ok(format!("{}doi:{}", prefix, trimmed));
    }
    Ok(format!("{}{}", prefix, trimmed))
}
