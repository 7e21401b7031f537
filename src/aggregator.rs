//! Composition root: one adapter instance per provider, built from one
//! [`Settings`] value and shared by the HTTP routes and the CLI.

use crate::arxiv::ArxivClient;
use crate::config::Settings;
use crate::crossref::CrossrefClient;
use crate::error::Result;
use crate::models::{Entity, ListEnvelope, Provider, SearchParams};
use crate::openalex::OpenAlexClient;
use crate::provider::WorksSource;
use crate::semanticscholar::SemanticScholarClient;
use crate::serper::SerperClient;
use serde_json::Value;
use tracing::{debug, info};

pub struct Aggregator {
    openalex: OpenAlexClient,
    crossref: CrossrefClient,
    arxiv: ArxivClient,
    semantic: SemanticScholarClient,
    serper: SerperClient,
}

impl Aggregator {
    pub fn new(settings: &Settings) -> Result<Self> {
        debug!(settings = ?settings, "Building provider adapters");
        Ok(Self {
            openalex: OpenAlexClient::new(settings)?,
            crossref: CrossrefClient::new(settings)?,
            arxiv: ArxivClient::new(settings)?,
            semantic: SemanticScholarClient::new(settings)?,
            serper: SerperClient::new(settings)?,
        })
    }

    pub fn openalex(&self) -> &OpenAlexClient {
        &self.openalex
    }

    /// The works adapter for `provider`.
    pub fn source(&self, provider: Provider) -> &dyn WorksSource {
        match provider {
            Provider::OpenAlex => &self.openalex,
            Provider::Crossref => &self.crossref,
            Provider::Arxiv => &self.arxiv,
            Provider::SemanticScholar => &self.semantic,
            Provider::Serper => &self.serper,
        }
    }

    /// One page from one provider; exactly one outbound call.
    ///
    /// Only the graph API has an author index; asking any other provider for
    /// authors yields an empty envelope without a network call.
    pub async fn search(&self, provider: Provider, entity: Entity, params: &SearchParams) -> Result<ListEnvelope<Value>> {
        info!(
            source = provider.id(),
            entity = entity.as_str(),
            cursor = ?params.cursor,
            "Dispatching search"
        );
        match (provider, entity) {
            (Provider::OpenAlex, Entity::Authors) => self.openalex.search_authors(params).await,
            (_, Entity::Authors) => Ok(ListEnvelope::empty()),
            (_, Entity::Works) => self.source(provider).search_works(params).await,
        }
    }

    /// Key-gated engine page, by page number.
    pub async fn scholar(&self, q: &str, page: u32, num: u32) -> Result<ListEnvelope<Value>> {
        self.serper.search_page(q, page, num).await
    }
}
