//! Shared data model: providers, request parameters, the list envelope,
//! raw provider items and the normalized `ViewWork`.

use crate::crossref::RegistryWork;
use crate::error::{Result, SearchError};
use crate::feed::FeedEntry;
use crate::openalex::GraphWork;
use crate::semanticscholar::SemanticPaper;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Default page size when the caller does not ask for one.
pub const DEFAULT_PER_PAGE: u32 = 10;

/// External search source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Bibliographic graph API (token cursors)
    OpenAlex,
    /// Citation-metadata registry (offset cursors)
    Crossref,
    /// Preprint repository, Atom feed (offset cursors)
    Arxiv,
    /// Paper graph with offset paging
    SemanticScholar,
    /// Web-scale scholarly engine behind a secret key (page-number cursors)
    #[serde(rename = "scholar")]
    Serper,
}

impl Provider {
    pub const ALL: [Provider; 5] = [
        Provider::OpenAlex,
        Provider::Crossref,
        Provider::Arxiv,
        Provider::SemanticScholar,
        Provider::Serper,
    ];

    /// Identifier used on the wire and in export filenames.
    pub fn id(self) -> &'static str {
        match self {
            Provider::OpenAlex => "openalex",
            Provider::Crossref => "crossref",
            Provider::Arxiv => "arxiv",
            Provider::SemanticScholar => "semanticscholar",
            Provider::Serper => "scholar",
        }
    }

    /// Human-facing label, also used as the `source_engine` badge.
    pub fn label(self) -> &'static str {
        match self {
            Provider::OpenAlex => "OpenAlex",
            Provider::Crossref => "Crossref",
            Provider::Arxiv => "arXiv",
            Provider::SemanticScholar => "Semantic Scholar",
            Provider::Serper => "Google Scholar",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Provider {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Provider::ALL
            .into_iter()
            .find(|p| p.id() == wanted)
            .ok_or_else(|| SearchError::MalformedInput(format!("Unknown source '{}'", s)))
    }
}

/// Kind of record being searched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Entity {
    #[default]
    Works,
    Authors,
}

impl Entity {
    pub fn as_str(self) -> &'static str {
        match self {
            Entity::Works => "works",
            Entity::Authors => "authors",
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Entity {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "works" => Ok(Entity::Works),
            "authors" => Ok(Entity::Authors),
            other => Err(SearchError::MalformedInput(format!("Unknown entity '{}'", other))),
        }
    }
}

/// Parameters accepted by every adapter's `search_works`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchParams {
    /// Free-text or boolean query string
    pub search: String,
    /// Page size, passed to the provider unchanged (0 included)
    pub per_page: u32,
    /// Continuation token from a previous `meta.next_cursor` of the same provider
    pub cursor: Option<String>,
    /// Raw provider filter expression (graph provider only)
    pub filter: Option<String>,
    /// Sort expression such as `cited_by_count:desc` (graph provider only)
    pub sort: Option<String>,
}

impl SearchParams {
    pub fn new(search: impl Into<String>, per_page: u32) -> Self {
        Self {
            search: search.into(),
            per_page,
            ..Default::default()
        }
    }

    pub fn with_cursor(mut self, cursor: Option<String>) -> Self {
        self.cursor = cursor;
        self
    }

    /// Cursor as a borrowed str, if any.
    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            search: String::new(),
            per_page: DEFAULT_PER_PAGE,
            cursor: None,
            filter: None,
            sort: None,
        }
    }
}

/// Pagination metadata of a list response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    /// Provider's best estimate of the total match count
    #[serde(default)]
    pub count: u64,
    /// `None` once the current page reached the end
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// The uniform `{results, meta}` contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListEnvelope<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
    #[serde(default)]
    pub meta: Meta,
}

impl<T> ListEnvelope<T> {
    pub fn new(results: Vec<T>, count: u64, next_cursor: Option<String>) -> Self {
        Self {
            results,
            meta: Meta { count, next_cursor },
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), 0, None)
    }
}

/// A provider-native result item, tagged by where it came from.
#[derive(Debug, Clone)]
pub enum RawItem {
    Graph(GraphWork),
    Registry(RegistryWork),
    Feed(FeedEntry),
    Semantic(SemanticPaper),
    /// Web-scale engine items are kept as-is
    Engine(Value),
}

impl RawItem {
    /// Interpret a wire item according to the provider that produced it.
    pub fn decode(provider: Provider, value: &Value) -> Result<Self> {
        let item = match provider {
            Provider::OpenAlex => RawItem::Graph(GraphWork::deserialize(value)?),
            Provider::Crossref => RawItem::Registry(RegistryWork::deserialize(value)?),
            Provider::Arxiv => RawItem::Feed(FeedEntry::deserialize(value)?),
            Provider::SemanticScholar => RawItem::Semantic(SemanticPaper::deserialize(value)?),
            Provider::Serper => RawItem::Engine(value.clone()),
        };
        Ok(item)
    }

    pub fn provider(&self) -> Provider {
        match self {
            RawItem::Graph(_) => Provider::OpenAlex,
            RawItem::Registry(_) => Provider::Crossref,
            RawItem::Feed(_) => Provider::Arxiv,
            RawItem::Semantic(_) => Provider::SemanticScholar,
            RawItem::Engine(_) => Provider::Serper,
        }
    }
}

/// Normalized, display/export-ready work.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewWork {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub open: bool,
    /// At most five topical tags
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub publisher_or_author: String,
}
