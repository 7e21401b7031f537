//! Result view mapper.
//!
//! One pure mapping per [`RawItem`] variant. Every field with more than one
//! candidate source is resolved through a named chain of extractors; the
//! first extractor that yields a non-empty string wins.

use crate::crossref::RegistryWork;
use crate::error::Result;
use crate::feed::FeedEntry;
use crate::models::{Provider, RawItem, ViewWork};
use crate::openalex::{Concept, GraphWork};
use crate::semanticscholar::SemanticPaper;
use serde_json::Value;

/// Most topical tags a view carries.
pub const MAX_SKILLS: usize = 5;

/// Reads one candidate value out of an item.
pub type Extractor<T> = for<'a> fn(&'a T) -> Option<&'a str>;

/// First non-empty value produced by `chain`, in order.
pub fn first_present<'a, T>(item: &'a T, chain: &[Extractor<T>]) -> Option<&'a str> {
    chain
        .iter()
        .filter_map(|extract| extract(item))
        .find(|value| !value.is_empty())
}

// ----------------------------------------------------------------------------
// Graph API
// ----------------------------------------------------------------------------

fn graph_primary_name(w: &GraphWork) -> Option<&str> {
    w.primary_location.as_ref()?.display_name.as_deref()
}

fn graph_primary_source_name(w: &GraphWork) -> Option<&str> {
    w.primary_location.as_ref()?.source.as_ref()?.display_name.as_deref()
}

fn graph_host_venue_name(w: &GraphWork) -> Option<&str> {
    w.host_venue.as_ref()?.display_name.as_deref()
}

fn graph_best_oa_landing(w: &GraphWork) -> Option<&str> {
    w.best_oa_location.as_ref()?.landing_page_url.as_deref()
}

fn graph_best_oa_url(w: &GraphWork) -> Option<&str> {
    w.best_oa_location.as_ref()?.url.as_deref()
}

fn graph_primary_landing(w: &GraphWork) -> Option<&str> {
    w.primary_location.as_ref()?.landing_page_url.as_deref()
}

fn graph_id(w: &GraphWork) -> Option<&str> {
    w.id.as_deref()
}

fn graph_publisher(w: &GraphWork) -> Option<&str> {
    w.host_venue.as_ref()?.publisher.as_deref()
}

fn graph_first_author(w: &GraphWork) -> Option<&str> {
    w.authorships.as_ref()?.first()?.author.as_ref()?.display_name.as_deref()
}

pub const GRAPH_VENUE_CHAIN: &[Extractor<GraphWork>] = &[graph_primary_name, graph_host_venue_name];

/// Venue chain used by the CSV export (prefers the structured source).
pub const GRAPH_EXPORT_VENUE_CHAIN: &[Extractor<GraphWork>] =
    &[graph_primary_source_name, graph_primary_name, graph_host_venue_name];

pub const GRAPH_LINK_CHAIN: &[Extractor<GraphWork>] =
    &[graph_best_oa_landing, graph_best_oa_url, graph_primary_landing, graph_id];

pub const GRAPH_PUBLISHER_CHAIN: &[Extractor<GraphWork>] = &[graph_publisher, graph_first_author];

/// Concept names by descending score, at most `limit`.
///
/// A missing score counts as zero and ties keep their input order, so a list
/// with no scores at all comes back unranked. Names fall back to ids; entries
/// with neither are dropped.
pub fn rank_concepts(concepts: &[Concept], limit: usize) -> Vec<String> {
    let mut ranked: Vec<&Concept> = concepts.iter().collect();
    ranked.sort_by(|a, b| b.score.unwrap_or(0.0).total_cmp(&a.score.unwrap_or(0.0)));
    ranked
        .into_iter()
        .take(limit)
        .filter_map(|c| {
            [c.display_name.as_deref(), c.id.as_deref()]
                .into_iter()
                .flatten()
                .find(|s| !s.is_empty())
                .map(str::to_string)
        })
        .collect()
}

/// Whether the graph API marks this work open access.
pub fn graph_is_open(w: &GraphWork) -> bool {
    w.best_oa_location.is_some() || w.open_access.as_ref().and_then(|oa| oa.is_oa).unwrap_or(false)
}

fn graph_view(w: &GraphWork) -> ViewWork {
    let title = w.display_name.clone().unwrap_or_default();
    let link = first_present(w, GRAPH_LINK_CHAIN).unwrap_or_default().to_string();
    let doi = non_empty(w.doi.as_deref());
    let id = [w.id.as_deref(), Some(link.as_str()), doi.as_deref(), Some(title.as_str())]
        .into_iter()
        .flatten()
        .find(|s| !s.is_empty())
        .unwrap_or_default()
        .to_string();

    ViewWork {
        year: w.publication_year.filter(|y| *y != 0),
        venue: non_empty(first_present(w, GRAPH_VENUE_CHAIN)),
        open: graph_is_open(w),
        skills: rank_concepts(w.concepts.as_deref().unwrap_or_default(), MAX_SKILLS),
        publisher_or_author: first_present(w, GRAPH_PUBLISHER_CHAIN).unwrap_or_default().to_string(),
        id,
        title,
        doi,
        link,
    }
}

// ----------------------------------------------------------------------------
// Citation registry
// ----------------------------------------------------------------------------

fn registry_first_title(w: &RegistryWork) -> Option<&str> {
    w.title.as_ref()?.first().map(String::as_str)
}

fn registry_first_container(w: &RegistryWork) -> Option<&str> {
    w.container_title.as_ref()?.first().map(String::as_str)
}

fn registry_first_link(w: &RegistryWork) -> Option<&str> {
    w.link.as_ref()?.first()?.url.as_deref()
}

fn registry_url(w: &RegistryWork) -> Option<&str> {
    w.url.as_deref()
}

fn registry_doi(w: &RegistryWork) -> Option<&str> {
    w.doi.as_deref()
}

fn registry_publisher(w: &RegistryWork) -> Option<&str> {
    w.publisher.as_deref()
}

fn registry_first_author(w: &RegistryWork) -> Option<&str> {
    let first = w.author.as_ref()?.first()?;
    first
        .family
        .as_deref()
        .filter(|f| !f.is_empty())
        .or(first.name.as_deref())
}

pub const REGISTRY_TITLE_CHAIN: &[Extractor<RegistryWork>] = &[registry_first_title, registry_first_container];

pub const REGISTRY_LINK_CHAIN: &[Extractor<RegistryWork>] = &[registry_first_link, registry_url];

pub const REGISTRY_ID_CHAIN: &[Extractor<RegistryWork>] =
    &[registry_url, registry_doi, registry_first_title, registry_first_container];

pub const REGISTRY_PUBLISHER_CHAIN: &[Extractor<RegistryWork>] = &[registry_publisher, registry_first_author];

/// `issued.date-parts[0][0]`
fn registry_year(w: &RegistryWork) -> Option<i64> {
    w.issued
        .as_ref()?
        .date_parts
        .as_ref()?
        .first()?
        .first()
        .copied()
        .flatten()
}

fn registry_view(w: &RegistryWork) -> ViewWork {
    // any license or link counts; a rough signal, not a real OA flag
    let open = w.license.as_ref().is_some_and(|l| !l.is_empty()) || w.link.as_ref().is_some_and(|l| !l.is_empty());

    ViewWork {
        id: first_present(w, REGISTRY_ID_CHAIN).unwrap_or_default().to_string(),
        title: first_present(w, REGISTRY_TITLE_CHAIN).unwrap_or_default().to_string(),
        year: registry_year(w),
        venue: non_empty(registry_first_container(w)),
        doi: non_empty(w.doi.as_deref()),
        link: first_present(w, REGISTRY_LINK_CHAIN).unwrap_or_default().to_string(),
        open,
        skills: w
            .subject
            .as_deref()
            .unwrap_or_default()
            .iter()
            .take(MAX_SKILLS)
            .cloned()
            .collect(),
        publisher_or_author: first_present(w, REGISTRY_PUBLISHER_CHAIN).unwrap_or_default().to_string(),
    }
}

// ----------------------------------------------------------------------------
// Preprint feed
// ----------------------------------------------------------------------------

fn feed_pdf(e: &FeedEntry) -> Option<&str> {
    Some(e.pdf.as_str())
}

fn feed_link(e: &FeedEntry) -> Option<&str> {
    Some(e.link.as_str())
}

fn feed_doi(e: &FeedEntry) -> Option<&str> {
    Some(e.doi.as_str())
}

fn feed_title(e: &FeedEntry) -> Option<&str> {
    Some(e.title.as_str())
}

pub const FEED_LINK_CHAIN: &[Extractor<FeedEntry>] = &[feed_pdf, feed_link];

pub const FEED_ID_CHAIN: &[Extractor<FeedEntry>] = &[feed_pdf, feed_link, feed_doi, feed_title];

fn feed_view(e: &FeedEntry) -> ViewWork {
    ViewWork {
        id: first_present(e, FEED_ID_CHAIN).unwrap_or_default().to_string(),
        title: e.title.clone(),
        year: e.year,
        venue: Some(crate::feed::FEED_VENUE.to_string()),
        doi: non_empty(Some(e.doi.as_str())),
        link: first_present(e, FEED_LINK_CHAIN).unwrap_or_default().to_string(),
        open: true,
        skills: e.categories.iter().take(MAX_SKILLS).cloned().collect(),
        publisher_or_author: e.authors.first().cloned().unwrap_or_default(),
    }
}

// ----------------------------------------------------------------------------
// Semantic Scholar
// ----------------------------------------------------------------------------

fn semantic_pdf(p: &SemanticPaper) -> Option<&str> {
    p.open_access_pdf.as_ref()?.url.as_deref()
}

fn semantic_url(p: &SemanticPaper) -> Option<&str> {
    p.url.as_deref()
}

fn semantic_paper_id(p: &SemanticPaper) -> Option<&str> {
    p.paper_id.as_deref()
}

fn semantic_doi(p: &SemanticPaper) -> Option<&str> {
    p.external_ids.as_ref()?.doi.as_deref()
}

fn semantic_title(p: &SemanticPaper) -> Option<&str> {
    p.title.as_deref()
}

pub const SEMANTIC_LINK_CHAIN: &[Extractor<SemanticPaper>] = &[semantic_pdf, semantic_url];

pub const SEMANTIC_ID_CHAIN: &[Extractor<SemanticPaper>] =
    &[semantic_paper_id, semantic_url, semantic_doi, semantic_title];

fn semantic_view(p: &SemanticPaper) -> ViewWork {
    ViewWork {
        id: first_present(p, SEMANTIC_ID_CHAIN).unwrap_or_default().to_string(),
        title: p.title.clone().unwrap_or_default(),
        year: p.year,
        venue: non_empty(p.venue.as_deref()),
        doi: non_empty(semantic_doi(p)),
        link: first_present(p, SEMANTIC_LINK_CHAIN).unwrap_or_default().to_string(),
        open: p.is_open_access.unwrap_or(false) || semantic_pdf(p).is_some_and(|u| !u.is_empty()),
        skills: p
            .fields_of_study
            .as_deref()
            .unwrap_or_default()
            .iter()
            .take(MAX_SKILLS)
            .cloned()
            .collect(),
        publisher_or_author: p
            .authors
            .as_deref()
            .and_then(|a| a.first())
            .and_then(|a| a.name.clone())
            .unwrap_or_default(),
    }
}

// ----------------------------------------------------------------------------
// Web-scale engine
// ----------------------------------------------------------------------------

/// Engine items are already close to the view shape; same-named fields are
/// copied as they are and nothing else is derived.
fn engine_view(item: &Value) -> ViewWork {
    let text = |key: &str| item.get(key).and_then(Value::as_str).map(str::to_string);
    ViewWork {
        id: text("id").unwrap_or_default(),
        title: text("title").unwrap_or_default(),
        year: item.get("year").and_then(Value::as_i64),
        venue: text("venue"),
        doi: text("doi"),
        link: text("link").unwrap_or_default(),
        open: item.get("open").and_then(Value::as_bool).unwrap_or(false),
        skills: item
            .get("skills")
            .and_then(Value::as_array)
            .map(|s| s.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default(),
        publisher_or_author: text("publisher_or_author").unwrap_or_default(),
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

/// Map one raw item into its normalized view.
pub fn to_view_work(raw: &RawItem) -> ViewWork {
    match raw {
        RawItem::Graph(w) => graph_view(w),
        RawItem::Registry(w) => registry_view(w),
        RawItem::Feed(e) => feed_view(e),
        RawItem::Semantic(p) => semantic_view(p),
        RawItem::Engine(v) => engine_view(v),
    }
}

/// Decode a wire item from `provider` and map it.
pub fn view_json(provider: Provider, item: &Value) -> Result<ViewWork> {
    Ok(to_view_work(&RawItem::decode(provider, item)?))
}
