//! arXiv API client.
//!
//! The preprint repository answers with an Atom feed. Paging is `start` +
//! `max_results`, so the cursor carries an integer offset. The total comes
//! from `opensearch:totalResults`; when the feed omits it the adapter assumes
//! the current page is the last one.

use crate::config::Settings;
use crate::cursor::{next_offset_cursor, offset_from_cursor};
use crate::error::Result;
use crate::feed::{default_extractor, extract_with_fallback, FeedExtractor, PatternExtractor};
use crate::models::{ListEnvelope, Provider, SearchParams};
use crate::provider::{build_http_client, endpoint, get_text, WorksSource};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::info;

const ATOM_ACCEPT: &str = "application/atom+xml";

/// arXiv client with its feed extractors.
pub struct ArxivClient {
    client: Client,
    base_url: String,
    extractor: Box<dyn FeedExtractor>,
    fallback: PatternExtractor,
}

impl ArxivClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        Ok(Self {
            client: build_http_client(settings)?,
            base_url: settings.arxiv_base.clone(),
            extractor: default_extractor()?,
            fallback: PatternExtractor::new()?,
        })
    }

    fn search_url(&self, params: &SearchParams, offset: u64) -> Result<url::Url> {
        let search = params.search.trim();
        let search = if search.is_empty() { "*" } else { search };
        let mut url = endpoint(&self.base_url, "")?;
        url.query_pairs_mut()
            .append_pair("search_query", &format!("all:{}", search))
            .append_pair("start", &offset.to_string())
            .append_pair("max_results", &params.per_page.to_string())
            .append_pair("sortBy", "relevance");
        Ok(url)
    }
}

#[async_trait]
impl WorksSource for ArxivClient {
    fn provider(&self) -> Provider {
        Provider::Arxiv
    }

    async fn search_works(&self, params: &SearchParams) -> Result<ListEnvelope<Value>> {
        let offset = offset_from_cursor(params.cursor());
        info!(
            provider = "arxiv",
            query = %params.search,
            max_results = params.per_page,
            start = offset,
            "Starting arXiv search"
        );

        let url = self.search_url(params, offset)?;
        let xml = get_text(&self.client, Provider::Arxiv, &url, ATOM_ACCEPT).await?;
        let feed = extract_with_fallback(self.extractor.as_ref(), &self.fallback, &xml)?;

        let returned = feed.entries.len();
        let total = feed
            .total_results
            .filter(|t| *t > 0)
            .unwrap_or(offset.saturating_add(returned as u64));
        let next_cursor = next_offset_cursor(offset, returned, total);

        let results = feed
            .entries
            .into_iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        info!(
            count = total,
            returned = returned,
            next_cursor = ?next_cursor,
            "arXiv page received"
        );
        Ok(ListEnvelope::new(results, total, next_cursor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn feed(total: Option<u64>, ids: &[&str]) -> String {
        let total = total
            .map(|t| format!("<opensearch:totalResults xmlns:opensearch=\"http://a9.com/-/spec/opensearch/1.1/\">{t}</opensearch:totalResults>"))
            .unwrap_or_default();
        let entries: String = ids
            .iter()
            .map(|id| {
                format!(
                    "<entry><id>http://arxiv.org/abs/{id}</id><published>2022-03-01T00:00:00Z</published>\
                     <title>Paper {id}</title><author><name>Author {id}</name></author>\
                     <link title=\"pdf\" href=\"http://arxiv.org/pdf/{id}\"/></entry>"
                )
            })
            .collect();
        format!("<?xml version=\"1.0\"?><feed xmlns=\"http://www.w3.org/2005/Atom\">{total}{entries}</feed>")
    }

    fn client_for(server: &mockito::Server) -> ArxivClient {
        ArxivClient::new(&Settings::default().with_base_url(&server.url())).expect("client")
    }

    #[tokio::test]
    async fn test_offset_paging_against_total_results() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/query")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("search_query".into(), "all:maritime".into()),
                Matcher::UrlEncoded("start".into(), "2".into()),
                Matcher::UrlEncoded("max_results".into(), "2".into()),
                Matcher::UrlEncoded("sortBy".into(), "relevance".into()),
            ]))
            .with_status(200)
            .with_body(feed(Some(5), &["2201.1", "2201.2"]))
            .create_async()
            .await;

        let env = client_for(&server)
            .search_works(&SearchParams::new("maritime", 2).with_cursor(Some("2".into())))
            .await
            .expect("search");

        mock.assert_async().await;
        assert_eq!(env.meta.count, 5);
        assert_eq!(env.meta.next_cursor.as_deref(), Some("4"));
        assert_eq!(env.results[0]["pdf"], "http://arxiv.org/pdf/2201.1");
        assert_eq!(env.results[0]["venue"], "arXiv");
        assert_eq!(env.results[1]["year"], 2022);
    }

    #[tokio::test]
    async fn test_missing_total_assumes_last_page() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/api/query")
            .match_query(Matcher::UrlEncoded("search_query".into(), "all:*".into()))
            .with_status(200)
            .with_body(feed(None, &["a", "b", "c"]))
            .create_async()
            .await;

        let env = client_for(&server).search_works(&SearchParams::new("", 3)).await.expect("search");
        assert_eq!(env.meta.count, 3);
        assert!(env.meta.next_cursor.is_none());
    }

    #[tokio::test]
    async fn test_offset_at_u64_max_saturates() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/api/query")
            .match_query(Matcher::UrlEncoded("start".into(), u64::MAX.to_string()))
            .with_status(200)
            .with_body(feed(None, &["edge"]))
            .create_async()
            .await;

        let params = SearchParams::new("x", 1).with_cursor(Some(u64::MAX.to_string()));
        let env = client_for(&server).search_works(&params).await.expect("search");
        assert_eq!(env.meta.count, u64::MAX);
        assert!(env.meta.next_cursor.is_none());
        assert_eq!(env.results.len(), 1);
    }

    #[tokio::test]
    async fn test_zero_page_size_is_passed_through() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/query")
            .match_query(Matcher::UrlEncoded("max_results".into(), "0".into()))
            .with_status(200)
            .with_body(feed(Some(40), &[]))
            .create_async()
            .await;

        let env = client_for(&server).search_works(&SearchParams::new("x", 0)).await.expect("search");
        mock.assert_async().await;
        assert!(env.results.is_empty());
        assert!(env.meta.next_cursor.is_none());
    }

    #[tokio::test]
    async fn test_truncated_feed_keeps_complete_entries() {
        let mut server = mockito::Server::new_async().await;
        let body = feed(Some(9), &["ok.1", "cut.2"]);
        let cut = body.find("<entry><id>http://arxiv.org/abs/cut.2").expect("second entry");
        let _m = server
            .mock("GET", "/api/query")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(&body[..cut + 30])
            .create_async()
            .await;

        let env = client_for(&server).search_works(&SearchParams::new("x", 2)).await.expect("degraded");
        assert_eq!(env.results.len(), 1);
        assert_eq!(env.results[0]["title"], "Paper ok.1");
    }

    #[tokio::test]
    async fn test_server_error_surfaces_status() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/api/query")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let err = client_for(&server).search_works(&SearchParams::new("x", 2)).await.expect_err("500");
        assert_eq!(err.to_string(), "arXiv request failed (500): boom");
    }
}
