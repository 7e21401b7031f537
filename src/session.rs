//! Caller-held pagination state.
//!
//! Adapters are stateless; the cursor stack and the "which response is
//! current" bookkeeping live here, with whoever drives the search.

use crate::aggregator::Aggregator;
use crate::error::Result;
use crate::models::{Entity, ListEnvelope, Meta, Provider, SearchParams};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Cursor stack: push on "next", pop on "prev".
#[derive(Debug, Clone, Default)]
pub struct PageNavigator {
    /// Cursor of the page on screen; `None` is the first page
    current: Option<String>,
    /// Cursors of the pages before it
    history: Vec<Option<String>>,
    /// `meta.next_cursor` of the page on screen
    next: Option<String>,
}

impl PageNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn current_cursor(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// 1-based position in the stack.
    pub fn page_number(&self) -> usize {
        self.history.len() + 1
    }

    /// Remember the continuation token of the page just loaded.
    pub fn record(&mut self, meta: &Meta) {
        self.next = meta.next_cursor.clone();
    }

    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    pub fn can_go_back(&self) -> bool {
        !self.history.is_empty()
    }

    /// Move to the next page. `false` when there is none.
    pub fn advance(&mut self) -> bool {
        match self.next.take() {
            Some(next) => {
                let previous = self.current.replace(next);
                self.history.push(previous);
                true
            }
            None => false,
        }
    }

    /// Move back one page. `false` on the first page.
    pub fn back(&mut self) -> bool {
        match self.history.pop() {
            Some(previous) => {
                self.current = previous;
                self.next = None;
                true
            }
            None => false,
        }
    }
}

/// Monotonic request tickets; only the newest ticket's response is kept.
#[derive(Debug, Default)]
pub struct RequestSequencer {
    latest: AtomicU64,
}

impl RequestSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a ticket that supersedes every earlier one.
    pub fn issue(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_current(&self, ticket: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket
    }

    /// `Some(value)` only if `ticket` is still the newest.
    pub fn accept<T>(&self, ticket: u64, value: T) -> Option<T> {
        if self.is_current(ticket) {
            Some(value)
        } else {
            debug!(ticket, latest = self.latest.load(Ordering::SeqCst), "Discarding stale response");
            None
        }
    }
}

/// A request handed out by [`SearchSession::begin`].
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub ticket: u64,
    pub provider: Provider,
    pub entity: Entity,
    pub params: SearchParams,
}

/// One user search: a query against one provider plus its page stack.
#[derive(Debug)]
pub struct SearchSession {
    provider: Provider,
    entity: Entity,
    template: SearchParams,
    navigator: PageNavigator,
    sequencer: RequestSequencer,
}

impl SearchSession {
    pub fn new(provider: Provider, entity: Entity, params: SearchParams) -> Self {
        Self {
            provider,
            entity,
            template: params.with_cursor(None),
            navigator: PageNavigator::new(),
            sequencer: RequestSequencer::new(),
        }
    }

    pub fn navigator(&self) -> &PageNavigator {
        &self.navigator
    }

    pub fn query(&self) -> &str {
        &self.template.search
    }

    /// Replace the query and start over at the first page. Anything still in
    /// flight for the old query is discarded when it lands.
    pub fn restart(&mut self, search: impl Into<String>) {
        self.template.search = search.into();
        self.navigator.reset();
        self.sequencer.issue();
    }

    /// Request for the page the navigator points at.
    pub fn begin(&self) -> PendingRequest {
        PendingRequest {
            ticket: self.sequencer.issue(),
            provider: self.provider,
            entity: self.entity,
            params: self.template.clone().with_cursor(self.navigator.current.clone()),
        }
    }

    /// Apply a response; stale tickets are dropped.
    pub fn complete(&mut self, ticket: u64, envelope: ListEnvelope<Value>) -> Option<ListEnvelope<Value>> {
        let envelope = self.sequencer.accept(ticket, envelope)?;
        self.navigator.record(&envelope.meta);
        Some(envelope)
    }

    /// Fetch the current page.
    pub async fn load(&mut self, aggregator: &Aggregator) -> Result<Option<ListEnvelope<Value>>> {
        let pending = self.begin();
        let envelope = aggregator
            .search(pending.provider, pending.entity, &pending.params)
            .await?;
        Ok(self.complete(pending.ticket, envelope))
    }

    /// Advance and fetch; `Ok(None)` when there is no next page.
    pub async fn next_page(&mut self, aggregator: &Aggregator) -> Result<Option<ListEnvelope<Value>>> {
        if !self.navigator.advance() {
            return Ok(None);
        }
        self.load(aggregator).await
    }

    /// Step back and fetch; `Ok(None)` on the first page.
    pub async fn prev_page(&mut self, aggregator: &Aggregator) -> Result<Option<ListEnvelope<Value>>> {
        if !self.navigator.back() {
            return Ok(None);
        }
        self.load(aggregator).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use mockito::Matcher;
    use serde_json::json;

    fn meta(next: Option<&str>) -> Meta {
        Meta {
            count: 100,
            next_cursor: next.map(str::to_string),
        }
    }

    #[test]
    fn test_navigator_push_and_pop() {
        let mut nav = PageNavigator::new();
        assert_eq!(nav.current_cursor(), None);
        assert!(!nav.advance());

        nav.record(&meta(Some("tok-2")));
        assert!(nav.advance());
        assert_eq!(nav.current_cursor(), Some("tok-2"));
        assert_eq!(nav.page_number(), 2);

        nav.record(&meta(Some("tok-3")));
        assert!(nav.advance());
        nav.record(&meta(None));
        assert!(!nav.has_next());

        assert!(nav.back());
        assert_eq!(nav.current_cursor(), Some("tok-2"));
        assert!(nav.back());
        assert_eq!(nav.current_cursor(), None);
        assert!(!nav.can_go_back());
        assert!(!nav.back());
    }

    #[test]
    fn test_sequencer_keeps_latest_only() {
        let seq = RequestSequencer::new();
        let first = seq.issue();
        let second = seq.issue();
        assert!(second > first);
        assert_eq!(seq.accept(first, "old"), None);
        assert_eq!(seq.accept(second, "new"), Some("new"));
    }

    #[test]
    fn test_restart_discards_in_flight_response() {
        let mut session = SearchSession::new(Provider::Crossref, Entity::Works, SearchParams::new("old", 10));
        let pending = session.begin();
        session.restart("new");

        let stale = ListEnvelope::new(vec![json!({"DOI": "x"})], 1, Some("10".into()));
        assert!(session.complete(pending.ticket, stale).is_none());
        assert!(!session.navigator().has_next());

        let pending = session.begin();
        assert_eq!(pending.params.search, "new");
        assert_eq!(pending.params.cursor, None);
    }

    #[tokio::test]
    async fn test_walks_pages_forward_and_back() {
        let mut server = mockito::Server::new_async().await;
        let page = |offset: u64| json!({"message": {"items": [{"DOI": format!("10.1/{offset}")}, {"DOI": "b"}], "total-results": 5}});
        let _p0 = server
            .mock("GET", "/works")
            .match_query(Matcher::UrlEncoded("offset".into(), "0".into()))
            .with_body(page(0).to_string())
            .expect(2)
            .create_async()
            .await;
        let _p2 = server
            .mock("GET", "/works")
            .match_query(Matcher::UrlEncoded("offset".into(), "2".into()))
            .with_body(page(2).to_string())
            .create_async()
            .await;

        let agg = Aggregator::new(&Settings::default().with_base_url(&server.url())).expect("aggregator");
        let mut session = SearchSession::new(Provider::Crossref, Entity::Works, SearchParams::new("q", 2));

        let first = session.load(&agg).await.expect("load").expect("current");
        assert_eq!(first.results[0]["DOI"], "10.1/0");

        let second = session.next_page(&agg).await.expect("next").expect("current");
        assert_eq!(second.results[0]["DOI"], "10.1/2");
        assert_eq!(session.navigator().page_number(), 2);

        let back = session.prev_page(&agg).await.expect("prev").expect("current");
        assert_eq!(back.results[0]["DOI"], "10.1/0");
        assert!(session.prev_page(&agg).await.expect("prev").is_none());
    }
}
