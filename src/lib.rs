//! # scholarhub
//!
//! Scholarly search aggregator: one `{results, meta}` envelope with
//! per-provider cursor handling over several literature sources.
//!
//! ## Modules
//!
//! - [`taxonomy`] - Keyword categories and the boolean query builder
//! - [`openalex`] - OpenAlex (works + authors, token cursors)
//! - [`crossref`] - Crossref (offset cursors)
//! - [`arxiv`] / [`feed`] - arXiv Atom feed, tree and regex extractors
//! - [`semanticscholar`] - Semantic Scholar (offset cursors)
//! - [`serper`] - Google Scholar via Serper (key-gated, page cursors)
//! - [`view`] - Normalized `ViewWork` mapping
//! - [`export`] - JSON / CSV export
//! - [`aggregator`] / [`server`] - Dispatch and the HTTP endpoint
//! - [`session`] - Caller-held cursor stack
//!
//! ## Usage
//!
//! ```rust,no_run
//! use scholarhub::{aggregator::Aggregator, config::Settings, models::{Entity, Provider, SearchParams}};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let aggregator = Aggregator::new(&Settings::from_env())?;
//!     let page = aggregator
//!         .search(Provider::OpenAlex, Entity::Works, &SearchParams::new("transformers", 10))
//!         .await?;
//!     println!("{} of {} results", page.results.len(), page.meta.count);
//!     Ok(())
//! }
//! ```

pub mod aggregator;
pub mod arxiv;
pub mod config;
pub mod crossref;
pub mod cursor;
pub mod error;
pub mod export;
pub mod feed;
pub mod models;
pub mod openalex;
pub mod provider;
pub mod semanticscholar;
pub mod serper;
pub mod server;
pub mod session;
pub mod taxonomy;
pub mod view;

pub use error::{Result, SearchError};
