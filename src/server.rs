//! Aggregation endpoint.
//!
//! - `GET /api/search` dispatches one page to the selected provider
//! - `GET /api/scholar` proxies the key-gated engine; the key never leaves
//!   the server
//! - `GET /health`
//!
//! Every other method on the API routes answers 405. CORS is open to any
//! origin for reads.

use crate::aggregator::Aggregator;
use crate::error::SearchError;
use crate::models::{Entity, Provider, SearchParams, DEFAULT_PER_PAGE};
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// `{error}` body with a status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn from_search(err: &SearchError) -> Self {
        let status = StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self::new(status, err.to_string())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Query string of `/api/search`.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    entity: Option<String>,
    #[serde(default)]
    q: Option<String>,
    #[serde(default)]
    per_page: Option<u32>,
    #[serde(default)]
    cursor: Option<String>,
    #[serde(default)]
    filter: Option<String>,
    #[serde(default)]
    sort: Option<String>,
}

/// Query string of `/api/scholar`.
#[derive(Debug, Deserialize)]
pub struct ScholarQuery {
    #[serde(default)]
    q: Option<String>,
    #[serde(default)]
    page: Option<u32>,
    #[serde(default)]
    num: Option<u32>,
}

/// Build the router over a shared aggregator.
pub fn router(aggregator: Arc<Aggregator>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/api/search", get(search_handler).fallback(method_not_allowed))
        .route("/api/scholar", get(scholar_handler).fallback(method_not_allowed))
        .route("/health", get(health_handler))
        .with_state(aggregator)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Bind and serve until the process stops.
pub async fn serve(addr: SocketAddr, aggregator: Arc<Aggregator>) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "Listening");
    axum::serve(listener, router(aggregator)).await
}

async fn health_handler() -> &'static str {
    "OK"
}

async fn method_not_allowed() -> ApiError {
    ApiError::new(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

async fn search_handler(
    State(aggregator): State<Arc<Aggregator>>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;

    let provider: Provider = parse_or_default(query.source.as_deref(), Provider::OpenAlex)?;
    let entity: Entity = parse_or_default(query.entity.as_deref(), Entity::Works)?;
    let params = SearchParams {
        search: query.q.unwrap_or_default(),
        per_page: query.per_page.unwrap_or(DEFAULT_PER_PAGE),
        cursor: query.cursor.filter(|c| !c.is_empty()),
        filter: query.filter.filter(|f| !f.is_empty()),
        sort: query.sort.filter(|s| !s.is_empty()),
    };

    info!(source = provider.id(), entity = entity.as_str(), q = %params.search, "Search request");

    match aggregator.search(provider, entity, &params).await {
        Ok(envelope) => Ok(Json(envelope).into_response()),
        Err(e) => {
            error!(source = provider.id(), error = %e, "Search failed");
            Err(ApiError::from_search(&e))
        }
    }
}

async fn scholar_handler(
    State(aggregator): State<Arc<Aggregator>>,
    query: Result<Query<ScholarQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    let q = query.q.unwrap_or_default();
    let page = query.page.unwrap_or(1).max(1);
    let num = query.num.unwrap_or(DEFAULT_PER_PAGE);

    info!(q = %q, page = page, num = num, "Scholar request");

    match aggregator.scholar(&q, page, num).await {
        Ok(envelope) => Ok(Json(envelope).into_response()),
        Err(e) => {
            if matches!(e, SearchError::Config(_)) {
                warn!(error = %e, "Scholar proxy is not configured");
            } else {
                error!(error = %e, "Scholar request failed");
            }
            Err(ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

fn parse_or_default<T>(value: Option<&str>, default: T) -> Result<T, ApiError>
where
    T: std::str::FromStr<Err = SearchError>,
{
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => v.parse().map_err(|e: SearchError| ApiError::from_search(&e)),
        None => Ok(default),
    }
}
