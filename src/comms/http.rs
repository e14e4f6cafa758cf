//! Axum-based HTTP channel — the REST query surface.
//!
//! Implements [`Channel`] so it slots into the comms lifecycle: `run()`
//! drives the axum event loop with the shared [`CancellationToken`] wired to
//! graceful shutdown. Handlers parse query/path input, call one engine
//! operation, and serialize the result; all validation lives in the engine.
//!
//! ## URL layout
//!
//! ```text
//! GET /                        — service card (name, version, counts, endpoints)
//! GET /facts                   — paginated listing (?limit=&offset=)
//! GET /facts/random            — random sample (?count=)
//! GET /facts/search            — substring search (?q=)
//! GET /facts/categories        — category index
//! GET /facts/category/{name}   — facts in one category
//! GET /facts/{id}              — single fact
//! GET /stats                   — aggregate statistics
//! ```

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{Channel, ChannelFuture};
use crate::corpus::{CorpusError, CorpusStore};
use crate::engine::{self, QueryError};
use crate::error::AppError;

// ── Shared request state ──────────────────────────────────────────────────────

/// Router state injected into every handler via [`axum::extract::State`].
///
/// Cheap to clone — all fields are reference-counted.
#[derive(Clone)]
struct AxumState {
    bot_name: Arc<str>,
    store: Arc<CorpusStore>,
}

// ── HttpChannel ───────────────────────────────────────────────────────────────

pub struct HttpChannel {
    channel_id: String,
    bind_addr: String,
    bot_name: String,
    store: Arc<CorpusStore>,
}

impl HttpChannel {
    pub fn new(
        channel_id: impl Into<String>,
        bind_addr: impl Into<String>,
        bot_name: impl Into<String>,
        store: Arc<CorpusStore>,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            bind_addr: bind_addr.into(),
            bot_name: bot_name.into(),
            store,
        }
    }
}

impl Channel for HttpChannel {
    fn id(&self) -> &str {
        &self.channel_id
    }

    fn run(self: Box<Self>, shutdown: CancellationToken) -> ChannelFuture {
        Box::pin(run_http(
            self.channel_id,
            self.bind_addr,
            self.bot_name,
            self.store,
            shutdown,
        ))
    }
}

// ── Server loop ───────────────────────────────────────────────────────────────

async fn run_http(
    channel_id: String,
    bind_addr: String,
    bot_name: String,
    store: Arc<CorpusStore>,
    shutdown: CancellationToken,
) -> Result<(), AppError> {
    let app = router(&bot_name, store);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| AppError::Comms(format!("http bind failed on {bind_addr}: {e}")))?;

    info!(%channel_id, %bind_addr, "http channel listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| AppError::Comms(format!("http server error: {e}")))?;

    info!(%channel_id, "http channel shut down");
    Ok(())
}

/// Build the router. Public so integration tests can drive it without a
/// listener.
pub fn router(bot_name: &str, store: Arc<CorpusStore>) -> Router {
    let state = AxumState {
        bot_name: Arc::from(bot_name),
        store,
    };

    Router::new()
        .route("/", get(index))
        .route("/facts", get(facts))
        .route("/facts/random", get(facts_random))
        .route("/facts/search", get(facts_search))
        .route("/facts/categories", get(facts_categories))
        .route("/facts/category/{name}", get(facts_by_category))
        .route("/facts/{id}", get(fact_by_id))
        .route("/stats", get(stats))
        .with_state(state)
}

// ── Request types ─────────────────────────────────────────────────────────────

/// Numeric params arrive as raw strings and parse leniently: anything
/// unparseable falls back to the operation's default instead of erroring.
#[derive(Deserialize)]
struct PageQuery {
    limit: Option<String>,
    offset: Option<String>,
}

#[derive(Deserialize)]
struct CountQuery {
    count: Option<String>,
}

#[derive(Deserialize)]
struct SearchQuery {
    q: Option<String>,
}

fn lenient_i64(raw: Option<&String>) -> Option<i64> {
    raw.and_then(|s| s.parse().ok())
}

// ── Error mapping ─────────────────────────────────────────────────────────────

fn query_error(err: QueryError) -> Response {
    let status = if err.is_validation() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::NOT_FOUND
    };
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

fn corpus_error(err: &CorpusError) -> Response {
    let status = match err {
        CorpusError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
        CorpusError::Malformed(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

/// Shorthand: the corpus, or an early error response.
macro_rules! corpus_or_bail {
    ($state:expr) => {
        match $state.store.get().await {
            Ok(corpus) => corpus,
            Err(e) => return corpus_error(&e),
        }
    };
}

// ── Handlers ──────────────────────────────────────────────────────────────────

/// GET /
async fn index(State(state): State<AxumState>) -> Response {
    let corpus = corpus_or_bail!(state);
    Json(json!({
        "name": state.bot_name.as_ref(),
        "version": env!("CARGO_PKG_VERSION"),
        "facts": corpus.len(),
        "categories": corpus.categories().len(),
        "endpoints": [
            "/facts",
            "/facts/random",
            "/facts/search",
            "/facts/categories",
            "/facts/category/{name}",
            "/facts/{id}",
            "/stats",
        ],
    }))
    .into_response()
}

/// GET /facts
async fn facts(State(state): State<AxumState>, Query(params): Query<PageQuery>) -> Response {
    let corpus = corpus_or_bail!(state);
    let page = engine::list_page(
        corpus,
        lenient_i64(params.limit.as_ref()),
        lenient_i64(params.offset.as_ref()),
    );
    Json(page).into_response()
}

/// GET /facts/random
async fn facts_random(State(state): State<AxumState>, Query(params): Query<CountQuery>) -> Response {
    let corpus = corpus_or_bail!(state);
    let sample = engine::random_sample(corpus, lenient_i64(params.count.as_ref()));
    Json(json!({ "data": sample })).into_response()
}

/// GET /facts/search
async fn facts_search(State(state): State<AxumState>, Query(params): Query<SearchQuery>) -> Response {
    let corpus = corpus_or_bail!(state);
    match engine::search_text(corpus, params.q.as_deref()) {
        Ok(results) => Json(results).into_response(),
        Err(e) => query_error(e),
    }
}

/// GET /facts/categories
async fn facts_categories(State(state): State<AxumState>) -> Response {
    let corpus = corpus_or_bail!(state);
    Json(engine::list_categories(corpus)).into_response()
}

/// GET /facts/category/{name}
async fn facts_by_category(
    State(state): State<AxumState>,
    Path(name): Path<String>,
) -> Response {
    let corpus = corpus_or_bail!(state);
    match engine::by_category(corpus, &name) {
        Ok(result) => Json(result).into_response(),
        Err(e) => query_error(e),
    }
}

/// GET /facts/{id}
async fn fact_by_id(State(state): State<AxumState>, Path(id): Path<String>) -> Response {
    let corpus = corpus_or_bail!(state);
    match engine::by_id(corpus, &id) {
        Ok(fact) => Json(json!({ "data": fact })).into_response(),
        Err(e) => query_error(e),
    }
}

/// GET /stats
async fn stats(State(state): State<AxumState>) -> Response {
    let corpus = corpus_or_bail!(state);
    Json(engine::stats(corpus)).into_response()
}
