//! Corpus loading and process-wide memoization.
//!
//! A [`CorpusStore`] owns a [`CorpusSource`] and builds the [`Corpus`] at
//! most once. The bundled source parses records compiled into the binary;
//! the remote source fetches them over HTTP exactly once and memoizes the
//! result.
//!
//! # Single-flight, non-poisoning
//!
//! Memoization goes through [`tokio::sync::OnceCell::get_or_try_init`]:
//! concurrent first callers await one load instead of racing their own, and
//! only a *successful* load is cached. A failed fetch is surfaced to that
//! caller alone — the next call fetches again.

use std::time::Duration;

use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::{Corpus, RawFact};

/// Raw records compiled into the binary for the bundled source.
const BUNDLED_FACTS: &str = include_str!("../../data/facts.json");

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum CorpusError {
    /// The remote fact source could not be reached or returned garbage.
    /// Never cached — a later call retries the fetch.
    #[error("upstream fact source unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Bundled data failed to parse. A build-time data bug, not a runtime
    /// condition.
    #[error("malformed fact data: {0}")]
    Malformed(String),
}

// ── Source ────────────────────────────────────────────────────────────────────

/// Where the raw records come from.
#[derive(Debug, Clone)]
pub enum CorpusSource {
    /// Records compiled into the binary from `data/facts.json`.
    Bundled,
    /// Records fetched once from a JSON endpoint.
    Remote { url: String, timeout: Duration },
}

// ── Store ─────────────────────────────────────────────────────────────────────

/// Owns the memoized corpus. Shared across channels as `Arc<CorpusStore>`.
pub struct CorpusStore {
    source: CorpusSource,
    cell: OnceCell<Corpus>,
}

impl CorpusStore {
    pub fn new(source: CorpusSource) -> Self {
        Self {
            source,
            cell: OnceCell::new(),
        }
    }

    /// A store whose corpus is already built — used by tests and callers
    /// that load eagerly at startup.
    pub fn preloaded(corpus: Corpus) -> Self {
        Self {
            source: CorpusSource::Bundled,
            cell: OnceCell::new_with(Some(corpus)),
        }
    }

    /// The corpus, loading it on first call.
    ///
    /// Idempotent: every successful call returns the same allocation.
    pub async fn get(&self) -> Result<&Corpus, CorpusError> {
        self.cell.get_or_try_init(|| self.load()).await
    }

    /// Non-blocking peek at the memoized corpus, if built.
    pub fn cached(&self) -> Option<&Corpus> {
        self.cell.get()
    }

    async fn load(&self) -> Result<Corpus, CorpusError> {
        let records = match &self.source {
            CorpusSource::Bundled => parse_records(BUNDLED_FACTS)
                .map_err(|e| CorpusError::Malformed(e.to_string()))?,
            CorpusSource::Remote { url, timeout } => fetch_records(url, *timeout).await?,
        };

        let corpus = Corpus::from_records(records);
        info!(
            facts = corpus.len(),
            categories = corpus.categories().len(),
            "corpus loaded"
        );
        Ok(corpus)
    }
}

fn parse_records(raw: &str) -> Result<Vec<RawFact>, serde_json::Error> {
    serde_json::from_str(raw)
}

async fn fetch_records(url: &str, timeout: Duration) -> Result<Vec<RawFact>, CorpusError> {
    debug!(%url, "fetching remote corpus");

    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| CorpusError::UpstreamUnavailable(format!("client build failed: {e}")))?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| CorpusError::UpstreamUnavailable(e.to_string()))?
        .error_for_status()
        .map_err(|e| CorpusError::UpstreamUnavailable(e.to_string()))?;

    response
        .json::<Vec<RawFact>>()
        .await
        .map_err(|e| CorpusError::UpstreamUnavailable(format!("bad payload: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bundled_data_parses() {
        let store = CorpusStore::new(CorpusSource::Bundled);
        let corpus = store.get().await.unwrap();
        assert!(!corpus.is_empty());
        // Ids must be exactly 1..=N in source order.
        for (i, fact) in corpus.facts().iter().enumerate() {
            assert_eq!(fact.id, (i + 1) as u32);
            assert!(!fact.text.is_empty());
            assert!(!fact.category.is_empty());
        }
    }

    #[tokio::test]
    async fn get_is_idempotent() {
        let store = CorpusStore::new(CorpusSource::Bundled);
        let first = store.get().await.unwrap();
        let second = store.get().await.unwrap();
        // Same allocation, not merely equal content.
        assert!(std::ptr::eq(first, second));
        assert_eq!(first.categories(), second.categories());
    }

    #[tokio::test]
    async fn failed_fetch_is_not_cached() {
        // Unroutable target: connection refused immediately, no real network.
        let store = CorpusStore::new(CorpusSource::Remote {
            url: "http://127.0.0.1:1/facts.json".to_string(),
            timeout: Duration::from_millis(500),
        });

        let first = store.get().await;
        assert!(matches!(first, Err(CorpusError::UpstreamUnavailable(_))));
        // The failure must not poison the cell — nothing is memoized and a
        // second call attempts the fetch again.
        assert!(store.cached().is_none());
        let second = store.get().await;
        assert!(matches!(second, Err(CorpusError::UpstreamUnavailable(_))));
        assert!(store.cached().is_none());
    }

    #[tokio::test]
    async fn preloaded_store_skips_loading() {
        let store = CorpusStore::preloaded(crate::corpus::fixture());
        assert!(store.cached().is_some());
        let corpus = store.get().await.unwrap();
        assert_eq!(corpus.len(), 5);
    }
}
