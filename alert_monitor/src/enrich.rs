//! Full-record lookup for newly seen keys.
//!
//! For each added key the enricher narrows the alert's query to the key's
//! identifier, stores that query under a unique temporary key for the duration
//! of the lookup, pages through the narrowed results and picks the hit whose
//! reference matches. Identifiers alone are not unique enough; several records
//! can share one.

mod normalize;

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use search_client::{
    PageParams, RequestDocuments, RetryError, RetryPolicy, SearchProvider, SearchQuery,
    SearchResult,
};
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::{
    facets::FacetResolver,
    fetcher::search_with_retry,
    models::{DetailRecord, ReferenceKey},
    store::{AlertPaths, JsonStore, StoreError},
};

pub use normalize::{format_date, normalize, public_url};

#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("temporary query document: {0}")]
    Store(#[from] StoreError),

    #[error("temporary query `{0}` disappeared before the lookup")]
    TempQueryMissing(String),

    #[error("detail request failed: {0}")]
    Request(#[from] RetryError),
}

pub struct DetailEnricher {
    provider: Arc<dyn SearchProvider>,
    store: Arc<dyn JsonStore>,
    resolver: Arc<FacetResolver>,
    paths: AlertPaths,
    retry: RetryPolicy,
    page_size: u32,
    concurrency: usize,
}

impl DetailEnricher {
    pub fn new(
        provider: Arc<dyn SearchProvider>,
        store: Arc<dyn JsonStore>,
        resolver: Arc<FacetResolver>,
        paths: AlertPaths,
        retry: RetryPolicy,
        page_size: u32,
        concurrency: usize,
    ) -> Self {
        Self {
            provider,
            store,
            resolver,
            paths,
            retry,
            page_size,
            concurrency,
        }
    }

    /// Enriches every key, at most `concurrency` lookups in flight.
    ///
    /// Records come back in key order. Keys with no matching hit, or whose
    /// lookup failed, are logged and left out.
    pub async fn enrich_all(
        &self,
        alert: &str,
        query: &SearchQuery,
        base: &RequestDocuments,
        keys: &[ReferenceKey],
    ) -> Vec<DetailRecord> {
        let limiter = Semaphore::new(self.concurrency.max(1));
        let lookups = keys.iter().map(|key| {
            let limiter = &limiter;
            async move {
                let _permit = limiter.acquire().await.ok();
                match self.enrich(alert, key, query, base).await {
                    Ok(Some(record)) => Some(record),
                    Ok(None) => {
                        warn!(alert, reference = %key.reference, "no hit matches reference");
                        None
                    }
                    Err(err) => {
                        warn!(alert, reference = %key.reference, error = %err, "detail lookup failed");
                        None
                    }
                }
            }
        });
        let records: Vec<DetailRecord> = join_all(lookups).await.into_iter().flatten().collect();
        info!(alert, requested = keys.len(), enriched = records.len(), "enrichment complete");
        records
    }

    /// Looks up and normalizes one key. `Ok(None)` when no hit carries the
    /// key's reference.
    pub async fn enrich(
        &self,
        alert: &str,
        key: &ReferenceKey,
        query: &SearchQuery,
        base: &RequestDocuments,
    ) -> Result<Option<DetailRecord>, EnrichError> {
        let narrowed = query.with_identifier(&key.identifier);
        let temp = TempQuery::store(&*self.store, self.paths.temp_query(alert), narrowed.as_value())?;
        debug!(alert, key = %temp.key, "temporary query stored");

        let outcome = self.lookup(&temp.key, key, base).await;
        drop(temp);

        Ok(outcome?.map(|hit| {
            let mut record = normalize(&hit, &key.identifier, &self.resolver);
            record.retrieved_at = Some(Utc::now());
            record
        }))
    }

    async fn lookup(
        &self,
        temp_key: &str,
        key: &ReferenceKey,
        base: &RequestDocuments,
    ) -> Result<Option<SearchResult>, EnrichError> {
        let query = self
            .store
            .load(temp_key)?
            .ok_or_else(|| EnrichError::TempQueryMissing(temp_key.to_string()))?;
        let documents = base.with_query(query);
        let provider = &*self.provider;

        let first = search_with_retry(provider, self.retry, None, &documents).await?;
        for page in PageParams::covering(first.total_results, self.page_size) {
            let response = search_with_retry(provider, self.retry, Some(page), &documents).await?;
            if let Some(hit) = response
                .results
                .into_iter()
                .find(|hit| hit.reference.as_deref() == Some(key.reference.as_str()))
            {
                return Ok(Some(hit));
            }
        }
        Ok(None)
    }
}

/// A stored temporary query, removed when dropped. Lookups cancelled
/// mid-flight leave nothing behind.
struct TempQuery<'a> {
    store: &'a dyn JsonStore,
    key: String,
}

impl<'a> TempQuery<'a> {
    fn store(store: &'a dyn JsonStore, key: String, query: &serde_json::Value) -> Result<Self, StoreError> {
        store.save(&key, query)?;
        Ok(Self { store, key })
    }
}

impl Drop for TempQuery<'_> {
    fn drop(&mut self) {
        match self.store.delete(&self.key) {
            Ok(_) => debug!(key = %self.key, "temporary query removed"),
            Err(err) => warn!(key = %self.key, error = %err, "failed to remove temporary query"),
        }
    }
}
