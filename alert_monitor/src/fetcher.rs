//! Paginated retrieval of an alert's complete result-key set.
//!
//! A fetch first asks for the total result count, then requests every page
//! concurrently, at most `page_concurrency` in flight. Each request is retried
//! by the [`RetryPolicy`]; a page that still fails sinks the whole fetch. A
//! partial key set is never returned, since diffing against one would report
//! every missing record as removed.

use std::{sync::Arc, time::Duration};

use futures::future::try_join_all;
use indexmap::IndexMap;
use search_client::{
    Attempt, PageParams, RequestDocuments, RetryError, RetryPolicy, SearchProvider,
    SearchResponse, models::request_params::page_count,
};
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::{filter::KeywordFilter, models::ReferenceKey};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("result count request failed: {0}")]
    Count(#[source] RetryError),

    #[error("page {page}/{pages} failed: {source}")]
    Page {
        page: u32,
        pages: u32,
        #[source]
        source: RetryError,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FetchLimits {
    pub page_size: u32,
    /// Maximum simultaneous page requests.
    pub page_concurrency: usize,
    /// Pause after the page batch completes.
    pub batch_pause: Duration,
}

impl Default for FetchLimits {
    fn default() -> Self {
        Self {
            page_size: search_client::models::request_params::DEFAULT_PAGE_SIZE,
            page_concurrency: 10,
            batch_pause: Duration::from_secs(1),
        }
    }
}

/// The deduplicated, keyword-filtered keys of one complete fetch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResultSet {
    /// Unfiltered count reported by the API.
    pub total_results: u64,
    pub keys: Vec<ReferenceKey>,
}

pub struct Fetcher {
    provider: Arc<dyn SearchProvider>,
    retry: RetryPolicy,
    limits: FetchLimits,
}

impl Fetcher {
    pub fn new(provider: Arc<dyn SearchProvider>, retry: RetryPolicy, limits: FetchLimits) -> Self {
        Self {
            provider,
            retry,
            limits,
        }
    }

    /// Fetches every page of `documents.query` and returns the keys of the hits
    /// that pass `filter`, first occurrence of each reference kept.
    pub async fn fetch(
        &self,
        documents: &RequestDocuments,
        filter: &KeywordFilter,
    ) -> Result<ResultSet, FetchError> {
        let first = search_with_retry(&*self.provider, self.retry, None, documents)
            .await
            .map_err(FetchError::Count)?;
        let total_results = first.total_results;
        let pages = page_count(total_results, self.limits.page_size);
        info!(total_results, pages, "fetching result pages");

        let limiter = Semaphore::new(self.limits.page_concurrency.max(1));
        let requests = PageParams::covering(total_results, self.limits.page_size).map(|page| {
            let limiter = &limiter;
            async move {
                // The limiter is never closed, so acquisition cannot fail.
                let _permit = limiter.acquire().await.ok();
                let response =
                    search_with_retry(&*self.provider, self.retry, Some(page), documents)
                        .await
                        .map_err(|source| FetchError::Page {
                            page: page.page_number,
                            pages,
                            source,
                        })?;
                debug!(page = page.page_number, pages, hits = response.results.len(), "fetched page");
                Ok::<_, FetchError>(keep_matching(response, filter))
            }
        });
        let per_page = try_join_all(requests).await?;

        let keys = dedup(per_page.into_iter().flatten());

        if !self.limits.batch_pause.is_zero() {
            tokio::time::sleep(self.limits.batch_pause).await;
        }
        info!(total_results, unique = keys.len(), "fetch complete");
        Ok(ResultSet {
            total_results,
            keys,
        })
    }
}

/// One search request under `retry`.
pub(crate) async fn search_with_retry(
    provider: &dyn SearchProvider,
    retry: RetryPolicy,
    page: Option<PageParams>,
    documents: &RequestDocuments,
) -> Result<SearchResponse, RetryError> {
    let label = match page {
        Some(p) => format!("search page {}", p.page_number),
        None => "search count".to_string(),
    };
    retry
        .run(&label, |_| async move {
            Attempt::from(provider.search(page, documents).await)
        })
        .await
}

fn keep_matching(response: SearchResponse, filter: &KeywordFilter) -> Vec<ReferenceKey> {
    response
        .results
        .iter()
        .filter(|hit| filter.accepts(hit))
        .filter_map(ReferenceKey::from_result)
        .collect()
}

/// Coalesces repeated references, keeping the first occurrence in page order.
fn dedup(keys: impl IntoIterator<Item = ReferenceKey>) -> Vec<ReferenceKey> {
    let mut unique: IndexMap<String, ReferenceKey> = IndexMap::new();
    let mut duplicates = Vec::new();
    for key in keys {
        if unique.contains_key(&key.reference) {
            duplicates.push(key.reference);
        } else {
            unique.insert(key.reference.clone(), key);
        }
    }
    if !duplicates.is_empty() {
        warn!(count = duplicates.len(), ?duplicates, "duplicate references across pages");
    }
    unique.into_values().collect()
}
