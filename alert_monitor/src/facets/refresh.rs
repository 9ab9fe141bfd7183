use std::{future::Future, sync::Arc, time::Duration};

use search_client::{
    Attempt, RequestDocuments, RetryError, RetryPolicy, SearchProvider,
    models::{
        documents::default_languages,
        facet::FacetResponse,
        query::{FilterSpec, build_query},
    },
};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::{
    facets::FacetResolver,
    models::{FacetEntry, FacetTable},
    store::{JsonStore, JsonStoreExt, StoreError},
};

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("facet request failed: {0}")]
    Request(#[from] RetryError),

    #[error("facet endpoint returned no facets")]
    Empty,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Store keys the refresh reads from and writes to.
#[derive(Clone, Debug)]
pub struct FacetKeys {
    /// Query document selecting which facets to list.
    pub query: String,
    pub languages: String,
    /// Where the facet table is saved.
    pub table: String,
}

pub struct FacetRefresher {
    provider: Arc<dyn SearchProvider>,
    store: Arc<dyn JsonStore>,
    resolver: Arc<FacetResolver>,
    retry: RetryPolicy,
    keys: FacetKeys,
    interval: Duration,
}

impl FacetRefresher {
    pub fn new(
        provider: Arc<dyn SearchProvider>,
        store: Arc<dyn JsonStore>,
        resolver: Arc<FacetResolver>,
        retry: RetryPolicy,
        keys: FacetKeys,
        interval: Duration,
    ) -> Self {
        Self {
            provider,
            store,
            resolver,
            retry,
            keys,
            interval,
        }
    }

    /// Fetches the facet listing, saves the table and reloads the resolver.
    /// Returns the number of fields saved.
    ///
    /// An empty listing is rejected so a bad response never wipes a good table.
    pub async fn refresh_once(&self) -> Result<usize, RefreshError> {
        let documents = self.documents()?;
        let provider = &*self.provider;
        let documents = &documents;
        let response = self
            .retry
            .run("facets", |_| async move {
                Attempt::from(provider.facets(documents).await)
            })
            .await?;

        let table = table_from_response(response);
        if table.is_empty() {
            return Err(RefreshError::Empty);
        }
        let fields = table.fields().count();
        self.store.save_as(&self.keys.table, &table)?;
        self.resolver.replace(table);
        info!(fields, key = %self.keys.table, "facet table refreshed");
        Ok(fields)
    }

    /// Refreshes immediately, then every interval, until `shutdown` resolves.
    /// Failures are logged and retried on the next interval.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("facet refresh stopping");
                    return;
                }
                _ = ticker.tick() => {
                    if let Err(err) = self.refresh_once().await {
                        error!(error = %err, "facet refresh failed");
                    }
                }
            }
        }
    }

    fn documents(&self) -> Result<RequestDocuments, StoreError> {
        let query = self
            .store
            .load(&self.keys.query)?
            .unwrap_or_else(|| build_query(&FilterSpec::default()).into_value());
        let languages = self
            .store
            .load(&self.keys.languages)?
            .unwrap_or_else(default_languages);
        Ok(RequestDocuments {
            query,
            languages,
            sort: None,
        })
    }
}

/// Flattens the facet listing into a table, skipping nameless facets and
/// values missing either half of the pair.
pub fn table_from_response(response: FacetResponse) -> FacetTable {
    let mut table = FacetTable::new();
    for facet in response.facets {
        let Some(name) = facet.name.filter(|n| !n.is_empty()) else {
            warn!("facet without a name ignored");
            continue;
        };
        let entries = facet
            .values
            .into_iter()
            .filter_map(|v| Some(FacetEntry::new(v.raw_value?, v.value?)))
            .collect();
        table.insert(name, entries);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn skips_nameless_facets_and_partial_values() {
        let response: FacetResponse = serde_json::from_value(json!({
            "facets": [
                { "name": "type", "values": [
                    { "rawValue": "1", "value": "Calls for proposals" },
                    { "rawValue": "2" }
                ] },
                { "values": [ { "rawValue": "x", "value": "y" } ] }
            ]
        }))
        .unwrap();

        let table = table_from_response(response);
        assert_eq!(table.fields().collect::<Vec<_>>(), vec!["type"]);
        assert_eq!(table.entries("type").unwrap().len(), 1);
    }
}
