//! Wiring of the monitor's components from a [`MonitorConfig`].

use std::sync::Arc;

use anyhow::Context;
use search_client::{SearchProvider, providers::ec_rest::EcSearchProvider};
use tracing::info;

use crate::{
    config::MonitorConfig,
    enrich::DetailEnricher,
    facets::{FacetRefresher, FacetResolver},
    fetcher::Fetcher,
    notify::{NotificationTransport, OutboxTransport},
    scheduler::Scheduler,
    store::{FsStore, JsonStore},
};

/// Every long-lived component, sharing one store, provider and resolver.
pub struct Monitor {
    pub store: Arc<dyn JsonStore>,
    pub resolver: Arc<FacetResolver>,
    pub scheduler: Scheduler,
    pub refresher: FacetRefresher,
}

impl Monitor {
    /// Builds the production stack: filesystem store under `data_dir`, the
    /// HTTP search provider and the outbox transport.
    pub fn from_config(config: &MonitorConfig) -> anyhow::Result<Self> {
        let provider: Arc<dyn SearchProvider> = Arc::new(
            EcSearchProvider::new(config.provider_config()).context("create search provider")?,
        );
        let store: Arc<dyn JsonStore> = Arc::new(FsStore::new(config.data_dir.clone()));
        let transport: Arc<dyn NotificationTransport> =
            Arc::new(OutboxTransport::new(store.clone(), config.files.outbox.clone()));
        info!(data_dir = %config.data_dir.display(), "monitor configured");
        Ok(Self::assemble(config, provider, store, transport))
    }

    /// Builds the stack around the given collaborators.
    pub fn assemble(
        config: &MonitorConfig,
        provider: Arc<dyn SearchProvider>,
        store: Arc<dyn JsonStore>,
        transport: Arc<dyn NotificationTransport>,
    ) -> Self {
        let resolver = Arc::new(FacetResolver::new(store.clone(), config.files.facets.clone()));
        let retry = config.retry_policy();

        let fetcher = Fetcher::new(provider.clone(), retry, config.fetch_limits());
        let enricher = DetailEnricher::new(
            provider.clone(),
            store.clone(),
            resolver.clone(),
            config.alert_paths(),
            retry,
            config.polling.page_size,
            config.polling.enrich_concurrency,
        );
        let scheduler = Scheduler::new(
            store.clone(),
            fetcher,
            enricher,
            resolver.clone(),
            transport,
            config.alert_paths(),
            config.scheduler_settings(),
        );
        let refresher = FacetRefresher::new(
            provider,
            store.clone(),
            resolver.clone(),
            retry,
            config.facet_keys(),
            config.facet_refresh_interval(),
        );

        Self {
            store,
            resolver,
            scheduler,
            refresher,
        }
    }
}
