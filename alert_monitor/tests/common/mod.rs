#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use alert_monitor::{
    app::Monitor,
    config::MonitorConfig,
    models::AlertDefinition,
    notify::{NotificationTransport, OutgoingMessage, TransportError},
    store::{JsonStore, JsonStoreExt, MemoryStore},
};
use async_trait::async_trait;
use search_client::{
    PageParams, ProviderError, RequestDocuments, SearchProvider, SearchQuery, SearchResponse,
    SearchResult, models::facet::FacetResponse, providers::StatusSnafu,
};
use serde_json::json;

/// One request seen by [`ScriptedProvider`].
#[derive(Clone, Debug)]
pub struct Call {
    pub page: Option<u32>,
    /// Identifiers pinned by the request's query; empty for alert-wide searches.
    pub identifiers: Vec<String>,
}

impl Call {
    pub fn is_detail_lookup(&self) -> bool {
        !self.identifiers.is_empty()
    }
}

type Hook = Box<dyn Fn(&Call) + Send + Sync>;

/// In-memory search backend.
///
/// Serves a mutable list of hits, paginated like the real API. Queries that
/// pin identifiers only see hits carrying one of them. Records every call,
/// tracks the peak number of concurrent requests, can fail chosen pages and
/// runs an optional hook on every request.
pub struct ScriptedProvider {
    hits: Mutex<Vec<SearchResult>>,
    delay: Duration,
    /// page number -> remaining failures on alert-wide searches
    failing_pages: Mutex<HashMap<u32, u32>>,
    fail_detail_lookups: AtomicBool,
    calls: Mutex<Vec<Call>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    hook: Mutex<Option<Hook>>,
    facets: Mutex<FacetResponse>,
}

impl ScriptedProvider {
    pub fn new(hits: Vec<SearchResult>) -> Self {
        Self::with_delay(hits, Duration::ZERO)
    }

    pub fn with_delay(hits: Vec<SearchResult>, delay: Duration) -> Self {
        Self {
            hits: Mutex::new(hits),
            delay,
            failing_pages: Mutex::new(HashMap::new()),
            fail_detail_lookups: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            hook: Mutex::new(None),
            facets: Mutex::new(FacetResponse::default()),
        }
    }

    pub fn push(&self, hit: SearchResult) {
        self.hits.lock().unwrap().push(hit);
    }

    /// Makes `page` of alert-wide searches fail `times` times (`u32::MAX` = forever).
    pub fn fail_page(&self, page: u32, times: u32) {
        self.failing_pages.lock().unwrap().insert(page, times);
    }

    pub fn fail_detail_lookups(&self, fail: bool) {
        self.fail_detail_lookups.store(fail, Ordering::SeqCst);
    }

    pub fn on_request(&self, hook: impl Fn(&Call) + Send + Sync + 'static) {
        *self.hook.lock().unwrap() = Some(Box::new(hook));
    }

    pub fn set_facets(&self, facets: FacetResponse) {
        *self.facets.lock().unwrap() = facets;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Paged (not count) requests of alert-wide searches.
    pub fn page_requests(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.page.is_some() && !c.is_detail_lookup())
            .count()
    }

    pub fn detail_lookups(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.page.is_none() && c.is_detail_lookup())
            .count()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
        self.max_in_flight.store(0, Ordering::SeqCst);
    }

    fn should_fail(&self, call: &Call) -> bool {
        if call.is_detail_lookup() {
            return self.fail_detail_lookups.load(Ordering::SeqCst);
        }
        let Some(page) = call.page else {
            return false;
        };
        let mut failing = self.failing_pages.lock().unwrap();
        match failing.get_mut(&page) {
            None | Some(&mut 0) => false,
            Some(&mut u32::MAX) => true,
            Some(left) => {
                *left -= 1;
                true
            }
        }
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl SearchProvider for ScriptedProvider {
    async fn search(
        &self,
        page: Option<PageParams>,
        documents: &RequestDocuments,
    ) -> Result<SearchResponse, ProviderError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let call = Call {
            page: page.map(|p| p.page_number),
            identifiers: SearchQuery::new(documents.query.clone()).identifier_clauses(),
        };
        self.calls.lock().unwrap().push(call.clone());
        if let Some(hook) = self.hook.lock().unwrap().as_ref() {
            hook(&call);
        }

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if self.should_fail(&call) {
            return StatusSnafu {
                status: 503u16,
                body: "scripted failure",
            }
            .fail();
        }

        let matching: Vec<SearchResult> = self
            .hits
            .lock()
            .unwrap()
            .iter()
            .filter(|hit| {
                call.identifiers.is_empty()
                    || hit
                        .identifier()
                        .is_some_and(|id| call.identifiers.contains(&id))
            })
            .cloned()
            .collect();

        let total_results = matching.len() as u64;
        let results = match page {
            None => Vec::new(),
            Some(p) => {
                let start = ((p.page_number - 1) * p.page_size) as usize;
                matching
                    .into_iter()
                    .skip(start)
                    .take(p.page_size as usize)
                    .collect()
            }
        };
        Ok(SearchResponse {
            total_results,
            page_size: page.map(|p| p.page_size).unwrap_or(0),
            page_number: page.map(|p| p.page_number).unwrap_or(0),
            results,
        })
    }

    async fn facets(&self, _documents: &RequestDocuments) -> Result<FacetResponse, ProviderError> {
        Ok(self.facets.lock().unwrap().clone())
    }
}

/// Transport double that records what it was asked to send.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<OutgoingMessage>>,
    fail: AtomicBool,
}

impl RecordingTransport {
    pub fn sent(&self) -> Vec<OutgoingMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl NotificationTransport for RecordingTransport {
    async fn send(&self, message: &OutgoingMessage) -> Result<(), TransportError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(TransportError::Rejected("scripted failure".into()));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// A topic hit whose identifier is derived from its reference.
pub fn hit(reference: &str) -> SearchResult {
    hit_with_identifier(reference, &format!("ID-{reference}"))
}

pub fn hit_with_identifier(reference: &str, identifier: &str) -> SearchResult {
    serde_json::from_value(json!({
        "reference": reference,
        "url": format!("https://example.org/topics/{identifier}.json"),
        "summary": format!("Summary of {reference}"),
        "metadata": {
            "identifier": [identifier],
            "title": [format!("Title {reference}")],
            "startDate": ["2025-03-01T00:00:00.000+0100"],
            "deadlineDate": ["2025-09-01T17:00:00.000+0200"],
            "type": ["1"],
            "status": ["31094502"],
            "descriptionByte": [format!("Description of {reference}")]
        }
    }))
    .unwrap()
}

pub fn hits(n: usize) -> Vec<SearchResult> {
    (0..n).map(|i| hit(&format!("R{i:04}"))).collect()
}

/// Defaults with every pause and backoff removed.
pub fn fast_config() -> MonitorConfig {
    let mut config = MonitorConfig::default();
    config.polling.retry_base_delay_ms = 0;
    config.polling.batch_pause_ms = 0;
    config
}

pub struct Harness {
    pub config: MonitorConfig,
    pub store: Arc<MemoryStore>,
    pub provider: Arc<ScriptedProvider>,
    pub transport: Arc<RecordingTransport>,
    pub monitor: Monitor,
}

impl Harness {
    pub fn new(provider: ScriptedProvider) -> Self {
        let config = fast_config();
        let store = Arc::new(MemoryStore::new());
        let provider = Arc::new(provider);
        let transport = Arc::new(RecordingTransport::default());
        let monitor = Monitor::assemble(&config, provider.clone(), store.clone(), transport.clone());
        Self {
            config,
            store,
            provider,
            transport,
            monitor,
        }
    }

    pub fn seed_alerts(&self, alerts: &[AlertDefinition]) {
        self.store.save_as(&self.config.files.alerts, alerts).unwrap();
    }

    pub fn alerts(&self) -> Vec<AlertDefinition> {
        self.store.load_as(&self.config.files.alerts).unwrap().unwrap_or_default()
    }

    pub fn snapshot_refs(&self, name: &str) -> Option<Vec<String>> {
        let key = self.config.alert_paths().snapshot(name);
        let keys: Option<Vec<serde_json::Value>> = self.store.load_as(&key).unwrap();
        keys.map(|ks| {
            ks.iter()
                .map(|k| k["reference"].as_str().unwrap().to_string())
                .collect()
        })
    }

    pub fn temp_queries(&self) -> Vec<String> {
        self.store
            .keys()
            .into_iter()
            .filter(|k| k.ends_with("_query_tmp.json"))
            .collect()
    }
}

/// An alert that will notify `ops@example.org`.
pub fn alert(name: &str) -> AlertDefinition {
    let mut alert = AlertDefinition::new(name);
    alert.emails = vec!["ops@example.org".into()];
    alert
}

pub fn store_contains(store: &dyn JsonStore, key: &str) -> bool {
    store.exists(key).unwrap()
}
