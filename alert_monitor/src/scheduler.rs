//! Polling cadence and the per-alert pipeline.
//!
//! Every tick the scheduler reads the alert collection, forgets alerts that
//! have disappeared since the last tick, and polls each alert whose interval
//! has elapsed:
//!
//! ```text
//! mirror check → fetch → diff → checkpoint → enrich → checkpoint → notify → checkpoint → persist
//! ```
//!
//! Enrichment and notification only happen when the query mirror already
//! matched the alert's query. A brand-new or just-edited alert therefore
//! records its first snapshot silently instead of reporting every existing
//! record as new. The mirror is only updated together with that snapshot, so
//! the silence carries over until a poll of the new query actually completes.
//!
//! A fetch failure leaves the previous snapshot alone; the alert is retried on
//! its normal interval.

mod checkpoint;
mod mirror;

use std::{
    collections::{HashMap, HashSet},
    fmt,
    future::Future,
    sync::Arc,
    time::Duration,
};

use chrono::{DateTime, TimeDelta, Utc};
use search_client::RequestDocuments;
use tracing::{debug, error, info, warn};

use crate::{
    diff::make_diff,
    enrich::DetailEnricher,
    facets::FacetResolver,
    fetcher::{Fetcher, ResultSet},
    filter::KeywordFilter,
    models::{AlertCollection, AlertDefinition, DetailRecord, ReferenceKey},
    notify::{NotificationTransport, OutgoingMessage, render, subject},
    store::{AlertPaths, JsonStore, JsonStoreExt, StoreResult, load_request_documents},
};

pub use checkpoint::Abort;
pub use mirror::MirrorState;

use checkpoint::{Verdict, check, load_alerts, remove_residual_files};

/// How one poll of one alert ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PollOutcome {
    /// Nothing new; the snapshot was refreshed.
    NoChanges,
    /// The query was new or edited, so the snapshot was recorded without
    /// notifying about its `added` keys.
    Suppressed { added: usize },
    /// New keys were found. `records` were enriched; `delivered` is false when
    /// there was nothing to send, no recipient, or the transport failed.
    Notified {
        added: usize,
        records: usize,
        delivered: bool,
    },
    /// The alert was deleted or edited mid-poll; nothing was persisted.
    Aborted(Abort),
    /// The poll could not complete; the previous snapshot is untouched.
    Failed(String),
}

impl fmt::Display for PollOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollOutcome::NoChanges => write!(f, "no changes"),
            PollOutcome::Suppressed { added } => {
                write!(f, "first poll of this query, {added} result(s) recorded silently")
            }
            PollOutcome::Notified {
                added,
                records,
                delivered,
            } => write!(
                f,
                "{added} new result(s), {records} enriched, {}",
                if *delivered { "notification sent" } else { "nothing delivered" }
            ),
            PollOutcome::Aborted(Abort::Deleted) => write!(f, "aborted: alert deleted"),
            PollOutcome::Aborted(Abort::Updated) => write!(f, "aborted: alert updated"),
            PollOutcome::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SchedulerSettings {
    pub tick: Duration,
    /// Poll interval for alerts that do not set one.
    pub default_interval_minutes: u64,
    pub history_cap: usize,
    pub subject_prefix: String,
    pub max_body_chars: usize,
    /// Store key of the alert collection.
    pub alerts_key: String,
    pub languages_key: String,
    pub sort_key: String,
}

pub struct Scheduler {
    store: Arc<dyn JsonStore>,
    fetcher: Fetcher,
    enricher: DetailEnricher,
    resolver: Arc<FacetResolver>,
    transport: Arc<dyn NotificationTransport>,
    paths: AlertPaths,
    settings: SchedulerSettings,
    last_checked: HashMap<String, DateTime<Utc>>,
    known: HashSet<String>,
}

enum Stage {
    Continue(AlertCollection),
    Stop(PollOutcome),
}

impl Scheduler {
    pub fn new(
        store: Arc<dyn JsonStore>,
        fetcher: Fetcher,
        enricher: DetailEnricher,
        resolver: Arc<FacetResolver>,
        transport: Arc<dyn NotificationTransport>,
        paths: AlertPaths,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            store,
            fetcher,
            enricher,
            resolver,
            transport,
            paths,
            settings,
            last_checked: HashMap::new(),
            known: HashSet::new(),
        }
    }

    pub fn last_checked(&self, name: &str) -> Option<DateTime<Utc>> {
        self.last_checked.get(name).copied()
    }

    /// Ticks every `settings.tick` until `shutdown` resolves. A tick in
    /// progress is dropped at its next await point; a poll interrupted before
    /// persisting is repeated in full on the next start.
    pub async fn run(&mut self, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);
        let mut ticker = tokio::time::interval(self.settings.tick);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("scheduler stopping");
                    return;
                }
                _ = ticker.tick() => {
                    tokio::select! {
                        _ = &mut shutdown => {
                            info!("scheduler stopping, current tick interrupted");
                            return;
                        }
                        _ = self.tick(Utc::now()) => {}
                    }
                }
            }
        }
    }

    /// One pass over the collection: housekeeping, then every due alert in
    /// collection order.
    pub async fn tick(&mut self, now: DateTime<Utc>) -> Vec<(String, PollOutcome)> {
        let alerts = match load_alerts(&*self.store, &self.settings.alerts_key) {
            Ok(alerts) => alerts,
            Err(err) => {
                error!(error = %err, "cannot read alert collection");
                return Vec::new();
            }
        };
        let alerts = unique_named(alerts.alerts().cloned().collect());
        self.housekeeping(&alerts);

        let due: Vec<AlertDefinition> = alerts.into_iter().filter(|a| self.is_due(a, now)).collect();
        if due.is_empty() {
            return Vec::new();
        }

        let base = self.base_documents();
        let mut outcomes = Vec::with_capacity(due.len());
        for alert in due {
            let outcome = self.poll_and_record(&alert, &base, now).await;
            outcomes.push((alert.name, outcome));
        }
        outcomes
    }

    /// Polls `name` right away, regardless of its interval.
    pub async fn check_now(&mut self, name: &str) -> StoreResult<Option<PollOutcome>> {
        let alerts = load_alerts(&*self.store, &self.settings.alerts_key)?;
        let Some(alert) = alerts.find(name).cloned() else {
            return Ok(None);
        };
        let base = self.base_documents();
        Ok(Some(self.poll_and_record(&alert, &base, Utc::now()).await))
    }

    fn is_due(&self, alert: &AlertDefinition, now: DateTime<Utc>) -> bool {
        match self.last_checked.get(&alert.name) {
            None => true,
            Some(last) => {
                let minutes = alert.interval_minutes(self.settings.default_interval_minutes);
                let minutes = i64::try_from(minutes).unwrap_or(i64::MAX);
                let interval = TimeDelta::try_minutes(minutes).unwrap_or(TimeDelta::MAX);
                now.signed_duration_since(*last) >= interval
            }
        }
    }

    /// Forgets alerts that left the collection since the previous tick and
    /// removes their residual files.
    fn housekeeping(&mut self, alerts: &[AlertDefinition]) {
        let current: HashSet<String> = alerts.iter().map(|a| a.name.clone()).collect();
        for gone in self.known.difference(&current) {
            info!(alert = %gone, "alert removed, no longer tracking");
            self.last_checked.remove(gone);
            remove_residual_files(&*self.store, &self.paths, gone);
        }
        self.known = current;
    }

    fn base_documents(&self) -> RequestDocuments {
        load_request_documents(
            &*self.store,
            &self.settings.languages_key,
            &self.settings.sort_key,
        )
    }

    async fn poll_and_record(
        &mut self,
        alert: &AlertDefinition,
        base: &RequestDocuments,
        now: DateTime<Utc>,
    ) -> PollOutcome {
        info!(alert = %alert.name, "checking alert");
        let outcome = self.poll_alert(alert, base).await;
        match &outcome {
            PollOutcome::Failed(reason) => error!(alert = %alert.name, %reason, "poll failed"),
            other => info!(alert = %alert.name, outcome = %other, "poll finished"),
        }
        self.known.insert(alert.name.clone());
        self.last_checked.insert(alert.name.clone(), now);
        outcome
    }

    /// Runs the full pipeline for one alert.
    pub async fn poll_alert(&self, alert: &AlertDefinition, base: &RequestDocuments) -> PollOutcome {
        let name = alert.name.as_str();
        let revision = alert.revision;

        if alert.query.is_empty() {
            return PollOutcome::Failed("alert has no query".into());
        }

        let mirror = match mirror::compare_mirror(&*self.store, &self.paths.mirror(name), &alert.query) {
            Ok(state) => state,
            Err(err) => return PollOutcome::Failed(format!("query mirror: {err}")),
        };

        let documents = base.with_query(alert.query.as_value().clone());
        let filter = KeywordFilter::new(&alert.keywords);
        let fetched = match self.fetcher.fetch(&documents, &filter).await {
            Ok(set) => set,
            Err(err) => return PollOutcome::Failed(err.to_string()),
        };

        let previous = self.previous_snapshot(name);
        let diff = make_diff(previous.as_deref(), &fetched.keys);
        info!(alert = name, added = diff.added.len(), removed = diff.removed.len(), "diffed");
        if !diff.is_noop() {
            debug!(alert = name, "result changes:\n{diff}");
        }

        if let Stage::Stop(outcome) = self.checkpoint(name, revision, "before enrichment") {
            return outcome;
        }

        let notify = mirror.allows_notification();
        let records = if notify && !diff.added.is_empty() {
            if let Err(err) = self.resolver.reload() {
                warn!(alert = name, error = %err, "facet table reload failed, using cached table");
            }
            self.enricher
                .enrich_all(name, &alert.query, &documents, &diff.added)
                .await
        } else {
            Vec::new()
        };

        if let Stage::Stop(outcome) = self.checkpoint(name, revision, "after enrichment") {
            return outcome;
        }

        let delivered = if records.is_empty() {
            false
        } else {
            self.dispatch(alert, &records).await
        };

        let alerts = match self.checkpoint(name, revision, "before persisting") {
            Stage::Continue(alerts) => alerts,
            Stage::Stop(outcome) => return outcome,
        };

        let enriched = records.len();
        if let Err(err) = self.persist(alerts, alert, mirror, &fetched, records) {
            return PollOutcome::Failed(format!("persisting results: {err}"));
        }

        match (notify, diff.added.len()) {
            (false, added) => PollOutcome::Suppressed { added },
            (true, 0) => PollOutcome::NoChanges,
            (true, added) => PollOutcome::Notified {
                added,
                records: enriched,
                delivered,
            },
        }
    }

    fn checkpoint(&self, name: &str, revision: u64, stage: &'static str) -> Stage {
        match check(
            &*self.store,
            &self.settings.alerts_key,
            &self.paths,
            name,
            revision,
            stage,
        ) {
            Ok(Verdict::Proceed(alerts)) => Stage::Continue(alerts),
            Ok(Verdict::Abort(reason)) => Stage::Stop(PollOutcome::Aborted(reason)),
            Err(err) => Stage::Stop(PollOutcome::Failed(format!("alert collection: {err}"))),
        }
    }

    /// Missing or unreadable snapshots both mean "nothing seen before".
    fn previous_snapshot(&self, name: &str) -> Option<Vec<ReferenceKey>> {
        match self.store.load_as(&self.paths.snapshot(name)) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(alert = name, error = %err, "unreadable snapshot, treating as empty history");
                None
            }
        }
    }

    /// Sends the rendered records. Failures are logged only: the records are
    /// considered seen either way.
    async fn dispatch(&self, alert: &AlertDefinition, records: &[DetailRecord]) -> bool {
        if alert.emails.is_empty() {
            info!(alert = %alert.name, "no recipients, skipping notification");
            return false;
        }
        let message = OutgoingMessage {
            alert: alert.name.clone(),
            subject: subject(&self.settings.subject_prefix, &alert.name, records.len()),
            html_body: render(records, alert.template(), self.settings.max_body_chars),
            recipients: alert.emails.clone(),
            created_at: Utc::now(),
        };
        match self.transport.send(&message).await {
            Ok(()) => {
                info!(alert = %alert.name, records = records.len(), "notification sent");
                true
            }
            Err(err) => {
                error!(alert = %alert.name, error = %err, "notification failed");
                false
            }
        }
    }

    /// Writes the snapshot and, for a new query, its mirror, then the alert's
    /// count and history into the collection read at the last checkpoint.
    fn persist(
        &self,
        mut alerts: AlertCollection,
        alert: &AlertDefinition,
        mirror: MirrorState,
        fetched: &ResultSet,
        records: Vec<DetailRecord>,
    ) -> StoreResult<()> {
        let name = alert.name.as_str();
        self.store.save_as(&self.paths.snapshot(name), &fetched.keys)?;
        mirror::record_mirror(&*self.store, &self.paths.mirror(name), &alert.query, mirror)?;

        if let Some(live) = alerts.find_mut(name) {
            live.total_results = fetched.total_results;
            if !records.is_empty() {
                live.push_history(records, self.settings.history_cap);
            }
            self.store.save_as(&self.settings.alerts_key, &alerts)?;
        }
        Ok(())
    }
}

/// Drops unnamed alerts and later duplicates of a name.
fn unique_named(alerts: Vec<AlertDefinition>) -> Vec<AlertDefinition> {
    let mut seen = HashSet::new();
    alerts
        .into_iter()
        .filter(|a| {
            if a.name.trim().is_empty() {
                warn!("alert without a name ignored");
                return false;
            }
            if !seen.insert(a.name.clone()) {
                warn!(alert = %a.name, "duplicate alert name ignored");
                return false;
            }
            true
        })
        .collect()
}
