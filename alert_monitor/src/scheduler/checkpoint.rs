//! Stage-boundary checks against the live alert collection.
//!
//! Editors may delete or change an alert while it is being polled. Between
//! stages the pipeline re-reads the collection and compares the alert with the
//! revision it started from:
//!
//! - gone, or flagged `deletedDuringProcessing`: the alert's residual files are
//!   removed, a flagged entry is dropped from the collection, nothing is sent;
//! - revision moved on, or flagged `updatedDuringProcessing`: the in-flight
//!   results are discarded and the flag cleared, so a newer edit is not
//!   overwritten.

use tracing::{info, warn};

use crate::{
    models::AlertCollection,
    store::{AlertPaths, JsonStore, JsonStoreExt, StoreResult},
};

/// Why an in-flight poll stopped early.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Abort {
    Deleted,
    Updated,
}

pub(crate) enum Verdict {
    /// Carry on; holds the collection as just read.
    Proceed(AlertCollection),
    Abort(Abort),
}

pub(crate) fn load_alerts(store: &dyn JsonStore, key: &str) -> StoreResult<AlertCollection> {
    Ok(store.load_as(key)?.unwrap_or_default())
}

pub(crate) fn remove_residual_files(store: &dyn JsonStore, paths: &AlertPaths, name: &str) {
    for key in paths.residual(name) {
        match store.delete(&key) {
            Ok(true) => info!(alert = name, key = %key, "removed residual file"),
            Ok(false) => {}
            Err(err) => warn!(alert = name, key = %key, error = %err, "failed to remove residual file"),
        }
    }
}

pub(crate) fn check(
    store: &dyn JsonStore,
    alerts_key: &str,
    paths: &AlertPaths,
    name: &str,
    revision: u64,
    stage: &'static str,
) -> StoreResult<Verdict> {
    let mut alerts = load_alerts(store, alerts_key)?;
    let Some(live) = alerts.find_mut(name) else {
        info!(alert = name, stage, "alert deleted while polling, aborting");
        remove_residual_files(store, paths, name);
        return Ok(Verdict::Abort(Abort::Deleted));
    };

    if live.deleted_during_processing {
        info!(alert = name, stage, "alert flagged for deletion, aborting");
        alerts.remove(name);
        store.save_as(alerts_key, &alerts)?;
        remove_residual_files(store, paths, name);
        return Ok(Verdict::Abort(Abort::Deleted));
    }

    if live.updated_during_processing || live.revision != revision {
        info!(
            alert = name,
            stage,
            started_at = revision,
            live = live.revision,
            "alert updated while polling, discarding results"
        );
        if live.updated_during_processing {
            live.updated_during_processing = false;
            store.save_as(alerts_key, &alerts)?;
        }
        return Ok(Verdict::Abort(Abort::Updated));
    }

    Ok(Verdict::Proceed(alerts))
}
