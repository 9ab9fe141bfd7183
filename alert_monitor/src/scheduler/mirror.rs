use search_client::SearchQuery;
use tracing::{info, warn};

use crate::store::{JsonStore, StoreError, StoreResult};

/// State of an alert's query mirror before this poll.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MirrorState {
    /// The mirror already matched the alert's query.
    Unchanged,
    /// There was no mirror yet.
    Created,
    /// The mirror differed or was unreadable.
    Rewritten,
}

impl MirrorState {
    /// Notifications are only sent for a query that was already being watched.
    pub fn allows_notification(self) -> bool {
        self == MirrorState::Unchanged
    }
}

/// Compares the mirror under `key` with `query` without touching it.
pub(crate) fn compare_mirror(
    store: &dyn JsonStore,
    key: &str,
    query: &SearchQuery,
) -> StoreResult<MirrorState> {
    match store.load(key) {
        Ok(Some(stored)) if stored == *query.as_value() => Ok(MirrorState::Unchanged),
        Ok(Some(_)) => {
            info!(key, "query changed since the last recorded poll");
            Ok(MirrorState::Rewritten)
        }
        Ok(None) => {
            info!(key, "no query mirror yet");
            Ok(MirrorState::Created)
        }
        Err(StoreError::Json { source, .. }) => {
            warn!(key, error = %source, "unreadable query mirror, treating the query as new");
            Ok(MirrorState::Rewritten)
        }
        Err(err) => Err(err),
    }
}

/// Records `query` as the watched one. Only called once the poll's snapshot
/// is stored, so a poll that fails or aborts leaves the next one silent too.
pub(crate) fn record_mirror(
    store: &dyn JsonStore,
    key: &str,
    query: &SearchQuery,
    state: MirrorState,
) -> StoreResult<()> {
    if state == MirrorState::Unchanged {
        return Ok(());
    }
    store.save(key, query.as_value())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    #[test]
    fn compare_reads_and_record_writes() {
        let store = MemoryStore::new();
        let key = "alerts/queries/a.json";
        let q1 = SearchQuery::new(json!({"bool": {"must": [{"terms": {"type": ["1"]}}]}}));
        let q2 = SearchQuery::new(json!({"bool": {"must": [{"terms": {"type": ["2"]}}]}}));

        assert_eq!(compare_mirror(&store, key, &q1).unwrap(), MirrorState::Created);
        assert!(!store.exists(key).unwrap());

        record_mirror(&store, key, &q1, MirrorState::Created).unwrap();
        assert_eq!(compare_mirror(&store, key, &q1).unwrap(), MirrorState::Unchanged);

        assert_eq!(compare_mirror(&store, key, &q2).unwrap(), MirrorState::Rewritten);
        assert_eq!(store.load(key).unwrap(), Some(q1.as_value().clone()));
        record_mirror(&store, key, &q2, MirrorState::Rewritten).unwrap();
        assert_eq!(store.load(key).unwrap(), Some(q2.into_value()));
    }
}
