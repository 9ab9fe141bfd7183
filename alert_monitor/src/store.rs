//! JSON document store.
//!
//! Everything the monitor persists (the alert collection, per-alert snapshots
//! and query mirrors, the facet table, outgoing messages) is a named JSON
//! document behind [`JsonStore`]. Keys are `/`-separated relative paths such as
//! `alerts/hydrogen.json`.
//!
//! - [`FsStore`] maps keys onto a data directory and writes atomically.
//! - [`MemoryStore`] keeps documents in a map, for tests and dry runs.
//! - [`AlertPaths`] derives every per-alert key from the alert name.

mod fs;
mod memory;
mod paths;

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use search_client::RequestDocuments;
use search_client::models::documents::{default_languages, default_sort};

pub use fs::FsStore;
pub use memory::MemoryStore;
pub use paths::AlertPaths;

/// Errors raised by a [`JsonStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid store key `{0}`")]
    InvalidKey(String),

    #[error("I/O error on `{key}`: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{key}` is not valid JSON for the expected shape: {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Load/save port over named JSON documents.
pub trait JsonStore: Send + Sync {
    /// The document under `key`, or `None` when it does not exist.
    fn load(&self, key: &str) -> StoreResult<Option<Value>>;

    /// Replaces the document under `key`. Readers never observe a partial write.
    fn save(&self, key: &str, value: &Value) -> StoreResult<()>;

    /// Removes `key`; returns whether anything was there.
    fn delete(&self, key: &str) -> StoreResult<bool>;

    fn exists(&self, key: &str) -> StoreResult<bool>;
}

/// Typed helpers available on every store.
pub trait JsonStoreExt: JsonStore {
    fn load_as<T: DeserializeOwned>(&self, key: &str) -> StoreResult<Option<T>> {
        self.load(key)?
            .map(|value| {
                serde_json::from_value(value).map_err(|source| StoreError::Json {
                    key: key.to_string(),
                    source,
                })
            })
            .transpose()
    }

    fn save_as<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> StoreResult<()> {
        let value = serde_json::to_value(value).map_err(|source| StoreError::Json {
            key: key.to_string(),
            source,
        })?;
        self.save(key, &value)
    }
}

impl<S: JsonStore + ?Sized> JsonStoreExt for S {}

/// Rejects empty keys, absolute keys and any `..` or empty segment.
pub(crate) fn validate_key(key: &str) -> StoreResult<()> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..");
    if bad {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// The languages and sort documents sent with every search, read from the
/// store and falling back to the built-in defaults when absent or unreadable.
pub fn load_request_documents<S: JsonStore + ?Sized>(
    store: &S,
    languages_key: &str,
    sort_key: &str,
) -> RequestDocuments {
    let languages = load_or(store, languages_key, default_languages);
    let sort = load_or(store, sort_key, default_sort);
    RequestDocuments {
        query: Value::Null,
        languages,
        sort: Some(sort),
    }
}

fn load_or<S: JsonStore + ?Sized>(store: &S, key: &str, fallback: fn() -> Value) -> Value {
    match store.load(key) {
        Ok(Some(value)) => value,
        Ok(None) => fallback(),
        Err(err) => {
            warn!(key, error = %err, "unreadable request document, using default");
            fallback()
        }
    }
}
