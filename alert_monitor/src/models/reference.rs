use search_client::SearchResult;
use serde::{Deserialize, Serialize};

use crate::models::lenient;

/// Identity of one search hit.
///
/// `reference` is the stable key used for diffing; `identifier` is only used to
/// look the record up again when it needs enriching.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReferenceKey {
    /// Stable identity, unique within one snapshot.
    pub reference: String,
    /// Human-facing call/topic identifier; older snapshots stored it as a list.
    #[serde(default, deserialize_with = "lenient::first")]
    pub identifier: String,
}

impl ReferenceKey {
    /// Builds a key from its two parts.
    pub fn new(reference: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            identifier: identifier.into(),
        }
    }

    /// Key of a search hit, or `None` when it lacks a reference or an identifier.
    pub fn from_result(result: &SearchResult) -> Option<Self> {
        let reference = result.reference.as_deref().filter(|r| !r.is_empty())?;
        let identifier = result.identifier()?;
        Some(Self::new(reference, identifier))
    }
}

/// The ordered keys fetched for one alert on one successful poll.
pub type ResultSnapshot = Vec<ReferenceKey>;
