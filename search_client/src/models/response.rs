use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One page of search results.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    #[serde(default)]
    pub total_results: u64,
    #[serde(default)]
    pub page_size: u32,
    #[serde(default)]
    pub page_number: u32,
    #[serde(default)]
    pub results: Vec<SearchResult>,
}

/// A single search hit.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SearchResult {
    /// Stable identity of the hit, used for diffing.
    #[serde(default)]
    pub reference: Option<String>,
    /// Raw source URL; its suffix decides which public URL the record maps to.
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl SearchResult {
    /// First `metadata.identifier` value, if any.
    pub fn identifier(&self) -> Option<String> {
        self.metadata.first("identifier")
    }
}

/// Free-form result metadata.
///
/// Almost every value the API returns is an array of strings, but some come
/// back as scalars, so the accessors accept both shapes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(pub IndexMap<String, Value>);

impl Metadata {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// First non-empty string of `field`.
    pub fn first(&self, field: &str) -> Option<String> {
        self.values(field).into_iter().next()
    }

    /// Every non-empty string of `field`, in order.
    pub fn values(&self, field: &str) -> Vec<String> {
        match self.0.get(field) {
            Some(Value::Array(items)) => items.iter().filter_map(scalar_to_string).collect(),
            Some(other) => scalar_to_string(other).into_iter().collect(),
            None => Vec::new(),
        }
    }

    /// All values of `field` joined with a space, or `None` when the field is absent.
    pub fn text(&self, field: &str) -> Option<String> {
        self.0.get(field)?;
        Some(self.values(field).join(" "))
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}
