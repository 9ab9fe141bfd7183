//! Structured boolean query documents.
//!
//! The monitor treats a query as an opaque JSON document. The only structural
//! edit it ever makes is appending exact-match clauses to `bool.must`, which is
//! how a detail lookup narrows an alert's query down to one identifier.
//!
//! [`build_query`] is the pure filter-description → query translation used by
//! whatever surface creates alerts.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Type codes selected when a filter names none.
pub const DEFAULT_TYPES: [&str; 3] = ["1", "2", "8"];

/// Status codes selected when a filter names none (forthcoming, open, closed).
pub const DEFAULT_STATUSES: [&str; 3] = ["31094501", "31094502", "31094503"];

/// Fields searched by the free-text part of a filter.
pub const TEXT_SEARCH_FIELDS: [&str; 15] = [
    "identifier",
    "keywords",
    "tags",
    "typesOfAction",
    "title",
    "callTitle",
    "projectAcronym",
    "projectName",
    "description",
    "furtherInformation",
    "missionDescription",
    "missionDetails",
    "destinationDescription",
    "destinationDetails",
    "duration",
];

/// A search query document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchQuery(pub Value);

impl SearchQuery {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// True for `null` or `{}`, i.e. nothing that could be sent as a query.
    pub fn is_empty(&self) -> bool {
        match &self.0 {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            _ => false,
        }
    }

    /// Clone of this query with one exact-match `identifier` clause appended to
    /// `bool.must` per comma-separated identifier.
    ///
    /// The original query is left untouched. A query whose `bool` or `must`
    /// is missing (or of the wrong shape) gets one created.
    pub fn with_identifier(&self, identifiers: &str) -> SearchQuery {
        let mut value = self.0.clone();
        if !value.is_object() {
            value = Value::Object(Map::new());
        }

        let ids = identifiers
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty());

        for id in ids {
            must_clauses(&mut value).push(json!({
                "text": {
                    "query": id,
                    "fields": ["identifier"],
                    "defaultOperator": "AND"
                }
            }));
        }
        SearchQuery(value)
    }

    /// Identifiers pinned by exact-match clauses added with [`Self::with_identifier`].
    pub fn identifier_clauses(&self) -> Vec<String> {
        let Some(must) = self.0.pointer("/bool/must").and_then(Value::as_array) else {
            return Vec::new();
        };
        must.iter()
            .filter_map(|clause| clause.get("text"))
            .filter(|text| {
                text.get("fields")
                    .and_then(Value::as_array)
                    .is_some_and(|f| f.len() == 1 && f[0] == "identifier")
            })
            .filter_map(|text| text.get("query").and_then(Value::as_str))
            .map(str::to_string)
            .collect()
    }
}

impl From<Value> for SearchQuery {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Returns `bool.must` as a mutable array, creating or replacing whatever
/// was there if it had the wrong shape.
fn must_clauses(value: &mut Value) -> &mut Vec<Value> {
    let root = ensure_object(value);
    let bool_node = ensure_object(root.entry("bool").or_insert_with(|| json!({})));
    let must = bool_node.entry("must").or_insert_with(|| json!([]));
    if !must.is_array() {
        *must = json!([]);
    }
    match must {
        Value::Array(items) => items,
        _ => unreachable!("must was just normalized to an array"),
    }
}

fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was just normalized to an object"),
    }
}

/// Inclusive bounds for a date range filter (epoch milliseconds).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gte: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lte: Option<i64>,
}

impl DateRange {
    fn is_unbounded(&self) -> bool {
        self.gte.is_none() && self.lte.is_none()
    }
}

/// User-facing description of what an alert should match.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterSpec {
    pub types: Vec<String>,
    pub statuses: Vec<String>,
    pub framework_programme: Option<String>,
    pub call_identifier: Option<String>,
    pub start_date: Option<DateRange>,
    pub deadline: Option<DateRange>,
    pub text: Option<String>,
}

/// Translates a [`FilterSpec`] into the boolean filter tree the API expects.
///
/// Types and statuses fall back to [`DEFAULT_TYPES`] / [`DEFAULT_STATUSES`];
/// every other filter is only emitted when present.
pub fn build_query(spec: &FilterSpec) -> SearchQuery {
    let mut must = Vec::new();

    let types = non_empty_or(&spec.types, &DEFAULT_TYPES);
    let statuses = non_empty_or(&spec.statuses, &DEFAULT_STATUSES);
    must.push(json!({ "terms": { "type": types } }));
    must.push(json!({ "terms": { "status": statuses } }));

    if let Some(programme) = non_blank(&spec.framework_programme) {
        must.push(text_clause("frameworkProgramme", programme));
    }
    if let Some(call) = non_blank(&spec.call_identifier) {
        must.push(text_clause("callIdentifier", call));
    }
    if let Some(range) = spec.start_date.filter(|r| !r.is_unbounded()) {
        must.push(range_clause("startDate", range));
    }
    if let Some(range) = spec.deadline.filter(|r| !r.is_unbounded()) {
        must.push(range_clause("deadlineDate", range));
    }
    if let Some(text) = non_blank(&spec.text) {
        let should: Vec<Value> = TEXT_SEARCH_FIELDS
            .iter()
            .map(|field| json!({ "phrase": { "query": text, "field": field } }))
            .collect();
        must.push(json!({ "bool": { "should": should } }));
    }

    SearchQuery(json!({ "bool": { "must": must } }))
}

fn non_empty_or(values: &[String], fallback: &[&str]) -> Vec<String> {
    let cleaned: Vec<String> = values
        .iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect();
    if cleaned.is_empty() {
        fallback.iter().map(|v| v.to_string()).collect()
    } else {
        cleaned
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn text_clause(field: &str, query: &str) -> Value {
    json!({
        "text": {
            "query": query,
            "fields": [field],
            "defaultOperator": "AND"
        }
    })
}

fn range_clause(field: &str, range: DateRange) -> Value {
    let mut bounds = Map::new();
    if let Some(gte) = range.gte {
        bounds.insert("gte".into(), json!(gte));
    }
    if let Some(lte) = range.lte {
        bounds.insert("lte".into(), json!(lte));
    }
    json!({ "range": { field: bounds } })
}
