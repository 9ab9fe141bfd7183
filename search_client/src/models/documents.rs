//! The JSON documents sent as multipart parts with every request.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Languages document used when none is configured.
pub fn default_languages() -> Value {
    json!(["en"])
}

/// Sort document used when none is configured.
pub fn default_sort() -> Value {
    json!({ "field": "startDate", "order": "DESC" })
}

/// The documents a search or facet request carries in its multipart body.
///
/// `query` is the structured boolean filter tree; the other two are fixed
/// auxiliary specs. Facet requests send no sort document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RequestDocuments {
    pub query: Value,
    pub languages: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<Value>,
}

impl RequestDocuments {
    /// Search documents with the default languages and sort specs.
    pub fn for_query(query: Value) -> Self {
        Self {
            query,
            languages: default_languages(),
            sort: Some(default_sort()),
        }
    }

    /// Replaces the query, keeping the auxiliary documents.
    pub fn with_query(&self, query: Value) -> Self {
        Self {
            query,
            languages: self.languages.clone(),
            sort: self.sort.clone(),
        }
    }

    /// `(part name, document)` pairs in the order they go on the wire.
    pub fn parts(&self) -> Vec<(&'static str, &Value)> {
        let mut parts = vec![("query", &self.query), ("languages", &self.languages)];
        if let Some(sort) = &self.sort {
            parts.push(("sort", sort));
        }
        parts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn facet_documents_have_no_sort_part() {
        let docs = RequestDocuments {
            query: json!({"bool": {"must": []}}),
            languages: default_languages(),
            sort: None,
        };
        let names: Vec<_> = docs.parts().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["query", "languages"]);

        let search = RequestDocuments::for_query(json!({}));
        let names: Vec<_> = search.parts().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["query", "languages", "sort"]);
    }
}
