use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One `(code, label)` pair of a coded field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetEntry {
    /// Machine code as sent to and returned by the API.
    pub raw_value: String,
    /// Human label.
    pub value: String,
}

impl FacetEntry {
    pub fn new(raw_value: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            raw_value: raw_value.into(),
            value: value.into(),
        }
    }
}

/// Field name → ordered code/label pairs.
///
/// On disk the table keeps its historical shape, a list of single-key maps
/// (`[{"status": [{"rawValue": .., "value": ..}]}, ..]`); in memory it is a
/// plain ordered map. Repeated field names in the file are merged.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<IndexMap<String, Vec<FacetEntry>>>")]
#[serde(into = "Vec<IndexMap<String, Vec<FacetEntry>>>")]
pub struct FacetTable {
    fields: IndexMap<String, Vec<FacetEntry>>,
}

impl FacetTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, entries: Vec<FacetEntry>) {
        self.fields.entry(field.into()).or_default().extend(entries);
    }

    pub fn entries(&self, field: &str) -> Option<&[FacetEntry]> {
        self.fields.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Label of `code` in `field`, if both are known.
    pub fn label_for(&self, field: &str, code: &str) -> Option<&str> {
        self.entries(field)?
            .iter()
            .find(|e| e.raw_value == code)
            .map(|e| e.value.as_str())
    }

    /// Code of `label` in `field`, if both are known.
    pub fn code_for(&self, field: &str, label: &str) -> Option<&str> {
        self.entries(field)?
            .iter()
            .find(|e| e.value == label)
            .map(|e| e.raw_value.as_str())
    }
}

impl From<Vec<IndexMap<String, Vec<FacetEntry>>>> for FacetTable {
    fn from(list: Vec<IndexMap<String, Vec<FacetEntry>>>) -> Self {
        let mut table = FacetTable::new();
        for (field, entries) in list.into_iter().flatten() {
            table.insert(field, entries);
        }
        table
    }
}

impl From<FacetTable> for Vec<IndexMap<String, Vec<FacetEntry>>> {
    fn from(table: FacetTable) -> Self {
        table
            .fields
            .into_iter()
            .map(|(field, entries)| IndexMap::from([(field, entries)]))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_list_of_single_key_maps() {
        let table: FacetTable = serde_json::from_value(json!([
            { "status": [ { "rawValue": "31094502", "value": "Open for submission" } ] },
            { "type": [ { "rawValue": "1", "value": "Calls for proposals" } ] },
            { "status": [ { "rawValue": "31094503", "value": "Closed" } ] }
        ]))
        .unwrap();

        assert_eq!(table.fields().collect::<Vec<_>>(), vec!["status", "type"]);
        assert_eq!(table.label_for("status", "31094503"), Some("Closed"));
        assert_eq!(table.code_for("type", "Calls for proposals"), Some("1"));
        assert_eq!(table.label_for("status", "0"), None);
        assert_eq!(table.label_for("nope", "1"), None);
    }

    #[test]
    fn writes_historical_shape() {
        let mut table = FacetTable::new();
        table.insert("status", vec![FacetEntry::new("31094501", "Forthcoming")]);
        assert_eq!(
            serde_json::to_value(&table).unwrap(),
            json!([{ "status": [ { "rawValue": "31094501", "value": "Forthcoming" } ] }])
        );
    }
}
