use indexmap::IndexMap;
use search_client::SearchQuery;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Value, json};
use tracing::warn;

use crate::models::DetailRecord;

/// Default per-record notification template.
pub const DEFAULT_MESSAGE: &str = "<strong>{title}</strong>\r\n{summary}\r\n\r\n\
Starting date : <em>{starting_date}</em>\r\nDeadline: <em>{deadline}</em>\r\n\r\n\
Type : {type}\r\nStatus: {status}\r\n\r\n\
Framework programme : {frameworkProgramme}\r\n\r\nMore information : {url}";

/// Poll interval used when an alert does not set one.
pub const DEFAULT_INTERVAL_MINUTES: u64 = 60;

/// A named watch over the search API.
///
/// Owned by whatever edits the alert collection; the scheduler only ever
/// rewrites `lastDetails`, `totalResults` and the two advisory flags. Fields
/// this type does not know about are kept in `extra` and written back
/// untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertDefinition {
    #[serde(default)]
    pub name: String,
    /// Minutes between polls; `None` uses the configured default.
    #[serde(default, deserialize_with = "minutes", skip_serializing_if = "Option::is_none")]
    pub interval: Option<u64>,
    #[serde(default)]
    pub query: SearchQuery,
    /// Include terms, plus exclusions prefixed with `!`.
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub emails: Vec<String>,
    #[serde(default)]
    pub message: String,
    /// Most recent detail records first.
    #[serde(default)]
    pub last_details: Vec<DetailRecord>,
    #[serde(default)]
    pub total_results: u64,
    /// Bumped by editors on every change to the definition.
    #[serde(default)]
    pub revision: u64,
    #[serde(default, skip_serializing_if = "is_false")]
    pub deleted_during_processing: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub updated_during_processing: bool,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl AlertDefinition {
    /// A new alert over the default open/forthcoming/closed calls query.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            interval: Some(DEFAULT_INTERVAL_MINUTES),
            query: SearchQuery::new(json!({
                "bool": { "must": [
                    { "terms": { "type": ["1", "8", "2"] } },
                    { "terms": { "status": ["31094503", "31094502", "31094501"] } }
                ] }
            })),
            message: DEFAULT_MESSAGE.to_string(),
            ..Default::default()
        }
    }

    /// Poll interval in minutes, `default` when unset.
    pub fn interval_minutes(&self, default: u64) -> u64 {
        self.interval.unwrap_or(default)
    }

    /// The template to render with, falling back to [`DEFAULT_MESSAGE`].
    pub fn template(&self) -> &str {
        if self.message.trim().is_empty() {
            DEFAULT_MESSAGE
        } else {
            &self.message
        }
    }

    /// Prepends `details` (kept in their given order) and drops the oldest
    /// entries beyond `cap`.
    pub fn push_history(&mut self, details: Vec<DetailRecord>, cap: usize) {
        let older = std::mem::take(&mut self.last_details);
        self.last_details = details.into_iter().chain(older).take(cap).collect();
    }
}

/// The alert collection as stored.
///
/// Decoded entry by entry: an entry that is not a valid alert is logged,
/// skipped by every lookup and written back verbatim, so one malformed entry
/// neither stops the other alerts nor loses the editor's data.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AlertCollection {
    entries: Vec<Entry>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
enum Entry {
    Alert(AlertDefinition),
    Malformed(Value),
}

impl AlertCollection {
    pub fn from_values(values: Vec<Value>) -> Self {
        let entries = values
            .into_iter()
            .enumerate()
            .map(|(index, value)| match AlertDefinition::deserialize(&value) {
                Ok(alert) => Entry::Alert(alert),
                Err(err) => {
                    warn!(index, error = %err, "malformed alert entry skipped");
                    Entry::Malformed(value)
                }
            })
            .collect();
        Self { entries }
    }

    /// The decodable alerts, in collection order.
    pub fn alerts(&self) -> impl Iterator<Item = &AlertDefinition> {
        self.entries.iter().filter_map(|entry| match entry {
            Entry::Alert(alert) => Some(alert),
            Entry::Malformed(_) => None,
        })
    }

    pub fn find(&self, name: &str) -> Option<&AlertDefinition> {
        self.alerts().find(|a| a.name == name)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut AlertDefinition> {
        self.entries.iter_mut().find_map(|entry| match entry {
            Entry::Alert(alert) if alert.name == name => Some(alert),
            _ => None,
        })
    }

    /// Drops the first alert called `name`; other entries keep their order.
    pub fn remove(&mut self, name: &str) -> Option<AlertDefinition> {
        let pos = self
            .entries
            .iter()
            .position(|entry| matches!(entry, Entry::Alert(a) if a.name == name))?;
        match self.entries.remove(pos) {
            Entry::Alert(alert) => Some(alert),
            Entry::Malformed(_) => None,
        }
    }
}

impl FromIterator<AlertDefinition> for AlertCollection {
    fn from_iter<I: IntoIterator<Item = AlertDefinition>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(Entry::Alert).collect(),
        }
    }
}

impl<'de> Deserialize<'de> for AlertCollection {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        Ok(Self::from_values(Vec::<Value>::deserialize(d)?))
    }
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

/// Form-edited collections store the interval as a string; zero, negative
/// or unparseable values count as unset.
fn minutes<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
    let parsed = match Value::deserialize(d)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    Ok(parsed.filter(|m| *m > 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_form_edited_collection() {
        let alerts: Vec<AlertDefinition> = serde_json::from_value(json!([
            {
                "name": "hydrogen",
                "interval": "15",
                "query": { "bool": { "must": [] } },
                "keywords": ["hydrogen", "!nuclear"],
                "emails": ["ops@example.org"],
                "file_paths": { "query": "data/alerts/hydrogen_query.json" }
            },
            { "name": "defaults", "interval": "" }
        ]))
        .unwrap();

        assert_eq!(alerts[0].interval_minutes(60), 15);
        assert_eq!(alerts[1].interval, None);
        assert_eq!(alerts[1].interval_minutes(45), 45);
        assert!(alerts[0].extra.contains_key("file_paths"));

        let back = serde_json::to_value(&alerts[0]).unwrap();
        assert_eq!(back["file_paths"]["query"], "data/alerts/hydrogen_query.json");
        assert!(back.get("deletedDuringProcessing").is_none());
    }

    #[test]
    fn history_is_newest_first_and_capped() {
        let mut alert = AlertDefinition::new("a");
        let record = |r: &str| DetailRecord {
            reference: r.into(),
            ..Default::default()
        };
        alert.push_history(vec![record("1"), record("2")], 3);
        alert.push_history(vec![record("3"), record("4")], 3);

        let refs: Vec<_> = alert.last_details.iter().map(|d| d.reference.as_str()).collect();
        assert_eq!(refs, vec!["3", "4", "1"]);
    }

    #[test]
    fn blank_message_uses_default_template() {
        let mut alert = AlertDefinition::new("a");
        alert.message = "  ".into();
        assert_eq!(alert.template(), DEFAULT_MESSAGE);
    }

    #[test]
    fn malformed_entries_are_skipped_and_kept() {
        let raw = json!([
            { "name": "good", "interval": 15 },
            { "name": "bad", "keywords": "hydrogen" },
            { "interval": 60, "emails": [] }
        ]);
        let mut alerts: AlertCollection = serde_json::from_value(raw.clone()).unwrap();

        let names: Vec<_> = alerts.alerts().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["good", ""]);
        assert!(alerts.find("bad").is_none());

        alerts.find_mut("good").unwrap().total_results = 7;
        let back = serde_json::to_value(&alerts).unwrap();
        assert_eq!(back[0]["totalResults"], 7);
        assert_eq!(back[1], raw[1]);
        assert_eq!(back.as_array().unwrap().len(), 3);

        assert_eq!(alerts.remove("good").unwrap().name, "good");
        assert!(alerts.remove("bad").is_none());
        assert_eq!(serde_json::to_value(&alerts).unwrap()[0], raw[1]);
    }
}
