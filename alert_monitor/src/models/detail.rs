use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::lenient;

/// Fully enriched, human-labelled view of one newly seen search hit.
///
/// Coded fields (`kind`, `status`, programme and destination fields) hold
/// labels when the facet table knows the code, and the raw code otherwise.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DetailRecord {
    #[serde(deserialize_with = "lenient::text")]
    pub title: String,
    /// `dd-mm-yyyy` when the API date parsed, the raw value otherwise.
    #[serde(rename = "starting_date", deserialize_with = "lenient::text")]
    pub starting_date: String,
    #[serde(deserialize_with = "lenient::text")]
    pub deadline: String,
    #[serde(rename = "type", deserialize_with = "lenient::text")]
    pub kind: String,
    #[serde(deserialize_with = "lenient::text")]
    pub status: String,
    #[serde(deserialize_with = "lenient::text")]
    pub framework_programme: String,
    /// Public portal URL.
    #[serde(deserialize_with = "lenient::text")]
    pub url: String,
    #[serde(deserialize_with = "lenient::text")]
    pub identifier: String,
    #[serde(deserialize_with = "lenient::text")]
    pub reference: String,
    #[serde(deserialize_with = "lenient::text")]
    pub summary: String,
    #[serde(deserialize_with = "lenient::list")]
    pub keywords: Vec<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub destination: String,
    #[serde(deserialize_with = "lenient::text")]
    pub focus_area: String,
    #[serde(deserialize_with = "lenient::list")]
    pub destination_details: Vec<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub destination_group: String,
    #[serde(deserialize_with = "lenient::text")]
    pub call_title: String,
    #[serde(rename = "descriptionByte", deserialize_with = "lenient::text")]
    pub description: String,
    #[serde(deserialize_with = "lenient::text")]
    pub programme_division: String,
    #[serde(deserialize_with = "lenient::list")]
    pub cross_cutting_priorities: Vec<String>,
    #[serde(deserialize_with = "lenient::list")]
    pub types_of_action: Vec<String>,
    #[serde(deserialize_with = "lenient::list")]
    pub tags: Vec<String>,
    /// When the record was enriched; stamped as it enters an alert's history.
    #[serde(rename = "retrieved_at", deserialize_with = "retrieved_at")]
    pub retrieved_at: Option<DateTime<Utc>>,
}

/// Older histories stamped records as `dd-mm-yyyy HH:MM:SS` local strings; those
/// are read as UTC, anything unparseable is dropped.
fn retrieved_at<'de, D>(d: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(d)?;
    Ok(raw.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                chrono::NaiveDateTime::parse_from_str(&s, "%d-%m-%Y %H:%M:%S")
                    .ok()
                    .map(|naive| naive.and_utc())
            })
    }))
}
