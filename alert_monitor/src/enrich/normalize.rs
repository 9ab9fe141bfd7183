use chrono::DateTime;
use search_client::{Metadata, SearchResult};

use crate::{facets::FacetResolver, models::DetailRecord};

const PORTAL: &str = "https://ec.europa.eu/info/funding-tenders/opportunities/portal/screen/opportunities";

const API_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f%z";

/// Reformats an API timestamp as `dd-mm-yyyy`; anything else is returned as is.
pub fn format_date(raw: &str) -> String {
    DateTime::parse_from_str(raw, API_DATE_FORMAT)
        .map(|dt| dt.format("%d-%m-%Y").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

/// Public portal page of a hit. Topic documents (`.json` sources) are
/// addressed by identifier, everything else by its call-cluster id.
pub fn public_url(hit: &SearchResult, identifier: &str) -> String {
    if hit.url.ends_with(".json") {
        format!("{PORTAL}/topic-details/{identifier}")
    } else {
        let cluster = hit.metadata.first("callccm2Id").unwrap_or_default();
        format!("{PORTAL}/competitive-calls-cs/{cluster}")
    }
}

/// Builds the human-facing record of `hit`. `retrieved_at` is left unset.
pub fn normalize(hit: &SearchResult, identifier: &str, facets: &FacetResolver) -> DetailRecord {
    let md = &hit.metadata;
    let label = |field: &str| coded(md, field, facets);

    DetailRecord {
        title: md.values("title").join(", "),
        starting_date: md.first("startDate").map(|d| format_date(&d)).unwrap_or_default(),
        deadline: md.first("deadlineDate").map(|d| format_date(&d)).unwrap_or_default(),
        kind: label("type"),
        status: label("status"),
        framework_programme: label("frameworkProgramme"),
        url: public_url(hit, identifier),
        identifier: identifier.to_string(),
        reference: hit.reference.clone().unwrap_or_default(),
        summary: hit.summary.clone().unwrap_or_default(),
        keywords: md.values("keywords"),
        destination: label("destination"),
        focus_area: label("focusArea"),
        destination_details: md.values("destinationDetails"),
        destination_group: label("destinationGroup"),
        call_title: md.values("callTitle").join(", "),
        description: md.text("descriptionByte").unwrap_or_default(),
        programme_division: label("programmeDivision"),
        cross_cutting_priorities: md.values("crossCuttingPriorities"),
        types_of_action: md.values("typesOfAction"),
        tags: md.values("tags"),
        retrieved_at: None,
    }
}

/// Label of the field's first code; empty when the hit has no such field.
fn coded(md: &Metadata, field: &str, facets: &FacetResolver) -> String {
    match md.first(field) {
        Some(code) => facets.label_for(&code, field),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        models::{FacetEntry, FacetTable},
        store::MemoryStore,
    };
    use serde_json::json;

    fn resolver() -> FacetResolver {
        let resolver = FacetResolver::new(Arc::new(MemoryStore::new()), "facet.json");
        let mut table = FacetTable::new();
        table.insert("status", vec![FacetEntry::new("31094502", "Open for submission")]);
        table.insert("type", vec![FacetEntry::new("1", "Calls for proposals")]);
        resolver.replace(table);
        resolver
    }

    fn hit(url: &str) -> SearchResult {
        serde_json::from_value(json!({
            "reference": "REF-1",
            "url": url,
            "summary": "Short summary",
            "metadata": {
                "identifier": ["HORIZON-CL5-2025-01"],
                "title": ["Clean hydrogen"],
                "startDate": ["2025-01-15T00:00:00.000+0100"],
                "deadlineDate": "not a date",
                "type": ["1"],
                "status": ["31094502"],
                "frameworkProgramme": ["43108390"],
                "callccm2Id": ["1234567"],
                "keywords": ["hydrogen", "electrolysers"],
                "descriptionByte": ["<p>Long", "text</p>"]
            }
        }))
        .unwrap()
    }

    #[test]
    fn dates_reformat_or_pass_through() {
        assert_eq!(format_date("2025-01-15T00:00:00.000+0100"), "15-01-2025");
        assert_eq!(format_date("soon"), "soon");
    }

    #[test]
    fn url_depends_on_source_suffix() {
        let topic = hit("https://example.org/topics/HORIZON-CL5-2025-01.json");
        assert_eq!(
            public_url(&topic, "HORIZON-CL5-2025-01"),
            format!("{PORTAL}/topic-details/HORIZON-CL5-2025-01")
        );
        let cascade = hit("https://example.org/calls/1234567");
        assert_eq!(
            public_url(&cascade, "HORIZON-CL5-2025-01"),
            format!("{PORTAL}/competitive-calls-cs/1234567")
        );
    }

    #[test]
    fn coded_fields_are_labelled_or_passed_through() {
        let record = normalize(&hit("x.json"), "HORIZON-CL5-2025-01", &resolver());
        assert_eq!(record.kind, "Calls for proposals");
        assert_eq!(record.status, "Open for submission");
        assert_eq!(record.framework_programme, "43108390");
        assert_eq!(record.destination, "");
        assert_eq!(record.starting_date, "15-01-2025");
        assert_eq!(record.deadline, "not a date");
        assert_eq!(record.title, "Clean hydrogen");
        assert_eq!(record.reference, "REF-1");
        assert_eq!(record.keywords, vec!["hydrogen", "electrolysers"]);
        assert_eq!(record.description, "<p>Long text</p>");
    }
}
