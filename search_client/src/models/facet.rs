use serde::{Deserialize, Serialize};

/// Response of the facet-listing endpoint.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FacetResponse {
    #[serde(default)]
    pub facets: Vec<Facet>,
}

/// One coded field and its enumerated values.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Facet {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub values: Vec<FacetValue>,
}

/// A `(code, label)` pair as the API spells it.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetValue {
    /// Machine code.
    #[serde(default)]
    pub raw_value: Option<String>,
    /// Human label.
    #[serde(default)]
    pub value: Option<String>,
}
