//! reqwest-backed provider for the European Commission search API.

pub mod params;
pub mod provider;

pub use provider::{DEFAULT_FACET_URL, DEFAULT_SEARCH_URL, EcProviderConfig, EcSearchProvider};
