//! Code ↔ label translation for the API's coded fields.
//!
//! [`FacetResolver`] answers lookups from an in-memory snapshot of the facet
//! table; [`FacetRefresher`] periodically rebuilds that table from the facet
//! endpoint, saves it and swaps the new snapshot in.

mod refresh;
mod resolver;

pub use refresh::{FacetKeys, FacetRefresher, RefreshError, table_from_response};
pub use resolver::FacetResolver;
