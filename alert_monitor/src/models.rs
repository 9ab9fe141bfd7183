//! Persisted data model: alert definitions, reference keys, detail records and
//! the facet table.

pub mod alert;
pub mod detail;
pub mod facet;
mod lenient;
pub mod reference;

pub use alert::{AlertCollection, AlertDefinition};
pub use detail::DetailRecord;
pub use facet::{FacetEntry, FacetTable};
pub use reference::{ReferenceKey, ResultSnapshot};
