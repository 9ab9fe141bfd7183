//! Client for the funding & tenders search API.
//!
//! The crate is split the same way the monitor consumes it:
//! - [`models`] holds the wire types (query documents, page params, responses).
//! - [`providers`] defines the [`providers::SearchProvider`] seam and the
//!   reqwest-backed implementation.
//! - [`retry`] turns single attempts into a bounded retry loop whose outcome the
//!   caller inspects on exhaustion.

pub mod models;
pub mod providers;
pub mod retry;

pub use models::documents::RequestDocuments;
pub use models::query::SearchQuery;
pub use models::request_params::PageParams;
pub use models::response::{Metadata, SearchResponse, SearchResult};
pub use providers::{ProviderError, SearchProvider};
pub use retry::{Attempt, RetryError, RetryPolicy};
