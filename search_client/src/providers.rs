//! Provider abstraction for the search backend.
//!
//! This module defines the [`SearchProvider`] trait, the single seam between the
//! monitor and the remote search/facet API. The production implementation lives
//! in [`ec_rest`]; tests substitute instrumented doubles.
//!
//! A provider call is exactly **one attempt**. Retrying is the caller's business
//! (see [`crate::retry`]), which is why every [`ProviderError`] can say whether it
//! is worth retrying.
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use search_client::models::{
//!     documents::RequestDocuments, facet::FacetResponse, request_params::PageParams,
//!     response::SearchResponse,
//! };
//! use search_client::providers::{ProviderError, SearchProvider};
//!
//! struct EmptyProvider;
//!
//! #[async_trait]
//! impl SearchProvider for EmptyProvider {
//!     async fn search(
//!         &self,
//!         _page: Option<PageParams>,
//!         _documents: &RequestDocuments,
//!     ) -> Result<SearchResponse, ProviderError> {
//!         Ok(SearchResponse::default())
//!     }
//!
//!     async fn facets(&self, _documents: &RequestDocuments) -> Result<FacetResponse, ProviderError> {
//!         Ok(FacetResponse::default())
//!     }
//! }
//! ```

pub mod ec_rest;

use async_trait::async_trait;
use snafu::{Backtrace, Snafu};

use crate::models::{
    documents::RequestDocuments, facet::FacetResponse, request_params::PageParams,
    response::SearchResponse,
};

/// Trait for issuing requests against the search backend.
///
/// Implementations must be shareable across the concurrent page fetches and
/// enrichments of one poll cycle.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Runs one search request.
    ///
    /// # Arguments
    ///
    /// * `page` - `None` for the initial count request, otherwise the page to fetch.
    /// * `documents` - query, languages and sort documents for the multipart body.
    async fn search(
        &self,
        page: Option<PageParams>,
        documents: &RequestDocuments,
    ) -> Result<SearchResponse, ProviderError>;

    /// Lists the facets (coded fields and their labels) selected by `documents.query`.
    async fn facets(&self, documents: &RequestDocuments) -> Result<FacetResponse, ProviderError>;
}

/// Errors that can occur during the creation of a provider instance
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderInitError {
    /// failed to init reqwest client
    #[snafu(display("Failed to build HTTP client: {source}"))]
    ClientBuild {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// The API key is empty.
    #[snafu(display("API key must not be empty"))]
    EmptyApiKey { backtrace: Backtrace },

    /// An endpoint URL is empty.
    #[snafu(display("Endpoint `{name}` must not be empty"))]
    EmptyEndpoint { name: String, backtrace: Backtrace },
}

/// Errors that can occur within a `SearchProvider` implementation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderError {
    /// Network failure, timeout, or a body that could not be read.
    #[snafu(display("API request failed: {source}"))]
    Transport {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// The API answered with a non-success status.
    #[snafu(display("API returned HTTP {status}: {body}"))]
    Status {
        status: u16,
        body: String,
        backtrace: Backtrace,
    },

    /// The API answered 2xx but the payload did not decode.
    #[snafu(display("Malformed API payload ({source}); starts with: {preview}"))]
    Decode {
        source: serde_json::Error,
        preview: String,
        backtrace: Backtrace,
    },

    /// A request document could not be serialized.
    #[snafu(display("Failed to encode request document `{part}`: {source}"))]
    Document {
        part: String,
        source: serde_json::Error,
        backtrace: Backtrace,
    },

    /// The request itself could not be assembled (bad URL, bad multipart part).
    #[snafu(display("Failed to build request: {source}"))]
    Build {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// An error during provider configuration or initialization.
    #[snafu(display("Provider initialization error: {source}"))]
    Init {
        #[snafu(backtrace)]
        source: ProviderInitError,
    },
}

impl ProviderError {
    /// Whether another attempt could plausibly succeed.
    ///
    /// Transport failures, non-success statuses and undecodable payloads are
    /// retryable; anything wrong with the request we built is not.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Transport { source, .. } => !source.is_builder(),
            ProviderError::Status { .. } | ProviderError::Decode { .. } => true,
            ProviderError::Document { .. } | ProviderError::Build { .. } | ProviderError::Init { .. } => {
                false
            }
        }
    }
}
