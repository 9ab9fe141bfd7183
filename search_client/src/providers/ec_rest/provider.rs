use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    Client,
    multipart::{Form, Part},
};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use snafu::{ResultExt, ensure};
use tracing::debug;

use crate::{
    models::{
        documents::RequestDocuments, facet::FacetResponse, request_params::PageParams,
        response::SearchResponse,
    },
    providers::{
        BuildSnafu, ClientBuildSnafu, DecodeSnafu, DocumentSnafu, EmptyApiKeySnafu,
        EmptyEndpointSnafu, ProviderError, ProviderInitError, SearchProvider, StatusSnafu,
        TransportSnafu,
        ec_rest::params::{MATCH_ALL_TEXT, construct_params},
    },
};

pub const DEFAULT_SEARCH_URL: &str = "https://api.tech.ec.europa.eu/search-api/prod/rest/search";
pub const DEFAULT_FACET_URL: &str = "https://api.tech.ec.europa.eu/search-api/prod/rest/facet";

/// Longest slice of an error body kept in a [`ProviderError::Status`].
const MAX_ERROR_BODY: usize = 300;
/// Longest slice of an undecodable payload kept in a [`ProviderError::Decode`].
const MAX_PAYLOAD_PREVIEW: usize = 500;

/// Connection settings for [`EcSearchProvider`].
#[derive(Debug)]
pub struct EcProviderConfig {
    pub search_url: String,
    pub facet_url: String,
    pub api_key: SecretString,
    pub text: String,
    /// Per-request timeout; no call waits longer than this.
    pub timeout: Duration,
}

impl Default for EcProviderConfig {
    fn default() -> Self {
        Self {
            search_url: DEFAULT_SEARCH_URL.to_string(),
            facet_url: DEFAULT_FACET_URL.to_string(),
            api_key: SecretString::from("SEDIA"),
            text: MATCH_ALL_TEXT.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

pub struct EcSearchProvider {
    client: Client,
    config: EcProviderConfig,
}

impl EcSearchProvider {
    /// Creates a new provider with a client whose every request times out after
    /// `config.timeout`.
    pub fn new(config: EcProviderConfig) -> Result<Self, ProviderInitError> {
        ensure!(
            !config.api_key.expose_secret().trim().is_empty(),
            EmptyApiKeySnafu
        );
        ensure!(
            !config.search_url.trim().is_empty(),
            EmptyEndpointSnafu { name: "search_url" }
        );
        ensure!(
            !config.facet_url.trim().is_empty(),
            EmptyEndpointSnafu { name: "facet_url" }
        );

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context(ClientBuildSnafu)?;

        Ok(Self { client, config })
    }

    /// Serializes every document into an `application/json` multipart part.
    fn build_form(documents: &RequestDocuments) -> Result<Form, ProviderError> {
        let mut form = Form::new();
        for (name, doc) in documents.parts() {
            let bytes = serde_json::to_vec(doc).context(DocumentSnafu { part: name })?;
            let part = Part::bytes(bytes)
                .file_name(format!("{name}.json"))
                .mime_str("application/json")
                .context(BuildSnafu)?;
            form = form.part(name, part);
        }
        Ok(form)
    }

    async fn post<T: DeserializeOwned>(
        &self,
        url: &str,
        page: Option<PageParams>,
        documents: &RequestDocuments,
    ) -> Result<T, ProviderError> {
        let form = Self::build_form(documents)?;
        let params = construct_params(&self.config.api_key, &self.config.text, page);

        let response = self
            .client
            .post(url)
            .query(&params)
            .multipart(form)
            .send()
            .await
            .context(TransportSnafu)?;

        let status = response.status();
        let body = response.text().await.context(TransportSnafu)?;
        debug!(url, status = status.as_u16(), bytes = body.len(), "search API responded");

        if !status.is_success() {
            return StatusSnafu {
                status: status.as_u16(),
                body: truncate(&body, MAX_ERROR_BODY),
            }
            .fail();
        }

        serde_json::from_str(&body).context(DecodeSnafu {
            preview: truncate(&body, MAX_PAYLOAD_PREVIEW),
        })
    }
}

#[async_trait]
impl SearchProvider for EcSearchProvider {
    async fn search(
        &self,
        page: Option<PageParams>,
        documents: &RequestDocuments,
    ) -> Result<SearchResponse, ProviderError> {
        self.post(&self.config.search_url, page, documents).await
    }

    async fn facets(&self, documents: &RequestDocuments) -> Result<FacetResponse, ProviderError> {
        self.post(&self.config.facet_url, None, documents).await
    }
}

/// First `max` characters of `s`, respecting char boundaries.
fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
