use secrecy::{ExposeSecret, SecretString};

use crate::models::request_params::PageParams;

/// Free-text parameter that matches everything; filtering happens in the query document.
pub const MATCH_ALL_TEXT: &str = "***";

/// Builds the URL query parameters for one request.
///
/// `apiKey` and `text` are always present; `pageNumber`/`pageSize` only when a
/// page is addressed.
pub fn construct_params(
    api_key: &SecretString,
    text: &str,
    page: Option<PageParams>,
) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("apiKey", api_key.expose_secret().to_string()),
        ("text", text.to_string()),
    ];
    if let Some(page) = page {
        params.push(("pageNumber", page.page_number.to_string()));
        params.push(("pageSize", page.page_size.to_string()));
    }
    params
}
