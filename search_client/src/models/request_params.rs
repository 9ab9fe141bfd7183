use serde::{Deserialize, Serialize};

/// Page size the monitor uses for every paginated search.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Pagination parameters for one search request.
///
/// The first request of a fetch carries no page params at all: it only learns
/// `totalResults`. Every following request addresses one page (1-based).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageParams {
    /// 1-based page index.
    pub page_number: u32,

    /// Number of results per page.
    pub page_size: u32,
}

impl PageParams {
    pub fn new(page_number: u32, page_size: u32) -> Self {
        Self {
            page_number,
            page_size,
        }
    }

    /// Every page needed to cover `total_results`, in order.
    pub fn covering(total_results: u64, page_size: u32) -> impl Iterator<Item = PageParams> {
        (1..=page_count(total_results, page_size)).map(move |n| PageParams::new(n, page_size))
    }
}

/// `ceil(total_results / page_size)`; zero when there is nothing to fetch.
pub fn page_count(total_results: u64, page_size: u32) -> u32 {
    if page_size == 0 {
        return 0;
    }
    let size = u64::from(page_size);
    let pages = total_results.div_ceil(size);
    u32::try_from(pages).unwrap_or(u32::MAX)
}
