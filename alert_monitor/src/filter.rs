//! Keyword filtering of search hits on their description text.

use search_client::SearchResult;

/// Metadata field the keywords are matched against.
pub const DESCRIPTION_FIELD: &str = "descriptionByte";

/// Case-insensitive substring filter built from an alert's keyword list.
///
/// Terms prefixed with `!` exclude and are checked first, so a description
/// matching both an include and an exclude term is rejected. With no include
/// terms every non-excluded hit passes. Hits without a description always
/// pass; there is nothing to judge them on.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeywordFilter {
    include: Vec<String>,
    exclude: Vec<String>,
}

impl KeywordFilter {
    pub fn new<S: AsRef<str>>(keywords: &[S]) -> Self {
        let mut filter = Self::default();
        for keyword in keywords {
            let keyword = keyword.as_ref().trim();
            match keyword.strip_prefix('!') {
                Some(term) if !term.trim().is_empty() => {
                    filter.exclude.push(term.trim().to_lowercase())
                }
                Some(_) => {}
                None if !keyword.is_empty() => filter.include.push(keyword.to_lowercase()),
                None => {}
            }
        }
        filter
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    /// Judges a description; `None` means the hit has none.
    pub fn accepts_description(&self, description: Option<&str>) -> bool {
        let Some(description) = description else {
            return true;
        };
        let text = description.to_lowercase();
        if self.exclude.iter().any(|term| text.contains(term.as_str())) {
            return false;
        }
        self.include.is_empty() || self.include.iter().any(|term| text.contains(term.as_str()))
    }

    pub fn accepts(&self, result: &SearchResult) -> bool {
        if self.is_empty() {
            return true;
        }
        self.accepts_description(result.metadata.text(DESCRIPTION_FIELD).as_deref())
    }
}
