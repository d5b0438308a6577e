//! Page values and lookup.

use std::sync::Arc;

use weft_url::{ContextStack, Url};

/// HTTP status of a page served normally.
const STATUS_OK: u16 = 200;

/// A page links can point at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    title: String,
    url: Url,
    status: u16,
}

impl Page {
    /// Create a page served with status 200.
    #[must_use]
    pub fn new(title: impl Into<String>, url: Url) -> Self {
        Self {
            title: title.into(),
            url,
            status: STATUS_OK,
        }
    }

    /// Set the response status (for example 404 for a placeholder page).
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Canonical URL. Links to this page are rewritten to it.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }
}

/// Source of pages for link resolution.
pub trait PageRepository: Send + Sync {
    /// Find the page a URL refers to under the active contexts.
    fn get(&self, url: &Url, contexts: &ContextStack) -> Option<Arc<Page>>;
}
