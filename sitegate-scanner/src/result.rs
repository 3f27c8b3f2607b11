use serde::{Deserialize, Serialize};

/// URLs discovered through a site's sitemap(s), in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sitemap {
    pub urls: Vec<String>,
    pub total: usize,
}

impl Sitemap {
    pub fn new(urls: Vec<String>) -> Self {
        let total = urls.len();
        Self { urls, total }
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

/// Parsed shape of a sitemap document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SitemapDocument {
    /// `<urlset>`: page locations.
    UrlSet(Vec<String>),
    /// `<sitemapindex>`: locations of further sitemaps.
    Index(Vec<String>),
}

/// One sampled page as handed to downstream consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageContent {
    pub url: String,
    pub html: Option<String>,
    pub truncated: bool,
    pub error: Option<String>,
}

impl PageContent {
    pub fn new(url: String, html: String, truncated: bool) -> Self {
        Self {
            url,
            html: Some(html),
            truncated,
            error: None,
        }
    }

    pub fn with_error(url: String, error: String) -> Self {
        Self {
            url,
            html: None,
            truncated: false,
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.html.is_some()
    }
}
