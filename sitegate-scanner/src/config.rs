use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = concat!(
    "sitegate/",
    env!("CARGO_PKG_VERSION"),
    " (+https://github.com/trapdoorsec/sitegate; site audit bot)"
);

/// Largest XML document the gate will let through.
pub const MAX_XML_BYTES: usize = 10 * 1024 * 1024;
/// Page content handed to downstream consumers is cut at this size.
pub const MAX_PAGE_CONTENT_BYTES: usize = 10 * 1024;

// Hard upper bounds. Configuration can lower these, never raise them.
pub const MAX_SUB_SITEMAPS: usize = 10;
pub const MAX_SAMPLE_PAGES: usize = 50;
pub const MAX_QUALITY_PAGES: usize = 5;
pub const MAX_CHECKED_LINKS: usize = 10;
pub const MAX_PAGE_WORKERS: usize = 8;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub user_agent: String,
    /// HEAD probes against API endpoints and link checks.
    pub probe_timeout: Duration,
    /// Sitemap documents and data-quality page fetches.
    pub fetch_timeout: Duration,
    /// Full page content fetches.
    pub page_timeout: Duration,
    pub dns_timeout: Duration,
    pub max_redirects: usize,
    pub max_xml_bytes: usize,
    pub max_page_content_bytes: usize,
    /// Read limit for pages the data-quality assessor parses.
    pub max_assessment_page_bytes: usize,
    pub max_sub_sitemaps: usize,
    pub max_sample_pages: usize,
    pub max_quality_pages: usize,
    pub max_checked_links: usize,
    pub page_workers: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            probe_timeout: Duration::from_secs(5),
            fetch_timeout: Duration::from_secs(10),
            page_timeout: Duration::from_secs(15),
            dns_timeout: Duration::from_secs(5),
            max_redirects: 5,
            max_xml_bytes: MAX_XML_BYTES,
            max_page_content_bytes: MAX_PAGE_CONTENT_BYTES,
            max_assessment_page_bytes: 1024 * 1024,
            max_sub_sitemaps: MAX_SUB_SITEMAPS,
            max_sample_pages: MAX_SAMPLE_PAGES,
            max_quality_pages: MAX_QUALITY_PAGES,
            max_checked_links: MAX_CHECKED_LINKS,
            page_workers: 4,
        }
    }
}

impl ScanConfig {
    pub fn xml_limit(&self) -> usize {
        self.max_xml_bytes.min(MAX_XML_BYTES)
    }

    pub fn page_content_limit(&self) -> usize {
        self.max_page_content_bytes.min(MAX_PAGE_CONTENT_BYTES)
    }

    pub fn sub_sitemap_limit(&self) -> usize {
        self.max_sub_sitemaps.min(MAX_SUB_SITEMAPS)
    }

    pub fn sample_page_limit(&self) -> usize {
        self.max_sample_pages.min(MAX_SAMPLE_PAGES)
    }

    pub fn quality_page_limit(&self) -> usize {
        self.max_quality_pages.min(MAX_QUALITY_PAGES)
    }

    pub fn checked_link_limit(&self) -> usize {
        self.max_checked_links.min(MAX_CHECKED_LINKS)
    }

    pub fn worker_count(&self) -> usize {
        self.page_workers.clamp(1, MAX_PAGE_WORKERS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caps_cannot_be_raised() {
        let config = ScanConfig {
            max_sub_sitemaps: 500,
            max_sample_pages: 1_000,
            max_quality_pages: 99,
            max_checked_links: 1_000,
            max_xml_bytes: usize::MAX,
            max_page_content_bytes: usize::MAX,
            page_workers: 0,
            ..ScanConfig::default()
        };

        assert_eq!(config.sub_sitemap_limit(), 10);
        assert_eq!(config.sample_page_limit(), 50);
        assert_eq!(config.quality_page_limit(), 5);
        assert_eq!(config.checked_link_limit(), 10);
        assert_eq!(config.xml_limit(), MAX_XML_BYTES);
        assert_eq!(config.page_content_limit(), MAX_PAGE_CONTENT_BYTES);
        assert_eq!(config.worker_count(), 1);
    }

    #[test]
    fn test_caps_can_be_lowered() {
        let config = ScanConfig {
            max_sub_sitemaps: 2,
            max_checked_links: 3,
            ..ScanConfig::default()
        };

        assert_eq!(config.sub_sitemap_limit(), 2);
        assert_eq!(config.checked_link_limit(), 3);
    }

    #[test]
    fn test_default_timeouts() {
        let config = ScanConfig::default();
        assert_eq!(config.probe_timeout, Duration::from_secs(5));
        assert_eq!(config.fetch_timeout, Duration::from_secs(10));
        assert_eq!(config.page_timeout, Duration::from_secs(15));
        assert!(config.user_agent.starts_with("sitegate/"));
    }
}
