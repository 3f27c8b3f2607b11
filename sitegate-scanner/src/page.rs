use crate::error::{Result, ScanError};
use crate::result::PageContent;
use crate::scanner::SiteScanner;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

/// Cut `text` to at most `max_bytes` without splitting a UTF-8 sequence.
pub fn truncate_at_char_boundary(text: &mut String, max_bytes: usize) -> bool {
    if text.len() <= max_bytes {
        return false;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text.truncate(end);
    true
}

impl SiteScanner {
    /// Fetch the leading bytes of one page. The URL is gated like any other
    /// outbound request, and the body is capped at the page content limit.
    pub async fn fetch_page_content(&self, url: &str) -> Result<String> {
        self.fetch_page(url).await.map(|(html, _)| html)
    }

    /// Fetch a batch of sampled pages with a small worker pool. Output order
    /// matches `urls`; failures are recorded per page instead of returned.
    pub async fn fetch_pages(&self, urls: &[String]) -> Vec<PageContent> {
        let limit = self.config.sample_page_limit();
        if urls.len() > limit {
            warn!("Fetching only the first {} of {} pages", limit, urls.len());
        }
        let workers = self.config.worker_count();
        info!(
            "Fetching {} pages with {} workers",
            urls.len().min(limit),
            workers
        );

        stream::iter(urls.iter().take(limit))
            .map(|url| async move {
                match self.fetch_page(url).await {
                    Ok((html, truncated)) => PageContent::new(url.clone(), html, truncated),
                    Err(e) => {
                        warn!("Failed to fetch {}: {}", url, e);
                        PageContent::with_error(url.clone(), e.to_string())
                    }
                }
            })
            .buffered(workers)
            .collect()
            .await
    }

    async fn fetch_page(&self, url: &str) -> Result<(String, bool)> {
        let limit = self.config.page_content_limit();
        let response = self
            .guarded_get(url, self.config.page_timeout, limit)
            .await?;

        if !response.is_success() {
            return Err(ScanError::HttpStatus {
                url: url.to_string(),
                status: response.status,
            });
        }

        let mut html = response.body;
        // Lossy decoding can grow the body past the byte cap
        let cut = truncate_at_char_boundary(&mut html, limit);
        debug!("Fetched {} ({} bytes)", url, html.len());
        Ok((html, response.truncated || cut))
    }
}
