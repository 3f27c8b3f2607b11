// Data-quality assessment over a handful of sampled pages

use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sitegate_scanner::{Result, ScanError, SiteScanner};
use std::collections::HashSet;
use tracing::{debug, info, warn};
use url::Url;

/// Characters of normalised body text that go into the content hash.
pub const HASHED_TEXT_CHARS: usize = 1000;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQualityReport {
    pub broken_links: usize,
    pub duplicate_content: bool,
    pub inconsistent_structure: bool,
    pub pages_analyzed: usize,
    pub links_checked: usize,
}

struct PageSelectors {
    links: Selector,
    nav_links: Selector,
    body: Selector,
}

impl PageSelectors {
    fn new() -> Result<Self> {
        Ok(Self {
            links: parse_selector("a[href]")?,
            nav_links: parse_selector("nav a[href]")?,
            body: parse_selector("body")?,
        })
    }
}

fn parse_selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| ScanError::ParseError(format!("selector {}: {}", css, e)))
}

/// What one page contributes to the report.
struct PageSummary {
    links: Vec<String>,
    content_hash: String,
    nav_links: usize,
}

/// Resolve an `href` against the page it appears on, dropping fragments and
/// non-navigational schemes.
pub fn resolve_link(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty()
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with('#')
    {
        return None;
    }

    let mut url = base.join(href).ok()?;
    url.set_fragment(None);
    Some(url.to_string())
}

/// SHA-256 over the first [`HASHED_TEXT_CHARS`] characters of `text` after
/// collapsing whitespace, hex encoded.
pub fn content_hash(text: &str) -> String {
    let normalised = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let snapshot: String = normalised.chars().take(HASHED_TEXT_CHARS).collect();
    hex::encode(Sha256::digest(snapshot.as_bytes()))
}

fn summarize_page(html: &str, page_url: &Url, selectors: &PageSelectors) -> PageSummary {
    let document = Html::parse_document(html);

    let links = document
        .select(&selectors.links)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| resolve_link(page_url, href))
        .collect();

    let text: String = match document.select(&selectors.body).next() {
        Some(body) => body.text().collect::<Vec<_>>().join(" "),
        None => document.root_element().text().collect::<Vec<_>>().join(" "),
    };

    PageSummary {
        links,
        content_hash: content_hash(&text),
        nav_links: document.select(&selectors.nav_links).count(),
    }
}

/// Sample a few pages for broken links, duplicated content and missing
/// navigation.
///
/// Only the base URL is a hard gate. After that every failure is folded into
/// `broken_links`, except targets the URL gate rejects, which are skipped.
pub async fn assess_data_quality(
    scanner: &SiteScanner,
    website_url: &str,
    sample_urls: &[String],
) -> Result<DataQualityReport> {
    info!("Assessing data quality of {}", website_url);
    scanner.check_target(website_url).await?;

    let selectors = PageSelectors::new()?;
    let config = scanner.config();
    let mut report = DataQualityReport::default();
    let mut seen_hashes = HashSet::new();
    let mut seen_links = HashSet::new();
    let mut links = Vec::new();

    for page_url in sample_urls.iter().take(config.quality_page_limit()) {
        let response = match scanner
            .guarded_get(page_url, config.fetch_timeout, config.max_assessment_page_bytes)
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_security() => {
                warn!("Skipping sample page {}: {}", page_url, e);
                continue;
            }
            Err(e) => {
                debug!("Sample page {} failed: {}", page_url, e);
                report.broken_links += 1;
                continue;
            }
        };

        if !response.is_success() {
            debug!("Sample page {} returned {}", page_url, response.status);
            report.broken_links += 1;
            continue;
        }

        let Ok(parsed_url) = Url::parse(page_url) else {
            continue;
        };
        let summary = summarize_page(&response.body, &parsed_url, &selectors);
        report.pages_analyzed += 1;

        if !seen_hashes.insert(summary.content_hash) {
            debug!("Duplicate content at {}", page_url);
            report.duplicate_content = true;
        }
        if summary.nav_links == 0 {
            debug!("No navigation links on {}", page_url);
            report.inconsistent_structure = true;
        }
        for link in summary.links {
            if seen_links.insert(link.clone()) {
                links.push(link);
            }
        }
    }

    for link in links.iter().take(config.checked_link_limit()) {
        match scanner.guarded_head(link, config.probe_timeout).await {
            Ok(status) => {
                report.links_checked += 1;
                if !(200..300).contains(&status) {
                    debug!("Broken link {} ({})", link, status);
                    report.broken_links += 1;
                }
            }
            Err(e) if e.is_security() => {
                warn!("Skipping link {}: {}", link, e);
            }
            Err(e) => {
                debug!("Link check {} failed: {}", link, e);
                report.links_checked += 1;
                report.broken_links += 1;
            }
        }
    }

    info!(
        "Data quality for {}: {} pages, {} links checked, {} broken",
        website_url, report.pages_analyzed, report.links_checked, report.broken_links
    );
    Ok(report)
}
