use crate::error::{Result, ScanError, XmlViolation};
use crate::result::{Sitemap, SitemapDocument};
use crate::scanner::SiteScanner;
use crate::xml_gate::{check_xml_size, validate_xml_structure};
use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::{debug, info, warn};
use url::Url;

/// Where sitemaps conventionally live, tried in order.
pub const SITEMAP_CANDIDATES: [&str; 4] = [
    "/sitemap.xml",
    "/sitemap_index.xml",
    "/sitemap-index.xml",
    "/wp-sitemap.xml",
];

const MAX_ROBOTS_SITEMAPS: usize = 3;
const MAX_ROBOTS_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Root {
    UrlSet,
    Index,
}

/// Parse a gated sitemap document into its tagged shape. Custom entities are
/// never expanded; a DOCTYPE reaching this point is still refused.
pub fn parse_sitemap_document(xml: &str) -> Result<SitemapDocument> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut root: Option<Root> = None;
    // Element nesting: root at 1, entries at 2, their <loc> at 3
    let mut depth = 0usize;
    let mut in_entry = false;
    let mut in_loc = false;
    let mut loc = String::new();
    let mut locations = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::DocType(_)) => return Err(XmlViolation::Doctype.into()),
            Ok(Event::Start(e)) => {
                depth += 1;
                let name = e.local_name();
                match (depth, root, name.as_ref()) {
                    (1, None, b"urlset") => root = Some(Root::UrlSet),
                    (1, None, b"sitemapindex") => root = Some(Root::Index),
                    (1, _, other) => {
                        return Err(ScanError::ParseError(format!(
                            "unexpected root element <{}>",
                            String::from_utf8_lossy(other)
                        )));
                    }
                    (2, Some(Root::UrlSet), b"url") | (2, Some(Root::Index), b"sitemap") => {
                        in_entry = true;
                        loc.clear();
                    }
                    // Unprefixed only: <image:loc> and friends belong to extensions
                    (3, Some(_), _) if in_entry && e.name().as_ref() == b"loc" => in_loc = true,
                    _ => {}
                }
            }
            Ok(Event::Empty(e)) if root.is_none() && depth == 0 => {
                match e.local_name().as_ref() {
                    b"urlset" => root = Some(Root::UrlSet),
                    b"sitemapindex" => root = Some(Root::Index),
                    _ => {}
                }
            }
            Ok(Event::Text(text)) if in_loc && depth == 3 => {
                let text = text
                    .unescape()
                    .map_err(|e| ScanError::ParseError(format!("bad <loc> text: {}", e)))?;
                loc.push_str(&text);
            }
            Ok(Event::CData(data)) if in_loc && depth == 3 => {
                loc.push_str(&String::from_utf8_lossy(&data.into_inner()));
            }
            Ok(Event::End(_)) => {
                match depth {
                    3 => in_loc = false,
                    2 if in_entry => {
                        let value = loc.trim();
                        if !value.is_empty() {
                            locations.push(value.to_string());
                        }
                        in_entry = false;
                    }
                    _ => {}
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ScanError::ParseError(format!(
                    "XML parse error at byte {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
            _ => {}
        }
    }

    match root {
        Some(Root::UrlSet) => Ok(SitemapDocument::UrlSet(locations)),
        Some(Root::Index) => Ok(SitemapDocument::Index(locations)),
        None => Err(ScanError::ParseError(
            "document has no sitemap root element".to_string(),
        )),
    }
}

/// Canonical sitemap locations on the site's origin.
pub fn candidate_urls(base: &Url) -> Vec<Url> {
    SITEMAP_CANDIDATES
        .iter()
        .filter_map(|path| base.join(path).ok())
        .collect()
}

/// `Sitemap:` directives from a robots.txt body, in file order.
pub fn parse_robots_sitemaps(robots: &str) -> Vec<String> {
    robots
        .lines()
        .filter_map(|line| {
            let line = line.split('#').next().unwrap_or("").trim();
            let (key, value) = line.split_once(':')?;
            if key.trim().eq_ignore_ascii_case("sitemap") && !value.trim().is_empty() {
                Some(value.trim().to_string())
            } else {
                None
            }
        })
        .collect()
}

impl SiteScanner {
    /// Discover the site's page URLs through its sitemap(s).
    ///
    /// Security rejections anywhere along the way abort the whole fetch;
    /// missing or broken documents only move on to the next location.
    pub async fn fetch_sitemap(&self, website_url: &str) -> Result<Sitemap> {
        info!("Fetching sitemap for {}", website_url);
        let base = self.check_target(website_url).await?;

        for candidate in candidate_urls(&base) {
            let target = match self.check_target(candidate.as_str()).await {
                Ok(target) => target,
                Err(e) if e.is_security() => return Err(e),
                Err(e) => {
                    debug!("Skipping {} ({}): {}", candidate, e.class().as_str(), e);
                    continue;
                }
            };

            if let Some(sitemap) = self.try_sitemap_location(&target).await? {
                info!("Found {} URLs in {}", sitemap.total, target);
                return Ok(sitemap);
            }
        }

        for location in self.robots_sitemaps(&base).await? {
            let target = match self.check_target(&location).await {
                Ok(target) => target,
                Err(e) => {
                    warn!("Skipping robots.txt sitemap {}: {}", location, e);
                    continue;
                }
            };

            if let Some(sitemap) = self.try_sitemap_location(&target).await? {
                info!("Found {} URLs in {} (via robots.txt)", sitemap.total, target);
                return Ok(sitemap);
            }
        }

        Err(ScanError::NoSitemapFound(website_url.to_string()))
    }

    /// `Ok(None)` means "nothing usable here, try elsewhere".
    async fn try_sitemap_location(&self, location: &Url) -> Result<Option<Sitemap>> {
        let document = match self.fetch_sitemap_document(location).await {
            Ok(document) => document,
            Err(e) if e.is_security() => return Err(e),
            Err(e) => {
                debug!("No sitemap at {} ({}): {}", location, e.class().as_str(), e);
                return Ok(None);
            }
        };

        let urls = match document {
            SitemapDocument::UrlSet(urls) => urls,
            SitemapDocument::Index(entries) => self.expand_index(location, entries).await?,
        };

        let sitemap = Sitemap::new(urls);
        if sitemap.is_empty() {
            debug!("Sitemap at {} listed no URLs", location);
            return Ok(None);
        }

        Ok(Some(sitemap))
    }

    /// Fetch, gate and parse one already-validated sitemap URL.
    async fn fetch_sitemap_document(&self, url: &Url) -> Result<SitemapDocument> {
        let limit = self.config.xml_limit();
        // One byte over the limit so oversized documents reach the gate
        let response = self
            .client
            .get(url, self.config.fetch_timeout, limit.saturating_add(1))
            .await?;

        if !response.is_success() {
            return Err(ScanError::HttpStatus {
                url: url.to_string(),
                status: response.status,
            });
        }

        // Judge size on the wire bytes; lossy decoding can inflate the text
        check_xml_size(response.body_bytes, limit)?;
        validate_xml_structure(&response.body)?;
        parse_sitemap_document(&response.body)
    }

    /// Follow one level of a sitemap index, bounded to the first few entries.
    async fn expand_index(&self, index_url: &Url, entries: Vec<String>) -> Result<Vec<String>> {
        let limit = self.config.sub_sitemap_limit();
        if entries.len() > limit {
            info!(
                "Sitemap index {} lists {} sitemaps, following the first {}",
                index_url,
                entries.len(),
                limit
            );
        }

        let mut urls = Vec::new();
        for entry in entries.into_iter().take(limit) {
            let target = match self.check_target(&entry).await {
                Ok(target) => target,
                Err(e) => {
                    warn!("Skipping sub-sitemap {}: {}", entry, e);
                    continue;
                }
            };

            match self.fetch_sitemap_document(&target).await {
                Ok(SitemapDocument::UrlSet(found)) => {
                    debug!("{} URLs from sub-sitemap {}", found.len(), target);
                    urls.extend(found);
                }
                Ok(SitemapDocument::Index(_)) => {
                    debug!("Not following nested sitemap index {}", target);
                }
                Err(e) if e.is_security() => return Err(e),
                Err(e) => warn!("Failed to fetch sub-sitemap {}: {}", target, e),
            }
        }

        Ok(urls)
    }

    async fn robots_sitemaps(&self, base: &Url) -> Result<Vec<String>> {
        let Ok(robots_url) = base.join("/robots.txt") else {
            return Ok(Vec::new());
        };

        let response = match self
            .guarded_get(
                robots_url.as_str(),
                self.config.fetch_timeout,
                MAX_ROBOTS_BYTES,
            )
            .await
        {
            Ok(response) if response.is_success() => response,
            Ok(response) => {
                debug!("robots.txt returned HTTP {}", response.status);
                return Ok(Vec::new());
            }
            Err(e) if e.is_security() => return Err(e),
            Err(e) => {
                debug!("robots.txt unavailable: {}", e);
                return Ok(Vec::new());
            }
        };

        Ok(parse_robots_sitemaps(&response.body)
            .into_iter()
            .take(MAX_ROBOTS_SITEMAPS)
            .collect())
    }
}
