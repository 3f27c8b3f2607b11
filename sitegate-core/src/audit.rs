use crate::export::{ExportCapabilities, check_export_capabilities};
use crate::quality::{DataQualityReport, assess_data_quality};
use crate::sampler::{path_depth, sample_pages};
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use sitegate_scanner::config::MAX_SAMPLE_PAGES;
use sitegate_scanner::{PageContent, Result, SiteScanner};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// Options for a single site audit
pub struct AuditOptions {
    pub website_url: String,
    /// CMS name as reported by the caller, used for export heuristics
    pub cms_name: String,
    /// Pages to sample from the sitemap (clamped to 50)
    pub sample_size: usize,
    pub show_progress_bars: bool,
}

/// Callback for reporting audit progress
pub type AuditProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    pub website_url: String,
    pub sitemap_total: usize,
    pub sampled_urls: Vec<String>,
    pub pages: Vec<PageContent>,
    pub export_capabilities: ExportCapabilities,
    pub data_quality: DataQualityReport,
    pub generated_at: DateTime<Utc>,
}

impl AuditReport {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages.iter().filter(|p| p.is_ok()).count()
    }
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb
}

/// Run the whole acquisition pipeline against one site: sitemap, sample,
/// page content, then the export and data-quality checks over the sample.
///
/// Fails if the site itself is rejected or has no usable sitemap. Per-page
/// failures end up in the report instead.
pub async fn execute_audit(
    scanner: &SiteScanner,
    options: AuditOptions,
    progress_callback: Option<AuditProgressCallback>,
) -> Result<AuditReport> {
    let AuditOptions {
        website_url,
        cms_name,
        sample_size,
        show_progress_bars,
    } = options;

    let progress_bar = show_progress_bars.then(|| spinner("Fetching sitemap..."));
    let report_progress = |message: String| {
        if let Some(ref pb) = progress_bar {
            pb.set_message(message.clone());
            pb.tick();
        }
        if let Some(ref callback) = progress_callback {
            callback(message);
        }
    };

    info!("Starting audit of {}", website_url);
    report_progress(format!("Fetching sitemap for {}", website_url));
    let sitemap = match scanner.fetch_sitemap(&website_url).await {
        Ok(sitemap) => sitemap,
        Err(e) => {
            if let Some(ref pb) = progress_bar {
                pb.abandon_with_message(format!("Audit failed: {}", e));
            }
            return Err(e);
        }
    };

    let sample_size = sample_size.min(MAX_SAMPLE_PAGES);
    let sampled_urls = sample_pages(&sitemap.urls, sample_size);
    report_progress(format!(
        "Sampled {} of {} URLs, fetching pages...",
        sampled_urls.len(),
        sitemap.total
    ));
    let pages = scanner.fetch_pages(&sampled_urls).await;

    report_progress("Checking export capabilities and data quality...".to_string());
    let (export_capabilities, data_quality) = tokio::join!(
        check_export_capabilities(scanner, &website_url, &cms_name),
        assess_data_quality(scanner, &website_url, &sampled_urls),
    );

    let report = AuditReport {
        website_url,
        sitemap_total: sitemap.total,
        sampled_urls,
        pages,
        export_capabilities: export_capabilities?,
        data_quality: data_quality?,
        generated_at: Utc::now(),
    };

    if let Some(ref pb) = progress_bar {
        pb.finish_with_message(format!(
            "Audit complete! {} of {} pages fetched",
            report.pages_fetched(),
            report.pages.len()
        ));
    }
    info!("Audit of {} complete", report.website_url);

    Ok(report)
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

/// Generate a plain-text audit summary
pub fn generate_audit_report(report: &AuditReport) -> String {
    let mut out = String::new();
    out.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");
    out.push_str(&format!("# Audit: {}\n", report.website_url));
    out.push_str(&format!(
        "  Generated: {}\n",
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out.push_str(&format!("  URLs in sitemap: {}\n", report.sitemap_total));
    out.push_str(&format!("  Pages sampled: {}\n", report.sampled_urls.len()));
    out.push_str(&format!("  Pages fetched: {}\n", report.pages_fetched()));

    let mut by_depth: BTreeMap<usize, usize> = BTreeMap::new();
    for url in &report.sampled_urls {
        *by_depth.entry(path_depth(url)).or_default() += 1;
    }
    for (depth, count) in &by_depth {
        out.push_str(&format!("    depth {}: {} pages\n", depth, count));
    }

    out.push_str("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");

    let caps = &report.export_capabilities;
    out.push_str("## Export capabilities\n");
    out.push_str(&format!("  REST API: {}\n", yes_no(caps.rest_api)));
    if let Some(ref endpoint) = caps.rest_endpoint {
        out.push_str(&format!("    endpoint: {}\n", endpoint));
    }
    out.push_str(&format!("  XML export: {}\n", yes_no(caps.xml_export)));
    out.push_str(&format!("  CLI tool: {}\n", yes_no(caps.cli_tool)));
    out.push_str(&format!("  Database access: {}\n", yes_no(caps.database_access)));
    out.push_str(&format!(
        "  Migration feasibility: {}\n\n",
        caps.feasibility().as_str()
    ));

    let quality = &report.data_quality;
    out.push_str("## Data quality\n");
    out.push_str(&format!("  Pages analyzed: {}\n", quality.pages_analyzed));
    out.push_str(&format!("  Links checked: {}\n", quality.links_checked));
    out.push_str(&format!("  Broken links: {}\n", quality.broken_links));
    out.push_str(&format!(
        "  Duplicate content: {}\n",
        yes_no(quality.duplicate_content)
    ));
    out.push_str(&format!(
        "  Inconsistent structure: {}\n",
        yes_no(quality.inconsistent_structure)
    ));

    let failed: Vec<&PageContent> = report.pages.iter().filter(|p| !p.is_ok()).collect();
    if !failed.is_empty() {
        out.push_str("\n## Failed pages\n");
        for page in failed {
            out.push_str(&format!(
                "  {} - {}\n",
                page.url,
                page.error.as_deref().unwrap_or("unknown error")
            ));
        }
    }

    out
}
