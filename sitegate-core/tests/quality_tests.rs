// Tests for data-quality assessment

use sitegate_core::quality::{assess_data_quality, content_hash, resolve_link};
use sitegate_scanner::testing::{StaticResolver, StubClient};
use sitegate_scanner::{ScanConfig, SiteScanner};
use std::sync::Arc;
use url::Url;

const SITE: &str = "https://example.com";

fn scanner_with(client: StubClient) -> (SiteScanner, Arc<StubClient>) {
    let client = Arc::new(client);
    let scanner = SiteScanner::from_parts(
        client.clone(),
        Arc::new(StaticResolver::public()),
        ScanConfig::default(),
    );
    (scanner, client)
}

fn page(text: &str, body_links: &str) -> String {
    format!(
        "<html><head><title>t</title></head><body><nav><a href=\"/\">Home</a></nav><p>{}</p>{}</body></html>",
        text, body_links
    )
}

fn sample(paths: &[&str]) -> Vec<String> {
    paths
        .iter()
        .map(|p| format!("https://example.com{}", p))
        .collect()
}

// ============================================================================
// Helper Tests
// ============================================================================

#[test]
fn test_resolve_link_relative_and_absolute() {
    let base = Url::parse("https://example.com/blog/post").unwrap();
    assert_eq!(
        resolve_link(&base, "other"),
        Some("https://example.com/blog/other".to_string())
    );
    assert_eq!(
        resolve_link(&base, "/about#team"),
        Some("https://example.com/about".to_string())
    );
    assert_eq!(
        resolve_link(&base, "https://cdn.example.org/x"),
        Some("https://cdn.example.org/x".to_string())
    );
}

#[test]
fn test_resolve_link_skips_non_navigational() {
    let base = Url::parse("https://example.com/").unwrap();
    for href in ["", "#top", "javascript:void(0)", "mailto:a@b.c", "tel:+123"] {
        assert_eq!(resolve_link(&base, href), None, "{}", href);
    }
}

#[test]
fn test_content_hash_normalises_whitespace() {
    assert_eq!(
        content_hash("Hello   world\n\n  again"),
        content_hash("Hello world again")
    );
    assert_ne!(content_hash("Hello world"), content_hash("Hello there"));
    assert_eq!(content_hash("x").len(), 64);
}

#[test]
fn test_content_hash_uses_leading_text_only() {
    let prefix = "a".repeat(1000);
    assert_eq!(
        content_hash(&format!("{} tail one", prefix)),
        content_hash(&format!("{} tail two", prefix))
    );
}

// ============================================================================
// Assessment Tests
// ============================================================================

#[tokio::test]
async fn test_clean_site() {
    let stub = StubClient::new()
        .with_html("https://example.com/", &page("Welcome", ""))
        .with_html(
            "https://example.com/about",
            &page("About us", "<a href=\"/contact\">Contact</a>"),
        )
        .with_status("https://example.com/contact", 200);
    let (scanner, _) = scanner_with(stub);

    let report = assess_data_quality(&scanner, SITE, &sample(&["/", "/about"]))
        .await
        .unwrap();

    assert_eq!(report.pages_analyzed, 2);
    assert_eq!(report.broken_links, 0);
    assert_eq!(report.links_checked, 2);
    assert!(!report.duplicate_content);
    assert!(!report.inconsistent_structure);
}

#[tokio::test]
async fn test_broken_and_blocked_links() {
    let links = r##"<a href="/ok">ok</a><a href="/missing">gone</a><a href="http://10.0.0.1/admin">internal</a><a href="mailto:x@example.com">mail</a><a href="#top">top</a>"##;
    let stub = StubClient::new()
        .with_html("https://example.com/a", &page("Alpha", links))
        .with_status("https://example.com/", 200)
        .with_status("https://example.com/ok", 200);
    let (scanner, client) = scanner_with(stub);

    let report = assess_data_quality(&scanner, SITE, &sample(&["/a"]))
        .await
        .unwrap();

    assert_eq!(report.links_checked, 3);
    assert_eq!(report.broken_links, 1);
    assert!(!client.was_requested("http://10.0.0.1/admin"));
}

#[tokio::test]
async fn test_duplicate_content_detected() {
    let body = page("Same   text\non both", "");
    let stub = StubClient::new()
        .with_html("https://example.com/one", &body)
        .with_html("https://example.com/two", &body.replace("Same   text", "Same text"))
        .with_status("https://example.com/", 200);
    let (scanner, _) = scanner_with(stub);

    let report = assess_data_quality(&scanner, SITE, &sample(&["/one", "/two"]))
        .await
        .unwrap();

    assert!(report.duplicate_content);
}

#[tokio::test]
async fn test_missing_nav_flags_structure() {
    let stub = StubClient::new()
        .with_html("https://example.com/one", &page("One", ""))
        .with_html(
            "https://example.com/two",
            "<html><body><p>Two</p><nav></nav></body></html>",
        )
        .with_status("https://example.com/", 200);
    let (scanner, _) = scanner_with(stub);

    let report = assess_data_quality(&scanner, SITE, &sample(&["/one", "/two"]))
        .await
        .unwrap();

    assert!(report.inconsistent_structure);
    assert!(!report.duplicate_content);
}

#[tokio::test]
async fn test_failed_pages_count_as_broken() {
    let stub = StubClient::new()
        .with_status("https://example.com/error", 500)
        .with_timeout("https://example.com/slow")
        .with_failure("https://example.com/reset", "connection reset");
    let (scanner, _) = scanner_with(stub);

    let report = assess_data_quality(&scanner, SITE, &sample(&["/error", "/slow", "/reset"]))
        .await
        .unwrap();

    assert_eq!(report.broken_links, 3);
    assert_eq!(report.pages_analyzed, 0);
    assert_eq!(report.links_checked, 0);
}

#[tokio::test]
async fn test_blocked_sample_pages_skipped() {
    let (scanner, client) = scanner_with(StubClient::new());
    let samples = vec![
        "http://169.254.169.254/latest/meta-data/".to_string(),
        "file:///etc/passwd".to_string(),
    ];

    let report = assess_data_quality(&scanner, SITE, &samples).await.unwrap();

    assert_eq!(report.broken_links, 0);
    assert!(client.requests().is_empty());
}

#[tokio::test]
async fn test_at_most_five_pages() {
    let mut stub = StubClient::new().with_status("https://example.com/", 200);
    let paths: Vec<String> = (0..8).map(|i| format!("/p{}", i)).collect();
    for path in &paths {
        stub = stub.with_html(
            &format!("https://example.com{}", path),
            &page(&format!("Page {}", path), ""),
        );
    }
    let (scanner, client) = scanner_with(stub);
    let path_refs: Vec<&str> = paths.iter().map(|p| p.as_str()).collect();

    let report = assess_data_quality(&scanner, SITE, &sample(&path_refs))
        .await
        .unwrap();

    assert_eq!(report.pages_analyzed, 5);
    let gets = client
        .requests()
        .iter()
        .filter(|r| r.starts_with("GET "))
        .count();
    assert_eq!(gets, 5);
}

#[tokio::test]
async fn test_at_most_ten_links_checked_once_each() {
    let links: String = (0..15)
        .map(|i| format!("<a href=\"/l{}\">l</a><a href=\"/l{}\">again</a>", i, i))
        .collect();
    let stub = StubClient::new()
        .with_html("https://example.com/hub", &page("Hub", &links))
        .with_html("https://example.com/hub2", &page("Hub two", &links));
    let (scanner, client) = scanner_with(stub);

    let report = assess_data_quality(&scanner, SITE, &sample(&["/hub", "/hub2"]))
        .await
        .unwrap();

    let heads: Vec<String> = client
        .requests()
        .into_iter()
        .filter(|r| r.starts_with("HEAD "))
        .collect();
    assert_eq!(heads.len(), 10);
    assert_eq!(report.links_checked, 10);
    // "/" and /l0../l8 have no routes
    assert_eq!(report.broken_links, 10);
    assert!(heads.contains(&"HEAD https://example.com/l8".to_string()));
    assert!(!heads.contains(&"HEAD https://example.com/l9".to_string()));
}

#[tokio::test]
async fn test_private_base_rejected() {
    let (scanner, client) = scanner_with(StubClient::new());

    let result = assess_data_quality(&scanner, "http://localhost", &sample(&["/a"])).await;

    assert!(result.unwrap_err().is_security());
    assert!(client.requests().is_empty());
}
