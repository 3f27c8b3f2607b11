// CMS export-capability probes

use serde::{Deserialize, Serialize};
use sitegate_scanner::{Result, SiteScanner};
use tracing::{debug, info};

/// Well-known API roots, probed in order. The last one is the TYPO3
/// headless page type.
pub const API_PROBE_PATHS: [&str; 5] = [
    "/wp-json/wp/v2",
    "/api",
    "/rest",
    "/jsonapi",
    "/?type=1533906435",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MigrationFeasibility {
    High,
    Medium,
    Low,
}

impl MigrationFeasibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            MigrationFeasibility::High => "high",
            MigrationFeasibility::Medium => "medium",
            MigrationFeasibility::Low => "low",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportCapabilities {
    #[serde(rename = "restAPI")]
    pub rest_api: bool,
    pub xml_export: bool,
    pub cli_tool: bool,
    pub database_access: bool,
    /// First probe URL that answered 2xx.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rest_endpoint: Option<String>,
}

impl ExportCapabilities {
    fn flag_count(&self) -> usize {
        [
            self.rest_api,
            self.xml_export,
            self.cli_tool,
            self.database_access,
        ]
        .iter()
        .filter(|flag| **flag)
        .count()
    }

    pub fn feasibility(&self) -> MigrationFeasibility {
        match self.flag_count() {
            n if n >= 3 => MigrationFeasibility::High,
            2 => MigrationFeasibility::Medium,
            _ => MigrationFeasibility::Low,
        }
    }

    /// Flags implied by the CMS name alone.
    pub fn from_cms_name(cms_name: &str) -> Self {
        let cms = cms_name.to_lowercase();
        let mut caps = Self::default();

        if cms.contains("wordpress") {
            caps.xml_export = true;
            caps.cli_tool = true;
            caps.database_access = true;
        }
        if cms.contains("drupal") {
            caps.cli_tool = true;
            caps.database_access = true;
        }
        if cms.contains("typo3") {
            caps.xml_export = true;
            caps.cli_tool = true;
            caps.database_access = true;
        }

        caps
    }
}

/// Combine name heuristics with live HEAD probes of common API roots.
///
/// The base URL is gated first and a rejection is returned as an error.
/// Individual probe failures (blocked, timed out, non-2xx) are only logged.
pub async fn check_export_capabilities(
    scanner: &SiteScanner,
    website_url: &str,
    cms_name: &str,
) -> Result<ExportCapabilities> {
    info!("Checking export capabilities of {} ({})", website_url, cms_name);
    let base = scanner.check_target(website_url).await?;
    let mut caps = ExportCapabilities::from_cms_name(cms_name);
    let timeout = scanner.config().probe_timeout;

    for probe_path in API_PROBE_PATHS {
        let Ok(probe) = base.join(probe_path) else {
            continue;
        };

        match scanner.guarded_head(probe.as_str(), timeout).await {
            Ok(status) if (200..300).contains(&status) => {
                info!("REST API found at {}", probe);
                caps.rest_api = true;
                caps.rest_endpoint = Some(probe.to_string());
                break;
            }
            Ok(status) => debug!("Probe {} returned {}", probe, status),
            Err(e) => debug!("Probe {} failed: {}", probe, e),
        }
    }

    info!(
        "Export capabilities for {}: migration feasibility {}",
        website_url,
        caps.feasibility().as_str()
    );
    Ok(caps)
}
