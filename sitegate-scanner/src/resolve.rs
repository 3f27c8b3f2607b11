// DNS re-validation: every address a hostname resolves to must pass the
// same block list as a literal IP.

use crate::error::{Result, ScanError};
use crate::guard::{ensure_allowed, is_blocked_ip};
use async_trait::async_trait;
use std::net::IpAddr;
use std::time::Duration;
use tokio::net::lookup_host;
use tracing::{debug, warn};
use url::{Host, Url};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The runtime has no way to resolve names at all.
    Unavailable,
    Failed(String),
}

/// A/AAAA lookup capability. Implementations must not cache results.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn lookup(&self, host: &str) -> std::result::Result<Vec<IpAddr>, ResolveError>;
}

/// Resolver backed by the system stub resolver through tokio.
pub struct SystemResolver {
    timeout: Duration,
}

impl SystemResolver {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for SystemResolver {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

#[async_trait]
impl Resolver for SystemResolver {
    async fn lookup(&self, host: &str) -> std::result::Result<Vec<IpAddr>, ResolveError> {
        match tokio::time::timeout(self.timeout, lookup_host((host, 0))).await {
            Ok(Ok(addrs)) => Ok(addrs.map(|addr| addr.ip()).collect()),
            Ok(Err(e)) => Err(ResolveError::Failed(e.to_string())),
            Err(_) => Err(ResolveError::Failed(format!(
                "lookup timed out after {:?}",
                self.timeout
            ))),
        }
    }
}

/// Resolver for runtimes without DNS; validation degrades to the static checks.
pub struct NoResolver;

#[async_trait]
impl Resolver for NoResolver {
    async fn lookup(&self, _host: &str) -> std::result::Result<Vec<IpAddr>, ResolveError> {
        Err(ResolveError::Unavailable)
    }
}

pub async fn validate_url_resolution(url: &str, resolver: &dyn Resolver) -> bool {
    match check_resolution(url, resolver).await {
        Ok(_) => true,
        Err(e) => {
            debug!("Resolution check rejected {}: {}", url, e);
            false
        }
    }
}

/// Static validation followed by a live lookup whose every address is re-checked.
pub async fn check_resolution(url: &str, resolver: &dyn Resolver) -> Result<Url> {
    let parsed = ensure_allowed(url)?;

    let host = match parsed.host() {
        Some(Host::Domain(domain)) => domain.to_string(),
        // Literal addresses were already checked by the static gate
        Some(Host::Ipv4(_)) | Some(Host::Ipv6(_)) => return Ok(parsed),
        None => return Err(ScanError::InvalidUrl(format!("{} has no host", url))),
    };

    let addrs = match resolver.lookup(&host).await {
        Ok(addrs) => addrs,
        Err(ResolveError::Unavailable) => {
            warn!(
                "DNS resolution unavailable, {} passed basic validation only",
                host
            );
            return Ok(parsed);
        }
        Err(ResolveError::Failed(reason)) => {
            return Err(ScanError::DnsResolution { host, reason });
        }
    };

    if addrs.is_empty() {
        return Err(ScanError::DnsResolution {
            host,
            reason: "no addresses returned".to_string(),
        });
    }

    if let Some(blocked) = addrs.iter().find(|ip| is_blocked_ip(**ip)) {
        warn!("{} resolves to blocked address {}", host, blocked);
        return Err(ScanError::PrivateAddressBlocked(format!(
            "{} resolves to {}",
            host, blocked
        )));
    }

    debug!("{} resolved to {} public address(es)", host, addrs.len());
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FixedResolver {
        answers: HashMap<String, std::result::Result<Vec<IpAddr>, ResolveError>>,
        lookups: Mutex<Vec<String>>,
    }

    impl FixedResolver {
        fn new(entries: &[(&str, std::result::Result<Vec<&str>, ResolveError>)]) -> Self {
            let answers: HashMap<String, std::result::Result<Vec<IpAddr>, ResolveError>> =
                entries
                    .iter()
                    .map(|(host, answer)| {
                        let answer = answer.clone().map(|ips| {
                            ips.iter()
                                .map(|ip| ip.parse::<IpAddr>().unwrap())
                                .collect::<Vec<IpAddr>>()
                        });
                        (host.to_string(), answer)
                    })
                    .collect();
            Self {
                answers,
                lookups: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Resolver for FixedResolver {
        async fn lookup(&self, host: &str) -> std::result::Result<Vec<IpAddr>, ResolveError> {
            self.lookups.lock().unwrap().push(host.to_string());
            self.answers
                .get(host)
                .cloned()
                .unwrap_or_else(|| Err(ResolveError::Failed("NXDOMAIN".to_string())))
        }
    }

    #[tokio::test]
    async fn test_public_resolution_allowed() {
        let resolver = FixedResolver::new(&[(
            "example.com",
            Ok(vec!["93.184.216.34", "2606:2800:220:1:248:1893:25c8:1946"]),
        )]);
        assert!(validate_url_resolution("https://example.com/", &resolver).await);
    }

    #[tokio::test]
    async fn test_rebinding_to_private_address_rejected() {
        let resolver = FixedResolver::new(&[("rebind.example.com", Ok(vec!["127.0.0.1"]))]);
        let result = check_resolution("https://rebind.example.com/", &resolver).await;
        assert!(matches!(result, Err(ScanError::PrivateAddressBlocked(_))));
    }

    #[tokio::test]
    async fn test_any_private_address_rejects_whole_set() {
        let resolver = FixedResolver::new(&[(
            "mixed.example.com",
            Ok(vec!["93.184.216.34", "169.254.169.254"]),
        )]);
        assert!(!validate_url_resolution("https://mixed.example.com/", &resolver).await);
    }

    #[tokio::test]
    async fn test_mapped_ipv6_answer_rejected() {
        let resolver =
            FixedResolver::new(&[("v6.example.com", Ok(vec!["::ffff:192.168.1.10"]))]);
        assert!(!validate_url_resolution("https://v6.example.com/", &resolver).await);
    }

    #[tokio::test]
    async fn test_literal_ip_skips_lookup() {
        let resolver = FixedResolver::new(&[]);
        assert!(validate_url_resolution("http://8.8.8.8/", &resolver).await);
        assert!(resolver.lookups.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_static_rejection_skips_lookup() {
        let resolver = FixedResolver::new(&[]);
        assert!(!validate_url_resolution("http://localhost/", &resolver).await);
        assert!(!validate_url_resolution("file:///etc/passwd", &resolver).await);
        assert!(resolver.lookups.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_resolution_failure_fails_closed() {
        let resolver = FixedResolver::new(&[("empty.example.com", Ok(vec![]))]);
        assert!(!validate_url_resolution("https://missing.example.com/", &resolver).await);

        let result = check_resolution("https://empty.example.com/", &resolver).await;
        assert!(matches!(result, Err(ScanError::DnsResolution { .. })));
    }

    #[tokio::test]
    async fn test_unavailable_resolver_degrades_to_static_checks() {
        assert!(validate_url_resolution("https://example.com/", &NoResolver).await);
        assert!(!validate_url_resolution("http://10.0.0.1/", &NoResolver).await);
        assert!(!validate_url_resolution("http://host.internal/", &NoResolver).await);
    }

    #[tokio::test]
    async fn test_lookup_is_repeated_per_call() {
        let resolver = FixedResolver::new(&[("example.com", Ok(vec!["93.184.216.34"]))]);
        check_resolution("https://example.com/a", &resolver).await.unwrap();
        check_resolution("https://example.com/b", &resolver).await.unwrap();
        assert_eq!(resolver.lookups.lock().unwrap().len(), 2);
    }
}
