use crate::config::ScanConfig;
use crate::error::{Result, ScanError};
use crate::guard::{is_allowed_url, is_blocked_hostname, is_blocked_ip};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use std::error::Error as StdError;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::lookup_host;
use tracing::debug;
use url::Url;

type BoxError = Box<dyn StdError + Send + Sync>;

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
    /// Bytes read off the wire, before lossy UTF-8 decoding.
    pub body_bytes: usize,
    /// The body was cut at the caller's byte limit.
    pub truncated: bool,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Outbound HTTP capability. Every call carries its own timeout and must
/// treat expiry as failure.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// GET `url`, reading at most `max_bytes` of the body.
    async fn get(&self, url: &Url, timeout: Duration, max_bytes: usize) -> Result<HttpResponse>;

    /// HEAD `url`, returning only the status code.
    async fn head(&self, url: &Url, timeout: Duration) -> Result<u16>;
}

/// Marker error raised when a redirect or a connect-time lookup lands on a
/// blocked target. Found again by walking the reqwest error source chain.
#[derive(Debug)]
struct BlockedTarget(String);

impl fmt::Display for BlockedTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blocked target: {}", self.0)
    }
}

impl StdError for BlockedTarget {}

/// Connect-time resolver: re-checks every address reqwest is about to dial,
/// so a name that rebinds after validation still cannot reach a private host.
pub struct GuardedDnsResolver {
    timeout: Duration,
}

impl GuardedDnsResolver {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Resolve for GuardedDnsResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let timeout = self.timeout;
        Box::pin(async move {
            let host = name.as_str().to_string();
            if is_blocked_hostname(&host) {
                return Err(Box::new(BlockedTarget(host)) as BoxError);
            }

            let addrs: Vec<SocketAddr> =
                match tokio::time::timeout(timeout, lookup_host((host.as_str(), 0))).await {
                    Ok(Ok(addrs)) => addrs.collect(),
                    Ok(Err(e)) => return Err(Box::new(e) as BoxError),
                    Err(_) => {
                        return Err(format!("DNS lookup for {} timed out", host).into());
                    }
                };

            if let Some(addr) = addrs.iter().find(|addr| is_blocked_ip(addr.ip())) {
                let reason = format!("{} resolves to {}", host, addr.ip());
                return Err(Box::new(BlockedTarget(reason)) as BoxError);
            }

            Ok(Box::new(addrs.into_iter()) as Addrs)
        })
    }
}

fn redirect_policy(max_redirects: usize) -> Policy {
    Policy::custom(move |attempt| {
        if attempt.previous().len() >= max_redirects {
            // Hand the 3xx back to the caller instead of erroring
            return attempt.stop();
        }
        let target = attempt.url().to_string();
        if !is_allowed_url(&target) {
            return attempt.error(BlockedTarget(format!("redirect to {}", target)));
        }
        attempt.follow()
    })
}

fn find_blocked_target(err: &(dyn StdError + 'static)) -> Option<String> {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(blocked) = e.downcast_ref::<BlockedTarget>() {
            return Some(blocked.0.clone());
        }
        current = e.source();
    }
    None
}

fn map_reqwest_error(url: &Url, timeout: Duration, err: reqwest::Error) -> ScanError {
    if let Some(reason) = find_blocked_target(&err) {
        return ScanError::PrivateAddressBlocked(reason);
    }
    if err.is_timeout() {
        return ScanError::FetchTimeout {
            url: url.to_string(),
            timeout,
        };
    }
    ScanError::FetchFailed {
        url: url.to_string(),
        reason: err.to_string(),
    }
}

/// `HttpClient` over a shared reqwest connection pool.
pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    pub fn new(config: &ScanConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(config.probe_timeout)
            .pool_max_idle_per_host(8)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(redirect_policy(config.max_redirects))
            .dns_resolver(Arc::new(GuardedDnsResolver::new(config.dns_timeout)))
            .build()
            .map_err(|e| ScanError::Client(e.to_string()))?;

        Ok(Self { client })
    }

    async fn read_limited(
        &self,
        url: &Url,
        timeout: Duration,
        max_bytes: usize,
    ) -> Result<HttpResponse> {
        let mut response = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| map_reqwest_error(url, timeout, e))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let mut body = Vec::new();
        let mut truncated = false;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| map_reqwest_error(url, timeout, e))?
        {
            let remaining = max_bytes.saturating_sub(body.len());
            if chunk.len() > remaining {
                body.extend_from_slice(&chunk[..remaining]);
                truncated = true;
                break;
            }
            body.extend_from_slice(&chunk);
        }

        Ok(HttpResponse {
            status,
            content_type,
            body_bytes: body.len(),
            body: String::from_utf8_lossy(&body).into_owned(),
            truncated,
        })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get(&self, url: &Url, timeout: Duration, max_bytes: usize) -> Result<HttpResponse> {
        debug!("GET {}", url);
        match tokio::time::timeout(timeout, self.read_limited(url, timeout, max_bytes)).await {
            Ok(result) => result,
            Err(_) => Err(ScanError::FetchTimeout {
                url: url.to_string(),
                timeout,
            }),
        }
    }

    async fn head(&self, url: &Url, timeout: Duration) -> Result<u16> {
        debug!("HEAD {}", url);
        let request = self.client.head(url.clone()).timeout(timeout).send();
        match tokio::time::timeout(timeout, request).await {
            Ok(Ok(response)) => Ok(response.status().as_u16()),
            Ok(Err(e)) => Err(map_reqwest_error(url, timeout, e)),
            Err(_) => Err(ScanError::FetchTimeout {
                url: url.to_string(),
                timeout,
            }),
        }
    }
}
