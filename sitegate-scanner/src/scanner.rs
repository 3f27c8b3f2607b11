use crate::client::{HttpClient, HttpResponse, ReqwestClient};
use crate::config::ScanConfig;
use crate::error::Result;
use crate::resolve::{Resolver, SystemResolver, check_resolution};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Entry point for all outbound traffic. Every request made through a
/// `SiteScanner` is validated (static allow-list plus a fresh DNS check)
/// immediately before it is sent.
pub struct SiteScanner {
    pub(crate) client: Arc<dyn HttpClient>,
    pub(crate) resolver: Arc<dyn Resolver>,
    pub(crate) config: ScanConfig,
}

impl SiteScanner {
    pub fn new() -> Result<Self> {
        Self::with_config(ScanConfig::default())
    }

    pub fn with_config(config: ScanConfig) -> Result<Self> {
        let client = ReqwestClient::new(&config)?;
        let resolver = SystemResolver::new(config.dns_timeout);

        Ok(Self {
            client: Arc::new(client),
            resolver: Arc::new(resolver),
            config,
        })
    }

    pub fn from_parts(
        client: Arc<dyn HttpClient>,
        resolver: Arc<dyn Resolver>,
        config: ScanConfig,
    ) -> Self {
        Self {
            client,
            resolver,
            config,
        }
    }

    pub fn with_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.client = client;
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn Resolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Static allow-list check followed by a live DNS re-check. Never cached.
    pub async fn check_target(&self, url: &str) -> Result<Url> {
        check_resolution(url, self.resolver.as_ref()).await
    }

    pub async fn guarded_get(
        &self,
        url: &str,
        timeout: Duration,
        max_bytes: usize,
    ) -> Result<HttpResponse> {
        let target = self.check_target(url).await?;
        self.client.get(&target, timeout, max_bytes).await
    }

    pub async fn guarded_head(&self, url: &str, timeout: Duration) -> Result<u16> {
        let target = self.check_target(url).await?;
        self.client.head(&target, timeout).await
    }
}
