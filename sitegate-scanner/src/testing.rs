// In-memory HTTP client and resolver stand-ins for tests in this and downstream crates

use crate::client::{HttpClient, HttpResponse};
use crate::error::{Result, ScanError};
use crate::resolve::{ResolveError, Resolver};
use async_trait::async_trait;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone)]
enum StubRoute {
    Respond {
        status: u16,
        content_type: Option<String>,
        body: Vec<u8>,
    },
    Timeout,
    Fail(String),
}

#[derive(Default)]
pub struct StubClient {
    routes: HashMap<String, StubRoute>,
    requests: Mutex<Vec<String>>,
}

fn route_key(url: &str) -> String {
    Url::parse(url)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| url.to_string())
}

impl StubClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(
        self,
        url: &str,
        status: u16,
        content_type: Option<&str>,
        body: &str,
    ) -> Self {
        self.with_bytes(url, status, content_type, body.as_bytes())
    }

    /// Raw body bytes, decoded lossily on the way out like a real response.
    pub fn with_bytes(
        mut self,
        url: &str,
        status: u16,
        content_type: Option<&str>,
        body: &[u8],
    ) -> Self {
        self.routes.insert(
            route_key(url),
            StubRoute::Respond {
                status,
                content_type: content_type.map(String::from),
                body: body.to_vec(),
            },
        );
        self
    }

    pub fn with_xml(self, url: &str, body: &str) -> Self {
        self.with_response(url, 200, Some("application/xml"), body)
    }

    pub fn with_html(self, url: &str, body: &str) -> Self {
        self.with_response(url, 200, Some("text/html"), body)
    }

    pub fn with_status(self, url: &str, status: u16) -> Self {
        self.with_response(url, status, None, "")
    }

    pub fn with_timeout(mut self, url: &str) -> Self {
        self.routes.insert(route_key(url), StubRoute::Timeout);
        self
    }

    pub fn with_failure(mut self, url: &str, reason: &str) -> Self {
        self.routes
            .insert(route_key(url), StubRoute::Fail(reason.to_string()));
        self
    }

    /// Requests received so far, as `"METHOD url"`.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn was_requested(&self, url: &str) -> bool {
        let key = route_key(url);
        self.requests()
            .iter()
            .any(|r| r.split_once(' ').is_some_and(|(_, u)| u == key))
    }

    fn answer(
        &self,
        verb: &str,
        url: &Url,
        timeout: Duration,
    ) -> Result<(u16, Option<String>, Vec<u8>)> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(format!("{} {}", verb, url));
        }

        match self.routes.get(url.as_str()) {
            None => Ok((404, None, Vec::new())),
            Some(StubRoute::Respond {
                status,
                content_type,
                body,
            }) => Ok((*status, content_type.clone(), body.clone())),
            Some(StubRoute::Timeout) => Err(ScanError::FetchTimeout {
                url: url.to_string(),
                timeout,
            }),
            Some(StubRoute::Fail(reason)) => Err(ScanError::FetchFailed {
                url: url.to_string(),
                reason: reason.clone(),
            }),
        }
    }
}

#[async_trait]
impl HttpClient for StubClient {
    async fn get(&self, url: &Url, timeout: Duration, max_bytes: usize) -> Result<HttpResponse> {
        let (status, content_type, mut body) = self.answer("GET", url, timeout)?;
        let truncated = body.len() > max_bytes;
        body.truncate(max_bytes);

        Ok(HttpResponse {
            status,
            content_type,
            body_bytes: body.len(),
            body: String::from_utf8_lossy(&body).into_owned(),
            truncated,
        })
    }

    async fn head(&self, url: &Url, timeout: Duration) -> Result<u16> {
        self.answer("HEAD", url, timeout).map(|(status, _, _)| status)
    }
}

/// Table-driven resolver. Hosts without an entry get the fallback answer.
pub struct StaticResolver {
    hosts: HashMap<String, Vec<IpAddr>>,
    fallback: std::result::Result<Vec<IpAddr>, ResolveError>,
    lookups: Mutex<Vec<String>>,
}

impl StaticResolver {
    /// Every unknown host resolves to a single public address.
    pub fn public() -> Self {
        Self {
            hosts: HashMap::new(),
            fallback: Ok(vec![IpAddr::from([93, 184, 216, 34])]),
            lookups: Mutex::new(Vec::new()),
        }
    }

    /// Unknown hosts fail to resolve, like NXDOMAIN.
    pub fn strict() -> Self {
        Self {
            hosts: HashMap::new(),
            fallback: Err(ResolveError::Failed("NXDOMAIN".to_string())),
            lookups: Mutex::new(Vec::new()),
        }
    }

    pub fn with_host(mut self, host: &str, addrs: &[&str]) -> Self {
        let addrs: Vec<IpAddr> = addrs.iter().filter_map(|a| a.parse().ok()).collect();
        self.hosts.insert(host.to_ascii_lowercase(), addrs);
        self
    }

    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Resolver for StaticResolver {
    async fn lookup(&self, host: &str) -> std::result::Result<Vec<IpAddr>, ResolveError> {
        if let Ok(mut lookups) = self.lookups.lock() {
            lookups.push(host.to_string());
        }

        match self.hosts.get(&host.to_ascii_lowercase()) {
            Some(addrs) => Ok(addrs.clone()),
            None => self.fallback.clone(),
        }
    }
}
