// Static allow-list check for outbound URLs (SSRF gate)

use crate::error::{Result, ScanError};
use serde::Serialize;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use url::{Host, Url};

const ALLOWED_SCHEMES: [&str; 2] = ["http", "https"];
const BLOCKED_HOSTNAMES: [&str; 2] = ["localhost", "localhost.localdomain"];
const BLOCKED_HOST_SUFFIXES: [&str; 2] = [".local", ".internal"];

/// Why a URL was accepted or rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VerdictReason {
    Allowed,
    Unparseable,
    DisallowedScheme,
    MissingHost,
    BlockedHostname,
    BlockedAddress,
}

impl VerdictReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerdictReason::Allowed => "allowed",
            VerdictReason::Unparseable => "unparseable",
            VerdictReason::DisallowedScheme => "disallowed_scheme",
            VerdictReason::MissingHost => "missing_host",
            VerdictReason::BlockedHostname => "blocked_hostname",
            VerdictReason::BlockedAddress => "blocked_address",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ValidationVerdict {
    pub allowed: bool,
    pub reason: VerdictReason,
}

/// Returns true only for http(s) URLs whose host is neither a blocked name
/// nor a blocked literal address. Fails closed on anything unparseable.
pub fn is_allowed_url(url: &str) -> bool {
    check_url(url).allowed
}

pub fn check_url(url: &str) -> ValidationVerdict {
    match evaluate(url) {
        Ok(_) => ValidationVerdict {
            allowed: true,
            reason: VerdictReason::Allowed,
        },
        Err(reason) => ValidationVerdict {
            allowed: false,
            reason,
        },
    }
}

/// Parse and validate in one step, mapping rejections onto `ScanError`.
pub fn ensure_allowed(url: &str) -> Result<Url> {
    evaluate(url).map_err(|reason| match reason {
        VerdictReason::BlockedHostname | VerdictReason::BlockedAddress => {
            ScanError::PrivateAddressBlocked(format!("{} ({})", url, reason.as_str()))
        }
        _ => ScanError::InvalidUrl(format!("{} ({})", url, reason.as_str())),
    })
}

fn evaluate(raw: &str) -> std::result::Result<Url, VerdictReason> {
    let url = Url::parse(raw.trim()).map_err(|_| VerdictReason::Unparseable)?;

    if !ALLOWED_SCHEMES.contains(&url.scheme()) {
        return Err(VerdictReason::DisallowedScheme);
    }

    match url.host() {
        None => return Err(VerdictReason::MissingHost),
        Some(Host::Domain(domain)) => {
            if is_blocked_hostname(domain) {
                return Err(VerdictReason::BlockedHostname);
            }
        }
        Some(Host::Ipv4(ip)) => {
            if is_blocked_ipv4(ip) {
                return Err(VerdictReason::BlockedAddress);
            }
        }
        Some(Host::Ipv6(ip)) => {
            if is_blocked_ipv6(ip) {
                return Err(VerdictReason::BlockedAddress);
            }
        }
    }

    Ok(url)
}

pub fn is_blocked_hostname(host: &str) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    if host.is_empty() {
        return true;
    }

    BLOCKED_HOSTNAMES.contains(&host.as_str())
        || BLOCKED_HOST_SUFFIXES
            .iter()
            .any(|suffix| host.ends_with(suffix))
}

pub fn is_blocked_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_blocked_ipv4(v4),
        IpAddr::V6(v6) => is_blocked_ipv6(v6),
    }
}

pub fn is_blocked_ipv4(ip: Ipv4Addr) -> bool {
    let [a, b, _, _] = ip.octets();

    a == 0 // this network, includes 0.0.0.0
        || a == 127 // loopback
        || a == 10
        || (a == 172 && (16..=31).contains(&b))
        || (a == 192 && b == 168)
        || (a == 169 && b == 254) // link-local and cloud metadata
        || (a == 100 && (64..=127).contains(&b)) // carrier-grade NAT
        || a >= 224 // multicast 224-239, reserved 240-255
}

pub fn is_blocked_ipv6(ip: Ipv6Addr) -> bool {
    if ip.is_loopback() || ip.is_unspecified() {
        return true;
    }

    let segments = ip.segments();
    let first = segments[0];
    if (first & 0xffc0) == 0xfe80 // link-local fe80::/10
        || (first & 0xfe00) == 0xfc00 // unique local fc00::/7
        || (first & 0xff00) == 0xff00
    {
        return true;
    }

    // IPv4-mapped (::ffff:a.b.c.d) and IPv4-compatible (::a.b.c.d), whatever
    // spelling the literal used.
    if let Some(v4) = ip.to_ipv4() {
        return is_blocked_ipv4(v4);
    }

    // NAT64 well-known prefix 64:ff9b::/96
    if segments[..6] == [0x64, 0xff9b, 0, 0, 0, 0] {
        let [.., hi, lo] = segments;
        let embedded = Ipv4Addr::from(((hi as u32) << 16) | lo as u32);
        return is_blocked_ipv4(embedded);
    }

    false
}
