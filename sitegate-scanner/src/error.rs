use std::time::Duration;
use thiserror::Error;

/// Structural problems that make an XML document unsafe to hand to a parser.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum XmlViolation {
    #[error("XML document is {size} bytes, limit is {limit}")]
    TooLarge { size: usize, limit: usize },

    #[error("DOCTYPE with SYSTEM identifier is not allowed")]
    ExternalSystemDoctype,

    #[error("DOCTYPE with PUBLIC identifier is not allowed")]
    ExternalPublicDoctype,

    #[error("parameter entity reference '%{0};' is not allowed")]
    ParameterEntity(String),

    #[error("DOCTYPE declarations are not allowed")]
    Doctype,

    #[error("ENTITY declarations are not allowed")]
    EntityDeclaration,
}

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Private address blocked: {0}")]
    PrivateAddressBlocked(String),

    #[error("Unsafe XML structure: {0}")]
    UnsafeXml(#[from] XmlViolation),

    #[error("No sitemap found for {0}")]
    NoSitemapFound(String),

    #[error("Request to {url} timed out after {timeout:?}")]
    FetchTimeout { url: String, timeout: Duration },

    #[error("Request to {url} failed: {reason}")]
    FetchFailed { url: String, reason: String },

    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("DNS resolution for {host} failed: {reason}")]
    DnsResolution { host: String, reason: String },

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("HTTP client error: {0}")]
    Client(String),
}

/// Coarse grouping used by callers to tell a hostile target from a missing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Target or document was rejected by a security gate.
    Security,
    /// Nothing usable was found.
    NotFound,
    /// Network, protocol or parse failure.
    Transport,
}

impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::Security => "security",
            ErrorClass::NotFound => "not_found",
            ErrorClass::Transport => "transport",
        }
    }
}

impl ScanError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ScanError::InvalidUrl(_)
            | ScanError::PrivateAddressBlocked(_)
            | ScanError::UnsafeXml(_) => ErrorClass::Security,
            ScanError::NoSitemapFound(_) => ErrorClass::NotFound,
            ScanError::FetchTimeout { .. }
            | ScanError::FetchFailed { .. }
            | ScanError::HttpStatus { .. }
            | ScanError::DnsResolution { .. }
            | ScanError::ParseError(_)
            | ScanError::Client(_) => ErrorClass::Transport,
        }
    }

    /// Security errors abort the enclosing operation; they are never
    /// downgraded to "try the next candidate".
    pub fn is_security(&self) -> bool {
        self.class() == ErrorClass::Security
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_security_classification() {
        assert!(ScanError::InvalidUrl("file:///etc/passwd".into()).is_security());
        assert!(ScanError::PrivateAddressBlocked("10.0.0.1".into()).is_security());
        assert!(ScanError::UnsafeXml(XmlViolation::Doctype).is_security());

        assert!(!ScanError::NoSitemapFound("https://example.com".into()).is_security());
        assert!(
            !ScanError::HttpStatus {
                url: "https://example.com/sitemap.xml".into(),
                status: 404
            }
            .is_security()
        );
        assert_eq!(
            ScanError::FetchTimeout {
                url: "https://example.com".into(),
                timeout: Duration::from_secs(10)
            }
            .class(),
            ErrorClass::Transport
        );
    }

    #[test]
    fn test_error_class_names() {
        assert_eq!(
            ScanError::NoSitemapFound("https://example.com".into())
                .class()
                .as_str(),
            "not_found"
        );
        assert_eq!(ErrorClass::Security.as_str(), "security");
        assert_eq!(ErrorClass::Transport.as_str(), "transport");
    }

    #[test]
    fn test_xml_violation_converts_into_scan_error() {
        let err: ScanError = XmlViolation::EntityDeclaration.into();
        assert!(matches!(err, ScanError::UnsafeXml(XmlViolation::EntityDeclaration)));
        assert!(err.to_string().contains("ENTITY"));
    }
}
