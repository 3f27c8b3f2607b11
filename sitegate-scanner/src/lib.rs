pub mod client;
pub mod config;
pub mod error;
pub mod guard;
pub mod page;
pub mod resolve;
pub mod result;
pub mod scanner;
pub mod sitemap;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod xml_gate;

pub use client::{HttpClient, HttpResponse, ReqwestClient};
pub use config::ScanConfig;
pub use error::{ErrorClass, Result, ScanError, XmlViolation};
pub use guard::{ValidationVerdict, VerdictReason, check_url, is_allowed_url};
pub use resolve::{Resolver, SystemResolver, validate_url_resolution};
pub use result::{PageContent, Sitemap, SitemapDocument};
pub use scanner::SiteScanner;
pub use xml_gate::validate_xml;
