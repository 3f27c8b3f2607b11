pub mod audit;
pub mod export;
pub mod quality;
pub mod sampler;

pub use audit::{AuditOptions, AuditReport, execute_audit, generate_audit_report};
pub use export::{ExportCapabilities, MigrationFeasibility, check_export_capabilities};
pub use quality::{DataQualityReport, assess_data_quality};
pub use sampler::sample_pages;
