// ABOUTME: Type-safe identifiers and validated domain types.
// ABOUTME: Uses phantom types to prevent ID confusion at compile time.

mod id;
mod source_ref;
mod subdomain;

pub use id::{ContainerId, DeploymentId, DnsRecordId, Id, ImageId};
pub use source_ref::{ParseSourceRefError, SourceRef};
pub use subdomain::{Subdomain, SubdomainError};
