pub mod error;
pub mod http;
pub mod jsonrpc;
pub mod probe;
pub mod schema;
pub mod session;

pub use error::{ProbeError, ProbeFailure, ProbeStage};
pub use http::McpHttpSession;
pub use probe::{load_api_key, ApiKeyLookup, ProbeReport, ProbeRunner, DEFAULT_ENDPOINT};
pub use schema::SchemaSummary;
pub use session::{Capability, CapabilityResult, CapabilitySession};
