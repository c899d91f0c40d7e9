/// Client configuration loading.
pub mod config;
/// Error taxonomy shared by the builder, dispatcher and transport.
pub mod error;
/// Entity definitions, endpoint building, routing and query emulation.
pub mod rest;
/// Process-wide entity cache and request ledger.
pub mod store;

pub use config::ClientConfig;
pub use error::RestError;
pub use rest::crud::{CrudDispatcher, FetchHandle, Fetched};
pub use rest::entity::{EntityId, Record};
pub use rest::entitydefinition::{EntityDefinition, EntityKind, ParentLink};
pub use rest::fieldtype::FieldType;
pub use rest::querybuilder::{QueryBuilder, Requester};
pub use rest::transport::{HttpTransport, Method, Transport, TransportRequest};
pub use store::Store;

/// Logging verbosity for client operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace every request URL and cache decision.
    Debug,
    /// Emit standard informational output.
    Information,
}

impl Default for LogLevel {
    /// Defaults to `Information` logging.
    fn default() -> Self {
        LogLevel::Information
    }
}
