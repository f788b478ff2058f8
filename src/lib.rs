// TouchLink data source client
// Connectivity and schema introspection for the analytics console backend

pub mod core;
pub mod models;
pub mod utils;

// Re-export commonly used types for convenience
pub use crate::core::datasources::{DataSourceSession, DatasourceApi, SchemaCache, SessionSnapshot};
pub use crate::core::transport::{ApiClient, HttpTransport, LogNotifier, Notifier, Payload, Transport};
pub use models::{
    ConnectionStatus, CurrentDataSource, DataSourceConfig, DataSourceIdentity, DataSourceResponse,
    DataSourceType, FileConfig, RelationalConfig, TableSchema,
};
pub use utils::{ApiError, ApiResult, ClientConfig};
