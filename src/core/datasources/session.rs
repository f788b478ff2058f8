//! The "current data source" and everything hanging off it.
//!
//! Failure policy differs per operation:
//! - type discovery, table listing, schema and data fetches are advisory:
//!   failures are logged and the caller gets `None`;
//! - connection tests never fail: errors become an error-status response;
//! - connecting (and opening, saving or deleting a saved source) propagates
//!   the [`ApiError`] to the caller.
//!
//! The transport layer already notified the user of any failed call, so none
//! of these paths notify again.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

use super::{DatasourceApi, SchemaCache, SchemaCacheStats};
use crate::core::transport::ApiClient;
use crate::models::{
    ConnectionStatus, CurrentDataSource, DataSourceConfig, DataSourceCreateRequest,
    DataSourceDetail, DataSourceIdentity, DataSourceResponse, LoadingState, TableData, TableSchema,
};
use crate::utils::{ApiError, ApiResult, ClientConfig};

const DEFAULT_TABLE_DATA_LIMIT: u32 = 100;

#[derive(Debug, Default)]
struct LoadingFlags {
    types: AtomicBool,
    connection: AtomicBool,
    tables: AtomicBool,
    schema: AtomicBool,
}

impl LoadingFlags {
    fn snapshot(&self) -> LoadingState {
        LoadingState {
            types: self.types.load(Ordering::SeqCst),
            connection: self.connection.load(Ordering::SeqCst),
            tables: self.tables.load(Ordering::SeqCst),
            schema: self.schema.load(Ordering::SeqCst),
        }
    }
}

/// Clears its flag when dropped, including when the owning future is cancelled.
struct LoadingGuard<'a>(&'a AtomicBool);

impl<'a> LoadingGuard<'a> {
    fn start(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        LoadingGuard(flag)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Default)]
struct SessionState {
    supported_types: Vec<String>,
    current: Option<CurrentDataSource>,
    /// Config behind the current connection, kept so it can be saved later.
    config: Option<DataSourceConfig>,
    status: ConnectionStatus,
    tables: Vec<String>,
    schemas: SchemaCache,
}

impl SessionState {
    fn clear_connection(&mut self) {
        self.current = None;
        self.config = None;
        self.tables.clear();
        self.schemas.reset();
    }

    fn install(&mut self, current: CurrentDataSource, config: Option<DataSourceConfig>) {
        self.tables.clear();
        self.schemas.reset();
        self.current = Some(current);
        self.config = config;
        self.status = ConnectionStatus::Connected;
    }
}

/// Everything a UI reads, taken under one lock.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub supported_types: Vec<String>,
    pub current_data_source: Option<CurrentDataSource>,
    pub status: ConnectionStatus,
    pub tables: Vec<String>,
    pub table_schemas: HashMap<String, TableSchema>,
    pub loading: LoadingState,
}

/// Owns the current data source, its table list and its schema cache.
///
/// Create one per application and share it (`Arc<DataSourceSession>`); nothing
/// else mutates this state.
pub struct DataSourceSession {
    api: DatasourceApi,
    state: RwLock<SessionState>,
    loading: LoadingFlags,
    table_data_limit: u32,
}

impl DataSourceSession {
    pub fn new(api: DatasourceApi) -> Self {
        Self {
            api,
            state: RwLock::new(SessionState::default()),
            loading: LoadingFlags::default(),
            table_data_limit: DEFAULT_TABLE_DATA_LIMIT,
        }
    }

    pub fn from_config(config: &ClientConfig) -> ApiResult<Self> {
        let client = ApiClient::from_config(config)?;
        Ok(Self::new(DatasourceApi::new(client)).with_table_data_limit(config.table_data_limit))
    }

    pub fn with_table_data_limit(mut self, limit: u32) -> Self {
        self.table_data_limit = limit;
        self
    }

    pub fn api(&self) -> &DatasourceApi {
        &self.api
    }

    // Guards are never held across an await, so a poisoned lock only means a
    // panic elsewhere mid-update; the state is still structurally valid.
    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn fail_connection(&self) {
        let mut state = self.write();
        state.clear_connection();
        state.status = ConnectionStatus::Error;
    }

    /// Identity and cache generation of the current connection, if any.
    fn connection_scope(&self) -> Option<(DataSourceIdentity, u64)> {
        let state = self.read();
        let current = state.current.as_ref()?;
        Some((current.identity.clone(), state.schemas.generation()))
    }

    /// Refreshes the supported type list. On failure the previous list is kept
    /// and `None` is returned; falling back to defaults is up to the caller.
    pub async fn fetch_data_source_types(&self) -> Option<Vec<String>> {
        let _loading = LoadingGuard::start(&self.loading.types);
        match self.api.types().await {
            Ok(types) => {
                debug!("Supported data source types: {:?}", types);
                self.write().supported_types = types.clone();
                Some(types)
            }
            Err(e) => {
                warn!("Failed to fetch data source types: {}", e);
                None
            }
        }
    }

    /// Checks reachability and credentials. Always resolves with a response;
    /// failures come back with `status: error`.
    pub async fn test_connection(&self, config: &DataSourceConfig) -> DataSourceResponse {
        let _loading = LoadingGuard::start(&self.loading.connection);
        let previous = {
            let mut state = self.write();
            std::mem::replace(&mut state.status, ConnectionStatus::Testing)
        };

        debug!("Testing connection to {}", config.display_name());
        let response = match self.api.test(config).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Connection test for {} failed: {}", config.display_name(), e);
                DataSourceResponse::error_for(config, e.to_string())
            }
        };

        let mut state = self.write();
        if state.status == ConnectionStatus::Testing {
            state.status = previous;
        }
        response
    }

    /// Opens a session-scoped connection and makes it current, then loads its
    /// table list before returning.
    pub async fn connect(&self, config: &DataSourceConfig) -> ApiResult<DataSourceResponse> {
        let _loading = LoadingGuard::start(&self.loading.connection);
        self.write().status = ConnectionStatus::Connecting;

        let response = match self.api.connect(config).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Failed to connect to {}: {}", config.display_name(), e);
                self.fail_connection();
                return Err(e);
            }
        };

        if !response.is_success() {
            let message = response
                .message
                .clone()
                .unwrap_or_else(|| "Connection failed".to_string());
            warn!("Backend rejected connection to {}: {}", config.display_name(), message);
            self.fail_connection();
            return Err(ApiError::ConnectionRejected(message));
        }

        let name = if response.name.is_empty() {
            config.display_name()
        } else {
            response.name.clone()
        };
        let current = CurrentDataSource {
            identity: DataSourceIdentity::Session,
            source_type: response.source_type.clone(),
            name,
            status: ConnectionStatus::Connected,
        };
        info!("Connected to {} ({})", current.name, current.source_type);
        self.write().install(current, Some(config.clone()));

        self.fetch_tables().await;
        Ok(response)
    }

    /// Makes a saved data source current. Table and schema calls then go
    /// through its id.
    pub async fn open_saved(&self, id: &str) -> ApiResult<CurrentDataSource> {
        let _loading = LoadingGuard::start(&self.loading.connection);
        self.write().status = ConnectionStatus::Connecting;

        let detail = match self.api.detail(id).await {
            Ok(detail) => detail,
            Err(e) => {
                warn!("Failed to open saved data source {}: {}", id, e);
                self.fail_connection();
                return Err(e);
            }
        };

        let current = CurrentDataSource {
            identity: DataSourceIdentity::Persisted(detail.id.clone()),
            source_type: detail.source_type.clone(),
            name: detail.name.clone(),
            status: ConnectionStatus::Connected,
        };
        info!("Opened saved data source {} ({})", current.name, detail.id);
        self.write().install(current.clone(), detail.typed_config());

        self.fetch_tables().await;
        Ok(current)
    }

    /// Persists the current connection under `name` and switches the session
    /// over to the saved identity.
    pub async fn save_current(&self, name: &str) -> ApiResult<DataSourceDetail> {
        let config = {
            let state = self.read();
            match (&state.current, &state.config) {
                (Some(_), Some(config)) => config.clone(),
                _ => return Err(ApiError::NotConnected),
            }
        };

        let detail = self
            .api
            .save(&DataSourceCreateRequest::new(name, config.clone()))
            .await?;

        let upgraded = {
            let mut state = self.write();
            // Another connect may have landed while saving.
            if state.current.is_some() && state.config.as_ref() == Some(&config) {
                let current = CurrentDataSource {
                    identity: DataSourceIdentity::Persisted(detail.id.clone()),
                    source_type: detail.source_type.clone(),
                    name: detail.name.clone(),
                    status: ConnectionStatus::Connected,
                };
                state.install(current, Some(config));
                true
            } else {
                false
            }
        };

        if upgraded {
            info!("Saved current connection as {} ({})", detail.name, detail.id);
            self.fetch_tables().await;
        } else {
            debug!("Connection changed while saving {}; identity left as is", detail.id);
        }
        Ok(detail)
    }

    /// Deletes a saved data source, disconnecting first if it is the current one.
    pub async fn delete_saved(&self, id: &str) -> ApiResult<()> {
        self.api.delete(id).await?;

        let is_current = self
            .read()
            .current
            .as_ref()
            .and_then(|c| c.identity.persisted_id())
            == Some(id);
        if is_current {
            self.disconnect();
        }
        Ok(())
    }

    /// Replaces the table list. Does nothing without a current connection.
    pub async fn fetch_tables(&self) -> Option<Vec<String>> {
        let (identity, generation) = self.connection_scope()?;
        let _loading = LoadingGuard::start(&self.loading.tables);

        match self.api.tables(&identity).await {
            Ok(list) => {
                let mut state = self.write();
                if state.schemas.generation() != generation {
                    debug!("Discarding table list from a previous connection");
                    return None;
                }
                state.tables = list.tables.clone();
                Some(list.tables)
            }
            Err(e) => {
                warn!("Failed to fetch tables: {}", e);
                None
            }
        }
    }

    /// Always goes to the backend and overwrites the cached entry. Does nothing
    /// without a current connection.
    pub async fn fetch_table_schema(&self, table_name: &str) -> Option<TableSchema> {
        let (identity, generation) = self.connection_scope()?;
        let _loading = LoadingGuard::start(&self.loading.schema);

        match self.api.table_schema(&identity, table_name).await {
            Ok(schema) => {
                let stored = self.write().schemas.insert(generation, table_name, schema.clone());
                stored.then_some(schema)
            }
            Err(e) => {
                warn!("Failed to fetch schema for table {}: {}", table_name, e);
                None
            }
        }
    }

    /// Sample rows for a preview; not cached.
    pub async fn fetch_table_data(&self, table_name: &str, limit: Option<u32>) -> Option<TableData> {
        let (identity, generation) = self.connection_scope()?;
        let limit = limit.unwrap_or(self.table_data_limit);

        match self.api.table_data(&identity, table_name, limit).await {
            Ok(data) => {
                if self.read().schemas.generation() != generation {
                    debug!("Discarding rows for {} from a previous connection", table_name);
                    return None;
                }
                Some(data)
            }
            Err(e) => {
                warn!("Failed to fetch data for table {}: {}", table_name, e);
                None
            }
        }
    }

    /// Drops the current data source, its tables and its schemas in one step.
    pub fn disconnect(&self) {
        let mut state = self.write();
        if let Some(current) = &state.current {
            info!("Disconnecting from {}", current.name);
        }
        state.clear_connection();
        state.status = ConnectionStatus::Idle;
    }

    pub fn supported_types(&self) -> Vec<String> {
        self.read().supported_types.clone()
    }

    pub fn current_data_source(&self) -> Option<CurrentDataSource> {
        self.read().current.clone()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.read().status
    }

    pub fn tables(&self) -> Vec<String> {
        self.read().tables.clone()
    }

    pub fn table_schemas(&self) -> HashMap<String, TableSchema> {
        self.read().schemas.to_map()
    }

    pub fn table_schema(&self, table_name: &str) -> Option<TableSchema> {
        self.read().schemas.get(table_name).cloned()
    }

    pub fn loading(&self) -> LoadingState {
        self.loading.snapshot()
    }

    pub fn cache_stats(&self) -> SchemaCacheStats {
        self.read().schemas.stats()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.read();
        SessionSnapshot {
            supported_types: state.supported_types.clone(),
            current_data_source: state.current.clone(),
            status: state.status,
            tables: state.tables.clone(),
            table_schemas: state.schemas.to_map(),
            loading: self.loading.snapshot(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loading_guard_clears_on_drop() {
        let flags = LoadingFlags::default();
        {
            let _guard = LoadingGuard::start(&flags.schema);
            assert!(flags.snapshot().schema);
            assert!(!flags.snapshot().tables);
        }
        assert!(!flags.snapshot().schema);
    }

    #[test]
    fn test_clear_connection_resets_everything_together() {
        let mut state = SessionState::default();
        state.install(
            CurrentDataSource {
                identity: DataSourceIdentity::Session,
                source_type: "mysql".into(),
                name: "db1:3306/sales".into(),
                status: ConnectionStatus::Connected,
            },
            None,
        );
        state.tables = vec!["orders".into()];
        let generation = state.schemas.generation();
        state.schemas.insert(
            generation,
            "orders",
            TableSchema {
                table_name: "orders".into(),
                columns: Vec::new(),
            },
        );

        state.clear_connection();
        assert!(state.current.is_none());
        assert!(state.tables.is_empty());
        assert!(state.schemas.is_empty());
        assert_ne!(state.schemas.generation(), generation);
    }
}
