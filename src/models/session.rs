use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    Idle,
    Testing,
    Connecting,
    Connected,
    Error,
}

/// How the backend knows which connection a call refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum DataSourceIdentity {
    /// Anonymous connection held by the backend for the caller's session.
    Session,
    /// Saved data source with a stable id.
    Persisted(String),
}

impl DataSourceIdentity {
    pub fn persisted_id(&self) -> Option<&str> {
        match self {
            DataSourceIdentity::Session => None,
            DataSourceIdentity::Persisted(id) => Some(id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentDataSource {
    pub identity: DataSourceIdentity,
    #[serde(rename = "type")]
    pub source_type: String,
    pub name: String,
    pub status: ConnectionStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LoadingState {
    pub types: bool,
    pub connection: bool,
    pub tables: bool,
    pub schema: bool,
}
