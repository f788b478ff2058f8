use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSourceType {
    Mysql,
    Mongodb,
    Excel,
}

impl DataSourceType {
    /// Fallback list for callers whose type discovery failed.
    pub const DEFAULTS: [DataSourceType; 3] = [
        DataSourceType::Mysql,
        DataSourceType::Mongodb,
        DataSourceType::Excel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DataSourceType::Mysql => "mysql",
            DataSourceType::Mongodb => "mongodb",
            DataSourceType::Excel => "excel",
        }
    }

    pub fn default_names() -> Vec<String> {
        Self::DEFAULTS.iter().map(|t| t.as_str().to_string()).collect()
    }
}

impl fmt::Display for DataSourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataSourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mysql" => Ok(DataSourceType::Mysql),
            "mongodb" | "mongo" => Ok(DataSourceType::Mongodb),
            "excel" => Ok(DataSourceType::Excel),
            other => Err(format!("Unsupported data source type: {}", other)),
        }
    }
}

/// Connection settings for a database-backed source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationalConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

/// An uploaded spreadsheet exposed as a single table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileConfig {
    pub file_path: String,
    pub table_name: String,
}

/// Wire shape: `{"type": "mysql", "host": ..., ...}` or `{"type": "excel", "file_path": ..., ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DataSourceConfig {
    Mysql(RelationalConfig),
    Mongodb(RelationalConfig),
    Excel(FileConfig),
}

impl DataSourceConfig {
    pub fn source_type(&self) -> DataSourceType {
        match self {
            DataSourceConfig::Mysql(_) => DataSourceType::Mysql,
            DataSourceConfig::Mongodb(_) => DataSourceType::Mongodb,
            DataSourceConfig::Excel(_) => DataSourceType::Excel,
        }
    }

    /// Display label: `host:port/database` for databases, the table name for files.
    pub fn display_name(&self) -> String {
        match self {
            DataSourceConfig::Mysql(db) | DataSourceConfig::Mongodb(db) => {
                format!("{}:{}/{}", db.host, db.port, db.database)
            }
            DataSourceConfig::Excel(file) => file.table_name.clone(),
        }
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
        let config = serde_json::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("Invalid data source config in {}: {}", path.display(), e))?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
    #[serde(other)]
    Unknown,
}

/// Result of a connection test or connect call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSourceResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub source_type: String,
    pub name: String,
    pub status: ResponseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl DataSourceResponse {
    /// Same shape as a backend answer, built locally for a failed call.
    pub fn error_for(config: &DataSourceConfig, message: impl Into<String>) -> Self {
        DataSourceResponse {
            id: None,
            source_type: config.source_type().to_string(),
            name: config.display_name(),
            status: ResponseStatus::Error,
            message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSourceCreateRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub source_type: DataSourceType,
    pub config: DataSourceConfig,
}

impl DataSourceCreateRequest {
    pub fn new(name: impl Into<String>, config: DataSourceConfig) -> Self {
        Self {
            name: name.into(),
            source_type: config.source_type(),
            config,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataSourceUpdateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<DataSourceConfig>,
}

/// A persisted data source as listed by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSourceDetail {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub source_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl DataSourceDetail {
    /// Saved configs are stored without a discriminator on some backends, so
    /// the detail's own `type` is folded back in before decoding.
    pub fn typed_config(&self) -> Option<DataSourceConfig> {
        let mut config = self.config.clone()?;
        if let Some(obj) = config.as_object_mut() {
            obj.entry("type")
                .or_insert_with(|| Value::String(self.source_type.clone()));
        }
        serde_json::from_value(config).ok()
    }
}
