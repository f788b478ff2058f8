//! Typed wrappers over the `/datasources` endpoints.

use crate::core::transport::ApiClient;
use crate::models::{
    DataSourceConfig, DataSourceCreateRequest, DataSourceDetail, DataSourceIdentity,
    DataSourceResponse, DataSourceUpdateRequest, TableData, TableList, TableSchema,
};
use crate::utils::ApiResult;

#[derive(Clone)]
pub struct DatasourceApi {
    client: ApiClient,
}

/// Persisted ids take precedence. The unsaved connection lists its tables
/// under `/datasources/session` but serves schema and data from `/datasources/tables`.
fn tables_path(identity: &DataSourceIdentity) -> String {
    match identity {
        DataSourceIdentity::Persisted(id) => format!("/datasources/{}/tables", urlencoding::encode(id)),
        DataSourceIdentity::Session => "/datasources/session/tables".to_string(),
    }
}

fn table_path(identity: &DataSourceIdentity, table: &str, leaf: &str) -> String {
    let table = urlencoding::encode(table);
    match identity {
        DataSourceIdentity::Persisted(id) => {
            format!("/datasources/{}/tables/{}/{}", urlencoding::encode(id), table, leaf)
        }
        DataSourceIdentity::Session => format!("/datasources/tables/{}/{}", table, leaf),
    }
}

impl DatasourceApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub async fn types(&self) -> ApiResult<Vec<String>> {
        self.client.get("/datasources/types").await
    }

    pub async fn test(&self, config: &DataSourceConfig) -> ApiResult<DataSourceResponse> {
        self.client.post("/datasources/test", config).await
    }

    pub async fn connect(&self, config: &DataSourceConfig) -> ApiResult<DataSourceResponse> {
        self.client.post("/datasources/connect", config).await
    }

    pub async fn save(&self, request: &DataSourceCreateRequest) -> ApiResult<DataSourceDetail> {
        self.client.post("/datasources", request).await
    }

    pub async fn list(&self) -> ApiResult<Vec<DataSourceDetail>> {
        self.client.get("/datasources").await
    }

    pub async fn detail(&self, id: &str) -> ApiResult<DataSourceDetail> {
        self.client
            .get(&format!("/datasources/{}", urlencoding::encode(id)))
            .await
    }

    pub async fn update(&self, id: &str, request: &DataSourceUpdateRequest) -> ApiResult<DataSourceDetail> {
        self.client
            .put(&format!("/datasources/{}", urlencoding::encode(id)), request)
            .await
    }

    pub async fn delete(&self, id: &str) -> ApiResult<()> {
        self.client
            .delete(&format!("/datasources/{}", urlencoding::encode(id)))
            .await
    }

    pub async fn tables(&self, identity: &DataSourceIdentity) -> ApiResult<TableList> {
        self.client.get(&tables_path(identity)).await
    }

    pub async fn table_schema(&self, identity: &DataSourceIdentity, table: &str) -> ApiResult<TableSchema> {
        self.client.get(&table_path(identity, table, "schema")).await
    }

    pub async fn table_data(
        &self,
        identity: &DataSourceIdentity,
        table: &str,
        limit: u32,
    ) -> ApiResult<TableData> {
        self.client
            .get_with_query(
                &table_path(identity, table, "data"),
                vec![("limit".to_string(), limit.to_string())],
            )
            .await
    }
}
