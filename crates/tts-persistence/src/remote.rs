//! HTTP client for the backend store API.
//!
//! Translates store identifiers to URLs under the configured data base and
//! the derived transformer base:
//!
//! ```text
//! GET    {data}/health
//! GET    {data}/stores                     list
//! GET    {data}/stores/{id}                read
//! PATCH  {data}/stores/{id}                shallow merge, returns merged value
//! PUT    {data}/stores/{id}                replace, returns stored value
//! DELETE {data}/stores[/{id}]              clear
//! GET    {data}/stores/{id}/export
//! POST   {data}/stores/{id}/import
//! GET    {data}/backup
//! POST   {data}/restore
//! POST   {transformer}/inputs              canonical save + derived values
//! POST   {transformer}/modules/{m}/process domain calculation
//! ```

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::PersistenceConfig;
use crate::error::{PersistError, Result};
use crate::merge::JsonObject;

/// Exported snapshot of one store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreExport {
    pub store_id: String,
    pub data: Value,
    pub exported_at: NaiveDateTime,
}

/// Snapshot of every store on the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Backup {
    pub backup_timestamp: NaiveDateTime,
    pub stores: BTreeMap<String, Value>,
}

/// Result of restoring a [`Backup`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RestoreReport {
    pub restored_stores: Vec<String>,
    pub total_stores: usize,
}

/// Calculation selected on the losses endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LossesOperation {
    NoLoadLosses,
    LoadLosses,
}

impl LossesOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoLoadLosses => "no_load_losses",
            Self::LoadLosses => "load_losses",
        }
    }
}

/// Payload of a module calculation request.
///
/// The losses endpoint also needs `operation` and the combined inputs in
/// `data`; both are omitted for the other modules.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessRequest {
    #[serde(rename = "basicData")]
    pub basic_data: Value,
    #[serde(rename = "moduleData")]
    pub module_data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<LossesOperation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ProcessRequest {
    pub fn new(basic_data: Value, module_data: Value) -> Self {
        Self {
            basic_data,
            module_data,
            operation: None,
            data: None,
        }
    }

    /// Select a losses calculation, sending `data` as its inputs.
    #[must_use]
    pub fn with_operation(mut self, operation: LossesOperation, data: Value) -> Self {
        self.operation = Some(operation);
        self.data = Some(data);
        self
    }
}

#[derive(Debug, Deserialize)]
struct StoreList {
    stores: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ImportResponse {
    data: Value,
}

#[derive(Debug, Deserialize)]
struct TransformerInputsResponse {
    updated_data: JsonObject,
}

#[derive(Debug, Deserialize)]
struct ProcessResponse {
    #[serde(default)]
    results: Value,
}

/// Client for the backend key-value API.
#[derive(Debug, Clone)]
pub struct RemoteStoreClient {
    client: reqwest::Client,
    data_base: String,
    transformer_base: String,
}

impl RemoteStoreClient {
    /// Create a client for the API described by `config`.
    pub fn new(config: &PersistenceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| PersistError::Network {
                url: config.data_base().to_string(),
                source: e,
            })?;

        Ok(Self {
            client,
            data_base: config.data_base().to_string(),
            transformer_base: config.transformer_base(),
        })
    }

    /// URL of a single store.
    pub fn store_url(&self, store_id: &str) -> String {
        format!("{}/stores/{}", self.data_base, store_id)
    }

    /// Probe the health endpoint. Any 2xx means the backend is reachable.
    pub async fn health(&self) -> Result<()> {
        let url = format!("{}/health", self.data_base);
        tracing::debug!(%url, "Probing backend");
        self.send_empty(self.client.get(&url), &url).await
    }

    /// Read the current value of a store.
    pub async fn get_store(&self, store_id: &str) -> Result<Value> {
        let url = self.store_url(store_id);
        self.send_json(self.client.get(&url), &url).await
    }

    /// Merge `partial` into a store; returns the server's merged view.
    pub async fn patch_store(&self, store_id: &str, partial: &JsonObject) -> Result<Value> {
        let url = self.store_url(store_id);
        self.send_json(self.client.patch(&url).json(partial), &url)
            .await
    }

    /// Replace a store; returns the stored value.
    pub async fn put_store(&self, store_id: &str, value: &Value) -> Result<Value> {
        let url = self.store_url(store_id);
        self.send_json(self.client.put(&url).json(value), &url).await
    }

    /// Clear one store.
    pub async fn delete_store(&self, store_id: &str) -> Result<()> {
        let url = self.store_url(store_id);
        self.send_empty(self.client.delete(&url), &url).await
    }

    /// Clear every store.
    pub async fn delete_all_stores(&self) -> Result<()> {
        let url = format!("{}/stores", self.data_base);
        self.send_empty(self.client.delete(&url), &url).await
    }

    /// List the store ids known to the backend.
    pub async fn list_stores(&self) -> Result<Vec<String>> {
        let url = format!("{}/stores", self.data_base);
        let list: StoreList = self.send_json(self.client.get(&url), &url).await?;
        Ok(list.stores)
    }

    /// Export one store with its timestamp.
    pub async fn export_store(&self, store_id: &str) -> Result<StoreExport> {
        let url = format!("{}/export", self.store_url(store_id));
        self.send_json(self.client.get(&url), &url).await
    }

    /// Replace a store with imported data; returns the stored value.
    pub async fn import_store(&self, store_id: &str, data: &Value) -> Result<Value> {
        let url = format!("{}/import", self.store_url(store_id));
        let body = serde_json::json!({ "data": data });
        let response: ImportResponse = self
            .send_json(self.client.post(&url).json(&body), &url)
            .await?;
        Ok(response.data)
    }

    /// Fetch a full backup of all stores.
    pub async fn backup(&self) -> Result<Backup> {
        let url = format!("{}/backup", self.data_base);
        self.send_json(self.client.get(&url), &url).await
    }

    /// Restore every store contained in `backup`.
    pub async fn restore(&self, backup: &Backup) -> Result<RestoreReport> {
        let url = format!("{}/restore", self.data_base);
        self.send_json(self.client.post(&url).json(backup), &url)
            .await
    }

    /// Save the canonical transformer inputs through the compute endpoint.
    ///
    /// The server derives dependent quantities (nominal currents, ...) and
    /// returns the complete input object including them.
    pub async fn submit_transformer_inputs(&self, form_data: &JsonObject) -> Result<JsonObject> {
        let url = format!("{}/inputs", self.transformer_base);
        let response: TransformerInputsResponse = self
            .send_json(self.client.post(&url).json(form_data), &url)
            .await?;
        Ok(response.updated_data)
    }

    /// Run a module calculation on the server and return its `results`.
    pub async fn process_module(&self, module: &str, request: &ProcessRequest) -> Result<Value> {
        let url = format!("{}/modules/{}/process", self.transformer_base, module);
        let response: ProcessResponse = self
            .send_json(self.client.post(&url).json(request), &url)
            .await?;
        Ok(response.results)
    }

    async fn send_checked(&self, request: RequestBuilder, url: &str) -> Result<reqwest::Response> {
        let response = request.send().await.map_err(|e| PersistError::Network {
            url: url.to_string(),
            source: e,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PersistError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response)
    }

    async fn send_empty(&self, request: RequestBuilder, url: &str) -> Result<()> {
        self.send_checked(request, url).await.map(|_| ())
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder, url: &str) -> Result<T> {
        let response = self.send_checked(request, url).await?;
        let bytes = response.bytes().await.map_err(|e| PersistError::Network {
            url: url.to_string(),
            source: e,
        })?;
        serde_json::from_slice(&bytes).map_err(|e| PersistError::Json {
            context: url.to_string(),
            source: e,
        })
    }
}
