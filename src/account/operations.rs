//! Storage account client operations
//!
//! This module defines the client seam the reconciler talks to and its
//! Azure implementation over the Resource Manager REST API and the storage
//! data-plane service properties endpoints.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{header::HeaderMap, Client, Response};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use super::models::{
    AccountSnapshot, ConnectionStatus, PrivateEndpointConnection, ServiceKind, ServiceProperties,
};
use super::wire::{decode_service_properties, decode_storage_error, encode_service_properties};
use crate::auth::provider::{AzureAuthProvider, MANAGEMENT_SCOPE, STORAGE_SCOPE};
use crate::config::Config;
use crate::error::{Result, StorsyncError};
use crate::utils::network::{classify_network_error, create_http_client, NetworkConfig};

const STORAGE_API_VERSION: &str = "2023-01-01";
const RESOURCES_API_VERSION: &str = "2021-04-01";
const DATA_PLANE_VERSION: &str = "2021-08-06";

/// Trait for the cloud calls a reconciliation run makes
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StorageAccountClient: Send + Sync {
    /// Location of a resource group
    async fn resource_group_location(&self, resource_group: &str) -> Result<String>;

    /// Look up an account; `None` when it does not exist
    async fn lookup_account(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<Option<AccountSnapshot>>;

    /// Read the logging/metrics settings of one sub-service
    async fn get_service_properties(
        &self,
        account_name: &str,
        service: ServiceKind,
    ) -> Result<ServiceProperties>;

    /// Write the logging/metrics settings of one sub-service
    async fn set_service_properties(
        &self,
        account_name: &str,
        service: ServiceKind,
        properties: &ServiceProperties,
    ) -> Result<()>;

    /// List private endpoint connections on an account
    async fn list_private_endpoint_connections(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<Vec<PrivateEndpointConnection>>;

    /// Move a listed private endpoint connection to `Approved`, keeping
    /// the rest of its connection state
    async fn approve_private_endpoint_connection(
        &self,
        resource_group: &str,
        name: &str,
        connection: &PrivateEndpointConnection,
    ) -> Result<()>;
}

/// Azure storage account client implementation
pub struct AzureStorageAccountClient {
    auth_provider: Arc<dyn AzureAuthProvider>,
    http_client: Client,
    subscription_id: String,
    management_endpoint: String,
    storage_endpoint_suffix: String,
}

impl AzureStorageAccountClient {
    /// Create a new client for the subscription in `config`
    pub fn new(auth_provider: Arc<dyn AzureAuthProvider>, config: &Config) -> Result<Self> {
        let network_config = NetworkConfig::default();
        let http_client = create_http_client(&network_config)?;

        Ok(Self {
            auth_provider,
            http_client,
            subscription_id: config.subscription_id.clone(),
            management_endpoint: config.management_endpoint.trim_end_matches('/').to_string(),
            storage_endpoint_suffix: config.storage_endpoint_suffix.clone(),
        })
    }

    /// Create authorized headers for a token scope
    async fn create_headers(&self, scope: &str) -> Result<HeaderMap> {
        let token = self.auth_provider.get_token(&[scope]).await?;
        let mut headers = HeaderMap::new();
        headers.insert(
            "Authorization",
            format!("Bearer {}", token.token.secret())
                .parse()
                .map_err(|e| {
                    StorsyncError::authentication(format!("Invalid token format: {}", e))
                })?,
        );
        headers.insert(
            "x-ms-client-request-id",
            Uuid::new_v4()
                .to_string()
                .parse()
                .map_err(|e| StorsyncError::network(format!("Invalid request id: {}", e)))?,
        );
        Ok(headers)
    }

    /// Headers for the storage data plane
    async fn create_data_plane_headers(&self) -> Result<HeaderMap> {
        let mut headers = self.create_headers(STORAGE_SCOPE).await?;
        let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        headers.insert(
            "x-ms-date",
            date.parse()
                .map_err(|e| StorsyncError::network(format!("Invalid date header: {}", e)))?,
        );
        headers.insert(
            "x-ms-version",
            DATA_PLANE_VERSION
                .parse()
                .map_err(|e| StorsyncError::network(format!("Invalid version header: {}", e)))?,
        );
        Ok(headers)
    }

    /// Build Azure Resource Manager URL
    fn build_arm_url(&self, path: &str, api_version: &str) -> String {
        format!(
            "{}{}?api-version={}",
            self.management_endpoint, path, api_version
        )
    }

    /// Get storage account ARM resource ID
    fn get_account_resource_id(&self, resource_group: &str, name: &str) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Storage/storageAccounts/{}",
            self.subscription_id, resource_group, name
        )
    }

    /// Service properties URL of a sub-service
    fn build_service_properties_url(&self, account_name: &str, service: ServiceKind) -> String {
        format!(
            "https://{}.{}.{}/?restype=service&comp=properties",
            account_name,
            service.as_str(),
            self.storage_endpoint_suffix
        )
    }

    /// Parse Azure error response from either ARM (JSON) or the data plane (XML)
    fn parse_azure_error(&self, status: u16, body: &str) -> StorsyncError {
        if let Ok(error_json) = serde_json::from_str::<Value>(body) {
            if let Some(error) = error_json.get("error") {
                if let Some(message) = error.get("message").and_then(|m| m.as_str()) {
                    return StorsyncError::azure_api(format!("HTTP {}: {}", status, message));
                }
            }
        }
        if let Some(message) = decode_storage_error(body) {
            return StorsyncError::azure_api(format!("HTTP {}: {}", status, message));
        }
        StorsyncError::azure_api(format!("HTTP {}: {}", status, body))
    }

    async fn ensure_success(&self, response: Response) -> Result<Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status_code = response.status().as_u16();
        let error_body = response.text().await.unwrap_or_default();
        Err(self.parse_azure_error(status_code, &error_body))
    }

    async fn get_json(&self, url: &str) -> Result<Option<Value>> {
        let headers = self.create_headers(MANAGEMENT_SCOPE).await?;
        let response = self
            .http_client
            .get(url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| classify_network_error(&e, url))?;

        if response.status().as_u16() == 404 {
            return Ok(None);
        }

        let response = self.ensure_success(response).await?;
        let data: Value = response.json().await?;
        Ok(Some(data))
    }

    /// Parse storage account properties from an ARM response
    fn parse_account(&self, data: &Value, resource_group: &str) -> AccountSnapshot {
        let str_field = |value: Option<&Value>| value.and_then(|v| v.as_str()).map(String::from);
        let properties = data.get("properties");

        let primary_endpoints: BTreeMap<String, String> = properties
            .and_then(|p| p.get("primaryEndpoints"))
            .and_then(|e| e.as_object())
            .map(|endpoints| {
                endpoints
                    .iter()
                    .filter_map(|(k, v)| v.as_str().map(|url| (k.clone(), url.to_string())))
                    .collect()
            })
            .unwrap_or_default();

        let tags: HashMap<String, String> = data
            .get("tags")
            .and_then(|t| t.as_object())
            .map(|tags| {
                tags.iter()
                    .filter_map(|(k, v)| v.as_str().map(|value| (k.clone(), value.to_string())))
                    .collect()
            })
            .unwrap_or_default();

        AccountSnapshot {
            id: str_field(data.get("id")),
            name: str_field(data.get("name")),
            location: str_field(data.get("location")),
            resource_group: Some(resource_group.to_string()),
            account_type: str_field(data.get("sku").and_then(|s| s.get("name"))),
            kind: str_field(data.get("kind")),
            provisioning_state: str_field(properties.and_then(|p| p.get("provisioningState"))),
            primary_location: str_field(properties.and_then(|p| p.get("primaryLocation"))),
            status_of_primary: str_field(properties.and_then(|p| p.get("statusOfPrimary"))),
            primary_endpoints,
            tags,
            monitoring: BTreeMap::new(),
            private_endpoint_connection: Some(Vec::new()),
        }
    }

    /// Parse one private endpoint connection from an ARM response
    fn parse_private_endpoint_connection(&self, data: &Value) -> Option<PrivateEndpointConnection> {
        let name = data.get("name")?.as_str()?.to_string();
        let properties = data.get("properties");
        let state = properties.and_then(|p| p.get("privateLinkServiceConnectionState"));

        let status = state
            .and_then(|s| s.get("status"))
            .and_then(|s| s.as_str())
            .unwrap_or_default()
            .to_string();

        Some(PrivateEndpointConnection {
            id: data.get("id").and_then(|v| v.as_str()).map(String::from),
            name,
            status: ConnectionStatus::from(status),
            description: state
                .and_then(|s| s.get("description"))
                .and_then(|d| d.as_str())
                .map(String::from),
            private_endpoint_id: properties
                .and_then(|p| p.get("privateEndpoint"))
                .and_then(|e| e.get("id"))
                .and_then(|id| id.as_str())
                .map(String::from),
        })
    }
}

/// PUT body for approving a connection; only the status changes
fn approval_body(connection: &PrivateEndpointConnection) -> Value {
    let mut properties = json!({
        "privateLinkServiceConnectionState": {
            "status": ConnectionStatus::Approved.to_string(),
            "description": connection.description.clone().unwrap_or_default()
        }
    });
    if let Some(endpoint_id) = &connection.private_endpoint_id {
        properties["privateEndpoint"] = json!({ "id": endpoint_id });
    }
    json!({ "properties": properties })
}

#[async_trait]
impl StorageAccountClient for AzureStorageAccountClient {
    async fn resource_group_location(&self, resource_group: &str) -> Result<String> {
        let url = self.build_arm_url(
            &format!(
                "/subscriptions/{}/resourcegroups/{}",
                self.subscription_id, resource_group
            ),
            RESOURCES_API_VERSION,
        );

        let data = self
            .get_json(&url)
            .await?
            .ok_or_else(|| StorsyncError::resource_group_not_found(resource_group))?;

        data.get("location")
            .and_then(|l| l.as_str())
            .map(String::from)
            .ok_or_else(|| {
                StorsyncError::serialization(format!(
                    "Resource group '{}' response has no location",
                    resource_group
                ))
            })
    }

    async fn lookup_account(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<Option<AccountSnapshot>> {
        debug!("Get properties for account {}", name);
        let url = self.build_arm_url(
            &self.get_account_resource_id(resource_group, name),
            STORAGE_API_VERSION,
        );

        Ok(self
            .get_json(&url)
            .await?
            .map(|data| self.parse_account(&data, resource_group)))
    }

    async fn get_service_properties(
        &self,
        account_name: &str,
        service: ServiceKind,
    ) -> Result<ServiceProperties> {
        let url = self.build_service_properties_url(account_name, service);
        let headers = self.create_data_plane_headers().await?;

        let response = self
            .http_client
            .get(&url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| classify_network_error(&e, &url))?;
        let response = self.ensure_success(response).await?;

        let body = response.text().await?;

        decode_service_properties(&body)
    }

    async fn set_service_properties(
        &self,
        account_name: &str,
        service: ServiceKind,
        properties: &ServiceProperties,
    ) -> Result<()> {
        let url = self.build_service_properties_url(account_name, service);
        let mut headers = self.create_data_plane_headers().await?;
        headers.insert(
            "Content-Type",
            "application/xml"
                .parse()
                .map_err(|e| StorsyncError::network(format!("Invalid content type: {}", e)))?,
        );
        let body = encode_service_properties(properties)?;

        let response = self
            .http_client
            .put(&url)
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(|e| classify_network_error(&e, &url))?;
        self.ensure_success(response).await?;

        Ok(())
    }

    async fn list_private_endpoint_connections(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<Vec<PrivateEndpointConnection>> {
        let url = self.build_arm_url(
            &format!(
                "{}/privateEndpointConnections",
                self.get_account_resource_id(resource_group, name)
            ),
            STORAGE_API_VERSION,
        );

        let data = self.get_json(&url).await?.ok_or_else(|| {
            StorsyncError::azure_api(format!("HTTP 404: storage account '{}' not found", name))
        })?;

        Ok(data
            .get("value")
            .and_then(|v| v.as_array())
            .map(|connections| {
                connections
                    .iter()
                    .filter_map(|c| self.parse_private_endpoint_connection(c))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn approve_private_endpoint_connection(
        &self,
        resource_group: &str,
        name: &str,
        connection: &PrivateEndpointConnection,
    ) -> Result<()> {
        let url = self.build_arm_url(
            &format!(
                "{}/privateEndpointConnections/{}",
                self.get_account_resource_id(resource_group, name),
                connection.name
            ),
            STORAGE_API_VERSION,
        );
        let headers = self.create_headers(MANAGEMENT_SCOPE).await?;
        let body = approval_body(connection);

        let response = self
            .http_client
            .put(&url)
            .headers(headers)
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_network_error(&e, &url))?;
        self.ensure_success(response).await?;

        Ok(())
    }
}
