//! Authentication provider trait and implementations
//!
//! This module defines the authentication provider trait and provides
//! implementations backed by the Azure SDK credential types.

use async_trait::async_trait;
use azure_core::auth::{AccessToken, TokenCredential};
use azure_identity::{ClientSecretCredential, DefaultAzureCredential, TokenCredentialOptions};
use std::sync::Arc;

use crate::config::{Config, CredentialType};
use crate::error::{Result, StorsyncError};

/// Token scope for Azure Resource Manager
pub const MANAGEMENT_SCOPE: &str = "https://management.azure.com/.default";

/// Token scope for the storage data plane
pub const STORAGE_SCOPE: &str = "https://storage.azure.com/.default";

/// Trait for Azure authentication providers
#[async_trait]
pub trait AzureAuthProvider: Send + Sync {
    /// Get an access token for the specified scopes
    async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken>;
}

/// Default Azure Credential Provider using DefaultAzureCredential
pub struct DefaultAzureCredentialProvider {
    credential: Arc<DefaultAzureCredential>,
}

impl DefaultAzureCredentialProvider {
    /// Create a new DefaultAzureCredentialProvider
    pub fn new() -> Result<Self> {
        let credential = Arc::new(
            DefaultAzureCredential::create(TokenCredentialOptions::default()).map_err(|e| {
                StorsyncError::authentication(format!(
                    "Failed to create DefaultAzureCredential: {e}"
                ))
            })?,
        );

        Ok(Self { credential })
    }
}

#[async_trait]
impl AzureAuthProvider for DefaultAzureCredentialProvider {
    async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken> {
        self.credential
            .get_token(scopes)
            .await
            .map_err(|e| StorsyncError::authentication(format!("Failed to get token: {e}")))
    }
}

/// Client Secret Authentication Provider
pub struct ClientSecretProvider {
    credential: Arc<ClientSecretCredential>,
}

impl ClientSecretProvider {
    /// Create a new ClientSecretProvider
    pub fn new(tenant_id: String, client_id: String, client_secret: String) -> Result<Self> {
        let authority_url = url::Url::parse("https://login.microsoftonline.com/")
            .map_err(|e| StorsyncError::config(format!("Invalid authority URL: {e}")))?;

        let credential = Arc::new(ClientSecretCredential::new(
            azure_core::new_http_client(),
            authority_url,
            tenant_id,
            client_id,
            client_secret,
        ));

        Ok(Self { credential })
    }
}

#[async_trait]
impl AzureAuthProvider for ClientSecretProvider {
    async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken> {
        self.credential
            .get_token(scopes)
            .await
            .map_err(|e| StorsyncError::authentication(format!("Failed to get token: {e}")))
    }
}

/// Authentication provider factory
pub struct AuthProviderFactory;

impl AuthProviderFactory {
    /// Create an authentication provider based on configuration
    pub fn create_provider(config: &Config) -> Result<Arc<dyn AzureAuthProvider>> {
        match config.credential_type {
            CredentialType::Default => Ok(Arc::new(DefaultAzureCredentialProvider::new()?)),
            CredentialType::ClientSecret => {
                let client_id = config.client_id.clone().ok_or_else(|| {
                    StorsyncError::config("client_id is required for client secret authentication")
                })?;
                let client_secret = config.client_secret.clone().ok_or_else(|| {
                    StorsyncError::config(
                        "client_secret is required for client secret authentication",
                    )
                })?;
                if config.tenant_id.is_empty() {
                    return Err(StorsyncError::config(
                        "tenant_id is required for client secret authentication",
                    ));
                }

                Ok(Arc::new(ClientSecretProvider::new(
                    config.tenant_id.clone(),
                    client_id,
                    client_secret,
                )?))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_secret_requires_client_id() {
        let config = Config {
            credential_type: CredentialType::ClientSecret,
            tenant_id: "tenant".to_string(),
            ..Config::default()
        };

        let err = AuthProviderFactory::create_provider(&config)
            .err()
            .expect("missing client id must fail");
        assert!(matches!(err, StorsyncError::ConfigError(_)));
    }
}
