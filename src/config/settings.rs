//! Configuration settings management
//!
//! This module handles loading configuration from multiple sources,
//! validation, and persistence.

use crate::error::{Result, StorsyncError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Which Azure credential to acquire tokens with
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialType {
    #[default]
    Default,
    #[serde(alias = "client_secret")]
    ClientSecret,
}

impl FromStr for CredentialType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "default" | "defaultazurecredential" => Ok(CredentialType::Default),
            "clientsecret" | "client_secret" => Ok(CredentialType::ClientSecret),
            other => Err(format!("Unsupported credential type: {other}")),
        }
    }
}

impl fmt::Display for CredentialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialType::Default => f.write_str("default"),
            CredentialType::ClientSecret => f.write_str("clientsecret"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub debug: bool,
    pub subscription_id: String,
    pub tenant_id: String,
    pub default_resource_group: String,
    pub credential_type: CredentialType,
    pub client_id: Option<String>,
    #[serde(skip_serializing)]
    pub client_secret: Option<String>,
    pub management_endpoint: String,
    pub storage_endpoint_suffix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug: false,
            subscription_id: String::new(),
            tenant_id: String::new(),
            default_resource_group: String::new(),
            credential_type: CredentialType::Default,
            client_id: None,
            client_secret: None,
            management_endpoint: "https://management.azure.com".to_string(),
            storage_endpoint_suffix: "core.windows.net".to_string(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.subscription_id.is_empty() {
            return Err(StorsyncError::config(
                "Subscription ID is required (set AZURE_SUBSCRIPTION_ID or subscription_id)",
            ));
        }

        if self.credential_type == CredentialType::ClientSecret {
            if self.tenant_id.is_empty() {
                return Err(StorsyncError::config(
                    "Tenant ID is required for client secret authentication",
                ));
            }
            if self.client_id.is_none() || self.client_secret.is_none() {
                return Err(StorsyncError::config(
                    "client_id and client_secret are required for client secret authentication",
                ));
            }
        }

        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        // XDG layout on Linux and macOS, platform config dir elsewhere
        #[cfg(any(target_os = "linux", target_os = "macos"))]
        {
            use std::env;
            let config_dir = if let Ok(xdg_config_home) = env::var("XDG_CONFIG_HOME") {
                PathBuf::from(xdg_config_home)
            } else {
                let home_dir = env::var("HOME")
                    .map_err(|_| StorsyncError::config("HOME environment variable not set"))?;
                PathBuf::from(home_dir).join(".config")
            };
            Ok(config_dir.join("storsync").join("storsync.toml"))
        }

        #[cfg(not(any(target_os = "linux", target_os = "macos")))]
        {
            let config_dir = dirs::config_dir()
                .ok_or_else(|| StorsyncError::config("Unable to determine config directory"))?;
            Ok(config_dir.join("storsync").join("storsync.toml"))
        }
    }

    /// Resolve resource group: CLI argument, then config default
    pub fn resolve_resource_group(&self, rg_arg: Option<String>) -> Result<String> {
        if let Some(rg) = rg_arg {
            return Ok(rg);
        }

        if !self.default_resource_group.is_empty() {
            return Ok(self.default_resource_group.clone());
        }

        Err(StorsyncError::config(
            "No resource group specified. Use --resource-group or configure default_resource_group",
        ))
    }

    /// Set a single configuration key from its string form
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "debug" => {
                self.debug = value
                    .parse::<bool>()
                    .map_err(|_| StorsyncError::invalid_argument("debug must be true or false"))?;
            }
            "subscription_id" => self.subscription_id = value.to_string(),
            "tenant_id" => self.tenant_id = value.to_string(),
            "default_resource_group" => self.default_resource_group = value.to_string(),
            "credential_type" => {
                self.credential_type = value.parse().map_err(StorsyncError::invalid_argument)?;
            }
            "client_id" => self.client_id = Some(value.to_string()),
            "management_endpoint" => {
                url::Url::parse(value).map_err(|e| {
                    StorsyncError::invalid_argument(format!("Invalid management_endpoint: {e}"))
                })?;
                self.management_endpoint = value.trim_end_matches('/').to_string();
            }
            "storage_endpoint_suffix" => {
                self.storage_endpoint_suffix = value.trim_matches('.').to_string()
            }
            "client_secret" => {
                return Err(StorsyncError::invalid_argument(
                    "client_secret is not stored in the config file; set AZURE_CLIENT_SECRET",
                ))
            }
            other => {
                return Err(StorsyncError::invalid_argument(format!(
                    "Unknown configuration key: {other}"
                )))
            }
        }
        Ok(())
    }

    /// Key/value pairs for display
    pub fn display_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("debug", self.debug.to_string()),
            ("subscription_id", self.subscription_id.clone()),
            ("tenant_id", self.tenant_id.clone()),
            ("default_resource_group", self.default_resource_group.clone()),
            ("credential_type", self.credential_type.to_string()),
            (
                "client_id",
                self.client_id.clone().unwrap_or_else(|| "-".to_string()),
            ),
            (
                "client_secret",
                if self.client_secret.is_some() {
                    "********".to_string()
                } else {
                    "-".to_string()
                },
            ),
            ("management_endpoint", self.management_endpoint.clone()),
            ("storage_endpoint_suffix", self.storage_endpoint_suffix.clone()),
        ]
    }
}

/// Load configuration from multiple sources with priority order:
/// 1. Command-line flags (applied by the caller)
/// 2. Environment variables
/// 3. Configuration file
/// 4. Default values
///
/// Validation is left to the commands that talk to Azure, once flag
/// overrides are in place.
pub async fn load_config() -> Result<Config> {
    let mut config = Config::default();

    let config_path = Config::get_config_path()?;
    if config_path.exists() {
        config = load_from_file(&config_path).await?;
    }

    load_from_env(&mut config);

    Ok(config)
}

/// Read a config file; `.json` files are JSON, anything else is TOML
pub async fn load_from_file(path: &Path) -> Result<Config> {
    let contents = tokio::fs::read_to_string(path).await?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        Ok(serde_json::from_str(&contents)?)
    } else {
        Ok(toml::from_str(&contents)?)
    }
}

fn load_from_env(config: &mut Config) {
    if let Ok(value) = std::env::var("DEBUG") {
        config.debug = value.to_lowercase() == "true" || value == "1";
    }

    if let Ok(value) = std::env::var("AZURE_SUBSCRIPTION_ID") {
        config.subscription_id = value;
    }

    if let Ok(value) = std::env::var("AZURE_TENANT_ID") {
        config.tenant_id = value;
    }

    if let Ok(value) = std::env::var("AZURE_CLIENT_ID") {
        config.client_id = Some(value);
    }

    if let Ok(value) = std::env::var("AZURE_CLIENT_SECRET") {
        config.client_secret = Some(value);
    }

    if let Ok(value) = std::env::var("DEFAULT_RESOURCE_GROUP") {
        config.default_resource_group = value;
    }

    if let Ok(value) = std::env::var("STORSYNC_MANAGEMENT_ENDPOINT") {
        config.management_endpoint = value.trim_end_matches('/').to_string();
    }

    if let Ok(value) = std::env::var("STORSYNC_ENDPOINT_SUFFIX") {
        config.storage_endpoint_suffix = value.trim_matches('.').to_string();
    }
}

pub async fn save_config(config: &Config) -> Result<()> {
    save_config_to(config, &Config::get_config_path()?).await
}

pub async fn save_config_to(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let contents = toml::to_string_pretty(config)
        .map_err(|e| StorsyncError::serialization(e.to_string()))?;

    tokio::fs::write(path, contents).await?;

    Ok(())
}

pub async fn init_default_config() -> Result<PathBuf> {
    let config_path = Config::get_config_path()?;

    // Don't overwrite existing configuration
    if config_path.exists() {
        return Ok(config_path);
    }

    save_config_to(&Config::default(), &config_path).await?;

    Ok(config_path)
}
