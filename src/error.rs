use thiserror::Error;

/// Main error type for storsync operations
#[derive(Debug, Error)]
pub enum StorsyncError {
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Azure API error: {0}")]
    AzureApiError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Resource group not found: {name}")]
    ResourceGroupNotFound { name: String },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Connection timeout: {0}")]
    ConnectionTimeout(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl StorsyncError {
    pub fn authentication<S: Into<String>>(msg: S) -> Self {
        Self::AuthenticationError(msg.into())
    }

    pub fn azure_api<S: Into<String>>(msg: S) -> Self {
        Self::AzureApiError(msg.into())
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn resource_group_not_found<S: Into<String>>(name: S) -> Self {
        Self::ResourceGroupNotFound { name: name.into() }
    }

    pub fn network<S: Into<String>>(msg: S) -> Self {
        Self::NetworkError(msg.into())
    }

    pub fn connection_timeout<S: Into<String>>(msg: S) -> Self {
        Self::ConnectionTimeout(msg.into())
    }

    pub fn serialization<S: Into<String>>(msg: S) -> Self {
        Self::SerializationError(msg.into())
    }

    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

/// Result type alias for storsync operations
pub type Result<T> = std::result::Result<T, StorsyncError>;

/// Convert Azure Core errors to StorsyncError
impl From<azure_core::Error> for StorsyncError {
    fn from(error: azure_core::Error) -> Self {
        Self::AzureApiError(error.to_string())
    }
}
