use crate::error::{Result, StorsyncError};
use reqwest::Client;
use std::time::Duration;

/// Configuration for HTTP client with proper timeouts
pub struct NetworkConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(120),
            user_agent: format!("storsync/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Create a properly configured HTTP client with timeouts
pub fn create_http_client(config: &NetworkConfig) -> Result<Client> {
    Client::builder()
        .connect_timeout(config.connect_timeout)
        .timeout(config.request_timeout)
        .user_agent(&config.user_agent)
        .build()
        .map_err(|e| StorsyncError::network(format!("Failed to create HTTP client: {}", e)))
}

/// Turn a transport error into a typed error naming the host involved
pub fn classify_network_error(error: &reqwest::Error, url: &str) -> StorsyncError {
    let host = extract_host(url);

    if error.is_timeout() {
        return StorsyncError::connection_timeout(format!(
            "Request to '{}' timed out. The endpoint may be unreachable.",
            host
        ));
    }

    if error.is_connect() {
        if is_dns_resolution_error(error) {
            return StorsyncError::network(format!(
                "Unable to resolve '{}'. Check that the storage account name is correct.",
                host
            ));
        }

        return StorsyncError::network(format!(
            "Failed to connect to '{}'. Please check your network connection.",
            host
        ));
    }

    if let Some(status) = error.status() {
        match status.as_u16() {
            503 => {
                return StorsyncError::network(format!(
                    "'{}' is temporarily unavailable (HTTP 503).",
                    host
                ))
            }
            502 | 504 => {
                return StorsyncError::network(format!(
                    "Gateway error when calling '{}' (HTTP {}).",
                    host,
                    status.as_u16()
                ))
            }
            _ => {}
        }
    }

    StorsyncError::network(format!("Network error when calling '{}': {}", host, error))
}

fn is_dns_resolution_error(error: &reqwest::Error) -> bool {
    let error_msg = error.to_string().to_lowercase();
    let dns_indicators = [
        "dns",
        "name resolution",
        "failed to lookup address",
        "name or service not known",
        "nodename nor servname provided",
        "no such host",
        "could not resolve host",
    ];

    dns_indicators
        .iter()
        .any(|&indicator| error_msg.contains(indicator))
}

/// Extract the host portion of a request URL for error messages
pub fn extract_host(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(|h| h.to_string()))
        .unwrap_or_else(|| "unknown-host".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_host() {
        let url = "https://acct1.blob.core.windows.net/?restype=service&comp=properties";
        assert_eq!(extract_host(url), "acct1.blob.core.windows.net");
        assert_eq!(extract_host("not a url"), "unknown-host");
    }

    #[test]
    fn test_default_user_agent() {
        let config = NetworkConfig::default();
        assert!(config.user_agent.starts_with("storsync/"));
    }
}
