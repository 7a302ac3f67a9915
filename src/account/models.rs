//! Storage account data models and types
//!
//! This module defines the data structures used for account reconciliation
//! including the observed snapshot, sub-service monitoring settings, the
//! desired monitoring policy, and private endpoint connections.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::error::{Result, StorsyncError};

/// Longest retention the storage service accepts for logs and metrics
pub const MAX_RETENTION_DAYS: u32 = 365;

/// Sub-services of a storage account that carry logging/metrics settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    Blob,
    Queue,
    File,
    Table,
}

impl ServiceKind {
    /// Every sub-service, in reconciliation order
    pub const ALL: [ServiceKind; 4] = [
        ServiceKind::Blob,
        ServiceKind::Queue,
        ServiceKind::File,
        ServiceKind::Table,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKind::Blob => "blob",
            ServiceKind::Queue => "queue",
            ServiceKind::File => "file",
            ServiceKind::Table => "table",
        }
    }

    /// The file service has no read/write/delete logging toggle.
    pub fn supports_logging(&self) -> bool {
        !matches!(self, ServiceKind::File)
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Retention policy attached to a logging or metrics block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    pub enabled: bool,
    pub days: Option<u32>,
}

/// Analytics logging settings (blob, queue and table only)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub read: bool,
    pub write: bool,
    pub delete: bool,
    pub retention_policy: RetentionPolicy,
}

/// Hour or minute metrics settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSettings {
    pub enabled: bool,
    pub include_apis: Option<bool>,
    pub retention_policy: RetentionPolicy,
}

/// Logging and metrics configuration of one sub-service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceProperties {
    pub logging: Option<LoggingSettings>,
    pub hour_metrics: Option<MetricsSettings>,
    pub minute_metrics: Option<MetricsSettings>,
}

/// Desired logging/metrics state derived from `enable_monitoring`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoringPolicy {
    pub enabled: bool,
    pub retention_days: u32,
}

impl MonitoringPolicy {
    /// Build a policy from the `enable_monitoring` input: 0 disables,
    /// 1..=365 enables with that many retention days.
    pub fn from_retention_days(days: u32) -> Result<Self> {
        if days > MAX_RETENTION_DAYS {
            return Err(StorsyncError::invalid_argument(format!(
                "enable_monitoring must be 0 (disable) or between 1 and {MAX_RETENTION_DAYS} days, got {days}"
            )));
        }

        Ok(Self {
            enabled: days > 0,
            retention_days: days,
        })
    }

    pub fn retention_policy(&self) -> RetentionPolicy {
        RetentionPolicy {
            enabled: self.enabled,
            days: Some(self.retention_days),
        }
    }

    pub fn logging(&self) -> LoggingSettings {
        LoggingSettings {
            read: self.enabled,
            write: self.enabled,
            delete: self.enabled,
            retention_policy: self.retention_policy(),
        }
    }

    pub fn metrics(&self) -> MetricsSettings {
        MetricsSettings {
            enabled: self.enabled,
            include_apis: Some(self.enabled),
            retention_policy: self.retention_policy(),
        }
    }

    /// Desired service properties for the given sub-service
    pub fn service_properties(&self, service: ServiceKind) -> ServiceProperties {
        ServiceProperties {
            logging: service.supports_logging().then(|| self.logging()),
            hour_metrics: Some(self.metrics()),
            minute_metrics: Some(self.metrics()),
        }
    }
}

/// Monitoring state reported for one sub-service in the result snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoringStatus {
    pub enabled: Option<bool>,
    pub retention_days: Option<u32>,
}

impl MonitoringStatus {
    /// Status after the policy has been written
    pub fn applied(policy: &MonitoringPolicy) -> Self {
        if policy.enabled {
            Self {
                enabled: Some(true),
                retention_days: Some(policy.retention_days),
            }
        } else {
            Self {
                enabled: Some(false),
                retention_days: None,
            }
        }
    }

    /// Status as observed, read from the hour metrics block
    pub fn observed(properties: &ServiceProperties) -> Self {
        match &properties.hour_metrics {
            Some(metrics) => Self {
                enabled: Some(metrics.enabled),
                retention_days: metrics
                    .retention_policy
                    .days
                    .filter(|_| metrics.retention_policy.enabled),
            },
            None => Self::default(),
        }
    }
}

/// Status of a private endpoint connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConnectionStatus {
    Pending,
    Approved,
    Rejected,
    Disconnected,
    Other(String),
}

impl From<String> for ConnectionStatus {
    fn from(value: String) -> Self {
        // The service reports these exactly; anything else is kept verbatim.
        match value.as_str() {
            "Pending" => ConnectionStatus::Pending,
            "Approved" => ConnectionStatus::Approved,
            "Rejected" => ConnectionStatus::Rejected,
            "Disconnected" => ConnectionStatus::Disconnected,
            _ => ConnectionStatus::Other(value),
        }
    }
}

impl From<ConnectionStatus> for String {
    fn from(status: ConnectionStatus) -> Self {
        status.to_string()
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Pending => f.write_str("Pending"),
            ConnectionStatus::Approved => f.write_str("Approved"),
            ConnectionStatus::Rejected => f.write_str("Rejected"),
            ConnectionStatus::Disconnected => f.write_str("Disconnected"),
            ConnectionStatus::Other(raw) => f.write_str(raw),
        }
    }
}

/// A private endpoint connection on a storage account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateEndpointConnection {
    pub id: Option<String>,
    pub name: String,
    pub status: ConnectionStatus,
    pub description: Option<String>,
    pub private_endpoint_id: Option<String>,
}

impl PrivateEndpointConnection {
    pub fn is_pending(&self) -> bool {
        self.status == ConnectionStatus::Pending
    }
}

/// Identity of the account under reconciliation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountDescriptor {
    pub resource_group: String,
    pub name: String,
    pub location: String,
}

/// Observed state of a storage account, reported back to the caller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_of_primary: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub primary_endpoints: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tags: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub monitoring: BTreeMap<ServiceKind, MonitoringStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_endpoint_connection: Option<Vec<String>>,
}

impl AccountSnapshot {
    /// An account that exists has a resource id
    pub fn exists(&self) -> bool {
        self.id.is_some()
    }
}

/// Input of one reconciliation run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconcileRequest {
    #[serde(default, alias = "resource_group_name")]
    pub resource_group: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub enable_monitoring: Option<u32>,
    #[serde(default)]
    pub approve_private_endpoint_connections: bool,
    #[serde(default)]
    pub check_mode: bool,
}

impl ReconcileRequest {
    pub fn new<S: Into<String>>(resource_group: S, name: S) -> Self {
        Self {
            resource_group: resource_group.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Check required fields and ranges before anything is sent remotely
    pub fn validate(&self) -> Result<()> {
        if self.resource_group.trim().is_empty() {
            return Err(StorsyncError::invalid_argument("resource_group is required"));
        }
        if self.name.trim().is_empty() {
            return Err(StorsyncError::invalid_argument("name is required"));
        }
        self.monitoring_policy()?;
        Ok(())
    }

    /// Desired monitoring policy, if monitoring was requested
    pub fn monitoring_policy(&self) -> Result<Option<MonitoringPolicy>> {
        self.enable_monitoring
            .map(MonitoringPolicy::from_retention_days)
            .transpose()
    }
}

/// Result of a reconciliation run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileOutcome {
    pub changed: bool,
    pub state: AccountSnapshot,
}
