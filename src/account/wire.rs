//! Storage service properties XML codec
//!
//! The data-plane `?restype=service&comp=properties` endpoints exchange a
//! `StorageServiceProperties` document. Only the logging and metrics
//! elements are mapped; everything else in a response is ignored, and
//! omitting those elements from a write leaves them unchanged on the service.

use serde::{Deserialize, Serialize};

use super::models::{LoggingSettings, MetricsSettings, RetentionPolicy, ServiceProperties};
use crate::error::{Result, StorsyncError};

const ANALYTICS_VERSION: &str = "1.0";

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename = "StorageServiceProperties")]
struct XmlServiceProperties {
    #[serde(rename = "Logging", skip_serializing_if = "Option::is_none")]
    logging: Option<XmlLogging>,
    #[serde(rename = "HourMetrics", skip_serializing_if = "Option::is_none")]
    hour_metrics: Option<XmlMetrics>,
    #[serde(rename = "MinuteMetrics", skip_serializing_if = "Option::is_none")]
    minute_metrics: Option<XmlMetrics>,
}

#[derive(Debug, Serialize, Deserialize)]
struct XmlLogging {
    #[serde(rename = "Version", default)]
    version: Option<String>,
    #[serde(rename = "Delete")]
    delete: bool,
    #[serde(rename = "Read")]
    read: bool,
    #[serde(rename = "Write")]
    write: bool,
    #[serde(rename = "RetentionPolicy")]
    retention_policy: XmlRetentionPolicy,
}

#[derive(Debug, Serialize, Deserialize)]
struct XmlMetrics {
    #[serde(rename = "Version", default)]
    version: Option<String>,
    #[serde(rename = "Enabled")]
    enabled: bool,
    #[serde(rename = "IncludeAPIs", default, skip_serializing_if = "Option::is_none")]
    include_apis: Option<bool>,
    #[serde(rename = "RetentionPolicy")]
    retention_policy: XmlRetentionPolicy,
}

#[derive(Debug, Serialize, Deserialize)]
struct XmlRetentionPolicy {
    #[serde(rename = "Enabled")]
    enabled: bool,
    #[serde(rename = "Days", default, skip_serializing_if = "Option::is_none")]
    days: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct XmlStorageError {
    #[serde(rename = "Code", default)]
    code: Option<String>,
    #[serde(rename = "Message", default)]
    message: Option<String>,
}

impl From<XmlRetentionPolicy> for RetentionPolicy {
    fn from(xml: XmlRetentionPolicy) -> Self {
        Self {
            enabled: xml.enabled,
            days: xml.days,
        }
    }
}

impl From<&RetentionPolicy> for XmlRetentionPolicy {
    fn from(policy: &RetentionPolicy) -> Self {
        // The service rejects Days on a disabled policy
        Self {
            enabled: policy.enabled,
            days: policy.days.filter(|_| policy.enabled),
        }
    }
}

impl From<XmlLogging> for LoggingSettings {
    fn from(xml: XmlLogging) -> Self {
        Self {
            read: xml.read,
            write: xml.write,
            delete: xml.delete,
            retention_policy: xml.retention_policy.into(),
        }
    }
}

impl From<&LoggingSettings> for XmlLogging {
    fn from(logging: &LoggingSettings) -> Self {
        Self {
            version: Some(ANALYTICS_VERSION.to_string()),
            delete: logging.delete,
            read: logging.read,
            write: logging.write,
            retention_policy: (&logging.retention_policy).into(),
        }
    }
}

impl From<XmlMetrics> for MetricsSettings {
    fn from(xml: XmlMetrics) -> Self {
        Self {
            enabled: xml.enabled,
            include_apis: xml.include_apis,
            retention_policy: xml.retention_policy.into(),
        }
    }
}

impl From<&MetricsSettings> for XmlMetrics {
    fn from(metrics: &MetricsSettings) -> Self {
        Self {
            version: Some(ANALYTICS_VERSION.to_string()),
            enabled: metrics.enabled,
            include_apis: metrics.include_apis.filter(|_| metrics.enabled),
            retention_policy: (&metrics.retention_policy).into(),
        }
    }
}

fn strip_bom(body: &str) -> &str {
    body.trim_start_matches('\u{feff}')
}

/// Decode a `StorageServiceProperties` response body
pub fn decode_service_properties(body: &str) -> Result<ServiceProperties> {
    let xml: XmlServiceProperties = quick_xml::de::from_str(strip_bom(body)).map_err(|e| {
        StorsyncError::serialization(format!("Failed to parse service properties: {e}"))
    })?;

    Ok(ServiceProperties {
        logging: xml.logging.map(Into::into),
        hour_metrics: xml.hour_metrics.map(Into::into),
        minute_metrics: xml.minute_metrics.map(Into::into),
    })
}

/// Encode service properties as a request body for a write
pub fn encode_service_properties(properties: &ServiceProperties) -> Result<String> {
    let xml = XmlServiceProperties {
        logging: properties.logging.as_ref().map(Into::into),
        hour_metrics: properties.hour_metrics.as_ref().map(Into::into),
        minute_metrics: properties.minute_metrics.as_ref().map(Into::into),
    };

    let body = quick_xml::se::to_string(&xml).map_err(|e| {
        StorsyncError::serialization(format!("Failed to encode service properties: {e}"))
    })?;

    Ok(format!("<?xml version=\"1.0\" encoding=\"utf-8\"?>{body}"))
}

/// Extract `Code: Message` from a data-plane error body, if it is one
pub fn decode_storage_error(body: &str) -> Option<String> {
    let error: XmlStorageError = quick_xml::de::from_str(strip_bom(body)).ok()?;
    match (error.code, error.message) {
        (Some(code), Some(message)) => Some(format!("{code}: {}", message.trim())),
        (Some(code), None) => Some(code),
        (None, Some(message)) => Some(message.trim().to_string()),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::models::{MonitoringPolicy, ServiceKind};

    const BLOB_RESPONSE: &str = "\u{feff}<?xml version=\"1.0\" encoding=\"utf-8\"?>\
<StorageServiceProperties>\
<Logging><Version>1.0</Version><Read>false</Read><Write>true</Write><Delete>false</Delete>\
<RetentionPolicy><Enabled>false</Enabled></RetentionPolicy></Logging>\
<HourMetrics><Version>1.0</Version><Enabled>true</Enabled><IncludeAPIs>true</IncludeAPIs>\
<RetentionPolicy><Enabled>true</Enabled><Days>7</Days></RetentionPolicy></HourMetrics>\
<MinuteMetrics><Version>1.0</Version><Enabled>false</Enabled>\
<RetentionPolicy><Enabled>false</Enabled></RetentionPolicy></MinuteMetrics>\
<Cors /><DeleteRetentionPolicy><Enabled>false</Enabled></DeleteRetentionPolicy>\
</StorageServiceProperties>";

    #[test]
    fn test_decode_blob_service_properties() {
        let props = decode_service_properties(BLOB_RESPONSE).unwrap();

        let logging = props.logging.unwrap();
        assert!(!logging.read);
        assert!(logging.write);
        assert_eq!(logging.retention_policy.days, None);

        let hour = props.hour_metrics.unwrap();
        assert!(hour.enabled);
        assert_eq!(hour.include_apis, Some(true));
        assert_eq!(hour.retention_policy.days, Some(7));

        let minute = props.minute_metrics.unwrap();
        assert!(!minute.enabled);
        assert_eq!(minute.include_apis, None);
    }

    #[test]
    fn test_decode_file_service_without_logging() {
        let body = "<StorageServiceProperties>\
<HourMetrics><Version>1.0</Version><Enabled>false</Enabled>\
<RetentionPolicy><Enabled>false</Enabled></RetentionPolicy></HourMetrics>\
</StorageServiceProperties>";
        let props = decode_service_properties(body).unwrap();
        assert!(props.logging.is_none());
        assert!(props.hour_metrics.is_some());
        assert!(props.minute_metrics.is_none());
    }

    #[test]
    fn test_encode_disabled_policy_omits_days_and_include_apis() {
        let policy = MonitoringPolicy::from_retention_days(0).unwrap();
        let body = encode_service_properties(&policy.service_properties(ServiceKind::Blob)).unwrap();

        assert!(body.contains("<Logging>"));
        assert!(!body.contains("<Days>"));
        assert!(!body.contains("IncludeAPIs"));
        assert!(body.contains("<Enabled>false</Enabled>"));
    }

    #[test]
    fn test_encode_enabled_policy() {
        let policy = MonitoringPolicy::from_retention_days(15).unwrap();
        let body = encode_service_properties(&policy.service_properties(ServiceKind::File)).unwrap();

        assert!(body.starts_with("<?xml"));
        assert!(!body.contains("<Logging>"));
        assert!(body.contains("<HourMetrics>"));
        assert!(body.contains("<IncludeAPIs>true</IncludeAPIs>"));
        assert!(body.contains("<Days>15</Days>"));
    }

    #[test]
    fn test_decode_storage_error() {
        let body = "<?xml version=\"1.0\" encoding=\"utf-8\"?><Error>\
<Code>AuthorizationPermissionMismatch</Code>\
<Message>This request is not authorized to perform this operation using this permission.</Message>\
</Error>";
        let message = decode_storage_error(body).unwrap();
        assert!(message.starts_with("AuthorizationPermissionMismatch:"));
    }
}
