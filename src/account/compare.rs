//! Drift comparison for sub-service logging/metrics settings
//!
//! Comparisons are directional: the first argument is what the service
//! reported, the second is what we want. An unset value on the observed
//! side matches anything; an unset value on the desired side does not.

use super::models::{
    LoggingSettings, MetricsSettings, RetentionPolicy, ServiceKind, ServiceProperties,
};

pub fn retention_matches(observed: &RetentionPolicy, desired: &RetentionPolicy) -> bool {
    observed.enabled == desired.enabled
        && (observed.days == desired.days || observed.days.is_none())
}

pub fn logging_matches(observed: &LoggingSettings, desired: &LoggingSettings) -> bool {
    observed.read == desired.read
        && observed.write == desired.write
        && observed.delete == desired.delete
        && retention_matches(&observed.retention_policy, &desired.retention_policy)
}

pub fn metrics_matches(observed: &MetricsSettings, desired: &MetricsSettings) -> bool {
    observed.enabled == desired.enabled
        && (observed.include_apis == desired.include_apis || observed.include_apis.is_none())
        && retention_matches(&observed.retention_policy, &desired.retention_policy)
}

/// A block the service did not report only matches when nothing is desired.
fn block_matches<T>(observed: Option<&T>, desired: Option<&T>, matches: fn(&T, &T) -> bool) -> bool {
    match (observed, desired) {
        (Some(observed), Some(desired)) => matches(observed, desired),
        (_, None) => true,
        (None, Some(_)) => false,
    }
}

/// Whether a sub-service already satisfies the desired properties.
///
/// The file service is compared on hour and minute metrics only.
pub fn service_in_sync(
    service: ServiceKind,
    observed: &ServiceProperties,
    desired: &ServiceProperties,
) -> bool {
    let logging_ok = !service.supports_logging()
        || block_matches(
            observed.logging.as_ref(),
            desired.logging.as_ref(),
            logging_matches,
        );

    logging_ok
        && block_matches(
            observed.hour_metrics.as_ref(),
            desired.hour_metrics.as_ref(),
            metrics_matches,
        )
        && block_matches(
            observed.minute_metrics.as_ref(),
            desired.minute_metrics.as_ref(),
            metrics_matches,
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::models::MonitoringPolicy;

    fn retention(enabled: bool, days: Option<u32>) -> RetentionPolicy {
        RetentionPolicy { enabled, days }
    }

    #[test]
    fn test_retention_observed_unset_is_wildcard() {
        assert!(retention_matches(
            &retention(true, None),
            &retention(true, Some(15))
        ));
    }

    #[test]
    fn test_retention_desired_unset_is_not_wildcard() {
        assert!(!retention_matches(
            &retention(true, Some(15)),
            &retention(true, None)
        ));
    }

    #[test]
    fn test_retention_enabled_flag_always_compared() {
        assert!(!retention_matches(
            &retention(false, None),
            &retention(true, Some(15))
        ));
    }

    #[test]
    fn test_metrics_include_apis_wildcard() {
        let desired = MonitoringPolicy::from_retention_days(7).unwrap().metrics();
        let mut observed = desired.clone();
        observed.include_apis = None;
        assert!(metrics_matches(&observed, &desired));

        observed.include_apis = Some(false);
        assert!(!metrics_matches(&observed, &desired));
    }

    #[test]
    fn test_logging_flags_compared() {
        let desired = MonitoringPolicy::from_retention_days(7).unwrap().logging();
        let mut observed = desired.clone();
        observed.delete = false;
        assert!(!logging_matches(&observed, &desired));
    }

    #[test]
    fn test_file_service_ignores_logging() {
        let policy = MonitoringPolicy::from_retention_days(10).unwrap();
        let mut observed = policy.service_properties(ServiceKind::Blob);
        observed.logging = Some(LoggingSettings {
            read: false,
            write: true,
            delete: false,
            retention_policy: retention(false, Some(3)),
        });

        let desired_file = policy.service_properties(ServiceKind::File);
        assert!(service_in_sync(ServiceKind::File, &observed, &desired_file));

        let desired_blob = policy.service_properties(ServiceKind::Blob);
        assert!(!service_in_sync(ServiceKind::Blob, &observed, &desired_blob));
    }

    #[test]
    fn test_missing_observed_block_is_drift() {
        let policy = MonitoringPolicy::from_retention_days(10).unwrap();
        let mut observed = policy.service_properties(ServiceKind::Queue);
        observed.minute_metrics = None;
        let desired = policy.service_properties(ServiceKind::Queue);
        assert!(!service_in_sync(ServiceKind::Queue, &observed, &desired));
    }
}
