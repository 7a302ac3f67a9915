//! Storage account reconciler
//!
//! Compares the observed account against the desired state and writes
//! only where drift is found. Writes that succeed before a later failure
//! stay applied; there is no rollback.

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::compare::service_in_sync;
use super::models::{
    AccountDescriptor, AccountSnapshot, MonitoringPolicy, MonitoringStatus, ReconcileOutcome,
    ReconcileRequest, ServiceKind,
};
use super::operations::StorageAccountClient;
use crate::error::Result;

/// Drives one reconciliation run against a storage account client
pub struct StorageAccountReconciler {
    client: Arc<dyn StorageAccountClient>,
}

impl StorageAccountReconciler {
    pub fn new(client: Arc<dyn StorageAccountClient>) -> Self {
        Self { client }
    }

    /// Reconcile the account named by `request`
    pub async fn reconcile(&self, request: &ReconcileRequest) -> Result<ReconcileOutcome> {
        request.validate()?;
        let policy = request.monitoring_policy()?;
        let descriptor = self.resolve_descriptor(request).await?;

        info!(
            "Reconciling storage account '{}' in resource group '{}'",
            descriptor.name, descriptor.resource_group
        );

        let mut outcome = ReconcileOutcome::default();

        let Some(snapshot) = self
            .client
            .lookup_account(&descriptor.resource_group, &descriptor.name)
            .await?
        else {
            warn!(
                "Storage account '{}' does not exist in resource group '{}'",
                descriptor.name, descriptor.resource_group
            );
            return Ok(outcome);
        };
        outcome.state = snapshot;

        if let Some(policy) = policy {
            self.reconcile_monitoring(&descriptor, &policy, request.check_mode, &mut outcome)
                .await?;
        }

        if request.approve_private_endpoint_connections {
            self.approve_pending_connections(&descriptor, request.check_mode, &mut outcome)
                .await?;
        }

        debug!("Reconciliation finished, changed = {}", outcome.changed);
        Ok(outcome)
    }

    /// Look up the account without changing anything
    pub async fn show(&self, resource_group: &str, name: &str) -> Result<AccountSnapshot> {
        Ok(self
            .client
            .lookup_account(resource_group, name)
            .await?
            .unwrap_or_default())
    }

    /// The resource group must exist even when a location is given.
    async fn resolve_descriptor(&self, request: &ReconcileRequest) -> Result<AccountDescriptor> {
        let group_location = self
            .client
            .resource_group_location(&request.resource_group)
            .await?;
        let location = request.location.clone().unwrap_or(group_location);

        Ok(AccountDescriptor {
            resource_group: request.resource_group.clone(),
            name: request.name.clone(),
            location,
        })
    }

    async fn reconcile_monitoring(
        &self,
        descriptor: &AccountDescriptor,
        policy: &MonitoringPolicy,
        check_mode: bool,
        outcome: &mut ReconcileOutcome,
    ) -> Result<()> {
        for service in ServiceKind::ALL {
            let observed = self
                .client
                .get_service_properties(&descriptor.name, service)
                .await?;
            let desired = policy.service_properties(service);

            let status = if service_in_sync(service, &observed, &desired) {
                debug!("{} monitoring already matches", service);
                MonitoringStatus::observed(&observed)
            } else {
                outcome.changed = true;
                if check_mode {
                    info!("{} monitoring differs (check mode, not applied)", service);
                } else {
                    self.client
                        .set_service_properties(&descriptor.name, service, &desired)
                        .await?;
                    info!(
                        "Updated {} monitoring on '{}': enabled={}, retention_days={}",
                        service, descriptor.name, policy.enabled, policy.retention_days
                    );
                }
                MonitoringStatus::applied(policy)
            };

            outcome.state.monitoring.insert(service, status);
        }

        Ok(())
    }

    async fn approve_pending_connections(
        &self,
        descriptor: &AccountDescriptor,
        check_mode: bool,
        outcome: &mut ReconcileOutcome,
    ) -> Result<()> {
        let connections = self
            .client
            .list_private_endpoint_connections(&descriptor.resource_group, &descriptor.name)
            .await?;

        for connection in connections.iter().filter(|c| c.is_pending()) {
            outcome.changed = true;
            if check_mode {
                info!(
                    "Private endpoint connection '{}' is pending (check mode, not approved)",
                    connection.name
                );
            } else {
                self.client
                    .approve_private_endpoint_connection(
                        &descriptor.resource_group,
                        &descriptor.name,
                        connection,
                    )
                    .await?;
                info!("Approved private endpoint connection '{}'", connection.name);
            }
            outcome
                .state
                .private_endpoint_connection
                .get_or_insert_with(Vec::new)
                .push(connection.name.clone());
        }

        Ok(())
    }
}
