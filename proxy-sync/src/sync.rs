//! One reconciliation cycle across all destinations

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info};

use crate::client::ProxyHostApi;
use crate::config::{ServerCredential, SyncConfig};
use crate::error::{Result, SyncError};
use crate::reconcile::Reconciler;
use crate::record::{FieldTable, ProxyHost};
use crate::report::CycleReport;

/// Drives source → destination reconciliation, one destination at a time
pub struct SyncRunner {
    api: Arc<dyn ProxyHostApi>,
    source: ServerCredential,
    destinations: Vec<ServerCredential>,
    fields: FieldTable,
}

impl SyncRunner {
    pub fn new(
        api: Arc<dyn ProxyHostApi>,
        source: ServerCredential,
        destinations: Vec<ServerCredential>,
        fields: FieldTable,
    ) -> Self {
        Self {
            api,
            source,
            destinations,
            fields,
        }
    }

    pub fn from_config(api: Arc<dyn ProxyHostApi>, config: &SyncConfig) -> Self {
        Self::new(
            api,
            config.source.clone(),
            config.destinations.clone(),
            FieldTable::with_ignored(config.ignore_fields.iter().cloned()),
        )
    }

    /// Run a single cycle.
    ///
    /// Source login and source fetch failures abort the cycle; destination
    /// failures only skip that destination.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let source_session = self.api.login(&self.source).await.map_err(|e| {
            error!(
                "Error: failed to log in to {} using provided details - Please check config.yaml",
                self.source.address
            );
            SyncError::SourceAuth {
                address: self.source.address.clone(),
                source: Box::new(e),
            }
        })?;
        info!("Login Successful to source server {}", self.source.address);

        let source_hosts = self
            .api
            .list_hosts(&source_session)
            .await
            .map_err(|e| {
                error!("Error: failed to get proxy hosts from {}", self.source.address);
                SyncError::SourceFetch {
                    address: self.source.address.clone(),
                    source: Box::new(e),
                }
            })?;
        info!(
            "Retrieved {} proxy hosts for copy",
            unique_domain_sets(&source_hosts)
        );

        let reconciler = Reconciler::new(self.api.as_ref(), &self.fields);
        let mut cycle = CycleReport::default();

        for destination in &self.destinations {
            let session = match self.api.login(destination).await {
                Ok(session) => session,
                Err(e) => {
                    error!(
                        "Error: failed to log in to {} using provided details - Please check config.yaml: {}",
                        destination.address, e
                    );
                    cycle.skip(&destination.address, e.to_string());
                    continue;
                }
            };
            info!("Login Successful to destination server: {}", destination.address);

            let destination_hosts = match self.api.list_hosts(&session).await {
                Ok(hosts) => hosts,
                Err(e) => {
                    error!(
                        "Error: failed to get proxy hosts from {}: {}",
                        destination.address, e
                    );
                    cycle.skip(&destination.address, e.to_string());
                    continue;
                }
            };

            let report = reconciler
                .reconcile(&session, &source_hosts, &destination_hosts)
                .await;
            info!(
                "{}: added {}, deleted {}, updated {}, errored {}",
                destination.address,
                report.added(),
                report.deleted,
                report.updated,
                report.errored
            );
            cycle.record(&destination.address, report);
        }

        Ok(cycle)
    }
}

/// Number of distinct `domain_names` sets in a host list
pub fn unique_domain_sets(hosts: &[ProxyHost]) -> usize {
    hosts
        .iter()
        .map(|h| {
            h.domain_names()
                .iter()
                .map(|d| d.to_string())
                .collect::<Vec<_>>()
        })
        .collect::<HashSet<_>>()
        .len()
}
