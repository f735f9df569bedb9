//! Reconciler: converge one destination's proxy hosts towards the source
//!
//! Two passes over the snapshots fetched at the start of the cycle:
//!
//! 1. Deletion pass: destination records whose `domain_names` appear nowhere
//!    in the source are deleted.
//! 2. Add/update pass: each source record is paired with the first
//!    destination record sharing its `domain_names`. Missing records are
//!    created; drifted records are deleted and re-created.
//!
//! The destination snapshot is not refreshed between the passes.

use tracing::{debug, error, info, warn};

use crate::client::{ProxyHostApi, Session};
use crate::record::{FieldTable, ProxyHost};
use crate::report::SyncReport;

/// What the add/update pass decided for one source record
#[derive(Debug, Clone, PartialEq)]
pub enum Action<'a> {
    /// Destination already matches
    Keep,
    /// No destination record has these domains
    Create,
    /// Destination record differs on `field`
    Replace { existing: &'a ProxyHost, field: String },
}

pub struct Reconciler<'a, A: ProxyHostApi + ?Sized> {
    api: &'a A,
    fields: &'a FieldTable,
}

impl<'a, A: ProxyHostApi + ?Sized> Reconciler<'a, A> {
    pub fn new(api: &'a A, fields: &'a FieldTable) -> Self {
        Self { api, fields }
    }

    /// Decide what to do with `source_host` given the destination snapshot
    pub fn plan<'d>(&self, source_host: &ProxyHost, destination: &'d [ProxyHost]) -> Action<'d> {
        let Some(existing) = destination.iter().find(|d| d.same_domains(source_host)) else {
            info!("{} is missing from destination", source_host.label());
            return Action::Create;
        };

        info!(
            "{} on destination, checking to see if details are same",
            source_host.label()
        );
        match self.fields.first_difference(source_host, existing) {
            Some(field) => Action::Replace {
                existing,
                field: field.to_string(),
            },
            None => Action::Keep,
        }
    }

    /// Run both passes against one destination
    pub async fn reconcile(
        &self,
        session: &Session,
        source: &[ProxyHost],
        destination: &[ProxyHost],
    ) -> SyncReport {
        let mut report = SyncReport::default();

        self.delete_orphans(session, source, destination, &mut report)
            .await;

        for host in source {
            if host.domain_key().is_none() {
                error!(
                    "Skipping source record {} on {}: no domain_names",
                    host.fields().get("id").cloned().unwrap_or_default(),
                    session.address
                );
                report.errored += 1;
                continue;
            }

            match self.plan(host, destination) {
                Action::Keep => {
                    debug!("{} already up to date", host.label());
                }
                Action::Create => {
                    self.create(session, host, &mut report).await;
                }
                Action::Replace { existing, field } => {
                    info!("{} mismatch", field);
                    info!("Details dont match, updating {}", host.label());
                    if !self.delete(session, existing, &mut report).await {
                        continue;
                    }
                    info!(
                        "{} deleted from destination server for updating",
                        existing.label()
                    );
                    report.updated += 1;
                    self.create(session, host, &mut report).await;
                }
            }
        }

        report
    }

    async fn delete_orphans(
        &self,
        session: &Session,
        source: &[ProxyHost],
        destination: &[ProxyHost],
        report: &mut SyncReport,
    ) {
        for dest_host in destination {
            if dest_host.domain_key().is_none() {
                error!(
                    "Leaving destination record {} on {} alone: no domain_names",
                    dest_host.fields().get("id").cloned().unwrap_or_default(),
                    session.address
                );
                report.errored += 1;
                continue;
            }

            if source.iter().any(|s| s.same_domains(dest_host)) {
                info!(
                    "{} on source, no need to delete from destination",
                    dest_host.label()
                );
                continue;
            }

            if self.delete(session, dest_host, report).await {
                info!(
                    "{} deleted from destination server as no longer on source",
                    dest_host.label()
                );
                report.deleted += 1;
            }
        }
    }

    /// Issue a delete; returns false only when the record has no usable id.
    ///
    /// Rejected deletes are logged but still treated as done.
    async fn delete(&self, session: &Session, host: &ProxyHost, report: &mut SyncReport) -> bool {
        let Some(id) = host.id() else {
            error!(
                "Cannot delete {} on {}: record has no id",
                host.label(),
                session.address
            );
            report.errored += 1;
            return false;
        };

        if let Err(e) = self.api.delete_host(session, &id).await {
            warn!("Delete of {} (id {}) failed: {}", host.label(), id, e);
        }
        true
    }

    async fn create(&self, session: &Session, host: &ProxyHost, report: &mut SyncReport) {
        info!("Attempting to add {}", host.label());
        info!("{}", serde_json::Value::Object(host.fields().clone()));
        info!("adding or updating {}", host.label());
        let payload = self.fields.create_payload(host);

        match self.api.create_host(session, &payload).await {
            Ok(()) => {
                info!("Successfully added {}", host.label());
                report.created += 1;
            }
            Err(e) => {
                error!(
                    "Error: failed to add proxy host {} [ {} ] to {}: {}",
                    host.label(),
                    host.forward_target(),
                    session.address,
                    e
                );
                report.errored += 1;
            }
        }
    }
}
