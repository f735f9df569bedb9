//! Run summary

use std::fmt;

/// Counters for one destination, or totals for a whole cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Successful create requests, including the create half of updates
    pub created: u32,
    /// Destination records removed because the source no longer has them
    pub deleted: u32,
    /// Destination records replaced because their fields drifted
    pub updated: u32,
    /// Records that could not be created (or addressed)
    pub errored: u32,
}

impl SyncReport {
    /// Newly added records, excluding re-creations done for updates
    pub fn added(&self) -> u32 {
        self.created.saturating_sub(self.updated)
    }

    pub fn merge(&mut self, other: &SyncReport) {
        self.created += other.created;
        self.deleted += other.deleted;
        self.updated += other.updated;
        self.errored += other.errored;
    }

    /// Whether the destination was already in sync
    pub fn is_noop(&self) -> bool {
        self.created == 0 && self.deleted == 0 && self.updated == 0 && self.errored == 0
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Sites added: {}", self.added())?;
        writeln!(f, "Sites deleted: {}", self.deleted)?;
        writeln!(f, "Sites updated: {}", self.updated)?;
        write!(f, "Sites with Errors: {}", self.errored)
    }
}

/// What happened to one destination during a cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestinationStatus {
    Reconciled(SyncReport),
    Skipped(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationOutcome {
    pub address: String,
    pub status: DestinationStatus,
}

/// Result of one full cycle across all destinations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub totals: SyncReport,
    pub destinations: Vec<DestinationOutcome>,
}

impl CycleReport {
    pub fn record(&mut self, address: impl Into<String>, report: SyncReport) {
        self.totals.merge(&report);
        self.destinations.push(DestinationOutcome {
            address: address.into(),
            status: DestinationStatus::Reconciled(report),
        });
    }

    pub fn skip(&mut self, address: impl Into<String>, reason: impl Into<String>) {
        self.destinations.push(DestinationOutcome {
            address: address.into(),
            status: DestinationStatus::Skipped(reason.into()),
        });
    }

    pub fn skipped(&self) -> usize {
        self.destinations
            .iter()
            .filter(|d| matches!(d.status, DestinationStatus::Skipped(_)))
            .count()
    }
}
