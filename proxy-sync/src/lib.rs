//! proxy-sync: mirror proxy host configuration between servers
//!
//! Periodically copies the proxy hosts of one authoritative source server
//! to any number of destination servers through their REST management API.
//! Each cycle logs in to every server, fetches the host lists, deletes
//! destination hosts the source no longer has, and creates or replaces the
//! ones that are missing or out of date.
//!
//! # Example Configuration
//!
//! ```yaml
//! source:
//!   address: http://npm-primary:81
//!   username: admin@example.com
//!   password: changeme
//! destinations:
//!   - address: http://npm-replica:81
//!     username: admin@example.com
//!     password: changeme
//! interval: 300
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod reconcile;
pub mod record;
pub mod report;
pub mod scheduler;
pub mod sync;

pub use client::{HttpApi, ProxyHostApi, Session};
pub use config::{ServerCredential, SyncConfig};
pub use error::{Result, SyncError};
pub use record::{FieldRole, FieldTable, ProxyHost};
pub use report::{CycleReport, SyncReport};
pub use sync::SyncRunner;
