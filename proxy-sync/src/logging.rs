//! Console and log-file output
//!
//! The log file is opened once at startup and written for the lifetime of
//! the process. Tests pass their own writer to [`subscriber`].

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;
use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "proxy_sync=info";

/// Open `path` for appending, creating parent directories as needed
pub fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Console layer plus an optional plain-text file layer
pub fn subscriber<W>(filter: EnvFilter, file: Option<W>) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file.map(|writer| {
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
        }))
}

/// Install the global subscriber.
///
/// A log file that cannot be opened is reported and skipped; console
/// output always works.
pub fn init(log_file: Option<&Path>) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let (file, failure) = match log_file.map(|p| (p, open_log_file(p))) {
        Some((_, Ok(file))) => (Some(Mutex::new(file)), None),
        Some((path, Err(e))) => (None, Some(format!("{}: {}", path.display(), e))),
        None => (None, None),
    };

    subscriber(filter, file).init();

    if let Some(failure) = failure {
        tracing::warn!("Could not open log file {}, logging to console only", failure);
    }
}
