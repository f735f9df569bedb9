//! Fixed-delay loop around [`SyncRunner::run_cycle`]

use std::future::Future;
use std::time::Duration;
use tracing::{error, info};

use crate::error::Result;
use crate::report::{CycleReport, DestinationStatus};
use crate::sync::SyncRunner;

/// Run one cycle and log its summary.
///
/// Returns `Ok(None)` when the cycle was aborted by a non-fatal error, and
/// `Err` only for errors that must stop the process.
pub async fn run_once(runner: &SyncRunner) -> Result<Option<CycleReport>> {
    match runner.run_cycle().await {
        Ok(report) => {
            log_summary(&report);
            Ok(Some(report))
        }
        Err(e) if e.is_fatal() => {
            error!("{}", e);
            Err(e)
        }
        Err(e) => {
            error!("Cycle aborted: {}", e);
            Ok(None)
        }
    }
}

/// Run cycles until `shutdown` resolves or a fatal error occurs
pub async fn run_forever<F>(runner: &SyncRunner, interval: Duration, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        run_once(runner).await?;

        info!("Sleeping for {}", interval.as_secs());
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = &mut shutdown => {
                info!("Shutdown requested, stopping");
                return Ok(());
            }
        }
    }
}

fn log_summary(report: &CycleReport) {
    for destination in &report.destinations {
        if let DestinationStatus::Skipped(reason) = &destination.status {
            info!("Skipped {}: {}", destination.address, reason);
        }
    }
    for line in report.totals.to_string().lines() {
        info!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ProxyHostApi, Session};
    use crate::config::ServerCredential;
    use crate::error::SyncError;
    use crate::record::{FieldTable, HostId, ProxyHost};
    use serde_json::{Map, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::sync::Notify;

    /// Counts source logins; fails them or the source fetch on demand
    struct CountingApi {
        logins: AtomicUsize,
        reject_source_login: bool,
        reject_source_fetch: bool,
        stop_after: usize,
        stop: Arc<Notify>,
        seen: Mutex<Vec<String>>,
    }

    impl CountingApi {
        fn new(stop_after: usize) -> Self {
            Self {
                logins: AtomicUsize::new(0),
                reject_source_login: false,
                reject_source_fetch: false,
                stop_after,
                stop: Arc::new(Notify::new()),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl ProxyHostApi for CountingApi {
        async fn login(&self, server: &ServerCredential) -> crate::error::Result<Session> {
            self.seen.lock().unwrap().push(server.address.clone());
            if server.address == "http://source" {
                let n = self.logins.fetch_add(1, Ordering::SeqCst) + 1;
                if n >= self.stop_after {
                    self.stop.notify_one();
                }
                if self.reject_source_login {
                    return Err(SyncError::Authentication {
                        address: server.address.clone(),
                        reason: "HTTP 401".into(),
                    });
                }
            }
            Ok(Session::new(server.address.clone(), "t"))
        }

        async fn list_hosts(&self, session: &Session) -> crate::error::Result<Vec<ProxyHost>> {
            if self.reject_source_fetch && session.address == "http://source" {
                return Err(SyncError::UnexpectedStatus {
                    operation: "list proxy hosts",
                    url: session.address.clone(),
                    status: 500,
                });
            }
            Ok(Vec::new())
        }

        async fn delete_host(&self, _: &Session, _: &HostId) -> crate::error::Result<()> {
            Ok(())
        }

        async fn create_host(&self, _: &Session, _: &Map<String, Value>) -> crate::error::Result<()> {
            Ok(())
        }
    }

    fn runner(api: Arc<CountingApi>) -> SyncRunner {
        SyncRunner::new(
            api,
            ServerCredential::new("http://source", "u", "p"),
            vec![ServerCredential::new("http://dest", "u", "p")],
            FieldTable::default(),
        )
    }

    #[tokio::test]
    async fn test_loop_repeats_until_shutdown() {
        let api = Arc::new(CountingApi::new(3));
        let stop = api.stop.clone();
        let runner = runner(api.clone());

        run_forever(&runner, Duration::from_millis(5), async move {
            stop.notified().await
        })
        .await
        .expect("clean shutdown");

        assert!(api.logins.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test]
    async fn test_source_login_failure_is_fatal() {
        let mut api = CountingApi::new(usize::MAX);
        api.reject_source_login = true;
        let api = Arc::new(api);
        let runner = runner(api.clone());

        let err = run_forever(&runner, Duration::from_millis(5), std::future::pending())
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::SourceAuth { .. }));
        assert_eq!(api.logins.load(Ordering::SeqCst), 1);
        // destinations are never contacted
        assert_eq!(*api.seen.lock().unwrap(), vec!["http://source".to_string()]);
    }

    #[tokio::test]
    async fn test_source_fetch_failure_skips_cycle_only() {
        let mut api = CountingApi::new(2);
        api.reject_source_fetch = true;
        let api = Arc::new(api);
        let stop = api.stop.clone();
        let runner = runner(api.clone());

        assert!(run_once(&runner).await.expect("not fatal").is_none());

        run_forever(&runner, Duration::from_millis(5), async move {
            stop.notified().await
        })
        .await
        .expect("loop keeps going");
        assert!(api.logins.load(Ordering::SeqCst) >= 2);
    }
}
