use std::time::Duration;

use frost_core::config::Config;
use frost_core::domain::Domain;
use frost_core::query::{RunStatus, RunTrigger};
use frost_store::Store;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::refresh::refresh_domain;

/// Drive periodic refreshes for every configured domain until the task is
/// dropped or aborted. Each domain gets its own loop; the first tick fires
/// immediately, so startup doubles as the initial backfill.
pub async fn run_scheduler(store: Store, cfg: Config) {
    if cfg.domains.is_empty() {
        tracing::warn!("no domains configured, scheduler is idle");
        std::future::pending::<()>().await;
    }

    let handles: Vec<_> = cfg
        .domains
        .iter()
        .map(|&domain| spawn_domain_loop(store.clone(), domain, cfg.refresh_interval, cfg.lookback_days))
        .collect();
    futures::future::join_all(handles).await;
}

/// One refresh loop. Runs are awaited in place, so they never overlap;
/// ticks that come due while a run is still going are skipped.
fn spawn_domain_loop(
    store: Store,
    domain: Domain,
    every: Duration,
    lookback_days: u32,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let worker = store.clone();
            let outcome = tokio::task::spawn_blocking(move || {
                refresh_domain(&worker, domain, RunTrigger::Scheduled, lookback_days)
            })
            .await;
            match outcome {
                Ok(Ok(record)) => {
                    if record.status == RunStatus::Failed {
                        tracing::warn!(
                            domain = %domain,
                            error = record.error.as_deref().unwrap_or("unknown"),
                            "scheduled refresh failed"
                        );
                    }
                }
                Ok(Err(err)) => {
                    tracing::warn!(domain = %domain, error = %err, "refresh run could not be recorded");
                }
                Err(err) => {
                    tracing::warn!(domain = %domain, error = %err, "refresh task join failed");
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use frost_core::query::RunsRequest;

    #[tokio::test(flavor = "multi_thread")]
    async fn scheduler_runs_each_domain_on_startup() {
        let store = testkit::seeded_store().unwrap();
        let cfg = Config {
            refresh_interval: Duration::from_secs(3600),
            lookback_days: 3650,
            domains: vec![Domain::Pipe, Domain::ComputePool],
            ..Config::default()
        };

        let handle = tokio::spawn(run_scheduler(store.clone(), cfg));
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let runs = store.recent_runs(&RunsRequest::default()).unwrap();
            if runs.len() >= 2 {
                // Empty tables turn the startup tick into a backfill run.
                assert!(runs.iter().all(|r| r.trigger == RunTrigger::Backfill));
                assert!(runs.iter().all(|r| r.status == RunStatus::Ok));
                break;
            }
            if tokio::time::Instant::now() > deadline {
                panic!("scheduler never completed its startup runs");
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        handle.abort();

        let resp = store
            .usage_rows(&frost_core::query::UsageRequest::for_domain(Domain::Pipe))
            .unwrap();
        assert_eq!(resp.total_matches, 3);
    }
}
