use chrono::{DateTime, Duration, Utc};
use frost_core::domain::Domain;
use frost_core::error::Result;
use frost_core::model::fact::FactRow;
use frost_core::query::{RunRecord, RunStatus, RunTrigger};
use frost_core::tags::TagCatalog;
use frost_core::time::truncate_to_hour;
use frost_store::Store;
use uuid::Uuid;

use crate::aggregate::aggregate;
use crate::domains;

/// Run one refresh for a domain and record it in the run log.
///
/// The scan lower bound is the stored watermark, exclusive; when the fact
/// table is empty the run turns into a backfill bounded to `lookback_days`
/// before now. Source rows timestamped at or before the watermark are never
/// re-read, and candidate buckets that already exist are skipped by the
/// merge, so data landing late in the feeds does not reach stored buckets.
///
/// A failing source feed aborts the run before anything is merged; the run
/// is still recorded, with the error, and reported in the returned record
/// rather than as an `Err`.
pub fn refresh_domain(
    store: &Store,
    domain: Domain,
    trigger: RunTrigger,
    lookback_days: u32,
) -> Result<RunRecord> {
    let spec = domain.spec();
    let started_at = Utc::now();

    let (lower, trigger) = match store.watermark(spec)? {
        Some(w) => (w, trigger),
        None => (backfill_floor(started_at, lookback_days), RunTrigger::Backfill),
    };

    let result =
        collect_facts(store, domain, lower).and_then(|rows| store.merge_facts(spec, &rows));
    let finished_at = Utc::now();

    let record = match result {
        Ok(outcome) => RunRecord {
            run_id: Uuid::new_v4(),
            domain,
            trigger,
            started_at,
            finished_at,
            watermark: lower,
            candidate_rows: outcome.candidates,
            inserted_rows: outcome.inserted,
            status: RunStatus::Ok,
            error: None,
        },
        Err(err) => RunRecord {
            run_id: Uuid::new_v4(),
            domain,
            trigger,
            started_at,
            finished_at,
            watermark: lower,
            candidate_rows: 0,
            inserted_rows: 0,
            status: RunStatus::Failed,
            error: Some(err.to_string()),
        },
    };

    store.record_run(&record)?;

    match record.status {
        RunStatus::Ok => tracing::info!(
            domain = %domain,
            trigger = trigger.as_str(),
            candidates = record.candidate_rows,
            inserted = record.inserted_rows,
            "refresh run finished"
        ),
        RunStatus::Failed => tracing::warn!(
            domain = %domain,
            trigger = trigger.as_str(),
            error = record.error.as_deref().unwrap_or("unknown"),
            "refresh run failed"
        ),
    }

    Ok(record)
}

/// Refresh each domain in turn, continuing past failed runs.
pub fn refresh_all(
    store: &Store,
    domains: &[Domain],
    trigger: RunTrigger,
    lookback_days: u32,
) -> Result<Vec<RunRecord>> {
    let mut records = Vec::with_capacity(domains.len());
    for &domain in domains {
        records.push(refresh_domain(store, domain, trigger, lookback_days)?);
    }
    Ok(records)
}

fn collect_facts(store: &Store, domain: Domain, lower: DateTime<Utc>) -> Result<Vec<FactRow>> {
    let spec = domain.spec();

    let catalog = match &spec.tag_join {
        Some(join) => store.read_tag_catalog(join.object_domain)?,
        None => TagCatalog::default(),
    };

    let events = match domain {
        Domain::Pipe => domains::pipe::events(&store.read_pipe_usage(lower)?),
        Domain::Warehouse => domains::warehouse::events(
            &store.read_warehouse_metering(lower)?,
            &store.read_warehouse_load(lower)?,
            &store.read_query_attribution(lower)?,
            &store.read_query_history(lower)?,
        ),
        Domain::ServerlessTask => {
            domains::serverless_task::events(&store.read_serverless_tasks(lower)?)
        }
        Domain::CortexFunction => domains::cortex_function::events(
            &store.read_cortex_usage(lower)?,
            &store.read_query_history(lower)?,
        ),
        Domain::ComputePool => domains::compute_pool::events(&store.read_compute_pools(lower)?),
    };

    Ok(aggregate(spec, &events, &catalog))
}

fn backfill_floor(now: DateTime<Utc>, lookback_days: u32) -> DateTime<Utc> {
    truncate_to_hour(now - Duration::days(i64::from(lookback_days)))
}
