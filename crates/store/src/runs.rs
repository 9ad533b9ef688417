use chrono::NaiveDateTime;
use duckdb::params;
use frost_core::domain::Domain;
use frost_core::error::{FrostError, Result};
use frost_core::query::{RunRecord, RunStatus, RunTrigger, RunsRequest};
use uuid::Uuid;

use crate::Store;
use crate::source::naive_to_utc;

type RawRun = (
    String,
    String,
    String,
    NaiveDateTime,
    NaiveDateTime,
    NaiveDateTime,
    i64,
    i64,
    String,
    Option<String>,
);

impl Store {
    pub fn record_run(&self, run: &RunRecord) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO refresh_runs
             (run_id, domain, trigger_kind, started_at, finished_at, watermark,
              candidate_rows, inserted_rows, status, error)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                run.run_id.to_string(),
                run.domain.as_str(),
                run.trigger.as_str(),
                run.started_at.to_rfc3339(),
                run.finished_at.to_rfc3339(),
                run.watermark.to_rfc3339(),
                run.candidate_rows as i64,
                run.inserted_rows as i64,
                run.status.as_str(),
                run.error,
            ],
        )
        .map_err(|e| FrostError::Store(format!("insert run failed: {e}")))?;
        Ok(())
    }

    pub fn recent_runs(&self, req: &RunsRequest) -> Result<Vec<RunRecord>> {
        let conn = self.conn();
        let sql = if req.domain.is_some() {
            "SELECT run_id, domain, trigger_kind, started_at, finished_at, watermark,
                    candidate_rows, inserted_rows, status, error
             FROM refresh_runs
             WHERE domain = ?
             ORDER BY started_at DESC, run_id DESC
             LIMIT ?"
        } else {
            "SELECT run_id, domain, trigger_kind, started_at, finished_at, watermark,
                    candidate_rows, inserted_rows, status, error
             FROM refresh_runs
             ORDER BY started_at DESC, run_id DESC
             LIMIT ?"
        };

        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| FrostError::Store(format!("prepare runs failed: {e}")))?;

        let map_row = |row: &duckdb::Row<'_>| -> duckdb::Result<RawRun> {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
                row.get(7)?,
                row.get(8)?,
                row.get(9)?,
            ))
        };

        let raw = if let Some(domain) = req.domain {
            let rows = stmt
                .query_map(params![domain.as_str(), req.limit as i64], map_row)
                .map_err(|e| FrostError::Store(format!("query runs failed: {e}")))?;
            collect_raw(rows)?
        } else {
            let rows = stmt
                .query_map(params![req.limit as i64], map_row)
                .map_err(|e| FrostError::Store(format!("query runs failed: {e}")))?;
            collect_raw(rows)?
        };

        raw.into_iter().map(from_raw).collect()
    }

    pub(crate) fn last_run(&self, domain: Domain) -> Result<Option<RunRecord>> {
        let runs = self.recent_runs(&RunsRequest {
            domain: Some(domain),
            limit: 1,
        })?;
        Ok(runs.into_iter().next())
    }
}

fn collect_raw<'a>(
    rows: impl Iterator<Item = duckdb::Result<RawRun>> + 'a,
) -> Result<Vec<RawRun>> {
    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(|e| FrostError::Store(format!("map run row failed: {e}")))?);
    }
    Ok(out)
}

fn from_raw(raw: RawRun) -> Result<RunRecord> {
    let (run_id, domain, trigger, started, finished, watermark, candidates, inserted, status, error) =
        raw;
    Ok(RunRecord {
        run_id: Uuid::parse_str(&run_id)
            .map_err(|e| FrostError::Store(format!("bad run id {run_id}: {e}")))?,
        domain: domain.parse()?,
        trigger: RunTrigger::parse(&trigger)?,
        started_at: naive_to_utc(started),
        finished_at: naive_to_utc(finished),
        watermark: naive_to_utc(watermark),
        candidate_rows: candidates as usize,
        inserted_rows: inserted as usize,
        status: RunStatus::parse(&status)?,
        error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn run(domain: Domain, minute: u32, status: RunStatus) -> RunRecord {
        let started = Utc.with_ymd_and_hms(2026, 2, 1, 6, minute, 0).unwrap();
        RunRecord {
            run_id: Uuid::new_v4(),
            domain,
            trigger: RunTrigger::Scheduled,
            started_at: started,
            finished_at: started + chrono::Duration::seconds(5),
            watermark: DateTime::<Utc>::UNIX_EPOCH,
            candidate_rows: 10,
            inserted_rows: 7,
            status,
            error: match status {
                RunStatus::Ok => None,
                RunStatus::Failed => Some("source feed error".to_string()),
            },
        }
    }

    #[test]
    fn runs_round_trip_newest_first() {
        let store = Store::open_in_memory().unwrap();
        let first = run(Domain::Pipe, 0, RunStatus::Ok);
        let second = run(Domain::Warehouse, 5, RunStatus::Failed);
        store.record_run(&first).unwrap();
        store.record_run(&second).unwrap();

        let runs = store.recent_runs(&RunsRequest::default()).unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].run_id, second.run_id);
        assert_eq!(runs[0].status, RunStatus::Failed);
        assert_eq!(runs[0].error.as_deref(), Some("source feed error"));
        assert_eq!(runs[1].run_id, first.run_id);
        assert_eq!(runs[1].watermark, DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn runs_filter_by_domain_and_limit() {
        let store = Store::open_in_memory().unwrap();
        for minute in 0..3 {
            store.record_run(&run(Domain::Pipe, minute, RunStatus::Ok)).unwrap();
        }
        store
            .record_run(&run(Domain::Warehouse, 30, RunStatus::Ok))
            .unwrap();

        let pipe_runs = store
            .recent_runs(&RunsRequest {
                domain: Some(Domain::Pipe),
                limit: 2,
            })
            .unwrap();
        assert_eq!(pipe_runs.len(), 2);
        assert!(pipe_runs.iter().all(|r| r.domain == Domain::Pipe));

        let last = store.last_run(Domain::Warehouse).unwrap().unwrap();
        assert_eq!(last.domain, Domain::Warehouse);
    }
}
