use chrono::{DateTime, NaiveDateTime, Utc};
use duckdb::params;
use frost_core::error::{FrostError, Result};
use frost_core::model::feed::{
    ComputePoolRow, CortexFunctionUsageRow, PipeUsageRow, QueryAttributionRow, QueryHistoryRow,
    ServerlessTaskRow, WarehouseLoadRow, WarehouseMeteringRow,
};
use frost_core::tags::{TagCatalog, TagPair};

use crate::Store;

/// Readers over the externally provisioned `account_usage` feeds. Every read
/// is bounded below by `after`, exclusive, so rows stamped exactly at the
/// watermark are never re-read. A missing feed relation surfaces as
/// `FrostError::Source`.
impl Store {
    pub fn read_pipe_usage(&self, after: DateTime<Utc>) -> Result<Vec<PipeUsageRow>> {
        self.read_feed(
            "account_usage.pipe_usage_history",
            "SELECT start_time, pipe_name,
                    COALESCE(credits_used, 0), COALESCE(bytes_inserted, 0),
                    COALESCE(files_inserted, 0)
             FROM account_usage.pipe_usage_history
             WHERE start_time > ?
             ORDER BY start_time ASC",
            after,
            |row| {
                Ok(PipeUsageRow {
                    ts: naive_to_utc(row.get::<_, NaiveDateTime>(0)?),
                    pipe_name: row.get(1)?,
                    credits_used: row.get(2)?,
                    bytes_inserted: row.get(3)?,
                    files_inserted: row.get(4)?,
                })
            },
        )
    }

    pub fn read_warehouse_metering(&self, after: DateTime<Utc>) -> Result<Vec<WarehouseMeteringRow>> {
        self.read_feed(
            "account_usage.warehouse_metering_history",
            "SELECT start_time, warehouse_id, warehouse_name,
                    COALESCE(credits_used, 0), COALESCE(credits_used_compute, 0),
                    COALESCE(credits_used_cloud_services, 0)
             FROM account_usage.warehouse_metering_history
             WHERE start_time > ?
             ORDER BY start_time ASC",
            after,
            |row| {
                Ok(WarehouseMeteringRow {
                    ts: naive_to_utc(row.get::<_, NaiveDateTime>(0)?),
                    warehouse_id: row.get(1)?,
                    warehouse_name: row.get(2)?,
                    credits_used: row.get(3)?,
                    credits_used_compute: row.get(4)?,
                    credits_used_cloud_services: row.get(5)?,
                })
            },
        )
    }

    pub fn read_warehouse_load(&self, after: DateTime<Utc>) -> Result<Vec<WarehouseLoadRow>> {
        self.read_feed(
            "account_usage.warehouse_load_history",
            "SELECT start_time, warehouse_id, warehouse_name, avg_running, avg_queued_load
             FROM account_usage.warehouse_load_history
             WHERE start_time > ?
             ORDER BY start_time ASC",
            after,
            |row| {
                Ok(WarehouseLoadRow {
                    ts: naive_to_utc(row.get::<_, NaiveDateTime>(0)?),
                    warehouse_id: row.get(1)?,
                    warehouse_name: row.get(2)?,
                    avg_running: row.get(3)?,
                    avg_queued_load: row.get(4)?,
                })
            },
        )
    }

    pub fn read_query_attribution(&self, after: DateTime<Utc>) -> Result<Vec<QueryAttributionRow>> {
        self.read_feed(
            "account_usage.query_attribution_history",
            "SELECT start_time, warehouse_id, warehouse_name,
                    COALESCE(credits_attributed_compute, 0)
             FROM account_usage.query_attribution_history
             WHERE start_time > ?
             ORDER BY start_time ASC",
            after,
            |row| {
                Ok(QueryAttributionRow {
                    ts: naive_to_utc(row.get::<_, NaiveDateTime>(0)?),
                    warehouse_id: row.get(1)?,
                    warehouse_name: row.get(2)?,
                    credits_attributed_compute: row.get(3)?,
                })
            },
        )
    }

    pub fn read_query_history(&self, after: DateTime<Utc>) -> Result<Vec<QueryHistoryRow>> {
        self.read_feed(
            "account_usage.query_history",
            "SELECT start_time, query_id, COALESCE(warehouse_id, 0),
                    COALESCE(warehouse_name, ''), COALESCE(query_type, ''),
                    COALESCE(execution_status, ''), COALESCE(total_elapsed_time, 0),
                    COALESCE(rows_produced, 0), COALESCE(rows_updated, 0),
                    COALESCE(credits_used_cloud_services, 0)
             FROM account_usage.query_history
             WHERE start_time > ?
             ORDER BY start_time ASC",
            after,
            |row| {
                Ok(QueryHistoryRow {
                    ts: naive_to_utc(row.get::<_, NaiveDateTime>(0)?),
                    query_id: row.get(1)?,
                    warehouse_id: row.get(2)?,
                    warehouse_name: row.get(3)?,
                    query_type: row.get(4)?,
                    execution_status: row.get(5)?,
                    total_elapsed_ms: row.get(6)?,
                    rows_produced: row.get(7)?,
                    rows_updated: row.get(8)?,
                    credits_used_cloud_services: row.get(9)?,
                })
            },
        )
    }

    pub fn read_cortex_usage(&self, after: DateTime<Utc>) -> Result<Vec<CortexFunctionUsageRow>> {
        self.read_feed(
            "account_usage.cortex_functions_query_usage_history",
            "SELECT start_time, query_id, function_name, COALESCE(model_name, ''),
                    COALESCE(tokens, 0), COALESCE(token_credits, 0)
             FROM account_usage.cortex_functions_query_usage_history
             WHERE start_time > ?
             ORDER BY start_time ASC",
            after,
            |row| {
                Ok(CortexFunctionUsageRow {
                    ts: naive_to_utc(row.get::<_, NaiveDateTime>(0)?),
                    query_id: row.get(1)?,
                    function_name: row.get(2)?,
                    model_name: row.get(3)?,
                    tokens: row.get(4)?,
                    token_credits: row.get(5)?,
                })
            },
        )
    }

    pub fn read_serverless_tasks(&self, after: DateTime<Utc>) -> Result<Vec<ServerlessTaskRow>> {
        self.read_feed(
            "account_usage.serverless_task_history",
            "SELECT start_time, task_name, COALESCE(credits_used, 0)
             FROM account_usage.serverless_task_history
             WHERE start_time > ?
             ORDER BY start_time ASC",
            after,
            |row| {
                Ok(ServerlessTaskRow {
                    ts: naive_to_utc(row.get::<_, NaiveDateTime>(0)?),
                    task_name: row.get(1)?,
                    credits_used: row.get(2)?,
                })
            },
        )
    }

    pub fn read_compute_pools(&self, after: DateTime<Utc>) -> Result<Vec<ComputePoolRow>> {
        self.read_feed(
            "account_usage.snowpark_container_services_history",
            "SELECT start_time, compute_pool_name, COALESCE(credits_used, 0)
             FROM account_usage.snowpark_container_services_history
             WHERE start_time > ?
             ORDER BY start_time ASC",
            after,
            |row| {
                Ok(ComputePoolRow {
                    ts: naive_to_utc(row.get::<_, NaiveDateTime>(0)?),
                    compute_pool_name: row.get(1)?,
                    credits_used: row.get(2)?,
                })
            },
        )
    }

    /// Point-in-time snapshot of tag assignments for one object domain.
    pub fn read_tag_catalog(&self, object_domain: &str) -> Result<TagCatalog> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT object_name, tag_name, COALESCE(tag_value, '')
                 FROM account_usage.tag_references
                 WHERE object_domain = ?",
            )
            .map_err(|e| {
                FrostError::Source(format!("read account_usage.tag_references failed: {e}"))
            })?;

        let rows = stmt
            .query_map(params![object_domain], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    TagPair {
                        tag_name: row.get(1)?,
                        tag_value: row.get(2)?,
                    },
                ))
            })
            .map_err(|e| {
                FrostError::Source(format!("read account_usage.tag_references failed: {e}"))
            })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(|e| {
                FrostError::Source(format!("map account_usage.tag_references row failed: {e}"))
            })?);
        }
        Ok(TagCatalog::from_rows(out))
    }

    fn read_feed<T, F>(&self, feed: &str, sql: &str, after: DateTime<Utc>, map: F) -> Result<Vec<T>>
    where
        F: Fn(&duckdb::Row<'_>) -> duckdb::Result<T>,
    {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| FrostError::Source(format!("read {feed} failed: {e}")))?;

        let rows = stmt
            .query_map(params![after.to_rfc3339()], map)
            .map_err(|e| FrostError::Source(format!("read {feed} failed: {e}")))?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(|e| FrostError::Source(format!("map {feed} row failed: {e}")))?);
        }
        Ok(out)
    }
}

pub(crate) fn naive_to_utc(naive: NaiveDateTime) -> DateTime<Utc> {
    naive.and_utc()
}
