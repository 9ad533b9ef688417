use chrono::{DateTime, TimeZone, Utc};
use frost_core::error::Result;
use frost_store::Store;

pub const FEED_DDL: &str = r#"
CREATE SCHEMA IF NOT EXISTS account_usage;

CREATE TABLE IF NOT EXISTS account_usage.pipe_usage_history (
  start_time TIMESTAMP NOT NULL,
  pipe_name TEXT NOT NULL,
  credits_used DOUBLE,
  bytes_inserted BIGINT,
  files_inserted BIGINT
);

CREATE TABLE IF NOT EXISTS account_usage.warehouse_metering_history (
  start_time TIMESTAMP NOT NULL,
  warehouse_id BIGINT NOT NULL,
  warehouse_name TEXT NOT NULL,
  credits_used DOUBLE,
  credits_used_compute DOUBLE,
  credits_used_cloud_services DOUBLE
);

CREATE TABLE IF NOT EXISTS account_usage.warehouse_load_history (
  start_time TIMESTAMP NOT NULL,
  warehouse_id BIGINT NOT NULL,
  warehouse_name TEXT NOT NULL,
  avg_running DOUBLE,
  avg_queued_load DOUBLE
);

CREATE TABLE IF NOT EXISTS account_usage.query_attribution_history (
  start_time TIMESTAMP NOT NULL,
  warehouse_id BIGINT NOT NULL,
  warehouse_name TEXT NOT NULL,
  credits_attributed_compute DOUBLE
);

CREATE TABLE IF NOT EXISTS account_usage.query_history (
  start_time TIMESTAMP NOT NULL,
  query_id TEXT NOT NULL,
  warehouse_id BIGINT,
  warehouse_name TEXT,
  query_type TEXT,
  execution_status TEXT,
  total_elapsed_time BIGINT,
  rows_produced BIGINT,
  rows_updated BIGINT,
  credits_used_cloud_services DOUBLE
);

CREATE TABLE IF NOT EXISTS account_usage.cortex_functions_query_usage_history (
  start_time TIMESTAMP NOT NULL,
  query_id TEXT NOT NULL,
  function_name TEXT NOT NULL,
  model_name TEXT,
  tokens BIGINT,
  token_credits DOUBLE
);

CREATE TABLE IF NOT EXISTS account_usage.serverless_task_history (
  start_time TIMESTAMP NOT NULL,
  task_name TEXT NOT NULL,
  credits_used DOUBLE
);

CREATE TABLE IF NOT EXISTS account_usage.snowpark_container_services_history (
  start_time TIMESTAMP NOT NULL,
  compute_pool_name TEXT NOT NULL,
  credits_used DOUBLE
);

CREATE TABLE IF NOT EXISTS account_usage.tag_references (
  object_name TEXT NOT NULL,
  object_domain TEXT NOT NULL,
  tag_name TEXT NOT NULL,
  tag_value TEXT
);
"#;

/// 2026-02-01T00:00:00Z, the hour every fixture below is anchored to.
pub fn base_hour() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap()
}

/// Create the account_usage feed relations on the store's connection.
pub fn provision_feeds(store: &Store) -> Result<()> {
    store.execute_batch(FEED_DDL)
}

/// A small two-hour account: two pipes, two warehouses, one cortex function
/// with one uncorrelated query, one task, two compute pools, and tags on
/// ALPHA_PIPE and ETL_WH.
pub fn seed_small_account(store: &Store) -> Result<()> {
    store.execute_batch(
        r#"
INSERT INTO account_usage.pipe_usage_history VALUES
  ('2026-02-01 00:10:00', 'ALPHA_PIPE', 0.5, 1000, 1),
  ('2026-02-01 00:40:00', 'ALPHA_PIPE', 0.5, 2000, 1),
  ('2026-02-01 00:20:00', 'BRAVO_PIPE', 1.0, 8000, 4),
  ('2026-02-01 01:15:00', 'ALPHA_PIPE', 0.25, 500, 2);

INSERT INTO account_usage.warehouse_metering_history VALUES
  ('2026-02-01 00:00:00', 101, 'ETL_WH', 4.0, 3.5, 0.5),
  ('2026-02-01 01:00:00', 101, 'ETL_WH', 3.0, 2.6, 0.4),
  ('2026-02-01 00:00:00', 102, 'ADHOC_WH', 2.0, 1.8, 0.2);

INSERT INTO account_usage.warehouse_load_history VALUES
  ('2026-02-01 00:00:00', 101, 'ETL_WH', 2.5, 0.5);

INSERT INTO account_usage.query_attribution_history VALUES
  ('2026-02-01 00:05:00', 101, 'ETL_WH', 1.25),
  ('2026-02-01 00:35:00', 101, 'ETL_WH', 0.75);

INSERT INTO account_usage.query_history VALUES
  ('2026-02-01 00:02:00', 'Q1', 101, 'ETL_WH', 'SELECT', 'SUCCESS', 1000, 100, 0, 0.001),
  ('2026-02-01 00:12:00', 'Q2', 101, 'ETL_WH', 'SELECT', 'SUCCESS', 3000, 400, 0, 0.002),
  ('2026-02-01 00:22:00', 'Q3', 101, 'ETL_WH', 'INSERT', 'FAIL', 500, 0, 0, 0.001),
  ('2026-02-01 00:05:00', 'CX1', 101, 'ETL_WH', 'SELECT', 'SUCCESS', 1200, 10, 0, 0.010),
  ('2026-02-01 00:25:00', 'CX2', 101, 'ETL_WH', 'SELECT', 'SUCCESS', 800, 5, 0, 0.005);

INSERT INTO account_usage.cortex_functions_query_usage_history VALUES
  ('2026-02-01 00:05:00', 'CX1', 'summarize', 'llama3-8b', 1000, 0.020),
  ('2026-02-01 00:25:00', 'CX2', 'summarize', 'llama3-8b', 500, 0.010),
  ('2026-02-01 00:45:00', 'CX3', 'summarize', 'llama3-8b', 750, 0.015);

INSERT INTO account_usage.serverless_task_history VALUES
  ('2026-02-01 00:30:00', 'NIGHTLY_REBUILD', 0.05),
  ('2026-02-01 01:30:00', 'NIGHTLY_REBUILD', 0.07);

INSERT INTO account_usage.snowpark_container_services_history VALUES
  ('2026-02-01 00:15:00', 'GPU_POOL', 1.5),
  ('2026-02-01 00:45:00', 'OCR_POOL', 0.75);

INSERT INTO account_usage.tag_references VALUES
  ('ALPHA_PIPE', 'PIPE', 'team', 'ingest'),
  ('ETL_WH', 'WAREHOUSE', 'team', 'data'),
  ('ETL_WH', 'WAREHOUSE', 'env', 'prod'),
  ('PARKED_WH', 'WAREHOUSE', 'team', 'data');
"#,
    )
}

/// Rows that arrive after the 01:00 bucket is already stored: one more event
/// inside that hour and one in a brand-new hour.
pub fn seed_pipe_late_arrivals(store: &Store) -> Result<()> {
    store.execute_batch(
        "INSERT INTO account_usage.pipe_usage_history VALUES
           ('2026-02-01 01:30:00', 'ALPHA_PIPE', 9.0, 90000, 9),
           ('2026-02-01 02:30:00', 'ALPHA_PIPE', 0.125, 250, 1);",
    )
}

/// In-memory store with feed relations provisioned but nothing seeded.
pub fn empty_account_store() -> Result<Store> {
    let store = Store::open_in_memory()?;
    provision_feeds(&store)?;
    Ok(store)
}

/// In-memory store carrying the small account fixture.
pub fn seeded_store() -> Result<Store> {
    let store = empty_account_store()?;
    seed_small_account(&store)?;
    Ok(store)
}
