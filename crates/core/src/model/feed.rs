use chrono::{DateTime, Utc};

/// Raw rows as read from the account usage feeds. Field names follow the
/// feed columns they are read from.
#[derive(Debug, Clone, PartialEq)]
pub struct PipeUsageRow {
    pub ts: DateTime<Utc>,
    pub pipe_name: String,
    pub credits_used: f64,
    pub bytes_inserted: i64,
    pub files_inserted: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WarehouseMeteringRow {
    pub ts: DateTime<Utc>,
    pub warehouse_id: i64,
    pub warehouse_name: String,
    pub credits_used: f64,
    pub credits_used_compute: f64,
    pub credits_used_cloud_services: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WarehouseLoadRow {
    pub ts: DateTime<Utc>,
    pub warehouse_id: i64,
    pub warehouse_name: String,
    pub avg_running: f64,
    pub avg_queued_load: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryAttributionRow {
    pub ts: DateTime<Utc>,
    pub warehouse_id: i64,
    pub warehouse_name: String,
    pub credits_attributed_compute: f64,
}

/// One query_history row, keyed by query id for the cortex join and carrying
/// the warehouse key for per-warehouse query counts.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryHistoryRow {
    pub ts: DateTime<Utc>,
    pub query_id: String,
    pub warehouse_id: i64,
    pub warehouse_name: String,
    pub query_type: String,
    pub execution_status: String,
    pub total_elapsed_ms: i64,
    pub rows_produced: i64,
    pub rows_updated: i64,
    pub credits_used_cloud_services: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CortexFunctionUsageRow {
    pub ts: DateTime<Utc>,
    pub query_id: String,
    pub function_name: String,
    pub model_name: String,
    pub tokens: i64,
    pub token_credits: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerlessTaskRow {
    pub ts: DateTime<Utc>,
    pub task_name: String,
    pub credits_used: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComputePoolRow {
    pub ts: DateTime<Utc>,
    pub compute_pool_name: String,
    pub credits_used: f64,
}
