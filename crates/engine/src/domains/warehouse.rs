use frost_core::domain::WAREHOUSE;
use frost_core::model::fact::{RawEvent, Scalar};
use frost_core::model::feed::{
    QueryAttributionRow, QueryHistoryRow, WarehouseLoadRow, WarehouseMeteringRow,
};

pub const M_TOTAL: usize = 0;
pub const M_COMPUTE: usize = 1;
pub const M_CLOUD: usize = 2;
pub const M_ATTRIBUTED: usize = 3;
pub const M_IDLE: usize = 4;
pub const M_AVG_RUNNING: usize = 5;
pub const M_AVG_QUEUED: usize = 6;
pub const M_QUERIES: usize = 7;

fn key(warehouse_id: i64, warehouse_name: &str) -> Vec<String> {
    vec![warehouse_id.to_string(), warehouse_name.to_string()]
}

fn sparse() -> Vec<Option<Scalar>> {
    vec![None; WAREHOUSE.measures.len()]
}

/// Fold the four warehouse feeds into one event stream. Each feed fills only
/// its own measure slots; hours where a feed has no rows aggregate to zero
/// for that feed's measures.
pub fn events(
    metering: &[WarehouseMeteringRow],
    load: &[WarehouseLoadRow],
    attribution: &[QueryAttributionRow],
    queries: &[QueryHistoryRow],
) -> Vec<RawEvent> {
    let mut out = Vec::with_capacity(metering.len() + load.len() + attribution.len() + queries.len());

    for r in metering {
        let mut values = sparse();
        values[M_TOTAL] = Some(Scalar::Float(r.credits_used));
        values[M_COMPUTE] = Some(Scalar::Float(r.credits_used_compute));
        values[M_CLOUD] = Some(Scalar::Float(r.credits_used_cloud_services));
        out.push(RawEvent {
            ts: r.ts,
            key: key(r.warehouse_id, &r.warehouse_name),
            values,
        });
    }

    for r in load {
        let mut values = sparse();
        values[M_AVG_RUNNING] = Some(Scalar::Float(r.avg_running));
        values[M_AVG_QUEUED] = Some(Scalar::Float(r.avg_queued_load));
        out.push(RawEvent {
            ts: r.ts,
            key: key(r.warehouse_id, &r.warehouse_name),
            values,
        });
    }

    for r in attribution {
        let mut values = sparse();
        values[M_ATTRIBUTED] = Some(Scalar::Float(r.credits_attributed_compute));
        out.push(RawEvent {
            ts: r.ts,
            key: key(r.warehouse_id, &r.warehouse_name),
            values,
        });
    }

    for r in queries {
        // Queries that ran without a warehouse have no bucket to count in.
        if r.warehouse_name.is_empty() {
            continue;
        }
        let mut values = sparse();
        values[M_QUERIES] = Some(Scalar::Int(1));
        out.push(RawEvent {
            ts: r.ts,
            key: key(r.warehouse_id, &r.warehouse_name),
            values,
        });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use frost_core::domain::Reduction;

    #[test]
    fn measure_indexes_match_descriptor() {
        assert_eq!(WAREHOUSE.measures[M_TOTAL].name, "total_credits_used");
        assert_eq!(WAREHOUSE.measures[M_COMPUTE].name, "compute_credits_used");
        assert_eq!(WAREHOUSE.measures[M_CLOUD].name, "cloud_services_credits_used");
        assert_eq!(
            WAREHOUSE.measures[M_ATTRIBUTED].name,
            "attributed_compute_credits"
        );
        assert_eq!(WAREHOUSE.measures[M_IDLE].name, "idle_credits");
        assert_eq!(WAREHOUSE.measures[M_AVG_RUNNING].name, "avg_running");
        assert_eq!(WAREHOUSE.measures[M_AVG_QUEUED].name, "avg_queued_load");
        assert_eq!(WAREHOUSE.measures[M_QUERIES].name, "query_count");
        assert_eq!(
            WAREHOUSE.measures[M_IDLE].reduction,
            Reduction::Residual {
                minuend: M_TOTAL,
                subtrahend: M_ATTRIBUTED
            }
        );
    }

    #[test]
    fn warehouseless_queries_are_dropped() {
        let ts = chrono::DateTime::<chrono::Utc>::UNIX_EPOCH;
        let q = |name: &str| QueryHistoryRow {
            ts,
            query_id: "Q".to_string(),
            warehouse_id: 0,
            warehouse_name: name.to_string(),
            query_type: "SELECT".to_string(),
            execution_status: "SUCCESS".to_string(),
            total_elapsed_ms: 10,
            rows_produced: 1,
            rows_updated: 0,
            credits_used_cloud_services: 0.0,
        };
        let out = events(&[], &[], &[], &[q("ETL_WH"), q("")]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].key[1], "ETL_WH");
    }
}
