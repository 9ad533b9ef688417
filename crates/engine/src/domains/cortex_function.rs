use std::collections::HashMap;

use frost_core::domain::CORTEX_FUNCTION;
use frost_core::model::fact::{RawEvent, Scalar};
use frost_core::model::feed::{CortexFunctionUsageRow, QueryHistoryRow};

pub const M_TOKENS: usize = 0;
pub const M_TOKEN_CREDITS: usize = 1;
pub const M_QUERIES: usize = 2;
pub const M_ROWS_PRODUCED: usize = 3;
pub const M_ROWS_UPDATED: usize = 4;
pub const M_CLOUD_CREDITS: usize = 5;
pub const M_AVG_ELAPSED: usize = 6;

/// Correlate cortex usage with query_history by query id. Usage rows whose
/// query is missing from the history keep empty query-derived key parts and
/// contribute nothing to the query-derived measures, so those aggregate to
/// zero. Elapsed time averages over successful queries only.
pub fn events(usage: &[CortexFunctionUsageRow], queries: &[QueryHistoryRow]) -> Vec<RawEvent> {
    let by_id: HashMap<&str, &QueryHistoryRow> =
        queries.iter().map(|q| (q.query_id.as_str(), q)).collect();

    usage
        .iter()
        .map(|u| {
            let matched = by_id.get(u.query_id.as_str());

            let key = vec![
                u.function_name.clone(),
                u.model_name.clone(),
                matched.map(|q| q.query_type.clone()).unwrap_or_default(),
                matched.map(|q| q.warehouse_name.clone()).unwrap_or_default(),
            ];

            let mut values = vec![None; CORTEX_FUNCTION.measures.len()];
            values[M_TOKENS] = Some(Scalar::Int(u.tokens));
            values[M_TOKEN_CREDITS] = Some(Scalar::Float(u.token_credits));
            if let Some(q) = matched {
                values[M_QUERIES] = Some(Scalar::Int(1));
                values[M_ROWS_PRODUCED] = Some(Scalar::Int(q.rows_produced));
                values[M_ROWS_UPDATED] = Some(Scalar::Int(q.rows_updated));
                values[M_CLOUD_CREDITS] = Some(Scalar::Float(q.credits_used_cloud_services));
                if q.execution_status == "SUCCESS" {
                    values[M_AVG_ELAPSED] = Some(Scalar::Float(q.total_elapsed_ms as f64));
                }
            }

            RawEvent {
                ts: u.ts,
                key,
                values,
            }
        })
        .collect()
}
