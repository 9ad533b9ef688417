use chrono::{DateTime, NaiveDateTime, Utc};
use duckdb::params_from_iter;
use duckdb::types::Value;
use frost_core::domain::DomainSpec;
use frost_core::error::{FrostError, Result};
use frost_core::model::fact::FactRow;

use crate::Store;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub candidates: usize,
    pub inserted: usize,
}

impl Store {
    /// Highest bucket already stored for this domain. `None` until the first
    /// merge lands.
    pub fn watermark(&self, spec: &DomainSpec) -> Result<Option<DateTime<Utc>>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT MAX(hour_start) FROM {}", spec.fact_table),
            [],
            |row| row.get::<_, Option<NaiveDateTime>>(0),
        )
        .map(|opt| opt.map(|dt| dt.and_utc()))
        .map_err(|e| FrostError::Store(format!("watermark query failed: {e}")))
    }

    /// Merge aggregated rows into the domain's fact table. Buckets whose
    /// (hour_start, key) already exists are skipped, never updated, so a
    /// committed hour keeps its first-seen values even if the source later
    /// gains rows for it. When anything lands, the accelerator copy is
    /// rebuilt inside the same transaction.
    pub fn merge_facts(&self, spec: &DomainSpec, rows: &[FactRow]) -> Result<MergeOutcome> {
        if rows.is_empty() {
            return Ok(MergeOutcome::default());
        }

        let columns = spec.column_names();
        let column_list = columns.join(", ");
        let placeholders = vec!["?"; columns.len()].join(", ");

        let mut match_exprs = vec!["f.hour_start = s.hour_start".to_string()];
        for key in spec.key_columns {
            match_exprs.push(format!("f.{key} = s.{key}"));
        }
        let match_clause = match_exprs.join(" AND ");

        let mut conn = self.conn();
        let tx = conn
            .transaction()
            .map_err(|e| FrostError::Store(format!("begin tx failed: {e}")))?;

        {
            tx.execute_batch(&format!(
                "CREATE OR REPLACE TEMP TABLE merge_stage AS
                 SELECT {column_list} FROM {} LIMIT 0;",
                spec.fact_table
            ))
            .map_err(|e| FrostError::Store(format!("create stage failed: {e}")))?;

            let mut stmt = tx
                .prepare(&format!(
                    "INSERT INTO merge_stage ({column_list}) VALUES ({placeholders})"
                ))
                .map_err(|e| FrostError::Store(format!("prepare stage insert failed: {e}")))?;

            for row in rows {
                if row.key.len() != spec.key_columns.len()
                    || row.measures.len() != spec.measures.len()
                {
                    return Err(FrostError::Internal(format!(
                        "fact row shape mismatch for {}",
                        spec.fact_table
                    )));
                }

                let mut values: Vec<Value> = Vec::with_capacity(columns.len());
                values.push(Value::Text(row.hour_start.to_rfc3339()));
                for part in &row.key {
                    values.push(Value::Text(part.clone()));
                }
                if spec.has_tags() {
                    values.push(Value::Text(row.tags.to_json()));
                }
                for (measure, column) in row.measures.iter().zip(spec.measures) {
                    values.push(if column.reduction.is_float() {
                        Value::Double(measure.as_f64())
                    } else {
                        Value::BigInt(measure.as_i64())
                    });
                }

                stmt.execute(params_from_iter(values))
                    .map_err(|e| FrostError::Store(format!("stage insert failed: {e}")))?;
            }
        }

        let inserted = tx
            .execute(
                &format!(
                    "INSERT INTO {fact}
                     SELECT {column_list} FROM merge_stage s
                     WHERE NOT EXISTS (SELECT 1 FROM {fact} f WHERE {match_clause})",
                    fact = spec.fact_table
                ),
                [],
            )
            .map_err(|e| FrostError::Store(format!("merge insert failed: {e}")))?;

        if inserted > 0 {
            tx.execute_batch(&format!(
                "CREATE OR REPLACE TABLE {} AS
                 SELECT * FROM {} ORDER BY {};",
                spec.accel_table,
                spec.fact_table,
                spec.accel_order.join(", ")
            ))
            .map_err(|e| FrostError::Store(format!("accelerator rebuild failed: {e}")))?;
        }

        tx.execute_batch("DROP TABLE merge_stage;")
            .map_err(|e| FrostError::Store(format!("drop stage failed: {e}")))?;

        tx.commit()
            .map_err(|e| FrostError::Store(format!("commit merge failed: {e}")))?;

        tracing::debug!(
            domain = %spec.domain,
            candidates = rows.len(),
            inserted,
            "merged fact rows"
        );

        Ok(MergeOutcome {
            candidates: rows.len(),
            inserted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use frost_core::domain::Domain;
    use frost_core::model::fact::Scalar;
    use frost_core::tags::{TagPair, TagSet};

    fn pipe_row(hour: DateTime<Utc>, name: &str, credits: f64) -> FactRow {
        FactRow {
            hour_start: hour,
            key: vec![name.to_string()],
            tags: TagSet::new(vec![TagPair {
                tag_name: "team".to_string(),
                tag_value: "data".to_string(),
            }]),
            measures: vec![Scalar::Float(credits), Scalar::Int(1024), Scalar::Int(2)],
        }
    }

    fn stored_credits(store: &Store, hour: DateTime<Utc>, name: &str) -> f64 {
        let conn = store.conn();
        conn.query_row(
            "SELECT total_credits_used FROM pipe_usage_hourly
             WHERE hour_start = ? AND pipe_name = ?",
            duckdb::params![hour.to_rfc3339(), name],
            |row| row.get::<_, f64>(0),
        )
        .unwrap()
    }

    #[test]
    fn merge_inserts_and_rebuilds_accelerator() {
        let store = Store::open_in_memory().unwrap();
        let spec = Domain::Pipe.spec();
        let h0 = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
        let h1 = Utc.with_ymd_and_hms(2026, 2, 1, 1, 0, 0).unwrap();

        let outcome = store
            .merge_facts(
                spec,
                &[
                    pipe_row(h1, "ZULU_PIPE", 2.0),
                    pipe_row(h0, "ALPHA_PIPE", 1.0),
                ],
            )
            .unwrap();
        assert_eq!(outcome, MergeOutcome { candidates: 2, inserted: 2 });
        assert_eq!(store.watermark(spec).unwrap(), Some(h1));

        let conn = store.conn();
        let first: String = conn
            .query_row("SELECT pipe_name FROM mv_pipe_usage LIMIT 1", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(first, "ALPHA_PIPE");
        let accel_rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM mv_pipe_usage", [], |row| row.get(0))
            .unwrap();
        assert_eq!(accel_rows, 2);
    }

    #[test]
    fn merge_skips_existing_buckets() {
        let store = Store::open_in_memory().unwrap();
        let spec = Domain::Pipe.spec();
        let h0 = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
        let h1 = Utc.with_ymd_and_hms(2026, 2, 1, 1, 0, 0).unwrap();

        store
            .merge_facts(spec, &[pipe_row(h0, "ALPHA_PIPE", 5.0)])
            .unwrap();

        // The re-aggregated value for the stored hour is ignored.
        let outcome = store
            .merge_facts(
                spec,
                &[
                    pipe_row(h0, "ALPHA_PIPE", 9.9),
                    pipe_row(h1, "ALPHA_PIPE", 3.0),
                ],
            )
            .unwrap();
        assert_eq!(outcome, MergeOutcome { candidates: 2, inserted: 1 });
        assert_eq!(stored_credits(&store, h0, "ALPHA_PIPE"), 5.0);
        assert_eq!(stored_credits(&store, h1, "ALPHA_PIPE"), 3.0);
    }

    #[test]
    fn merge_is_idempotent() {
        let store = Store::open_in_memory().unwrap();
        let spec = Domain::Pipe.spec();
        let h0 = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
        let batch = vec![
            pipe_row(h0, "ALPHA_PIPE", 1.0),
            pipe_row(h0, "BRAVO_PIPE", 2.0),
        ];

        store.merge_facts(spec, &batch).unwrap();
        let again = store.merge_facts(spec, &batch).unwrap();
        assert_eq!(again, MergeOutcome { candidates: 2, inserted: 0 });

        let conn = store.conn();
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM pipe_usage_hourly", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(rows, 2);
    }

    #[test]
    fn empty_batch_is_a_no_op() {
        let store = Store::open_in_memory().unwrap();
        let outcome = store.merge_facts(Domain::Pipe.spec(), &[]).unwrap();
        assert_eq!(outcome, MergeOutcome::default());
        assert!(store.watermark(Domain::Pipe.spec()).unwrap().is_none());
    }

    #[test]
    fn same_hour_different_keys_both_land() {
        let store = Store::open_in_memory().unwrap();
        let spec = Domain::Warehouse.spec();
        let h0 = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
        let row = |id: &str, name: &str| FactRow {
            hour_start: h0,
            key: vec![id.to_string(), name.to_string()],
            tags: TagSet::default(),
            measures: vec![
                Scalar::Float(4.0),
                Scalar::Float(3.0),
                Scalar::Float(1.0),
                Scalar::Float(2.5),
                Scalar::Float(0.5),
                Scalar::Float(1.2),
                Scalar::Float(0.0),
                Scalar::Int(12),
            ],
        };

        let outcome = store
            .merge_facts(spec, &[row("1", "ETL_WH"), row("2", "ADHOC_WH")])
            .unwrap();
        assert_eq!(outcome.inserted, 2);
    }
}
