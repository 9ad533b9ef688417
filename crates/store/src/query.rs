use chrono::NaiveDateTime;
use frost_core::error::{FrostError, Result};
use frost_core::model::fact::Scalar;
use frost_core::query::{UsageRequest, UsageResponse, UsageRow};
use frost_core::tags::TagSet;

use crate::Store;
use crate::source::naive_to_utc;

impl Store {
    /// Serve a usage query from the domain's accelerator copy. Rows come
    /// back in the accelerator's physical order; the window and key filters
    /// are applied after the fetch, the same way other list endpoints here
    /// post-filter.
    pub fn usage_rows(&self, req: &UsageRequest) -> Result<UsageResponse> {
        let spec = req.domain.spec();
        let columns = spec.column_names();
        let key_count = spec.key_columns.len();
        let has_tags = spec.has_tags();
        let measures = spec.measures;

        let conn = self.conn();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM {}",
                columns.join(", "),
                spec.accel_table
            ))
            .map_err(|e| FrostError::Store(format!("prepare usage query failed: {e}")))?;

        let rows = stmt
            .query_map([], |row| {
                let hour_start = naive_to_utc(row.get::<_, NaiveDateTime>(0)?);
                let mut idx = 1;

                let mut key = Vec::with_capacity(key_count);
                for _ in 0..key_count {
                    key.push(row.get::<_, String>(idx)?);
                    idx += 1;
                }

                let tags = if has_tags {
                    let raw: String = row.get(idx)?;
                    idx += 1;
                    Some(TagSet::from_json(&raw))
                } else {
                    None
                };

                let mut values = Vec::with_capacity(measures.len());
                for m in measures {
                    values.push(if m.reduction.is_float() {
                        Scalar::Float(row.get::<_, f64>(idx)?)
                    } else {
                        Scalar::Int(row.get::<_, i64>(idx)?)
                    });
                    idx += 1;
                }

                Ok(UsageRow {
                    hour_start,
                    key,
                    tags,
                    measures: values,
                })
            })
            .map_err(|e| FrostError::Store(format!("usage query failed: {e}")))?;

        let mut matched = Vec::new();
        let primary = spec.primary_key_index();
        for row in rows {
            let row =
                row.map_err(|e| FrostError::Store(format!("map usage row failed: {e}")))?;
            if !req.window.contains(row.hour_start) {
                continue;
            }
            if let Some(filter) = &req.key
                && !filter.matches(&row.key[primary])
            {
                continue;
            }
            matched.push(row);
        }

        let total_matches = matched.len();
        matched.truncate(req.limit);

        Ok(UsageResponse {
            domain: req.domain,
            columns: columns.into_iter().map(str::to_string).collect(),
            total_matches,
            returned: matched.len(),
            rows: matched,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use frost_core::domain::Domain;
    use frost_core::filter::{KeyFilter, TimeWindow};
    use frost_core::model::fact::FactRow;
    use frost_core::tags::{TagPair, TagSet};

    fn seeded_store() -> (Store, DateTime<Utc>, DateTime<Utc>) {
        let store = Store::open_in_memory().unwrap();
        let h0 = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
        let h1 = Utc.with_ymd_and_hms(2026, 2, 1, 1, 0, 0).unwrap();
        let row = |hour, name: &str, credits| FactRow {
            hour_start: hour,
            key: vec![name.to_string()],
            tags: TagSet::new(vec![TagPair {
                tag_name: "team".to_string(),
                tag_value: "ingest".to_string(),
            }]),
            measures: vec![Scalar::Float(credits), Scalar::Int(100), Scalar::Int(1)],
        };
        store
            .merge_facts(
                Domain::Pipe.spec(),
                &[
                    row(h1, "ZULU_PIPE", 4.0),
                    row(h0, "ALPHA_PIPE", 1.0),
                    row(h1, "ALPHA_PIPE", 2.0),
                ],
            )
            .unwrap();
        (store, h0, h1)
    }

    #[test]
    fn rows_come_back_in_accelerator_order() {
        let (store, _, _) = seeded_store();
        let resp = store
            .usage_rows(&UsageRequest::for_domain(Domain::Pipe))
            .unwrap();
        assert_eq!(resp.total_matches, 3);
        assert_eq!(resp.returned, 3);
        assert_eq!(resp.columns[0], "hour_start");
        let keys: Vec<_> = resp.rows.iter().map(|r| r.key[0].clone()).collect();
        assert_eq!(keys, vec!["ALPHA_PIPE", "ALPHA_PIPE", "ZULU_PIPE"]);
        assert!(resp.rows[0].hour_start < resp.rows[1].hour_start);
        assert!(resp.rows[0].tags.is_some());
    }

    #[test]
    fn window_and_key_filters_apply() {
        let (store, _, h1) = seeded_store();
        let mut req = UsageRequest::for_domain(Domain::Pipe);
        req.window = TimeWindow {
            since: Some(h1),
            until: None,
        };
        req.key = Some(KeyFilter::parse("alpha*").unwrap());

        let resp = store.usage_rows(&req).unwrap();
        assert_eq!(resp.total_matches, 1);
        assert_eq!(resp.rows[0].measures[0], Scalar::Float(2.0));
    }

    #[test]
    fn limit_truncates_but_counts_all() {
        let (store, _, _) = seeded_store();
        let mut req = UsageRequest::for_domain(Domain::Pipe);
        req.limit = 1;
        let resp = store.usage_rows(&req).unwrap();
        assert_eq!(resp.total_matches, 3);
        assert_eq!(resp.returned, 1);
    }

    #[test]
    fn untagged_domains_have_no_tags_field() {
        let store = Store::open_in_memory().unwrap();
        let h0 = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
        store
            .merge_facts(
                Domain::ComputePool.spec(),
                &[FactRow {
                    hour_start: h0,
                    key: vec!["GPU_POOL".to_string()],
                    tags: TagSet::default(),
                    measures: vec![Scalar::Float(7.5)],
                }],
            )
            .unwrap();

        let resp = store
            .usage_rows(&UsageRequest::for_domain(Domain::ComputePool))
            .unwrap();
        assert_eq!(resp.returned, 1);
        assert!(resp.rows[0].tags.is_none());
        assert!(!resp.columns.contains(&"tags".to_string()));
    }
}
