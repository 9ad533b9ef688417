use std::collections::HashMap;

use chrono::{DateTime, Utc};
use frost_core::domain::{DomainSpec, Reduction};
use frost_core::model::fact::{FactRow, RawEvent, Scalar};
use frost_core::tags::TagCatalog;
use frost_core::time::truncate_to_hour;

#[derive(Debug, Clone, Copy)]
enum Accum {
    Sum(f64),
    SumInt(i64),
    Count(i64),
    Avg { sum: f64, n: u64 },
    Residual,
}

impl Accum {
    fn new(reduction: Reduction) -> Self {
        match reduction {
            Reduction::Sum => Accum::Sum(0.0),
            Reduction::SumInt => Accum::SumInt(0),
            Reduction::Count => Accum::Count(0),
            Reduction::Avg => Accum::Avg { sum: 0.0, n: 0 },
            Reduction::Residual { .. } => Accum::Residual,
        }
    }

    fn add(&mut self, value: Scalar) {
        match self {
            Accum::Sum(total) => *total += value.as_f64(),
            Accum::SumInt(total) => *total += value.as_i64(),
            Accum::Count(n) => *n += 1,
            Accum::Avg { sum, n } => {
                *sum += value.as_f64();
                *n += 1;
            }
            Accum::Residual => {}
        }
    }

    fn finalize(&self) -> Scalar {
        match self {
            Accum::Sum(total) => Scalar::Float(*total),
            Accum::SumInt(total) => Scalar::Int(*total),
            Accum::Count(n) => Scalar::Int(*n),
            Accum::Avg { sum, n } => Scalar::Float(if *n == 0 { 0.0 } else { *sum / *n as f64 }),
            Accum::Residual => Scalar::Float(0.0),
        }
    }
}

/// Bucket raw events into hourly fact rows. Events with the same key land in
/// the same bucket when their timestamps share a UTC hour; each measure is
/// reduced per the domain's column descriptors, and events that carry no
/// value for a measure do not contribute to it. Derived residual measures
/// are computed from the already-finalized columns and floored at zero.
pub fn aggregate(spec: &DomainSpec, events: &[RawEvent], catalog: &TagCatalog) -> Vec<FactRow> {
    let mut buckets: HashMap<(DateTime<Utc>, Vec<String>), Vec<Accum>> = HashMap::new();

    for event in events {
        let hour = truncate_to_hour(event.ts);
        let accums = buckets
            .entry((hour, event.key.clone()))
            .or_insert_with(|| spec.measures.iter().map(|m| Accum::new(m.reduction)).collect());
        for (accum, value) in accums.iter_mut().zip(&event.values) {
            if let Some(v) = value {
                accum.add(*v);
            }
        }
    }

    let mut rows = Vec::with_capacity(buckets.len());
    for ((hour_start, key), accums) in buckets {
        let mut measures: Vec<Scalar> = Vec::with_capacity(spec.measures.len());
        for (column, accum) in spec.measures.iter().zip(&accums) {
            let value = match column.reduction {
                Reduction::Residual { minuend, subtrahend } => {
                    let diff = measures[minuend].as_f64() - measures[subtrahend].as_f64();
                    if diff < 0.0 {
                        tracing::warn!(
                            domain = %spec.domain,
                            key = ?key,
                            hour = %hour_start,
                            measure = column.name,
                            residual = diff,
                            "negative residual clamped to zero"
                        );
                        Scalar::Float(0.0)
                    } else {
                        Scalar::Float(diff)
                    }
                }
                _ => accum.finalize(),
            };
            measures.push(value);
        }

        let tags = spec
            .tag_join
            .as_ref()
            .map(|join| catalog.lookup(&key[join.key]))
            .unwrap_or_default();

        rows.push(FactRow {
            hour_start,
            key,
            tags,
            measures,
        });
    }

    rows.sort_by(|a, b| a.key.cmp(&b.key).then(a.hour_start.cmp(&b.hour_start)));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use frost_core::domain::Domain;
    use frost_core::tags::TagPair;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 1, hour, minute, 0).unwrap()
    }

    fn pipe_event(ts: DateTime<Utc>, name: &str, credits: f64, bytes: i64) -> RawEvent {
        RawEvent {
            ts,
            key: vec![name.to_string()],
            values: vec![
                Some(Scalar::Float(credits)),
                Some(Scalar::Int(bytes)),
                Some(Scalar::Int(1)),
            ],
        }
    }

    #[test]
    fn buckets_by_hour_and_key() {
        let spec = Domain::Pipe.spec();
        let events = vec![
            pipe_event(at(0, 10), "ALPHA_PIPE", 0.5, 1000),
            pipe_event(at(0, 50), "ALPHA_PIPE", 0.5, 2000),
            pipe_event(at(1, 5), "ALPHA_PIPE", 0.25, 500),
            pipe_event(at(0, 20), "BRAVO_PIPE", 1.0, 8000),
        ];

        let rows = aggregate(spec, &events, &TagCatalog::default());
        assert_eq!(rows.len(), 3);

        // Sorted by key, then hour.
        assert_eq!(rows[0].key, vec!["ALPHA_PIPE"]);
        assert_eq!(rows[0].hour_start, at(0, 0));
        assert_eq!(rows[0].measures[0], Scalar::Float(1.0));
        assert_eq!(rows[0].measures[1], Scalar::Int(3000));
        assert_eq!(rows[0].measures[2], Scalar::Int(2));
        assert_eq!(rows[1].hour_start, at(1, 0));
        assert_eq!(rows[2].key, vec!["BRAVO_PIPE"]);
    }

    #[test]
    fn averages_skip_events_without_a_value() {
        let spec = Domain::Warehouse.spec();
        let key = vec!["101".to_string(), "ETL_WH".to_string()];
        let sparse = |running: Option<f64>| {
            let mut values = vec![None; spec.measures.len()];
            values[5] = running.map(Scalar::Float);
            RawEvent {
                ts: at(0, 15),
                key: key.clone(),
                values,
            }
        };

        let rows = aggregate(
            spec,
            &[sparse(Some(2.0)), sparse(Some(4.0)), sparse(None)],
            &TagCatalog::default(),
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].measures[5], Scalar::Float(3.0));
        // Measures no event contributed to finalize as zero.
        assert_eq!(rows[0].measures[0], Scalar::Float(0.0));
        assert_eq!(rows[0].measures[6], Scalar::Float(0.0));
        assert_eq!(rows[0].measures[7], Scalar::Int(0));
    }

    #[test]
    fn residual_is_minuend_minus_subtrahend() {
        let spec = Domain::Warehouse.spec();
        let mut values = vec![None; spec.measures.len()];
        values[0] = Some(Scalar::Float(4.0));
        values[3] = Some(Scalar::Float(2.5));
        let rows = aggregate(
            spec,
            &[RawEvent {
                ts: at(0, 0),
                key: vec!["101".to_string(), "ETL_WH".to_string()],
                values,
            }],
            &TagCatalog::default(),
        );
        assert_eq!(rows[0].measures[4], Scalar::Float(1.5));
    }

    #[test]
    fn negative_residual_clamps_to_zero() {
        let spec = Domain::Warehouse.spec();
        let mut values = vec![None; spec.measures.len()];
        values[0] = Some(Scalar::Float(1.0));
        values[3] = Some(Scalar::Float(2.0));
        let rows = aggregate(
            spec,
            &[RawEvent {
                ts: at(0, 0),
                key: vec!["101".to_string(), "ETL_WH".to_string()],
                values,
            }],
            &TagCatalog::default(),
        );
        assert_eq!(rows[0].measures[4], Scalar::Float(0.0));
    }

    #[test]
    fn tags_resolve_through_the_join_column() {
        let spec = Domain::Warehouse.spec();
        let catalog = TagCatalog::from_rows(vec![(
            "ETL_WH".to_string(),
            TagPair {
                tag_name: "team".to_string(),
                tag_value: "data".to_string(),
            },
        )]);

        let event = |name: &str| {
            let mut values = vec![None; spec.measures.len()];
            values[0] = Some(Scalar::Float(1.0));
            RawEvent {
                ts: at(0, 0),
                key: vec!["9".to_string(), name.to_string()],
                values,
            }
        };

        let rows = aggregate(spec, &[event("ADHOC_WH"), event("ETL_WH")], &catalog);
        assert!(rows[0].tags.is_empty());
        assert_eq!(rows[1].tags.pairs()[0].tag_value, "data");
    }

    #[test]
    fn empty_input_produces_no_rows() {
        let rows = aggregate(Domain::Pipe.spec(), &[], &TagCatalog::default());
        assert!(rows.is_empty());
    }
}
