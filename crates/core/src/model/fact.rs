use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tags::TagSet;

/// A single measure value. `Int` is listed first so whole JSON numbers
/// deserialize as integers rather than floats.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Float(f64),
}

impl Scalar {
    pub fn as_f64(&self) -> f64 {
        match self {
            Scalar::Int(v) => *v as f64,
            Scalar::Float(v) => *v,
        }
    }

    pub fn as_i64(&self) -> i64 {
        match self {
            Scalar::Int(v) => *v,
            Scalar::Float(v) => *v as i64,
        }
    }
}

/// One source event, keyed and timestamped, carrying values for a sparse
/// subset of the domain's measures. `values` is indexed by measure position;
/// `None` means this event does not contribute to that measure.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent {
    pub ts: DateTime<Utc>,
    pub key: Vec<String>,
    pub values: Vec<Option<Scalar>>,
}

/// One aggregated row of a domain's fact table.
#[derive(Debug, Clone, PartialEq)]
pub struct FactRow {
    pub hour_start: DateTime<Utc>,
    pub key: Vec<String>,
    pub tags: TagSet,
    pub measures: Vec<Scalar>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_json_distinguishes_int_and_float() {
        let parsed: Vec<Scalar> = serde_json::from_str("[3, 2.5]").unwrap();
        assert_eq!(parsed, vec![Scalar::Int(3), Scalar::Float(2.5)]);
        assert_eq!(serde_json::to_string(&parsed).unwrap(), "[3,2.5]");
    }

    #[test]
    fn scalar_conversions() {
        assert_eq!(Scalar::Int(7).as_f64(), 7.0);
        assert_eq!(Scalar::Float(1.5).as_i64(), 1);
    }
}
