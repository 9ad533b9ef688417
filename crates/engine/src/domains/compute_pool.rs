use frost_core::domain::COMPUTE_POOL;
use frost_core::model::fact::{RawEvent, Scalar};
use frost_core::model::feed::ComputePoolRow;

pub const M_CREDITS: usize = 0;

pub fn events(rows: &[ComputePoolRow]) -> Vec<RawEvent> {
    rows.iter()
        .map(|r| {
            let mut values = vec![None; COMPUTE_POOL.measures.len()];
            values[M_CREDITS] = Some(Scalar::Float(r.credits_used));
            RawEvent {
                ts: r.ts,
                key: vec![r.compute_pool_name.clone()],
                values,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measure_indexes_match_descriptor() {
        assert_eq!(COMPUTE_POOL.measures[M_CREDITS].name, "total_credits_used");
        assert!(!COMPUTE_POOL.has_tags());
    }
}
