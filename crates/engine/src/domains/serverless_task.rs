use frost_core::domain::SERVERLESS_TASK;
use frost_core::model::fact::{RawEvent, Scalar};
use frost_core::model::feed::ServerlessTaskRow;

pub const M_CREDITS: usize = 0;

pub fn events(rows: &[ServerlessTaskRow]) -> Vec<RawEvent> {
    rows.iter()
        .map(|r| {
            let mut values = vec![None; SERVERLESS_TASK.measures.len()];
            values[M_CREDITS] = Some(Scalar::Float(r.credits_used));
            RawEvent {
                ts: r.ts,
                key: vec![r.task_name.clone()],
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
        assert_eq!(SERVERLESS_TASK.measures[M_CREDITS].name, "total_credits_used");
        assert_eq!(SERVERLESS_TASK.measures.len(), 1);
    }
}
