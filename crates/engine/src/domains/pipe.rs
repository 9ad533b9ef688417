use frost_core::domain::PIPE;
use frost_core::model::fact::{RawEvent, Scalar};
use frost_core::model::feed::PipeUsageRow;

pub const M_CREDITS: usize = 0;
pub const M_BYTES: usize = 1;
pub const M_FILES: usize = 2;

pub fn events(rows: &[PipeUsageRow]) -> Vec<RawEvent> {
    rows.iter()
        .map(|r| {
            let mut values = vec![None; PIPE.measures.len()];
            values[M_CREDITS] = Some(Scalar::Float(r.credits_used));
            values[M_BYTES] = Some(Scalar::Int(r.bytes_inserted));
            values[M_FILES] = Some(Scalar::Int(r.files_inserted));
            RawEvent {
                ts: r.ts,
                key: vec![r.pipe_name.clone()],
                values,
            }
        })
        .collect()
}
