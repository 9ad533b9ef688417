use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::Domain;
use crate::error::{FrostError, Result};
use crate::filter::{KeyFilter, TimeWindow};
use crate::model::fact::Scalar;
use crate::tags::TagSet;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRequest {
    pub domain: Domain,
    pub window: TimeWindow,
    pub key: Option<KeyFilter>,
    pub limit: usize,
}

impl UsageRequest {
    pub fn for_domain(domain: Domain) -> Self {
        Self {
            domain,
            window: TimeWindow::all(),
            key: None,
            limit: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRow {
    pub hour_start: DateTime<Utc>,
    pub key: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<TagSet>,
    pub measures: Vec<Scalar>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageResponse {
    pub domain: Domain,
    pub columns: Vec<String>,
    pub total_matches: usize,
    pub returned: usize,
    pub rows: Vec<UsageRow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunTrigger {
    Scheduled,
    Manual,
    Backfill,
}

impl RunTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunTrigger::Scheduled => "scheduled",
            RunTrigger::Manual => "manual",
            RunTrigger::Backfill => "backfill",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "scheduled" => Ok(RunTrigger::Scheduled),
            "manual" => Ok(RunTrigger::Manual),
            "backfill" => Ok(RunTrigger::Backfill),
            _ => Err(FrostError::Parse(format!("unknown run trigger: {s}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Ok,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Ok => "ok",
            RunStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "ok" => Ok(RunStatus::Ok),
            "failed" => Ok(RunStatus::Failed),
            _ => Err(FrostError::Parse(format!("unknown run status: {s}"))),
        }
    }
}

/// One refresh run, as recorded in the run log. `watermark` is the lower
/// bound the scan used, not the watermark after the merge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: Uuid,
    pub domain: Domain,
    pub trigger: RunTrigger,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub watermark: DateTime<Utc>,
    pub candidate_rows: usize,
    pub inserted_rows: usize,
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunsRequest {
    pub domain: Option<Domain>,
    pub limit: usize,
}

impl Default for RunsRequest {
    fn default() -> Self {
        Self {
            domain: None,
            limit: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainStatus {
    pub domain: Domain,
    pub fact_rows: usize,
    pub watermark: Option<DateTime<Utc>>,
    pub last_run_status: Option<RunStatus>,
    pub last_run_finished: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub db_path: String,
    pub db_size_bytes: u64,
    pub runs_count: usize,
    pub domains: Vec<DomainStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_enums_round_trip() {
        for trigger in [RunTrigger::Scheduled, RunTrigger::Manual, RunTrigger::Backfill] {
            assert_eq!(RunTrigger::parse(trigger.as_str()).unwrap(), trigger);
        }
        for status in [RunStatus::Ok, RunStatus::Failed] {
            assert_eq!(RunStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(RunTrigger::parse("cron").is_err());
    }
}
