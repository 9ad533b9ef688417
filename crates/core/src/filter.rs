use chrono::{DateTime, Utc};
use glob::Pattern;
use serde::{Deserialize, Serialize};

use crate::error::{FrostError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyFilter {
    pub value_glob: String,
}

impl KeyFilter {
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(FrostError::Parse("key filter cannot be empty".to_string()));
        }
        Pattern::new(trimmed)
            .map_err(|e| FrostError::Parse(format!("invalid key filter {input}: {e}")))?;

        Ok(Self {
            value_glob: trimmed.to_string(),
        })
    }

    /// Case-insensitive match against the leading key column of a row.
    pub fn matches(&self, value: &str) -> bool {
        Pattern::new(&self.value_glob.to_ascii_lowercase())
            .map(|p| p.matches(&value.to_ascii_lowercase()))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeWindow {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl TimeWindow {
    pub fn all() -> Self {
        Self {
            since: None,
            until: None,
        }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        if let Some(since) = self.since {
            if ts < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if ts > until {
                return false;
            }
        }
        true
    }
}
