use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{FrostError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Pipe,
    Warehouse,
    ServerlessTask,
    CortexFunction,
    ComputePool,
}

impl Domain {
    pub const ALL: [Domain; 5] = [
        Domain::Pipe,
        Domain::Warehouse,
        Domain::ServerlessTask,
        Domain::CortexFunction,
        Domain::ComputePool,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Pipe => "pipe",
            Domain::Warehouse => "warehouse",
            Domain::ServerlessTask => "serverless_task",
            Domain::CortexFunction => "cortex_function",
            Domain::ComputePool => "compute_pool",
        }
    }

    pub fn spec(&self) -> &'static DomainSpec {
        match self {
            Domain::Pipe => &PIPE,
            Domain::Warehouse => &WAREHOUSE,
            Domain::ServerlessTask => &SERVERLESS_TASK,
            Domain::CortexFunction => &CORTEX_FUNCTION,
            Domain::ComputePool => &COMPUTE_POOL,
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = FrostError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pipe" => Ok(Domain::Pipe),
            "warehouse" => Ok(Domain::Warehouse),
            "serverless_task" => Ok(Domain::ServerlessTask),
            "cortex_function" => Ok(Domain::CortexFunction),
            "compute_pool" => Ok(Domain::ComputePool),
            _ => Err(FrostError::Parse(format!("unknown domain: {s}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    /// Floating-point sum over contributed values; zero when none.
    Sum,
    /// Exact integer sum over contributed values; zero when none.
    SumInt,
    /// Count of events that carried a value for this column.
    Count,
    /// Mean over events that carried a value; zero when none did.
    Avg,
    /// Difference of two earlier measures in the same row, floored at zero.
    /// Both operands must precede this column in the measure list.
    Residual { minuend: usize, subtrahend: usize },
}

impl Reduction {
    pub fn sql_type(&self) -> &'static str {
        match self {
            Reduction::Sum | Reduction::Avg | Reduction::Residual { .. } => "DOUBLE",
            Reduction::SumInt | Reduction::Count => "BIGINT",
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(
            self,
            Reduction::Sum | Reduction::Avg | Reduction::Residual { .. }
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MeasureColumn {
    pub name: &'static str,
    pub reduction: Reduction,
}

/// How a domain's rows pick up tags from the catalog: which key column to
/// join on, and which catalog object domain holds the entries.
#[derive(Debug, Clone, Copy)]
pub struct TagJoin {
    pub key: usize,
    pub object_domain: &'static str,
}

/// Static description of one usage domain: the fact table it owns, how its
/// rows are keyed, which measures it carries, and how the accelerator copy
/// is physically ordered.
pub struct DomainSpec {
    pub domain: Domain,
    pub fact_table: &'static str,
    pub accel_table: &'static str,
    pub key_columns: &'static [&'static str],
    /// `None` for domains whose fact table has no tags column.
    pub tag_join: Option<TagJoin>,
    pub measures: &'static [MeasureColumn],
    pub accel_order: &'static [&'static str],
}

impl DomainSpec {
    pub fn has_tags(&self) -> bool {
        self.tag_join.is_some()
    }

    /// Index of the key column a domain's rows are identified by when
    /// filtering and displaying, the leading accelerator order column.
    pub fn primary_key_index(&self) -> usize {
        self.key_columns
            .iter()
            .position(|c| *c == self.accel_order[0])
            .unwrap_or(0)
    }

    /// Column names of the fact table, in physical order.
    pub fn column_names(&self) -> Vec<&'static str> {
        let mut cols = Vec::with_capacity(2 + self.key_columns.len() + self.measures.len());
        cols.push("hour_start");
        cols.extend_from_slice(self.key_columns);
        if self.has_tags() {
            cols.push("tags");
        }
        for m in self.measures {
            cols.push(m.name);
        }
        cols
    }
}

pub static PIPE: DomainSpec = DomainSpec {
    domain: Domain::Pipe,
    fact_table: "pipe_usage_hourly",
    accel_table: "mv_pipe_usage",
    key_columns: &["pipe_name"],
    tag_join: Some(TagJoin {
        key: 0,
        object_domain: "PIPE",
    }),
    measures: &[
        MeasureColumn {
            name: "total_credits_used",
            reduction: Reduction::Sum,
        },
        MeasureColumn {
            name: "total_bytes_inserted",
            reduction: Reduction::SumInt,
        },
        MeasureColumn {
            name: "total_files_inserted",
            reduction: Reduction::SumInt,
        },
    ],
    accel_order: &["pipe_name", "hour_start"],
};

pub static WAREHOUSE: DomainSpec = DomainSpec {
    domain: Domain::Warehouse,
    fact_table: "warehouse_usage_hourly",
    accel_table: "mv_warehouse_usage",
    key_columns: &["warehouse_id", "warehouse_name"],
    tag_join: Some(TagJoin {
        key: 1,
        object_domain: "WAREHOUSE",
    }),
    measures: &[
        MeasureColumn {
            name: "total_credits_used",
            reduction: Reduction::Sum,
        },
        MeasureColumn {
            name: "compute_credits_used",
            reduction: Reduction::Sum,
        },
        MeasureColumn {
            name: "cloud_services_credits_used",
            reduction: Reduction::Sum,
        },
        MeasureColumn {
            name: "attributed_compute_credits",
            reduction: Reduction::Sum,
        },
        MeasureColumn {
            name: "idle_credits",
            reduction: Reduction::Residual {
                minuend: 0,
                subtrahend: 3,
            },
        },
        MeasureColumn {
            name: "avg_running",
            reduction: Reduction::Avg,
        },
        MeasureColumn {
            name: "avg_queued_load",
            reduction: Reduction::Avg,
        },
        MeasureColumn {
            name: "query_count",
            reduction: Reduction::Count,
        },
    ],
    accel_order: &["warehouse_name", "hour_start"],
};

pub static SERVERLESS_TASK: DomainSpec = DomainSpec {
    domain: Domain::ServerlessTask,
    fact_table: "serverless_task_usage_hourly",
    accel_table: "mv_serverless_task_usage",
    key_columns: &["task_name"],
    tag_join: Some(TagJoin {
        key: 0,
        object_domain: "TASK",
    }),
    measures: &[MeasureColumn {
        name: "total_credits_used",
        reduction: Reduction::Sum,
    }],
    accel_order: &["task_name", "hour_start"],
};

pub static CORTEX_FUNCTION: DomainSpec = DomainSpec {
    domain: Domain::CortexFunction,
    fact_table: "cortex_function_usage_hourly",
    accel_table: "mv_cortex_function_usage",
    key_columns: &[
        "cf_function_name",
        "cf_model_name",
        "qh_query_type",
        "qh_warehouse_name",
    ],
    tag_join: None,
    measures: &[
        MeasureColumn {
            name: "cf_total_tokens",
            reduction: Reduction::SumInt,
        },
        MeasureColumn {
            name: "cf_total_token_credits",
            reduction: Reduction::Sum,
        },
        MeasureColumn {
            name: "qh_total_queries",
            reduction: Reduction::Count,
        },
        MeasureColumn {
            name: "qh_total_rows_produced",
            reduction: Reduction::SumInt,
        },
        MeasureColumn {
            name: "qh_total_rows_updated",
            reduction: Reduction::SumInt,
        },
        MeasureColumn {
            name: "qh_total_credits_used_cloud_services",
            reduction: Reduction::Sum,
        },
        MeasureColumn {
            name: "qh_avg_elapsed_ms",
            reduction: Reduction::Avg,
        },
    ],
    accel_order: &["cf_function_name", "cf_model_name", "hour_start"],
};

pub static COMPUTE_POOL: DomainSpec = DomainSpec {
    domain: Domain::ComputePool,
    fact_table: "compute_pool_usage_hourly",
    accel_table: "mv_compute_pool_usage",
    key_columns: &["compute_pool_name"],
    tag_join: None,
    measures: &[MeasureColumn {
        name: "total_credits_used",
        reduction: Reduction::Sum,
    }],
    accel_order: &["compute_pool_name", "hour_start"],
};
