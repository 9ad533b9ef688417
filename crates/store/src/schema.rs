use frost_core::domain::{Domain, DomainSpec};

pub const RUNS_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS refresh_runs (
  run_id TEXT NOT NULL,
  domain TEXT NOT NULL,
  trigger_kind TEXT NOT NULL,
  started_at TIMESTAMP NOT NULL,
  finished_at TIMESTAMP NOT NULL,
  watermark TIMESTAMP NOT NULL,
  candidate_rows BIGINT NOT NULL,
  inserted_rows BIGINT NOT NULL,
  status TEXT NOT NULL,
  error TEXT
);

CREATE INDEX IF NOT EXISTS idx_refresh_runs_started ON refresh_runs(started_at);
"#;

/// DDL for every domain's fact table, its accelerator copy, and the run log.
/// Accelerator tables start empty with the fact columns; merges replace them
/// wholesale with a re-ordered copy.
pub fn schema_sql() -> String {
    let mut sql = String::new();
    for domain in Domain::ALL {
        let spec = domain.spec();
        sql.push_str(&create_table_sql(spec.fact_table, spec));
        sql.push_str(&create_table_sql(spec.accel_table, spec));
        sql.push_str(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{}_hour ON {}(hour_start);\n\n",
            spec.fact_table, spec.fact_table
        ));
    }
    sql.push_str(RUNS_SQL);
    sql
}

fn create_table_sql(table: &str, spec: &DomainSpec) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n  {}\n);\n\n",
        table,
        column_defs(spec).join(",\n  ")
    )
}

fn column_defs(spec: &DomainSpec) -> Vec<String> {
    let mut cols = vec!["hour_start TIMESTAMP NOT NULL".to_string()];
    for key in spec.key_columns {
        cols.push(format!("{key} TEXT NOT NULL"));
    }
    if spec.has_tags() {
        cols.push("tags TEXT NOT NULL".to_string());
    }
    for m in spec.measures {
        cols.push(format!("{} {} NOT NULL", m.name, m.reduction.sql_type()));
    }
    cols
}
