use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use duckdb::Connection;
use frost_core::domain::Domain;
use frost_core::error::{FrostError, Result};
use frost_core::query::{DomainStatus, StatusResponse};

use crate::schema::schema_sql;

#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
    db_path: String,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| FrostError::Io(format!("failed to create db dir: {e}")))?;
        }

        let conn = Connection::open(path)
            .map_err(|e| FrostError::Store(format!("failed to open duckdb: {e}")))?;
        conn.execute_batch("PRAGMA threads=4;")
            .map_err(|e| FrostError::Store(format!("failed to set pragmas: {e}")))?;
        conn.execute_batch(&schema_sql())
            .map_err(|e| FrostError::Store(format!("failed to initialize schema: {e}")))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path: path.display().to_string(),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| FrostError::Store(format!("failed to open in-memory db: {e}")))?;
        conn.execute_batch(&schema_sql())
            .map_err(|e| FrostError::Store(format!("failed to initialize schema: {e}")))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path: ":memory:".to_string(),
        })
    }

    pub(crate) fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().expect("store mutex poisoned")
    }

    /// Run arbitrary DDL/DML against the store. Exists so fixtures can
    /// provision source feeds on the same connection.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn()
            .execute_batch(sql)
            .map_err(|e| FrostError::Store(format!("batch failed: {e}")))
    }

    pub fn status(&self) -> Result<StatusResponse> {
        let mut domains = Vec::with_capacity(Domain::ALL.len());
        for domain in Domain::ALL {
            let spec = domain.spec();
            let fact_rows = {
                let conn = self.conn();
                scalar_usize(&conn, &format!("SELECT COUNT(*) FROM {}", spec.fact_table))?
            };
            let watermark = self.watermark(spec)?;
            let last_run = self.last_run(domain)?;
            domains.push(DomainStatus {
                domain,
                fact_rows,
                watermark,
                last_run_status: last_run.as_ref().map(|r| r.status),
                last_run_finished: last_run.map(|r| r.finished_at),
            });
        }

        let runs_count = {
            let conn = self.conn();
            scalar_usize(&conn, "SELECT COUNT(*) FROM refresh_runs")?
        };

        let db_size_bytes = if self.db_path == ":memory:" {
            0
        } else {
            fs::metadata(&self.db_path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StatusResponse {
            db_path: self.db_path.clone(),
            db_size_bytes,
            runs_count,
            domains,
        })
    }
}

pub(crate) fn scalar_usize(conn: &Connection, sql: &str) -> Result<usize> {
    conn.query_row(sql, [], |row| row.get::<_, i64>(0))
        .map(|v| v as usize)
        .map_err(|e| FrostError::Store(format!("query failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_store_initializes() {
        let store = Store::open_in_memory().unwrap();
        let status = store.status().unwrap();
        assert_eq!(status.runs_count, 0);
        assert_eq!(status.domains.len(), Domain::ALL.len());
        for domain in status.domains {
            assert_eq!(domain.fact_rows, 0);
            assert!(domain.watermark.is_none());
            assert!(domain.last_run_status.is_none());
        }
    }
}
