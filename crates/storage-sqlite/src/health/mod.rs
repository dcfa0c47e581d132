//! SQLite implementation of the status probe.

use std::sync::Arc;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::sql_types::BigInt;
use log::debug;
use tradesim_core::status::{DatabaseHealth, DatabaseProbe};
use tradesim_core::Result;

use crate::db::{get_connection, DbPool};
use crate::errors::IntoCore;

#[derive(QueryableByName, Debug)]
struct TableCount {
    #[diesel(sql_type = BigInt)]
    count: i64,
}

/// Reports connectivity, table count and checked-out connections of a pool.
pub struct SqliteDatabaseProbe {
    pool: Arc<DbPool>,
}

impl SqliteDatabaseProbe {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DatabaseProbe for SqliteDatabaseProbe {
    async fn probe(&self) -> Result<DatabaseHealth> {
        let pool = Arc::clone(&self.pool);
        tokio::task::spawn_blocking(move || probe_pool(&pool)).await?
    }
}

fn probe_pool(pool: &DbPool) -> Result<DatabaseHealth> {
    let table_count = {
        let mut conn = get_connection(pool)?;
        diesel::sql_query("SELECT COUNT(*) AS count FROM sqlite_master WHERE type = 'table'")
            .get_result::<TableCount>(&mut conn)
            .into_core()?
            .count
    };

    // Read after the probe connection went back to the pool.
    let state = pool.state();
    let active_connections = state.connections.saturating_sub(state.idle_connections);
    debug!(
        "Database probe: {} tables, {} active connections",
        table_count, active_connections
    );

    Ok(DatabaseHealth {
        connected: true,
        table_count: table_count.max(0) as u64,
        active_connections: u64::from(active_connections),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_pool, init};
    use diesel::connection::SimpleConnection;

    fn temp_pool(dir: &tempfile::TempDir) -> Arc<DbPool> {
        let path = dir.path().join("nested").join("app.db");
        let path = init(path.to_str().unwrap()).unwrap();
        create_pool(&path).unwrap()
    }

    #[tokio::test]
    async fn test_probe_empty_database() {
        let dir = tempfile::tempdir().unwrap();
        let probe = SqliteDatabaseProbe::new(temp_pool(&dir));

        let health = probe.probe().await.unwrap();
        assert!(health.connected);
        assert_eq!(health.table_count, 0);
    }

    #[tokio::test]
    async fn test_probe_counts_tables() {
        let dir = tempfile::tempdir().unwrap();
        let pool = temp_pool(&dir);
        {
            let mut conn = get_connection(&pool).unwrap();
            conn.batch_execute(
                "CREATE TABLE users (id INTEGER PRIMARY KEY);
                 CREATE TABLE trades (id INTEGER PRIMARY KEY, symbol TEXT NOT NULL);
                 CREATE INDEX idx_trades_symbol ON trades(symbol);",
            )
            .unwrap();
        }

        let health = SqliteDatabaseProbe::new(pool).probe().await.unwrap();
        assert_eq!(health.table_count, 2);
    }

    #[tokio::test]
    async fn test_probe_reports_checked_out_connections() {
        let dir = tempfile::tempdir().unwrap();
        let pool = temp_pool(&dir);
        let _held = get_connection(&pool).unwrap();

        let health = SqliteDatabaseProbe::new(Arc::clone(&pool))
            .probe()
            .await
            .unwrap();
        // The pool may still be replenishing its idle connection.
        assert!(health.active_connections >= 1);
    }
}
