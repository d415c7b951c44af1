use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::AlertError;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS alerts (
    alert_id TEXT PRIMARY KEY NOT NULL,
    email TEXT NOT NULL,
    stock_symbol TEXT NOT NULL,
    price_point TEXT NOT NULL,
    comparison_mode TEXT NOT NULL,
    alert_status TEXT NOT NULL DEFAULT 'active',
    current_price REAL,
    created_at TEXT NOT NULL,
    triggered_at TEXT,
    trigger_price REAL
);
CREATE INDEX IF NOT EXISTS idx_alerts_status ON alerts(alert_status);
CREATE INDEX IF NOT EXISTS idx_alerts_symbol ON alerts(stock_symbol)
"#;

#[derive(Clone)]
pub struct AlertDb {
    pool: SqlitePool,
}

impl AlertDb {
    /// Open (or create) the alert database and make sure the schema exists.
    pub async fn new(database_url: &str) -> Result<Self, AlertError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        // An in-memory database lives and dies with its single connection
        let pool_options = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let pool = pool_options.connect_with(options).await?;

        let db = Self { pool };
        db.init_schema().await?;
        tracing::debug!("Alert database ready at {}", database_url);

        Ok(db)
    }

    async fn init_schema(&self) -> Result<(), AlertError> {
        for statement in SCHEMA.split(';') {
            let stmt = statement.trim();
            if !stmt.is_empty() {
                sqlx::query(stmt).execute(&self.pool).await?;
            }
        }
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_db_creation_is_idempotent() {
        let db = AlertDb::new("sqlite::memory:").await.unwrap();
        db.init_schema().await.unwrap();
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM alerts")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
