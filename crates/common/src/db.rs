use anyhow::{Context, Result};
use tokio_rusqlite::Connection;
use tracing::info;

/// Async wrapper around the agent's SQLite database.
///
/// Runs all SQLite operations on a dedicated background thread via
/// `tokio_rusqlite`, keeping the Tokio runtime cooperative. The agent is
/// single-threaded but other processes (admin sqlite3 sessions, deploy
/// checks) can hold the file lock, hence WAL + busy_timeout.
pub struct AgentDb {
    conn: Connection,
}

impl AgentDb {
    pub async fn open(path: &str) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create DB directory: {}", parent.display())
                })?;
            }
        }

        let conn = Connection::open(path)
            .await
            .with_context(|| format!("failed to open agent DB: {path}"))?;

        conn.call(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;",
            )?;
            Ok::<_, rusqlite::Error>(())
        })
        .await
        .map_err(|e| anyhow::anyhow!("failed to set DB pragmas: {e}"))?;

        let db = Self { conn };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub async fn open_memory() -> Result<Self> {
        let conn = Connection::open(":memory:")
            .await
            .context("failed to open in-memory DB")?;

        conn.call(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            Ok::<_, rusqlite::Error>(())
        })
        .await
        .map_err(|e| anyhow::anyhow!("failed to set pragmas: {e}"))?;

        let db = Self { conn };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Execute a closure on the database connection.
    /// The closure receives `&mut rusqlite::Connection`.
    pub async fn call<F, R>(&self, function: F) -> Result<R>
    where
        F: FnOnce(&mut rusqlite::Connection) -> Result<R, rusqlite::Error> + Send + 'static,
        R: Send + 'static,
    {
        self.conn
            .call(function)
            .await
            .map_err(|e| anyhow::anyhow!("DB call failed: {e}"))
    }

    async fn run_migrations(&self) -> Result<()> {
        self.conn
            .call(|conn| {
                run_migrations_sync(conn)?;
                Ok::<_, rusqlite::Error>(())
            })
            .await
            .map_err(|e| anyhow::anyhow!("failed to run agent DB migrations: {e}"))?;
        info!("agent DB migrations complete");
        Ok(())
    }
}

fn run_migrations_sync(conn: &mut rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER NOT NULL
        );",
    )?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    let migrations: Vec<(&str, &str)> = vec![("001", include_str!("../migrations/001_initial.sql"))];

    for (i, (_name, sql)) in migrations.iter().enumerate() {
        let version = (i + 1) as i64;
        if version > current_version {
            conn.execute_batch(sql)?;
            conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                [version],
            )?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_memory_db_creates_tables() {
        let db = AgentDb::open_memory().await.unwrap();

        let tables: Vec<String> = db
            .call(|conn| {
                let mut stmt = conn
                    .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")?;
                let rows = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(rows)
            })
            .await
            .unwrap();

        assert!(tables.contains(&"watched_wallets".to_string()));
        assert!(tables.contains(&"replicated_trades".to_string()));
        assert!(tables.contains(&"processed_notifications".to_string()));
        assert!(tables.contains(&"agent_metrics".to_string()));
        assert!(tables.contains(&"intel_log".to_string()));
    }

    #[tokio::test]
    async fn test_migrations_idempotent() {
        let db = AgentDb::open_memory().await.unwrap();

        db.call(|conn| {
            run_migrations_sync(conn)?;
            Ok::<_, rusqlite::Error>(())
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_processed_notifications_insert_or_ignore() {
        let db = AgentDb::open_memory().await.unwrap();

        for _ in 0..2 {
            db.call(|conn| {
                conn.execute(
                    "INSERT OR IGNORE INTO processed_notifications (notification_id) VALUES ('0xabc')",
                    [],
                )?;
                Ok(())
            })
            .await
            .unwrap();
        }

        let count: i64 = db
            .call(|conn| {
                conn.query_row("SELECT COUNT(*) FROM processed_notifications", [], |row| {
                    row.get(0)
                })
            })
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_watched_wallets_unique_address() {
        let db = AgentDb::open_memory().await.unwrap();

        db.call(|conn| {
            conn.execute(
                "INSERT INTO watched_wallets (address, label) VALUES ('0xwhale', 'whale_one')",
                [],
            )?;
            let dup = conn.execute(
                "INSERT OR IGNORE INTO watched_wallets (address, label) VALUES ('0xwhale', 'whale_two')",
                [],
            )?;
            assert_eq!(dup, 0);
            Ok(())
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_open_file_db() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("agent.db");
        let db = AgentDb::open(path.to_str().unwrap()).await.unwrap();

        let count: i64 = db
            .call(|conn| {
                conn.query_row("SELECT COUNT(*) FROM watched_wallets", [], |row| row.get(0))
            })
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
