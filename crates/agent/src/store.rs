use anyhow::Result;
use common::db::AgentDb;
use tracing::warn;

use crate::watermark::Watermark;

/// One tracked wallet row, as the mirror phase consumes it.
#[derive(Debug, Clone)]
pub struct WatchedWallet {
    pub id: i64,
    pub address: String,
    pub label: String,
    pub watermark: Watermark,
    pub cumulative_pnl: f64,
}

pub async fn load_watched_wallets(db: &AgentDb) -> Result<Vec<WatchedWallet>> {
    db.call(|conn| {
        let mut stmt = conn.prepare(
            "SELECT id, address, label, last_seen_timestamp, cumulative_pnl
             FROM watched_wallets ORDER BY id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(WatchedWallet {
                    id: row.get(0)?,
                    address: row.get(1)?,
                    label: row.get(2)?,
                    watermark: Watermark {
                        timestamp_ms: row.get(3)?,
                    },
                    cumulative_pnl: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
    .await
}

pub async fn wallet_exists(db: &AgentDb, address: &str) -> Result<bool> {
    let address = address.to_string();
    db.call(move |conn| {
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM watched_wallets WHERE address = ?1)",
            [address],
            |row| row.get(0),
        )
    })
    .await
}

/// Admit a newly discovered wallet. Returns false when the address was
/// already tracked, which is not an error.
pub async fn admit_wallet(
    db: &AgentDb,
    address: &str,
    label: &str,
    pnl_usd: f64,
    discovered_via: &str,
) -> Result<bool> {
    let (address, label, via) = (address.to_string(), label.to_string(), discovered_via.to_string());
    let inserted = db
        .call(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO watched_wallets (address, label, cumulative_pnl, discovered_via)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![address, label, pnl_usd, via],
            )
        })
        .await?;
    Ok(inserted > 0)
}

/// Persist the feed high-water mark after a wallet's page was processed.
/// Monotone: a timestamp at or below the stored mark is a no-op, so a
/// stale or degraded page can never reopen already-processed activity.
pub async fn advance_watermark(
    db: &AgentDb,
    wallet_id: i64,
    timestamp_ms: i64,
    tx_hash: Option<String>,
) -> Result<()> {
    db.call(move |conn| {
        conn.execute(
            "UPDATE watched_wallets
             SET last_seen_timestamp = ?2,
                 last_seen_tx = COALESCE(?3, last_seen_tx),
                 updated_at = CURRENT_TIMESTAMP
             WHERE id = ?1 AND last_seen_timestamp < ?2",
            rusqlite::params![wallet_id, timestamp_ms, tx_hash],
        )?;
        Ok(())
    })
    .await
}

pub async fn update_wallet_pnl(db: &AgentDb, wallet_id: i64, pnl_usd: f64) -> Result<()> {
    db.call(move |conn| {
        conn.execute(
            "UPDATE watched_wallets
             SET cumulative_pnl = ?2, updated_at = CURRENT_TIMESTAMP
             WHERE id = ?1",
            rusqlite::params![wallet_id, pnl_usd],
        )?;
        Ok(())
    })
    .await
}

/// Labels of the `n` most profitable tracked wallets, best first.
pub async fn top_wallets_by_pnl(db: &AgentDb, n: usize) -> Result<Vec<(String, f64)>> {
    db.call(move |conn| {
        let mut stmt = conn.prepare(
            "SELECT label, cumulative_pnl FROM watched_wallets
             ORDER BY cumulative_pnl DESC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map([n as i64], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
    .await
}

#[allow(clippy::too_many_arguments)]
pub async fn insert_replicated_trade(
    db: &AgentDb,
    trader: &str,
    token: &str,
    side: &str,
    tx_hash: &str,
    chain: &str,
    timestamp_ms: i64,
) -> Result<()> {
    let row = (
        trader.to_string(),
        token.to_string(),
        side.to_string(),
        tx_hash.to_string(),
        chain.to_string(),
    );
    db.call(move |conn| {
        conn.execute(
            "INSERT INTO replicated_trades (trader, token, side, tx_hash, chain, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![row.0, row.1, row.2, row.3, row.4, timestamp_ms],
        )?;
        Ok(())
    })
    .await
}

pub async fn count_replicated_trades(db: &AgentDb) -> Result<i64> {
    db.call(|conn| conn.query_row("SELECT COUNT(*) FROM replicated_trades", [], |row| row.get(0)))
        .await
}

pub async fn is_notification_processed(db: &AgentDb, notification_id: &str) -> Result<bool> {
    let id = notification_id.to_string();
    db.call(move |conn| {
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM processed_notifications WHERE notification_id = ?1)",
            [id],
            |row| row.get(0),
        )
    })
    .await
}

/// Idempotent: marking twice is a no-op, never an error.
pub async fn mark_notification_processed(db: &AgentDb, notification_id: &str) -> Result<()> {
    let id = notification_id.to_string();
    db.call(move |conn| {
        conn.execute(
            "INSERT OR IGNORE INTO processed_notifications (notification_id) VALUES (?1)",
            [id],
        )?;
        Ok(())
    })
    .await
}

/// Millisecond timestamp stored under a metric key, 0 when unset.
pub async fn metric_timestamp(db: &AgentDb, key: &str) -> Result<i64> {
    let key = key.to_string();
    db.call(move |conn| {
        conn.query_row(
            "SELECT COALESCE(MAX(value_timestamp), 0) FROM agent_metrics WHERE key = ?1",
            [key],
            |row| row.get(0),
        )
    })
    .await
}

pub async fn upsert_metric(db: &AgentDb, key: &str, value: f64, timestamp_ms: i64) -> Result<()> {
    let key = key.to_string();
    db.call(move |conn| {
        conn.execute(
            "INSERT INTO agent_metrics (key, value_numeric, value_timestamp)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
                 value_numeric = excluded.value_numeric,
                 value_timestamp = excluded.value_timestamp",
            rusqlite::params![key, value, timestamp_ms],
        )?;
        Ok(())
    })
    .await
}

/// Append to the activity log. Best effort; a failed insert is logged
/// and swallowed so it can never fail a cycle phase.
pub async fn log_intel(db: &AgentDb, text: &str) {
    let entry = text.to_string();
    let result = db
        .call(move |conn| {
            conn.execute("INSERT INTO intel_log (text) VALUES (?1)", [entry])?;
            Ok(())
        })
        .await;
    if let Err(e) = result {
        warn!(error = %e, "failed to append intel log entry");
    }
}
