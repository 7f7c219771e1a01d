//! Full-cycle behavior against stub feeds and an in-memory database.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use agent::execution::Dispatcher;
use agent::feeds::{AnalyticsFeed, SocialFeed};
use agent::orchestrator::Orchestrator;
use common::config::{Config, Secrets};
use common::db::AgentDb;
use common::types::{CastLead, Mention, PostReceipt, TokenMeta, TrendingToken, WalletPnl, ZerionTx};

#[derive(Default, Clone)]
struct StubAnalytics {
    pages: HashMap<String, Vec<ZerionTx>>,
    pnl: HashMap<String, f64>,
}

impl AnalyticsFeed for StubAnalytics {
    async fn fetch_transactions(&self, address: &str) -> Vec<ZerionTx> {
        self.pages.get(address).cloned().unwrap_or_default()
    }

    async fn lifetime_pnl(&self, address: &str) -> Option<WalletPnl> {
        self.pnl.get(address).map(|v| WalletPnl { total_usd: *v })
    }

    async fn trending(&self, _chain_id: &str) -> Vec<TrendingToken> {
        Vec::new()
    }

    async fn token_meta(&self, _token_address: &str, _chain_id: &str) -> TokenMeta {
        TokenMeta::default()
    }
}

type PostLog = Arc<Mutex<Vec<(String, Option<String>)>>>;

#[derive(Default, Clone)]
struct StubSocial {
    mentions: Vec<Mention>,
    leads: Vec<CastLead>,
    posts: PostLog,
}

impl SocialFeed for StubSocial {
    async fn fetch_mentions(&self, _fid: &str, _limit: u32) -> Vec<Mention> {
        self.mentions.clone()
    }

    async fn search_casts(&self, _query: &str, _limit: u32) -> Vec<CastLead> {
        self.leads.clone()
    }

    async fn post_cast(&self, _signer: &str, text: &str, parent: Option<&str>) -> PostReceipt {
        self.posts
            .lock()
            .unwrap()
            .push((text.to_string(), parent.map(str::to_string)));
        PostReceipt {
            success: true,
            id: Some("0xposted".to_string()),
        }
    }
}

fn test_config() -> Config {
    Config::from_toml_str(include_str!("../../../config/default.toml")).unwrap()
}

fn signed_secrets() -> Secrets {
    Secrets {
        evm_private_key: Some("0xdeadbeef".to_string()),
        ..Secrets::default()
    }
}

fn feed_tx(hash: &str, op: &str, mined_at: &str, in_sym: &str, out_sym: &str) -> ZerionTx {
    let transfers: Vec<serde_json::Value> = [("in", in_sym), ("out", out_sym)]
        .iter()
        .filter(|(_, sym)| !sym.is_empty())
        .map(|(dir, sym)| {
            serde_json::json!({
                "direction": dir,
                "fungible_info": {
                    "symbol": sym,
                    "implementations": [{"address": format!("0x{}", sym.to_lowercase()), "chain_id": "base"}]
                }
            })
        })
        .collect();
    serde_json::from_value(serde_json::json!({
        "attributes": {
            "hash": hash,
            "operation_type": op,
            "status": "confirmed",
            "mined_at": mined_at,
            "transfers": transfers,
        },
        "relationships": {"chain": {"data": {"id": "base"}}},
    }))
    .unwrap()
}

fn untimed_feed_tx(hash: &str, op: &str, in_sym: &str) -> ZerionTx {
    serde_json::from_value(serde_json::json!({
        "attributes": {
            "hash": hash,
            "operation_type": op,
            "status": "confirmed",
            "transfers": [{
                "direction": "in",
                "fungible_info": {
                    "symbol": in_sym,
                    "implementations": [{"address": format!("0x{}", in_sym.to_lowercase()), "chain_id": "base"}]
                }
            }],
        },
        "relationships": {"chain": {"data": {"id": "base"}}},
    }))
    .unwrap()
}

async fn seed_wallet(db: &AgentDb, address: &str, label: &str) {
    let (address, label) = (address.to_string(), label.to_string());
    db.call(move |conn| {
        conn.execute(
            "INSERT INTO watched_wallets (address, label) VALUES (?1, ?2)",
            [address, label],
        )?;
        Ok(())
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_cold_start_mirrors_newest_trade_once() {
    let db = Arc::new(AgentDb::open_memory().await.unwrap());
    seed_wallet(&db, "0xwhale", "whale_one").await;

    // Most-recent-first page: a SELL trade on top, noise below it.
    let page = vec![
        feed_tx("0xt2", "trade", "2026-08-01T12:00:00Z", "USDC", "DEGEN"),
        feed_tx("0xt1", "receive", "2026-08-01T10:00:00Z", "ETH", ""),
    ];
    let mut analytics = StubAnalytics::default();
    analytics.pages.insert("0xwhale".to_string(), page);

    let config = test_config();
    assert!(config.execution.simulation_mode);
    let executor = Dispatcher::new(&config, signed_secrets());
    let orchestrator = Orchestrator::new(
        Arc::clone(&db),
        config,
        analytics,
        StubSocial::default(),
        executor,
        None,
        None,
    );

    orchestrator.run_cycle().await;

    let rows: Vec<(String, String, String)> = db
        .call(|conn| {
            let mut stmt =
                conn.prepare("SELECT side, token, tx_hash FROM replicated_trades")?;
            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].0, "SELL");
    assert_eq!(rows[0].1, "0xdegen");
    assert!(rows[0].2.starts_with("0x_sim_"));

    let watermark: i64 = db
        .call(|conn| {
            conn.query_row(
                "SELECT last_seen_timestamp FROM watched_wallets WHERE address = '0xwhale'",
                [],
                |row| row.get(0),
            )
        })
        .await
        .unwrap();
    assert_eq!(watermark, 1_785_585_600_000);

    // Same page again: nothing is newer than the watermark.
    orchestrator.run_cycle().await;
    assert_eq!(agent::store::count_replicated_trades(&db).await.unwrap(), 1);
}

#[tokio::test]
async fn test_untimed_page_head_keeps_watermark_and_trade_unique() {
    let db = Arc::new(AgentDb::open_memory().await.unwrap());
    seed_wallet(&db, "0xwhale", "whale_one").await;

    // Newest page entry has no settlement time; the trade below it must
    // mirror exactly once across cycles, not once per cycle.
    let page = vec![
        untimed_feed_tx("0xt3", "receive", "ETH"),
        feed_tx("0xt2", "trade", "2026-08-01T12:00:00Z", "USDC", "DEGEN"),
    ];
    let mut analytics = StubAnalytics::default();
    analytics.pages.insert("0xwhale".to_string(), page);

    let config = test_config();
    let executor = Dispatcher::new(&config, signed_secrets());
    let orchestrator = Orchestrator::new(
        Arc::clone(&db),
        config,
        analytics,
        StubSocial::default(),
        executor,
        None,
        None,
    );

    orchestrator.run_cycle().await;
    orchestrator.run_cycle().await;

    assert_eq!(agent::store::count_replicated_trades(&db).await.unwrap(), 1);

    let watermark: i64 = db
        .call(|conn| {
            conn.query_row(
                "SELECT last_seen_timestamp FROM watched_wallets WHERE address = '0xwhale'",
                [],
                |row| row.get(0),
            )
        })
        .await
        .unwrap();
    assert_eq!(watermark, 1_785_585_600_000);
}

#[tokio::test]
async fn test_mention_audited_and_replied_once() {
    let db = Arc::new(AgentDb::open_memory().await.unwrap());

    let mut analytics = StubAnalytics::default();
    analytics.pnl.insert("0xdave".to_string(), -500.0);

    let social = StubSocial {
        mentions: vec![
            Mention {
                hash: "0xcast1".to_string(),
                author: "degen_dave".to_string(),
                address: Some("0xdave".to_string()),
                text: "@zer audit me".to_string(),
            },
            Mention {
                hash: "0xcast2".to_string(),
                author: "no_wallet_guy".to_string(),
                address: None,
                text: "gm".to_string(),
            },
        ],
        ..StubSocial::default()
    };
    let posts = Arc::clone(&social.posts);

    let config = test_config();
    let executor = Dispatcher::new(&config, signed_secrets());
    let orchestrator = Orchestrator::new(
        Arc::clone(&db),
        config,
        analytics,
        social,
        executor,
        Some("777".to_string()),
        Some("signer-uuid".to_string()),
    );

    orchestrator.run_cycle().await;
    orchestrator.run_cycle().await;

    let replies: Vec<(String, Option<String>)> = posts
        .lock()
        .unwrap()
        .iter()
        .filter(|(_, parent)| parent.is_some())
        .cloned()
        .collect();
    assert_eq!(replies.len(), 1, "one reply across both cycles");
    assert_eq!(replies[0].1.as_deref(), Some("0xcast1"));
    assert!(replies[0].0.starts_with("@degen_dave"));
    assert!(replies[0].0.contains("Zer Score: 23.0/100"));
    assert!(replies[0].0.contains("NEEDS GROWTH"));

    // Both mentions are marked processed, replied or not.
    let processed: i64 = db
        .call(|conn| {
            conn.query_row("SELECT COUNT(*) FROM processed_notifications", [], |r| {
                r.get(0)
            })
        })
        .await
        .unwrap();
    assert_eq!(processed, 2);
}

#[tokio::test]
async fn test_discovery_admits_profitable_wallet_once() {
    let db = Arc::new(AgentDb::open_memory().await.unwrap());

    let mut analytics = StubAnalytics::default();
    analytics.pnl.insert("0xalpha".to_string(), 6000.0);
    analytics.pnl.insert("0xpoor".to_string(), 100.0);

    // The same profitable address surfaces twice per keyword search.
    let social = StubSocial {
        leads: vec![
            CastLead {
                author: "alpha_hunter".to_string(),
                address: Some("0xalpha".to_string()),
                text: "Base profit all week".to_string(),
            },
            CastLead {
                author: String::new(),
                address: Some("0xalpha".to_string()),
                text: "reposting the alpha".to_string(),
            },
            CastLead {
                author: "small_timer".to_string(),
                address: Some("0xpoor".to_string()),
                text: "Base profit soon".to_string(),
            },
            CastLead {
                author: "lurker".to_string(),
                address: None,
                text: "no wallet here".to_string(),
            },
        ],
        ..StubSocial::default()
    };

    let config = test_config();
    assert!(config.discovery.keywords.len() > 1);
    let executor = Dispatcher::new(&config, signed_secrets());
    let orchestrator = Orchestrator::new(
        Arc::clone(&db),
        config,
        analytics,
        social,
        executor,
        None,
        None,
    );

    orchestrator.run_cycle().await;
    orchestrator.run_cycle().await;

    let rows: Vec<(String, String, f64, String)> = db
        .call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT address, label, cumulative_pnl, discovered_via FROM watched_wallets",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .unwrap();

    assert_eq!(rows.len(), 1, "admitted once across hits, keywords, cycles");
    assert_eq!(rows[0].0, "0xalpha");
    assert_eq!(rows[0].1, "alpha_hunter");
    assert!((rows[0].2 - 6000.0).abs() < 1e-9);
    assert_eq!(rows[0].3, "keyword_search");
}
