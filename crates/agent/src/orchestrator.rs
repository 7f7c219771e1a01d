use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use common::config::Config;
use common::db::AgentDb;
use tracing::{debug, error, info, warn};

use crate::auditor::AuditReport;
use crate::classifier::{self, ClassifierRules};
use crate::execution::ExecutionOutcome;
use crate::feeds::{AnalyticsFeed, SocialFeed, TradeExecutor};
use crate::store;
use crate::watermark;

/// Lifetime PnL a discovered wallet must clear before it is tracked.
const DISCOVERY_MIN_PNL_USD: f64 = 5000.0;

const LAST_STATUS_POST_KEY: &str = "last_status_post";
const LAST_CHECK_KEY: &str = "last_check";

/// Drives the fixed-order scan cycle. Generic over the three external
/// seams so cycle behavior is testable against canned feeds.
pub struct Orchestrator<A, S, E> {
    db: Arc<AgentDb>,
    config: Config,
    rules: ClassifierRules,
    analytics: A,
    social: S,
    executor: E,
    fid: Option<String>,
    signer_uuid: Option<String>,
}

impl<A, S, E> Orchestrator<A, S, E>
where
    A: AnalyticsFeed,
    S: SocialFeed,
    E: TradeExecutor,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db: Arc<AgentDb>,
        config: Config,
        analytics: A,
        social: S,
        executor: E,
        fid: Option<String>,
        signer_uuid: Option<String>,
    ) -> Self {
        let rules = ClassifierRules::from_config(&config.classifier);
        Self {
            db,
            config,
            rules,
            analytics,
            social,
            executor,
            fid,
            signer_uuid,
        }
    }

    /// Cycle forever with a fixed sleep between runs. Individual cycle
    /// failures never escape.
    pub async fn run(&self) {
        let interval = Duration::from_secs(self.config.general.cycle_interval_secs);
        loop {
            self.run_cycle().await;
            tokio::time::sleep(interval).await;
        }
    }

    /// One full scan cycle. Every phase is independently guarded; a
    /// failing phase is logged and the next one still runs.
    pub async fn run_cycle(&self) {
        metrics::counter!("agent_cycles_total").increment(1);
        let started = std::time::Instant::now();
        info!("cycle started");

        if let Err(e) = self.market_pulse().await {
            error!(phase = "market_pulse", error = %e, "cycle phase failed");
        }
        if let Err(e) = self.refresh_wallet_pnl().await {
            error!(phase = "pnl_refresh", error = %e, "cycle phase failed");
        }
        if let Err(e) = self.handle_mentions().await {
            error!(phase = "mentions", error = %e, "cycle phase failed");
        }
        if let Err(e) = self.mirror_watched_wallets().await {
            error!(phase = "mirror", error = %e, "cycle phase failed");
        }
        if let Err(e) = self.discover_wallets().await {
            error!(phase = "discovery", error = %e, "cycle phase failed");
        }
        if let Err(e) = self.broadcast_status().await {
            error!(phase = "broadcast", error = %e, "cycle phase failed");
        }

        if let Err(e) = store::upsert_metric(
            &self.db,
            LAST_CHECK_KEY,
            1.0,
            Utc::now().timestamp_millis(),
        )
        .await
        {
            warn!(error = %e, "failed to record cycle heartbeat");
        }

        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "cycle complete"
        );
    }

    /// Best-effort market refresh: top movers per configured chain,
    /// logged to the intel feed.
    async fn market_pulse(&self) -> anyhow::Result<()> {
        for chain in &self.config.zerion.chains {
            let tokens = self.analytics.trending(chain).await;
            let Some(leader) = tokens.first() else {
                debug!(chain, "no trending data");
                continue;
            };
            info!(
                chain,
                leader = %leader.symbol,
                change_1d = leader.price_change_1d,
                movers = tokens.len(),
                "market pulse"
            );
            store::log_intel(
                &self.db,
                &format!(
                    "Market pulse [{chain}]: {} {:+.1}% leads {} movers",
                    leader.symbol,
                    leader.price_change_1d,
                    tokens.len()
                ),
            )
            .await;
        }
        Ok(())
    }

    async fn refresh_wallet_pnl(&self) -> anyhow::Result<()> {
        for wallet in store::load_watched_wallets(&self.db).await? {
            let Some(pnl) = self.analytics.lifetime_pnl(&wallet.address).await else {
                continue;
            };
            if let Err(e) = store::update_wallet_pnl(&self.db, wallet.id, pnl.total_usd).await {
                warn!(wallet = %wallet.address, error = %e, "failed to persist PnL");
            }
        }
        Ok(())
    }

    /// Reply to unprocessed mentions with a wallet audit. Every mention
    /// is marked processed exactly once, whether or not a reply went out.
    async fn handle_mentions(&self) -> anyhow::Result<()> {
        let Some(fid) = self.fid.as_deref() else {
            debug!("no agent fid configured, skipping mentions");
            return Ok(());
        };

        let mentions = self
            .social
            .fetch_mentions(fid, self.config.neynar.mention_limit)
            .await;

        for mention in mentions {
            if store::is_notification_processed(&self.db, &mention.hash).await? {
                continue;
            }

            if let Some(address) = mention.address.as_deref() {
                let report = AuditReport::from_pnl(self.analytics.lifetime_pnl(address).await);
                info!(
                    author = %mention.author,
                    wallet = address,
                    score = report.score,
                    standing = %report.standing,
                    "mention audited"
                );

                if let Some(signer) = self.signer_uuid.as_deref() {
                    let receipt = self
                        .social
                        .post_cast(signer, &report.reply_text(&mention.author), Some(&mention.hash))
                        .await;
                    if receipt.success {
                        metrics::counter!("agent_mentions_replied_total").increment(1);
                    } else {
                        warn!(author = %mention.author, "audit reply did not post");
                    }
                }

                store::log_intel(
                    &self.db,
                    &format!(
                        "Audited @{} ({address}): score {:.1}, {}",
                        mention.author, report.score, report.standing
                    ),
                )
                .await;
            }

            store::mark_notification_processed(&self.db, &mention.hash).await?;
        }
        Ok(())
    }

    /// The core loop: scan each watched wallet's feed, replicate the
    /// newest unseen trade, advance the feed watermark.
    async fn mirror_watched_wallets(&self) -> anyhow::Result<()> {
        let wallets = store::load_watched_wallets(&self.db).await?;
        metrics::gauge!("agent_watched_wallets").set(wallets.len() as f64);

        for wallet in wallets {
            let txs = self.analytics.fetch_transactions(&wallet.address).await;
            let signals = classifier::classify_page(&txs, &self.rules);
            metrics::counter!("agent_signals_classified_total").increment(signals.len() as u64);

            let Some((page_ts, page_hash)) = watermark::page_watermark(&signals) else {
                continue;
            };
            let page_hash = page_hash.map(str::to_string);

            let fresh = watermark::select_new(&signals, wallet.watermark);
            // At most one replicated trade per wallet per cycle: the
            // newest qualifying signal wins, older ones are superseded.
            let candidate = fresh
                .into_iter()
                .find(|s| s.is_trade && s.token_address.is_some());

            if let Some(signal) = candidate {
                self.replicate(&wallet.address, &wallet.label, signal).await?;
            }

            store::advance_watermark(&self.db, wallet.id, page_ts, page_hash).await?;
        }
        Ok(())
    }

    async fn replicate(
        &self,
        trader: &str,
        label: &str,
        signal: &classifier::Signal,
    ) -> anyhow::Result<()> {
        let token = signal.token_address.clone().unwrap_or_default();
        let chain = signal.chain_id.as_deref().unwrap_or("unknown");

        // Screening only; an unverified token is logged, not blocked.
        let meta = self.analytics.token_meta(&token, chain).await;
        info!(
            token = %signal.symbol,
            verified = meta.verified,
            market_cap = meta.market_cap,
            volume_24h = meta.volume_24h,
            "token screen"
        );

        info!(
            trader,
            label,
            chain,
            side = %signal.side,
            token = %signal.symbol,
            "mirroring trade"
        );

        let outcome = self.executor.dispatch(signal).await;
        match outcome {
            ExecutionOutcome::Settled { tx_hash } => {
                metrics::counter!("agent_mirror_dispatch_total", "outcome" => "settled")
                    .increment(1);
                store::insert_replicated_trade(
                    &self.db,
                    trader,
                    &token,
                    signal.side.as_str(),
                    &tx_hash,
                    chain,
                    Utc::now().timestamp_millis(),
                )
                .await?;
                store::log_intel(
                    &self.db,
                    &format!(
                        "Mirrored {} {} from {label} on {chain}: {tx_hash}",
                        signal.side, signal.symbol
                    ),
                )
                .await;
            }
            ExecutionOutcome::Skipped { reason } => {
                metrics::counter!("agent_mirror_dispatch_total", "outcome" => "skipped")
                    .increment(1);
                info!(trader, reason = %reason, "mirror skipped");
            }
            ExecutionOutcome::Failed { reason } => {
                metrics::counter!("agent_mirror_dispatch_total", "outcome" => "failed")
                    .increment(1);
                warn!(trader, reason = %reason, "mirror failed");
            }
        }
        Ok(())
    }

    /// Keyword search for traders worth tracking. A wallet is admitted
    /// once per address no matter how many casts surface it.
    async fn discover_wallets(&self) -> anyhow::Result<()> {
        let mut seen: HashSet<String> = HashSet::new();

        for keyword in &self.config.discovery.keywords {
            let leads = self
                .social
                .search_casts(keyword, self.config.neynar.search_limit)
                .await;

            for lead in leads {
                let Some(address) = lead.address else { continue };
                if !seen.insert(address.clone()) {
                    continue;
                }
                if store::wallet_exists(&self.db, &address).await? {
                    continue;
                }

                let report = AuditReport::from_pnl(self.analytics.lifetime_pnl(&address).await);
                if report.pnl_usd <= DISCOVERY_MIN_PNL_USD {
                    debug!(wallet = %address, pnl = report.pnl_usd, "lead below admission bar");
                    continue;
                }

                let label = if lead.author.is_empty() {
                    address.chars().take(10).collect()
                } else {
                    lead.author.clone()
                };
                if store::admit_wallet(&self.db, &address, &label, report.pnl_usd, "keyword_search")
                    .await?
                {
                    metrics::counter!("agent_wallets_discovered_total").increment(1);
                    info!(wallet = %address, label = %label, pnl = report.pnl_usd, keyword, "wallet admitted");
                    store::log_intel(
                        &self.db,
                        &format!("Now tracking {label} ({address}), PnL ${:.0}", report.pnl_usd),
                    )
                    .await;
                }
            }
        }
        Ok(())
    }

    /// Periodic public report of the most profitable tracked wallets.
    async fn broadcast_status(&self) -> anyhow::Result<()> {
        let Some(signer) = self.signer_uuid.as_deref() else {
            return Ok(());
        };

        let now_ms = Utc::now().timestamp_millis();
        let last_post = store::metric_timestamp(&self.db, LAST_STATUS_POST_KEY).await?;
        let interval_ms = self.config.broadcast.interval_secs as i64 * 1000;
        if now_ms - last_post < interval_ms {
            return Ok(());
        }

        let top = store::top_wallets_by_pnl(&self.db, self.config.broadcast.top_n).await?;
        if top.is_empty() {
            debug!("no ranked wallets yet, broadcast skipped");
            return Ok(());
        }

        let receipt = self
            .social
            .post_cast(signer, &broadcast_text(&top), None)
            .await;
        if receipt.success {
            store::upsert_metric(&self.db, LAST_STATUS_POST_KEY, 1.0, now_ms).await?;
            info!(wallets = top.len(), "status broadcast posted");
        } else {
            warn!("status broadcast did not post");
        }
        Ok(())
    }
}

fn broadcast_text(top: &[(String, f64)]) -> String {
    let mut text = String::from("Live alpha report. Top tracked wallets by lifetime PnL:\n");
    for (rank, (label, pnl)) in top.iter().enumerate() {
        text.push_str(&format!("{}. {label}: ${pnl:.0}\n", rank + 1));
    }
    text.push_str("Every qualifying move gets mirrored.");
    text
}
