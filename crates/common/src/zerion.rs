use crate::config;
use crate::types::{TokenMeta, TrendingToken, WalletPnl, ZerionTx};
use anyhow::Context as _;
use base64::Engine as _;
use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Client for the Zerion portfolio-analytics API.
///
/// Every public method degrades instead of failing: transaction pages and
/// trending lists come back empty, PnL comes back `None`, token metadata
/// comes back zeroed. Callers treat all of those as "nothing new".
pub struct ZerionClient {
    http: reqwest::Client,
    api_url: String,
    auth_header: Option<String>,
    chains: Vec<String>,
    page_size: u32,
    pnl_max_retries: u32,
    pnl_retry_delay: Duration,
    trending_page_size: u32,
}

#[derive(Debug, Deserialize)]
struct TxListEnvelope {
    #[serde(default)]
    data: Vec<ZerionTx>,
}

#[derive(Debug, Deserialize)]
struct PnlEnvelope {
    data: Option<PnlData>,
    errors: Option<Vec<ApiError>>,
}

#[derive(Debug, Deserialize)]
struct PnlData {
    attributes: PnlAttributes,
}

#[derive(Debug, Deserialize)]
struct PnlAttributes {
    realized_gain: Option<f64>,
    unrealized_gain: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FungibleEnvelope {
    data: Option<FungibleData>,
}

#[derive(Debug, Deserialize)]
struct FungibleListEnvelope {
    #[serde(default)]
    data: Vec<FungibleData>,
}

#[derive(Debug, Deserialize)]
struct FungibleData {
    attributes: FungibleAttributes,
}

#[derive(Debug, Deserialize)]
struct FungibleAttributes {
    name: Option<String>,
    symbol: Option<String>,
    is_verified: Option<bool>,
    market_data: Option<MarketData>,
}

#[derive(Debug, Deserialize)]
struct MarketData {
    market_cap: Option<f64>,
    volume_24h: Option<f64>,
    changes: Option<MarketChanges>,
}

#[derive(Debug, Deserialize)]
struct MarketChanges {
    percent_1d: Option<f64>,
}

impl ZerionClient {
    pub fn new(cfg: &config::Zerion, api_key: Option<&str>) -> Self {
        // Zerion uses HTTP basic auth with the key as username, empty password.
        let auth_header = api_key.map(|key| {
            let encoded = base64::engine::general_purpose::STANDARD.encode(format!("{key}:"));
            format!("Basic {encoded}")
        });

        Self {
            http: reqwest::Client::new(),
            api_url: cfg.api_url.trim_end_matches('/').to_string(),
            auth_header,
            chains: cfg.chains.clone(),
            page_size: cfg.page_size,
            pnl_max_retries: cfg.pnl_max_retries,
            pnl_retry_delay: Duration::from_millis(cfg.pnl_retry_delay_ms),
            trending_page_size: cfg.trending_page_size,
        }
    }

    fn transactions_url(&self, address: &str) -> anyhow::Result<String> {
        let mut url = Url::parse(&format!("{}/wallets/{address}/transactions/", self.api_url))
            .context("zerion.api_url is not a valid absolute URL")?;
        {
            let mut qp = url.query_pairs_mut();
            qp.append_pair("page[size]", &self.page_size.to_string());
            qp.append_pair("filter[chain_ids]", &self.chains.join(","));
            qp.append_pair("sort", "-mined_at");
        }
        Ok(url.to_string())
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> anyhow::Result<T> {
        let mut req = self.http.get(url).header("accept", "application/json");
        if let Some(auth) = &self.auth_header {
            req = req.header("Authorization", auth.clone());
        }
        let body = req.send().await?.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Most-recent-first transaction page for a wallet, filtered to the
    /// configured chains. Empty on any network or parse failure.
    pub async fn fetch_transactions(&self, address: &str) -> Vec<ZerionTx> {
        let url = match self.transactions_url(address) {
            Ok(url) => url,
            Err(e) => {
                warn!(address, error = %e, "cannot build transactions URL");
                return Vec::new();
            }
        };
        match self.get_json::<TxListEnvelope>(&url).await {
            Ok(envelope) => envelope.data,
            Err(e) => {
                warn!(address, error = %e, "failed to fetch transaction history");
                Vec::new()
            }
        }
    }

    /// Lifetime PnL (realized + unrealized) for a wallet across all chains.
    ///
    /// Rate-limit responses get a bounded number of fixed-delay retries;
    /// anything else, or retry exhaustion, yields `None`.
    pub async fn get_lifetime_pnl(&self, address: &str) -> Option<WalletPnl> {
        let url = format!("{}/wallets/{address}/pnl", self.api_url);
        let mut attempts_left = self.pnl_max_retries;

        while attempts_left > 0 {
            let envelope = match self.get_json::<PnlEnvelope>(&url).await {
                Ok(envelope) => envelope,
                Err(e) => {
                    warn!(address, error = %e, "PnL lookup failed");
                    return None;
                }
            };

            if is_rate_limited(&envelope) {
                debug!(address, "PnL lookup throttled, retrying");
                tokio::time::sleep(self.pnl_retry_delay).await;
                attempts_left -= 1;
                continue;
            }

            let attr = envelope.data?.attributes;
            return Some(WalletPnl {
                total_usd: attr.realized_gain.unwrap_or(0.0) + attr.unrealized_gain.unwrap_or(0.0),
            });
        }

        None
    }

    /// Token metadata by Zerion composite id `{chain_id}:{address}`.
    /// Zeroed defaults on failure.
    pub async fn get_token_meta(&self, token_address: &str, chain_id: &str) -> TokenMeta {
        let url = format!("{}/fungibles/{chain_id}:{token_address}", self.api_url);
        match self.get_json::<FungibleEnvelope>(&url).await {
            Ok(envelope) => {
                let Some(attr) = envelope.data.map(|d| d.attributes) else {
                    return TokenMeta::default();
                };
                let market = attr.market_data;
                TokenMeta {
                    verified: attr.is_verified.unwrap_or(false),
                    market_cap: market
                        .as_ref()
                        .and_then(|m| m.market_cap)
                        .unwrap_or(0.0),
                    volume_24h: market
                        .as_ref()
                        .and_then(|m| m.volume_24h)
                        .unwrap_or(0.0),
                }
            }
            Err(e) => {
                warn!(token_address, chain_id, error = %e, "token metadata lookup failed");
                TokenMeta::default()
            }
        }
    }

    /// Top movers on a chain by 1-day price change. Empty on failure.
    pub async fn fetch_trending(&self, chain_id: &str) -> Vec<TrendingToken> {
        let mut url = match Url::parse(&format!("{}/fungibles/", self.api_url)) {
            Ok(url) => url,
            Err(_) => return Vec::new(),
        };
        {
            let mut qp = url.query_pairs_mut();
            qp.append_pair("filter[implementation_chain_id]", chain_id);
            qp.append_pair("sort", "-market_data.price.percent_change_1d");
            qp.append_pair("page[size]", &self.trending_page_size.to_string());
        }

        match self.get_json::<FungibleListEnvelope>(url.as_str()).await {
            Ok(envelope) => envelope
                .data
                .into_iter()
                .map(|d| TrendingToken {
                    symbol: d.attributes.symbol.unwrap_or_else(|| "UNKNOWN".to_string()),
                    name: d.attributes.name.unwrap_or_default(),
                    price_change_1d: d
                        .attributes
                        .market_data
                        .and_then(|m| m.changes)
                        .and_then(|c| c.percent_1d)
                        .unwrap_or(0.0),
                })
                .collect(),
            Err(e) => {
                warn!(chain_id, error = %e, "trending lookup failed");
                Vec::new()
            }
        }
    }
}

fn is_rate_limited(envelope: &PnlEnvelope) -> bool {
    envelope
        .errors
        .as_ref()
        .and_then(|errs| errs.first())
        .and_then(|e| e.title.as_deref())
        == Some("Too many requests")
}
