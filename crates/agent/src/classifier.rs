use common::config;
use common::types::{Side, ZerionTransfer, ZerionTx};

/// Assets whose receipt marks a trade as a SELL: the wallet exited a
/// position into base currency. Fixed set, not configuration.
const BASE_ASSETS: [&str; 7] = ["ETH", "SOL", "MATIC", "WETH", "USDC", "USDT", "DAI"];

pub const UNKNOWN_SYMBOL: &str = "UNKNOWN";

/// One raw feed transaction, classified. Derived fresh each cycle and
/// never persisted; only its consequences (replicated trade row,
/// watermark advancement) are.
#[derive(Debug, Clone)]
pub struct Signal {
    pub hash: Option<String>,
    pub chain_id: Option<String>,
    /// Settlement time in unix milliseconds, 0 when the feed omits it.
    pub timestamp_ms: i64,
    pub side: Side,
    pub token_address: Option<String>,
    pub symbol: String,
    pub is_trade: bool,
    /// Raw operation type from the feed, kept for the activity log.
    pub operation: String,
}

/// Detection rules, resolved once from configuration.
#[derive(Debug, Clone)]
pub struct ClassifierRules {
    trade_operations: Vec<String>,
    execute_dapp_allowlist: Vec<String>,
}

impl ClassifierRules {
    pub fn from_config(cfg: &config::Classifier) -> Self {
        Self {
            trade_operations: cfg.trade_operations.clone(),
            execute_dapp_allowlist: cfg.execute_dapp_allowlist.clone(),
        }
    }

    fn is_trade_operation(&self, op: &str) -> bool {
        self.trade_operations.iter().any(|t| t == op)
    }

    fn is_allowed_dapp(&self, dapp: &str) -> bool {
        self.execute_dapp_allowlist.iter().any(|d| d == dapp)
    }
}

/// Map one raw transaction to a typed signal. Pure; never fails.
pub fn classify(tx: &ZerionTx, rules: &ClassifierRules) -> Signal {
    let attrs = &tx.attributes;
    let op = attrs.operation_type.as_deref().unwrap_or("unknown");
    let confirmed = attrs.status.as_deref() == Some("confirmed");

    let is_trade = confirmed
        && (rules.is_trade_operation(op)
            || (op == "execute" && tx.dapp_id().is_some_and(|d| rules.is_allowed_dapp(d))));

    let received = find_transfer(&attrs.transfers, "in");
    let sent = find_transfer(&attrs.transfers, "out");

    // Receiving base currency means the wallet sold a risk asset; the
    // traded token is then the one that left the wallet.
    let side = match received.and_then(transfer_symbol) {
        Some(symbol) if BASE_ASSETS.contains(&symbol) => Side::Sell,
        _ => Side::Buy,
    };

    let traded = match side {
        Side::Buy => received,
        Side::Sell => sent,
    };

    Signal {
        hash: attrs.hash.clone(),
        chain_id: tx.chain_id().map(str::to_string),
        timestamp_ms: parse_mined_at(attrs.mined_at.as_deref()),
        side,
        token_address: traded.and_then(transfer_token_address),
        symbol: traded
            .and_then(transfer_symbol)
            .unwrap_or(UNKNOWN_SYMBOL)
            .to_string(),
        is_trade,
        operation: op.to_string(),
    }
}

/// Classify a full feed page, preserving the feed's most-recent-first order.
pub fn classify_page(txs: &[ZerionTx], rules: &ClassifierRules) -> Vec<Signal> {
    txs.iter().map(|tx| classify(tx, rules)).collect()
}

fn find_transfer<'a>(transfers: &'a [ZerionTransfer], direction: &str) -> Option<&'a ZerionTransfer> {
    transfers
        .iter()
        .find(|t| t.direction.as_deref() == Some(direction))
}

fn transfer_symbol(transfer: &ZerionTransfer) -> Option<&str> {
    transfer.fungible_info.as_ref()?.symbol.as_deref()
}

fn transfer_token_address(transfer: &ZerionTransfer) -> Option<String> {
    transfer
        .fungible_info
        .as_ref()?
        .implementations
        .first()?
        .address
        .clone()
}

fn parse_mined_at(mined_at: Option<&str>) -> i64 {
    mined_at
        .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
        .map_or(0, |dt| dt.timestamp_millis())
}
