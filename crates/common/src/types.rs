use serde::Deserialize;

/// Trade direction as observed in a watched wallet's feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transaction from the Zerion wallet transactions endpoint.
/// Most-recent-first when requested with `sort=-mined_at`.
#[derive(Debug, Clone, Deserialize)]
pub struct ZerionTx {
    pub attributes: ZerionTxAttributes,
    pub relationships: Option<ZerionTxRelationships>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ZerionTxAttributes {
    pub hash: Option<String>,
    pub operation_type: Option<String>,
    pub status: Option<String>,
    pub mined_at: Option<String>,
    #[serde(default)]
    pub transfers: Vec<ZerionTransfer>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ZerionTransfer {
    pub direction: Option<String>,
    pub fungible_info: Option<FungibleInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FungibleInfo {
    pub symbol: Option<String>,
    #[serde(default)]
    pub implementations: Vec<FungibleImplementation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FungibleImplementation {
    pub address: Option<String>,
    pub chain_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ZerionTxRelationships {
    pub chain: Option<Relationship>,
    pub dapp: Option<Relationship>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Relationship {
    pub data: Option<RelationshipData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelationshipData {
    pub id: String,
}

impl ZerionTx {
    /// Chain identifier from the relationship block, e.g. "base", "ethereum".
    pub fn chain_id(&self) -> Option<&str> {
        self.relationships
            .as_ref()?
            .chain
            .as_ref()?
            .data
            .as_ref()
            .map(|d| d.id.as_str())
    }

    /// Decentralized-exchange identifier, when Zerion attributes one.
    pub fn dapp_id(&self) -> Option<&str> {
        self.relationships
            .as_ref()?
            .dapp
            .as_ref()?
            .data
            .as_ref()
            .map(|d| d.id.as_str())
    }
}

/// Lifetime profit/loss for a wallet, realized + unrealized combined.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WalletPnl {
    pub total_usd: f64,
}

/// Token metadata from the Zerion fungibles endpoint.
#[derive(Debug, Clone, Default)]
pub struct TokenMeta {
    pub verified: bool,
    pub market_cap: f64,
    pub volume_24h: f64,
}

/// Trending fungible asset, used for the best-effort market refresh.
#[derive(Debug, Clone)]
pub struct TrendingToken {
    pub symbol: String,
    pub name: String,
    pub price_change_1d: f64,
}

/// A social mention of the agent, already flattened from the Neynar
/// notification envelope. `address` is the author's first verified wallet.
#[derive(Debug, Clone)]
pub struct Mention {
    pub hash: String,
    pub author: String,
    pub address: Option<String>,
    pub text: String,
}

/// Keyword search hit from the social feed.
#[derive(Debug, Clone)]
pub struct CastLead {
    pub author: String,
    pub address: Option<String>,
    pub text: String,
}

/// Outcome of posting a cast or reply.
#[derive(Debug, Clone)]
pub struct PostReceipt {
    pub success: bool,
    pub id: Option<String>,
}
