use common::neynar::NeynarClient;
use common::types::{CastLead, Mention, PostReceipt, TokenMeta, TrendingToken, WalletPnl, ZerionTx};
use common::zerion::ZerionClient;

use crate::classifier::Signal;
use crate::execution::{Dispatcher, ExecutionOutcome};

/// Portfolio-analytics surface the orchestrator consumes. All methods
/// degrade (empty page, `None` PnL) rather than fail.
pub trait AnalyticsFeed {
    fn fetch_transactions(
        &self,
        address: &str,
    ) -> impl std::future::Future<Output = Vec<ZerionTx>> + Send;

    fn lifetime_pnl(
        &self,
        address: &str,
    ) -> impl std::future::Future<Output = Option<WalletPnl>> + Send;

    fn trending(
        &self,
        chain_id: &str,
    ) -> impl std::future::Future<Output = Vec<TrendingToken>> + Send;

    fn token_meta(
        &self,
        token_address: &str,
        chain_id: &str,
    ) -> impl std::future::Future<Output = TokenMeta> + Send;
}

/// Social surface: mentions in, keyword hits in, casts out.
pub trait SocialFeed {
    fn fetch_mentions(
        &self,
        fid: &str,
        limit: u32,
    ) -> impl std::future::Future<Output = Vec<Mention>> + Send;

    fn search_casts(
        &self,
        query: &str,
        limit: u32,
    ) -> impl std::future::Future<Output = Vec<CastLead>> + Send;

    fn post_cast(
        &self,
        signer_uuid: &str,
        text: &str,
        parent_hash: Option<&str>,
    ) -> impl std::future::Future<Output = PostReceipt> + Send;
}

/// Trade submission seam, so cycle logic can be exercised without a
/// chain connection.
pub trait TradeExecutor {
    fn dispatch(
        &self,
        signal: &Signal,
    ) -> impl std::future::Future<Output = ExecutionOutcome> + Send;
}

impl AnalyticsFeed for ZerionClient {
    async fn fetch_transactions(&self, address: &str) -> Vec<ZerionTx> {
        ZerionClient::fetch_transactions(self, address).await
    }

    async fn lifetime_pnl(&self, address: &str) -> Option<WalletPnl> {
        self.get_lifetime_pnl(address).await
    }

    async fn trending(&self, chain_id: &str) -> Vec<TrendingToken> {
        self.fetch_trending(chain_id).await
    }

    async fn token_meta(&self, token_address: &str, chain_id: &str) -> TokenMeta {
        self.get_token_meta(token_address, chain_id).await
    }
}

impl SocialFeed for NeynarClient {
    async fn fetch_mentions(&self, fid: &str, limit: u32) -> Vec<Mention> {
        NeynarClient::fetch_mentions(self, fid, limit).await
    }

    async fn search_casts(&self, query: &str, limit: u32) -> Vec<CastLead> {
        NeynarClient::search_casts(self, query, limit).await
    }

    async fn post_cast(&self, signer_uuid: &str, text: &str, parent_hash: Option<&str>) -> PostReceipt {
        NeynarClient::post_cast(self, signer_uuid, text, parent_hash).await
    }
}

impl TradeExecutor for Dispatcher {
    async fn dispatch(&self, signal: &Signal) -> ExecutionOutcome {
        Dispatcher::dispatch(self, signal).await
    }
}
