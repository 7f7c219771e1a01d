use anyhow::{Context, Result};
use base64::Engine as _;
use common::config;
use common::types::Side;
use serde::Deserialize;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcSendTransactionConfig;
use solana_sdk::signature::{Keypair, Signer as _};
use solana_sdk::transaction::VersionedTransaction;
use tracing::info;

/// Wrapped SOL mint, the quote-side asset for every mirror swap.
const SOL_MINT: &str = "So11111111111111111111111111111111111111112";

#[derive(Debug, Deserialize)]
struct SwapResponse {
    #[serde(rename = "swapTransaction")]
    swap_transaction: String,
}

/// Mirror a trade through the Jupiter aggregator.
///
/// Quote, request a prebuilt swap transaction, re-sign it with the
/// agent's keypair and submit. Preflight is skipped: the aggregator's
/// blockhash can run a slot ahead of the RPC node, which preflight
/// would reject.
pub async fn execute(
    exec: &config::Execution,
    key: &str,
    side: Side,
    token_mint: &str,
) -> Result<String> {
    let secret = bs58::decode(key)
        .into_vec()
        .context("Solana signing key is not valid base58")?;
    let keypair =
        Keypair::from_bytes(&secret).context("Solana signing key is not a valid keypair")?;

    let (input_mint, output_mint, amount) = match side {
        Side::Buy => (SOL_MINT, token_mint, exec.solana_buy_lamports),
        Side::Sell => (token_mint, SOL_MINT, exec.solana_sell_lamports),
    };

    let http = reqwest::Client::new();
    let quote: serde_json::Value = http
        .get(quote_url(exec, input_mint, output_mint, amount))
        .send()
        .await
        .context("Jupiter quote request failed")?
        .error_for_status()
        .context("Jupiter rejected the quote request")?
        .json()
        .await
        .context("Jupiter quote is not valid JSON")?;

    let swap_body = serde_json::json!({
        "quoteResponse": quote,
        "userPublicKey": keypair.pubkey().to_string(),
        "wrapAndUnwrapSol": true,
    });
    let swap: SwapResponse = http
        .post(format!("{}/swap", exec.jupiter_api_url))
        .json(&swap_body)
        .send()
        .await
        .context("Jupiter swap request failed")?
        .error_for_status()
        .context("Jupiter rejected the swap request")?
        .json()
        .await
        .context("Jupiter swap response is not valid JSON")?;

    let raw = base64::engine::general_purpose::STANDARD
        .decode(swap.swap_transaction)
        .context("swap transaction is not valid base64")?;
    let unsigned: VersionedTransaction =
        bincode::deserialize(&raw).context("failed to decode swap transaction")?;
    let signed = VersionedTransaction::try_new(unsigned.message, &[&keypair])
        .context("failed to sign swap transaction")?;

    let rpc = RpcClient::new(exec.solana_rpc_url.clone());
    let send_config = RpcSendTransactionConfig {
        skip_preflight: true,
        max_retries: Some(exec.solana_max_retries),
        ..RpcSendTransactionConfig::default()
    };
    let signature = rpc
        .send_transaction_with_config(&signed, send_config)
        .await
        .context("failed to submit swap transaction")?;

    info!(%side, token_mint, signature = %signature, "swap submitted");
    Ok(signature.to_string())
}

fn quote_url(exec: &config::Execution, input_mint: &str, output_mint: &str, amount: u64) -> String {
    format!(
        "{}/quote?inputMint={input_mint}&outputMint={output_mint}&amount={amount}&slippageBps={}",
        exec.jupiter_api_url, exec.slippage_bps
    )
}
