use alloy::network::EthereumWallet;
use alloy::primitives::aliases::{U160, U24};
use alloy::primitives::{Address, U256};
use alloy::providers::Provider;
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;
use alloy::sol_types::SolCall;
use anyhow::{Context, Result};
use common::config::{self, ChainRoute};
use common::types::Side;
use tracing::info;

use super::{ExecutionOutcome, SkipReason};

sol! {
    function approve(address spender, uint256 amount) external returns (bool);
    function balanceOf(address account) external view returns (uint256);

    struct ExactInputSingleParams {
        address tokenIn;
        address tokenOut;
        uint24 fee;
        address recipient;
        uint256 deadline;
        uint256 amountIn;
        uint256 amountOutMinimum;
        uint160 sqrtPriceLimitX96;
    }

    function exactInputSingle(ExactInputSingleParams params) external payable returns (uint256 amountOut);
}

/// Mirror a trade through the chain's V3-style swap router.
///
/// BUY swaps a fixed notional of native currency into the token; SELL
/// swaps the wallet's entire token balance back to wrapped native,
/// approving the router first. Each transaction is dry-run via
/// `eth_call` before submission.
pub async fn execute(
    route: &ChainRoute,
    exec: &config::Execution,
    key: &str,
    side: Side,
    token: &str,
) -> Result<ExecutionOutcome> {
    let signer: PrivateKeySigner = key.parse().context("EVM signing key is not a valid key")?;
    let recipient = signer.address();
    let wallet = EthereumWallet::from(signer);
    let rpc_url = route
        .rpc_url
        .parse()
        .with_context(|| format!("bad rpc_url for chain {}", route.id))?;
    let provider = alloy::providers::ProviderBuilder::new()
        .wallet(wallet)
        .on_http(rpc_url);

    let token_addr: Address = token
        .parse()
        .with_context(|| format!("token address is not an EVM address: {token}"))?;
    let router: Address = route.router.parse().context("malformed router address")?;
    let wrapped: Address = route
        .wrapped_native
        .parse()
        .context("malformed wrapped_native address")?;

    let (token_in, token_out, amount_in) = match side {
        Side::Buy => {
            let notional = U256::from((exec.buy_notional_eth * 1e18) as u128);
            (wrapped, token_addr, notional)
        }
        Side::Sell => {
            let balance = token_balance(&provider, token_addr, recipient).await?;
            if balance.is_zero() {
                return Ok(ExecutionOutcome::Skipped {
                    reason: SkipReason::NothingToSell,
                });
            }
            approve_router(&provider, token_addr, router, balance).await?;
            (token_addr, wrapped, balance)
        }
    };

    let deadline = U256::from(chrono::Utc::now().timestamp() as u64 + exec.deadline_secs);
    let swap = exactInputSingleCall {
        params: ExactInputSingleParams {
            tokenIn: token_in,
            tokenOut: token_out,
            fee: U24::from(exec.pool_fee),
            recipient,
            deadline,
            amountIn: amount_in,
            amountOutMinimum: U256::ZERO,
            sqrtPriceLimitX96: U160::ZERO,
        },
    };

    let mut tx = TransactionRequest::default()
        .to(router)
        .input(swap.abi_encode().into());
    if side == Side::Buy {
        tx = tx.value(amount_in);
    }

    provider
        .call(&tx)
        .await
        .context("swap dry run reverted")?;

    let pending = provider
        .send_transaction(tx)
        .await
        .context("failed to submit swap")?;
    let tx_hash = (*pending.tx_hash()).to_string();
    info!(chain = %route.id, %side, token, tx_hash, "swap submitted");

    let receipt = pending
        .get_receipt()
        .await
        .context("swap receipt never arrived")?;
    anyhow::ensure!(receipt.status(), "swap reverted on chain: {tx_hash}");

    Ok(ExecutionOutcome::Settled { tx_hash })
}

async fn token_balance<T: alloy::transports::Transport + Clone, P: Provider<T>>(
    provider: &P,
    token: Address,
    owner: Address,
) -> Result<U256> {
    let call = balanceOfCall { account: owner };
    let tx = TransactionRequest::default()
        .to(token)
        .input(call.abi_encode().into());
    let raw = provider
        .call(&tx)
        .await
        .context("balanceOf query failed")?;
    anyhow::ensure!(raw.len() >= 32, "balanceOf returned a short word");
    Ok(U256::from_be_slice(&raw[..32]))
}

async fn approve_router<T: alloy::transports::Transport + Clone, P: Provider<T>>(
    provider: &P,
    token: Address,
    router: Address,
    amount: U256,
) -> Result<()> {
    let call = approveCall {
        spender: router,
        amount,
    };
    let tx = TransactionRequest::default()
        .to(token)
        .input(call.abi_encode().into());
    let receipt = provider
        .send_transaction(tx)
        .await
        .context("failed to submit router approval")?
        .get_receipt()
        .await
        .context("approval receipt never arrived")?;
    anyhow::ensure!(receipt.status(), "router approval reverted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swap_calldata_encodes_selector() {
        let swap = exactInputSingleCall {
            params: ExactInputSingleParams {
                tokenIn: Address::ZERO,
                tokenOut: Address::ZERO,
                fee: U24::from(3000u32),
                recipient: Address::ZERO,
                deadline: U256::from(1u64),
                amountIn: U256::from(1u64),
                amountOutMinimum: U256::ZERO,
                sqrtPriceLimitX96: U160::ZERO,
            },
        };
        let calldata = swap.abi_encode();
        // 4-byte selector plus the 8-word params struct.
        assert_eq!(calldata.len(), 4 + 8 * 32);
        assert_eq!(&calldata[..4], exactInputSingleCall::SELECTOR.as_slice());
    }

    #[test]
    fn test_buy_notional_in_wei() {
        let notional = U256::from((0.001 * 1e18) as u128);
        assert_eq!(notional, U256::from(1_000_000_000_000_000u64));
    }
}
