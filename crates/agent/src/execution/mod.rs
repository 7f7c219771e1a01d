mod evm;
mod solana;

use common::config::{self, ChainRoute, Secrets};
use rand::Rng as _;
use tracing::{info, warn};

use crate::classifier::Signal;

const SOLANA_CHAIN_ID: &str = "solana";

/// Terminal state of one dispatch attempt. The dispatcher never panics
/// and never returns an error across this boundary; everything folds
/// into one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// Submitted on chain (or synthesized in simulation mode).
    Settled { tx_hash: String },
    /// Deliberately not attempted.
    Skipped { reason: SkipReason },
    /// Attempted and lost; the cycle carries on.
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SkipReason {
    #[error("no routing entry for chain '{0}'")]
    UnsupportedChain(String),
    #[error("no signing key for this chain family")]
    NoSigningKey,
    #[error("signal carries no token address")]
    MissingTokenAddress,
    #[error("wallet holds none of the token to sell")]
    NothingToSell,
}

/// Routes a trade signal to the matching chain family and submits it.
pub struct Dispatcher {
    config: config::Config,
    secrets: Secrets,
}

impl Dispatcher {
    pub fn new(config: &config::Config, secrets: Secrets) -> Self {
        Self {
            config: config.clone(),
            secrets,
        }
    }

    /// Mirror one signal. Resolution order: chain routing, then signing
    /// credentials, then the simulation gate, then the real path.
    pub async fn dispatch(&self, signal: &Signal) -> ExecutionOutcome {
        let Some(token) = signal.token_address.as_deref() else {
            return skipped(SkipReason::MissingTokenAddress);
        };

        let Some(chain_id) = signal.chain_id.as_deref() else {
            return skipped(SkipReason::UnsupportedChain("unknown".to_string()));
        };

        if chain_id == SOLANA_CHAIN_ID {
            return self.dispatch_solana(signal, token).await;
        }

        let Some(route) = self.config.chain_route(chain_id) else {
            return skipped(SkipReason::UnsupportedChain(chain_id.to_string()));
        };
        self.dispatch_evm(signal, route, token).await
    }

    async fn dispatch_evm(
        &self,
        signal: &Signal,
        route: &ChainRoute,
        token: &str,
    ) -> ExecutionOutcome {
        let Some(key) = self.secrets.evm_key() else {
            return skipped(SkipReason::NoSigningKey);
        };
        if self.config.execution.simulation_mode {
            return self.simulate(signal, &route.id);
        }

        match evm::execute(route, &self.config.execution, key, signal.side, token).await {
            Ok(outcome) => outcome,
            Err(e) => failed(signal, &route.id, e),
        }
    }

    async fn dispatch_solana(&self, signal: &Signal, token: &str) -> ExecutionOutcome {
        let Some(key) = self.secrets.solana_key() else {
            return skipped(SkipReason::NoSigningKey);
        };
        if self.config.execution.simulation_mode {
            return self.simulate(signal, SOLANA_CHAIN_ID);
        }

        match solana::execute(&self.config.execution, key, signal.side, token).await {
            Ok(tx_hash) => ExecutionOutcome::Settled { tx_hash },
            Err(e) => failed(signal, SOLANA_CHAIN_ID, e),
        }
    }

    fn simulate(&self, signal: &Signal, chain_id: &str) -> ExecutionOutcome {
        let tx_hash = synthetic_tx_hash();
        info!(
            chain = chain_id,
            side = %signal.side,
            token = %signal.symbol,
            tx_hash,
            "simulated mirror trade"
        );
        ExecutionOutcome::Settled { tx_hash }
    }
}

fn skipped(reason: SkipReason) -> ExecutionOutcome {
    ExecutionOutcome::Skipped { reason }
}

fn failed(signal: &Signal, chain_id: &str, error: anyhow::Error) -> ExecutionOutcome {
    warn!(
        chain = chain_id,
        side = %signal.side,
        token = %signal.symbol,
        error = %error,
        "mirror trade failed"
    );
    ExecutionOutcome::Failed {
        reason: error.to_string(),
    }
}

/// Synthetic hash for simulated settlements, visibly distinct from any
/// real transaction hash.
fn synthetic_tx_hash() -> String {
    let nonce: u64 = rand::thread_rng().gen();
    format!("0x_sim_{:012x}", nonce & 0xffff_ffff_ffff)
}
