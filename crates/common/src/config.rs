use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub general: General,
    pub database: Database,
    pub observability: Observability,
    pub zerion: Zerion,
    pub neynar: Neynar,
    pub classifier: Classifier,
    pub discovery: Discovery,
    pub broadcast: Broadcast,
    pub execution: Execution,
    pub chains: Vec<ChainRoute>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct General {
    pub log_level: String,
    pub cycle_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Database {
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Observability {
    pub prometheus_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Zerion {
    pub api_url: String,
    pub chains: Vec<String>,
    pub page_size: u32,
    pub pnl_max_retries: u32,
    pub pnl_retry_delay_ms: u64,
    pub trending_page_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Neynar {
    pub api_url: String,
    pub mention_limit: u32,
    pub search_limit: u32,
}

/// Trade-detection rules for the transaction classifier. The dapp
/// allow-list is exact-match on Zerion dapp ids, versioned alongside the
/// rest of the configuration rather than hard-coded.
#[derive(Debug, Clone, Deserialize)]
pub struct Classifier {
    pub trade_operations: Vec<String>,
    pub execute_dapp_allowlist: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Discovery {
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Broadcast {
    pub interval_secs: u64,
    pub top_n: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Execution {
    pub simulation_mode: bool,
    pub buy_notional_eth: f64,
    pub pool_fee: u32,
    pub deadline_secs: u64,
    pub jupiter_api_url: String,
    pub solana_rpc_url: String,
    pub solana_buy_lamports: u64,
    pub solana_sell_lamports: u64,
    pub slippage_bps: u32,
    pub solana_max_retries: usize,
}

/// One EVM routing-table entry: chain id as reported by the analytics
/// feed, mapped to the swap router and wrapped native asset to trade
/// through on that chain.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainRoute {
    pub id: String,
    pub router: String,
    pub wrapped_native: String,
    pub rpc_url: String,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {path}"))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("failed to parse agent config")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.general.cycle_interval_secs > 0,
            "general.cycle_interval_secs must be > 0"
        );
        anyhow::ensure!(self.zerion.page_size > 0, "zerion.page_size must be > 0");
        anyhow::ensure!(
            !self.zerion.chains.is_empty(),
            "zerion.chains must not be empty"
        );
        // Clients assume these parse; fail at load time instead.
        reqwest::Url::parse(&self.zerion.api_url)
            .context("zerion.api_url must be a valid absolute URL")?;
        reqwest::Url::parse(&self.neynar.api_url)
            .context("neynar.api_url must be a valid absolute URL")?;
        anyhow::ensure!(
            self.execution.buy_notional_eth > 0.0,
            "execution.buy_notional_eth must be > 0"
        );
        anyhow::ensure!(
            self.broadcast.top_n > 0,
            "broadcast.top_n must be > 0"
        );
        for chain in &self.chains {
            anyhow::ensure!(
                chain.router.starts_with("0x") && chain.wrapped_native.starts_with("0x"),
                "chain {} has a malformed router or wrapped_native address",
                chain.id
            );
        }
        Ok(())
    }

    pub fn default_config_path() -> String {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(std::path::Path::to_path_buf));

        // Check next to the binary first
        if let Some(dir) = &exe_dir {
            let candidate = dir.join("default.toml");
            if candidate.exists() {
                return candidate.to_string_lossy().to_string();
            }
        }

        "config/default.toml".to_string()
    }

    /// Routing-table lookup for EVM chains. Solana is not in this table;
    /// it has its own execution path.
    pub fn chain_route(&self, chain_id: &str) -> Option<&ChainRoute> {
        self.chains.iter().find(|c| c.id == chain_id)
    }
}

/// Credentials pulled from the environment, never from the TOML file.
/// Absent or placeholder values degrade the relevant feature instead of
/// failing startup: no signer means mirror trades are skipped, no social
/// key means the mention/discovery phases are idle.
#[derive(Debug, Clone, Default)]
pub struct Secrets {
    pub zerion_api_key: Option<String>,
    pub neynar_api_key: Option<String>,
    pub neynar_signer_uuid: Option<String>,
    pub agent_fid: Option<String>,
    pub evm_private_key: Option<String>,
    pub solana_private_key: Option<String>,
}

impl Secrets {
    pub fn from_env() -> Self {
        Self {
            zerion_api_key: read_env("ZERION_API_KEY"),
            neynar_api_key: read_env("NEYNAR_API_KEY"),
            neynar_signer_uuid: read_env("NEYNAR_SIGNER_UUID"),
            agent_fid: read_env("AGENT_FID"),
            evm_private_key: read_env("AGENT_PRIVATE_KEY"),
            solana_private_key: read_env("SOLANA_PRIVATE_KEY"),
        }
    }

    /// EVM signing key, `None` when unset or still a placeholder.
    pub fn evm_key(&self) -> Option<&str> {
        self.evm_private_key
            .as_deref()
            .filter(|k| !is_placeholder(k))
    }

    /// Solana signing key, `None` when unset or still a placeholder.
    pub fn solana_key(&self) -> Option<&str> {
        self.solana_private_key
            .as_deref()
            .filter(|k| !is_placeholder(k))
    }
}

fn read_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Keys shipped in .env templates look like "0x..." or contain "PASTE".
fn is_placeholder(key: &str) -> bool {
    key == "0x..." || key.contains("PASTE")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_default_config() {
        let config = Config::from_toml_str(include_str!("../../../config/default.toml")).unwrap();
        assert_eq!(config.general.cycle_interval_secs, 120);
        assert!(config.execution.simulation_mode);
        assert_eq!(config.zerion.page_size, 25);
        assert!(config.chains.len() >= 2);
    }

    #[test]
    fn test_chain_route_lookup() {
        let config = Config::from_toml_str(include_str!("../../../config/default.toml")).unwrap();
        let base = config.chain_route("base").unwrap();
        assert!(base.router.starts_with("0x"));
        assert!(config.chain_route("solana").is_none());
        assert!(config.chain_route("dogechain").is_none());
    }

    #[test]
    fn test_validate_zero_cycle_interval() {
        let content = include_str!("../../../config/default.toml")
            .replace("cycle_interval_secs = 120", "cycle_interval_secs = 0");
        let result = Config::from_toml_str(&content);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("cycle_interval_secs must be > 0"));
    }

    #[test]
    fn test_validate_malformed_router() {
        let content = include_str!("../../../config/default.toml").replace(
            "router = \"0x2626664c2603336E57B271c5C0b26F421741e481\"",
            "router = \"not-an-address\"",
        );
        assert!(Config::from_toml_str(&content).is_err());
    }

    #[test]
    fn test_parse_invalid_config_missing_section() {
        let bad = "
[general]
log_level = \"info\"
cycle_interval_secs = 120
";
        assert!(Config::from_toml_str(bad).is_err());
    }

    #[test]
    fn test_placeholder_keys_filtered() {
        let secrets = Secrets {
            evm_private_key: Some("0x...".to_string()),
            solana_private_key: Some("PASTE_KEY_HERE".to_string()),
            ..Secrets::default()
        };
        assert!(secrets.evm_key().is_none());
        assert!(secrets.solana_key().is_none());

        let secrets = Secrets {
            evm_private_key: Some("0xdeadbeef".to_string()),
            solana_private_key: Some("4sY...real".to_string()),
            ..Secrets::default()
        };
        assert_eq!(secrets.evm_key(), Some("0xdeadbeef"));
        assert!(secrets.solana_key().is_some());
    }
}
