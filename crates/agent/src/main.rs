use std::sync::Arc;

use anyhow::{Context, Result};
use common::config::{Config, Secrets};
use common::db::AgentDb;
use common::neynar::NeynarClient;
use common::observability;
use common::zerion::ZerionClient;
use tracing::{info, warn};

use agent::execution::Dispatcher;
use agent::metrics;
use agent::orchestrator::Orchestrator;

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(Config::default_config_path);
    let config = Config::load(&config_path)?;
    let secrets = Secrets::from_env();

    let dispatch = observability::build_dispatch(&config.general.log_level);
    tracing::dispatcher::set_global_default(dispatch)
        .context("failed to install tracing subscriber")?;

    metrics::describe();
    let _prometheus = metrics::install_prometheus(config.observability.prometheus_port)
        .context("failed to start Prometheus exporter")?;

    info!(
        config = %config_path,
        simulation = config.execution.simulation_mode,
        chains = config.zerion.chains.len(),
        "agent starting"
    );

    let db = Arc::new(AgentDb::open(&config.database.path).await?);
    let zerion = ZerionClient::new(&config.zerion, secrets.zerion_api_key.as_deref());
    let neynar = NeynarClient::new(&config.neynar, secrets.neynar_api_key.as_deref());
    if !neynar.has_credentials() {
        warn!("NEYNAR_API_KEY not set; mention and discovery phases will sit idle");
    }
    let dispatcher = Dispatcher::new(&config, secrets.clone());

    let fid = secrets.agent_fid.clone();
    let signer_uuid = secrets.neynar_signer_uuid.clone();
    let orchestrator = Orchestrator::new(db, config, zerion, neynar, dispatcher, fid, signer_uuid);

    orchestrator.run().await;
    Ok(())
}
