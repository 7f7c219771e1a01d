use anyhow::Result;
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;

pub fn describe() {
    describe_counter!("agent_cycles_total", "Number of scan cycles started.");
    describe_counter!(
        "agent_signals_classified_total",
        "Number of feed transactions classified into signals."
    );
    describe_counter!(
        "agent_mirror_dispatch_total",
        "Mirror trade dispatches by outcome (settled/skipped/failed)."
    );
    describe_counter!(
        "agent_mentions_replied_total",
        "Number of mention audits replied to."
    );
    describe_counter!(
        "agent_wallets_discovered_total",
        "Number of wallets admitted via keyword discovery."
    );
    describe_gauge!(
        "agent_watched_wallets",
        "Current number of tracked wallets."
    );
    describe_counter!(
        "tracing_error_events",
        "Number of ERROR-level tracing events."
    );
}

pub fn install_prometheus(port: u16) -> Result<PrometheusHandle> {
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    Ok(PrometheusBuilder::new()
        .with_http_listener(addr)
        .install_recorder()?)
}
