pub mod auditor;
pub mod classifier;
pub mod execution;
pub mod feeds;
pub mod metrics;
pub mod orchestrator;
pub mod store;
pub mod watermark;
